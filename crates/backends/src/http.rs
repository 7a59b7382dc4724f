//! Shared HTTP plumbing for the backend adapters

use async_stream::stream;
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::warn;
use voice_gateway_config::BackendServiceConfig;
use voice_gateway_core::{Error, Result};

/// Build a client with the configured request timeout
pub(crate) fn build_client(config: &BackendServiceConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_millis(config.timeout_ms))
        .build()
        .map_err(|e| Error::BackendUnavailable(format!("client construction failed: {e}")))
}

/// Send a request, retrying transport errors and 5xx responses with
/// doubling backoff.
///
/// 4xx responses are not retried; the request itself is wrong and will
/// stay wrong.
pub(crate) async fn send_with_retry<F>(
    backend: &str,
    config: &BackendServiceConfig,
    make_request: F,
) -> Result<reqwest::Response>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut backoff = Duration::from_millis(config.initial_backoff_ms);
    let mut attempt: u32 = 0;
    loop {
        let failure = match make_request().send().await {
            Ok(response) if response.status().is_success() => return Ok(response),
            Ok(response) if response.status().is_server_error() => {
                format!("{backend} returned {}", response.status())
            }
            Ok(response) => {
                return Err(Error::BackendUnavailable(format!(
                    "{backend} rejected request with {}",
                    response.status()
                )))
            }
            Err(e) => format!("{backend} request failed: {e}"),
        };

        if attempt >= config.max_retries {
            return Err(Error::BackendUnavailable(format!(
                "{failure} (after {attempt} retries)"
            )));
        }
        attempt += 1;
        warn!(backend, attempt, backoff_ms = backoff.as_millis() as u64, %failure, "retrying");
        tokio::time::sleep(backoff).await;
        backoff *= 2;
    }
}

/// Parse a newline-delimited JSON response body into typed lines.
///
/// Blank lines are skipped; a trailing line without a newline is still
/// parsed when the body ends.
pub(crate) fn ndjson_lines<T>(response: reqwest::Response) -> impl Stream<Item = Result<T>>
where
    T: DeserializeOwned,
{
    stream! {
        let mut body = response.bytes_stream();
        let mut buf: Vec<u8> = Vec::new();
        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => buf.extend_from_slice(&bytes),
                Err(e) => {
                    yield Err(Error::BackendUnavailable(format!("response stream failed: {e}")));
                    return;
                }
            }
            while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buf.drain(..=pos).collect();
                let line = &line[..line.len() - 1];
                if line.iter().all(|b| b.is_ascii_whitespace()) {
                    continue;
                }
                yield serde_json::from_slice::<T>(line).map_err(Error::from);
            }
        }
        if !buf.iter().all(|b| b.is_ascii_whitespace()) {
            yield serde_json::from_slice::<T>(&buf).map_err(Error::from);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::Router;
    use futures::pin_mut;
    use serde::Deserialize;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn config(endpoint: String, max_retries: u32) -> BackendServiceConfig {
        BackendServiceConfig {
            endpoint,
            timeout_ms: 2000,
            max_retries,
            initial_backoff_ms: 1,
        }
    }

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn counting_route(hits: Arc<AtomicUsize>, failures: usize, status: StatusCode) -> Router {
        Router::new().route(
            "/run",
            post(move || {
                let hits = hits.clone();
                async move {
                    if hits.fetch_add(1, Ordering::SeqCst) < failures {
                        (status, "unwell")
                    } else {
                        (StatusCode::OK, "done")
                    }
                }
            }),
        )
    }

    #[tokio::test]
    async fn server_errors_are_retried_until_success() {
        let hits = Arc::new(AtomicUsize::new(0));
        let addr = serve(counting_route(
            hits.clone(),
            2,
            StatusCode::INTERNAL_SERVER_ERROR,
        ))
        .await;
        let config = config(format!("http://{addr}/run"), 3);
        let client = build_client(&config).unwrap();

        let response = send_with_retry("stub", &config, || client.post(config.endpoint.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn client_errors_fail_without_retrying() {
        let hits = Arc::new(AtomicUsize::new(0));
        let addr = serve(counting_route(hits.clone(), usize::MAX, StatusCode::BAD_REQUEST)).await;
        let config = config(format!("http://{addr}/run"), 3);
        let client = build_client(&config).unwrap();

        let error = send_with_retry("stub", &config, || client.post(config.endpoint.clone()))
            .await
            .unwrap_err();
        assert!(matches!(error, Error::BackendUnavailable(_)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retry_exhaustion_reports_unavailable() {
        let hits = Arc::new(AtomicUsize::new(0));
        let addr = serve(counting_route(
            hits.clone(),
            usize::MAX,
            StatusCode::INTERNAL_SERVER_ERROR,
        ))
        .await;
        let config = config(format!("http://{addr}/run"), 1);
        let client = build_client(&config).unwrap();

        let error = send_with_retry("stub", &config, || client.post(config.endpoint.clone()))
            .await
            .unwrap_err();
        match error {
            Error::BackendUnavailable(message) => assert!(message.contains("500")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[derive(Debug, Deserialize, PartialEq, Eq)]
    struct Line {
        n: u32,
    }

    #[tokio::test]
    async fn ndjson_skips_blank_lines_and_parses_unterminated_tail() {
        let app = Router::new().route("/lines", get(|| async { "{\"n\":1}\n\n{\"n\":2}" }));
        let addr = serve(app).await;
        let config = config(format!("http://{addr}/lines"), 0);
        let client = build_client(&config).unwrap();

        let response = send_with_retry("stub", &config, || client.get(config.endpoint.clone()))
            .await
            .unwrap();
        let lines = ndjson_lines::<Line>(response);
        pin_mut!(lines);
        let mut parsed = Vec::new();
        while let Some(line) = lines.next().await {
            parsed.push(line.unwrap());
        }
        assert_eq!(parsed, vec![Line { n: 1 }, Line { n: 2 }]);
    }
}
