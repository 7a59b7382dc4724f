//! Sample-rate conversion by linear interpolation
//!
//! Deliberately simple: each output sample is interpolated between the two
//! nearest input samples. For speech-bandwidth telephony audio this trades
//! a little precision for predictable sub-frame latency; a windowed/sinc
//! resampler is out of scope here.

/// Resample `samples` from `in_rate` to `out_rate`.
///
/// Identity when the rates match. Output length is
/// `round(len × out_rate / in_rate)`.
pub fn linear(samples: &[i16], in_rate: u32, out_rate: u32) -> Vec<i16> {
    if in_rate == out_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let out_len = (samples.len() as f64 * out_rate as f64 / in_rate as f64).round() as usize;
    let step = in_rate as f64 / out_rate as f64;
    let last = samples.len() - 1;

    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let pos = i as f64 * step;
        let idx = (pos.floor() as usize).min(last);
        let next = (idx + 1).min(last);
        let frac = pos - idx as f64;
        let a = samples[idx] as f64;
        let b = samples[next] as f64;
        out.push((a + (b - a) * frac).round() as i16);
    }
    out
}
