//! Processor chain execution

use tokio::sync::mpsc;
use tracing::{debug, warn};
use voice_gateway_core::{Frame, FrameProcessor, ProcessorContext};

/// An ordered list of frame processors, executed as one tokio task per
/// stage connected by bounded channels.
///
/// Per-stage buffering never reorders frames. Lifecycle frames are
/// forwarded by the chain after the stage has seen them, so `Start`
/// reaches every stage before any audio and `End` drains the whole chain
/// even if a stage fails while handling it. A stage error is logged and
/// converted into a `Frame::Error` that continues downstream; the call
/// itself keeps running.
pub struct ProcessorChain {
    processors: Vec<Box<dyn FrameProcessor>>,
    channel_capacity: usize,
}

impl ProcessorChain {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            processors: Vec::new(),
            channel_capacity,
        }
    }

    /// Append a stage to the end of the chain
    pub fn add(mut self, processor: impl FrameProcessor) -> Self {
        self.processors.push(Box::new(processor));
        self
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Spawn the chain. Returns the sender feeding the first stage and the
    /// receiver drained from the last.
    pub fn spawn(self, context: ProcessorContext) -> (mpsc::Sender<Frame>, mpsc::Receiver<Frame>) {
        let (input_tx, mut next_rx) = mpsc::channel::<Frame>(self.channel_capacity);

        for processor in self.processors {
            let (tx, rx) = mpsc::channel::<Frame>(self.channel_capacity);
            let stage_rx = std::mem::replace(&mut next_rx, rx);
            tokio::spawn(run_stage(processor, context.clone(), stage_rx, tx));
        }

        (input_tx, next_rx)
    }
}

async fn run_stage(
    processor: Box<dyn FrameProcessor>,
    mut context: ProcessorContext,
    mut rx: mpsc::Receiver<Frame>,
    tx: mpsc::Sender<Frame>,
) {
    let name = processor.name();
    if let Err(error) = processor.on_start(&mut context).await {
        warn!(stage = name, %error, "stage start hook failed");
    }

    while let Some(frame) = rx.recv().await {
        let lifecycle = matches!(frame, Frame::Lifecycle(_));
        let end = frame.is_end();
        let passthrough = if lifecycle { Some(frame.clone()) } else { None };

        match processor.process(frame, &mut context).await {
            Ok(outputs) => {
                for out in outputs {
                    if tx.send(out).await.is_err() {
                        debug!(stage = name, "downstream closed, stopping stage");
                        return;
                    }
                }
            }
            Err(error) => {
                warn!(stage = name, %error, "stage failed on frame, continuing");
                let report = Frame::Error {
                    stage: name.to_string(),
                    message: error.to_string(),
                    recoverable: true,
                };
                if tx.send(report).await.is_err() {
                    return;
                }
            }
        }

        if let Some(marker) = passthrough {
            if tx.send(marker).await.is_err() {
                return;
            }
        }

        if end {
            if let Err(error) = processor.on_stop(&mut context).await {
                warn!(stage = name, %error, "stage stop hook failed");
            }
            debug!(stage = name, "stage drained");
            return;
        }
    }
}
