//! Pipeline processing traits

use crate::{Frame, Result};
use async_trait::async_trait;
use std::collections::HashMap;

/// Context passed to frame processors
#[derive(Debug, Clone, Default)]
pub struct ProcessorContext {
    /// Call identifier this pipeline belongs to
    pub call_id: String,
    /// Current conversation turn number
    pub turn_number: usize,
    /// Custom metadata
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ProcessorContext {
    /// Create a new context for a call
    pub fn new(call_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            ..Default::default()
        }
    }

    /// Increment turn number
    pub fn next_turn(&mut self) {
        self.turn_number += 1;
    }
}

/// Frame processor for pipeline stages
///
/// Each processor receives frames, processes them, and emits zero or more
/// output frames. Processors run in separate tokio tasks, connected by
/// bounded channels, so per-stage buffering never reorders frames.
#[async_trait]
pub trait FrameProcessor: Send + Sync + 'static {
    /// Process a frame and emit output frames in order
    async fn process(&self, frame: Frame, context: &mut ProcessorContext) -> Result<Vec<Frame>>;

    /// Processor name for tracing
    fn name(&self) -> &'static str;

    /// Called when the pipeline starts, before any frame is delivered
    async fn on_start(&self, _context: &mut ProcessorContext) -> Result<()> {
        Ok(())
    }

    /// Called after `Lifecycle(End)` has been processed by this stage
    async fn on_stop(&self, _context: &mut ProcessorContext) -> Result<()> {
        Ok(())
    }
}
