//! Conversation context aggregators
//!
//! Two thin stages that record finished turns into the shared
//! conversation history: the user side once a final transcript passes, the
//! assistant side once a complete reply text passes. Keeping them as
//! separate stages pins the ordering of history updates to frame order.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;
use voice_gateway_core::{
    ConversationContext, Frame, FrameProcessor, ProcessorContext, Result,
};

/// Records final transcripts as user turns
pub struct UserTurnAggregator {
    conversation: Arc<Mutex<ConversationContext>>,
}

impl UserTurnAggregator {
    pub fn new(conversation: Arc<Mutex<ConversationContext>>) -> Self {
        Self { conversation }
    }
}

#[async_trait]
impl FrameProcessor for UserTurnAggregator {
    async fn process(&self, frame: Frame, context: &mut ProcessorContext) -> Result<Vec<Frame>> {
        match frame {
            Frame::TranscriptFinal { text } => {
                self.conversation.lock().push_user(text.clone());
                context.next_turn();
                debug!(call_id = %context.call_id, turn = context.turn_number, "user turn recorded");
                Ok(vec![Frame::TranscriptFinal { text }])
            }
            Frame::Lifecycle(_) => Ok(vec![]),
            other => Ok(vec![other]),
        }
    }

    fn name(&self) -> &'static str {
        "user_aggregator"
    }
}

/// Records reply texts as assistant turns
pub struct AssistantTurnAggregator {
    conversation: Arc<Mutex<ConversationContext>>,
}

impl AssistantTurnAggregator {
    pub fn new(conversation: Arc<Mutex<ConversationContext>>) -> Self {
        Self { conversation }
    }
}

#[async_trait]
impl FrameProcessor for AssistantTurnAggregator {
    async fn process(&self, frame: Frame, _context: &mut ProcessorContext) -> Result<Vec<Frame>> {
        match frame {
            Frame::SynthesisText { text } => {
                self.conversation.lock().push_assistant(text.clone());
                Ok(vec![Frame::SynthesisText { text }])
            }
            Frame::Lifecycle(_) => Ok(vec![]),
            other => Ok(vec![other]),
        }
    }

    fn name(&self) -> &'static str {
        "assistant_aggregator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voice_gateway_core::TurnRole;

    #[tokio::test]
    async fn turns_land_in_conversation_order() {
        let conversation = Arc::new(Mutex::new(ConversationContext::with_system_prompt("hi")));
        let user = UserTurnAggregator::new(conversation.clone());
        let assistant = AssistantTurnAggregator::new(conversation.clone());
        let mut ctx = ProcessorContext::new("call-1");

        user.process(
            Frame::TranscriptFinal {
                text: "what time is it".to_string(),
            },
            &mut ctx,
        )
        .await
        .unwrap();
        assistant
            .process(
                Frame::SynthesisText {
                    text: "it is noon".to_string(),
                },
                &mut ctx,
            )
            .await
            .unwrap();

        let roles: Vec<TurnRole> = conversation.lock().turns().iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![TurnRole::System, TurnRole::User, TurnRole::Assistant]
        );
        assert_eq!(ctx.turn_number, 1);
    }

    #[tokio::test]
    async fn unrelated_frames_pass_through() {
        let conversation = Arc::new(Mutex::new(ConversationContext::new()));
        let user = UserTurnAggregator::new(conversation.clone());
        let mut ctx = ProcessorContext::new("call-1");

        let out = user.process(Frame::SpeechStart, &mut ctx).await.unwrap();
        assert!(matches!(out.as_slice(), [Frame::SpeechStart]));
        assert_eq!(conversation.lock().turn_count(), 0);
    }
}
