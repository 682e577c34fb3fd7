//! In-process adapter over `tokio::sync::mpsc`, used by the test suite and
//! by in-browser scenario previews where the "platform" is just the other
//! end of a channel in the same process.

use tokio::sync::mpsc;

use super::TransportAdapter;
use crate::scenario::ChoiceOption;
use crate::store::UserKey;

/// An outbound event delivered to whoever is driving the preview UI or test
/// harness on the other end of the channel.
#[derive(Debug, Clone)]
pub enum OutboundEvent {
    Message { user: UserKey, text: String },
    AskText { user: UserKey, prompt: String },
    AskChoice {
        user: UserKey,
        prompt: String,
        options: Vec<(String, String)>,
    },
}

pub struct ChannelAdapter {
    sender: mpsc::UnboundedSender<OutboundEvent>,
}

impl ChannelAdapter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (ChannelAdapter { sender }, receiver)
    }
}

#[async_trait::async_trait]
impl TransportAdapter for ChannelAdapter {
    async fn send(&self, user: &UserKey, text: &str) {
        let _ = self.sender.send(OutboundEvent::Message {
            user: user.clone(),
            text: text.to_string(),
        });
    }

    async fn ask_text(&self, user: &UserKey, prompt: &str) {
        let _ = self.sender.send(OutboundEvent::AskText {
            user: user.clone(),
            prompt: prompt.to_string(),
        });
    }

    async fn ask_choice(&self, user: &UserKey, prompt: &str, options: &[ChoiceOption]) {
        let options = options
            .iter()
            .map(|o| (o.id.clone(), o.label.clone()))
            .collect();
        let _ = self.sender.send(OutboundEvent::AskChoice {
            user: user.clone(),
            prompt: prompt.to_string(),
            options,
        });
    }
}
