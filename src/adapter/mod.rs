//! Transport adapters: the boundary between a chat platform and the driver.
//!
//! An adapter never calls back into the driver synchronously from within
//! `send`/`ask_text`/`ask_choice` — those are purely outbound. Inbound
//! events (a platform message, a button press) are the adapter's own
//! responsibility to translate into a [`crate::driver::Driver::resume`] or
//! [`crate::driver::Driver::start`] call, on whatever schedule the platform
//! delivers them.

pub mod http;
pub mod memory;

use async_trait::async_trait;

use crate::scenario::ChoiceOption;
use crate::store::UserKey;

/// The known, closed set of adapter backends an [`crate::config::EngineConfig`]
/// can select. Unlike the block-kind vocabulary this is expected to grow,
/// but it stays a closed enum rather than a free-form string: an unknown
/// value is a fatal startup error, not a silently-ignored typo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    Memory,
    Webhook,
}

impl std::str::FromStr for AdapterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "channel" => Ok(AdapterKind::Memory),
            "webhook" | "http" => Ok(AdapterKind::Webhook),
            other => Err(format!("unsupported adapter: {other}")),
        }
    }
}

#[async_trait]
pub trait TransportAdapter: Send + Sync {
    /// Send a message with no expectation of a reply.
    async fn send(&self, user: &UserKey, text: &str);

    /// Prompt for free text. Returns immediately; the reply arrives later
    /// as a `resume` call carrying the raw text.
    async fn ask_text(&self, user: &UserKey, prompt: &str);

    /// Prompt for a choice among `options`. Only `id`/`label` are exposed
    /// to the platform; `value` never leaves the process. Returns
    /// immediately; the reply arrives later as a `resume` call carrying the
    /// chosen option's `id`.
    async fn ask_choice(&self, user: &UserKey, prompt: &str, options: &[ChoiceOption]);
}
