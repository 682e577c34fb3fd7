//! Synchronous HTTP adapter: a webhook endpoint where the driver's output
//! for this request is collected and returned as the HTTP response body,
//! rather than delivered out-of-band the way a polling/long-lived platform
//! connection would.
//!
//! Outbound calls made while handling one request are accumulated on a
//! task-local buffer (`OUTBOUND`) rather than threaded explicitly through
//! every call site, since `TransportAdapter`'s methods take no request
//! context parameter by contract.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use axum::routing::post;
use axum::Router;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::TransportAdapter;
use crate::scenario::ChoiceOption;
use crate::store::UserKey;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    Message { text: String },
    AskText { prompt: String },
    AskChoice {
        prompt: String,
        options: Vec<ChoiceOptionView>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ChoiceOptionView {
    pub id: String,
    pub label: String,
}

tokio::task_local! {
    static OUTBOUND: Arc<Mutex<Vec<OutboundEvent>>>;
}

pub struct WebhookAdapter;

impl WebhookAdapter {
    pub fn new() -> Self {
        WebhookAdapter
    }

    /// Run `body` with a fresh outbound buffer installed, returning
    /// whatever events were recorded while it ran. Used by the webhook
    /// handler to turn one driver call into one HTTP response.
    pub async fn scoped<F, T>(body: F) -> (T, Vec<OutboundEvent>)
    where
        F: std::future::Future<Output = T>,
    {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let result = OUTBOUND.scope(buffer.clone(), body).await;
        let events = buffer.lock().await.clone();
        (result, events)
    }
}

impl Default for WebhookAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TransportAdapter for WebhookAdapter {
    async fn send(&self, _user: &UserKey, text: &str) {
        record(OutboundEvent::Message { text: text.to_string() }).await;
    }

    async fn ask_text(&self, _user: &UserKey, prompt: &str) {
        record(OutboundEvent::AskText { prompt: prompt.to_string() }).await;
    }

    async fn ask_choice(&self, _user: &UserKey, prompt: &str, options: &[ChoiceOption]) {
        let options = options
            .iter()
            .map(|o| ChoiceOptionView {
                id: o.id.clone(),
                label: o.label.clone(),
            })
            .collect();
        record(OutboundEvent::AskChoice {
            prompt: prompt.to_string(),
            options,
        })
        .await;
    }
}

async fn record(event: OutboundEvent) {
    if let Ok(buffer) = OUTBOUND.try_with(|b| b.clone()) {
        buffer.lock().await.push(event);
    } else {
        tracing::warn!("webhook adapter call made outside a request scope, event dropped");
    }
}

#[derive(Debug, Deserialize)]
struct ResumeRequest {
    user: String,
    input: String,
}

#[derive(Debug, Serialize)]
struct WebhookResponse {
    events: Vec<OutboundEvent>,
}

/// Build the axum router for a webhook adapter wired to `resume`.
///
/// `resume_fn` is the driver's `resume` call, captured as a closure so this
/// module has no generic dependency on a concrete `StateStore`/`Driver`
/// instantiation.
pub fn router<F, Fut>(resume_fn: F) -> Router
where
    F: Fn(UserKey, String) -> Fut + Clone + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    Router::new()
        .route("/resume", post(handle_resume::<F, Fut>))
        .with_state(resume_fn)
}

async fn handle_resume<F, Fut>(
    State(resume_fn): State<F>,
    Json(req): Json<ResumeRequest>,
) -> Json<WebhookResponse>
where
    F: Fn(UserKey, String) -> Fut + Clone + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let (_, events) = WebhookAdapter::scoped(resume_fn(UserKey::new(req.user), req.input)).await;
    Json(WebhookResponse { events })
}
