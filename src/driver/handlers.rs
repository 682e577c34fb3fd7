//! The seven per-block-kind handlers. Each one inspects (and may mutate)
//! the in-memory session and returns a [`Transition`]; none of them saves
//! anything themselves, so there is no handler that can forget to persist
//! a state change — the driver's post-handler save is the single place
//! that happens.

use std::sync::LazyLock;

use tokio_util::sync::CancellationToken;

use crate::adapter::TransportAdapter;
use crate::condition;
use crate::error::DriverError;
use crate::http;
use crate::retry::{retry_with_backoff_conditional, RetryConfig};
use crate::scenario::{Block, BlockKind, Scenario, Value, VarType};
use crate::store::UserKey;

use super::template::substitute;
use super::{Session, Step, Transition, RESERVED_VARIABLE_KEYS};

static HTTP_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(http::create_shared_client);

#[allow(clippy::too_many_arguments)]
pub(crate) async fn dispatch<A: TransportAdapter>(
    scenario: &Scenario,
    adapter: &A,
    user: &UserKey,
    block: &Block,
    mut session: Session,
    input: Option<String>,
    cancellation: &CancellationToken,
) -> (Transition, Session) {
    let transition = match &block.kind {
        BlockKind::Start => Transition::Continue,
        BlockKind::SendMessage { message } => {
            handle_send_message(adapter, user, &mut session, message, cancellation).await
        }
        BlockKind::GetMessage {
            message,
            var,
            var_type,
        } => {
            handle_get_message(adapter, user, &mut session, message, var, *var_type, input, cancellation).await
        }
        BlockKind::Choice {
            prompt,
            var,
            options,
        } => {
            handle_choice(adapter, user, &mut session, block, prompt, var, options, input, cancellation).await
        }
        BlockKind::Condition { condition: expr } => handle_condition(block, &mut session, expr),
        BlockKind::ApiRequest {
            url,
            method,
            headers,
            body,
            variables,
        } => {
            handle_api_request(block, &mut session, url, method, headers, body, variables, cancellation).await
        }
        BlockKind::Final => handle_final(scenario, adapter, user, &mut session, cancellation).await,
    };

    (transition, session)
}

/// Skip the outbound call entirely when the caller has already cancelled —
/// an adapter call is best-effort (spec: "logged; not propagated"), so a
/// cancelled token just means this particular send never goes out.
fn cancelled_outbound(block_kind: &'static str, cancellation: &CancellationToken) -> bool {
    if cancellation.is_cancelled() {
        tracing::warn!(block_kind, "skipping adapter call, cancelled by caller-supplied token");
        true
    } else {
        false
    }
}

async fn handle_send_message<A: TransportAdapter>(
    adapter: &A,
    user: &UserKey,
    session: &mut Session,
    message: &str,
    cancellation: &CancellationToken,
) -> Transition {
    if !cancelled_outbound("sendMessage", cancellation) {
        let text = substitute(message, &session.variables);
        adapter.send(user, &text).await;
    }
    Transition::Continue
}

fn handle_condition(block: &Block, session: &mut Session, expr: &str) -> Transition {
    let result = condition::eval(expr, &session.variables);
    let idx = if result { 0 } else { 1 };
    match block.outgoing.get(idx) {
        Some(next) => {
            session.current_block = *next;
            Transition::ManualSwitch
        }
        None => {
            tracing::warn!(block = %block.id, result, "condition branch missing, ending dialog");
            Transition::Break
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_get_message<A: TransportAdapter>(
    adapter: &A,
    user: &UserKey,
    session: &mut Session,
    message: &str,
    var: &str,
    var_type: VarType,
    input: Option<String>,
    cancellation: &CancellationToken,
) -> Transition {
    match (session.step, input) {
        (Step::Prompting, _) => {
            if !cancelled_outbound("getMessage", cancellation) {
                let prompt = substitute(message, &session.variables);
                adapter.ask_text(user, &prompt).await;
            }
            session.step = Step::AwaitingInput;
            Transition::Wait
        }
        (Step::AwaitingInput, Some(raw)) => match coerce(&raw, var_type) {
            Ok(value) => {
                session.variables.insert(var.to_string(), value);
                session.step = Step::Prompting;
                Transition::Continue
            }
            Err(_) => {
                if !cancelled_outbound("getMessage", cancellation) {
                    adapter
                        .send(user, "That doesn't look right, please try again.")
                        .await;
                }
                Transition::Wait
            }
        },
        (Step::AwaitingInput, None) => Transition::Wait,
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_choice<A: TransportAdapter>(
    adapter: &A,
    user: &UserKey,
    session: &mut Session,
    block: &Block,
    prompt: &str,
    var: &str,
    options: &[crate::scenario::ChoiceOption],
    input: Option<String>,
    cancellation: &CancellationToken,
) -> Transition {
    match (session.step, input) {
        (Step::Prompting, _) => {
            if !cancelled_outbound("choice", cancellation) {
                let prompt = substitute(prompt, &session.variables);
                adapter.ask_choice(user, &prompt, options).await;
            }
            session.step = Step::AwaitingInput;
            Transition::Wait
        }
        (Step::AwaitingInput, Some(selected_id)) => {
            match options.iter().position(|o| o.id == selected_id) {
                Some(idx) => {
                    session.variables.insert(var.to_string(), options[idx].value.clone());
                    match block.outgoing.get(idx) {
                        Some(next) => {
                            session.current_block = *next;
                            Transition::ManualSwitch
                        }
                        None => Transition::Break,
                    }
                }
                None => {
                    if !cancelled_outbound("choice", cancellation) {
                        adapter
                            .send(user, "That's not one of the options, please choose again.")
                            .await;
                    }
                    Transition::Wait
                }
            }
        }
        (Step::AwaitingInput, None) => Transition::Wait,
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_api_request(
    block: &Block,
    session: &mut Session,
    url: &str,
    method: &str,
    headers: &std::collections::HashMap<String, String>,
    body: &Option<serde_json::Value>,
    variables: &std::collections::HashMap<String, String>,
    cancellation: &CancellationToken,
) -> Transition {
    let url = substitute(url, &session.variables);
    let config = RetryConfig::default();

    let call = retry_with_backoff_conditional(config, || {
        let url = url.clone();
        let method = method.to_string();
        let headers = headers.clone();
        let body = body.clone();
        async move { perform_request(&url, &method, &headers, &body).await }
    });

    // A cancelled token is indistinguishable from a transport failure: both
    // route through the failure branch (spec: "timeout is indistinguishable
    // from transport failure").
    let response = tokio::select! {
        result = call => result,
        _ = cancellation.cancelled() => {
            tracing::warn!(block = %block.id, url, "apiRequest cancelled by caller-supplied token");
            Err(DriverError::Cancelled)
        }
    };

    match response {
        Ok(json) => {
            if let Some(obj) = json.as_object() {
                for (field, var_name) in variables {
                    if let Some(v) = obj.get(field) {
                        if let Ok(value) = serde_json::from_value::<Value>(v.clone()) {
                            session.variables.insert(var_name.clone(), value);
                        }
                    }
                }
            }
            route_branch(block, session, 0)
        }
        Err(_) => route_branch(block, session, 1),
    }
}

fn route_branch(block: &Block, session: &mut Session, idx: usize) -> Transition {
    match block.outgoing.get(idx) {
        Some(next) => {
            session.current_block = *next;
            Transition::ManualSwitch
        }
        None => Transition::Break,
    }
}

async fn perform_request(
    url: &str,
    method: &str,
    headers: &std::collections::HashMap<String, String>,
    body: &Option<serde_json::Value>,
) -> Result<serde_json::Value, DriverError> {
    let method = reqwest::Method::from_bytes(method.as_bytes()).unwrap_or(reqwest::Method::GET);
    let mut request = HTTP_CLIENT.request(method, url);
    for (k, v) in headers {
        request = request.header(k, v);
    }
    if let Some(body) = body {
        request = request.json(body);
    }

    let response = request.send().await.map_err(DriverError::Transport)?;
    if !response.status().is_success() {
        let err = response.error_for_status().unwrap_err();
        return Err(DriverError::Transport(err));
    }
    response
        .json::<serde_json::Value>()
        .await
        .map_err(DriverError::Transport)
}

async fn handle_final<A: TransportAdapter>(
    scenario: &Scenario,
    adapter: &A,
    user: &UserKey,
    session: &mut Session,
    cancellation: &CancellationToken,
) -> Transition {
    let _ = scenario;
    if !cancelled_outbound("final", cancellation) {
        let mut summary = String::from("Диалог завершён. Собранные данные:\n");
        let mut keys: Vec<&String> = session
            .variables
            .keys()
            .filter(|k| !RESERVED_VARIABLE_KEYS.contains(&k.as_str()))
            .collect();
        keys.sort();
        for key in keys {
            let value = &session.variables[key];
            summary.push_str(&format!("{key}: {}\n", value.as_display()));
        }
        adapter.send(user, &summary).await;
    }
    Transition::Break
}

fn coerce(raw: &str, var_type: VarType) -> Result<Value, ()> {
    match var_type {
        VarType::String => Ok(Value::Str(raw.to_string())),
        VarType::Number => raw.trim().parse::<f64>().map(Value::Num).map_err(|_| ()),
        VarType::Boolean => {
            let lowered = raw.trim().to_lowercase();
            if ["true", "1", "yes"].contains(&lowered.as_str()) {
                Ok(Value::Bool(true))
            } else if ["false", "0", "no"].contains(&lowered.as_str()) {
                Ok(Value::Bool(false))
            } else {
                Err(())
            }
        }
    }
}
