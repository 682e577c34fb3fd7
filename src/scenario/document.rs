//! Raw document shape (as parsed from JSON, before validation) and the
//! typed domain values a [`super::Scenario`] is built from.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// A block identifier. Newtype over [`Uuid`], matching the domain's
/// preference for typed wrappers over bare primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub Uuid);

impl BlockId {
    #[cfg(test)]
    pub fn nil() -> Self {
        BlockId(Uuid::nil())
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The declared type of a global variable or a `getMessage` coercion target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarType {
    String,
    Number,
    Boolean,
}

/// A runtime variable value, tagged by the three types the document format
/// supports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Str(String),
    Num(f64),
    Bool(bool),
}

impl Value {
    pub fn var_type(&self) -> VarType {
        match self {
            Value::Str(_) => VarType::String,
            Value::Num(_) => VarType::Number,
            Value::Bool(_) => VarType::Boolean,
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Num(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Value::Bool(b) => b.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalVariable {
    pub name: String,
    #[serde(rename = "type")]
    pub var_type: VarType,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: String,
    pub label: String,
    pub value: Value,
}

/// The parsed, per-type block parameters. Mirrors the closed block-kind
/// vocabulary the document format defines: `start`, `sendMessage`,
/// `getMessage`, `choice`, `condition`, `apiRequest`, `final`.
#[derive(Debug, Clone)]
pub enum BlockKind {
    Start,
    SendMessage {
        message: String,
    },
    GetMessage {
        message: String,
        var: String,
        var_type: VarType,
    },
    Choice {
        prompt: String,
        var: String,
        options: Vec<ChoiceOption>,
    },
    Condition {
        condition: String,
    },
    ApiRequest {
        url: String,
        method: String,
        headers: HashMap<String, String>,
        body: Option<serde_json::Value>,
        variables: HashMap<String, String>,
    },
    Final,
}

impl BlockKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            BlockKind::Start => "start",
            BlockKind::SendMessage { .. } => "sendMessage",
            BlockKind::GetMessage { .. } => "getMessage",
            BlockKind::Choice { .. } => "choice",
            BlockKind::Condition { .. } => "condition",
            BlockKind::ApiRequest { .. } => "apiRequest",
            BlockKind::Final => "final",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    pub incoming: Vec<BlockId>,
    pub outgoing: Vec<BlockId>,
}

/// The as-parsed JSON shape, before the three validation passes run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawDocument {
    #[serde(rename = "BotName")]
    pub bot_name: serde_json::Value,
    #[serde(rename = "Start")]
    pub start: serde_json::Value,
    #[serde(rename = "Final")]
    pub r#final: serde_json::Value,
    #[serde(rename = "GlobalVariables", default)]
    pub global_variables: serde_json::Value,
    #[serde(rename = "Blocks")]
    pub blocks: serde_json::Value,
}

pub fn to_document(
    bot_name: &str,
    start: BlockId,
    r#final: BlockId,
    globals: &[GlobalVariable],
    blocks: &HashMap<BlockId, Block>,
) -> RawDocument {
    let globals_json: Vec<serde_json::Value> = globals
        .iter()
        .map(|g| {
            serde_json::json!({
                "name": g.name,
                "type": match g.var_type {
                    VarType::String => "string",
                    VarType::Number => "number",
                    VarType::Boolean => "boolean",
                },
                "default": g.default,
                "description": g.description,
            })
        })
        .collect();

    let blocks_json: Vec<serde_json::Value> = blocks
        .values()
        .map(|b| {
            let params = match &b.kind {
                BlockKind::Start | BlockKind::Final => serde_json::json!({}),
                BlockKind::SendMessage { message } => serde_json::json!({"message": message}),
                BlockKind::GetMessage {
                    message,
                    var,
                    var_type,
                } => serde_json::json!({
                    "message": message,
                    "var": var,
                    "type": match var_type {
                        VarType::String => "string",
                        VarType::Number => "number",
                        VarType::Boolean => "boolean",
                    }
                }),
                BlockKind::Choice {
                    prompt,
                    var,
                    options,
                } => serde_json::json!({
                    "prompt": prompt,
                    "var": var,
                    "options": options,
                }),
                BlockKind::Condition { condition } => serde_json::json!({"condition": condition}),
                BlockKind::ApiRequest {
                    url,
                    method,
                    headers,
                    body,
                    variables,
                } => serde_json::json!({
                    "url": url,
                    "method": method,
                    "headers": headers,
                    "body": body,
                    "variables": variables,
                }),
            };
            serde_json::json!({
                "Block_id": b.id.0,
                "Type": b.kind.type_name(),
                "Params": params,
                "Connections": {
                    "In": b.incoming.iter().map(|i| i.0).collect::<Vec<_>>(),
                    "Out": b.outgoing.iter().map(|i| i.0).collect::<Vec<_>>(),
                }
            })
        })
        .collect();

    RawDocument {
        bot_name: serde_json::Value::String(bot_name.to_string()),
        start: serde_json::Value::String(start.0.to_string()),
        r#final: serde_json::Value::String(r#final.0.to_string()),
        global_variables: serde_json::Value::Array(globals_json),
        blocks: serde_json::Value::Array(blocks_json),
    }
}
