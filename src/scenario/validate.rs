//! Three-pass scenario validation: top-level fields, per-block structure
//! and parameters, then whole-graph integrity.
//!
//! Ported from the bot-config parser's `BotConfigParser`: pass one checks
//! `BotName`/`Start`/`Final`/`Blocks` shape, pass two dispatches each block
//! through a per-type structural and parameter check, pass three checks
//! that every edge target exists, that `Start`/`Final` point at blocks of
//! the matching type, and that a `choice` block's `Out` count matches its
//! option count.

use std::collections::{HashMap, HashSet};

use serde_json::Value as Json;
use uuid::Uuid;

use super::document::{
    Block, BlockId, BlockKind, ChoiceOption, GlobalVariable, RawDocument, Value, VarType,
};
use super::Scenario;
use crate::error::ValidationError;

pub fn validate(doc: RawDocument) -> Result<Scenario, ValidationError> {
    let bot_name = expect_string(&doc.bot_name, "BotName")?;
    let start = expect_uuid(&doc.start, "Start")?;
    let r#final = expect_uuid(&doc.r#final, "Final")?;

    let globals = parse_globals(&doc.global_variables)?;

    let raw_blocks = doc
        .blocks
        .as_array()
        .ok_or_else(|| ValidationError::new("Blocks must be an array", "Blocks"))?;

    let mut blocks = HashMap::with_capacity(raw_blocks.len());
    let mut seen_ids = HashSet::with_capacity(raw_blocks.len());

    for (idx, raw) in raw_blocks.iter().enumerate() {
        let path = format!("Blocks[{idx}]");
        let block = parse_block(raw, &path)?;
        if !seen_ids.insert(block.id) {
            return Err(ValidationError::at_block(
                "duplicate Block_id",
                path,
                block.id,
                block.kind.type_name(),
            ));
        }
        blocks.insert(block.id, block);
    }

    validate_graph_integrity(&blocks, BlockId(start), BlockId(r#final))?;

    Ok(Scenario::from_parts(
        bot_name,
        BlockId(start),
        BlockId(r#final),
        globals,
        blocks,
    ))
}

fn expect_string(value: &Json, path: &str) -> Result<String, ValidationError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ValidationError::new(format!("{path} must be a string"), path))
}

fn expect_uuid(value: &Json, path: &str) -> Result<Uuid, ValidationError> {
    let raw = expect_string(value, path)?;
    Uuid::parse_str(&raw).map_err(|_| ValidationError::new(format!("{path} must be a valid UUID"), path))
}

fn parse_globals(value: &Json) -> Result<Vec<GlobalVariable>, ValidationError> {
    let arr = match value {
        Json::Null => return Ok(Vec::new()),
        Json::Array(a) => a,
        _ => return Err(ValidationError::new("GlobalVariables must be an array", "GlobalVariables")),
    };

    let mut globals = Vec::with_capacity(arr.len());
    let mut names = HashSet::with_capacity(arr.len());

    for (idx, raw) in arr.iter().enumerate() {
        let path = format!("GlobalVariables[{idx}]");
        let obj = raw
            .as_object()
            .ok_or_else(|| ValidationError::new("variable must be an object", &path))?;
        let name = obj
            .get("name")
            .and_then(Json::as_str)
            .ok_or_else(|| ValidationError::new("name is required", format!("{path}.name")))?
            .to_string();
        if !names.insert(name.clone()) {
            return Err(ValidationError::new(
                format!("duplicate global variable name: {name}"),
                format!("{path}.name"),
            ));
        }
        let var_type = parse_var_type(
            obj.get("type")
                .and_then(Json::as_str)
                .ok_or_else(|| ValidationError::new("type is required", format!("{path}.type")))?,
            &format!("{path}.type"),
        )?;
        let default = match obj.get("default") {
            None | Some(Json::Null) => None,
            Some(v) => Some(value_for_type(v, var_type, &format!("{path}.default"))?),
        };
        let description = obj
            .get("description")
            .and_then(Json::as_str)
            .unwrap_or_default()
            .to_string();
        globals.push(GlobalVariable {
            name,
            var_type,
            default,
            description,
        });
    }

    Ok(globals)
}

fn parse_var_type(raw: &str, path: &str) -> Result<VarType, ValidationError> {
    match raw {
        "string" => Ok(VarType::String),
        "number" => Ok(VarType::Number),
        "boolean" => Ok(VarType::Boolean),
        other => Err(ValidationError::new(
            format!("unknown variable type: {other}"),
            path,
        )),
    }
}

fn value_for_type(raw: &Json, var_type: VarType, path: &str) -> Result<Value, ValidationError> {
    match (var_type, raw) {
        (VarType::String, Json::String(s)) => Ok(Value::Str(s.clone())),
        (VarType::Number, Json::Number(n)) => Ok(Value::Num(n.as_f64().unwrap_or(0.0))),
        (VarType::Boolean, Json::Bool(b)) => Ok(Value::Bool(*b)),
        _ => Err(ValidationError::new(
            "default value does not match declared type",
            path,
        )),
    }
}

struct Connections {
    incoming: Vec<BlockId>,
    outgoing: Vec<BlockId>,
}

fn parse_connections(obj: &serde_json::Map<String, Json>, path: &str) -> Result<Connections, ValidationError> {
    let conns = obj
        .get("Connections")
        .and_then(Json::as_object)
        .ok_or_else(|| ValidationError::new("Connections is required", format!("{path}.Connections")))?;

    let incoming = parse_uuid_list(conns.get("In"), &format!("{path}.Connections.In"))?;
    let outgoing = parse_uuid_list(conns.get("Out"), &format!("{path}.Connections.Out"))?;

    Ok(Connections { incoming, outgoing })
}

fn parse_uuid_list(value: Option<&Json>, path: &str) -> Result<Vec<BlockId>, ValidationError> {
    let arr = value
        .and_then(Json::as_array)
        .ok_or_else(|| ValidationError::new("must be an array", path))?;
    arr.iter()
        .map(|v| {
            v.as_str()
                .and_then(|s| Uuid::parse_str(s).ok())
                .map(BlockId)
                .ok_or_else(|| ValidationError::new("must be a valid UUID", path))
        })
        .collect()
}

fn parse_block(raw: &Json, path: &str) -> Result<Block, ValidationError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| ValidationError::new("block must be an object", path))?;

    let id_str = obj
        .get("Block_id")
        .and_then(Json::as_str)
        .ok_or_else(|| ValidationError::new("Block_id is required", format!("{path}.Block_id")))?;
    let id = BlockId(
        Uuid::parse_str(id_str)
            .map_err(|_| ValidationError::new("Block_id must be a valid UUID", format!("{path}.Block_id")))?,
    );

    let block_type = obj
        .get("Type")
        .and_then(Json::as_str)
        .ok_or_else(|| ValidationError::new("Type is required", format!("{path}.Type")))?;

    let params = obj
        .get("Params")
        .and_then(Json::as_object)
        .ok_or_else(|| ValidationError::new("Params is required", format!("{path}.Params")))?;

    let connections = parse_connections(obj, path)?;

    let kind = parse_params(block_type, params, id, path)?;

    validate_connection_shape(&kind, &connections, id, path)?;

    Ok(Block {
        id,
        kind,
        incoming: connections.incoming,
        outgoing: connections.outgoing,
    })
}

fn parse_params(
    block_type: &str,
    params: &serde_json::Map<String, Json>,
    id: BlockId,
    path: &str,
) -> Result<BlockKind, ValidationError> {
    let field = |name: &str| -> Result<String, ValidationError> {
        params
            .get(name)
            .and_then(Json::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                ValidationError::at_block(
                    format!("Params.{name} is required"),
                    format!("{path}.Params.{name}"),
                    id,
                    block_type,
                )
            })
    };

    match block_type {
        "start" => Ok(BlockKind::Start),
        "final" => Ok(BlockKind::Final),
        "sendMessage" => Ok(BlockKind::SendMessage {
            message: field("message")?,
        }),
        "getMessage" => {
            let var_type = match params.get("type").and_then(Json::as_str) {
                Some(raw) => parse_var_type(raw, &format!("{path}.Params.type"))?,
                None => VarType::String,
            };
            Ok(BlockKind::GetMessage {
                message: field("message")?,
                var: field("var")?,
                var_type,
            })
        }
        "choice" => {
            let prompt = field("prompt")?;
            let var = field("var")?;
            let options_raw = params
                .get("options")
                .and_then(Json::as_array)
                .ok_or_else(|| {
                    ValidationError::at_block(
                        "Params.options is required",
                        format!("{path}.Params.options"),
                        id,
                        block_type,
                    )
                })?;
            let mut options = Vec::with_capacity(options_raw.len());
            let mut ids = HashSet::with_capacity(options_raw.len());
            for (idx, raw_opt) in options_raw.iter().enumerate() {
                let opt_obj = raw_opt.as_object().ok_or_else(|| {
                    ValidationError::at_block(
                        "option must be an object",
                        format!("{path}.Params.options[{idx}]"),
                        id,
                        block_type,
                    )
                })?;
                let opt_id = opt_obj
                    .get("id")
                    .and_then(Json::as_str)
                    .ok_or_else(|| {
                        ValidationError::at_block(
                            "option id is required",
                            format!("{path}.Params.options[{idx}].id"),
                            id,
                            block_type,
                        )
                    })?
                    .to_string();
                if !ids.insert(opt_id.clone()) {
                    return Err(ValidationError::at_block(
                        format!("duplicate option id: {opt_id}"),
                        format!("{path}.Params.options[{idx}].id"),
                        id,
                        block_type,
                    ));
                }
                let label = opt_obj
                    .get("label")
                    .and_then(Json::as_str)
                    .ok_or_else(|| {
                        ValidationError::at_block(
                            "option label is required",
                            format!("{path}.Params.options[{idx}].label"),
                            id,
                            block_type,
                        )
                    })?
                    .to_string();
                let value = opt_obj.get("value").cloned().unwrap_or(Json::String(opt_id.clone()));
                let value: Value = serde_json::from_value(value).map_err(|_| {
                    ValidationError::at_block(
                        "option value is not a valid string/number/boolean",
                        format!("{path}.Params.options[{idx}].value"),
                        id,
                        block_type,
                    )
                })?;
                options.push(ChoiceOption {
                    id: opt_id,
                    label,
                    value,
                });
            }
            Ok(BlockKind::Choice {
                prompt,
                var,
                options,
            })
        }
        "condition" => Ok(BlockKind::Condition {
            condition: field("condition")?,
        }),
        "apiRequest" => {
            let url = field("url")?;
            let method = params
                .get("method")
                .and_then(Json::as_str)
                .unwrap_or("GET")
                .to_uppercase();
            let headers = params
                .get("headers")
                .and_then(Json::as_object)
                .map(|m| {
                    m.iter()
                        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                        .collect()
                })
                .unwrap_or_default();
            let body = params.get("body").cloned();
            let variables = params
                .get("variables")
                .and_then(Json::as_object)
                .map(|m| {
                    m.iter()
                        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                        .collect()
                })
                .unwrap_or_default();
            Ok(BlockKind::ApiRequest {
                url,
                method,
                headers,
                body,
                variables,
            })
        }
        other => Err(ValidationError::at_block(
            format!("unknown Type: {other}"),
            format!("{path}.Type"),
            id,
            other,
        )),
    }
}

fn validate_connection_shape(
    kind: &BlockKind,
    connections: &Connections,
    id: BlockId,
    path: &str,
) -> Result<(), ValidationError> {
    let type_name = kind.type_name();
    match kind {
        BlockKind::Start => {
            if !connections.incoming.is_empty() {
                return Err(ValidationError::at_block(
                    "start block must have no incoming connections",
                    format!("{path}.Connections.In"),
                    id,
                    type_name,
                ));
            }
            if connections.outgoing.is_empty() {
                return Err(ValidationError::at_block(
                    "start block must have at least one outgoing connection",
                    format!("{path}.Connections.Out"),
                    id,
                    type_name,
                ));
            }
        }
        BlockKind::Final => {
            if connections.incoming.is_empty() {
                return Err(ValidationError::at_block(
                    "final block must have at least one incoming connection",
                    format!("{path}.Connections.In"),
                    id,
                    type_name,
                ));
            }
            if !connections.outgoing.is_empty() {
                return Err(ValidationError::at_block(
                    "final block must have no outgoing connections",
                    format!("{path}.Connections.Out"),
                    id,
                    type_name,
                ));
            }
        }
        BlockKind::SendMessage { .. } | BlockKind::GetMessage { .. } => {
            if connections.incoming.is_empty() {
                return Err(ValidationError::at_block(
                    "block must have at least one incoming connection",
                    format!("{path}.Connections.In"),
                    id,
                    type_name,
                ));
            }
            if connections.outgoing.is_empty() {
                return Err(ValidationError::at_block(
                    "block must have at least one outgoing connection",
                    format!("{path}.Connections.Out"),
                    id,
                    type_name,
                ));
            }
        }
        BlockKind::Condition { .. } => {
            if connections.incoming.is_empty() {
                return Err(ValidationError::at_block(
                    "condition block must have at least one incoming connection",
                    format!("{path}.Connections.In"),
                    id,
                    type_name,
                ));
            }
            if connections.outgoing.len() != 2 {
                return Err(ValidationError::at_block(
                    format!(
                        "condition block must have exactly 2 outgoing connections (true, false), found {}",
                        connections.outgoing.len()
                    ),
                    format!("{path}.Connections.Out"),
                    id,
                    type_name,
                ));
            }
        }
        BlockKind::Choice { .. } => {
            if connections.incoming.is_empty() {
                return Err(ValidationError::at_block(
                    "choice block must have at least one incoming connection",
                    format!("{path}.Connections.In"),
                    id,
                    type_name,
                ));
            }
            // Out-count-vs-options-count is checked at whole-graph integrity time.
        }
        BlockKind::ApiRequest { .. } => {
            if connections.incoming.is_empty() {
                return Err(ValidationError::at_block(
                    "apiRequest block must have at least one incoming connection",
                    format!("{path}.Connections.In"),
                    id,
                    type_name,
                ));
            }
            if connections.outgoing.len() != 2 {
                return Err(ValidationError::at_block(
                    format!(
                        "apiRequest block must have exactly 2 outgoing connections (success, failure), found {}",
                        connections.outgoing.len()
                    ),
                    format!("{path}.Connections.Out"),
                    id,
                    type_name,
                ));
            }
        }
    }
    Ok(())
}

fn validate_graph_integrity(
    blocks: &HashMap<BlockId, Block>,
    start: BlockId,
    r#final: BlockId,
) -> Result<(), ValidationError> {
    let start_block = blocks
        .get(&start)
        .ok_or_else(|| ValidationError::new("Start does not reference an existing block", "Start"))?;
    if !matches!(start_block.kind, BlockKind::Start) {
        return Err(ValidationError::new("Start must reference a start block", "Start"));
    }

    let final_block = blocks
        .get(&r#final)
        .ok_or_else(|| ValidationError::new("Final does not reference an existing block", "Final"))?;
    if !matches!(final_block.kind, BlockKind::Final) {
        return Err(ValidationError::new("Final must reference a final block", "Final"));
    }

    for block in blocks.values() {
        for target in block.outgoing.iter().chain(block.incoming.iter()) {
            if !blocks.contains_key(target) {
                return Err(ValidationError::at_block(
                    format!("connection references unknown block {target}"),
                    "Connections",
                    block.id,
                    block.kind.type_name(),
                ));
            }
        }

        if let BlockKind::Choice { options, .. } = &block.kind {
            if options.len() != block.outgoing.len() {
                return Err(ValidationError::at_block(
                    format!(
                        "choice block has {} option(s) but {} outgoing connection(s)",
                        options.len(),
                        block.outgoing.len()
                    ),
                    "Connections.Out",
                    block.id,
                    block.kind.type_name(),
                ));
            }
        }
    }

    Ok(())
}
