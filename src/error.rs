//! Error taxonomy for the scenario engine.
//!
//! Errors are split by the component boundary that raises them rather than
//! collapsed into one flat enum: a [`ValidationError`] always carries the
//! message/path/block triad a scenario author needs to locate the offending
//! block, while [`StoreError`] and [`DriverError`] have no use for that
//! shape at all.

use thiserror::Error;

use crate::scenario::BlockId;

/// Raised while parsing or validating a scenario document.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
    pub path: String,
    pub block_id: Option<BlockId>,
    pub block_type: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        let mut parts = Vec::new();
        if !self.path.is_empty() {
            parts.push(self.path.clone());
        }
        if let Some(id) = &self.block_id {
            parts.push(format!("block {id}"));
        }
        if let Some(t) = &self.block_type {
            parts.push(format!("type {t}"));
        }
        if !parts.is_empty() {
            write!(f, " ({})", parts.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn new(message: impl Into<String>, path: impl Into<String>) -> Self {
        ValidationError {
            message: message.into(),
            path: path.into(),
            block_id: None,
            block_type: None,
        }
    }

    pub fn at_block(
        message: impl Into<String>,
        path: impl Into<String>,
        block_id: BlockId,
        block_type: impl Into<String>,
    ) -> Self {
        ValidationError {
            message: message.into(),
            path: path.into(),
            block_id: Some(block_id),
            block_type: Some(block_type.into()),
        }
    }
}

/// Raised by a [`crate::store::StateStore`] implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("state store backend error: {0}")]
    Backend(String),

    #[error("state store serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        StoreError::Backend(msg.into())
    }
}

/// Raised internally by the driver. Never surfaced across the adapter
/// boundary: every handler-visible failure either routes to a scenario
/// branch or is logged and the current event is dropped.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("state store failure: {0}")]
    Store(#[from] StoreError),

    #[error("missing block referenced: {0}")]
    MissingBlock(BlockId),

    #[error("coercion error: {0}")]
    Coercion(String),

    #[error("operation cancelled by caller-supplied token")]
    Cancelled,
}

impl DriverError {
    pub fn coercion(msg: impl Into<String>) -> Self {
        DriverError::Coercion(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_formats_full_triad() {
        let id = BlockId::nil();
        let err = ValidationError::at_block("options count mismatch", "Blocks[2].Params.options", id, "choice");
        let rendered = err.to_string();
        assert!(rendered.starts_with("options count mismatch"));
        assert!(rendered.contains("Blocks[2].Params.options"));
        assert!(rendered.contains("choice"));
    }

    #[test]
    fn validation_error_without_block_context() {
        let err = ValidationError::new("BotName must be a string", "BotName");
        assert_eq!(err.to_string(), "BotName must be a string (BotName)");
    }

    #[test]
    fn store_error_backend_constructor() {
        let err = StoreError::backend("connection refused");
        assert!(matches!(err, StoreError::Backend(_)));
    }
}
