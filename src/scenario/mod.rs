//! Scenario document model and validator.
//!
//! A [`Scenario`] is only ever constructed through [`Scenario::validate`]:
//! there is no public constructor that skips the three-pass check, so any
//! `Scenario` value in hand is known-good.

mod document;
mod validate;

pub use document::{
    Block, BlockId, BlockKind, ChoiceOption, GlobalVariable, RawDocument, Value, VarType,
};
pub use validate::validate;

use crate::error::ValidationError;
use std::collections::HashMap;
use std::sync::Arc;

/// A validated scenario graph. Cheap to clone (backed by `Arc`) so it can be
/// shared across every concurrently running dialog.
#[derive(Debug, Clone)]
pub struct Scenario {
    inner: Arc<ScenarioInner>,
}

#[derive(Debug)]
struct ScenarioInner {
    bot_name: String,
    start: BlockId,
    r#final: BlockId,
    globals: Vec<GlobalVariable>,
    blocks: HashMap<BlockId, Block>,
}

impl Scenario {
    /// Parse and validate a raw JSON scenario document.
    pub fn validate(doc: RawDocument) -> Result<Scenario, ValidationError> {
        validate::validate(doc)
    }

    pub(crate) fn from_parts(
        bot_name: String,
        start: BlockId,
        r#final: BlockId,
        globals: Vec<GlobalVariable>,
        blocks: HashMap<BlockId, Block>,
    ) -> Scenario {
        Scenario {
            inner: Arc::new(ScenarioInner {
                bot_name,
                start,
                r#final,
                globals,
                blocks,
            }),
        }
    }

    pub fn bot_name(&self) -> &str {
        &self.inner.bot_name
    }

    pub fn start(&self) -> BlockId {
        self.inner.start
    }

    pub fn r#final(&self) -> BlockId {
        self.inner.r#final
    }

    pub fn globals(&self) -> &[GlobalVariable] {
        &self.inner.globals
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.inner.blocks.get(&id)
    }

    /// Re-project the validated scenario back into the raw document shape,
    /// used by the round-trip property test: re-serializing and
    /// re-validating a validated scenario must succeed and produce an
    /// equivalent graph.
    pub fn to_document(&self) -> RawDocument {
        document::to_document(
            &self.inner.bot_name,
            self.inner.start,
            self.inner.r#final,
            &self.inner.globals,
            &self.inner.blocks,
        )
    }
}
