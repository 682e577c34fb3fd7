//! # Scenario Engine
//!
//! A directed-graph execution engine for conversational bot scenarios: a
//! scenario author builds a graph of typed blocks (`start`, `sendMessage`,
//! `getMessage`, `choice`, `condition`, `apiRequest`, `final`), and this
//! crate validates that graph, then drives one dialog per user through it
//! as a two-phase state machine: an auto-advance loop that runs blocks
//! until one needs external input, and a suspended phase that waits for a
//! `resume` call carrying that input.
//!
//! ## Modules
//!
//! - **scenario**: the document model and three-pass validator. A
//!   [`Scenario`] only exists once validated.
//! - **store**: pluggable, per-user-key session persistence
//!   ([`store::StateStore`]), with an in-memory backend and an optional
//!   Redis-backed one behind the `redis-store` feature.
//! - **condition**: the restricted boolean/comparison expression evaluator
//!   a `condition` block's branch decision is made with.
//! - **adapter**: the transport boundary ([`adapter::TransportAdapter`])
//!   between a chat platform and the driver, with an in-process channel
//!   adapter and a synchronous webhook adapter.
//! - **driver**: the state machine itself ([`driver::Driver`]).
//!
//! ## Example
//!
//! ```rust,no_run
//! use scenario_engine::scenario::{RawDocument, Scenario};
//! use scenario_engine::store::{MemoryStore, UserKey};
//! use scenario_engine::adapter::memory::ChannelAdapter;
//! use scenario_engine::driver::Driver;
//! use std::sync::Arc;
//! use std::collections::HashMap;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let raw = std::fs::read_to_string("scenario.json")?;
//! let doc: RawDocument = serde_json::from_str(&raw)?;
//! let scenario = Arc::new(Scenario::validate(doc)?);
//!
//! let (adapter, mut events) = ChannelAdapter::new();
//! let driver = Driver::new(scenario, MemoryStore::new(), adapter);
//!
//! driver.start(UserKey::new("u1"), HashMap::new()).await;
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod condition;
pub mod config;
pub mod driver;
pub mod error;
mod http;
pub mod retry;
pub mod scenario;
pub mod store;

pub use error::{DriverError, StoreError, ValidationError};
pub use scenario::Scenario;

/// Convenience module re-exporting the types most callers need.
pub mod prelude {
    pub use crate::adapter::{AdapterKind, TransportAdapter};
    pub use crate::config::{Cli, EngineConfig};
    pub use crate::driver::{Driver, Session, Step};
    pub use crate::scenario::{Block, BlockKind, RawDocument, Scenario, Value, VarType};
    pub use crate::store::{StateStore, UserKey};
}
