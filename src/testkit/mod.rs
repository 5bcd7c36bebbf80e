//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`ports`] — Deterministic collaborator doubles: `ScriptedFeed`,
//!   `StaticGasOracle`, `FixedBridge`, `MemoryPatternStore`,
//!   `RecordingSink`, `ScriptedExecutor`.
//! - [`domain`] — Builders for domain primitives: quotes, opportunities,
//!   evaluations.

pub mod domain;
pub mod ports;

pub use domain::{evaluation_with_profit, quote, quote_on, simple_opportunity};
pub use ports::{
    ExecutorBehavior, FixedBridge, MemoryPatternStore, RecordingSink, ScriptedExecutor,
    ScriptedFeed, StaticGasOracle,
};
