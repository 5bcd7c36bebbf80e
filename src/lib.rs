//! Flashpath - flash-loan arbitrage detection, evaluation, and scheduling.
//!
//! This crate finds cross-DEX price discrepancies, nets them against the full
//! cost stack (flash-loan fees, gas, slippage, bridge fees), plans
//! liquidity-split routes under a slippage cap, gates candidates on live
//! network conditions, and schedules admitted trades with bounded concurrency
//! and a hard batch deadline.
//!
//! # Architecture
//!
//! The pipeline runs once per scan tick:
//!
//! 1. **`detector`** - Pluggable detectors over an immutable price snapshot
//!    - `SimpleArbitrage` - the same pair priced apart on two venues
//!    - `TriangularArbitrage` - three-leg cycles whose prices compound past 1
//! 2. **`planner`** - Slippage-capped route splitting with a TTL cache and
//!    flash-loan funding selection across providers
//! 3. **`evaluator`** - Decimal-exact net profit from the gross spread
//! 4. **`admission`** - Gas-tiered profit floors, congestion waits, and
//!    feedback from the rolling success rate
//! 5. **`scheduler`** - Strategy batches, in-flight dedup, semaphore-bounded
//!    execution against a shared deadline
//!
//! # Modules
//!
//! - [`config`] - Configuration loading from TOML files
//! - [`domain`] - Value types: quotes, opportunities, routes, results
//! - [`port`] - Trait seams to feeds, providers, oracles, and executors
//! - [`provider`] - Config-driven provider implementations and paper execution
//! - [`engine`] - The scan-cycle orchestrator and run loop
//! - [`error`] - Error types for the crate
//!
//! # Example
//!
//! ```no_run
//! use flashpath::config::Config;
//! use flashpath::detector::{DetectorRegistry, SimpleArbitrage};
//!
//! let mut registry = DetectorRegistry::new();
//! registry.register(Box::new(SimpleArbitrage::new(Default::default())));
//! ```

pub mod admission;
pub mod config;
pub mod detector;
pub mod domain;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod planner;
pub mod port;
pub mod provider;
pub mod scheduler;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
