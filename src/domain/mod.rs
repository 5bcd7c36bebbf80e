//! Venue-agnostic domain types.
//!
//! Everything on the money path is `rust_decimal::Decimal`; percentage-like
//! fields are fractions (`0.005` = 0.5%).

pub mod decision;
pub mod evaluation;
pub mod execution;
pub mod flashloan;
pub mod ids;
pub mod money;
pub mod opportunity;
pub mod quote;
pub mod route;
pub mod stats;

pub use decision::{
    AdmissionDecision, GasCategory, GasSnapshot, GasTiers, MempoolSnapshot, Verdict,
};
pub use evaluation::Evaluation;
pub use execution::{ExecutionBatch, ExecutionOutcome, ExecutionResult, ExecutionStrategy};
pub use flashloan::{FlashLoanQuote, FundingSource};
pub use ids::{Chain, DexId, Fingerprint, TokenPair};
pub use money::{Amount, Pct, Price};
pub use opportunity::{Opportunity, OpportunityBuilder, OpportunityKind, OpportunityLeg};
pub use quote::{PriceQuote, PriceSnapshot};
pub use route::{LiquidityPool, Route, RouteError, RouteSegment};
pub use stats::{BatchReport, RollingSuccess, SessionStats};
