//! Execution batches and terminal results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use super::ids::Fingerprint;
use super::money::Amount;
use super::evaluation::Evaluation;

/// How a group of admitted opportunities is executed.
///
/// This enum is the single configuration point that replaces per-strategy
/// orchestrator binaries: one scheduler, four dispatch paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    FlashLoan,
    Wallet,
    CrossChain,
    Standard,
}

impl fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::FlashLoan => "flash_loan",
            Self::Wallet => "wallet",
            Self::CrossChain => "cross_chain",
            Self::Standard => "standard",
        };
        write!(f, "{s}")
    }
}

/// A group of admitted opportunities dispatched together.
///
/// Owned exclusively by the scheduler for its lifetime. `group_key`
/// identifies the sub-group: borrowed token for flash loans, chain pair for
/// cross-chain, empty otherwise.
#[derive(Debug)]
pub struct ExecutionBatch {
    pub id: Uuid,
    pub strategy: ExecutionStrategy,
    pub group_key: String,
    pub opportunities: Vec<Evaluation>,
    /// Shared deadline for every opportunity in the batch.
    pub deadline: std::time::Instant,
}

impl ExecutionBatch {
    pub fn new(
        strategy: ExecutionStrategy,
        group_key: impl Into<String>,
        deadline: std::time::Instant,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            strategy,
            group_key: group_key.into(),
            opportunities: Vec::new(),
            deadline,
        }
    }

    pub fn len(&self) -> usize {
        self.opportunities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opportunities.is_empty()
    }
}

/// Terminal outcome of one execution attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ExecutionOutcome {
    /// Transaction included and profitable.
    Success { profit_usd: Amount, tx_ref: String },
    /// On-chain revert or submission failure; loss is the gas spent.
    Failed { error: String, gas_cost_usd: Amount },
    /// Batch or sub-operation deadline elapsed before completion.
    Timeout,
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Realized profit, negative for failures that burned gas.
    pub fn realized_profit(&self) -> Amount {
        match self {
            Self::Success { profit_usd, .. } => *profit_usd,
            Self::Failed { gas_cost_usd, .. } => -*gas_cost_usd,
            Self::Timeout => Amount::ZERO,
        }
    }
}

/// Written exactly once per opportunity per attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub fingerprint: Fingerprint,
    pub outcome: ExecutionOutcome,
    pub gas_used: u64,
    pub execution_time: Duration,
    pub completed_at: DateTime<Utc>,
}

impl ExecutionResult {
    pub fn success(
        fingerprint: Fingerprint,
        profit_usd: Amount,
        tx_ref: impl Into<String>,
        gas_used: u64,
        execution_time: Duration,
    ) -> Self {
        Self {
            fingerprint,
            outcome: ExecutionOutcome::Success {
                profit_usd,
                tx_ref: tx_ref.into(),
            },
            gas_used,
            execution_time,
            completed_at: Utc::now(),
        }
    }

    pub fn failed(
        fingerprint: Fingerprint,
        error: impl Into<String>,
        gas_cost_usd: Amount,
        gas_used: u64,
        execution_time: Duration,
    ) -> Self {
        Self {
            fingerprint,
            outcome: ExecutionOutcome::Failed {
                error: error.into(),
                gas_cost_usd,
            },
            gas_used,
            execution_time,
            completed_at: Utc::now(),
        }
    }

    pub fn timeout(fingerprint: Fingerprint, execution_time: Duration) -> Self {
        Self {
            fingerprint,
            outcome: ExecutionOutcome::Timeout,
            gas_used: 0,
            execution_time,
            completed_at: Utc::now(),
        }
    }
}
