//! Process-wide in-flight execution tracking.
//!
//! The in-flight set is one of the engine's two long-lived mutable shared
//! structures (the other is the route cache). It enforces at most one
//! concurrent execution attempt per fingerprint: an entry is created when an
//! attempt starts and removed when its result broadcasts, and a second
//! admission of the same fingerprint receives a handle to the existing
//! attempt instead of a new execution.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::watch;

use crate::domain::{ExecutionResult, Fingerprint};

type ResultReceiver = watch::Receiver<Option<ExecutionResult>>;

/// Outcome of trying to claim a fingerprint for execution.
pub enum Claim {
    /// This caller owns the attempt; complete the guard with the result.
    New(InFlightGuard),
    /// Another attempt is already running; await its result here.
    Existing(ResultReceiver),
}

/// Fingerprint-keyed set of currently executing attempts.
///
/// Per-key granularity comes from the underlying sharded map; unrelated
/// fingerprints never serialize against each other.
#[derive(Default)]
pub struct InFlightSet {
    entries: Arc<DashMap<Fingerprint, ResultReceiver>>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a fingerprint for execution.
    ///
    /// The `entry` call holds the map shard lock for the insertion check,
    /// so two racing claims for one fingerprint cannot both win.
    pub fn claim(&self, fingerprint: &Fingerprint) -> Claim {
        match self.entries.entry(fingerprint.clone()) {
            dashmap::mapref::entry::Entry::Occupied(occupied) => {
                Claim::Existing(occupied.get().clone())
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let (tx, rx) = watch::channel(None);
                vacant.insert(rx);
                Claim::New(InFlightGuard {
                    fingerprint: fingerprint.clone(),
                    entries: self.entries.clone(),
                    tx: Some(tx),
                })
            }
        }
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.entries.contains_key(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Await the result of an already-running attempt.
    ///
    /// Returns `None` if the owning attempt was dropped without completing
    /// (its guard removed the entry and closed the channel).
    pub async fn await_existing(mut rx: ResultReceiver) -> Option<ExecutionResult> {
        loop {
            if let Some(result) = rx.borrow().clone() {
                return Some(result);
            }
            if rx.changed().await.is_err() {
                return rx.borrow().clone();
            }
        }
    }
}

/// Ownership of one in-flight attempt.
///
/// Dropping the guard without completing removes the entry, so a panicked
/// or cancelled attempt never wedges its fingerprint.
pub struct InFlightGuard {
    fingerprint: Fingerprint,
    entries: Arc<DashMap<Fingerprint, ResultReceiver>>,
    tx: Option<watch::Sender<Option<ExecutionResult>>>,
}

impl InFlightGuard {
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Broadcast the terminal result and release the fingerprint.
    pub fn complete(mut self, result: &ExecutionResult) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Some(result.clone()));
        }
        self.entries.remove(&self.fingerprint);
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.tx.is_some() {
            self.entries.remove(&self.fingerprint);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Chain, DexId, TokenPair};
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn fingerprint() -> Fingerprint {
        Fingerprint::simple(
            &Chain::from("ethereum"),
            &TokenPair::from("ETH/USDC"),
            &DexId::from("uniswap_v3"),
            &DexId::from("sushiswap"),
        )
    }

    #[tokio::test]
    async fn second_claim_coalesces_into_first() {
        let set = InFlightSet::new();
        let fp = fingerprint();

        let Claim::New(guard) = set.claim(&fp) else {
            panic!("first claim should be new");
        };
        let Claim::Existing(rx) = set.claim(&fp) else {
            panic!("second claim should coalesce");
        };

        let result = ExecutionResult::success(
            fp.clone(),
            dec!(10),
            "0xabc",
            100_000,
            Duration::from_millis(50),
        );
        guard.complete(&result);

        let observed = InFlightSet::await_existing(rx).await.unwrap();
        assert_eq!(observed, result);
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn dropped_guard_releases_fingerprint() {
        let set = InFlightSet::new();
        let fp = fingerprint();

        {
            let Claim::New(_guard) = set.claim(&fp) else {
                panic!("expected new claim");
            };
        }

        assert!(!set.contains(&fp));
        let Claim::New(_) = set.claim(&fp) else {
            panic!("fingerprint should be claimable again");
        };
    }

    #[tokio::test]
    async fn waiter_on_abandoned_attempt_sees_none() {
        let set = InFlightSet::new();
        let fp = fingerprint();

        let Claim::New(guard) = set.claim(&fp) else {
            panic!("expected new claim");
        };
        let Claim::Existing(rx) = set.claim(&fp) else {
            panic!("expected existing claim");
        };
        drop(guard);

        assert!(InFlightSet::await_existing(rx).await.is_none());
    }
}
