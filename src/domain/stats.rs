//! Session statistics and batch reports.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

use super::money::Amount;

/// Aggregated results for one scheduled batch cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub opportunities_found: usize,
    pub opportunities_executed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub net_profit: Amount,
    pub trades_per_second: Decimal,
    pub fastest_execution: Option<Duration>,
    pub slowest_execution: Option<Duration>,
}

impl BatchReport {
    pub fn empty(found: usize) -> Self {
        Self {
            opportunities_found: found,
            opportunities_executed: 0,
            succeeded: 0,
            failed: 0,
            timed_out: 0,
            net_profit: Amount::ZERO,
            trades_per_second: Decimal::ZERO,
            fastest_execution: None,
            slowest_execution: None,
        }
    }

    /// Success rate of this batch alone, in [0, 1].
    pub fn success_rate(&self) -> Decimal {
        if self.opportunities_executed == 0 {
            return Decimal::ONE;
        }
        Decimal::from(self.succeeded) / Decimal::from(self.opportunities_executed)
    }
}

/// Bounded window of recent execution outcomes.
///
/// The rolling rate is the one feedback scalar flowing from the scheduler
/// back into admission thresholds.
#[derive(Debug, Clone)]
pub struct RollingSuccess {
    window: VecDeque<bool>,
    capacity: usize,
}

impl RollingSuccess {
    pub fn new(capacity: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&mut self, success: bool) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(success);
    }

    /// Fraction of recent attempts that succeeded; 1.0 when empty so a
    /// fresh session starts with unraised thresholds.
    pub fn rate(&self) -> Decimal {
        if self.window.is_empty() {
            return Decimal::ONE;
        }
        let hits = self.window.iter().filter(|s| **s).count();
        Decimal::from(hits) / Decimal::from(self.window.len())
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}

/// Cumulative statistics for one engine session.
///
/// Owned by a single engine instance and passed by reference, never a
/// process-wide singleton.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionStats {
    pub cycles: u64,
    pub opportunities_found: u64,
    pub opportunities_executed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub net_profit: Amount,
}

impl SessionStats {
    pub fn absorb(&mut self, report: &BatchReport) {
        self.cycles += 1;
        self.opportunities_found += report.opportunities_found as u64;
        self.opportunities_executed += report.opportunities_executed as u64;
        self.succeeded += report.succeeded as u64;
        self.failed += report.failed as u64;
        self.timed_out += report.timed_out as u64;
        self.net_profit += report.net_profit;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rolling_window_evicts_oldest() {
        let mut rolling = RollingSuccess::new(3);
        rolling.record(true);
        rolling.record(true);
        rolling.record(false);
        rolling.record(false); // evicts the first `true`

        assert_eq!(rolling.len(), 3);
        assert_eq!(rolling.rate(), Decimal::ONE / Decimal::from(3));
    }

    #[test]
    fn empty_window_reports_full_rate() {
        assert_eq!(RollingSuccess::new(10).rate(), Decimal::ONE);
    }

    #[test]
    fn session_stats_absorb_batch_report() {
        let mut stats = SessionStats::default();
        let mut report = BatchReport::empty(5);
        report.opportunities_executed = 3;
        report.succeeded = 2;
        report.failed = 1;
        report.net_profit = dec!(120.50);

        stats.absorb(&report);
        stats.absorb(&report);

        assert_eq!(stats.cycles, 2);
        assert_eq!(stats.opportunities_found, 10);
        assert_eq!(stats.succeeded, 4);
        assert_eq!(stats.net_profit, dec!(241.00));
    }
}
