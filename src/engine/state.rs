//! Shared engine session state.

use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::domain::{BatchReport, RollingSuccess, SessionStats};

/// Session state owned by one engine instance.
///
/// Passed around by `Arc`, never a process-wide singleton. Holds the
/// cumulative session statistics and the rolling success window whose rate
/// feeds back into admission thresholds.
pub struct EngineState {
    stats: RwLock<SessionStats>,
    rolling: RwLock<RollingSuccess>,
}

impl EngineState {
    pub fn new(rolling_window: usize) -> Self {
        Self {
            stats: RwLock::new(SessionStats::default()),
            rolling: RwLock::new(RollingSuccess::new(rolling_window)),
        }
    }

    /// Fold a batch report into session stats and the rolling window.
    pub fn absorb(&self, report: &BatchReport) {
        self.stats.write().absorb(report);

        let mut rolling = self.rolling.write();
        for _ in 0..report.succeeded {
            rolling.record(true);
        }
        for _ in 0..(report.failed + report.timed_out) {
            rolling.record(false);
        }
    }

    /// Rolling success rate over recent attempts, in [0, 1].
    pub fn success_rate(&self) -> Decimal {
        self.rolling.read().rate()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn reports_feed_rolling_rate() {
        let state = EngineState::new(10);
        let mut report = BatchReport::empty(4);
        report.opportunities_executed = 4;
        report.succeeded = 1;
        report.failed = 2;
        report.timed_out = 1;

        state.absorb(&report);

        assert_eq!(state.success_rate(), dec!(0.25));
        assert_eq!(state.stats().cycles, 1);
        assert_eq!(state.stats().timed_out, 1);
    }
}
