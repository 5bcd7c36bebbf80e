//! Scan-cycle ticker with explicit shutdown.
//!
//! One timer abstraction drives every scan cycle, replacing ad hoc sleep
//! loops. Shutdown is a `watch` channel: flip it to true (or drop the
//! sender) and the ticker stops at the next suspension point.

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Create a linked shutdown handle and receiver.
pub fn shutdown_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// Fixed-period ticker that yields until told to stop.
pub struct Ticker {
    interval: Interval,
    shutdown: watch::Receiver<bool>,
}

impl Ticker {
    pub fn new(period: Duration, shutdown: watch::Receiver<bool>) -> Self {
        let mut interval = interval(period);
        // A slow cycle delays the next tick instead of bursting to catch up.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval, shutdown }
    }

    /// Wait for the next tick. Returns false once shutdown is signalled.
    pub async fn tick(&mut self) -> bool {
        if *self.shutdown.borrow() {
            return false;
        }
        tokio::select! {
            _ = self.interval.tick() => true,
            changed = self.shutdown.changed() => match changed {
                Ok(()) => !*self.shutdown.borrow(),
                // Sender dropped: treat as shutdown.
                Err(_) => false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ticks_until_shutdown() {
        let (tx, rx) = shutdown_channel();
        let mut ticker = Ticker::new(Duration::from_millis(1), rx);

        assert!(ticker.tick().await);
        assert!(ticker.tick().await);

        tx.send(true).unwrap();
        assert!(!ticker.tick().await);
    }

    #[tokio::test]
    async fn dropped_sender_stops_ticker() {
        let (tx, rx) = shutdown_channel();
        // Long period so only shutdown can resolve the pending tick.
        let mut ticker = Ticker::new(Duration::from_secs(3600), rx);
        assert!(ticker.tick().await); // first tick fires immediately

        drop(tx);
        assert!(!ticker.tick().await);
    }
}
