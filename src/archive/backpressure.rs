// src/archive/backpressure.rs
// =============================================================================
// The run-wide "stop talking to the archive service" switch.
//
// When the archive service answers 429 Too Many Requests, one worker trips
// the switch and every worker sees it on its next check. Until the deadline
// passes, no archive request (lookup, submit or poll) leaves this process.
//
// Rust concepts:
// - RwLock (parking_lot): many readers or one writer, never held across an
//   .await, and no lock poisoning to unwrap
// - Arc: one Backpressure shared by every task in the run
// =============================================================================

use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::warn;

/// Shared cool-down deadline for the archive service.
#[derive(Debug, Default)]
pub struct Backpressure {
    until: RwLock<Option<Instant>>,
}

impl Backpressure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or extend) a cool-down. A shorter cool-down never cuts an
    /// existing one short.
    pub fn trip(&self, cooldown: Duration) {
        let deadline = Instant::now() + cooldown;
        let mut until = self.until.write();
        if until.map_or(true, |current| deadline > current) {
            *until = Some(deadline);
            warn!(
                cooldown_secs = cooldown.as_secs(),
                "archive service rate limited us, pausing all archive requests"
            );
        }
    }

    /// True while a cool-down is in effect.
    pub fn is_tripped(&self) -> bool {
        self.remaining().is_some()
    }

    /// Time left on the current cool-down.
    pub fn remaining(&self) -> Option<Duration> {
        let until = self.until.read();
        until.and_then(|deadline| deadline.checked_duration_since(Instant::now()))
            .filter(|left| !left.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_starts_untripped() {
        let bp = Backpressure::new();
        assert!(!bp.is_tripped());
        assert_eq!(bp.remaining(), None);
    }

    #[test]
    fn test_trip_and_expire() {
        let bp = Backpressure::new();
        bp.trip(Duration::from_millis(30));
        assert!(bp.is_tripped());

        std::thread::sleep(Duration::from_millis(60));
        assert!(!bp.is_tripped());
    }

    #[test]
    fn test_shorter_trip_does_not_shorten() {
        let bp = Backpressure::new();
        bp.trip(Duration::from_secs(60));
        bp.trip(Duration::from_millis(1));
        assert!(bp.remaining().unwrap() > Duration::from_secs(30));
    }

    #[test]
    fn test_panicking_holder_does_not_break_the_switch() {
        let bp = Arc::new(Backpressure::new());
        let holder = Arc::clone(&bp);
        let joined = std::thread::spawn(move || {
            let _guard = holder.until.write();
            panic!("worker died while holding the lock");
        })
        .join();
        assert!(joined.is_err());

        bp.trip(Duration::from_secs(60));
        assert!(bp.is_tripped());
    }

    // Every worker must notice a trip on its very next look at the flag.
    #[tokio::test]
    async fn test_all_workers_see_trip_within_one_tick() {
        const WORKERS: usize = 8;
        let bp = Arc::new(Backpressure::new());
        let barrier = Arc::new(tokio::sync::Barrier::new(WORKERS));

        let mut handles = Vec::new();
        for id in 0..WORKERS {
            let bp = Arc::clone(&bp);
            let barrier = Arc::clone(&barrier);
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                if id == 0 {
                    bp.trip(Duration::from_secs(60));
                    return 0;
                }
                let mut ticks = 0;
                while !bp.is_tripped() && ticks < 100 {
                    ticks += 1;
                    tokio::task::yield_now().await;
                }
                ticks
            }));
        }

        for handle in handles {
            let ticks = handle.await.unwrap();
            assert!(ticks <= 1, "worker needed {ticks} ticks to see the trip");
        }
    }
}
