//! Monotonic batch clock
//!
//! Batch ids embed the batch timestamp in milliseconds. Two batches minted in
//! the same millisecond would otherwise produce identical ids, so the clock
//! hands out strictly increasing stamps: wall-clock time when it has moved
//! forward, the previous stamp plus one millisecond when it has not.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

#[derive(Debug, Default)]
pub struct BatchClock {
    last_millis: AtomicI64,
}

impl BatchClock {
    pub const fn new() -> Self {
        Self {
            last_millis: AtomicI64::new(0),
        }
    }

    /// Next batch stamp, strictly later than every stamp returned before
    pub fn next_stamp(&self) -> DateTime<Utc> {
        let now = Utc::now().timestamp_millis();
        let mut last = self.last_millis.load(Ordering::Acquire);
        loop {
            let candidate = now.max(last + 1);
            match self.last_millis.compare_exchange_weak(
                last,
                candidate,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return DateTime::from_timestamp_millis(candidate).unwrap_or_else(Utc::now),
                Err(observed) => last = observed,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_stamps_strictly_increase() {
        let clock = BatchClock::new();
        let mut prev = clock.next_stamp();
        for _ in 0..1000 {
            let next = clock.next_stamp();
            assert!(next.timestamp_millis() > prev.timestamp_millis());
            prev = next;
        }
    }

    #[test]
    fn test_stamps_unique_across_threads() {
        let clock = Arc::new(BatchClock::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let clock = Arc::clone(&clock);
                std::thread::spawn(move || {
                    (0..250)
                        .map(|_| clock.next_stamp().timestamp_millis())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all: Vec<i64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let total = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), total);
    }

    #[test]
    fn test_stamp_tracks_wall_clock() {
        let clock = BatchClock::new();
        let before = Utc::now().timestamp_millis();
        let stamp = clock.next_stamp().timestamp_millis();
        assert!(stamp >= before);
    }
}
