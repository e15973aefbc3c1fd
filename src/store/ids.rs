//! Document id generation: base-36 millisecond timestamp plus a random
//! base-36 suffix, e.g. `m2k9x1qz-4fj0az`.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SUFFIX_LEN: usize = 6;

/// Source of "now", swappable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        let d = (n % 36) as u32;
        digits.push(char::from_digit(d, 36).unwrap_or('0'));
        n /= 36;
    }
    digits.iter().rev().collect()
}

pub fn generate_id<R: Rng>(now: DateTime<Utc>, rng: &mut R) -> String {
    let millis = now.timestamp_millis().max(0) as u64;
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| char::from_digit(rng.random_range(0..36u32), 36).unwrap_or('0'))
        .collect();
    format!("{}-{}", to_base36(millis), suffix)
}

pub struct IdGenerator {
    clock: Arc<dyn Clock>,
    rng: Mutex<StdRng>,
}

impl IdGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_rng(clock, StdRng::from_os_rng())
    }

    pub fn with_rng(clock: Arc<dyn Clock>, rng: StdRng) -> Self {
        Self {
            clock,
            rng: Mutex::new(rng),
        }
    }

    pub fn next_id(&self) -> String {
        let now = self.clock.now();
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        generate_id(now, &mut *rng)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Advances one millisecond every `per_tick` reads.
    pub(crate) struct StepClock {
        calls: AtomicI64,
        start_ms: i64,
        per_tick: i64,
    }

    impl StepClock {
        pub(crate) fn new(start_ms: i64, per_tick: i64) -> Self {
            Self {
                calls: AtomicI64::new(0),
                start_ms,
                per_tick,
            }
        }
    }

    impl Clock for StepClock {
        fn now(&self) -> DateTime<Utc> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            DateTime::from_timestamp_millis(self.start_ms + n / self.per_tick).unwrap()
        }
    }

    #[test]
    fn test_to_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(1_700_000_000_000), "loyw3v28");
    }

    #[test]
    fn test_id_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let now = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let id = generate_id(now, &mut rng);
        let (ts, suffix) = id.split_once('-').unwrap();
        assert_eq!(ts, "loyw3v28");
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_ten_thousand_sequential_ids_are_unique() {
        let clock = Arc::new(StepClock::new(1_700_000_000_000, 4));
        let ids = IdGenerator::with_rng(clock, StdRng::seed_from_u64(42));
        let generated: HashSet<String> = (0..10_000).map(|_| ids.next_id()).collect();
        assert_eq!(generated.len(), 10_000);
    }
}
