//! Rate limiting on fix timestamps.

/// Fires at most once per interval.
///
/// Time is whatever millisecond clock the caller passes in (fix timestamps in the
/// session), so behaviour is reproducible. A clock that jumps backwards (device time
/// correction) re-arms the cooldown instead of blocking until it catches up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cooldown {
    interval_ms: u64,
    last_fired_ms: Option<u64>,
}

impl Cooldown {
    pub fn new(interval_ms: u64) -> Self {
        Self { interval_ms, last_fired_ms: None }
    }

    /// True when at least `interval_ms` have elapsed since the last firing, when it never
    /// fired, or when `now_ms` is earlier than the last firing.
    pub fn is_ready(&self, now_ms: u64) -> bool {
        match self.last_fired_ms {
            None => true,
            Some(last) if now_ms < last => true,
            Some(last) => now_ms - last >= self.interval_ms,
        }
    }

    /// Fire if ready; returns whether it fired.
    pub fn try_fire(&mut self, now_ms: u64) -> bool {
        if !self.is_ready(now_ms) {
            return false;
        }
        self.last_fired_ms = Some(now_ms);
        true
    }

    pub fn last_fired_ms(&self) -> Option<u64> {
        self.last_fired_ms
    }

    pub fn reset(&mut self) {
        self.last_fired_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_fire_always_allowed() {
        let mut cooldown = Cooldown::new(6_000);
        assert!(cooldown.try_fire(0));
        assert_eq!(cooldown.last_fired_ms(), Some(0));
    }

    #[test]
    fn test_blocks_until_interval_elapsed() {
        let mut cooldown = Cooldown::new(6_000);
        assert!(cooldown.try_fire(10_000));
        assert!(!cooldown.try_fire(15_999));
        assert!(cooldown.try_fire(16_000));
        assert_eq!(cooldown.last_fired_ms(), Some(16_000));
    }

    #[test]
    fn test_backwards_clock_rearms() {
        let mut cooldown = Cooldown::new(1_000);
        assert!(cooldown.try_fire(50_000));
        assert!(cooldown.try_fire(10_000));
        assert_eq!(cooldown.last_fired_ms(), Some(10_000));

        // Counts from the corrected clock afterwards
        assert!(!cooldown.try_fire(10_999));
        assert!(cooldown.try_fire(11_000));
    }

    #[test]
    fn test_reset() {
        let mut cooldown = Cooldown::new(1_000);
        assert!(cooldown.try_fire(5_000));
        cooldown.reset();
        assert!(cooldown.try_fire(5_001));
    }
}
