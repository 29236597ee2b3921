/// Command-liveness watchdog for nodes that only act on remote commands.
///
/// Every valid command feeds it. When `timeout_ms` passes without one it
/// trips exactly once; the owner then forces its output safe until the next
/// command arrives.
#[derive(Debug, Clone)]
pub struct CommandWatchdog {
    timeout_ms: u64,
    last_feed_ms: u64,
    tripped: bool,
}

impl CommandWatchdog {
    /// Starts counting from `now_ms`, so a silent link trips one timeout
    /// after boot.
    pub fn new(timeout_ms: u64, now_ms: u64) -> Self {
        Self {
            timeout_ms,
            last_feed_ms: now_ms,
            tripped: false,
        }
    }

    pub fn feed(&mut self, now_ms: u64) {
        self.last_feed_ms = now_ms;
        self.tripped = false;
    }

    /// True only on the check that crosses the timeout.
    pub fn check(&mut self, now_ms: u64) -> bool {
        if self.tripped {
            return false;
        }
        if now_ms.saturating_sub(self.last_feed_ms) > self.timeout_ms {
            self.tripped = true;
            return true;
        }
        false
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped
    }

    pub fn silence_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_feed_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trips_once_after_timeout() {
        let mut watchdog = CommandWatchdog::new(5_000, 0);
        assert!(!watchdog.check(5_000));
        assert!(watchdog.check(5_001));
        assert!(watchdog.is_tripped());
        assert!(!watchdog.check(9_000));
    }

    #[test]
    fn feeding_rearms() {
        let mut watchdog = CommandWatchdog::new(5_000, 0);
        assert!(watchdog.check(6_000));

        watchdog.feed(6_500);
        assert!(!watchdog.is_tripped());
        assert!(!watchdog.check(11_000));
        assert!(watchdog.check(11_501));
    }

    #[test]
    fn regular_feeding_never_trips() {
        let mut watchdog = CommandWatchdog::new(5_000, 0);
        for now in (0..60_000).step_by(1_000) {
            watchdog.feed(now);
            assert!(!watchdog.check(now + 999));
        }
        assert_eq!(watchdog.silence_ms(59_500), 500);
    }
}
