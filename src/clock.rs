use std::time::Instant;

/// Fixed monotonic reference point taken when a session starts running.
#[derive(Clone, Copy, Debug)]
pub struct EpochMarker(Instant);

/// Session-relative timestamps for submitted frames.
///
/// Backed by `Instant`, so wall-clock adjustments never move timestamps
/// backwards.
pub struct SessionClock;

impl SessionClock {
    pub fn start() -> EpochMarker {
        EpochMarker(Instant::now())
    }

    /// Seconds elapsed since `epoch`.
    pub fn now(epoch: &EpochMarker) -> f64 {
        epoch.0.elapsed().as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn timestamps_never_decrease() {
        let epoch = SessionClock::start();
        let mut last = SessionClock::now(&epoch);
        assert!(last >= 0.0);
        for _ in 0..1_000 {
            let ts = SessionClock::now(&epoch);
            assert!(ts >= last, "timestamp went backwards: {ts} < {last}");
            last = ts;
        }
    }

    #[test]
    fn resolution_is_finer_than_a_millisecond() {
        let epoch = SessionClock::start();
        std::thread::sleep(Duration::from_millis(3));
        let ts = SessionClock::now(&epoch);
        assert!(ts >= 0.003);
        assert!(ts < 1.0);
    }
}
