//! Anomaly accounting with throttled logging
//!
//! Platform event-ordering anomalies never fail processing; they are counted
//! here and surfaced as rate-limited warnings. A [`Diagnostics`] value is owned
//! by the core and passed by reference into the normalizers.

use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::warn;

use crate::ingest::raw_event::{PointerAction, PointerId};

/// Rate limiter for repeated log output
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// Minimum time between two permitted events
    min_interval: Duration,

    /// When the last permitted event happened
    last_event_time: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_event_time: None,
        }
    }

    /// Returns true and arms the limiter if the interval has elapsed
    pub fn should_process(&mut self) -> bool {
        let now = Instant::now();
        match self.last_event_time {
            Some(last) if now.duration_since(last) < self.min_interval => false,
            _ => {
                self.last_event_time = Some(now);
                true
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anomaly {
    /// MOVE/UP referencing an id with no active gesture
    UnknownPointer { action: PointerAction, id: PointerId },
    /// DOWN for an id that is already down
    DuplicateDown { id: PointerId },
    /// MOVE/UP arriving after a CANCEL and before the next DOWN
    InputAfterCancel { action: PointerAction },
    /// Pointer event timestamp earlier than the previous pointer frame
    ClockRegression { previous: u64, received: u64 },
    /// DOWN/UP whose changed id is missing from the pointer list
    MissingChangedPointer { action: PointerAction, id: PointerId },
    AttachFailed,
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::UnknownPointer { action, id } => {
                write!(f, "{:?} for unknown pointer id {}", action, id)
            }
            Anomaly::DuplicateDown { id } => write!(f, "DOWN for already active pointer id {}", id),
            Anomaly::InputAfterCancel { action } => {
                write!(f, "{:?} after CANCEL without new DOWN", action)
            }
            Anomaly::ClockRegression { previous, received } => write!(
                f,
                "pointer timestamp went backwards ({} < {})",
                received, previous
            ),
            Anomaly::MissingChangedPointer { action, id } => {
                write!(f, "{:?} names pointer id {} absent from sample", action, id)
            }
            Anomaly::AttachFailed => write!(f, "surface attach failed"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnomalyCounts {
    pub unknown_pointer: u64,
    pub duplicate_down: u64,
    pub input_after_cancel: u64,
    pub clock_regression: u64,
    pub missing_changed_pointer: u64,
    pub attach_failed: u64,
}

impl AnomalyCounts {
    pub fn total(&self) -> u64 {
        self.unknown_pointer
            + self.duplicate_down
            + self.input_after_cancel
            + self.clock_regression
            + self.missing_changed_pointer
            + self.attach_failed
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostics {
    counts: AnomalyCounts,
    limiter: RateLimiter,
    suppressed: u64,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl Diagnostics {
    pub fn new(warn_interval: Duration) -> Self {
        Self {
            counts: AnomalyCounts::default(),
            limiter: RateLimiter::new(warn_interval),
            suppressed: 0,
        }
    }

    pub fn record(&mut self, anomaly: Anomaly) {
        let counts = &mut self.counts;
        match anomaly {
            Anomaly::UnknownPointer { .. } => counts.unknown_pointer += 1,
            Anomaly::DuplicateDown { .. } => counts.duplicate_down += 1,
            Anomaly::InputAfterCancel { .. } => counts.input_after_cancel += 1,
            Anomaly::ClockRegression { .. } => counts.clock_regression += 1,
            Anomaly::MissingChangedPointer { .. } => counts.missing_changed_pointer += 1,
            Anomaly::AttachFailed => counts.attach_failed += 1,
        }

        if self.limiter.should_process() {
            if self.suppressed > 0 {
                warn!(
                    "Input anomaly: {} ({} similar warnings suppressed)",
                    anomaly, self.suppressed
                );
            } else {
                warn!("Input anomaly: {}", anomaly);
            }
            self.suppressed = 0;
        } else {
            self.suppressed += 1;
        }
    }

    pub fn counts(&self) -> &AnomalyCounts {
        &self.counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_every_anomaly_even_when_throttled() {
        let mut diagnostics = Diagnostics::new(Duration::from_secs(3600));
        for id in 0..5 {
            diagnostics.record(Anomaly::UnknownPointer {
                action: PointerAction::Move,
                id,
            });
        }
        diagnostics.record(Anomaly::AttachFailed);

        assert_eq!(diagnostics.counts().unknown_pointer, 5);
        assert_eq!(diagnostics.counts().attach_failed, 1);
        assert_eq!(diagnostics.counts().total(), 6);
        assert_eq!(diagnostics.suppressed, 5);
    }

    #[test]
    fn rate_limiter_permits_first_event_then_waits() {
        let mut limiter = RateLimiter::new(Duration::from_secs(3600));
        assert!(limiter.should_process());
        assert!(!limiter.should_process());

        let mut open = RateLimiter::new(Duration::ZERO);
        assert!(open.should_process());
        assert!(open.should_process());
    }
}
