//! Delay schedule between polls and retries

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded exponential backoff.
///
/// The base schedule `initial * multiplier^attempt` is clamped to
/// `[floor, max]`, so it never decreases from one attempt to the next.
/// [`Backoff::next_delay`] additionally caps it by the time left before
/// a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Backoff {
    #[serde(with = "millis")]
    pub initial: Duration,
    #[serde(with = "millis")]
    pub max: Duration,
    pub multiplier: f64,
    /// Lower bound on any delay, so the remote API is never hammered.
    #[serde(with = "millis")]
    pub floor: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(10),
            multiplier: 2.0,
            floor: Duration::from_millis(200),
        }
    }
}

impl Backoff {
    /// Constant delay between attempts
    pub fn fixed(delay: Duration) -> Self {
        Self {
            initial: delay,
            max: delay,
            multiplier: 1.0,
            floor: delay,
        }
    }

    /// Base delay before attempt `attempt + 1`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let floor = self.floor.min(self.max);
        let multiplier = self.multiplier.max(1.0);
        let scaled = self.initial.as_secs_f64() * multiplier.powi(attempt.min(64) as i32);

        // Saturate instead of panicking on overflow.
        let delay = if scaled.is_finite() && scaled < self.max.as_secs_f64() {
            Duration::from_secs_f64(scaled)
        } else {
            self.max
        };

        delay.clamp(floor, self.max)
    }

    /// Delay before the next attempt, never past `remaining`
    pub fn next_delay(&self, attempt: u32, remaining: Duration) -> Duration {
        self.delay_for_attempt(attempt).min(remaining)
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
