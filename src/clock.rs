//! Suspension points of the monitor, behind a trait so cycles can be tested
//! without waiting.

use std::time::Duration;

pub trait Sleeper {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Convert fractional seconds from configuration into a [`Duration`].
///
/// Negative values and NaN become zero; values too large for a `Duration`
/// (infinity included) saturate to [`Duration::MAX`].
pub fn secs_f64(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}
