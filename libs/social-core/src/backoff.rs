use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Bounded exponential backoff with jitter, used to space out poll rounds
/// after a failed refresh. A successful round resets the attempt counter.
#[derive(Debug, Clone, Copy)]
pub struct BackoffConfig {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter_ratio: f32,
}

impl BackoffConfig {
    pub const fn poll_default() -> Self {
        Self {
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            jitter_ratio: 0.2,
        }
    }

    pub fn delay(&self, attempts: u32) -> Duration {
        let capped = attempts.min(31);
        let exponent = 2u32.saturating_pow(capped);
        let raw_ms = self
            .base_delay
            .as_millis()
            .saturating_mul(exponent as u128)
            .min(self.max_delay.as_millis()) as u64;

        Duration::from_millis(raw_ms.saturating_add(jitter_ms(raw_ms, self.jitter_ratio)))
    }
}

fn jitter_ms(base_ms: u64, ratio: f32) -> u64 {
    if base_ms == 0 || ratio <= 0.0 {
        return 0;
    }

    let max_jitter = (base_ms as f32 * ratio).round() as u64;
    if max_jitter == 0 {
        return 0;
    }

    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);

    seed % (max_jitter + 1)
}
