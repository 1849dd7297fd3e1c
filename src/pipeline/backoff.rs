use rand::Rng;
use std::time::Duration;

/// Calculate exponential backoff delay with jitter
pub fn calculate_backoff_delay(attempt: u32, base_delay: Duration) -> Duration {
    // Cap the exponent so a long retry chain stays bounded
    let capped_attempt = attempt.min(10);

    let base_ms = base_delay.as_millis().min(u64::MAX as u128) as u64;
    let delay_ms = base_ms.saturating_mul(2_u64.saturating_pow(capped_attempt));

    // Add jitter: ±30% randomness
    let jitter_factor = rand::thread_rng().gen_range(0.7..1.3);
    Duration::from_millis((delay_ms as f64 * jitter_factor).round() as u64)
}
