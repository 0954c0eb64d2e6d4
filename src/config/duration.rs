//! Delay parsing.

use anyhow::Context;
use std::time::Duration;

/// Parse a delay string like "150ms", "1s", "2m" or "500" into a [`Duration`].
/// Supports:
/// - Plain numbers (interpreted as milliseconds): "500"
/// - Milliseconds suffix: "150ms"
/// - Seconds suffix: "1s", "1.5s"
/// - Minutes suffix: "2m"
pub fn parse_delay(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("Empty delay string");
    }

    // "ms" must be checked before "s" and "m"
    if let Some(num_str) = s.strip_suffix("ms") {
        let millis: u64 = num_str
            .trim()
            .parse()
            .with_context(|| format!("Invalid milliseconds value: {num_str}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(num_str) = s.strip_suffix('s') {
        let secs: f64 = num_str
            .trim()
            .parse()
            .with_context(|| format!("Invalid seconds value: {num_str}"))?;
        return Duration::try_from_secs_f64(secs)
            .with_context(|| format!("Seconds value out of range: {num_str}"));
    }
    if let Some(num_str) = s.strip_suffix('m') {
        let minutes: u64 = num_str
            .trim()
            .parse()
            .with_context(|| format!("Invalid minutes value: {num_str}"))?;
        let secs = minutes
            .checked_mul(60)
            .with_context(|| format!("Minutes value out of range: {num_str}"))?;
        return Ok(Duration::from_secs(secs));
    }

    // No suffix - treat as milliseconds
    s.parse::<u64>()
        .map(Duration::from_millis)
        .with_context(|| format!("Invalid delay value: {s}"))
}
