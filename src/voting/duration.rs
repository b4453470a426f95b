//! Duration parsing for voting policy deadlines.
//!
//! Supports human-readable durations like "48h" or "7 days" in config files.

/// Parse a human-readable voting period to seconds.
///
/// Supports:
/// - "none", "off" or "0" → 0 seconds (no deadline)
/// - Human-readable formats via humantime crate (e.g., "1 hour", "7 days", "1h", "7d")
///
/// # Examples
/// ```
/// use daobase::voting::parse_duration_to_secs;
///
/// assert_eq!(parse_duration_to_secs("none").unwrap(), 0);
/// assert_eq!(parse_duration_to_secs("48h").unwrap(), 172800);
/// assert_eq!(parse_duration_to_secs("7 days").unwrap(), 604800);
/// ```
pub fn parse_duration_to_secs(input: &str) -> Result<u64, String> {
    let input = input.trim();
    if matches!(input, "none" | "off" | "0") {
        return Ok(0);
    }

    humantime::parse_duration(input)
        .map(|d| d.as_secs())
        .map_err(|e| format!("Invalid duration '{}': {}", input, e))
}
