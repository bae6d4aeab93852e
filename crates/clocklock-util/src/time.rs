//! Time utilities for clocklock
//!
//! Cooldowns are anchored to wall-clock time (milliseconds since the Unix
//! epoch) because block timestamps are persisted and must survive restarts.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `CLOCKLOCK_MOCK_TIME` environment variable can be set
//! to shift the clock used by [`now`]. The mock time advances at the same rate
//! as real time, which makes it easy to land just before or after a cooldown
//! boundary by hand.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` in local time (e.g., `2025-12-25 14:30:00`)

use chrono::{DateTime, Local, NaiveDateTime, TimeDelta, TimeZone, Utc};
use std::sync::OnceLock;
use std::time::Duration;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "CLOCKLOCK_MOCK_TIME";

const MOCK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static MOCK_TIME_OFFSET: OnceLock<Option<TimeDelta>> = OnceLock::new();

fn mock_time_offset() -> Option<TimeDelta> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            let raw = std::env::var(MOCK_TIME_ENV_VAR).ok()?;
            match parse_mock_time(&raw) {
                Some(mock) => {
                    let offset = mock.signed_duration_since(Utc::now());
                    tracing::info!(
                        mock_time = %raw,
                        offset_secs = offset.num_seconds(),
                        "Mock time enabled"
                    );
                    Some(offset)
                }
                None => {
                    tracing::warn!(
                        mock_time = %raw,
                        expected_format = MOCK_TIME_FORMAT,
                        "Invalid mock time, using system clock"
                    );
                    None
                }
            }
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Parse a mock time string in local time.
pub fn parse_mock_time(raw: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(raw, MOCK_TIME_FORMAT).ok()?;
    Local
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    mock_time_offset().is_some()
}

/// Current wall-clock time, respecting `CLOCKLOCK_MOCK_TIME` in debug builds.
pub fn now() -> DateTime<Utc> {
    let real_now = Utc::now();
    match mock_time_offset() {
        Some(offset) => real_now + offset,
        None => real_now,
    }
}

/// `start + duration`, clamped to the latest representable instant.
pub fn saturating_add(start: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(duration)
        .ok()
        .and_then(|delta| start.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Time from `from` until `until`, or zero if `until` is not in the future.
pub fn duration_until(from: DateTime<Utc>, until: DateTime<Utc>) -> Duration {
    until
        .signed_duration_since(from)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// Saturating conversion to whole milliseconds for the wire.
pub fn duration_as_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Helper to format durations in human-readable form
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Largest duration [`duration_ms`] stores exactly.
pub const MAX_MILLIS_DURATION: Duration = Duration::from_millis(u64::MAX);

/// `a + b`, capped at [`MAX_MILLIS_DURATION`] so it survives a store round trip.
pub fn capped_add(a: Duration, b: Duration) -> Duration {
    a.saturating_add(b).min(MAX_MILLIS_DURATION)
}

/// Lenient reader for millisecond counts.
///
/// Negative numbers read as zero and fractions are truncated, so a bogus
/// value behaves like zero instead of failing the whole document.
///
/// Use with `#[serde(deserialize_with = "clocklock_util::lenient_ms::deserialize")]`.
pub mod lenient_ms {
    use serde::Deserializer;
    use serde::de::{self, Visitor};
    use std::fmt;

    struct MillisVisitor;

    impl<'de> Visitor<'de> for MillisVisitor {
        type Value = u64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a number of milliseconds")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
            Ok(u64::try_from(v).unwrap_or(0))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<u64, E> {
            // `as` saturates and maps NaN to zero
            Ok(v as u64)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        deserializer.deserialize_any(MillisVisitor)
    }
}

/// Serde adapter storing a `Duration` as integer milliseconds.
///
/// Reading goes through [`lenient_ms`]. Use with
/// `#[serde(with = "clocklock_util::duration_ms")]`.
pub mod duration_ms {
    use serde::{Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(super::duration_as_millis(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        super::lenient_ms::deserialize(deserializer).map(Duration::from_millis)
    }
}
