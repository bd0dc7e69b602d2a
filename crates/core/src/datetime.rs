// Tolerant timestamp parsing
//
// Upstream payloads and older clients send a mix of naive local timestamps,
// `Z`-suffixed UTC timestamps and full RFC 3339 strings.

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Interpret a wall-clock time in `tz`. Ambiguous times resolve to the
/// earlier instant, nonexistent ones (DST gap) are shifted forward an hour.
pub fn local_to_utc(naive: NaiveDateTime, tz: Tz) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            let shifted = naive + chrono::Duration::hours(1);
            tz.from_local_datetime(&shifted)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
        }
    }
}

/// Parse a timestamp string.
///
/// Naive timestamps are read as wall-clock time in `tz`; a trailing `Z`
/// marks UTC; anything else falls back to RFC 3339. Returns `None` for
/// empty or unparseable input.
pub fn parse_datetime(value: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let (body, is_utc) = match value.strip_suffix('Z').or_else(|| value.strip_suffix('z')) {
        Some(stripped) => (stripped, true),
        None => (value, false),
    };

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(body, format) {
            return Some(if is_utc {
                Utc.from_utc_datetime(&naive)
            } else {
                local_to_utc(naive, tz)
            });
        }
    }

    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Serde helpers accepting both offset-carrying and naive (UTC) timestamps
pub mod lenient {
    use super::*;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_datetime(&raw, Tz::UTC)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw)))
    }

    pub mod option {
        use super::*;

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            match Option::<String>::deserialize(deserializer)? {
                None => Ok(None),
                Some(raw) if raw.trim().is_empty() => Ok(None),
                Some(raw) => parse_datetime(&raw, Tz::UTC).map(Some).ok_or_else(|| {
                    serde::de::Error::custom(format!("invalid timestamp '{}'", raw))
                }),
            }
        }
    }
}
