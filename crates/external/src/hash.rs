// Request signing helpers

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use sha2::{Digest, Sha256};

/// Hex sha256 over the fields joined by `\n`
pub fn calc_hash(fields: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(fields.join("\n").as_bytes());
    hex::encode(hasher.finalize())
}

/// Request timestamp (`YYYY-mm-dd HH:MM:SS`) in the event site's local time
pub fn request_timestamp(now: DateTime<Utc>, tz: Tz) -> String {
    now.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S").to_string()
}
