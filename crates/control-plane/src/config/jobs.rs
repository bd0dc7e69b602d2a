// Background job configuration
//
// Each job reads `{PREFIX}_ENABLED`, `{PREFIX}_PERIOD` (seconds) and
// `{PREFIX}_RUN_ON_STARTUP`.

use std::time::Duration;

pub const SYNC_EXTERNAL_EVENTS_PREFIX: &str = "SYNC_EXTERNAL_EVENTS";
pub const REFRESH_EXTERNAL_NEWS_PREFIX: &str = "REFRESH_EXTERNAL_NEWS";

const DEFAULT_SYNC_EXTERNAL_EVENTS_PERIOD: Duration = Duration::from_secs(15 * 60);
const DEFAULT_REFRESH_EXTERNAL_NEWS_PERIOD: Duration = Duration::from_secs(30 * 60);

/// Schedule of a single job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobConfig {
    pub enabled: bool,
    pub period: Duration,
    pub run_on_startup: bool,
}

impl JobConfig {
    fn from_lookup(
        lookup: &impl Fn(&str) -> Option<String>,
        prefix: &str,
        default_period: Duration,
    ) -> Self {
        let flag = |suffix: &str, default: bool| {
            lookup(&format!("{}_{}", prefix, suffix))
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(default)
        };

        let period = lookup(&format!("{}_PERIOD", prefix))
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(default_period);

        Self {
            enabled: flag("ENABLED", true),
            period,
            run_on_startup: flag("RUN_ON_STARTUP", false),
        }
    }
}

/// Schedules of all background jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobsConfig {
    pub sync_external_events: JobConfig,
    pub refresh_external_news: JobConfig,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl JobsConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            sync_external_events: JobConfig::from_lookup(
                &lookup,
                SYNC_EXTERNAL_EVENTS_PREFIX,
                DEFAULT_SYNC_EXTERNAL_EVENTS_PERIOD,
            ),
            refresh_external_news: JobConfig::from_lookup(
                &lookup,
                REFRESH_EXTERNAL_NEWS_PREFIX,
                DEFAULT_REFRESH_EXTERNAL_NEWS_PERIOD,
            ),
        }
    }
}
