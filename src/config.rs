use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_DETECTOR_INTERVAL_SECS: u64 = 3_600;
const DEFAULT_FINISHER_INTERVAL_SECS: u64 = 60;
const DEFAULT_COMPACT_THRESHOLD: u64 = 1_000;

/// Runtime settings, read once from `LESSONBOOK_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub metrics_port: Option<u16>,
    pub detector_interval: Duration,
    pub finisher_interval: Duration,
    pub compact_threshold: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            metrics_port: None,
            detector_interval: Duration::from_secs(DEFAULT_DETECTOR_INTERVAL_SECS),
            finisher_interval: Duration::from_secs(DEFAULT_FINISHER_INTERVAL_SECS),
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparsable values fall back to the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parsed = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok());
        let defaults = Self::default();
        Self {
            data_dir: lookup("LESSONBOOK_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            metrics_port: lookup("LESSONBOOK_METRICS_PORT").and_then(|s| s.trim().parse().ok()),
            detector_interval: parsed("LESSONBOOK_DETECTOR_INTERVAL_SECS")
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.detector_interval),
            finisher_interval: parsed("LESSONBOOK_FINISHER_INTERVAL_SECS")
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.finisher_interval),
            compact_threshold: parsed("LESSONBOOK_COMPACT_THRESHOLD").unwrap_or(defaults.compact_threshold),
        }
    }

    pub fn journal_path(&self) -> PathBuf {
        self.data_dir.join("lessonbook.journal")
    }
}
