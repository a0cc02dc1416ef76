// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON configuration: the download root, poll interval and per-feed policies.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::retention::{STAGING_PREFIX, SlotPattern};

/// Weekday names accepted as `weekday_filenames` keys
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Top-level configuration file
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Root directory; each feed writes below `download_folder/output_directory`
    pub download_folder: PathBuf,

    /// Seconds to sleep between the end of one poll cycle and the next
    pub check_interval: u64,

    /// Upper bound in seconds for any single HTTP request (default: 120)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Drains a deferred replacement may wait for its destination to be
    /// released before it is abandoned; 0 retries forever (default: 24)
    #[serde(default = "default_pending_retry_limit")]
    pub pending_retry_limit: u32,

    /// Feeds, processed in this order every cycle
    pub rss_feeds: Vec<FeedPolicy>,
}

/// Retention policy for one feed.
///
/// `keep_latest`, `keep_weekdays` and `keep_latest_n` may be combined; each
/// active mode runs independently every cycle.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedPolicy {
    pub url: String,

    #[serde(default)]
    pub output_directory: String,

    pub output_filename: String,

    /// Minimum episode duration in seconds; 0 disables the filter
    #[serde(default)]
    pub min_duration: u64,

    #[serde(default)]
    pub keep_latest: bool,

    #[serde(default)]
    pub keep_weekdays: bool,

    /// Weekday name (e.g. "Monday") to the filename holding that day's episode
    #[serde(default)]
    pub weekday_filenames: BTreeMap<String, String>,

    /// Number of most recent episodes to keep; 0 disables the mode
    #[serde(default)]
    pub keep_latest_n: usize,
}

fn default_request_timeout() -> u64 {
    120
}

fn default_pending_retry_limit() -> u32 {
    24
}

impl Config {
    /// Read, parse and validate a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.check_interval == 0 {
            return Err(ConfigError::Invalid(
                "check_interval must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout must be greater than zero".to_string(),
            ));
        }

        self.rss_feeds.iter().try_for_each(FeedPolicy::validate)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

impl FeedPolicy {
    /// Directory this feed writes into
    pub fn directory(&self, download_folder: &Path) -> PathBuf {
        download_folder.join(&self.output_directory)
    }

    /// Filename pattern used by the keep-latest-N slots
    pub fn slot_pattern(&self) -> SlotPattern<'_> {
        SlotPattern::new(&self.output_directory, &self.output_filename)
    }

    /// Every filename this policy may publish to
    pub fn slot_filenames(&self) -> Vec<String> {
        let mut names = vec![self.output_filename.clone()];

        if self.keep_weekdays {
            names.extend(self.weekday_filenames.values().cloned());
        }

        let pattern = self.slot_pattern();
        names.extend((1..self.keep_latest_n).map(|index| pattern.indexed(index)));

        names
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid(format!("feed {}: {}", self.url, reason));

        if self.url.trim().is_empty() {
            return Err(ConfigError::Invalid("feed url must not be empty".to_string()));
        }

        let directory_ok = Path::new(&self.output_directory)
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !directory_ok {
            return Err(invalid(format!(
                "output_directory '{}' must be a relative path without '..'",
                self.output_directory
            )));
        }

        // Indexed slots embed the directory in a flat filename
        if self.keep_latest_n > 1 && self.output_directory.contains(['/', '\\']) {
            return Err(invalid(format!(
                "output_directory '{}' must be a single directory name when keep_latest_n is above 1",
                self.output_directory
            )));
        }

        validate_filename(&self.output_filename).map_err(invalid)?;

        if self.keep_weekdays && self.weekday_filenames.is_empty() {
            return Err(invalid(
                "keep_weekdays is set but weekday_filenames is empty".to_string(),
            ));
        }

        for (day, filename) in &self.weekday_filenames {
            if !WEEKDAY_NAMES.contains(&day.as_str()) {
                return Err(invalid(format!(
                    "'{day}' is not a weekday name (expected one of {})",
                    WEEKDAY_NAMES.join(", ")
                )));
            }
            validate_filename(filename).map_err(invalid)?;
        }

        Ok(())
    }
}

fn validate_filename(name: &str) -> Result<(), String> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(format!("'{name}' is not a usable filename"));
    }
    if name.contains(['/', '\\']) {
        return Err(format!("filename '{name}' must not contain path separators"));
    }
    if name.starts_with(STAGING_PREFIX) {
        return Err(format!(
            "filename '{name}' must not start with the staging prefix '{STAGING_PREFIX}'"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const FULL_CONFIG: &str = r#"{
        "download_folder": "/srv/podcasts",
        "check_interval": 3600,
        "rss_feeds": [
            {
                "url": "https://example.com/news.xml",
                "output_directory": "news",
                "output_filename": "news.mp3",
                "min_duration": 300,
                "keep_latest": true,
                "keep_weekdays": true,
                "weekday_filenames": {"Monday": "monday.mp3", "Friday": "friday.mp3"},
                "keep_latest_n": 3
            },
            {
                "url": "https://example.com/minimal.xml",
                "output_filename": "minimal.mp3"
            }
        ]
    }"#;

    fn parse(json: &str) -> Config {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn parses_full_config_with_defaults() {
        let config = parse(FULL_CONFIG);
        config.validate().unwrap();

        assert_eq!(config.check_interval(), Duration::from_secs(3600));
        assert_eq!(config.request_timeout, 120);
        assert_eq!(config.pending_retry_limit, 24);
        assert_eq!(config.rss_feeds.len(), 2);

        let minimal = &config.rss_feeds[1];
        assert_eq!(minimal.output_directory, "");
        assert_eq!(minimal.min_duration, 0);
        assert!(!minimal.keep_latest);
        assert!(!minimal.keep_weekdays);
        assert!(minimal.weekday_filenames.is_empty());
        assert_eq!(minimal.keep_latest_n, 0);
        assert_eq!(
            minimal.directory(Path::new("/srv/podcasts")),
            PathBuf::from("/srv/podcasts")
        );
    }

    #[test]
    fn slot_filenames_cover_every_mode() {
        let config = parse(FULL_CONFIG);
        let names = config.rss_feeds[0].slot_filenames();

        assert_eq!(
            names,
            vec![
                "news.mp3",
                "friday.mp3",
                "monday.mp3",
                "1_news_news.mp3",
                "2_news_news.mp3"
            ]
        );
    }

    #[test]
    fn load_reads_and_validates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, FULL_CONFIG).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.rss_feeds[0].url, "https://example.com/news.xml");
    }

    #[test]
    fn load_reports_missing_file_and_bad_json() {
        let dir = tempdir().unwrap();

        let missing = Config::load(&dir.path().join("absent.json"));
        assert!(matches!(missing, Err(ConfigError::ReadFailed { .. })));

        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn rejects_unknown_weekday_names() {
        let config = parse(
            r#"{"download_folder": "/tmp", "check_interval": 60, "rss_feeds": [
                {"url": "https://example.com/f.xml", "output_filename": "f.mp3",
                 "keep_weekdays": true, "weekday_filenames": {"monday": "m.mp3"}}
            ]}"#,
        );

        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_unsafe_paths() {
        let traversal = parse(
            r#"{"download_folder": "/tmp", "check_interval": 60, "rss_feeds": [
                {"url": "https://example.com/f.xml", "output_directory": "../etc", "output_filename": "f.mp3"}
            ]}"#,
        );
        assert!(traversal.validate().is_err());

        let nested = parse(
            r#"{"download_folder": "/tmp", "check_interval": 60, "rss_feeds": [
                {"url": "https://example.com/f.xml", "output_filename": "sub/f.mp3"}
            ]}"#,
        );
        assert!(nested.validate().is_err());

        let staging = parse(
            r#"{"download_folder": "/tmp", "check_interval": 60, "rss_feeds": [
                {"url": "https://example.com/f.xml", "output_filename": "temp_f.mp3"}
            ]}"#,
        );
        assert!(staging.validate().is_err());
    }

    #[test]
    fn nested_directory_is_rejected_only_for_indexed_slots() {
        let nested_slots = parse(
            r#"{"download_folder": "/tmp", "check_interval": 60, "rss_feeds": [
                {"url": "https://example.com/f.xml", "output_directory": "shows/news",
                 "output_filename": "news.mp3", "keep_latest_n": 2}
            ]}"#,
        );
        assert!(matches!(nested_slots.validate(), Err(ConfigError::Invalid(_))));

        let nested_latest = parse(
            r#"{"download_folder": "/tmp", "check_interval": 60, "rss_feeds": [
                {"url": "https://example.com/f.xml", "output_directory": "shows/news",
                 "output_filename": "news.mp3", "keep_latest": true, "keep_latest_n": 1}
            ]}"#,
        );
        nested_latest.validate().unwrap();
        assert_eq!(nested_latest.rss_feeds[0].slot_filenames(), vec!["news.mp3"]);
    }

    #[test]
    fn rejects_zero_interval() {
        let config = parse(r#"{"download_folder": "/tmp", "check_interval": 0, "rss_feeds": []}"#);
        assert!(config.validate().is_err());
    }
}
