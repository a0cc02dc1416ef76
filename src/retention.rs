// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-feed retention modes: keep-latest, keep-weekdays and keep-latest-N.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::FeedPolicy;
use crate::episode::{QualifyOptions, qualify};
use crate::error::StateError;
use crate::feed::Podcast;
use crate::http::HttpClient;
use crate::pending::PendingRegistry;
use crate::pipeline::{Delivery, Pipeline};
use crate::state::files_by_creation;

/// Prefix of a staged download sitting next to its destination
pub const STAGING_PREFIX: &str = "temp_";

/// Name of the staging file for a destination filename
pub fn staging_name(filename: &str) -> String {
    format!("{STAGING_PREFIX}{filename}")
}

/// Filenames used by keep-latest-N.
///
/// Slot 0 is the feed's base filename; slot `i > 0` is
/// `"{i}_{output_directory}_{output_filename}"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotPattern<'a> {
    directory: &'a str,
    filename: &'a str,
}

impl<'a> SlotPattern<'a> {
    pub fn new(directory: &'a str, filename: &'a str) -> Self {
        Self {
            directory,
            filename,
        }
    }

    pub fn base(&self) -> &'a str {
        self.filename
    }

    pub fn indexed(&self, index: usize) -> String {
        format!("{index}_{}_{}", self.directory, self.filename)
    }

    /// Filename for the episode at `position` in the qualified list
    pub fn slot(&self, position: usize) -> String {
        if position == 0 {
            self.base().to_string()
        } else {
            self.indexed(position)
        }
    }

    /// Whether `name` is the base filename or an indexed slot of it
    pub fn matches(&self, name: &str) -> bool {
        if name == self.filename {
            return true;
        }

        let Some((index, rest)) = name.split_once('_') else {
            return false;
        };
        let is_index = !index.is_empty()
            && index.bytes().all(|b| b.is_ascii_digit())
            && index.parse::<usize>().is_ok_and(|i| i > 0);

        is_index
            && rest
                .strip_prefix(self.directory)
                .and_then(|r| r.strip_prefix('_'))
                .is_some_and(|r| r == self.filename)
    }
}

/// Counts for one feed in one poll cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedReport {
    pub feed_url: String,
    /// The server reported the feed unchanged; nothing else was done
    pub not_modified: bool,
    pub replaced: usize,
    pub deferred: usize,
    pub staging_failures: usize,
    pub publish_failures: usize,
    pub pruned: usize,
    /// Retention modes that found nothing to publish
    pub empty_modes: usize,
}

impl FeedReport {
    pub fn new(feed_url: &str) -> Self {
        Self {
            feed_url: feed_url.to_string(),
            ..Self::default()
        }
    }

    fn record(&mut self, delivery: Delivery) {
        match delivery {
            Delivery::Replaced => self.replaced += 1,
            Delivery::Deferred => self.deferred += 1,
            Delivery::StagingFailed => self.staging_failures += 1,
            Delivery::PublishFailed => self.publish_failures += 1,
        }
    }
}

/// Run every active retention mode of `policy` against a freshly fetched feed
pub async fn apply_retention<C: HttpClient>(
    pipeline: &Pipeline<'_, C>,
    pending: &mut PendingRegistry,
    policy: &FeedPolicy,
    podcast: &Podcast,
    directory: &Path,
) -> FeedReport {
    let mut report = FeedReport::new(&policy.url);

    if policy.keep_latest {
        keep_latest(pipeline, pending, policy, podcast, directory, &mut report).await;
    }

    if policy.keep_weekdays {
        keep_weekdays(pipeline, pending, policy, podcast, directory, &mut report).await;
    }

    if policy.keep_latest_n > 0 {
        keep_latest_n(pipeline, pending, policy, podcast, directory, &mut report).await;
    }

    report
}

async fn keep_latest<C: HttpClient>(
    pipeline: &Pipeline<'_, C>,
    pending: &mut PendingRegistry,
    policy: &FeedPolicy,
    podcast: &Podcast,
    directory: &Path,
    report: &mut FeedReport,
) {
    let options = QualifyOptions {
        min_duration: policy.min_duration,
        max_count: Some(1),
        weekday: None,
    };

    let Some(episode) = qualify(podcast, &options).into_iter().next() else {
        log_no_match(policy, None);
        report.empty_modes += 1;
        return;
    };

    let delivery = pipeline
        .deliver(&episode, directory, &policy.output_filename, pending)
        .await;
    report.record(delivery);
}

async fn keep_weekdays<C: HttpClient>(
    pipeline: &Pipeline<'_, C>,
    pending: &mut PendingRegistry,
    policy: &FeedPolicy,
    podcast: &Podcast,
    directory: &Path,
    report: &mut FeedReport,
) {
    for (day, filename) in &policy.weekday_filenames {
        let options = QualifyOptions {
            min_duration: policy.min_duration,
            max_count: Some(1),
            weekday: Some(day.as_str()),
        };

        let Some(episode) = qualify(podcast, &options).into_iter().next() else {
            log_no_match(policy, Some(day.as_str()));
            report.empty_modes += 1;
            continue;
        };

        let delivery = pipeline.deliver(&episode, directory, filename, pending).await;
        report.record(delivery);
    }
}

async fn keep_latest_n<C: HttpClient>(
    pipeline: &Pipeline<'_, C>,
    pending: &mut PendingRegistry,
    policy: &FeedPolicy,
    podcast: &Podcast,
    directory: &Path,
    report: &mut FeedReport,
) {
    let options = QualifyOptions {
        min_duration: policy.min_duration,
        max_count: Some(policy.keep_latest_n),
        weekday: None,
    };

    let episodes = qualify(podcast, &options);
    if episodes.is_empty() {
        // A quiet feed must never cost us the episodes we already have
        log_no_match(policy, None);
        report.empty_modes += 1;
        return;
    }

    let pattern = policy.slot_pattern();
    for (position, episode) in episodes.iter().enumerate() {
        let filename = pattern.slot(position);
        let delivery = pipeline.deliver(episode, directory, &filename, pending).await;
        report.record(delivery);
    }

    match prune_slots(directory, &pattern, policy.keep_latest_n) {
        Ok(removed) => {
            for path in &removed {
                info!(path = %path.display(), "Removed old episode");
            }
            report.pruned += removed.len();
        }
        Err(e) => warn!(feed = %policy.url, error = %e, "Failed to prune old episodes"),
    }
}

/// Delete all but the `keep` most recently created files matching `pattern`.
///
/// Returns the removed paths. Stops at the first file that can't be removed.
pub fn prune_slots(
    directory: &Path,
    pattern: &SlotPattern<'_>,
    keep: usize,
) -> Result<Vec<PathBuf>, StateError> {
    let files = files_by_creation(directory, |name| pattern.matches(name))?;
    let excess = files.len().saturating_sub(keep);

    let mut removed = Vec::with_capacity(excess);
    for path in files.into_iter().take(excess) {
        std::fs::remove_file(&path).map_err(|e| StateError::RemoveFailed {
            path: path.clone(),
            source: e,
        })?;
        removed.push(path);
    }

    Ok(removed)
}

fn log_no_match(policy: &FeedPolicy, weekday: Option<&str>) {
    info!(
        feed = %policy.url,
        min_duration = policy.min_duration,
        day = weekday.unwrap_or("any day"),
        "No qualifying episodes"
    );
}
