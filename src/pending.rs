// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Replacements deferred because their destination was open, retried once
//! per poll cycle after all feeds have been processed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};
use url::Url;

use crate::episode::{Episode, StageRequest, stage_episode};
use crate::http::HttpClient;
use crate::pipeline::{Pipeline, handle_publish_failure};
use crate::publish::{PublishOutcome, publish};

/// Everything needed to retry a deferred swap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReplacement {
    pub audio_url: Url,
    pub staged_path: PathBuf,
    pub show_name: String,
    pub episode_title: String,
    /// Drains that found the destination still in use
    pub attempts: u32,
}

impl PendingReplacement {
    pub fn new(episode: &Episode, staged_path: PathBuf) -> Self {
        Self {
            audio_url: episode.audio_url.clone(),
            staged_path,
            show_name: episode.show_name.clone(),
            episode_title: episode.title.clone(),
            attempts: 0,
        }
    }
}

/// Counts for one drain of the registry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub replaced: usize,
    pub still_in_use: usize,
    pub failed: usize,
    /// Entries dropped after exhausting the retry limit
    pub abandoned: usize,
}

/// Deferred replacements keyed by destination path; at most one per path
#[derive(Debug, Clone, Default)]
pub struct PendingRegistry {
    entries: HashMap<PathBuf, PendingReplacement>,
    /// 0 keeps retrying until the destination is released
    retry_limit: u32,
}

impl PendingRegistry {
    pub fn new(retry_limit: u32) -> Self {
        Self {
            entries: HashMap::new(),
            retry_limit,
        }
    }

    /// Record a deferred replacement, replacing any older one for `destination`
    pub fn insert(&mut self, destination: PathBuf, replacement: PendingReplacement) {
        self.entries.insert(destination, replacement);
    }

    pub fn remove(&mut self, destination: &Path) -> Option<PendingReplacement> {
        self.entries.remove(destination)
    }

    pub fn get(&self, destination: &Path) -> Option<&PendingReplacement> {
        self.entries.get(destination)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Retry every pending replacement whose destination is free again.
    ///
    /// An entry whose destination is still open stays for the next drain,
    /// until it has waited `retry_limit` drains. An entry whose destination
    /// is free is attempted once and removed, whatever the outcome. If its
    /// staged file has gone missing, the episode is downloaded again first.
    pub async fn drain<C: HttpClient>(&mut self, pipeline: &Pipeline<'_, C>) -> DrainReport {
        let mut report = DrainReport::default();

        let mut destinations: Vec<PathBuf> = self.entries.keys().cloned().collect();
        destinations.sort();

        for destination in destinations {
            let Some(mut entry) = self.entries.remove(&destination) else {
                continue;
            };

            if pipeline.probe.is_open(&destination) {
                entry.attempts += 1;
                if self.retry_limit > 0 && entry.attempts >= self.retry_limit {
                    abandon(&destination, &entry);
                    report.abandoned += 1;
                } else {
                    debug!(
                        path = %destination.display(),
                        attempts = entry.attempts,
                        "File still in use, keeping pending replacement"
                    );
                    self.entries.insert(destination, entry);
                    report.still_in_use += 1;
                }
                continue;
            }

            if !entry.staged_path.is_file() {
                let request = StageRequest {
                    audio_url: &entry.audio_url,
                    show_name: &entry.show_name,
                    episode_title: &entry.episode_title,
                };
                if let Err(e) =
                    stage_episode(pipeline.client, pipeline.tagger, request, &entry.staged_path)
                        .await
                {
                    warn!(
                        path = %destination.display(),
                        error = %e,
                        "Failed to download episode for pending replacement"
                    );
                    report.failed += 1;
                    continue;
                }
            }

            match publish(pipeline.probe, &entry.staged_path, &destination) {
                Ok(PublishOutcome::Replaced) => {
                    info!(
                        path = %destination.display(),
                        title = %entry.episode_title,
                        "Replaced old episode"
                    );
                    report.replaced += 1;
                }
                Ok(PublishOutcome::Deferred) => {
                    // Opened again between the probe above and the swap
                    entry.attempts += 1;
                    self.entries.insert(destination, entry);
                    report.still_in_use += 1;
                }
                Err(e) => {
                    handle_publish_failure(&e, &entry.staged_path);
                    report.failed += 1;
                }
            }
        }

        report
    }
}

fn abandon(destination: &Path, entry: &PendingReplacement) {
    error!(
        path = %destination.display(),
        title = %entry.episode_title,
        attempts = entry.attempts,
        "File stayed in use, giving up on pending replacement"
    );

    if let Err(e) = std::fs::remove_file(&entry.staged_path)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!(
            path = %entry.staged_path.display(),
            error = %e,
            "Failed to remove abandoned staging file"
        );
    }
}
