// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{Config, FeedPolicy};
use crate::episode::TagWriter;
use crate::error::PollError;
use crate::feed::{ConditionalFetchCache, FeedFetch, fetch_feed};
use crate::http::HttpClient;
use crate::pending::{DrainReport, PendingRegistry};
use crate::pipeline::Pipeline;
use crate::publish::OpenFileProbe;
use crate::retention::{FeedReport, apply_retention};
use crate::state::{clean_stale_staging, ensure_output_dir};

/// Result of one pass over all feeds plus the pending drain
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Feeds that were fetched (or answered 304)
    pub feeds: Vec<FeedReport>,
    /// Feeds skipped this cycle because they could not be fetched or parsed
    pub feed_errors: usize,
    pub drain: DrainReport,
}

impl CycleReport {
    pub fn replaced(&self) -> usize {
        self.feeds.iter().map(|f| f.replaced).sum::<usize>() + self.drain.replaced
    }

    pub fn deferred(&self) -> usize {
        self.feeds.iter().map(|f| f.deferred).sum()
    }

    pub fn failures(&self) -> usize {
        self.feeds
            .iter()
            .map(|f| f.staging_failures + f.publish_failures)
            .sum::<usize>()
            + self.drain.failed
    }
}

/// Owns every piece of state that lives across poll cycles.
///
/// Feeds are handled strictly one after another, so the conditional-fetch
/// cache and the pending registry need no locking.
pub struct Poller<C> {
    config: Config,
    client: C,
    tagger: Arc<dyn TagWriter>,
    probe: Arc<dyn OpenFileProbe>,
    cache: ConditionalFetchCache,
    pending: PendingRegistry,
}

impl<C: HttpClient> Poller<C> {
    pub fn new(
        config: Config,
        client: C,
        tagger: Arc<dyn TagWriter>,
        probe: Arc<dyn OpenFileProbe>,
    ) -> Self {
        let pending = PendingRegistry::new(config.pending_retry_limit);
        Self {
            config,
            client,
            tagger,
            probe,
            cache: ConditionalFetchCache::new(),
            pending,
        }
    }

    pub fn cache(&self) -> &ConditionalFetchCache {
        &self.cache
    }

    pub fn pending(&self) -> &PendingRegistry {
        &self.pending
    }

    /// Create every feed directory and clear staging files from an earlier run.
    ///
    /// Failures are logged; the affected feed will report them again when polled.
    pub fn prepare(&self) {
        for policy in &self.config.rss_feeds {
            let directory = policy.directory(&self.config.download_folder);

            let result = ensure_output_dir(&directory)
                .and_then(|()| clean_stale_staging(&directory, &policy.slot_filenames()));

            match result {
                Ok(0) => {}
                Ok(count) => info!(
                    directory = %directory.display(),
                    count,
                    "Removed stale staging files"
                ),
                Err(e) => warn!(feed = %policy.url, error = %e, "Failed to prepare output directory"),
            }
        }
    }

    /// Process every feed once, then retry pending replacements
    pub async fn run_cycle(&mut self) -> CycleReport {
        let pipeline = Pipeline::new(&self.client, self.tagger.as_ref(), self.probe.as_ref());
        let mut report = CycleReport::default();

        for policy in &self.config.rss_feeds {
            let directory = policy.directory(&self.config.download_folder);

            match poll_feed(&pipeline, &mut self.cache, &mut self.pending, policy, &directory).await {
                Ok(feed_report) => report.feeds.push(feed_report),
                Err(e) => {
                    warn!(feed = %policy.url, error = %e, "Skipping feed this cycle");
                    report.feed_errors += 1;
                }
            }
        }

        if !self.pending.is_empty() {
            debug!(pending = self.pending.len(), "Retrying pending replacements");
            report.drain = self.pending.drain(&pipeline).await;
        }

        report
    }

    /// Poll forever, sleeping `check_interval` after each cycle
    pub async fn run(&mut self) {
        self.prepare();

        loop {
            let report = self.run_cycle().await;

            info!(
                feeds = report.feeds.len(),
                feed_errors = report.feed_errors,
                replaced = report.replaced(),
                deferred = report.deferred(),
                failures = report.failures(),
                pending = self.pending.len(),
                cached_feeds = self.cache.len(),
                "Poll cycle finished"
            );

            info!(
                seconds = self.config.check_interval,
                "Sleeping before next check"
            );
            tokio::time::sleep(self.config.check_interval()).await;
        }
    }
}

async fn poll_feed<C: HttpClient>(
    pipeline: &Pipeline<'_, C>,
    cache: &mut ConditionalFetchCache,
    pending: &mut PendingRegistry,
    policy: &FeedPolicy,
    directory: &Path,
) -> Result<FeedReport, PollError> {
    ensure_output_dir(directory)?;

    let podcast = match fetch_feed(pipeline.client, cache, &policy.url).await? {
        FeedFetch::NotModified => {
            info!(feed = %policy.url, "No changes detected for feed");
            return Ok(FeedReport {
                not_modified: true,
                ..FeedReport::new(&policy.url)
            });
        }
        FeedFetch::Updated(podcast) => podcast,
    };

    debug!(
        feed = %policy.url,
        title = %podcast.title,
        entries = podcast.entries.len(),
        "Fetched feed"
    );

    Ok(apply_retention(pipeline, pending, policy, &podcast, directory).await)
}
