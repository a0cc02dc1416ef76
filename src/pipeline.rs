// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::episode::{Episode, StageRequest, TagWriter, stage_episode};
use crate::error::PublishError;
use crate::http::HttpClient;
use crate::pending::{PendingRegistry, PendingReplacement};
use crate::publish::{OpenFileProbe, PublishOutcome, publish};
use crate::retention::staging_name;

/// What happened to one episode on its way to a destination file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Replaced,
    /// Destination in use; registered for retry
    Deferred,
    StagingFailed,
    PublishFailed,
}

/// The collaborators needed to stage and publish an episode
pub struct Pipeline<'a, C> {
    pub client: &'a C,
    pub tagger: &'a dyn TagWriter,
    pub probe: &'a dyn OpenFileProbe,
}

impl<'a, C: HttpClient> Pipeline<'a, C> {
    pub fn new(client: &'a C, tagger: &'a dyn TagWriter, probe: &'a dyn OpenFileProbe) -> Self {
        Self {
            client,
            tagger,
            probe,
        }
    }

    /// Stage `episode` next to `directory/filename` and swap it into place.
    ///
    /// A deferred swap is recorded in `pending`; a successful one clears any
    /// older pending entry for the same destination.
    pub async fn deliver(
        &self,
        episode: &Episode,
        directory: &Path,
        filename: &str,
        pending: &mut PendingRegistry,
    ) -> Delivery {
        let destination = directory.join(filename);
        let staged = directory.join(staging_name(filename));

        let request = StageRequest {
            audio_url: &episode.audio_url,
            show_name: &episode.show_name,
            episode_title: &episode.title,
        };

        if let Err(e) = stage_episode(self.client, self.tagger, request, &staged).await {
            warn!(
                url = %episode.audio_url,
                title = %episode.title,
                error = %e,
                "Failed to download episode"
            );
            return Delivery::StagingFailed;
        }

        match publish(self.probe, &staged, &destination) {
            Ok(PublishOutcome::Replaced) => {
                pending.remove(&destination);
                info!(
                    path = %destination.display(),
                    title = %episode.title,
                    "Replaced old episode"
                );
                Delivery::Replaced
            }
            Ok(PublishOutcome::Deferred) => {
                warn!(
                    path = %destination.display(),
                    title = %episode.title,
                    "File is in use, will retry later"
                );
                pending.insert(
                    destination,
                    PendingReplacement::new(episode, staged),
                );
                Delivery::Deferred
            }
            Err(e) => {
                handle_publish_failure(&e, &staged);
                Delivery::PublishFailed
            }
        }
    }
}

/// Report a failed swap and drop its staged file.
///
/// When the destination is already gone the staged file is the only copy of
/// the episode, so it stays on disk for manual recovery.
pub(crate) fn handle_publish_failure(e: &PublishError, staged: &Path) {
    if e.destination_lost() {
        error!(
            error = %e,
            staged = %staged.display(),
            "Destination file is missing after failed replacement"
        );
        return;
    }

    error!(error = %e, "Failed to replace episode");
    match std::fs::remove_file(staged) {
        Ok(()) => debug!(path = %staged.display(), "Removed unpublished staging file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(
            path = %staged.display(),
            error = %e,
            "Failed to remove unpublished staging file"
        ),
    }
}
