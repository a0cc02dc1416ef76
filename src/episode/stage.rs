// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;

use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use url::Url;

use crate::error::StagingError;
use crate::http::HttpClient;

use super::tags::TagWriter;

/// What to download and how to tag it
#[derive(Debug, Clone, Copy)]
pub struct StageRequest<'a> {
    pub audio_url: &'a Url,
    pub show_name: &'a str,
    pub episode_title: &'a str,
}

/// Download an episode's audio to `temp_path` and tag it.
///
/// Streams the response body to disk chunk by chunk. Only HTTP 200 counts as
/// success. On any failure the partial file is removed, so an existing
/// `temp_path` after `Ok` always holds a complete, tagged download.
/// Returns the number of bytes downloaded.
pub async fn stage_episode<C: HttpClient>(
    client: &C,
    tagger: &dyn TagWriter,
    request: StageRequest<'_>,
    temp_path: &Path,
) -> Result<u64, StagingError> {
    let result = download_and_tag(client, tagger, request, temp_path).await;

    if result.is_err() {
        discard_partial(temp_path).await;
    }

    result
}

async fn download_and_tag<C: HttpClient>(
    client: &C,
    tagger: &dyn TagWriter,
    request: StageRequest<'_>,
    temp_path: &Path,
) -> Result<u64, StagingError> {
    let url = request.audio_url.as_str();

    let response = client
        .get_stream(url)
        .await
        .map_err(|e| StagingError::HttpFailed {
            url: url.to_string(),
            source: e,
        })?;

    if response.status != 200 {
        return Err(StagingError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    let mut file = File::create(temp_path)
        .await
        .map_err(|e| StagingError::FileCreateFailed {
            path: temp_path.to_path_buf(),
            source: e,
        })?;

    let expected = response.content_length;
    let mut bytes_downloaded: u64 = 0;
    let mut stream = response.body;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| StagingError::StreamFailed {
            url: url.to_string(),
            source: e,
        })?;

        file.write_all(&chunk)
            .await
            .map_err(|e| StagingError::FileWriteFailed {
                path: temp_path.to_path_buf(),
                source: e,
            })?;

        bytes_downloaded += chunk.len() as u64;
    }

    // Flush before the tag writer reopens the file
    file.flush()
        .await
        .map_err(|e| StagingError::FileWriteFailed {
            path: temp_path.to_path_buf(),
            source: e,
        })?;
    drop(file);

    if let Some(expected) = expected
        && expected != bytes_downloaded
    {
        return Err(StagingError::Incomplete {
            url: url.to_string(),
            expected,
            received: bytes_downloaded,
        });
    }

    debug!(
        url = %url,
        path = %temp_path.display(),
        bytes = bytes_downloaded,
        "Downloaded episode"
    );

    tagger.write_tags(temp_path, request.episode_title, request.show_name)?;

    debug!(
        path = %temp_path.display(),
        title = %request.episode_title,
        artist = %request.show_name,
        "Set metadata"
    );

    Ok(bytes_downloaded)
}

async fn discard_partial(temp_path: &Path) {
    match tokio::fs::remove_file(temp_path).await {
        Ok(()) => debug!(path = %temp_path.display(), "Removed partial staging file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(
            path = %temp_path.display(),
            error = %e,
            "Failed to remove partial staging file"
        ),
    }
}
