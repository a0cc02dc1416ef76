// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use tracing::debug;

use crate::error::FeedError;
use crate::http::{HttpClient, STATUS_NOT_MODIFIED};

use super::cache::{ConditionalFetchCache, Validators};
use super::parse::{Podcast, parse_feed};

/// Outcome of a conditional feed fetch
#[derive(Debug, Clone)]
pub enum FeedFetch {
    /// The server answered 304; the cached validators remain valid
    NotModified,
    /// A full document was fetched and parsed
    Updated(Podcast),
}

/// Fetch and parse a feed, using and updating the conditional-fetch cache.
///
/// The cache entry for `url` is only replaced once the response has parsed,
/// so a failed fetch leaves it untouched.
pub async fn fetch_feed<C: HttpClient>(
    client: &C,
    cache: &mut ConditionalFetchCache,
    url: &str,
) -> Result<FeedFetch, FeedError> {
    let validators = cache.validators(url);
    debug!(
        feed = %url,
        conditional = !validators.is_empty(),
        "Fetching feed"
    );

    let response = client
        .get_conditional(url, &validators)
        .await
        .map_err(|e| FeedError::FetchFailed {
            url: url.to_string(),
            source: e,
        })?;

    if response.status == STATUS_NOT_MODIFIED {
        debug!(feed = %url, "Feed not modified");
        return Ok(FeedFetch::NotModified);
    }

    if !(200..300).contains(&response.status) {
        return Err(FeedError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    let podcast = parse_feed(&response.body)?;

    cache.record(
        url,
        Validators {
            etag: response.etag,
            last_modified: response.last_modified,
        },
    );

    Ok(FeedFetch::Updated(podcast))
}
