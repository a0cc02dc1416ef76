// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashMap;

/// Cache validators remembered from the last full response for a feed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validators {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

impl Validators {
    pub fn is_empty(&self) -> bool {
        self.etag.is_none() && self.last_modified.is_none()
    }
}

/// Per-feed-URL memory of `ETag` / `Last-Modified` for conditional fetches.
///
/// Entries live as long as the cache itself; there is no expiry.
#[derive(Debug, Clone, Default)]
pub struct ConditionalFetchCache {
    entries: HashMap<String, Validators>,
}

impl ConditionalFetchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validators to send with the next request for `url`
    pub fn validators(&self, url: &str) -> Validators {
        self.entries.get(url).cloned().unwrap_or_default()
    }

    /// Overwrite the entry for `url` with the headers of a full response.
    ///
    /// A header missing from the response clears the cached value for it.
    pub fn record(&mut self, url: &str, validators: Validators) {
        self.entries.insert(url.to_string(), validators);
    }

    /// Number of feeds with remembered validators
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
