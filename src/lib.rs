// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod config;
pub mod episode;
pub mod error;
pub mod feed;
pub mod http;
pub mod pending;
pub mod pipeline;
pub mod poll;
pub mod publish;
pub mod retention;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use config::{Config, FeedPolicy};
pub use episode::{Episode, Id3TagWriter, QualifyOptions, TagWriter, parse_duration, qualify};
pub use error::{ConfigError, FeedError, PollError, PublishError, StagingError, StateError, TagError};
pub use feed::{ConditionalFetchCache, FeedFetch, Podcast, fetch_feed, parse_feed};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use pending::{DrainReport, PendingRegistry, PendingReplacement};
pub use poll::{CycleReport, Poller};
pub use publish::{OpenFileProbe, ProcFsProbe, PublishOutcome, publish};
pub use retention::{FeedReport, SlotPattern};
