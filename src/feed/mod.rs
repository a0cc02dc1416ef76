// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod cache;
mod fetch;
mod parse;

pub use cache::{ConditionalFetchCache, Validators};
pub use fetch::{FeedFetch, fetch_feed};
pub use parse::{FeedEntry, Podcast, parse_feed};
