// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use chrono::{DateTime, Utc};
use url::Url;

use crate::feed::{FeedEntry, Podcast};

/// An entry that passed qualification, ready to be staged
#[derive(Debug, Clone, PartialEq)]
pub struct Episode {
    pub audio_url: Url,
    pub title: String,
    pub published: Option<DateTime<Utc>>,
    pub duration_secs: Option<u64>,
    /// Feed title, written as the artist tag
    pub show_name: String,
}

/// Filters applied while scanning a feed
#[derive(Debug, Clone, Default)]
pub struct QualifyOptions<'a> {
    /// Minimum duration in seconds; 0 disables the duration filter
    pub min_duration: u64,
    /// Stop after this many matches (None = scan everything)
    pub max_count: Option<usize>,
    /// English weekday name the publish date must fall on, e.g. "Monday"
    pub weekday: Option<&'a str>,
}

/// Parse an `itunes:duration` value such as `1:02:03`, `45:30` or `3600`.
///
/// The rightmost group is seconds, the next minutes, the next hours.
/// Returns None for anything that isn't colon-separated digits.
pub fn parse_duration(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    raw.split(':')
        .rev()
        .enumerate()
        .try_fold(0u64, |total, (position, group)| {
            let value: u64 = group.trim().parse().ok()?;
            let factor = 60u64.checked_pow(u32::try_from(position).ok()?)?;
            total.checked_add(value.checked_mul(factor)?)
        })
}

/// Weekday name of a timestamp, evaluated in UTC
pub fn weekday_name(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%A").to_string()
}

/// Select qualifying episodes from a feed, in document order.
///
/// No match is a normal outcome and yields an empty list.
pub fn qualify(podcast: &Podcast, options: &QualifyOptions<'_>) -> Vec<Episode> {
    let mut episodes = Vec::new();

    for entry in &podcast.entries {
        if options.max_count.is_some_and(|max| episodes.len() >= max) {
            break;
        }

        if let Some(episode) = qualify_entry(entry, &podcast.title, options) {
            episodes.push(episode);
        }
    }

    episodes
}

fn qualify_entry(entry: &FeedEntry, show_name: &str, options: &QualifyOptions<'_>) -> Option<Episode> {
    let duration_secs = entry.duration.as_deref().and_then(parse_duration);
    let published = entry.pub_date.map(|dt| dt.with_timezone(&Utc));

    if let Some(weekday) = options.weekday {
        let published = published?;
        if weekday_name(&published) != weekday {
            return None;
        }
    }

    if options.min_duration > 0 && duration_secs? < options.min_duration {
        return None;
    }

    let audio_url = entry.enclosure.clone()?;

    Some(Episode {
        audio_url,
        title: entry.title.clone(),
        published,
        duration_secs,
        show_name: show_name.to_string(),
    })
}
