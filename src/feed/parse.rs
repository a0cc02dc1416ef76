// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use chrono::{DateTime, FixedOffset};
use tracing::debug;
use url::Url;

use crate::error::FeedError;

/// Represents a parsed podcast feed
#[derive(Debug, Clone)]
pub struct Podcast {
    pub title: String,
    pub entries: Vec<FeedEntry>,
}

/// A single feed entry, in document order.
///
/// Only the fields needed for qualification are extracted; anything else in
/// the document is ignored.
#[derive(Debug, Clone)]
pub struct FeedEntry {
    pub title: String,
    pub pub_date: Option<DateTime<FixedOffset>>,
    /// URL of the first enclosure, if the entry has a usable one
    pub enclosure: Option<Url>,
    /// Raw `itunes:duration` value
    pub duration: Option<String>,
}

/// Parse feed bytes as RSS, falling back to Atom
pub fn parse_feed(bytes: &[u8]) -> Result<Podcast, FeedError> {
    match parse_rss(bytes) {
        Ok(podcast) => Ok(podcast),
        Err(rss) => {
            debug!(error = %rss, "Not an RSS document, trying Atom");
            parse_atom(bytes).map_err(|atom| FeedError::ParseFailed { rss, atom })
        }
    }
}

fn parse_rss(bytes: &[u8]) -> Result<Podcast, rss::Error> {
    let channel = rss::Channel::read_from(bytes)?;

    let entries = channel.items().iter().map(parse_rss_item).collect();

    Ok(Podcast {
        title: channel.title().to_string(),
        entries,
    })
}

fn parse_rss_item(item: &rss::Item) -> FeedEntry {
    let title = item
        .title()
        .map(String::from)
        .unwrap_or_else(|| "Untitled Episode".to_string());

    let pub_date = item.pub_date().and_then(|date_str| {
        DateTime::parse_from_rfc2822(date_str)
            .or_else(|_| parse_relaxed_date(date_str))
            .ok()
    });

    FeedEntry {
        title,
        pub_date,
        enclosure: item
            .enclosure()
            .and_then(|enclosure| Url::parse(enclosure.url()).ok()),
        duration: item
            .itunes_ext()
            .and_then(|ext| ext.duration().map(|d| d.trim().to_string())),
    }
}

fn parse_atom(bytes: &[u8]) -> Result<Podcast, atom_syndication::Error> {
    let feed = atom_syndication::Feed::read_from(bytes)?;

    let entries = feed
        .entries()
        .iter()
        .map(|entry| FeedEntry {
            title: entry.title().as_str().to_string(),
            pub_date: Some(entry.published().copied().unwrap_or(*entry.updated())),
            enclosure: entry
                .links()
                .iter()
                .find(|link| link.rel() == "enclosure")
                .and_then(|link| Url::parse(link.href()).ok()),
            duration: None,
        })
        .collect();

    Ok(Podcast {
        title: feed.title().as_str().to_string(),
        entries,
    })
}

/// Try to parse dates that don't strictly conform to RFC 2822
fn parse_relaxed_date(date_str: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    let formats = [
        "%a, %d %b %Y %H:%M:%S %z",
        "%Y-%m-%dT%H:%M:%S%:z",
        "%Y-%m-%d %H:%M:%S %z",
    ];

    formats
        .iter()
        .find_map(|format| DateTime::parse_from_str(date_str, format).ok())
        .map_or_else(|| DateTime::parse_from_rfc3339(date_str), Ok)
}
