// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading the configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors that can occur when fetching or parsing feeds
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Failed to fetch feed from {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} for feed {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to parse feed as RSS ({rss}) or Atom ({atom})")]
    ParseFailed {
        rss: rss::Error,
        atom: atom_syndication::Error,
    },
}

/// Errors that can occur while writing tags into a staged file
#[derive(Error, Debug)]
pub enum TagError {
    #[error("Failed to read tags from {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: id3::Error,
    },

    #[error("Failed to write tags to {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: id3::Error,
    },
}

/// Errors that can occur while staging an episode to its temporary path
#[derive(Error, Debug)]
pub enum StagingError {
    #[error("HTTP request failed for {url}: {source}")]
    HttpFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to create file {path}: {source}")]
    FileCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to file {path}: {source}")]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stream error while downloading {url}: {source}")]
    StreamFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Download of {url} ended after {received} of {expected} bytes")]
    Incomplete {
        url: String,
        expected: u64,
        received: u64,
    },

    #[error(transparent)]
    Tags(#[from] TagError),
}

/// Errors that can occur while swapping a staged file into place
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Staged file {0} does not exist")]
    MissingStagedFile(PathBuf),

    #[error("Failed to remove previous file {path}: {source}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move {from} to {to}: {source}")]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The previous file was removed but the staged file could not take its place
    #[error("Removed {to} but failed to move {from} into place, destination is now missing: {source}")]
    DestinationLost {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PublishError {
    /// Whether the failure left the destination path without any file
    pub fn destination_lost(&self) -> bool {
        matches!(self, Self::DestinationLost { .. })
    }
}

/// Errors that can occur when managing an output directory
#[derive(Error, Debug)]
pub enum StateError {
    #[error("Failed to read directory {path}: {source}")]
    ReadDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory {path}: {source}")]
    CreateDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove file {path}: {source}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that make a feed skip the current poll cycle
#[derive(Error, Debug)]
pub enum PollError {
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("State error: {0}")]
    State(#[from] StateError),
}
