// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Test doubles shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use crate::episode::TagWriter;
use crate::error::TagError;
use crate::feed::Validators;
use crate::http::{ByteStream, FeedResponse, HttpClient, HttpResponse, STATUS_NOT_MODIFIED};
use crate::publish::OpenFileProbe;

struct MockFeed {
    status: u16,
    body: String,
    etag: Option<String>,
}

#[derive(Default)]
struct MockState {
    feeds: HashMap<String, MockFeed>,
    audio: HashMap<String, (u16, Vec<u8>)>,
    declared_lengths: HashMap<String, u64>,
    feed_requests: Vec<Validators>,
    audio_requests: Vec<String>,
}

/// In-memory HTTP server that honours `If-None-Match`
#[derive(Clone, Default)]
pub(crate) struct MockHttpClient {
    state: Arc<Mutex<MockState>>,
}

impl MockHttpClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_feed(self, url: &str, body: &str, etag: Option<&str>) -> Self {
        self.set_feed(url, body, etag);
        self
    }

    pub(crate) fn with_feed_status(self, url: &str, status: u16) -> Self {
        self.state.lock().unwrap().feeds.insert(
            url.to_string(),
            MockFeed {
                status,
                body: String::new(),
                etag: None,
            },
        );
        self
    }

    pub(crate) fn with_audio(self, url: &str, data: &[u8]) -> Self {
        self.set_audio(url, 200, data);
        self
    }

    pub(crate) fn with_audio_status(self, url: &str, status: u16) -> Self {
        self.set_audio(url, status, b"error page");
        self
    }

    /// Advertise `len` as Content-Length regardless of the body served
    pub(crate) fn with_declared_length(self, url: &str, len: u64) -> Self {
        self.state
            .lock()
            .unwrap()
            .declared_lengths
            .insert(url.to_string(), len);
        self
    }

    pub(crate) fn set_feed(&self, url: &str, body: &str, etag: Option<&str>) {
        self.state.lock().unwrap().feeds.insert(
            url.to_string(),
            MockFeed {
                status: 200,
                body: body.to_string(),
                etag: etag.map(String::from),
            },
        );
    }

    pub(crate) fn set_audio(&self, url: &str, status: u16, data: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .audio
            .insert(url.to_string(), (status, data.to_vec()));
    }

    /// Validators sent with each feed request, in order
    pub(crate) fn feed_requests(&self) -> Vec<Validators> {
        self.state.lock().unwrap().feed_requests.clone()
    }

    /// URLs of each audio request, in order
    pub(crate) fn audio_requests(&self) -> Vec<String> {
        self.state.lock().unwrap().audio_requests.clone()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get_conditional(
        &self,
        url: &str,
        validators: &Validators,
    ) -> Result<FeedResponse, reqwest::Error> {
        let mut state = self.state.lock().unwrap();
        state.feed_requests.push(validators.clone());

        let Some(feed) = state.feeds.get(url) else {
            return Ok(FeedResponse {
                status: 404,
                etag: None,
                last_modified: None,
                body: Bytes::new(),
            });
        };

        if feed.etag.is_some() && feed.etag == validators.etag {
            return Ok(FeedResponse {
                status: STATUS_NOT_MODIFIED,
                etag: feed.etag.clone(),
                last_modified: None,
                body: Bytes::new(),
            });
        }

        Ok(FeedResponse {
            status: feed.status,
            etag: feed.etag.clone(),
            last_modified: None,
            body: Bytes::from(feed.body.clone()),
        })
    }

    async fn get_stream(&self, url: &str) -> Result<HttpResponse, reqwest::Error> {
        let mut state = self.state.lock().unwrap();
        state.audio_requests.push(url.to_string());

        let (status, data) = state
            .audio
            .get(url)
            .cloned()
            .unwrap_or((404, b"not found".to_vec()));
        let len = state
            .declared_lengths
            .get(url)
            .copied()
            .unwrap_or(data.len() as u64);

        // Two chunks, so streaming writes are exercised
        let split = data.len() / 2;
        let chunks = vec![
            Ok(Bytes::copy_from_slice(&data[..split])),
            Ok(Bytes::copy_from_slice(&data[split..])),
        ];
        let stream: ByteStream = Box::pin(futures::stream::iter(chunks));

        Ok(HttpResponse {
            status,
            content_length: Some(len),
            body: stream,
        })
    }
}

/// Probe reporting whatever paths the test marked as open
#[derive(Clone, Default)]
pub(crate) struct FakeProbe {
    open: Arc<Mutex<HashSet<PathBuf>>>,
}

impl FakeProbe {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn open(&self, path: &Path) {
        self.open.lock().unwrap().insert(path.to_path_buf());
    }

    pub(crate) fn close(&self, path: &Path) {
        self.open.lock().unwrap().remove(path);
    }
}

impl OpenFileProbe for FakeProbe {
    fn is_open(&self, path: &Path) -> bool {
        self.open.lock().unwrap().contains(path)
    }
}

/// Probe that reports nothing open but deletes `path` when consulted, so the
/// staged file is gone by the time it should be renamed
pub(crate) struct RemovingProbe {
    path: PathBuf,
}

impl RemovingProbe {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl OpenFileProbe for RemovingProbe {
    fn is_open(&self, _path: &Path) -> bool {
        let _ = std::fs::remove_file(&self.path);
        false
    }
}

/// Tag writer that records calls instead of touching the file
#[derive(Clone, Default)]
pub(crate) struct RecordingTagWriter {
    calls: Arc<Mutex<Vec<(PathBuf, String, String)>>>,
    fail: bool,
}

impl RecordingTagWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// (path, title, artist) for each call
    pub(crate) fn calls(&self) -> Vec<(PathBuf, String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl TagWriter for RecordingTagWriter {
    fn write_tags(&self, path: &Path, title: &str, artist: &str) -> Result<(), TagError> {
        self.calls
            .lock()
            .unwrap()
            .push((path.to_path_buf(), title.to_string(), artist.to_string()));

        if self.fail {
            return Err(TagError::WriteFailed {
                path: path.to_path_buf(),
                source: id3::Error::new(id3::ErrorKind::InvalidInput, "refusing to tag"),
            });
        }
        Ok(())
    }
}

/// Render one RSS `<item>`
pub(crate) fn rss_item(
    title: &str,
    pub_date: &str,
    duration: Option<&str>,
    enclosure: Option<&str>,
) -> String {
    let mut item = format!("<item><title>{title}</title><pubDate>{pub_date}</pubDate>");
    if let Some(duration) = duration {
        item.push_str(&format!("<itunes:duration>{duration}</itunes:duration>"));
    }
    if let Some(url) = enclosure {
        item.push_str(&format!(
            r#"<enclosure url="{url}" length="0" type="audio/mpeg"/>"#
        ));
    }
    item.push_str("</item>");
    item
}

/// Render an RSS document around the given items
pub(crate) fn rss_feed(title: &str, items: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd">
  <channel>
    <title>{title}</title>
    <link>https://example.com</link>
    <description>Test feed</description>
    {}
  </channel>
</rss>"#,
        items.join("\n    ")
    )
}
