// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;

use id3::{ErrorKind, Tag, TagLike, Version};

use crate::error::TagError;

/// Writes title/artist metadata into a downloaded audio file
pub trait TagWriter: Send + Sync {
    fn write_tags(&self, path: &Path, title: &str, artist: &str) -> Result<(), TagError>;
}

/// ID3v2.4 tag writer
#[derive(Debug, Default, Clone, Copy)]
pub struct Id3TagWriter;

impl TagWriter for Id3TagWriter {
    fn write_tags(&self, path: &Path, title: &str, artist: &str) -> Result<(), TagError> {
        // A file without an ID3 header gets a fresh tag; any other read error is fatal
        let mut tag = match Tag::read_from_path(path) {
            Ok(tag) => tag,
            Err(e) if matches!(e.kind, ErrorKind::NoTag) => Tag::new(),
            Err(e) => {
                return Err(TagError::ReadFailed {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
        };

        tag.set_title(title);
        tag.set_artist(artist);

        tag.write_to_path(path, Version::Id3v24)
            .map_err(|e| TagError::WriteFailed {
                path: path.to_path_buf(),
                source: e,
            })
    }
}
