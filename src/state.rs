// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::StateError;
use crate::retention::staging_name;

/// Create a feed's output directory if it doesn't exist yet
pub fn ensure_output_dir(dir: &Path) -> Result<(), StateError> {
    std::fs::create_dir_all(dir).map_err(|e| StateError::CreateDirectoryFailed {
        path: dir.to_path_buf(),
        source: e,
    })
}

/// Remove staging files an interrupted run left behind for the given slots.
///
/// Returns how many were removed.
pub fn clean_stale_staging(dir: &Path, slot_filenames: &[String]) -> Result<usize, StateError> {
    let mut removed = 0;

    for slot in slot_filenames {
        let path = dir.join(staging_name(slot));
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StateError::RemoveFailed { path, source: e }),
        }
    }

    Ok(removed)
}

/// Regular files in `dir` whose name satisfies `matches`, oldest first.
///
/// Age is the file's creation time, or its modification time where the
/// filesystem doesn't record creation.
pub fn files_by_creation(
    dir: &Path,
    matches: impl Fn(&str) -> bool,
) -> Result<Vec<PathBuf>, StateError> {
    let read_error = |e| StateError::ReadDirectoryFailed {
        path: dir.to_path_buf(),
        source: e,
    };

    let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();

    for entry in std::fs::read_dir(dir).map_err(read_error)? {
        let entry = entry.map_err(read_error)?;

        let Some(name) = entry.file_name().to_str().map(String::from) else {
            continue;
        };
        if !matches(&name) {
            continue;
        }

        let metadata = entry.metadata().map_err(read_error)?;
        if !metadata.is_file() {
            continue;
        }

        let created = metadata
            .created()
            .or_else(|_| metadata.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        files.push((created, entry.path()));
    }

    files.sort();
    Ok(files.into_iter().map(|(_, path)| path).collect())
}
