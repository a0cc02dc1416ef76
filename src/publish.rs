// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::PublishError;

/// Answers whether any process on the host currently has a path open.
///
/// The answer is a snapshot: a process may open the file right after the
/// probe returns, so callers must still handle failures of the swap itself.
pub trait OpenFileProbe: Send + Sync {
    fn is_open(&self, path: &Path) -> bool;
}

/// Probe that walks `/proc/<pid>/fd` for every visible process.
///
/// Processes whose descriptors we may not read are skipped. On platforms
/// without procfs every path is reported as free.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcFsProbe;

impl OpenFileProbe for ProcFsProbe {
    #[cfg(target_os = "linux")]
    fn is_open(&self, path: &Path) -> bool {
        // A path that doesn't resolve can't be held open
        let Ok(target) = path.canonicalize() else {
            return false;
        };
        let Ok(processes) = fs::read_dir("/proc") else {
            return false;
        };

        processes
            .flatten()
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| name.bytes().all(|b| b.is_ascii_digit()))
            })
            .any(|entry| holds_open(&entry.path().join("fd"), &target))
    }

    #[cfg(not(target_os = "linux"))]
    fn is_open(&self, _path: &Path) -> bool {
        false
    }
}

#[cfg(target_os = "linux")]
fn holds_open(fd_dir: &Path, target: &Path) -> bool {
    let Ok(descriptors) = fs::read_dir(fd_dir) else {
        return false;
    };

    descriptors
        .flatten()
        .any(|fd| fs::read_link(fd.path()).is_ok_and(|link| link == target))
}

/// Outcome of a publish attempt that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The staged file now lives at the destination
    Replaced,
    /// The destination is in use; nothing was touched
    Deferred,
}

/// Swap a staged file into its destination if nobody has the destination open.
///
/// An existing destination is removed and the staged file renamed over it.
/// Both files must live in the same directory so the rename stays on one
/// volume; readers holding the old file keep seeing the old content.
pub fn publish(
    probe: &dyn OpenFileProbe,
    staged: &Path,
    destination: &Path,
) -> Result<PublishOutcome, PublishError> {
    if !staged.is_file() {
        return Err(PublishError::MissingStagedFile(staged.to_path_buf()));
    }

    if probe.is_open(destination) {
        return Ok(PublishOutcome::Deferred);
    }

    let removed_previous = match fs::remove_file(destination) {
        Ok(()) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(e) => {
            return Err(PublishError::RemoveFailed {
                path: destination.to_path_buf(),
                source: e,
            });
        }
    };

    fs::rename(staged, destination).map_err(|source| {
        let from = staged.to_path_buf();
        let to = destination.to_path_buf();
        if removed_previous {
            PublishError::DestinationLost { from, to, source }
        } else {
            PublishError::RenameFailed { from, to, source }
        }
    })?;

    Ok(PublishOutcome::Replaced)
}
