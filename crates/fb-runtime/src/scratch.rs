//! The rendered-template scratch file.
//!
//! One scratch path is reused for every batch of a row. [`ScratchFile`] owns
//! that path for the duration of the row and removes the file when dropped,
//! whichever way the row ends.

use std::io;
use std::path::{Path, PathBuf};

use crate::prompt::Confirm;

#[derive(Debug, thiserror::Error)]
pub enum ScratchError {
    #[error("scratch file {} already exists and was not deleted", path.display())]
    Declined { path: PathBuf },
    #[error("no answer to scratch file prompt: {source}")]
    Prompt {
        #[source]
        source: io::Error,
    },
    #[error("{action} scratch file {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ScratchError {
    fn io(action: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Scoped ownership of the scratch path.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    /// Claim `path` for a row.
    ///
    /// A file left behind by an earlier run is never reused or appended to:
    /// `confirm` decides whether it may be deleted, and a "no" ends with
    /// [`ScratchError::Declined`] with the file left in place.
    pub fn acquire(path: impl Into<PathBuf>, mut confirm: impl Confirm) -> Result<Self, ScratchError> {
        let path = path.into();
        let exists = path
            .try_exists()
            .map_err(|e| ScratchError::io("checking", &path, e))?;
        if exists {
            let question = format!(
                "Temporary file {:?} already exists. Delete file to continue?",
                path.display().to_string()
            );
            let delete = confirm
                .confirm(&question)
                .map_err(|source| ScratchError::Prompt { source })?;
            if !delete {
                return Err(ScratchError::Declined { path });
            }
            std::fs::remove_file(&path).map_err(|e| ScratchError::io("deleting", &path, e))?;
            fb_info!(io, path = %path.display(), "deleted stale scratch file");
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the file's contents with `contents`.
    pub fn write(&self, contents: &str) -> Result<(), ScratchError> {
        std::fs::write(&self.path, contents).map_err(|e| ScratchError::io("writing", &self.path, e))
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => fb_debug!(io, path = %self.path.display(), "scratch file removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                fb_warn!(io, path = %self.path.display(), error = %e, "failed to remove scratch file")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
