use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ChannelError, Result};

/// A filesystem socket path the firmware binds while the session runs.
///
/// Claiming removes a stale socket left by an earlier run; releasing removes
/// whatever socket the firmware created. Release happens at most once and
/// also runs on drop, so every exit path (including unwinding) cleans up.
/// Paths that exist but are not sockets are never removed.
#[derive(Debug)]
pub struct SocketArtifact {
    path: PathBuf,
    released: bool,
}

impl SocketArtifact {
    /// Take responsibility for `path`, removing a stale socket if present.
    pub fn claim(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        remove_socket(&path)?;
        debug!(?path, "claimed socket artifact");
        Ok(Self {
            path,
            released: false,
        })
    }

    /// The managed path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether [`release`](Self::release) has already run.
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Remove the socket if one exists. Idempotent.
    pub fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        if remove_socket(&self.path)? {
            info!(path = ?self.path, "removed socket artifact");
        }
        Ok(())
    }
}

impl Drop for SocketArtifact {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            debug!(path = ?self.path, error = %err, "socket artifact cleanup failed");
        }
    }
}

/// Remove `path` if it is a socket. Returns whether anything was removed.
fn remove_socket(path: &Path) -> Result<bool> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(err) => {
            return Err(ChannelError::Artifact {
                path: path.to_path_buf(),
                source: err,
            })
        }
    };

    if !metadata.file_type().is_socket() {
        return Err(ChannelError::Artifact {
            path: path.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "existing path is not a unix socket",
            ),
        });
    }

    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(ChannelError::Artifact {
            path: path.to_path_buf(),
            source: err,
        }),
    }
}
