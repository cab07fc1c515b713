use std::path::PathBuf;

use crate::channel::ChannelKind;

/// Errors that can occur while setting up or polling channels.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Failed to create an anonymous pipe.
    #[error("failed to create pipe: {0}")]
    Pipe(std::io::Error),

    /// Failed to change the blocking mode of a channel descriptor.
    #[error("failed to set non-blocking mode on {kind}: {source}")]
    NonBlocking {
        kind: ChannelKind,
        source: std::io::Error,
    },

    /// The readiness poll itself failed.
    #[error("poll failed: {0}")]
    Poll(std::io::Error),

    /// A registered descriptor is not open.
    #[error("{0} descriptor is not open")]
    Invalid(ChannelKind),

    /// The channel kind cannot be registered for polling.
    #[error("{0} cannot be polled for input")]
    NotAnInput(ChannelKind),

    /// A channel of this kind is already registered.
    #[error("{0} is already registered")]
    Duplicate(ChannelKind),

    /// Failed to manage a filesystem socket artifact.
    #[error("socket artifact {path}: {source}")]
    Artifact {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred on a channel.
    #[error("channel I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ChannelError>;
