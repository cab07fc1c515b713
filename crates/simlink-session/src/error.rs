use simlink_channel::ChannelError;
use simlink_display::ProtocolError;

/// Errors that end a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Channel setup or polling failed.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// The firmware broke the display or LED framing.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Writing to the key channel failed.
    #[error("key-out write failed: {0}")]
    KeyOut(std::io::Error),

    /// The firmware process could not be checked or stopped.
    #[error("firmware error: {0}")]
    Firmware(std::io::Error),

    /// The passthrough handler failed.
    #[error("passthrough handler failed: {0}")]
    Passthrough(std::io::Error),

    /// The session has already reached its terminal state.
    #[error("session already stopped")]
    Stopped,
}

pub type Result<T> = std::result::Result<T, SessionError>;
