/// Errors raised while decoding display or LED traffic.
///
/// Every variant other than [`ProtocolError::Io`] means the firmware and the
/// bridge disagree about framing; the session cannot continue.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A monochrome update ended before a full frame.
    #[error("short display frame ({len} bytes, expected {expected})")]
    ShortFrame { len: usize, expected: usize },

    /// An indexed update header was cut off.
    #[error("truncated update header ({got} of {expected} bytes)")]
    TruncatedHeader { got: usize, expected: usize },

    /// An indexed update payload was cut off.
    #[error("truncated update payload ({got} of {expected} bytes)")]
    TruncatedPayload { got: usize, expected: usize },

    /// An indexed update rectangle lies outside the panel.
    #[error(
        "update rectangle {width}x{height} at ({x},{y}) exceeds {max_width}x{max_height} panel"
    )]
    OutOfBounds {
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        max_width: usize,
        max_height: usize,
    },

    /// An I/O error occurred while reading from the channel.
    #[error("display I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
