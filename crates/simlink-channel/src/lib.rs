//! Byte-stream channels between the bridge and an emulated firmware process.
//!
//! Provides the lowest layer of simlink:
//! - anonymous pipes whose descriptors are close-on-exec by default
//! - [`Channel`], an owned endpoint tagged with its [`ChannelKind`]
//! - [`Multiplexer`], bounded-timeout `poll(2)` readiness over input channels
//! - [`SocketArtifact`], removal of the firmware's filesystem socket on every
//!   exit path
//!
//! Everything above this crate works in terms of [`Channel`] and `Read`/`Write`.

pub mod artifact;
pub mod channel;
pub mod error;
pub mod poll;

pub use artifact::SocketArtifact;
pub use channel::{clear_cloexec, pipe, Channel, ChannelKind, Pipe};
pub use error::{ChannelError, Result};
pub use poll::{Multiplexer, Readiness};
