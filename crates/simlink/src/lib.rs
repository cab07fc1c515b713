//! Bridge between simulated device firmware and a host display and keyboard.
//!
//! The firmware runs as a child process and talks over anonymous pipes: it
//! writes display updates and LED status, and reads key codes. simlink
//! decodes the former and produces the latter.
//!
//! # Crate Structure
//!
//! - [`channel`] — Pipes, readiness polling, socket artifact cleanup
//! - [`display`] — Display and LED decoders
//! - [`session`] — Key translation and the session loop

/// Re-export channel types.
pub mod channel {
    pub use simlink_channel::*;
}

/// Re-export display decoder types.
pub mod display {
    pub use simlink_display::*;
}

/// Re-export session types.
pub mod session {
    pub use simlink_session::*;
}
