//! Session layer of the simlink bridge.
//!
//! Ties host input, the firmware's channels and the display decoders
//! together in one single-threaded, poll-driven loop:
//! - [`KeyTranslator`] turns host key events into device keys or
//!   [`ControlAction`]s
//! - [`KeyState`] suppresses key repeat and emits the all-up marker
//! - [`SessionLoop`] runs `Starting → Running → Draining → Stopped`
//!
//! Windows, image export and process spawning stay outside; the loop talks
//! to them through the traits in [`traits`].

pub mod control;
pub mod error;
pub mod event;
pub mod keys;
pub mod keystate;
pub mod model;
pub mod record;
pub mod session;
pub mod traits;

pub use control::ControlAction;
pub use error::{Result, SessionError};
pub use event::{scancode, Edge, HostEvent, HostKey, KeyEvent, Modifiers};
pub use keys::{codes, Binding, DeviceKey, KeyTranslator, Keypad, Translation};
pub use keystate::{KeyState, ALL_UP};
pub use model::DeviceModel;
pub use record::{RecordedFrame, Recorder, MIN_FRAME_DELAY};
pub use session::{
    ExitReason, DEFAULT_POLL_INTERVAL, SessionChannels, SessionConfig, SessionContext, SessionLoop, SessionOutcome,
    SessionState,
};
pub use traits::{
    ControlHandler, EventSource, Firmware, FirmwareExit, FrameView, PassthroughHandler, Renderer,
};
