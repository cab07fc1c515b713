use serde::{Deserialize, Serialize};

/// An operator command, as opposed to a device key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    /// End the session.
    Quit,
    /// Save the current display.
    Snapshot,
    /// Begin capturing every decoded frame.
    StartRecording,
    /// Stop capturing and hand the frames off.
    StopRecording,
    /// Archive the simulated NFC dump.
    ReadNfcDump,
}

impl ControlAction {
    /// Action bound to control + `ch`, if any.
    pub fn from_accelerator(ch: char) -> Option<Self> {
        match ch {
            'q' => Some(Self::Quit),
            'z' => Some(Self::Snapshot),
            's' => Some(Self::StartRecording),
            'e' => Some(Self::StopRecording),
            'n' => Some(Self::ReadNfcDump),
            _ => None,
        }
    }

    /// The accelerator character bound to this action.
    pub fn accelerator(self) -> char {
        match self {
            Self::Quit => 'q',
            Self::Snapshot => 'z',
            Self::StartRecording => 's',
            Self::StopRecording => 'e',
            Self::ReadNfcDump => 'n',
        }
    }

    pub const ALL: [ControlAction; 5] = [
        Self::Quit,
        Self::Snapshot,
        Self::StartRecording,
        Self::StopRecording,
        Self::ReadNfcDump,
    ];
}
