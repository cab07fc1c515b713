//! Host input from the controlling terminal.

use std::collections::VecDeque;
use std::io::{self, IsTerminal, Read};
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;

use simlink_session::{scancode, EventSource, HostEvent, HostKey, KeyEvent, Modifiers};
use tracing::debug;

/// Turn one chunk of terminal bytes into host events.
///
/// Every key becomes a press immediately followed by a release. Escape
/// sequences for arrows, home/end, page up/down and F1–F6 become scancodes;
/// other Ctrl+letter bytes become the letter with left control held, except
/// tab, backspace and enter; a raw Ctrl-C (0x03) is a quit.
pub fn parse_input(bytes: &[u8]) -> Vec<HostEvent> {
    let mut events = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let byte = bytes[i];
        i += 1;

        let (key, modifiers) = match byte {
            0x1b => match bytes.get(i) {
                Some(b'[') | Some(b'O') => match escape_sequence(&bytes[i + 1..]) {
                    Some((sc, used)) => {
                        i += 1 + used;
                        (HostKey::Scancode(sc), Modifiers::NONE)
                    }
                    None => (HostKey::Char('\x1b'), Modifiers::NONE),
                },
                _ => (HostKey::Char('\x1b'), Modifiers::NONE),
            },
            0x03 => {
                events.push(HostEvent::Quit);
                continue;
            }
            b'\r' | b'\n' => (HostKey::Char('\r'), Modifiers::NONE),
            b'\t' | 0x08 => (HostKey::Char(byte as char), Modifiers::NONE),
            0x7f => (HostKey::Char('\x08'), Modifiers::NONE),
            0x01..=0x1a => (HostKey::Char(ctrl_letter(byte)), Modifiers::LCTRL),
            b if b.is_ascii() => (HostKey::Char(b as char), Modifiers::NONE),
            b => {
                debug!(byte = b, "ignoring non-ascii input");
                continue;
            }
        };

        let down = KeyEvent::down(key).with_modifiers(modifiers);
        let up = KeyEvent::up(key).with_modifiers(modifiers);
        events.push(HostEvent::Key(down));
        events.push(HostEvent::Key(up));
    }
    events
}

/// Letter for a Ctrl+letter byte (0x01 is `a`).
fn ctrl_letter(byte: u8) -> char {
    (b'a' + byte - 1) as char
}

/// Length of an escape sequence cut off at the end of `bytes`, or 0.
///
/// Only prefixes of sequences [`parse_input`] understands count.
fn incomplete_escape_len(bytes: &[u8]) -> usize {
    let start = bytes.len().saturating_sub(4);
    let Some(pos) = bytes[start..].iter().rposition(|&b| b == 0x1b) else {
        return 0;
    };
    let tail = &bytes[start + pos..];
    let incomplete = match &tail[1..] {
        [] => true,
        [b'[' | b'O', rest @ ..] => matches!(
            rest,
            [] | [b'1' | b'4' | b'5' | b'6'] | [b'1', b'5' | b'7']
        ),
        _ => false,
    };
    if incomplete {
        tail.len()
    } else {
        0
    }
}

/// Match the tail of a CSI/SS3 sequence. Returns the scancode and the
/// number of bytes consumed.
fn escape_sequence(rest: &[u8]) -> Option<(u16, usize)> {
    let found = match rest {
        [b'A', ..] => (scancode::UP, 1),
        [b'B', ..] => (scancode::DOWN, 1),
        [b'C', ..] => (scancode::RIGHT, 1),
        [b'D', ..] => (scancode::LEFT, 1),
        [b'H', ..] => (scancode::HOME, 1),
        [b'F', ..] => (scancode::END, 1),
        [b'P', ..] => (scancode::F1, 1),
        [b'Q', ..] => (scancode::F2, 1),
        [b'R', ..] => (scancode::F3, 1),
        [b'S', ..] => (scancode::F4, 1),
        [b'1', b'~', ..] => (scancode::HOME, 2),
        [b'4', b'~', ..] => (scancode::END, 2),
        [b'5', b'~', ..] => (scancode::PAGE_UP, 2),
        [b'6', b'~', ..] => (scancode::PAGE_DOWN, 2),
        [b'1', b'5', b'~', ..] => (scancode::F5, 3),
        [b'1', b'7', b'~', ..] => (scancode::F6, 3),
        _ => return None,
    };
    Some(found)
}

/// Event source fed by a stdin reader thread.
///
/// The reader thread only moves bytes from the terminal into a channel; it
/// never touches session state. All translation and every write to the
/// firmware happen on the session thread when the loop asks for events.
///
/// The interrupt flag is checked first on every call, so a SIGINT turns
/// into a quit on the next tick. An escape sequence split across reads is
/// held back until the rest arrives; if nothing follows within one more
/// call it is parsed as it stands, so a lone Esc still gets through.
pub struct TerminalInput {
    rx: Receiver<Vec<u8>>,
    pending: VecDeque<HostEvent>,
    partial: Vec<u8>,
    partial_waited: bool,
    interrupted: Arc<AtomicBool>,
}

impl TerminalInput {
    pub fn spawn(interrupted: Arc<AtomicBool>) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("simlink-stdin".to_string())
            .spawn(move || {
                let mut stdin = io::stdin().lock();
                let mut buf = [0u8; 64];
                loop {
                    match stdin.read(&mut buf) {
                        Ok(0) => break,
                        Ok(n) => {
                            if tx.send(buf[..n].to_vec()).is_err() {
                                break;
                            }
                        }
                        Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                        Err(err) => {
                            debug!(error = %err, "stdin read failed");
                            break;
                        }
                    }
                }
                debug!("stdin closed");
            })?;
        Ok(Self::new(rx, interrupted))
    }

    fn new(rx: Receiver<Vec<u8>>, interrupted: Arc<AtomicBool>) -> Self {
        Self {
            rx,
            pending: VecDeque::new(),
            partial: Vec::new(),
            partial_waited: false,
            interrupted,
        }
    }
}

impl EventSource for TerminalInput {
    fn next_event(&mut self) -> Option<HostEvent> {
        if self.interrupted.swap(false, Ordering::SeqCst) {
            return Some(HostEvent::Quit);
        }
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            match self.rx.try_recv() {
                Ok(chunk) => {
                    self.partial.extend_from_slice(&chunk);
                    self.partial_waited = false;
                    let ready = self.partial.len() - incomplete_escape_len(&self.partial);
                    let bytes: Vec<u8> = self.partial.drain(..ready).collect();
                    self.pending.extend(parse_input(&bytes));
                }
                Err(_) if self.partial.is_empty() => return None,
                Err(_) if self.partial_waited => {
                    let bytes = std::mem::take(&mut self.partial);
                    self.partial_waited = false;
                    self.pending.extend(parse_input(&bytes));
                }
                Err(_) => {
                    self.partial_waited = true;
                    return None;
                }
            }
        }
    }
}

/// Puts an interactive stdin into raw mode until dropped.
///
/// Signals, flow control and line editing are off so control keys reach
/// [`parse_input`]; output processing stays on.
pub struct RawTerminal {
    original: libc::termios,
}

impl RawTerminal {
    /// Returns `None` when stdin is not a terminal.
    pub fn enable() -> io::Result<Option<Self>> {
        if !io::stdin().is_terminal() {
            return Ok(None);
        }

        let mut original = MaybeUninit::<libc::termios>::uninit();
        // SAFETY: tcgetattr fills the termios struct on success.
        let original = unsafe {
            if libc::tcgetattr(libc::STDIN_FILENO, original.as_mut_ptr()) != 0 {
                return Err(io::Error::last_os_error());
            }
            original.assume_init()
        };

        let mut raw = original;
        raw.c_lflag &= !(libc::ICANON | libc::ECHO | libc::ISIG | libc::IEXTEN);
        raw.c_iflag &= !(libc::IXON | libc::ICRNL);
        raw.c_cc[libc::VMIN] = 1;
        raw.c_cc[libc::VTIME] = 0;

        // SAFETY: `raw` is a fully initialized copy of the current settings.
        if unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &raw) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Some(Self { original }))
    }
}

impl Drop for RawTerminal {
    fn drop(&mut self) {
        // SAFETY: restores the settings captured in `enable`.
        unsafe {
            libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &self.original);
        }
    }
}
