use std::os::fd::AsRawFd;
use std::time::Duration;

use tracing::trace;

use crate::channel::{Channel, ChannelKind};
use crate::error::{ChannelError, Result};

/// Owns the input channels and reports which are readable.
///
/// Every registered channel is switched to non-blocking mode, so a decoder
/// handed a ready channel never stalls the loop on a slow peer.
#[derive(Debug, Default)]
pub struct Multiplexer {
    channels: Vec<Channel>,
}

/// The channels found readable by one [`Multiplexer::poll`], in
/// registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Readiness {
    ready: Vec<ChannelKind>,
}

impl Readiness {
    pub fn is_empty(&self) -> bool {
        self.ready.is_empty()
    }

    pub fn contains(&self, kind: ChannelKind) -> bool {
        self.ready.contains(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = ChannelKind> + '_ {
        self.ready.iter().copied()
    }
}

impl Multiplexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an input channel and switch it to non-blocking mode.
    ///
    /// At most one channel of each kind may be registered.
    pub fn register(&mut self, channel: Channel) -> Result<()> {
        let kind = channel.kind();
        if !kind.is_input() {
            return Err(ChannelError::NotAnInput(kind));
        }
        if self.contains(kind) {
            return Err(ChannelError::Duplicate(kind));
        }
        channel.set_nonblocking(true)?;
        trace!(channel = %kind, fd = channel.as_raw_fd(), "registered input channel");
        self.channels.push(channel);
        Ok(())
    }

    /// Returns true if a channel of this kind is registered.
    pub fn contains(&self, kind: ChannelKind) -> bool {
        self.channels.iter().any(|c| c.kind() == kind)
    }

    /// Borrow a registered channel for reading.
    pub fn channel_mut(&mut self, kind: ChannelKind) -> Option<&mut Channel> {
        self.channels.iter_mut().find(|c| c.kind() == kind)
    }

    /// Number of registered channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Wait up to `timeout` for any registered channel to become readable.
    ///
    /// A hung-up channel counts as readable: its reader sees end-of-stream,
    /// which decoders treat as "nothing new". A signal interrupting the wait
    /// yields an empty readiness set.
    pub fn poll(&mut self, timeout: Duration) -> Result<Readiness> {
        let mut fds: Vec<libc::pollfd> = self
            .channels
            .iter()
            .map(|c| libc::pollfd {
                fd: c.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            })
            .collect();

        // SAFETY: `fds` is a valid array of `fds.len()` pollfd entries that
        // outlives the call.
        let rc = unsafe {
            libc::poll(
                fds.as_mut_ptr(),
                fds.len() as libc::nfds_t,
                timeout_millis(timeout),
            )
        };

        if rc < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                return Ok(Readiness::default());
            }
            return Err(ChannelError::Poll(err));
        }

        let mut ready = Vec::with_capacity(rc as usize);
        for (pfd, channel) in fds.iter().zip(&self.channels) {
            if pfd.revents & libc::POLLNVAL != 0 {
                return Err(ChannelError::Invalid(channel.kind()));
            }
            if pfd.revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0 {
                ready.push(channel.kind());
            }
        }

        Ok(Readiness { ready })
    }
}

/// Round a timeout up to whole milliseconds so short intervals never
/// degrade into a busy spin.
fn timeout_millis(timeout: Duration) -> libc::c_int {
    if timeout.is_zero() {
        return 0;
    }
    let millis = timeout.as_nanos().div_ceil(1_000_000);
    millis.min(libc::c_int::MAX as u128) as libc::c_int
}
