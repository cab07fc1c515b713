use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};

use tracing::debug;

use crate::error::{ChannelError, Result};

/// The role a channel plays between the bridge and the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Framebuffer updates, firmware → bridge.
    DisplayIn,
    /// LED status bytes, firmware → bridge.
    LedIn,
    /// Device key codes, bridge → firmware.
    KeyOut,
    /// Opaque bare-metal passthrough requests, firmware → bridge.
    PassthroughIn,
}

impl ChannelKind {
    /// Human-readable name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            ChannelKind::DisplayIn => "display-in",
            ChannelKind::LedIn => "led-in",
            ChannelKind::KeyOut => "key-out",
            ChannelKind::PassthroughIn => "passthrough-in",
        }
    }

    /// Returns true if the bridge reads from this channel.
    pub fn is_input(self) -> bool {
        !matches!(self, ChannelKind::KeyOut)
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Both ends of an anonymous pipe. Close-on-exec is set on both.
#[derive(Debug)]
pub struct Pipe {
    pub read: OwnedFd,
    pub write: OwnedFd,
}

/// Create an anonymous pipe with close-on-exec set on both ends.
///
/// Ends that must survive into a child process are made inheritable there
/// with [`clear_cloexec`], so nothing leaks into unrelated children.
pub fn pipe() -> Result<Pipe> {
    let mut fds = [0 as libc::c_int; 2];

    #[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
    // SAFETY: `fds` is a valid, writable array of two descriptors.
    let rc = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) };
    #[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd")))]
    // SAFETY: `fds` is a valid, writable array of two descriptors.
    let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };

    if rc != 0 {
        return Err(ChannelError::Pipe(std::io::Error::last_os_error()));
    }

    // SAFETY: both descriptors were just returned by the kernel and nothing
    // else owns them.
    let (read, write) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };

    #[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd")))]
    {
        set_fd_flags(read.as_raw_fd(), libc::FD_CLOEXEC, true).map_err(ChannelError::Pipe)?;
        set_fd_flags(write.as_raw_fd(), libc::FD_CLOEXEC, true).map_err(ChannelError::Pipe)?;
    }

    debug!(read = fds[0], write = fds[1], "created pipe");
    Ok(Pipe { read, write })
}

/// Clear close-on-exec on `fd` so it is inherited across `exec`.
///
/// Only calls `fcntl`, so it is safe to use between `fork` and `exec`.
pub fn clear_cloexec(fd: RawFd) -> std::io::Result<()> {
    set_fd_flags(fd, libc::FD_CLOEXEC, false)
}

fn set_fd_flags(fd: RawFd, flag: libc::c_int, on: bool) -> std::io::Result<()> {
    // SAFETY: F_GETFD/F_SETFD only read and write descriptor flags.
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFD);
        if flags < 0 {
            return Err(std::io::Error::last_os_error());
        }
        let updated = if on { flags | flag } else { flags & !flag };
        if updated != flags && libc::fcntl(fd, libc::F_SETFD, updated) < 0 {
            return Err(std::io::Error::last_os_error());
        }
    }
    Ok(())
}

/// An owned byte-stream endpoint.
///
/// The descriptor is closed when the channel is dropped.
pub struct Channel {
    kind: ChannelKind,
    file: File,
}

impl Channel {
    /// Wrap an owned descriptor as a channel of the given kind.
    pub fn new(kind: ChannelKind, fd: OwnedFd) -> Self {
        Self {
            kind,
            file: File::from(fd),
        }
    }

    /// Take ownership of a descriptor inherited from the parent process.
    ///
    /// Fails if `fd` is not an open descriptor.
    ///
    /// # Safety
    ///
    /// `fd` must not be owned by anything else in this process; it is closed
    /// when the channel is dropped.
    pub unsafe fn from_inherited(kind: ChannelKind, fd: RawFd) -> Result<Self> {
        if libc::fcntl(fd, libc::F_GETFD) < 0 {
            return Err(ChannelError::Invalid(kind));
        }
        Ok(Self::new(kind, OwnedFd::from_raw_fd(fd)))
    }

    /// The role of this channel.
    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Switch the descriptor between blocking and non-blocking mode.
    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        let fd = self.file.as_raw_fd();
        let err = |source| ChannelError::NonBlocking {
            kind: self.kind,
            source,
        };

        // SAFETY: F_GETFL/F_SETFL only read and write status flags of an
        // open descriptor owned by this channel.
        unsafe {
            let flags = libc::fcntl(fd, libc::F_GETFL);
            if flags < 0 {
                return Err(err(std::io::Error::last_os_error()));
            }
            let updated = if nonblocking {
                flags | libc::O_NONBLOCK
            } else {
                flags & !libc::O_NONBLOCK
            };
            if updated != flags && libc::fcntl(fd, libc::F_SETFL, updated) < 0 {
                return Err(err(std::io::Error::last_os_error()));
            }
        }
        Ok(())
    }

    /// Whether the descriptor is currently in non-blocking mode.
    pub fn is_nonblocking(&self) -> Result<bool> {
        // SAFETY: F_GETFL only reads status flags.
        let flags = unsafe { libc::fcntl(self.file.as_raw_fd(), libc::F_GETFL) };
        if flags < 0 {
            return Err(ChannelError::Io(std::io::Error::last_os_error()));
        }
        Ok(flags & libc::O_NONBLOCK != 0)
    }
}

impl Read for Channel {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for Channel {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

impl AsFd for Channel {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl AsRawFd for Channel {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("kind", &self.kind.name())
            .field("fd", &self.file.as_raw_fd())
            .finish()
    }
}
