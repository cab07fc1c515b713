use std::io;
use std::os::fd::AsRawFd;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use simlink_channel::{clear_cloexec, pipe, Channel, ChannelKind};
use simlink_session::{Firmware, FirmwareExit};
use tracing::{debug, info};

use crate::exit::{channel_error, io_error, CliResult};

/// A running firmware process.
#[derive(Debug)]
pub struct FirmwareProcess {
    child: Child,
    exited: Option<FirmwareExit>,
}

/// Parent-side ends of the firmware channels.
#[derive(Debug)]
pub struct FirmwareChannels {
    pub display: Channel,
    pub led: Channel,
    pub key_out: Channel,
}

/// Start `program` with the three channel descriptors appended to `args`
/// in the order display, keys, LED.
pub fn spawn(
    program: &str,
    args: &[String],
    work_dir: Option<&Path>,
) -> CliResult<(FirmwareProcess, FirmwareChannels)> {
    let display = pipe().map_err(|err| channel_error("display pipe", err))?;
    let keys = pipe().map_err(|err| channel_error("key pipe", err))?;
    let led = pipe().map_err(|err| channel_error("led pipe", err))?;

    let inherited = [
        display.write.as_raw_fd(),
        keys.read.as_raw_fd(),
        led.write.as_raw_fd(),
    ];

    let mut command = Command::new(program);
    command
        .args(args)
        .args(inherited.iter().map(|fd| fd.to_string()))
        .stdin(Stdio::null());
    if let Some(dir) = work_dir {
        command.current_dir(dir);
    }

    // SAFETY: the hook runs between fork and exec and only calls fcntl on
    // descriptors that stay open in the parent until spawn returns.
    unsafe {
        command.pre_exec(move || {
            for fd in inherited {
                clear_cloexec(fd)?;
            }
            Ok(())
        });
    }

    let child = command
        .spawn()
        .map_err(|err| io_error(&format!("failed to start {program}"), err))?;
    info!(pid = child.id(), program, fds = ?inherited, "firmware started");

    // Child-side ends are the child's now.
    drop(display.write);
    drop(keys.read);
    drop(led.write);

    Ok((
        FirmwareProcess {
            child,
            exited: None,
        },
        FirmwareChannels {
            display: Channel::new(ChannelKind::DisplayIn, display.read),
            led: Channel::new(ChannelKind::LedIn, led.read),
            key_out: Channel::new(ChannelKind::KeyOut, keys.write),
        },
    ))
}

impl Firmware for FirmwareProcess {
    fn try_exit(&mut self) -> io::Result<Option<FirmwareExit>> {
        if self.exited.is_none() {
            self.exited = self.child.try_wait()?.map(FirmwareExit::from);
        }
        Ok(self.exited)
    }

    fn shutdown(&mut self) -> io::Result<()> {
        if self.exited.is_some() {
            return Ok(());
        }
        if let Some(status) = self.child.try_wait()? {
            self.exited = Some(status.into());
            return Ok(());
        }

        debug!(pid = self.child.id(), "stopping firmware");
        match self.child.kill() {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::InvalidInput => {}
            Err(err) => return Err(err),
        }
        let status = self.child.wait()?;
        self.exited = Some(status.into());
        Ok(())
    }
}

impl Drop for FirmwareProcess {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            debug!(error = %err, "firmware shutdown on drop failed");
        }
    }
}
