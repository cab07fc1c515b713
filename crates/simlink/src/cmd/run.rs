use std::io::{self, ErrorKind, Read};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use simlink_channel::{Channel, ChannelKind, SocketArtifact};
use simlink_display::DecoderConfig;
use simlink_session::{
    DeviceModel, PassthroughHandler, SessionChannels, SessionConfig, SessionLoop,
};
use tracing::{debug, info};

use crate::cmd::{parse_duration, RunArgs};
use crate::exit::{channel_error, io_error, session_error, CliError, CliResult, SUCCESS, USAGE};
use crate::firmware;
use crate::input::{RawTerminal, TerminalInput};
use crate::output::{print_outcome, OutputFormat};
use crate::render::RenderTarget;
use crate::store::FileStore;

pub fn run(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    let model = DeviceModel::from(args.model);
    let config = SessionConfig {
        model,
        poll_interval: parse_duration(&args.poll_interval)?,
        decoder: DecoderConfig {
            payload_timeout: parse_duration(&args.payload_timeout)?,
        },
    };

    let (program, firmware_args) = args
        .firmware
        .split_first()
        .ok_or_else(|| CliError::new(USAGE, "missing firmware command"))?;

    let passthrough = match args.passthrough_fd {
        Some(fd) => {
            // SAFETY: the descriptor was handed to this process for the
            // session's exclusive use; nothing else here owns it.
            let channel = unsafe { Channel::from_inherited(ChannelKind::PassthroughIn, fd) }
                .map_err(|err| channel_error("passthrough descriptor", err))?;
            let handler: Box<dyn PassthroughHandler> = Box::new(DiscardPassthrough::default());
            Some((channel, handler))
        }
        None => None,
    };

    let mut socket = SocketArtifact::claim(&args.socket_path)
        .map_err(|err| channel_error("socket cleanup failed", err))?;

    let (process, channels) =
        firmware::spawn(program, firmware_args, args.work_dir.as_deref())?;
    let channels = SessionChannels {
        display: channels.display,
        led: channels.led,
        key_out: channels.key_out,
        passthrough,
    };

    let store = FileStore::new(&args.output_dir, nfc_dump_path(&args));

    let interrupted = Arc::new(AtomicBool::new(false));
    install_ctrlc_handler(interrupted.clone())?;
    let raw = RawTerminal::enable().map_err(|err| io_error("terminal setup failed", err))?;
    let mut input =
        TerminalInput::spawn(interrupted).map_err(|err| io_error("stdin reader failed", err))?;

    info!(%model, program = %program, "starting session");
    let mut session = SessionLoop::new(
        config,
        channels,
        process,
        RenderTarget::from(args.render),
        store,
    );
    let outcome = session.run(&mut input);
    drop(session);
    drop(raw);

    socket
        .release()
        .map_err(|err| channel_error("socket cleanup failed", err))?;
    let outcome = outcome.map_err(|err| session_error("session failed", err))?;

    print_outcome(&outcome, &socket.path().display().to_string(), format);
    Ok(SUCCESS)
}

fn nfc_dump_path(args: &RunArgs) -> PathBuf {
    match &args.work_dir {
        Some(dir) if args.nfc_dump.is_relative() => dir.join(&args.nfc_dump),
        _ => args.nfc_dump.clone(),
    }
}

fn install_ctrlc_handler(interrupted: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        interrupted.store(true, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}

/// Reads and drops whatever arrives on the passthrough channel.
#[derive(Debug, Default)]
struct DiscardPassthrough {
    total: u64,
}

impl PassthroughHandler for DiscardPassthrough {
    fn readable(&mut self, channel: &mut Channel) -> io::Result<()> {
        let mut buf = [0u8; 4096];
        loop {
            match channel.read(&mut buf) {
                Ok(0) => return Ok(()),
                Ok(n) => {
                    self.total += n as u64;
                    debug!(bytes = n, total = self.total, "discarded passthrough data");
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(err) => return Err(err),
            }
        }
    }
}
