use std::io::{ErrorKind, Write};
use std::time::{Duration, Instant};

use serde::Serialize;
use simlink_channel::{Channel, ChannelKind, Multiplexer};
use simlink_display::{Decoder, DecoderConfig, LedDecoder};
use tracing::{debug, info, trace, warn};

use crate::control::ControlAction;
use crate::error::{Result, SessionError};
use crate::event::{Edge, HostEvent};
use crate::keys::{KeyTranslator, Translation};
use crate::keystate::KeyState;
use crate::model::DeviceModel;
use crate::record::Recorder;
use crate::traits::{
    ControlHandler, EventSource, Firmware, FirmwareExit, FrameView, PassthroughHandler, Renderer,
};

/// Default wait for channel readiness per tick.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Session settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub model: DeviceModel,
    /// Upper bound on each readiness wait.
    pub poll_interval: Duration,
    pub decoder: DecoderConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: DeviceModel::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            decoder: DecoderConfig::default(),
        }
    }
}

/// Parent-side channel ends handed to the session.
pub struct SessionChannels {
    pub display: Channel,
    pub led: Channel,
    pub key_out: Channel,
    pub passthrough: Option<(Channel, Box<dyn PassthroughHandler>)>,
}

/// Lifecycle of a [`SessionLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Starting,
    Running,
    Draining,
    Stopped,
}

/// Why the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ExitReason {
    Quit,
    FirmwareExited(FirmwareExit),
}

/// Summary returned when a session reaches [`SessionState::Stopped`].
#[derive(Debug, Clone, Serialize)]
pub struct SessionOutcome {
    pub model: DeviceModel,
    #[serde(flatten)]
    pub reason: ExitReason,
    pub ticks: u64,
    pub frames: u64,
    pub led_updates: u64,
    pub key_bytes: u64,
}

/// Mutable per-session state shared by the handlers.
pub struct SessionContext {
    model: DeviceModel,
    decoder: Decoder,
    leds: LedDecoder,
    keys: KeyState,
    translator: KeyTranslator,
    recorder: Option<Recorder>,
}

impl SessionContext {
    pub fn new(model: DeviceModel, decoder: DecoderConfig) -> Self {
        Self {
            model,
            decoder: model.decoder(decoder),
            leds: LedDecoder::new(),
            keys: KeyState::new(),
            translator: KeyTranslator::new(model.keypad()),
            recorder: None,
        }
    }

    pub fn model(&self) -> DeviceModel {
        self.model
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub fn keys(&self) -> &KeyState {
        &self.keys
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    /// The current composed frame.
    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            pixels: self.decoder.pixels(),
            palette: self.decoder.palette(),
            leds: self.leds.current(),
        }
    }
}

#[derive(Debug, Default)]
struct Stats {
    ticks: u64,
    frames: u64,
    led_updates: u64,
    key_bytes: u64,
}

/// The single-threaded bridge loop.
///
/// Each [`tick`](Self::tick) drains host input, waits up to the poll
/// interval for firmware output, applies whatever arrived and checks
/// whether the firmware is still alive. The firmware is shut down when the
/// loop drains or, failing that, when it is dropped.
pub struct SessionLoop<F: Firmware, R: Renderer, C: ControlHandler> {
    config: SessionConfig,
    state: SessionState,
    ctx: SessionContext,
    pending: Option<SessionChannels>,
    mux: Multiplexer,
    key_out: Option<Channel>,
    passthrough: Option<Box<dyn PassthroughHandler>>,
    firmware: F,
    renderer: R,
    control: C,
    exit: Option<ExitReason>,
    stats: Stats,
}

impl<F: Firmware, R: Renderer, C: ControlHandler> SessionLoop<F, R, C> {
    pub fn new(
        config: SessionConfig,
        channels: SessionChannels,
        firmware: F,
        renderer: R,
        control: C,
    ) -> Self {
        let ctx = SessionContext::new(config.model, config.decoder.clone());
        Self {
            config,
            state: SessionState::Starting,
            ctx,
            pending: Some(channels),
            mux: Multiplexer::new(),
            key_out: None,
            passthrough: None,
            firmware,
            renderer,
            control,
            exit: None,
            stats: Stats::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn firmware(&self) -> &F {
        &self.firmware
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn control(&self) -> &C {
        &self.control
    }

    /// Register the channels and present the initial frame.
    pub fn start(&mut self) -> Result<()> {
        let channels = match self.pending.take() {
            Some(channels) => channels,
            None => return Err(SessionError::Stopped),
        };

        self.mux.register(channels.display)?;
        self.mux.register(channels.led)?;
        if let Some((channel, handler)) = channels.passthrough {
            self.mux.register(channel)?;
            self.passthrough = Some(handler);
        }
        self.key_out = Some(channels.key_out);

        self.renderer.present(&self.ctx.view());
        self.state = SessionState::Running;
        info!(
            model = %self.ctx.model,
            encoding = self.ctx.decoder.encoding(),
            channels = self.mux.len(),
            "session running"
        );
        Ok(())
    }

    /// One iteration of the loop. Returns the state afterwards.
    pub fn tick<E: EventSource + ?Sized>(&mut self, events: &mut E) -> Result<SessionState> {
        if self.state != SessionState::Running {
            return Ok(self.state);
        }
        self.stats.ticks += 1;

        while let Some(event) = events.next_event() {
            self.handle_event(event)?;
            if self.state != SessionState::Running {
                return Ok(self.state);
            }
        }

        let ready = self.mux.poll(self.config.poll_interval)?;
        for kind in ready.iter() {
            self.service(kind)?;
        }

        if let Some(status) = self.firmware.try_exit().map_err(SessionError::Firmware)? {
            info!(%status, "firmware exited");
            self.begin_drain(ExitReason::FirmwareExited(status));
        }

        Ok(self.state)
    }

    /// Start if needed, tick until the session ends, then drain.
    pub fn run<E: EventSource + ?Sized>(&mut self, events: &mut E) -> Result<SessionOutcome> {
        if self.state == SessionState::Starting {
            self.start()?;
        }
        while self.tick(events)? == SessionState::Running {}
        self.drain()
    }

    /// Shut the firmware down and close every channel.
    pub fn drain(&mut self) -> Result<SessionOutcome> {
        if self.state == SessionState::Stopped {
            return Err(SessionError::Stopped);
        }
        if self.state != SessionState::Draining {
            self.begin_drain(ExitReason::Quit);
        }

        let result = self.firmware.shutdown().map_err(SessionError::Firmware);
        self.release_channels();
        self.state = SessionState::Stopped;
        result?;

        let outcome = SessionOutcome {
            model: self.ctx.model,
            reason: self.exit.unwrap_or(ExitReason::Quit),
            ticks: self.stats.ticks,
            frames: self.stats.frames,
            led_updates: self.stats.led_updates,
            key_bytes: self.stats.key_bytes,
        };
        info!(
            ticks = outcome.ticks,
            frames = outcome.frames,
            key_bytes = outcome.key_bytes,
            "session stopped"
        );
        Ok(outcome)
    }

    fn begin_drain(&mut self, reason: ExitReason) {
        if self.exit.is_none() {
            self.exit = Some(reason);
        }
        self.state = SessionState::Draining;
        debug!(?reason, "session draining");
    }

    fn release_channels(&mut self) {
        self.mux = Multiplexer::new();
        self.key_out = None;
        self.passthrough = None;
        self.pending = None;
    }

    fn handle_event(&mut self, event: HostEvent) -> Result<()> {
        trace!(?event, "host event");
        match event {
            HostEvent::Quit => self.begin_drain(ExitReason::Quit),
            HostEvent::Key(key) => match self.ctx.translator.translate(&key) {
                Some(Translation::Action(action)) => self.dispatch(action),
                Some(Translation::Key { key, edge }) => {
                    let byte = match edge {
                        Edge::Down => self.ctx.keys.press(key),
                        Edge::Up => self.ctx.keys.release(key),
                    };
                    self.send_key(byte)?;
                }
                None => {}
            },
            HostEvent::PointerDown { x, y } => {
                if let Some(key) = self.ctx.translator.click_to_key(x, y) {
                    let byte = self.ctx.keys.press(key);
                    self.send_key(byte)?;
                }
            }
            HostEvent::PointerUp => {
                let byte = self.ctx.keys.release_all();
                self.send_key(byte)?;
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, action: ControlAction) {
        info!(?action, "control action");
        match action {
            ControlAction::Quit => self.begin_drain(ExitReason::Quit),
            ControlAction::Snapshot => self.control.snapshot(&self.ctx.view()),
            ControlAction::StartRecording => {
                if self.ctx.recorder.is_some() {
                    debug!("already recording");
                    return;
                }
                self.ctx.recorder = Some(Recorder::start(self.ctx.decoder.pixels(), Instant::now()));
                self.control.recording_started();
            }
            ControlAction::StopRecording => match self.ctx.recorder.take() {
                Some(recorder) => {
                    let frames = recorder.finish();
                    self.control
                        .recording_finished(frames, self.ctx.decoder.palette());
                }
                None => debug!("not recording"),
            },
            ControlAction::ReadNfcDump => self.control.read_nfc_dump(),
        }
    }

    fn send_key(&mut self, byte: Option<u8>) -> Result<()> {
        let Some(byte) = byte else {
            return Ok(());
        };
        let Some(channel) = self.key_out.as_mut() else {
            return Ok(());
        };

        loop {
            match channel.write(&[byte]) {
                Ok(0) => {
                    return Err(SessionError::KeyOut(std::io::Error::new(
                        ErrorKind::WriteZero,
                        "key channel accepted no bytes",
                    )))
                }
                Ok(_) => break,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    std::thread::yield_now();
                    continue;
                }
                Err(err) if err.kind() == ErrorKind::BrokenPipe => {
                    warn!(byte, "key channel closed by firmware");
                    return Ok(());
                }
                Err(err) => return Err(SessionError::KeyOut(err)),
            }
        }

        self.stats.key_bytes += 1;
        debug!(byte, "sent key");
        Ok(())
    }

    fn service(&mut self, kind: ChannelKind) -> Result<()> {
        let Some(channel) = self.mux.channel_mut(kind) else {
            return Ok(());
        };

        match kind {
            ChannelKind::DisplayIn => {
                if self.ctx.decoder.read_from(channel)? {
                    self.stats.frames += 1;
                    if let Some(recorder) = self.ctx.recorder.as_mut() {
                        recorder.capture(self.ctx.decoder.pixels(), Instant::now());
                    }
                    self.renderer.present(&self.ctx.view());
                }
            }
            ChannelKind::LedIn => {
                if let Some(mask) = self.ctx.leds.read_from(channel)? {
                    self.stats.led_updates += 1;
                    debug!(leds = mask.bits(), "led update");
                    self.renderer.present(&self.ctx.view());
                }
            }
            ChannelKind::PassthroughIn => {
                if let Some(handler) = self.passthrough.as_mut() {
                    handler
                        .readable(channel)
                        .map_err(SessionError::Passthrough)?;
                }
            }
            ChannelKind::KeyOut => {}
        }
        Ok(())
    }
}

impl<F: Firmware, R: Renderer, C: ControlHandler> Drop for SessionLoop<F, R, C> {
    fn drop(&mut self) {
        if self.state == SessionState::Stopped {
            return;
        }
        if let Err(err) = self.firmware.shutdown() {
            debug!(error = %err, "firmware shutdown on drop failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::io::Read;
    use std::rc::Rc;

    use simlink_channel::pipe;
    use simlink_display::{LedMask, Palette};

    use super::*;
    use crate::event::{scancode, HostKey, KeyEvent, Modifiers};
    use crate::keystate::ALL_UP;
    use crate::record::RecordedFrame;

    #[derive(Default)]
    struct FakeFirmware {
        exit: Option<FirmwareExit>,
        shutdowns: Rc<Cell<usize>>,
    }

    impl Firmware for FakeFirmware {
        fn try_exit(&mut self) -> std::io::Result<Option<FirmwareExit>> {
            Ok(self.exit)
        }

        fn shutdown(&mut self) -> std::io::Result<()> {
            self.shutdowns.set(self.shutdowns.get() + 1);
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingRenderer {
        presented: usize,
        last_leds: Option<LedMask>,
        last_lit: usize,
    }

    impl Renderer for CountingRenderer {
        fn present(&mut self, frame: &FrameView<'_>) {
            self.presented += 1;
            self.last_leds = Some(frame.leds);
            self.last_lit = frame.pixels.histogram()[1];
        }
    }

    #[derive(Default)]
    struct RecordingControl {
        snapshots: usize,
        started: usize,
        finished: Vec<usize>,
        nfc: usize,
    }

    impl ControlHandler for RecordingControl {
        fn snapshot(&mut self, _frame: &FrameView<'_>) {
            self.snapshots += 1;
        }

        fn recording_started(&mut self) {
            self.started += 1;
        }

        fn recording_finished(&mut self, frames: Vec<RecordedFrame>, _palette: &Palette) {
            self.finished.push(frames.len());
        }

        fn read_nfc_dump(&mut self) {
            self.nfc += 1;
        }
    }

    struct Peer {
        display: Channel,
        led: Channel,
        keys: Channel,
    }

    type TestLoop = SessionLoop<FakeFirmware, CountingRenderer, RecordingControl>;

    fn session(model: DeviceModel) -> (TestLoop, Peer) {
        let display = pipe().unwrap();
        let led = pipe().unwrap();
        let keys = pipe().unwrap();

        let channels = SessionChannels {
            display: Channel::new(ChannelKind::DisplayIn, display.read),
            led: Channel::new(ChannelKind::LedIn, led.read),
            key_out: Channel::new(ChannelKind::KeyOut, keys.write),
            passthrough: None,
        };
        let peer = Peer {
            display: Channel::new(ChannelKind::KeyOut, display.write),
            led: Channel::new(ChannelKind::KeyOut, led.write),
            keys: Channel::new(ChannelKind::DisplayIn, keys.read),
        };
        peer.keys.set_nonblocking(true).unwrap();

        let config = SessionConfig {
            model,
            ..SessionConfig::default()
        };
        let session = SessionLoop::new(
            config,
            channels,
            FakeFirmware::default(),
            CountingRenderer::default(),
            RecordingControl::default(),
        );
        (session, peer)
    }

    fn key_bytes(peer: &mut Peer) -> Vec<u8> {
        let mut buf = [0u8; 64];
        match peer.keys.read(&mut buf) {
            Ok(n) => buf[..n].to_vec(),
            Err(err) if err.kind() == ErrorKind::WouldBlock => Vec::new(),
            Err(err) => panic!("read failed: {err}"),
        }
    }

    fn events(list: &[HostEvent]) -> VecDeque<HostEvent> {
        list.iter().copied().collect()
    }

    fn key(edge: Edge, c: char) -> HostEvent {
        HostEvent::Key(KeyEvent::new(edge, HostKey::Char(c), Modifiers::NONE))
    }

    fn ctrl(c: char) -> HostEvent {
        HostEvent::Key(KeyEvent::down(HostKey::Char(c)).with_modifiers(Modifiers::LCTRL))
    }

    #[test]
    fn start_presents_initial_frame() {
        let (mut session, _peer) = session(DeviceModel::Mk4);
        assert_eq!(session.state(), SessionState::Starting);
        session.start().unwrap();
        assert_eq!(session.state(), SessionState::Running);
        assert_eq!(session.renderer().presented, 1);
        assert!(matches!(session.start(), Err(SessionError::Stopped)));
    }

    #[test]
    fn key_transitions_reach_firmware() {
        let (mut session, mut peer) = session(DeviceModel::Mk4);
        session.start().unwrap();

        let mut input = events(&[
            key(Edge::Down, 'x'),
            key(Edge::Down, 'x'),
            key(Edge::Down, '\r'),
            key(Edge::Up, 'x'),
            key(Edge::Up, '\r'),
        ]);
        session.tick(&mut input).unwrap();

        assert_eq!(key_bytes(&mut peer), vec![b'x', b'y', ALL_UP]);
    }

    #[test]
    fn pointer_presses_and_releases_all() {
        let (mut session, mut peer) = session(DeviceModel::Mk4);
        session.start().unwrap();

        let mut input = events(&[
            HostEvent::PointerDown { x: 60, y: 220 },
            key(Edge::Down, '0'),
            HostEvent::PointerDown { x: 0, y: 0 },
            HostEvent::PointerUp,
        ]);
        session.tick(&mut input).unwrap();

        assert_eq!(key_bytes(&mut peer), vec![b'1', b'0', ALL_UP]);
        assert!(session.context().keys().is_empty());
    }

    #[test]
    fn display_update_is_decoded_and_presented() {
        let (mut session, mut peer) = session(DeviceModel::Mk4);
        session.start().unwrap();

        let mut frame = [0u8; 1024];
        frame[0] = 0x03;
        peer.display.write_all(&frame).unwrap();
        peer.led.write_all(&[0xF1]).unwrap();

        let mut idle = VecDeque::new();
        for _ in 0..50 {
            session.tick(&mut idle).unwrap();
            if session.renderer().presented >= 3 {
                break;
            }
        }

        let renderer = session.renderer();
        assert_eq!(renderer.presented, 3);
        assert_eq!(renderer.last_lit, 2);
        assert_eq!(renderer.last_leds, Some(LedMask::GENUINE));
    }

    #[test]
    fn indexed_model_decodes_records() {
        let (mut session, mut peer) = session(DeviceModel::Q1);
        session.start().unwrap();

        let mut record = vec![10, 0, 20, 0, 2, 0, 1, 0];
        record.extend([1, 1]);
        peer.display.write_all(&record).unwrap();

        let mut idle = VecDeque::new();
        for _ in 0..50 {
            session.tick(&mut idle).unwrap();
            if session.renderer().presented >= 2 {
                break;
            }
        }
        assert_eq!(session.context().decoder().pixels().get(11, 20), 1);
        assert_eq!(session.renderer().last_lit, 2);
    }

    #[test]
    fn protocol_error_aborts_and_drop_shuts_down() {
        let (mut session, mut peer) = session(DeviceModel::Q1);
        session.start().unwrap();

        // 300 + 30 overflows the 320-pixel width
        peer.display
            .write_all(&[0x2c, 0x01, 0, 0, 30, 0, 1, 0])
            .unwrap();

        let mut idle = VecDeque::new();
        let mut result = Ok(SessionState::Running);
        for _ in 0..50 {
            result = session.tick(&mut idle);
            if result.is_err() {
                break;
            }
        }
        assert!(matches!(result, Err(SessionError::Protocol(_))));
        let shutdowns = session.firmware().shutdowns.clone();
        assert_eq!(shutdowns.get(), 0);
        drop(session);
        assert_eq!(shutdowns.get(), 1);
    }

    #[test]
    fn control_actions_reach_handler() {
        let (mut session, mut peer) = session(DeviceModel::Q1);
        session.start().unwrap();

        let mut input = events(&[
            ctrl('z'),
            ctrl('e'),
            ctrl('s'),
            ctrl('s'),
            ctrl('n'),
            ctrl('e'),
        ]);
        session.tick(&mut input).unwrap();

        let control = session.control();
        assert_eq!(control.snapshots, 1);
        assert_eq!(control.started, 1);
        assert_eq!(control.finished, vec![1]);
        assert_eq!(control.nfc, 1);
        assert!(key_bytes(&mut peer).is_empty());
    }

    #[test]
    fn recording_captures_decoded_frames() {
        let (mut session, mut peer) = session(DeviceModel::Mk4);
        session.start().unwrap();

        let mut input = events(&[ctrl('s')]);
        session.tick(&mut input).unwrap();
        assert!(session.context().is_recording());

        peer.display.write_all(&[0xff; 1024]).unwrap();
        let mut idle = VecDeque::new();
        for _ in 0..50 {
            session.tick(&mut idle).unwrap();
            if session.renderer().presented >= 2 {
                break;
            }
        }

        let mut input = events(&[ctrl('e')]);
        session.tick(&mut input).unwrap();
        assert_eq!(session.control().finished, vec![2]);
        assert!(!session.context().is_recording());
    }

    #[test]
    fn quit_drains_once() {
        let (mut session, mut peer) = session(DeviceModel::Mk4);
        let mut input = events(&[key(Edge::Down, '5'), ctrl('q'), key(Edge::Up, '5')]);

        let outcome = session.run(&mut input).unwrap();

        assert_eq!(outcome.reason, ExitReason::Quit);
        assert_eq!(outcome.key_bytes, 1);
        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(key_bytes(&mut peer), vec![b'5']);
        // events after quit are left unread
        assert_eq!(input.len(), 1);

        assert!(matches!(session.drain(), Err(SessionError::Stopped)));
        let shutdowns = session.firmware().shutdowns.clone();
        drop(session);
        assert_eq!(shutdowns.get(), 1);
    }

    #[test]
    fn window_close_is_a_quit() {
        let (mut session, _peer) = session(DeviceModel::Q1);
        let mut input = events(&[HostEvent::Quit]);
        let outcome = session.run(&mut input).unwrap();
        assert_eq!(outcome.reason, ExitReason::Quit);
    }

    #[test]
    fn firmware_exit_drains_session() {
        let (mut session, _peer) = session(DeviceModel::Mk4);
        session.start().unwrap();
        let status = FirmwareExit {
            code: Some(2),
            signal: None,
        };
        session.firmware.exit = Some(status);

        let mut idle = VecDeque::new();
        assert_eq!(session.tick(&mut idle).unwrap(), SessionState::Draining);
        assert_eq!(session.tick(&mut idle).unwrap(), SessionState::Draining);

        let outcome = session.drain().unwrap();
        assert_eq!(outcome.reason, ExitReason::FirmwareExited(status));
        assert_eq!(outcome.ticks, 1);
        assert_eq!(session.firmware().shutdowns.get(), 1);
    }

    #[test]
    fn closed_key_channel_is_not_fatal() {
        let (mut session, peer) = session(DeviceModel::Q1);
        session.start().unwrap();
        drop(peer);

        let arrow = HostEvent::Key(KeyEvent::down(HostKey::Scancode(scancode::UP)));
        let mut input = events(&[arrow]);
        session.tick(&mut input).unwrap();
        assert_eq!(session.state(), SessionState::Running);
    }

    #[test]
    fn passthrough_handler_sees_readable_channel() {
        struct Drain(Rc<Cell<usize>>);

        impl PassthroughHandler for Drain {
            fn readable(&mut self, channel: &mut Channel) -> std::io::Result<()> {
                let mut buf = [0u8; 64];
                let n = channel.read(&mut buf)?;
                self.0.set(self.0.get() + n);
                Ok(())
            }
        }

        let display = pipe().unwrap();
        let led = pipe().unwrap();
        let keys = pipe().unwrap();
        let extra = pipe().unwrap();
        let seen = Rc::new(Cell::new(0));
        let handler: Box<dyn PassthroughHandler> = Box::new(Drain(seen.clone()));

        let channels = SessionChannels {
            display: Channel::new(ChannelKind::DisplayIn, display.read),
            led: Channel::new(ChannelKind::LedIn, led.read),
            key_out: Channel::new(ChannelKind::KeyOut, keys.write),
            passthrough: Some((
                Channel::new(ChannelKind::PassthroughIn, extra.read),
                handler,
            )),
        };
        let mut session = SessionLoop::new(
            SessionConfig::default(),
            channels,
            FakeFirmware::default(),
            CountingRenderer::default(),
            RecordingControl::default(),
        );
        session.start().unwrap();

        let mut tx = Channel::new(ChannelKind::KeyOut, extra.write);
        tx.write_all(b"hello").unwrap();

        let mut idle = VecDeque::new();
        for _ in 0..50 {
            session.tick(&mut idle).unwrap();
            if seen.get() == 5 {
                break;
            }
        }
        assert_eq!(seen.get(), 5);
    }
}
