//! # Session controller
//!
//! One tokio task per stream owns the muxer, the source and the listener.
//! Control calls from the [`HttpFlvStream`] handle and callbacks from the
//! source all travel through a single unbounded queue, so they are applied
//! strictly in order and nobody waits on anybody.
//!
//! ```text
//!   HttpFlvStream ──start/stop──┐
//!                               ├──▶ queue ──▶ controller ──▶ StreamListener
//!   SourceOutput ──samples─────┘                  │
//!                                                  └──▶ watch<SessionSnapshot>
//! ```
//!
//! Every start and stop bumps the session epoch. Source callbacks carry the
//! epoch of the start that created their [`SourceOutput`]; callbacks from an
//! older epoch are discarded before they can touch session state.

use std::fmt;
use std::io::Cursor;

use bytes::Bytes;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::avc::AvcDecoderConfigurationRecord;
use crate::config::SessionConfig;
use crate::error::MuxError;
use crate::muxer::{DropReason, HttpFlvMuxer, MuxOutcome};
use crate::script::{Amf0MetadataSerializer, MetadataSerializer, StreamMetadata};
use crate::sink::{StreamEvent, StreamListener};
use crate::source::{AccessUnit, EncoderError, FormatDescription, SourceOutput, VideoSource};
use crate::timestamp::MediaTime;

#[derive(Debug)]
pub(crate) enum Command {
    Start,
    Stop,
    Shutdown,
    FormatDescription {
        epoch: u64,
        description: Option<FormatDescription>,
    },
    AccessUnit {
        epoch: u64,
        unit: AccessUnit,
    },
    EncoderError {
        epoch: u64,
        error: EncoderError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Started,
    Stopped,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Started => "started",
            SessionState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Read-only view of a session, published after every command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub epoch: u64,
    pub previous_tag_size: u32,
    pub sequence_header_sent: bool,
    pub last_decode_time: Option<MediaTime>,
    /// Last size reported through `StreamSizeChanged` in this session
    pub stream_size: Option<(u32, u32)>,
    /// Tags handed to the listener in this session (the file header is not a tag)
    pub tags_emitted: u64,
    pub bytes_emitted: u64,
    pub samples_dropped: u64,
}

/// Handle to a running session. Cheap to clone; the task keeps running
/// while any handle or source output is alive, or until [`shutdown`].
///
/// [`shutdown`]: HttpFlvStream::shutdown
#[derive(Debug, Clone)]
pub struct HttpFlvStream {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl HttpFlvStream {
    /// Spawns the controller task on the current tokio runtime.
    pub fn spawn<S, L>(source: S, listener: L, config: SessionConfig) -> (Self, JoinHandle<()>)
    where
        S: VideoSource,
        L: StreamListener,
    {
        Self::spawn_with_serializer(source, listener, config, Amf0MetadataSerializer)
    }

    /// Like [`spawn`](Self::spawn), with a custom encoder for the metadata tag.
    pub fn spawn_with_serializer<S, L, M>(
        source: S,
        listener: L,
        config: SessionConfig,
        serializer: M,
    ) -> (Self, JoinHandle<()>)
    where
        S: VideoSource,
        L: StreamListener,
        M: MetadataSerializer + 'static,
    {
        let (commands, receiver) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot) = watch::channel(SessionSnapshot::default());

        let controller = SessionController {
            commands: commands.downgrade(),
            config,
            source,
            listener,
            muxer: HttpFlvMuxer::with_serializer(serializer),
            state: SessionState::Idle,
            epoch: 0,
            stream_size: None,
            tags_emitted: 0,
            bytes_emitted: 0,
            samples_dropped: 0,
            snapshot: snapshot_tx,
        };
        let handle = tokio::spawn(controller.run(receiver));

        (Self { commands, snapshot }, handle)
    }

    /// Starts a session. A running session is stopped first.
    pub fn start(&self) -> Result<(), MuxError> {
        self.send(Command::Start)
    }

    pub fn stop(&self) -> Result<(), MuxError> {
        self.send(Command::Stop)
    }

    /// Stops the session if running and ends the controller task.
    pub fn shutdown(&self) -> Result<(), MuxError> {
        self.send(Command::Shutdown)
    }

    /// The most recently published state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    fn send(&self, command: Command) -> Result<(), MuxError> {
        self.commands
            .send(command)
            .map_err(|_| MuxError::SessionClosed)
    }
}

struct SessionController<S, L, M> {
    // weak so that dropping every handle and output ends the task
    commands: mpsc::WeakUnboundedSender<Command>,
    config: SessionConfig,
    source: S,
    listener: L,
    muxer: HttpFlvMuxer<M>,
    state: SessionState,
    epoch: u64,
    stream_size: Option<(u32, u32)>,
    tags_emitted: u64,
    bytes_emitted: u64,
    samples_dropped: u64,
    snapshot: watch::Sender<SessionSnapshot>,
}

impl<S, L, M> SessionController<S, L, M>
where
    S: VideoSource,
    L: StreamListener,
    M: MetadataSerializer,
{
    async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<Command>) {
        debug!("{} Session task running ({})", self.config.name, self.config);

        while let Some(command) = receiver.recv().await {
            let shutdown = matches!(command, Command::Shutdown);
            self.handle(command);
            self.publish();
            if shutdown {
                break;
            }
        }

        if self.state == SessionState::Started {
            self.stop();
            self.publish();
        }
        debug!("{} Session task finished", self.config.name);
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Start => self.start(),
            Command::Stop => self.stop(),
            Command::Shutdown => {
                info!("{} Shutting down session", self.config.name);
                self.stop();
            }
            Command::FormatDescription { epoch, description } => {
                if self.is_current(epoch) {
                    self.on_format_description(description);
                }
            }
            Command::AccessUnit { epoch, unit } => {
                if self.is_current(epoch) {
                    self.on_access_unit(unit);
                }
            }
            Command::EncoderError { epoch, error } => {
                if self.is_current(epoch) {
                    warn!("{} Encoder error: {}", self.config.name, error);
                    self.listener.on_event(StreamEvent::EncoderError(error));
                }
            }
        }
    }

    fn is_current(&self, epoch: u64) -> bool {
        let current = self.state == SessionState::Started && epoch == self.epoch;
        if !current {
            trace!(
                "{} Ignoring event from epoch {} (current {}, {})",
                self.config.name, epoch, self.epoch, self.state
            );
        }
        current
    }

    fn start(&mut self) {
        if self.state == SessionState::Started {
            debug!("{} Restarting running session", self.config.name);
            self.stop();
        }

        self.epoch += 1;
        self.reset();

        let Some(commands) = self.commands.upgrade() else {
            // no handle left to stop us; a source could never reach us either
            warn!("{} Start requested with no live handles", self.config.name);
            return;
        };
        self.source
            .start_encoding(SourceOutput::new(self.epoch, commands));
        self.state = SessionState::Started;

        let settings = self.source.settings();
        info!(
            "{} Session started (epoch {}): {}",
            self.config.name, self.epoch, settings
        );

        match self.muxer.begin_session(&StreamMetadata::from(&settings)) {
            Ok(chunks) => {
                let mut chunks = chunks.into_iter();
                if let Some(header) = chunks.next() {
                    self.emit(header);
                }
                for tag in chunks {
                    self.emit_tag(tag);
                }
            }
            Err(e) => {
                error!("{} Failed to write stream header: {}", self.config.name, e);
                // nothing may follow a missing file header
                self.stop();
                return;
            }
        }

        let description = self.source.format_description();
        self.on_format_description(description);
    }

    fn stop(&mut self) {
        if self.state == SessionState::Started {
            self.source.stop_encoding();
            self.state = SessionState::Stopped;
            info!(
                "{} Session stopped (epoch {}): {} tags, {} bytes, {} dropped",
                self.config.name,
                self.epoch,
                self.tags_emitted,
                self.bytes_emitted,
                self.samples_dropped
            );
        }
        self.epoch += 1;
        self.reset();
    }

    fn reset(&mut self) {
        self.muxer.reset();
        self.stream_size = None;
        self.tags_emitted = 0;
        self.bytes_emitted = 0;
        self.samples_dropped = 0;
    }

    fn on_format_description(&mut self, description: Option<FormatDescription>) {
        if let Some(desc) = &description {
            let size = (desc.width, desc.height);
            if self.config.notify_stream_size && self.stream_size != Some(size) {
                debug!(
                    "{} Stream size changed to {}x{}",
                    self.config.name, desc.width, desc.height
                );
                self.stream_size = Some(size);
                self.listener.on_event(StreamEvent::StreamSizeChanged {
                    width: desc.width,
                    height: desc.height,
                });
            }
        }

        match self.muxer.on_format_description(description.as_ref()) {
            Ok(Some(tag)) => {
                if let Some(record) = description.and_then(|d| d.configuration_record) {
                    self.log_sequence_header(record);
                }
                self.emit_tag(tag);
            }
            Ok(None) => debug!(
                "{} No configuration record, sequence header skipped",
                self.config.name
            ),
            Err(e) => error!(
                "{} Failed to write sequence header: {}",
                self.config.name, e
            ),
        }
    }

    fn log_sequence_header(&self, record: Bytes) {
        let len = record.len();
        match AvcDecoderConfigurationRecord::parse(&mut Cursor::new(record)) {
            Ok(parsed) => debug!("{} Sequence header: {}", self.config.name, parsed),
            Err(_) => debug!(
                "{} Sequence header: {} bytes (unparsed)",
                self.config.name, len
            ),
        }
    }

    fn on_access_unit(&mut self, unit: AccessUnit) {
        match self.muxer.on_access_unit(&unit) {
            Ok(MuxOutcome::Emitted(tag)) => {
                trace!(
                    "{} Video tag: keyframe={}, pts={}, {} bytes",
                    self.config.name,
                    unit.is_keyframe,
                    unit.presentation_time,
                    tag.len()
                );
                self.emit_tag(tag);
            }
            Ok(MuxOutcome::Dropped(reason)) => {
                self.samples_dropped += 1;
                match reason {
                    DropReason::NoSequenceHeader => {
                        trace!("{} Dropped sample: {}", self.config.name, reason)
                    }
                    DropReason::TimestampRegression { .. } => {
                        debug!("{} Dropped sample: {}", self.config.name, reason)
                    }
                }
            }
            Err(e) => {
                self.samples_dropped += 1;
                error!("{} Failed to write video tag: {}", self.config.name, e);
            }
        }
    }

    fn emit_tag(&mut self, tag: Bytes) {
        self.tags_emitted += 1;
        self.emit(tag);
    }

    fn emit(&mut self, chunk: Bytes) {
        self.bytes_emitted += chunk.len() as u64;
        self.listener.on_event(StreamEvent::Output(chunk));
    }

    fn publish(&self) {
        self.snapshot.send_replace(SessionSnapshot {
            state: self.state,
            epoch: self.epoch,
            previous_tag_size: self.muxer.previous_tag_size(),
            sequence_header_sent: self.muxer.sequence_header_sent(),
            last_decode_time: self.muxer.last_decode_time(),
            stream_size: self.stream_size,
            tags_emitted: self.tags_emitted,
            bytes_emitted: self.bytes_emitted,
            samples_dropped: self.samples_dropped,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::{FlvTag, FlvTagType, read_previous_tag_size};
    use crate::test_utils::{
        MockSource, ScriptedEvent, access_unit, format_description, init_tracing,
    };

    type Events = mpsc::UnboundedReceiver<StreamEvent>;

    fn spawn(source: MockSource, config: SessionConfig) -> (HttpFlvStream, JoinHandle<()>, Events) {
        init_tracing();
        let (tx, rx) = mpsc::unbounded_channel();
        let (stream, handle) = HttpFlvStream::spawn(source, tx, config);
        (stream, handle, rx)
    }

    fn drain(events: &mut Events) -> Vec<StreamEvent> {
        let mut out = Vec::new();
        while let Ok(event) = events.try_recv() {
            out.push(event);
        }
        out
    }

    fn parse_tag(event: &StreamEvent) -> (u32, FlvTag) {
        let StreamEvent::Output(chunk) = event else {
            panic!("expected output, got {event:?}");
        };
        let mut reader = Cursor::new(chunk.clone());
        let previous = read_previous_tag_size(&mut reader).unwrap();
        (previous, FlvTag::demux(&mut reader).unwrap())
    }

    fn scenario() -> MockSource {
        MockSource::new(Some(format_description(&[0xAA, 0xBB]))).with_script(vec![
            ScriptedEvent::AccessUnit(access_unit(&[0xCC], true, 0, Some(0))),
            ScriptedEvent::AccessUnit(access_unit(&[0xDD], false, 40, Some(40))),
        ])
    }

    /// Waits until the session has handed out `tags` tags in epoch `epoch`.
    async fn wait_for_tags(stream: &HttpFlvStream, epoch: u64, tags: u64) -> SessionSnapshot {
        let mut snapshots = stream.subscribe();
        snapshots
            .wait_for(|s| {
                s.state == SessionState::Started && s.epoch == epoch && s.tags_emitted == tags
            })
            .await
            .unwrap()
            .clone()
    }

    #[tokio::test]
    async fn test_emission_order() {
        let (stream, handle, mut events) = spawn(scenario(), SessionConfig::default());

        stream.start().unwrap();
        wait_for_tags(&stream, 1, 4).await;
        stream.shutdown().unwrap();
        handle.await.unwrap();

        let events = drain(&mut events);
        assert_eq!(events.len(), 6);
        assert_eq!(
            events[0],
            StreamEvent::Output(Bytes::from_static(&[
                0x46, 0x4C, 0x56, 0x01, 0x01, 0x00, 0x00, 0x00, 0x09
            ]))
        );

        let (previous, script) = parse_tag(&events[1]);
        assert_eq!(previous, 0);
        assert_eq!(script.tag_type, FlvTagType::ScriptData);

        assert_eq!(
            events[2],
            StreamEvent::StreamSizeChanged {
                width: 1280,
                height: 720
            }
        );

        let (_, sequence_header) = parse_tag(&events[3]);
        assert_eq!(
            sequence_header.data.as_ref(),
            &[0x17, 0x00, 0x00, 0x00, 0x00, 0xAA, 0xBB]
        );

        let (_, key) = parse_tag(&events[4]);
        assert_eq!(key.data.as_ref(), &[0x17, 0x01, 0x00, 0x00, 0x00, 0xCC]);
        assert_eq!(key.timestamp_ms, 0);

        let (previous, inter) = parse_tag(&events[5]);
        assert_eq!(previous as usize, key.size());
        assert_eq!(inter.data.as_ref(), &[0x27, 0x01, 0x00, 0x00, 0x00, 0xDD]);
        assert_eq!(inter.timestamp_ms, 40);

        // shutdown resets the counters of the session it stopped
        let snapshot = stream.snapshot();
        assert_eq!(snapshot.state, SessionState::Stopped);
        assert_eq!(snapshot.previous_tag_size, 0);
        assert!(!snapshot.sequence_header_sent);
    }

    #[tokio::test]
    async fn test_snapshot_tracks_running_session() {
        let source = scenario();
        let (stream, handle, mut events) = spawn(source, SessionConfig::default());

        stream.start().unwrap();
        let snapshot = wait_for_tags(&stream, 1, 4).await;

        let emitted = drain(&mut events);
        let (_, last) = parse_tag(emitted.last().unwrap());
        assert_eq!(snapshot.previous_tag_size as usize, last.size());
        assert!(snapshot.sequence_header_sent);
        assert_eq!(snapshot.last_decode_time, Some(MediaTime::from_millis(40)));
        assert_eq!(snapshot.stream_size, Some((1280, 720)));
        assert_eq!(snapshot.samples_dropped, 0);

        stream.shutdown().unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_then_start_resets_session() {
        let source = scenario();
        let state = source.state();
        let (stream, handle, mut events) = spawn(source, SessionConfig::default());

        stream.start().unwrap();
        wait_for_tags(&stream, 1, 4).await;
        stream.stop().unwrap();
        stream.start().unwrap();
        wait_for_tags(&stream, 3, 4).await;
        stream.shutdown().unwrap();
        handle.await.unwrap();

        assert_eq!(state.lock().calls, ["start", "stop", "start", "stop"]);

        let events = drain(&mut events);
        assert_eq!(events.len(), 12);
        // both cycles are identical byte for byte
        assert_eq!(events[..6], events[6..]);

        let (previous, _) = parse_tag(&events[7]);
        assert_eq!(previous, 0);
    }

    struct FailingSerializer;

    impl MetadataSerializer for FailingSerializer {
        fn serialize(
            &self,
            _name: &str,
            _properties: &[(std::borrow::Cow<'_, str>, amf0::Amf0Value<'_>)],
        ) -> Result<Bytes, MuxError> {
            Err(MuxError::InvalidData("metadata unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_failed_stream_header_stops_session() {
        init_tracing();
        let source = scenario();
        let state = source.state();
        let (tx, mut events) = mpsc::unbounded_channel();
        let (stream, handle) = HttpFlvStream::spawn_with_serializer(
            source,
            tx,
            SessionConfig::default(),
            FailingSerializer,
        );

        stream.start().unwrap();
        let snapshot = stream
            .subscribe()
            .wait_for(|s| s.state == SessionState::Stopped)
            .await
            .unwrap()
            .clone();
        assert_eq!(snapshot.epoch, 2);
        assert!(!snapshot.sequence_header_sent);

        stream.shutdown().unwrap();
        handle.await.unwrap();

        // no sequence header or sample without a file header in front
        assert!(drain(&mut events).is_empty());
        assert_eq!(state.lock().calls, ["start", "stop"]);
    }

    #[tokio::test]
    async fn test_start_while_started_restarts() {
        let source = MockSource::new(Some(format_description(&[0xAA])));
        let state = source.state();
        let (stream, handle, mut events) = spawn(source, SessionConfig::default());

        stream.start().unwrap();
        stream.start().unwrap();
        stream.shutdown().unwrap();
        handle.await.unwrap();

        assert_eq!(state.lock().calls, ["start", "stop", "start", "stop"]);
        let headers = drain(&mut events)
            .into_iter()
            .filter(|e| matches!(e, StreamEvent::Output(b) if b.starts_with(b"FLV")))
            .count();
        assert_eq!(headers, 2);
    }

    #[tokio::test]
    async fn test_stop_while_idle_does_not_touch_source() {
        let source = MockSource::new(None);
        let state = source.state();
        let (stream, handle, mut events) = spawn(source, SessionConfig::default());

        stream.stop().unwrap();
        stream.shutdown().unwrap();
        handle.await.unwrap();

        assert!(state.lock().calls.is_empty());
        assert!(drain(&mut events).is_empty());
        assert_eq!(stream.snapshot().state, SessionState::Idle);
    }

    #[tokio::test]
    async fn test_stale_events_are_ignored() {
        let source = MockSource::new(Some(format_description(&[0xAA])));
        let state = source.state();
        let (stream, handle, mut events) = spawn(source, SessionConfig::default());
        let mut snapshots = stream.subscribe();

        stream.start().unwrap();
        snapshots
            .wait_for(|s| s.state == SessionState::Started)
            .await
            .unwrap();
        let stale = state.lock().outputs[0].clone();

        stream.stop().unwrap();
        stream.start().unwrap();
        snapshots
            .wait_for(|s| s.state == SessionState::Started && s.epoch == 3)
            .await
            .unwrap();
        let current = state.lock().outputs[1].clone();
        drain(&mut events);

        stale
            .on_access_unit(access_unit(&[0xEE], true, 0, None))
            .unwrap();
        stale
            .on_encoder_error(EncoderError::FailedToEncodeFrame { status: 1 })
            .unwrap();
        current
            .on_access_unit(access_unit(&[0xCC], true, 0, None))
            .unwrap();
        stream.shutdown().unwrap();
        handle.await.unwrap();

        let events = drain(&mut events);
        assert_eq!(events.len(), 1);
        let (_, tag) = parse_tag(&events[0]);
        assert_eq!(tag.data.as_ref(), &[0x17, 0x01, 0x00, 0x00, 0x00, 0xCC]);
        assert_eq!(stale.epoch(), 1);
        assert_eq!(current.epoch(), 3);
    }

    #[tokio::test]
    async fn test_data_before_sequence_header_is_dropped() {
        let source = MockSource::new(None).with_script(vec![
            ScriptedEvent::AccessUnit(access_unit(&[0x01], true, 0, None)),
            ScriptedEvent::FormatDescription(Some(format_description(&[0xAA]))),
            ScriptedEvent::AccessUnit(access_unit(&[0x02], true, 40, None)),
        ]);
        let (stream, handle, mut events) = spawn(source, SessionConfig::default());

        stream.start().unwrap();
        let snapshot = wait_for_tags(&stream, 1, 3).await;
        assert_eq!(snapshot.samples_dropped, 1);
        stream.shutdown().unwrap();
        handle.await.unwrap();

        let events = drain(&mut events);
        let (_, data) = parse_tag(events.last().unwrap());
        assert_eq!(data.data.as_ref(), &[0x17, 0x01, 0x00, 0x00, 0x00, 0x02]);
        // the first kept sample defines the zero point
        assert_eq!(data.timestamp_ms, 0);
    }

    #[tokio::test]
    async fn test_encoder_errors_are_forwarded() {
        let source = MockSource::new(None).with_script(vec![ScriptedEvent::Error(
            EncoderError::FailedToPrepare { status: -12903 },
        )]);
        let (stream, handle, mut events) = spawn(source, SessionConfig::default());

        stream.start().unwrap();
        let error = loop {
            match events.recv().await {
                Some(StreamEvent::EncoderError(error)) => break error,
                Some(_) => continue,
                None => panic!("session ended without reporting the error"),
            }
        };
        assert_eq!(error, EncoderError::FailedToPrepare { status: -12903 });

        stream.shutdown().unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_size_events() {
        let resized = FormatDescription::new(Some(Bytes::from_static(&[0xBB])), 640, 360);
        let script = vec![
            // same size as the initial description: no event
            ScriptedEvent::FormatDescription(Some(format_description(&[0xAA]))),
            ScriptedEvent::FormatDescription(Some(resized)),
        ];

        let source = MockSource::new(Some(format_description(&[0xAA]))).with_script(script.clone());
        let (stream, handle, mut events) = spawn(source, SessionConfig::default());
        stream.start().unwrap();
        wait_for_tags(&stream, 1, 4).await;
        stream.shutdown().unwrap();
        handle.await.unwrap();

        let sizes: Vec<_> = drain(&mut events)
            .into_iter()
            .filter(|e| matches!(e, StreamEvent::StreamSizeChanged { .. }))
            .collect();
        assert_eq!(
            sizes,
            [
                StreamEvent::StreamSizeChanged {
                    width: 1280,
                    height: 720
                },
                StreamEvent::StreamSizeChanged {
                    width: 640,
                    height: 360
                },
            ]
        );

        let source = MockSource::new(Some(format_description(&[0xAA]))).with_script(script);
        let config = SessionConfig::builder().notify_stream_size(false).build();
        let (stream, handle, mut events) = spawn(source, config);
        stream.start().unwrap();
        wait_for_tags(&stream, 1, 4).await;
        stream.shutdown().unwrap();
        handle.await.unwrap();

        assert!(
            !drain(&mut events)
                .iter()
                .any(|e| matches!(e, StreamEvent::StreamSizeChanged { .. }))
        );
    }

    #[tokio::test]
    async fn test_handle_fails_after_shutdown() {
        let (stream, handle, _events) = spawn(MockSource::new(None), SessionConfig::default());

        stream.shutdown().unwrap();
        handle.await.unwrap();

        assert!(matches!(stream.start(), Err(MuxError::SessionClosed)));
    }
}
