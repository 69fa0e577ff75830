//! # Test Utilities
//!
//! Fixtures shared by the unit tests: a tracing initializer, builders for
//! samples and format descriptions, and a scriptable [`VideoSource`].

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::script::StreamMetadata;
use crate::source::{
    AccessUnit, EncoderError, FormatDescription, SourceOutput, VideoSettings, VideoSource,
};
use crate::timestamp::MediaTime;

/// Initialize tracing for tests with appropriate settings
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer() // Write to test output
        .try_init();
}

pub fn test_settings() -> VideoSettings {
    VideoSettings {
        width: 1280,
        height: 720,
        frame_rate: 25.0,
        bitrate: 1_500_000,
    }
}

pub fn test_metadata() -> StreamMetadata {
    StreamMetadata::from(&test_settings())
}

/// A 1280x720 description carrying `record` as its configuration record.
pub fn format_description(record: &[u8]) -> FormatDescription {
    FormatDescription::new(Some(Bytes::copy_from_slice(record)), 1280, 720)
}

/// A sample with millisecond timestamps.
pub fn access_unit(payload: &[u8], is_keyframe: bool, pts_ms: i64, dts_ms: Option<i64>) -> AccessUnit {
    AccessUnit {
        payload: Bytes::copy_from_slice(payload),
        is_keyframe,
        presentation_time: MediaTime::from_millis(pts_ms),
        decode_time: dts_ms.map(MediaTime::from_millis),
    }
}

/// Something a [`MockSource`] posts as soon as it is started.
#[derive(Debug, Clone)]
pub enum ScriptedEvent {
    FormatDescription(Option<FormatDescription>),
    AccessUnit(AccessUnit),
    Error(EncoderError),
}

#[derive(Debug, Default)]
pub struct MockState {
    /// `"start"` / `"stop"` in call order
    pub calls: Vec<&'static str>,
    /// Every output handed to the source, oldest first
    pub outputs: Vec<SourceOutput>,
}

/// A [`VideoSource`] that replays a fixed script on every start.
pub struct MockSource {
    settings: VideoSettings,
    description: Option<FormatDescription>,
    script: Vec<ScriptedEvent>,
    state: Arc<Mutex<MockState>>,
}

impl MockSource {
    pub fn new(description: Option<FormatDescription>) -> Self {
        Self {
            settings: test_settings(),
            description,
            script: Vec::new(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    pub fn with_script(mut self, script: Vec<ScriptedEvent>) -> Self {
        self.script = script;
        self
    }

    pub fn state(&self) -> Arc<Mutex<MockState>> {
        self.state.clone()
    }
}

impl VideoSource for MockSource {
    fn settings(&self) -> VideoSettings {
        self.settings.clone()
    }

    fn format_description(&self) -> Option<FormatDescription> {
        self.description.clone()
    }

    fn start_encoding(&mut self, output: SourceOutput) {
        for event in &self.script {
            let _ = match event.clone() {
                ScriptedEvent::FormatDescription(description) => {
                    output.on_format_description(description)
                }
                ScriptedEvent::AccessUnit(unit) => output.on_access_unit(unit),
                ScriptedEvent::Error(error) => output.on_encoder_error(error),
            };
        }

        let mut state = self.state.lock();
        state.calls.push("start");
        state.outputs.push(output);
    }

    fn stop_encoding(&mut self) {
        self.state.lock().calls.push("stop");
    }
}
