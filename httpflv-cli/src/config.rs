use std::fmt::Display;
use std::path::PathBuf;

use flv_mux::{SessionConfig, VideoSettings};

use crate::output::OutputTarget;

/// Configuration for the entire program
#[derive(Debug, Clone)]
pub struct ProgramConfig {
    /// Annex-B H.264 input file
    pub input: PathBuf,

    /// Where the FLV stream goes
    pub output: OutputTarget,

    /// Encoder settings announced in the metadata tag
    pub video: VideoSettings,

    /// Session name and notification switches
    pub session: SessionConfig,

    /// Pace frames at the frame rate instead of as fast as possible
    pub realtime: bool,

    /// Re-read the output file once written
    pub verify: bool,
}

impl Display for ProgramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ProgramConfig {{ input: {}, output: {}, video: {}, realtime: {}, verify: {} }}",
            self.input.display(),
            self.output,
            self.video,
            self.realtime,
            self.verify
        )
    }
}

impl ProgramConfig {
    pub fn builder() -> ProgramConfigBuilder {
        ProgramConfigBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProgramConfigBuilder {
    input: Option<PathBuf>,
    output: Option<OutputTarget>,
    video: VideoSettings,
    session: SessionConfig,
    realtime: bool,
    verify: bool,
}

impl ProgramConfigBuilder {
    pub fn input(mut self, input: impl Into<PathBuf>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn output(mut self, output: OutputTarget) -> Self {
        self.output = Some(output);
        self
    }

    pub fn video(mut self, video: VideoSettings) -> Self {
        self.video = video;
        self
    }

    pub fn session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn build(self) -> Result<ProgramConfig, String> {
        let input = self.input.ok_or("No input file given")?;
        let output = self.output.unwrap_or(OutputTarget::Stdout);

        if self.verify && output == OutputTarget::Stdout {
            return Err("--verify needs a file output".to_string());
        }
        if !(self.video.frame_rate.is_finite() && self.video.frame_rate > 0.0) {
            return Err(format!("Invalid frame rate: {}", self.video.frame_rate));
        }
        if self.video.width == 0 || self.video.height == 0 {
            return Err(format!(
                "Invalid video size: {}x{}",
                self.video.width, self.video.height
            ));
        }

        Ok(ProgramConfig {
            input,
            output,
            video: self.video,
            session: self.session,
            realtime: self.realtime,
            verify: self.verify,
        })
    }
}
