//! A [`VideoSource`] that replays an H.264 Annex-B file as if it were a
//! live encoder.

use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use flv_mux::{
    AccessUnit, AvcDecoderConfigurationRecord, EncoderError, FormatDescription, MediaTime,
    SourceOutput, VideoSettings, VideoSource,
};
use tokio::io::AsyncReadExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::annexb::{AccessUnitAssembler, AnnexBEvent, AnnexBSplitter, to_avcc};

const READ_CHUNK_SIZE: usize = 64 * 1024;
// 90 kHz, the usual video clock
const TIMESCALE: u32 = 90_000;

pub struct AnnexBFileSource {
    path: PathBuf,
    settings: VideoSettings,
    realtime: bool,
    cancel: CancellationToken,
    finished: CancellationToken,
}

impl AnnexBFileSource {
    pub fn new(path: impl Into<PathBuf>, settings: VideoSettings, realtime: bool) -> Self {
        Self {
            path: path.into(),
            settings,
            realtime,
            cancel: CancellationToken::new(),
            finished: CancellationToken::new(),
        }
    }

    /// Cancelled once a reader has posted everything it had, or failed.
    /// Stopping the session does not cancel it.
    pub fn finished(&self) -> CancellationToken {
        self.finished.clone()
    }
}

impl VideoSource for AnnexBFileSource {
    fn settings(&self) -> VideoSettings {
        self.settings.clone()
    }

    // Nothing is known until the reader has seen an SPS and a PPS.
    fn format_description(&self) -> Option<FormatDescription> {
        None
    }

    fn start_encoding(&mut self, output: SourceOutput) {
        self.cancel = CancellationToken::new();

        let reader = AnnexBReader {
            path: self.path.clone(),
            settings: self.settings.clone(),
            realtime: self.realtime,
            output,
        };
        let cancel = self.cancel.clone();
        let finished = self.finished.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => debug!("Annex-B reader cancelled"),
                _ = reader.run() => finished.cancel(),
            }
        });
    }

    fn stop_encoding(&mut self) {
        self.cancel.cancel();
    }
}

struct AnnexBReader {
    path: PathBuf,
    settings: VideoSettings,
    realtime: bool,
    output: SourceOutput,
}

impl AnnexBReader {
    async fn run(self) {
        if let Err(e) = self.pump().await {
            warn!("Annex-B reader failed: {e}");
            let _ = self
                .output
                .on_encoder_error(EncoderError::Source(e.to_string()));
        }
    }

    async fn pump(&self) -> std::io::Result<()> {
        let mut file = tokio::fs::File::open(&self.path).await?;
        info!("Reading Annex-B stream from {}", self.path.display());

        let mut splitter = AnnexBSplitter::new();
        let mut assembler = AccessUnitAssembler::new();
        let mut buffer = vec![0u8; READ_CHUNK_SIZE];
        let mut frame_index: u64 = 0;
        let clock_start = Instant::now();

        loop {
            let read = file.read(&mut buffer).await?;
            let nal_units: Vec<Bytes> = if read == 0 {
                splitter.finish().into_iter().collect()
            } else {
                splitter.push(&buffer[..read])
            };

            let mut events: Vec<AnnexBEvent> = nal_units
                .into_iter()
                .flat_map(|nal| assembler.push(nal))
                .collect();
            if read == 0 {
                events.extend(assembler.finish());
            }

            for event in events {
                let delivered = match event {
                    AnnexBEvent::ParameterSets { sps, pps } => self
                        .output
                        .on_format_description(Some(self.describe(sps, pps))),
                    AnnexBEvent::AccessUnit {
                        nal_units,
                        is_keyframe,
                    } => {
                        let presentation_time = frame_time(frame_index, self.settings.frame_rate);
                        if self.realtime {
                            let offset = Duration::from_secs_f64(presentation_time.as_secs_f64());
                            tokio::time::sleep_until(clock_start + offset).await;
                        }
                        frame_index += 1;
                        self.output.on_access_unit(AccessUnit {
                            payload: to_avcc(&nal_units),
                            is_keyframe,
                            presentation_time,
                            decode_time: None,
                        })
                    }
                };
                if delivered.is_err() {
                    debug!("Session closed, reader stopping");
                    return Ok(());
                }
            }

            if read == 0 {
                info!("Annex-B stream ended after {frame_index} frames");
                return Ok(());
            }
        }
    }

    fn describe(&self, sps: Bytes, pps: Bytes) -> FormatDescription {
        let record = AvcDecoderConfigurationRecord::from_parameter_sets(vec![sps], vec![pps]);
        let configuration_record = match record.map(|r| r.to_bytes()) {
            Some(Ok(bytes)) => Some(bytes),
            Some(Err(e)) => {
                warn!("Failed to build configuration record: {e}");
                None
            }
            None => {
                warn!("SPS too short for a configuration record");
                None
            }
        };

        FormatDescription::new(
            configuration_record,
            self.settings.width,
            self.settings.height,
        )
    }
}

/// Presentation time of frame `index` at a constant frame rate.
fn frame_time(index: u64, frame_rate: f64) -> MediaTime {
    let frame_rate = if frame_rate > 0.0 {
        frame_rate
    } else {
        VideoSettings::default().frame_rate
    };
    MediaTime::from_secs_f64(index as f64 / frame_rate, TIMESCALE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flv_mux::{HttpFlvStream, SessionConfig, SessionState, StreamEvent};
    use std::io::Write;
    use tokio::sync::mpsc;

    use crate::verify::verify_bytes;

    const SPS: &[u8] = &[0x67, 0x42, 0xC0, 0x1F, 0xDA, 0x01];
    const PPS: &[u8] = &[0x68, 0xCE, 0x3C, 0x80];
    const IDR: &[u8] = &[0x65, 0x88, 0x84, 0x21];
    const P: &[u8] = &[0x41, 0x9A, 0x02];

    fn sample_stream(frames: usize) -> Vec<u8> {
        let mut data = Vec::new();
        for nal in [SPS, PPS, IDR] {
            data.extend_from_slice(&[0, 0, 0, 1]);
            data.extend_from_slice(nal);
        }
        for _ in 1..frames {
            data.extend_from_slice(&[0, 0, 0, 1]);
            data.extend_from_slice(P);
        }
        data
    }

    fn settings() -> VideoSettings {
        VideoSettings {
            width: 640,
            height: 360,
            frame_rate: 25.0,
            bitrate: 800_000,
        }
    }

    async fn run_session(source: AnnexBFileSource) -> Vec<StreamEvent> {
        let finished = source.finished();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (stream, handle) = HttpFlvStream::spawn(source, tx, SessionConfig::default());

        stream.start().unwrap();
        finished.cancelled().await;
        stream.shutdown().unwrap();
        handle.await.unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_file_to_flv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&sample_stream(10)).unwrap();

        let source = AnnexBFileSource::new(file.path(), settings(), false);
        let events = run_session(source).await;

        assert!(events.contains(&StreamEvent::StreamSizeChanged {
            width: 640,
            height: 360
        }));

        let flv: Vec<u8> = events
            .iter()
            .filter_map(|event| match event {
                StreamEvent::Output(chunk) => Some(chunk.to_vec()),
                _ => None,
            })
            .flatten()
            .collect();

        let report = verify_bytes(Bytes::from(flv)).unwrap();
        assert_eq!(report.script_tags, 1);
        assert_eq!(report.sequence_headers, 1);
        assert_eq!(report.video_frames, 10);
        assert_eq!(report.keyframes, 1);
        // ten frames at 25 fps
        assert_eq!(report.last_timestamp_ms, 360);
    }

    #[tokio::test]
    async fn test_missing_file_reports_encoder_error() {
        let source = AnnexBFileSource::new("/nonexistent/input.h264", settings(), false);
        let events = run_session(source).await;

        assert!(
            events
                .iter()
                .any(|event| matches!(event, StreamEvent::EncoderError(EncoderError::Source(_))))
        );
    }

    #[tokio::test]
    async fn test_stop_does_not_signal_end_of_input() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&sample_stream(100)).unwrap();

        // paced at 25 fps the reader needs four seconds for the whole file
        let source = AnnexBFileSource::new(file.path(), settings(), true);
        let finished = source.finished();
        let (tx, _rx) = mpsc::unbounded_channel();
        let (stream, handle) = HttpFlvStream::spawn(source, tx, SessionConfig::default());

        stream.start().unwrap();
        let mut snapshots = stream.subscribe();
        snapshots
            .wait_for(|s| s.epoch == 1 && s.tags_emitted >= 3)
            .await
            .unwrap();

        stream.stop().unwrap();
        snapshots
            .wait_for(|s| s.state == SessionState::Stopped)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!finished.is_cancelled());

        stream.shutdown().unwrap();
        handle.await.unwrap();
        assert!(!finished.is_cancelled());
    }

    #[test]
    fn test_frame_time() {
        assert_eq!(frame_time(0, 25.0), MediaTime::ZERO);
        assert_eq!(frame_time(1, 25.0), MediaTime::from_millis(40));
        assert_eq!(frame_time(3, 30_000.0 / 1001.0), MediaTime::new(9009, 90_000));
        // a bogus rate falls back to the default
        assert_eq!(frame_time(30, 0.0), MediaTime::from_millis(1000));
    }
}
