use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use flv_mux::{EncoderError, StreamEvent};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Where the FLV stream is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    File(PathBuf),
    Stdout,
}

impl std::str::FromStr for OutputTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Err("Output path must not be empty".to_string()),
            "-" => Ok(OutputTarget::Stdout),
            path => Ok(OutputTarget::File(PathBuf::from(path))),
        }
    }
}

impl std::fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputTarget::File(path) => write!(f, "{}", path.display()),
            OutputTarget::Stdout => write!(f, "stdout"),
        }
    }
}

/// A trait defining the interface for output providers
pub trait OutputProvider: Send + Sync {
    /// Write all bytes to the output
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Flush any buffered data
    fn flush(&mut self) -> io::Result<()>;

    /// Get total bytes written so far
    fn bytes_written(&self) -> u64;
}

/// A file-based output provider
pub struct FileOutputProvider {
    writer: BufWriter<File>,
    bytes_written: u64,
}

impl FileOutputProvider {
    pub fn new(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            bytes_written: 0,
        })
    }
}

impl OutputProvider for FileOutputProvider {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes)?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

/// A pipe-based output provider
pub struct PipeOutputProvider {
    writer: BufWriter<Box<dyn Write + Send + Sync>>,
    bytes_written: u64,
}

impl PipeOutputProvider {
    pub fn stdout() -> Self {
        Self {
            writer: BufWriter::new(Box::new(io::stdout())),
            bytes_written: 0,
        }
    }
}

impl OutputProvider for PipeOutputProvider {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes)?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

pub fn create_output(target: &OutputTarget) -> io::Result<Box<dyn OutputProvider>> {
    match target {
        OutputTarget::File(path) => {
            info!("Creating file output: {}", path.display());
            Ok(Box::new(FileOutputProvider::new(path)?))
        }
        OutputTarget::Stdout => {
            debug!("Creating stdout output");
            Ok(Box::new(PipeOutputProvider::stdout()))
        }
    }
}

/// What the writer saw over the whole run
#[derive(Debug, Default)]
pub struct WriterSummary {
    pub chunks: u64,
    pub bytes: u64,
    pub size_changes: u64,
    pub encoder_errors: Vec<EncoderError>,
}

/// Drains session events into `output` until the session goes away.
pub async fn run_writer(
    mut events: mpsc::UnboundedReceiver<StreamEvent>,
    mut output: Box<dyn OutputProvider>,
) -> io::Result<WriterSummary> {
    let mut summary = WriterSummary::default();

    while let Some(event) = events.recv().await {
        match event {
            StreamEvent::Output(chunk) => {
                output.write_all(&chunk)?;
                summary.chunks += 1;
            }
            StreamEvent::StreamSizeChanged { width, height } => {
                info!("Stream size: {width}x{height}");
                summary.size_changes += 1;
            }
            StreamEvent::EncoderError(error) => {
                warn!("Encoder reported: {error}");
                summary.encoder_errors.push(error);
            }
        }
    }

    output.flush()?;
    summary.bytes = output.bytes_written();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_output_target_from_str() {
        assert_eq!("-".parse::<OutputTarget>().unwrap(), OutputTarget::Stdout);
        assert_eq!(
            "out/live.flv".parse::<OutputTarget>().unwrap(),
            OutputTarget::File(PathBuf::from("out/live.flv"))
        );
        assert!("".parse::<OutputTarget>().is_err());
    }

    #[tokio::test]
    async fn test_writer_drains_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.flv");
        let output = create_output(&OutputTarget::File(path.clone())).unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(StreamEvent::Output(Bytes::from_static(b"FLV"))).unwrap();
        tx.send(StreamEvent::StreamSizeChanged {
            width: 2,
            height: 2,
        })
        .unwrap();
        tx.send(StreamEvent::EncoderError(EncoderError::FailedToCreate { status: -1 }))
            .unwrap();
        tx.send(StreamEvent::Output(Bytes::from_static(&[1, 2, 3])))
            .unwrap();
        drop(tx);

        let summary = run_writer(rx, output).await.unwrap();
        assert_eq!(summary.chunks, 2);
        assert_eq!(summary.bytes, 6);
        assert_eq!(summary.size_changes, 1);
        assert_eq!(summary.encoder_errors.len(), 1);
        assert_eq!(std::fs::read(&path).unwrap(), b"FLV\x01\x02\x03");
    }
}
