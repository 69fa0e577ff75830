use clap::Parser;
use flv_mux::{HttpFlvStream, SessionConfig, VideoSettings};
use tokio::sync::mpsc;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

mod annexb;
mod cli;
mod config;
mod error;
mod output;
mod source;
mod verify;

use cli::CliArgs;
use config::ProgramConfig;
use error::AppError;
use output::{OutputTarget, create_output, run_writer};
use source::AnnexBFileSource;

fn main() {
    if let Err(e) = bootstrap() {
        eprintln!("Error: {e}");
        // Log the full error for debugging
        error!(error = ?e, "Application failed");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn bootstrap() -> Result<(), AppError> {
    // Parse command-line arguments
    let args = CliArgs::parse();

    // Setup logging; stdout may carry the FLV stream, so logs go to stderr
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::Initialization(e.to_string()))?;

    let session_config = SessionConfig::builder()
        .name(args.name.clone())
        .notify_stream_size(!args.no_size_events)
        .build();

    let program_config = ProgramConfig::builder()
        .input(args.input.clone())
        .output(args.output.clone())
        .video(VideoSettings {
            width: args.width,
            height: args.height,
            frame_rate: args.fps,
            bitrate: args.bitrate,
        })
        .session(session_config)
        .realtime(args.realtime)
        .verify(args.verify)
        .build()
        .map_err(AppError::InvalidInput)?;

    info!("{program_config}");
    info!("{}", program_config.session);

    run(program_config).await
}

async fn run(config: ProgramConfig) -> Result<(), AppError> {
    let output = create_output(&config.output)?;
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(run_writer(events_rx, output));

    let source = AnnexBFileSource::new(&config.input, config.video.clone(), config.realtime);
    let finished = source.finished();
    let (stream, session) = HttpFlvStream::spawn(source, events_tx, config.session.clone());

    stream.start()?;
    tokio::select! {
        _ = finished.cancelled() => info!("Input exhausted"),
        _ = tokio::signal::ctrl_c() => warn!("Interrupted, stopping session"),
    }

    let snapshot = stream.snapshot();
    stream.shutdown()?;
    session.await?;
    info!(
        "Session {}: {} tags, {} bytes, {} samples dropped",
        snapshot.state, snapshot.tags_emitted, snapshot.bytes_emitted, snapshot.samples_dropped
    );

    // the session dropped its listener, so the writer sees the end of the stream
    let summary = writer.await??;
    info!(
        "Wrote {} bytes in {} chunks to {}",
        summary.bytes, summary.chunks, config.output
    );

    if config.verify {
        if let OutputTarget::File(path) = &config.output {
            let report = verify::verify_file(path).await?;
            info!("Verified {}: {report}", path.display());
        }
    }

    match summary.encoder_errors.into_iter().next() {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}
