use clap::Parser;
use std::path::PathBuf;

use crate::output::OutputTarget;

/// Define CLI arguments
#[derive(Parser)]
#[command(
    version,
    about = "Package an H.264 elementary stream as HTTP-FLV",
    long_about = "Reads an H.264 Annex-B elementary stream, feeds it through an HTTP-FLV\n\
                  muxing session and writes the resulting FLV byte stream to a file or to\n\
                  stdout, exactly as it would be sent over a chunked HTTP response."
)]
pub struct CliArgs {
    /// H.264 Annex-B input
    #[arg(required = true, help = "Path to an H.264 Annex-B elementary stream (.h264/.264)")]
    pub input: PathBuf,

    /// Output file, or - for stdout
    #[arg(
        short,
        long,
        default_value = "-",
        help = "Where to write the FLV stream; '-' writes to stdout"
    )]
    pub output: OutputTarget,

    #[arg(long, default_value = "1280", help = "Coded width announced in metadata")]
    pub width: u32,

    #[arg(long, default_value = "720", help = "Coded height announced in metadata")]
    pub height: u32,

    #[arg(long, default_value = "30", help = "Frame rate used to timestamp the frames")]
    pub fps: f64,

    #[arg(
        short,
        long,
        default_value = "2000000",
        help = "Bitrate in bits per second announced in metadata"
    )]
    pub bitrate: u32,

    #[arg(
        short,
        long,
        help = "Deliver frames at the frame rate instead of as fast as possible"
    )]
    pub realtime: bool,

    #[arg(
        short,
        long,
        default_value = "httpflv",
        help = "Session name used to prefix log lines"
    )]
    pub name: String,

    #[arg(long, help = "Disable stream size change notifications")]
    pub no_size_events: bool,

    #[arg(long, help = "Re-read the written file and check its tag framing")]
    pub verify: bool,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable detailed debug logging")]
    pub verbose: bool,
}
