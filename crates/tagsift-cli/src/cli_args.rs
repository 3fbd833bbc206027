//! CLI argument parsing for tagsift.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Clone)]
#[command(name = "tagsift")]
#[command(about = "Replay a streamed assistant transcript through the block parser")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Vocabulary definitions file (YAML)
    #[arg(long, value_name = "FILE")]
    pub vocabulary: PathBuf,

    /// Bytes per simulated chunk
    #[arg(long, default_value = "16")]
    pub chunk_size: usize,

    /// Print the live partial tail after every chunk (to stderr)
    #[arg(long)]
    pub preview: bool,

    /// Transcript file to replay (reads stdin when omitted)
    pub transcript: Option<PathBuf>,
}
