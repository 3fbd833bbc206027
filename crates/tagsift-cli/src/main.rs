//! tagsift — replay a streamed assistant transcript through the parser.
//!
//! Feeds the transcript to the dispatcher in fixed-size chunks, the way a
//! provider stream would, and prints every finalized block as a JSON line.

mod cli_args;

use std::io::Read;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cli_args::Cli;
use tagsift_core::{BlockSink, ContentBlock, StreamingDispatcher, TextBlock, ToolUseBlock};
use tagsift_vocab::TagVocabulary;

/// Prints finalized blocks to stdout as JSON lines; previews go to stderr.
struct JsonLineSink {
    preview: bool,
}

impl BlockSink for JsonLineSink {
    fn on_text(&mut self, block: &TextBlock) -> Result<()> {
        println!("{}", serde_json::to_string(&ContentBlock::Text(block.clone()))?);
        Ok(())
    }

    fn on_tool_use(&mut self, block: &ToolUseBlock) -> Result<()> {
        println!("{}", serde_json::to_string(&ContentBlock::ToolUse(block.clone()))?);
        Ok(())
    }

    fn on_preview(&mut self, block: &ContentBlock) -> Result<()> {
        if self.preview {
            eprintln!("preview: {}", serde_json::to_string(block)?);
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let vocabulary_text = std::fs::read_to_string(&cli.vocabulary)
        .with_context(|| format!("failed to read vocabulary file {}", cli.vocabulary.display()))?;
    let vocabulary = TagVocabulary::from_yaml_str(&vocabulary_text)?;
    debug!("Loaded vocabulary with {} tools", vocabulary.len());

    let transcript = match &cli.transcript {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read transcript {}", path.display()))?,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read transcript from stdin")?;
            text
        }
    };

    let mut dispatcher = StreamingDispatcher::new(vocabulary);
    let mut sink = JsonLineSink {
        preview: cli.preview,
    };

    let chunk_size = cli.chunk_size.max(1);
    let mut rest = transcript.as_str();
    while !rest.is_empty() {
        let mut take = chunk_size.min(rest.len());
        while !rest.is_char_boundary(take) {
            take += 1;
        }
        let (head, tail) = rest.split_at(take);
        dispatcher.push_chunk(head, &mut sink)?;
        rest = tail;
    }

    let blocks = dispatcher.finish(&mut sink)?;
    debug!(
        "Replayed {} bytes into {} blocks",
        dispatcher.buffer_len(),
        blocks.len()
    );

    Ok(())
}
