//! Turn-level streaming: feeding deltas through the parser and handing
//! newly completed blocks to a consumer exactly once.
//!
//! The dispatcher owns the turn buffer and the consumer cursor. The parser
//! stays a pure function; all cross-chunk state lives here.

use anyhow::Result;
use tracing::debug;

use tagsift_vocab::TagVocabulary;

use crate::blocks::{ContentBlock, TextBlock, ToolUseBlock};
use crate::parser::parse;

/// Consumer of parsed blocks.
///
/// Completed blocks arrive exactly once, in buffer order. The partial
/// tail is forwarded through `on_preview` and may be re-delivered,
/// possibly extended, after every chunk; it must never reach tool
/// execution, which is why previews carry the whole `ContentBlock`.
pub trait BlockSink {
    /// A finalized run of free text, ready to render.
    fn on_text(&mut self, block: &TextBlock) -> Result<()>;

    /// A fully closed tool invocation, ready to validate and execute.
    fn on_tool_use(&mut self, block: &ToolUseBlock) -> Result<()>;

    /// The live partial block at the end of the list, for display only.
    fn on_preview(&mut self, _block: &ContentBlock) -> Result<()> {
        Ok(())
    }
}

/// Drives the parser over a growing turn buffer.
#[derive(Debug)]
pub struct StreamingDispatcher {
    vocabulary: TagVocabulary,
    buffer: String,
    /// Number of blocks already dispatched. Blocks behind the cursor are
    /// never re-dispatched.
    cursor: usize,
}

impl StreamingDispatcher {
    /// The vocabulary is supplied once per turn and not mutated after.
    pub fn new(vocabulary: TagVocabulary) -> Self {
        Self {
            vocabulary,
            buffer: String::new(),
            cursor: 0,
        }
    }

    /// Append a delta, re-parse the whole buffer, dispatch what became
    /// final and preview the partial tail.
    pub fn push_chunk(&mut self, delta: &str, sink: &mut dyn BlockSink) -> Result<()> {
        self.buffer.push_str(delta);
        let blocks = parse(&self.buffer, &self.vocabulary);

        while self.cursor < blocks.len() && blocks[self.cursor].is_complete() {
            debug!("Dispatching block #{}", self.cursor);
            match &blocks[self.cursor] {
                ContentBlock::Text(block) => sink.on_text(block)?,
                ContentBlock::ToolUse(block) => sink.on_tool_use(block)?,
            }
            self.cursor += 1;
        }

        if let Some(tail) = blocks.get(self.cursor) {
            sink.on_preview(tail)?;
        }

        Ok(())
    }

    /// Signal end of stream.
    ///
    /// Free text has no terminating marker, so a trailing partial text
    /// block becomes final here and is delivered as text. A truncated tool
    /// block stays partial: it is previewed one last time but never
    /// executed. Returns the full final block list.
    pub fn finish(&mut self, sink: &mut dyn BlockSink) -> Result<Vec<ContentBlock>> {
        let mut blocks = parse(&self.buffer, &self.vocabulary);

        while self.cursor < blocks.len() {
            match &mut blocks[self.cursor] {
                ContentBlock::Text(block) => {
                    block.complete = true;
                    sink.on_text(block)?;
                }
                ContentBlock::ToolUse(block) => {
                    if block.complete {
                        sink.on_tool_use(block)?;
                    } else {
                        debug!("Stream ended with a truncated tool block; not executing");
                        sink.on_preview(&ContentBlock::ToolUse(block.clone()))?;
                        break;
                    }
                }
            }
            self.cursor += 1;
        }

        Ok(blocks)
    }

    /// Re-parse and return the current block list without dispatching.
    pub fn blocks(&self) -> Vec<ContentBlock> {
        parse(&self.buffer, &self.vocabulary)
    }

    /// The accumulated raw text of the turn so far.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// How many blocks have been dispatched.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Clear buffer and cursor for a new turn.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
    }
}
