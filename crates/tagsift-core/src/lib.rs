//! tagsift-core — incremental assistant-output block parser.
//!
//! Converts a growing, streamed text buffer produced by a language model
//! into an ordered list of typed content blocks: plain-text spans and
//! tool invocations delimited by tag-like markup. The parser is a pure
//! function of the whole buffer and is re-invoked on every chunk; the
//! [`StreamingDispatcher`] layers the turn buffer and exactly-once
//! dispatch on top of it.

pub mod blocks;
pub mod markers;
pub mod parser;
pub mod streaming;

pub use blocks::{ContentBlock, TextBlock, ToolUseBlock};
pub use parser::parse;
pub use streaming::{BlockSink, StreamingDispatcher};

pub use tagsift_vocab::{TagVocabulary, ToolTag, VocabularyBuilder, VocabularyError};
