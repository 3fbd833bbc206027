//! Content block model produced by the incremental parser.
//!
//! A parse yields an ordered list of blocks: free-text spans and tool
//! invocations. Every block except possibly the last is complete; the
//! last one may still change on a later parse with more buffer data.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A contiguous run of free text between (or before/after) tool invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    pub content: String,
    pub complete: bool,
}

/// A structured tool invocation delimited by vocabulary markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolUseBlock {
    pub name: String,
    #[serde(default)]
    pub params: HashMap<String, String>,
    pub complete: bool,
}

/// One unit of parser output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentBlock {
    Text(TextBlock),
    ToolUse(ToolUseBlock),
}

impl ContentBlock {
    pub fn text(content: impl Into<String>, complete: bool) -> Self {
        Self::Text(TextBlock {
            content: content.into(),
            complete,
        })
    }

    pub fn is_complete(&self) -> bool {
        match self {
            Self::Text(block) => block.complete,
            Self::ToolUse(block) => block.complete,
        }
    }

    pub fn as_text(&self) -> Option<&TextBlock> {
        match self {
            Self::Text(block) => Some(block),
            Self::ToolUse(_) => None,
        }
    }

    pub fn as_tool_use(&self) -> Option<&ToolUseBlock> {
        match self {
            Self::ToolUse(block) => Some(block),
            Self::Text(_) => None,
        }
    }
}
