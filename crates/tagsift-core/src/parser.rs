//! Incremental parser: whole buffer in, ordered block list out.
//!
//! The parser is re-invoked with the entire accumulated buffer on every
//! chunk and keeps no state across calls. Whether a block is emitted as
//! complete depends only on the prefix of the buffer that produced it,
//! which is what makes repeated parses of a growing buffer prefix-stable:
//! completed blocks are never retracted or reordered by later chunks.
//!
//! The grammar is strictly one level: free text, tool blocks opened by
//! `<name>` and closed by `</name>`, and parameters inside a tool block
//! opened by `<param>` and closed by `</param>`. Nothing nests. A marker
//! is only meaningful while the construct it closes is open; everything
//! else stays literal text, including unknown tag-like substrings.

use std::collections::HashMap;

use tracing::debug;

use tagsift_vocab::TagVocabulary;

use crate::blocks::{ContentBlock, ToolUseBlock};
use crate::markers::{
    close_marker, ends_with_close_marker, match_open_marker, open_marker, strip_partial_marker,
};

/// A tool block under construction.
#[derive(Debug)]
struct OpenTool {
    name: String,
    params: HashMap<String, String>,
    /// Byte offset of the first body byte, just past the opening marker.
    body_start: usize,
}

impl OpenTool {
    fn into_block(self, complete: bool) -> ContentBlock {
        ContentBlock::ToolUse(ToolUseBlock {
            name: self.name,
            params: self.params,
            complete,
        })
    }
}

/// Explicit scan state, threaded through the loop.
///
/// All offsets are byte offsets into the buffer being parsed.
#[derive(Debug)]
enum ScanState {
    /// Accumulating free text since `text_start`.
    FreeText { text_start: usize },
    /// Inside a tool block, between parameters.
    InBlock { tool: OpenTool },
    /// Inside a parameter value that began at `value_start`.
    InParam {
        tool: OpenTool,
        param: String,
        value_start: usize,
    },
}

/// Parse the accumulated assistant output into an ordered block list.
///
/// Pure, total and deterministic: any string input yields a block list,
/// identical inputs yield identical lists, and nothing ever errors. Safe
/// to call repeatedly with a monotonically growing buffer; the completed
/// blocks of an earlier call are always a prefix of a later call's.
pub fn parse(buffer: &str, vocabulary: &TagVocabulary) -> Vec<ContentBlock> {
    let mut blocks = Vec::new();
    let mut state = ScanState::FreeText { text_start: 0 };

    let mut pos = 0;
    for ch in buffer.chars() {
        pos += ch.len_utf8();
        state = step(state, buffer, pos, vocabulary, &mut blocks);
    }

    flush(state, buffer, &mut blocks);
    blocks
}

/// Advance the scan by one character; `pos` is the byte offset just past it.
fn step(
    state: ScanState,
    buffer: &str,
    pos: usize,
    vocabulary: &TagVocabulary,
    blocks: &mut Vec<ContentBlock>,
) -> ScanState {
    match state {
        ScanState::FreeText { text_start } => {
            let seen = &buffer[..pos];
            if let Some(name) = match_open_marker(seen, vocabulary.tool_names()) {
                let marker_len = name.len() + 2;
                let content = buffer[text_start..pos - marker_len].trim();
                if !content.is_empty() {
                    blocks.push(ContentBlock::text(content, true));
                }
                debug!("Opening tool block '{}' at offset {}", name, pos);
                return ScanState::InBlock {
                    tool: OpenTool {
                        name: name.to_string(),
                        params: HashMap::new(),
                        body_start: pos,
                    },
                };
            }
            ScanState::FreeText { text_start }
        }

        ScanState::InBlock { mut tool } => {
            let body = &buffer[tool.body_start..pos];

            if ends_with_close_marker(body, &tool.name) {
                debug!("Tool block '{}' complete at offset {}", tool.name, pos);
                blocks.push(tool.into_block(true));
                return ScanState::FreeText { text_start: pos };
            }

            // A verbatim parameter's value may itself contain its close
            // marker. Each time one scrolls past while the block is open,
            // re-extract the value greedily from the first open marker in
            // the body to this latest close marker, so the final capture
            // spans first-open to last-close.
            if let Some(verbatim) = vocabulary.verbatim_parameter(&tool.name) {
                if ends_with_close_marker(body, verbatim) {
                    if let Some(value) = extract_verbatim(body, verbatim) {
                        debug!(
                            "Re-extracted verbatim parameter '{}' of '{}' ({} bytes)",
                            verbatim,
                            tool.name,
                            value.len()
                        );
                        tool.params.insert(verbatim.to_string(), value.trim().to_string());
                    }
                    return ScanState::InBlock { tool };
                }
            }

            let params = vocabulary.parameters_of(&tool.name);
            if let Some(param) = match_open_marker(body, params.iter().map(String::as_str)) {
                debug!("Opening parameter '{}' of '{}'", param, tool.name);
                let param = param.to_string();
                return ScanState::InParam {
                    tool,
                    param,
                    value_start: pos,
                };
            }

            ScanState::InBlock { tool }
        }

        ScanState::InParam {
            mut tool,
            param,
            value_start,
        } => {
            let region = &buffer[value_start..pos];
            if ends_with_close_marker(region, &param) {
                let marker_len = param.len() + 3;
                let value = region[..region.len() - marker_len].trim();
                tool.params.insert(param, value.to_string());
                return ScanState::InBlock { tool };
            }
            ScanState::InParam {
                tool,
                param,
                value_start,
            }
        }
    }
}

/// Append whatever construct is still open when the buffer runs out.
fn flush(state: ScanState, buffer: &str, blocks: &mut Vec<ContentBlock>) {
    match state {
        ScanState::FreeText { text_start } => {
            // Free text has no terminating marker; a trailing text block
            // is always partial.
            let content = buffer[text_start..].trim();
            if !content.is_empty() {
                blocks.push(ContentBlock::text(content, false));
            }
        }
        ScanState::InBlock { tool } => {
            blocks.push(tool.into_block(false));
        }
        ScanState::InParam {
            mut tool,
            param,
            value_start,
        } => {
            // Best-effort partial value, holding back a half-received
            // close marker so it never leaks into the preview.
            let close = close_marker(&param);
            let value = strip_partial_marker(&buffer[value_start..], &close).trim();
            tool.params.insert(param, value.to_string());
            blocks.push(tool.into_block(false));
        }
    }
}

/// Everything strictly between the first `<name>` and the last `</name>`
/// in `body`, or None if the open marker never appeared.
fn extract_verbatim<'a>(body: &'a str, name: &str) -> Option<&'a str> {
    let open = open_marker(name);
    let close = close_marker(name);
    let start = body.find(&open)? + open.len();
    let end = body.rfind(&close)?;
    (end >= start).then(|| &body[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> TagVocabulary {
        TagVocabulary::builder()
            .tool("toolA", ["p1", "p2"])
            .tool_with_verbatim("toolB", ["path", "content"], "content")
            .build()
            .unwrap()
    }

    fn text(content: &str, complete: bool) -> ContentBlock {
        ContentBlock::text(content, complete)
    }

    fn tool(name: &str, params: &[(&str, &str)], complete: bool) -> ContentBlock {
        ContentBlock::ToolUse(ToolUseBlock {
            name: name.to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            complete,
        })
    }

    #[test]
    fn test_empty_buffer() {
        assert!(parse("", &vocab()).is_empty());
    }

    #[test]
    fn test_pure_text_is_partial() {
        let blocks = parse("Hello world", &vocab());
        assert_eq!(blocks, vec![text("Hello world", false)]);
    }

    #[test]
    fn test_whitespace_only_emits_nothing() {
        assert!(parse("  \n\t ", &vocab()).is_empty());
    }

    #[test]
    fn test_simple_tool_extraction() {
        let blocks = parse("Hi <toolA><p1>v</p1></toolA> Bye", &vocab());
        assert_eq!(
            blocks,
            vec![
                text("Hi", true),
                tool("toolA", &[("p1", "v")], true),
                text("Bye", false),
            ]
        );
    }

    #[test]
    fn test_multiple_parameters() {
        let blocks = parse("<toolA><p1> a </p1><p2>b\n</p2></toolA>", &vocab());
        assert_eq!(blocks, vec![tool("toolA", &[("p1", "a"), ("p2", "b")], true)]);
    }

    #[test]
    fn test_unknown_tag_stays_literal() {
        let blocks = parse("see <toolX> here", &vocab());
        assert_eq!(blocks, vec![text("see <toolX> here", false)]);
    }

    #[test]
    fn test_unknown_parameter_not_captured() {
        let blocks = parse("<toolA><bogus>v</bogus></toolA>", &vocab());
        assert_eq!(blocks, vec![tool("toolA", &[], true)]);
    }

    #[test]
    fn test_close_marker_without_open_stays_literal() {
        let blocks = parse("</toolA> hi", &vocab());
        assert_eq!(blocks, vec![text("</toolA> hi", false)]);
    }

    #[test]
    fn test_buffer_ending_mid_marker() {
        let blocks = parse("hello <too", &vocab());
        assert_eq!(blocks, vec![text("hello <too", false)]);
    }

    #[test]
    fn test_open_tool_block_is_partial() {
        let blocks = parse("go <toolA><p1>part", &vocab());
        assert_eq!(
            blocks,
            vec![text("go", true), tool("toolA", &[("p1", "part")], false)]
        );
    }

    #[test]
    fn test_partial_close_marker_held_back_from_value() {
        let blocks = parse("Hi <toolA><p1>v</p", &vocab());
        assert_eq!(
            blocks,
            vec![text("Hi", true), tool("toolA", &[("p1", "v")], false)]
        );
    }

    #[test]
    fn test_verbatim_greedy_extraction() {
        let blocks = parse("<toolB><content>a </content> b</content></toolB>", &vocab());
        assert_eq!(
            blocks,
            vec![tool("toolB", &[("content", "a </content> b")], true)]
        );
    }

    #[test]
    fn test_verbatim_simple_value() {
        let blocks = parse(
            "<toolB><path>x.txt</path><content>line1\nline2</content></toolB>",
            &vocab(),
        );
        assert_eq!(
            blocks,
            vec![tool(
                "toolB",
                &[("path", "x.txt"), ("content", "line1\nline2")],
                true
            )]
        );
    }

    #[test]
    fn test_verbatim_close_without_open_is_ignored() {
        // A bare close marker in the body opens nothing and extracts nothing.
        let blocks = parse("<toolB>x</content>y</toolB>", &vocab());
        assert_eq!(blocks, vec![tool("toolB", &[], true)]);
    }

    #[test]
    fn test_two_tools_with_text_between() {
        let blocks = parse(
            "first <toolA><p1>1</p1></toolA> middle <toolA><p2>2</p2></toolA> last",
            &vocab(),
        );
        assert_eq!(
            blocks,
            vec![
                text("first", true),
                tool("toolA", &[("p1", "1")], true),
                text("middle", true),
                tool("toolA", &[("p2", "2")], true),
                text("last", false),
            ]
        );
    }

    #[test]
    fn test_whitespace_between_tools_is_skipped() {
        let blocks = parse("<toolA></toolA> \n <toolA></toolA>", &vocab());
        assert_eq!(blocks, vec![tool("toolA", &[], true), tool("toolA", &[], true)]);
    }

    #[test]
    fn test_trailing_tool_close_makes_last_block_complete() {
        let blocks = parse("<toolA><p1>v</p1></toolA>", &vocab());
        assert_eq!(blocks, vec![tool("toolA", &[("p1", "v")], true)]);
    }

    #[test]
    fn test_marker_split_across_chars_reassembles() {
        // The same buffer parsed whole must match what earlier, shorter
        // prefixes were converging to; the split points are irrelevant
        // because the parser only ever sees the full buffer.
        let full = "Hi <toolA><p1>v</p1></toolA> Bye";
        let whole = parse(full, &vocab());
        for k in 0..=full.len() {
            if !full.is_char_boundary(k) {
                continue;
            }
            let _ = parse(&full[..k], &vocab());
        }
        assert_eq!(whole, parse(full, &vocab()));
    }

    #[test]
    fn test_prefix_stability_of_completed_blocks() {
        let full = "one <toolA><p1>v</p1></toolA> two <toolB><content>a </content> b</content></toolB> three";
        let vocab = vocab();
        let complete_of = |buffer: &str| -> Vec<ContentBlock> {
            parse(buffer, &vocab)
                .into_iter()
                .filter(|b| b.is_complete())
                .collect()
        };
        let final_complete = complete_of(full);
        for k in 0..=full.len() {
            if !full.is_char_boundary(k) {
                continue;
            }
            let prefix_complete = complete_of(&full[..k]);
            assert!(
                prefix_complete.len() <= final_complete.len(),
                "completed blocks shrank at split {k}"
            );
            assert_eq!(
                prefix_complete,
                final_complete[..prefix_complete.len()],
                "completed blocks diverged at split {k}"
            );
        }
    }

    #[test]
    fn test_determinism() {
        let buffer = "x <toolA><p1>v</p1></toolA> y <toolX> z";
        assert_eq!(parse(buffer, &vocab()), parse(buffer, &vocab()));
    }

    #[test]
    fn test_totality_on_hostile_inputs() {
        let vocab = vocab();
        let inputs = [
            "<",
            ">",
            "</>",
            "<>",
            "<toolA>",
            "</toolA></toolA>",
            "<toolA><toolA>",
            "<toolA><p1><p2></p1></toolA>",
            "<p1>orphan</p1>",
            "né <toolA><p1>héllo…</p1></toolA> 日本語",
        ];
        for input in inputs {
            let _ = parse(input, &vocab);
        }
    }

    #[test]
    fn test_param_open_inside_value_stays_in_value() {
        // No nesting: a second parameter marker inside an open value is
        // just value text until the open parameter closes.
        let blocks = parse("<toolA><p1>x<p2>y</p1></toolA>", &vocab());
        assert_eq!(blocks, vec![tool("toolA", &[("p1", "x<p2>y")], true)]);
    }

    #[test]
    fn test_parameter_values_are_trimmed() {
        let blocks = parse("<toolA><p1>\n  spaced out \t</p1></toolA>", &vocab());
        assert_eq!(blocks, vec![tool("toolA", &[("p1", "spaced out")], true)]);
    }

    #[test]
    fn test_text_before_tool_is_trimmed_and_completed() {
        let blocks = parse("  padded  <toolA>", &vocab());
        assert_eq!(blocks, vec![text("padded", true), tool("toolA", &[], false)]);
    }

    #[test]
    fn test_verbatim_partial_tail_previews_best_guess() {
        let blocks = parse("<toolB><content>fn main() {", &vocab());
        assert_eq!(
            blocks,
            vec![tool("toolB", &[("content", "fn main() {")], false)]
        );
    }
}
