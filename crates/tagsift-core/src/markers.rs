//! Marker construction and suffix-matching helpers.
//!
//! The parser decides everything by asking whether the text scanned so far
//! ends with some vocabulary marker. These helpers do that byte-wise, so a
//! buffer truncated in the middle of a multi-byte character never trips a
//! slice on a non-boundary.

/// The opening marker for a name: `<name>`.
pub fn open_marker(name: &str) -> String {
    format!("<{name}>")
}

/// The closing marker for a name: `</name>`.
pub fn close_marker(name: &str) -> String {
    format!("</{name}>")
}

/// Does `seen` end with the opening marker `<name>`?
pub fn ends_with_open_marker(seen: &str, name: &str) -> bool {
    let seen = seen.as_bytes();
    let name = name.as_bytes();
    let marker_len = name.len() + 2;
    seen.len() >= marker_len
        && seen[seen.len() - marker_len] == b'<'
        && &seen[seen.len() - marker_len + 1..seen.len() - 1] == name
        && seen[seen.len() - 1] == b'>'
}

/// Does `seen` end with the closing marker `</name>`?
pub fn ends_with_close_marker(seen: &str, name: &str) -> bool {
    let seen = seen.as_bytes();
    let name = name.as_bytes();
    let marker_len = name.len() + 3;
    seen.len() >= marker_len
        && &seen[seen.len() - marker_len..seen.len() - marker_len + 2] == b"</"
        && &seen[seen.len() - marker_len + 2..seen.len() - 1] == name
        && seen[seen.len() - 1] == b'>'
}

/// The first name whose opening marker `seen` ends with.
///
/// Names are tested in the caller's iteration order; under the vocabulary
/// contract at most one can match, and on the unexpected tie the first one
/// in that fixed order wins.
pub fn match_open_marker<'a, I>(seen: &str, names: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .find(|name| ends_with_open_marker(seen, name))
}

/// Drop a trailing proper prefix of `marker` from `text`.
///
/// Used for provisional parameter values, so a half-received close tag at
/// the end of the buffer is held back instead of leaking into the value.
pub fn strip_partial_marker<'a>(text: &'a str, marker: &str) -> &'a str {
    let text_bytes = text.as_bytes();
    let marker_bytes = marker.as_bytes();
    let longest = marker_bytes.len().saturating_sub(1).min(text_bytes.len());
    for len in (1..=longest).rev() {
        if text_bytes[text_bytes.len() - len..] == marker_bytes[..len] {
            return &text[..text.len() - len];
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_construction() {
        assert_eq!(open_marker("shell"), "<shell>");
        assert_eq!(close_marker("shell"), "</shell>");
    }

    #[test]
    fn test_ends_with_open_marker() {
        assert!(ends_with_open_marker("hi <shell>", "shell"));
        assert!(ends_with_open_marker("<shell>", "shell"));
        assert!(!ends_with_open_marker("</shell>", "shell"));
        assert!(!ends_with_open_marker("<shell", "shell"));
        assert!(!ends_with_open_marker("<shelly>", "shell"));
        assert!(!ends_with_open_marker("ell>", "shell"));
    }

    #[test]
    fn test_ends_with_close_marker() {
        assert!(ends_with_close_marker("v</p1>", "p1"));
        assert!(ends_with_close_marker("</p1>", "p1"));
        assert!(!ends_with_close_marker("<p1>", "p1"));
        assert!(!ends_with_close_marker("</p1", "p1"));
        assert!(!ends_with_close_marker("1>", "p1"));
    }

    #[test]
    fn test_suffix_checks_survive_multibyte_tails() {
        // A non-ASCII tail must not panic the byte-wise comparisons.
        assert!(!ends_with_open_marker("héllo…", "shell"));
        assert!(!ends_with_close_marker("héllo…", "shell"));
        assert!(ends_with_open_marker("héllo <shell>", "shell"));
    }

    #[test]
    fn test_match_open_marker_fixed_order() {
        let names = ["alpha", "beta"];
        assert_eq!(match_open_marker("x <beta>", names), Some("beta"));
        assert_eq!(match_open_marker("x <alpha>", names), Some("alpha"));
        assert_eq!(match_open_marker("x <gamma>", names), None);
    }

    #[test]
    fn test_strip_partial_marker() {
        assert_eq!(strip_partial_marker("v</p", "</p1>"), "v");
        assert_eq!(strip_partial_marker("v<", "</p1>"), "v");
        assert_eq!(strip_partial_marker("v</p1", "</p1>"), "v");
        // A full marker is not a proper prefix; it is the caller's job to
        // have matched it already.
        assert_eq!(strip_partial_marker("v</p1>", "</p1>"), "v</p1>");
        assert_eq!(strip_partial_marker("value", "</p1>"), "value");
        assert_eq!(strip_partial_marker("", "</p1>"), "");
    }
}
