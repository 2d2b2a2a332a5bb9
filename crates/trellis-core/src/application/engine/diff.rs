//! Line diffs and content sniffing for previews.

use similar::{ChangeTag, TextDiff};

use crate::domain::{DiffHunk, DiffLine, DiffLineType};

/// Bytes inspected by [`is_binary_content`].
pub const BINARY_SAMPLE_BYTES: usize = 8192;

const CONTEXT_LINES: usize = 3;

/// `true` when the leading sample holds a NUL byte or more than 10%
/// control characters (tabs and line breaks excluded).
pub fn is_binary_content(bytes: &[u8]) -> bool {
    let sample = &bytes[..bytes.len().min(BINARY_SAMPLE_BYTES)];
    if sample.is_empty() {
        return false;
    }
    if sample.contains(&0) {
        return true;
    }
    let control = sample
        .iter()
        .filter(|&&b| b < 0x20 && !matches!(b, b'\n' | b'\r' | b'\t' | 0x0c))
        .count();
    control * 10 > sample.len()
}

/// Cap `text` at `max` characters, marking the cut.
pub fn truncate_content(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}\n... (truncated)", &text[..cut]),
        None => text.to_string(),
    }
}

/// Unified-style hunks between `old` and `new`, with three lines of
/// context. At most `max_lines` lines are emitted across all hunks; the
/// rest is replaced by a single `truncated` line.
pub fn compute_hunks(old: &str, new: &str, max_lines: usize) -> Vec<DiffHunk> {
    let diff = TextDiff::from_lines(old, new);
    let mut hunks = Vec::new();
    let mut emitted = 0usize;

    for group in diff.grouped_ops(CONTEXT_LINES) {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        let old_range = first.old_range().start..last.old_range().end;
        let new_range = first.new_range().start..last.new_range().end;
        let mut hunk = DiffHunk {
            old_start: old_range.start + 1,
            old_count: old_range.len(),
            new_start: new_range.start + 1,
            new_count: new_range.len(),
            lines: Vec::new(),
        };

        for op in &group {
            for change in diff.iter_changes(op) {
                if emitted == max_lines {
                    hunk.lines.push(DiffLine {
                        line_type: DiffLineType::Truncated,
                        content: format!("... (diff truncated after {} lines)", max_lines),
                    });
                    hunks.push(hunk);
                    return hunks;
                }
                let line_type = match change.tag() {
                    ChangeTag::Delete => DiffLineType::Remove,
                    ChangeTag::Insert => DiffLineType::Add,
                    ChangeTag::Equal => DiffLineType::Context,
                };
                hunk.lines.push(DiffLine {
                    line_type,
                    content: change.value().trim_end_matches(['\n', '\r']).to_string(),
                });
                emitted += 1;
            }
        }
        hunks.push(hunk);
    }
    hunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_sniffing() {
        assert!(!is_binary_content(b""));
        assert!(!is_binary_content(b"hello\nworld\t!\r\n"));
        assert!(is_binary_content(b"PK\x03\x04\x00\x00"));
        assert!(is_binary_content(&[0x01; 64]));
        // A few stray control bytes in a long text are tolerated.
        let mut text = vec![b'a'; 100];
        text[10] = 0x1b;
        assert!(!is_binary_content(&text));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_content("héllo", 10), "héllo");
        assert_eq!(truncate_content("héllo", 2), "hé\n... (truncated)");
    }

    #[test]
    fn single_changed_line() {
        let hunks = compute_hunks("a\nb\nc\n", "a\nB\nc\n", 1000);
        assert_eq!(hunks.len(), 1);
        let hunk = &hunks[0];
        assert_eq!((hunk.old_start, hunk.old_count), (1, 3));
        assert_eq!((hunk.new_start, hunk.new_count), (1, 3));
        let kinds: Vec<_> = hunk.lines.iter().map(|l| l.line_type).collect();
        assert_eq!(
            kinds,
            vec![
                DiffLineType::Context,
                DiffLineType::Remove,
                DiffLineType::Add,
                DiffLineType::Context
            ]
        );
        assert_eq!(hunk.lines[1].content, "b");
        assert_eq!(hunk.lines[2].content, "B");
    }

    #[test]
    fn identical_text_has_no_hunks() {
        assert!(compute_hunks("same\n", "same\n", 1000).is_empty());
    }

    #[test]
    fn long_diffs_are_truncated() {
        let old: String = (0..50).map(|i| format!("old {i}\n")).collect();
        let new: String = (0..50).map(|i| format!("new {i}\n")).collect();
        let hunks = compute_hunks(&old, &new, 10);
        let lines: Vec<_> = hunks.iter().flat_map(|h| &h.lines).collect();
        assert_eq!(lines.len(), 11);
        assert_eq!(lines[10].line_type, DiffLineType::Truncated);
    }
}
