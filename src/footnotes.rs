//! Footnote rendering for summaries.
//!
//! Appends a `References:` section mapping each `[n]` marker in the summary
//! text back to the source URL of the n-th corpus item, and parses that
//! section back out of formatted text.

use crate::models::Reference;

const SECTION_MARKER: &str = "\n\nReferences:\n";

/// Append a references section to a summary. Each line is `[i] url` where
/// `i` is the item's 1-based corpus position. Items with an empty URL are
/// skipped without renumbering the rest, so the labels always line up with
/// the `[n]` markers the model was shown.
pub fn format_with_footnotes(summary: &str, references: &[Reference]) -> String {
    let lines: Vec<String> = references
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.url.is_empty())
        .map(|(i, r)| format!("[{}] {}", i + 1, r.url))
        .collect();

    if lines.is_empty() {
        return summary.to_string();
    }

    format!("{summary}{SECTION_MARKER}{}", lines.join("\n"))
}

/// Parse the `References:` section of formatted output back into ordered
/// `(position, url)` pairs. Text without a references section yields an
/// empty list. Inverse of [`format_with_footnotes`] for every item that
/// carried a URL.
pub fn extract_references(text: &str) -> Vec<(usize, String)> {
    let Some(pos) = text.rfind(SECTION_MARKER) else {
        return Vec::new();
    };
    text[pos + SECTION_MARKER.len()..]
        .lines()
        .filter_map(|line| {
            let rest = line.strip_prefix('[')?;
            let (position, url) = rest.split_once("] ")?;
            Some((position.parse().ok()?, url.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(urls: &[&str]) -> Vec<Reference> {
        urls.iter()
            .enumerate()
            .map(|(i, url)| Reference {
                label: (i + 1).to_string(),
                url: url.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_footnotes_numbered_by_position() {
        let out = format_with_footnotes(
            "Summary [1] and [2].",
            &refs(&["https://a.example/1", "https://a.example/2"]),
        );
        assert_eq!(
            out,
            "Summary [1] and [2].\n\nReferences:\n[1] https://a.example/1\n[2] https://a.example/2"
        );
    }

    #[test]
    fn test_empty_urls_skipped_without_renumbering() {
        let out = format_with_footnotes(
            "s",
            &refs(&["https://a.example/1", "", "https://a.example/3"]),
        );
        // Position 2 is absent but position 3 keeps its number.
        assert_eq!(
            out,
            "s\n\nReferences:\n[1] https://a.example/1\n[3] https://a.example/3"
        );
    }

    #[test]
    fn test_no_usable_references_leaves_summary_alone() {
        assert_eq!(format_with_footnotes("s", &refs(&["", ""])), "s");
        assert_eq!(format_with_footnotes("s", &[]), "s");
    }

    #[test]
    fn test_format_extract_round_trip() {
        let references = refs(&[
            "https://a.example/1",
            "https://a.example/2",
            "https://a.example/3",
        ]);
        let out = format_with_footnotes("Summary citing [1] and [3].", &references);

        let expected: Vec<(usize, String)> = references
            .iter()
            .enumerate()
            .map(|(i, r)| (i + 1, r.url.clone()))
            .collect();
        assert_eq!(extract_references(&out), expected);
    }

    #[test]
    fn test_round_trip_preserves_positions_across_gaps() {
        let references = refs(&["https://a.example/1", "", "https://a.example/3", ""]);
        let out = format_with_footnotes("s", &references);

        assert_eq!(
            extract_references(&out),
            vec![
                (1, "https://a.example/1".to_string()),
                (3, "https://a.example/3".to_string()),
            ]
        );
    }

    #[test]
    fn test_extract_without_section_is_empty() {
        assert_eq!(extract_references("just prose, no footnotes"), Vec::new());
        assert_eq!(extract_references(""), Vec::new());
    }

    #[test]
    fn test_extract_uses_last_section_and_skips_malformed_lines() {
        // A summary that itself quotes a references block must not confuse
        // extraction of the appended one.
        let out = format_with_footnotes(
            "quoting:\n\nReferences:\n[9] https://stale.example/",
            &refs(&["https://a.example/1"]),
        );
        assert_eq!(
            extract_references(&out),
            vec![(1, "https://a.example/1".to_string())]
        );

        let mangled = "s\n\nReferences:\n[1] https://a.example/1\nnot a line\n[x] bad index";
        assert_eq!(
            extract_references(mangled),
            vec![(1, "https://a.example/1".to_string())]
        );
    }
}
