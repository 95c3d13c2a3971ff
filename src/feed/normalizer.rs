//! Cleanup of raw HTML entry bodies into display-ready content.
//!
//! Images are dropped, `<br>` tags become newlines, empty tag pairs are
//! removed, and newline runs are folded into [`PARAGRAPH_BREAK`] markers.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Separator emitted between paragraphs and between content fragments.
///
/// Never matched by the `<br>` rewrite: normalized text is a fixed point.
pub const PARAGRAPH_BREAK: &str = "<br class=\"paragraph\">";

static IMG_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<img\b[^>]*>(?:\s*</img\s*>)?").expect("valid regex"));

static BR_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid regex"));

static EMPTY_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<([A-Za-z][A-Za-z0-9]*)\b[^>]*>\s*</([A-Za-z][A-Za-z0-9]*)\s*>")
        .expect("valid regex")
});

/// Normalize every fragment and join them with [`PARAGRAPH_BREAK`].
///
/// Fragments that end up empty after cleaning are skipped.
pub fn normalize_content<I, S>(fragments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fragments
        .into_iter()
        .map(|fragment| normalize_fragment(fragment.as_ref()))
        .filter(|fragment| !fragment.is_empty())
        .collect::<Vec<_>>()
        .join(PARAGRAPH_BREAK)
}

/// Normalize a single content fragment.
pub fn normalize_fragment(raw: &str) -> String {
    let text = IMG_TAG.replace_all(raw, "");
    let text = BR_TAG.replace_all(&text, "\n");
    // Two passes catch pairs that only become empty once an inner pair is gone.
    let text = strip_empty_pairs(&text);
    let text = strip_empty_pairs(&text);
    collapse_newlines(text.trim())
}

fn strip_empty_pairs(text: &str) -> String {
    EMPTY_PAIR
        .replace_all(text, |caps: &Captures| {
            if caps[1].eq_ignore_ascii_case(&caps[2]) {
                String::new()
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

/// Fold newline runs into paragraph markers.
///
/// A lone newline becomes a marker unless it sits right after `</p>` or
/// right before `<p>`. Any run of two or more yields exactly one marker.
fn collapse_newlines(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len() + 16);
    let mut rest = text;
    let mut offset = 0;

    while let Some(start) = rest.find('\n') {
        out.push_str(&rest[..start]);

        let run = rest[start..].bytes().take_while(|&b| b == b'\n').count();
        let run_start = offset + start;
        let run_end = run_start + run;

        if run > 1 || !(closes_paragraph(bytes, run_start) || opens_paragraph(bytes, run_end)) {
            out.push_str(PARAGRAPH_BREAK);
        }

        rest = &rest[start + run..];
        offset = run_end;
    }

    out.push_str(rest);
    out
}

fn closes_paragraph(bytes: &[u8], end: usize) -> bool {
    end >= 4 && bytes[end - 4..end].eq_ignore_ascii_case(b"</p>")
}

fn opens_paragraph(bytes: &[u8], start: usize) -> bool {
    bytes.len() >= start + 3 && bytes[start..start + 3].eq_ignore_ascii_case(b"<p>")
}
