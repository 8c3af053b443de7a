//! Post-processing: deterministic cleanup of model output.
//!
//! Summaries are joined with paragraph breaks and re-chunked on the next
//! reduction pass, so every summary must be a tidy block of text: no outer
//! code fences, LF line endings, no trailing blanks, no invisible characters.
//! Analysis responses additionally need the JSON object dug out of whatever
//! prose or fences the model wrapped around it.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all summary cleanup rules, in order:
///
/// 1. Strip outer markdown fences
/// 2. Normalise line endings (CRLF → LF)
/// 3. Trim trailing whitespace per line
/// 4. Collapse runs of blank lines to a single blank line
/// 5. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 6. Trim leading/trailing whitespace
pub fn clean_summary(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = strip_outer_fences(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    s.trim().to_string()
}

/// Extract the JSON object from a model response.
///
/// Prefers a ```` ```json ```` fenced block, then any fenced block, then the
/// span from the first `{` to the last `}`. Returns the trimmed input when
/// none of these apply so the caller's parser reports a useful error.
pub fn extract_json(response: &str) -> &str {
    if let Some(caps) = RE_JSON_FENCE.captures(response) {
        if let Some(body) = caps.get(1) {
            return body.as_str().trim();
        }
    }
    if let Some(caps) = RE_ANY_FENCE.captures(response) {
        if let Some(body) = caps.get(1) {
            return body.as_str().trim();
        }
    }
    match (response.find('{'), response.rfind('}')) {
        (Some(start), Some(end)) if start < end => &response[start..=end],
        _ => response.trim(),
    }
}

// ── Rule 1: Strip outer markdown fences ──────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\n(.*)\n```\s*$").unwrap());

static RE_JSON_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```json\s*(.*?)```").unwrap());

static RE_ANY_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)```").unwrap());

fn strip_outer_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Collapse blank-line runs ─────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").into_owned()
}

// ── Rule 5: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Tests ────────────────────────────────────────────────────────────────────
