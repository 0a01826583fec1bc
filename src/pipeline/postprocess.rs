//! Post-processing: deterministic cleanup of model-generated HTML.
//!
//! The prompt asks for a bare body fragment, but models still wrap their
//! answer in ```` ```html ```` fences, emit a full `<html>` document, or use
//! CRLF line endings. The fragment is embedded verbatim in the render
//! template, so any of these would end up as literal text or nested
//! documents in the rendered pages. Each rule below is a pure `&str → String`
//! pass; content inside the fragment is never rewritten.
//!
//! ## Rule Order
//!
//! Fences go first so the document-tag rules see the markup itself.
//! Line endings are normalised before anything that matches on `\n`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to the raw model output.
///
/// Rules (applied in order):
/// 1. Strip outer code fences (```` ```html ````, ```` ``` ````)
/// 2. Normalise line endings (CRLF → LF)
/// 3. Remove `<!DOCTYPE>`, `<html>`, `<head>…</head>` and `<body>` wrappers
/// 4. Remove `<script>` blocks
/// 5. Strip invisible Unicode (zero-width spaces, BOM)
/// 6. Trim trailing whitespace per line and collapse runs of blank lines
/// 7. Ensure the fragment ends with exactly one newline
///
/// Empty (or whitespace-only) input yields an empty string.
pub fn clean_markup(input: &str) -> String {
    if input.trim().is_empty() {
        return String::new();
    }
    let s = strip_code_fences(input);
    let s = normalise_line_endings(&s);
    let s = remove_document_wrappers(&s);
    let s = remove_scripts(&s);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    ensure_final_newline(&s)
}

// ── Rule 1: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\r?\n(.*?)\r?\n?```\s*$").unwrap());

fn strip_code_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Remove document wrappers ─────────────────────────────────────────

static RE_DOCTYPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<!DOCTYPE[^>]*>").unwrap());
static RE_HEAD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<head\b[^>]*>.*?</head\s*>").unwrap());
static RE_WRAPPER_TAGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</?(?:html|body)\b[^>]*>").unwrap());

fn remove_document_wrappers(input: &str) -> String {
    let s = RE_DOCTYPE.replace_all(input, "");
    let s = RE_HEAD.replace_all(&s, "");
    RE_WRAPPER_TAGS.replace_all(&s, "").into_owned()
}

// ── Rule 4: Remove scripts ───────────────────────────────────────────────────

static RE_SCRIPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap());

fn remove_scripts(input: &str) -> String {
    RE_SCRIPT.replace_all(input, "").into_owned()
}

// ── Rule 5: Strip invisible characters ───────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}'))
        .collect()
}

// ── Rule 6: Whitespace ───────────────────────────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").into_owned()
}

// ── Rule 7: Final newline ────────────────────────────────────────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}\n", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_fragment_is_kept() {
        assert_eq!(
            clean_markup("<h1>Title</h1>\n<p>Body</p>"),
            "<h1>Title</h1>\n<p>Body</p>\n"
        );
    }

    #[test]
    fn strips_html_fence() {
        let raw = "```html\n<h1>Report</h1>\n<p>Text</p>\n```";
        assert_eq!(clean_markup(raw), "<h1>Report</h1>\n<p>Text</p>\n");
    }

    #[test]
    fn strips_bare_fence_with_crlf() {
        let raw = "```\r\n<p>a</p>\r\n<p>b</p>\r\n```\r\n";
        assert_eq!(clean_markup(raw), "<p>a</p>\n<p>b</p>\n");
    }

    #[test]
    fn removes_full_document_shell() {
        let raw = "<!DOCTYPE html>\n<html lang=\"en\">\n<head><title>x</title>\n<style>p{}</style></head>\n<body class=\"main\">\n<p>Kept</p>\n</body>\n</html>";
        assert_eq!(clean_markup(raw), "<p>Kept</p>\n");
    }

    #[test]
    fn removes_scripts() {
        let raw = "<p>a</p><SCRIPT type=\"text/javascript\">alert(1)\n</script><p>b</p>";
        assert_eq!(clean_markup(raw), "<p>a</p><p>b</p>\n");
    }

    #[test]
    fn collapses_blank_lines_and_invisible_chars() {
        let raw = "<p>a</p>   \n\n\n\n<p>\u{200B}b\u{FEFF}</p>";
        assert_eq!(clean_markup(raw), "<p>a</p>\n\n<p>b</p>\n");
    }

    #[test]
    fn heading_like_text_survives() {
        // `<header>` and `<bodytext>` are not the wrappers we strip.
        let raw = "<header>Top</header><bodytext>x</bodytext>";
        assert_eq!(clean_markup(raw), "<header>Top</header><bodytext>x</bodytext>\n");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(clean_markup(""), "");
        assert_eq!(clean_markup(" \n\t"), "");
        assert_eq!(clean_markup("<html><body></body></html>"), "");
    }
}
