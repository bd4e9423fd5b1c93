//! Text normalisation: deterministic cleanup of the PDF text layer.
//!
//! PDFium separates lines with `\r\n` and hands back whatever invisible
//! characters the report generator embedded: soft hyphens inside words,
//! zero-width spaces between table cells, a BOM at the start of the page.
//! None of them are visible in the PDF, but each one can split a test name
//! or a number so the line rule stops matching.
//!
//! Rules (applied in order):
//! 1. Normalise line endings (CRLF / CR → LF)
//! 2. Remove invisible Unicode characters
//! 3. Trim trailing whitespace per line
//!
//! Interior whitespace is left alone; the line rules tolerate it.

/// Apply all normalisation rules to raw page text.
pub fn normalise_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    trim_trailing_whitespace(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_remove_invisible() {
        let input = "Hemo\u{00AD}globin\u{200B} 11.0\u{FEFF}";
        assert_eq!(remove_invisible_chars(input), "Hemoglobin 11.0");
    }

    #[test]
    fn test_trim_trailing_whitespace() {
        assert_eq!(
            trim_trailing_whitespace("  Hemoglobin   \nWBC  "),
            "  Hemoglobin\nWBC"
        );
    }

    #[test]
    fn test_soft_hyphen_no_longer_splits_name() {
        let raw = "Trigly\u{00AD}ceride 160 mg/dL 0-150\r\n";
        assert_eq!(normalise_text(raw), "Triglyceride 160 mg/dL 0-150");
    }

    #[test]
    fn test_empty_stays_empty() {
        assert_eq!(normalise_text(""), "");
        assert!(normalise_text(" \r\n \u{200B}\r\n").trim().is_empty());
    }
}
