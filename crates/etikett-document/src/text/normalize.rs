// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text normalization — cleanup of extracted PDF text and of scanned
// identifier strings. Control characters show up routinely in both: PDF text
// extraction leaks them depending on platform and font, and DataMatrix/GS1
// scanners emit them as field separators.

/// Normalize extracted page text for pattern matching.
///
/// Every character with code point < 32 (except `\n`) or equal to 127 becomes
/// a single space. Newlines are preserved so line-anchored pattern context
/// survives. Total — any input yields a valid string, empty in yields empty
/// out.
pub fn normalize_text(raw: &str) -> String {
    raw.chars()
        .map(|ch| {
            if ch == '\n' || (ch as u32 >= 32 && ch as u32 != 127) {
                ch
            } else {
                ' '
            }
        })
        .collect()
}

/// Normalize an identifier string for storage and comparison.
///
/// Uppercases, trims leading/trailing whitespace, and strips every character
/// with code point < 32 or equal to 127. This is the single source of truth
/// for whether two identifier strings are considered the same — it is applied
/// both when a key is stored and when a scanned value is resolved.
pub fn normalize_identifier(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|ch| *ch as u32 >= 32 && *ch as u32 != 127)
        .flat_map(char::to_uppercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_control_chars_become_spaces() {
        assert_eq!(normalize_text("A\u{1d}B\u{0}C"), "A B C");
        assert_eq!(normalize_text("DEL\u{7f}X"), "DEL X");
    }

    #[test]
    fn text_newlines_survive() {
        assert_eq!(normalize_text("line1\nline2\tend"), "line1\nline2 end");
    }

    #[test]
    fn text_empty_is_empty() {
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn identifier_uppercase_trim_strip() {
        assert_eq!(normalize_identifier("  ab123\u{1d}456  "), "AB123456");
        assert_eq!(normalize_identifier("\u{1e}sn-01\u{7f}"), "SN-01");
    }

    #[test]
    fn identifier_already_normal_is_unchanged() {
        assert_eq!(normalize_identifier("AB1234567890"), "AB1234567890");
    }

    #[test]
    fn identifier_of_only_controls_is_empty() {
        assert_eq!(normalize_identifier("\u{1}\u{2}\u{3}"), "");
    }
}
