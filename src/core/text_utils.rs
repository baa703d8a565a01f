// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Shared text utilities for line decomposition and operand scanning.

/// Check if a byte starts an identifier (letter or underscore).
#[inline]
pub fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

/// Check if a byte continues an identifier.
#[inline]
pub fn is_ident_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

/// Check if a byte is whitespace (space or tab).
#[inline]
pub fn is_space(c: u8) -> bool {
    c == b' ' || c == b'\t'
}

/// True when the whole string is an identifier.
pub fn is_identifier(s: &str) -> bool {
    let bytes = s.as_bytes();
    match bytes.first() {
        Some(&c) if is_ident_start(c) => bytes[1..].iter().all(|&c| is_ident_char(c)),
        _ => false,
    }
}

/// Split a line into code and comment parts at the first unquoted semicolon.
///
/// String literal bodies (double quotes) may contain semicolons.
pub fn split_comment(line: &str) -> (&str, &str) {
    let bytes = line.as_bytes();
    let mut in_string = false;
    for (idx, &c) in bytes.iter().enumerate() {
        match c {
            b'"' => in_string = !in_string,
            b';' if !in_string => return (&line[..idx], &line[idx..]),
            _ => {}
        }
    }
    (line, "")
}

/// True for lines that contribute nothing: blank or comment-only.
pub fn is_comment_line(line: &str) -> bool {
    let (code, _) = split_comment(line);
    code.trim().is_empty()
}

/// Split a diadic operand string at the first top-level comma.
///
/// Commas never occur inside `[...]` groups in this grammar, so a plain
/// byte scan is enough; the comma is still skipped inside brackets to keep
/// malformed input pointed at the classifier rather than silently split.
pub fn split_operands(operand: &str) -> Option<(&str, &str)> {
    let bytes = operand.as_bytes();
    let mut depth = 0usize;
    for (idx, &c) in bytes.iter().enumerate() {
        match c {
            b'[' => depth += 1,
            b']' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => return Some((&operand[..idx], &operand[idx + 1..])),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_rules() {
        assert!(is_identifier("loop"));
        assert!(is_identifier("_tmp0"));
        assert!(!is_identifier("0loop"));
        assert!(!is_identifier("lo-op"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn comment_split_respects_strings() {
        let (code, comment) = split_comment(".text \"a;b\" ; real comment");
        assert_eq!(code, ".text \"a;b\" ");
        assert_eq!(comment, "; real comment");
    }

    #[test]
    fn comment_only_lines() {
        assert!(is_comment_line(""));
        assert!(is_comment_line("   "));
        assert!(is_comment_line("  ; note"));
        assert!(!is_comment_line("  nop ; note"));
    }

    #[test]
    fn operand_split_at_top_level_comma() {
        assert_eq!(split_operands("r0, r1"), Some(("r0", " r1")));
        assert_eq!(split_operands("[r0 + 4], r1"), Some(("[r0 + 4]", " r1")));
        assert_eq!(split_operands("[r0]"), None);
    }
}
