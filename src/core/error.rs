// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Error types, diagnostics, and reporting for the assembler.

use std::fmt;

/// Categories of assembler errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    SyntaxError,
    InvalidMnemonic,
    InvalidRegister,
    InvalidOperands,
    InvalidAddressingMode,
    InvalidSizeSpecifier,
    InvalidNumberFormat,
    ValueOutOfRange,
    SymbolOutOfRange,
    DuplicateLabel,
    UndefinedLabel,
    MissingSegment,
    Cli,
    Io,
    InternalError,
}

impl ErrorKind {
    fn describe(self) -> &'static str {
        match self {
            ErrorKind::SyntaxError => "Syntax error",
            ErrorKind::InvalidMnemonic => "Invalid mnemonic",
            ErrorKind::InvalidRegister => "Invalid register specified",
            ErrorKind::InvalidOperands => "Invalid operand",
            ErrorKind::InvalidAddressingMode => "Invalid addressing mode",
            ErrorKind::InvalidSizeSpecifier => "Invalid size specifier",
            ErrorKind::InvalidNumberFormat => "Invalid number format",
            ErrorKind::ValueOutOfRange => "Value exceeding 32 bit range",
            ErrorKind::SymbolOutOfRange => "Symbol out of range for specified size",
            ErrorKind::DuplicateLabel => "Label already defined",
            ErrorKind::UndefinedLabel => "Undefined label",
            ErrorKind::MissingSegment => "A .pc directive must precede code or data",
            ErrorKind::Cli => "Invalid command line",
            ErrorKind::Io => "I/O error",
            ErrorKind::InternalError => "Internal error",
        }
    }
}

/// An assembler error with a kind and message.
#[derive(Debug, Clone)]
pub struct AsmError {
    kind: ErrorKind,
    message: String,
}

impl AsmError {
    pub fn new(kind: ErrorKind, param: Option<&str>) -> Self {
        Self {
            kind,
            message: format_error(kind.describe(), param),
        }
    }

    /// Error with a fully custom message, keeping the kind for callers
    /// that match on it.
    pub fn with_message(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AsmError {}

/// A diagnostic message with location and context.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub(crate) line: u32,
    pub(crate) column: Option<usize>,
    pub(crate) error: AsmError,
    pub(crate) source: Option<String>,
}

impl Diagnostic {
    pub fn new(line: u32, error: AsmError) -> Self {
        Self {
            line,
            column: None,
            error,
            source: None,
        }
    }

    pub fn with_column(mut self, column: Option<usize>) -> Self {
        self.column = column;
        self
    }

    pub fn with_source(mut self, source: Option<String>) -> Self {
        self.source = source;
        self
    }

    pub fn error(&self) -> &AsmError {
        &self.error
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn format(&self) -> String {
        format!(
            "Assembly error in line {}: \"{}\"",
            self.line,
            self.error.message()
        )
    }

    pub fn format_with_context(&self, lines: Option<&[String]>, use_color: bool) -> String {
        let mut out = String::new();
        out.push_str(&self.format());
        out.push('\n');
        for line in build_context_lines(
            self.line,
            self.column,
            lines,
            self.source.as_deref(),
            use_color,
        ) {
            out.push_str(&line);
            out.push('\n');
        }
        out.pop();
        out
    }
}

/// Report from a successful assembly run.
#[derive(Debug, Default)]
pub struct AsmRunReport {
    summary: Option<String>,
}

impl AsmRunReport {
    pub fn new(summary: Option<String>) -> Self {
        Self { summary }
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }
}

/// Error from a failed assembly run.
#[derive(Debug)]
pub struct AsmRunError {
    error: AsmError,
    diagnostics: Vec<Diagnostic>,
    source_lines: Vec<String>,
}

impl AsmRunError {
    pub fn new(error: AsmError, diagnostics: Vec<Diagnostic>, source_lines: Vec<String>) -> Self {
        Self {
            error,
            diagnostics,
            source_lines,
        }
    }

    pub fn error(&self) -> &AsmError {
        &self.error
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn source_lines(&self) -> &[String] {
        &self.source_lines
    }
}

impl fmt::Display for AsmRunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for AsmRunError {}

/// Build context lines for error display.
pub fn build_context_lines(
    line_num: u32,
    column: Option<usize>,
    lines: Option<&[String]>,
    source_override: Option<&str>,
    use_color: bool,
) -> Vec<String> {
    let mut out = Vec::new();
    let line_idx = line_num.saturating_sub(1) as usize;

    if let Some(source) = source_override {
        out.push(format!(
            "{:>5} | {}",
            line_num,
            highlight_line(source, column, use_color)
        ));
        return out;
    }

    let lines = match lines {
        Some(lines) if !lines.is_empty() => lines,
        _ => {
            out.push(format!("{:>5} | <source unavailable>", line_num));
            return out;
        }
    };

    if line_idx >= lines.len() {
        out.push(format!("{:>5} | <source unavailable>", line_num));
        return out;
    }

    out.push(format!(
        "{:>5} | {}",
        line_num,
        highlight_line(&lines[line_idx], column, use_color)
    ));
    out
}

fn highlight_line(line: &str, column: Option<usize>, use_color: bool) -> String {
    match column {
        Some(col) if col > 0 => {
            let idx = col - 1;
            if idx >= line.len() {
                if use_color {
                    return format!("{line}\x1b[31m^\x1b[0m");
                }
                return format!("{line}^");
            }
            let (head, tail) = line.split_at(idx);
            let ch = tail.chars().next().unwrap_or(' ');
            let rest = &tail[ch.len_utf8()..];
            if use_color {
                format!("{head}\x1b[31m{ch}\x1b[0m{rest}")
            } else {
                format!("{head}{ch}{rest}")
            }
        }
        _ => line.to_string(),
    }
}

/// Format an error message with an optional parameter.
pub fn format_error(msg: &str, param: Option<&str>) -> String {
    match param {
        Some(p) => format!("{msg}: {p}"),
        None => msg.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_format_matches_cli_contract() {
        let err = AsmError::new(ErrorKind::DuplicateLabel, Some("loop"));
        let diag = Diagnostic::new(12, err);
        assert_eq!(
            diag.format(),
            "Assembly error in line 12: \"Label already defined: loop\""
        );
    }

    #[test]
    fn context_rendering_falls_back_without_source() {
        let err = AsmError::new(ErrorKind::SyntaxError, None);
        let diag = Diagnostic::new(3, err);
        let text = diag.format_with_context(None, false);
        assert!(text.contains("<source unavailable>"));
    }

    #[test]
    fn context_rendering_uses_source_line() {
        let err = AsmError::new(ErrorKind::InvalidMnemonic, Some("wob"));
        let diag = Diagnostic::new(1, err);
        let lines = vec!["  wob r0".to_string()];
        let text = diag.format_with_context(Some(&lines), false);
        assert!(text.contains("    1 |   wob r0"));
    }
}
