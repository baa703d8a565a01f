// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! A65000 assembler - main entry point.
//!
//! This module ties together the CPU-agnostic core with the A65000
//! instruction encoding. Assembly is a single forward pass over the
//! source: each line may define a label, carry a directive, or carry an
//! instruction. References to labels defined later in the source are
//! queued as patch sites and resolved after the pass.

pub mod cli;
mod directives;

use std::fs::{self, File};
use std::io::{self, BufWriter};

use clap::Parser;

use crate::a65000::{encoder, operand, table, OpcodeSize};
use crate::core::error::{AsmError, AsmRunError, AsmRunReport, Diagnostic, ErrorKind};
use crate::core::numeric::{fits_signed, fits_unsigned};
use crate::core::output::{write_hex_dump, write_rsx_file};
use crate::core::segment::Segment;
use crate::core::symbol_table::{PatchSite, PatchWidth, SymbolTable, SymbolTableResult};
use crate::core::text_utils::{is_identifier, is_space, split_comment};

use cli::{validate_cli, Cli};

// Re-export public types
pub use crate::core::error::{AsmRunError as RunError, AsmRunReport as RunReport};
pub use cli::VERSION;

/// Run the assembler with command-line arguments.
pub fn run() -> Result<AsmRunReport, AsmRunError> {
    let cli = Cli::parse();
    let config = validate_cli(&cli)?;

    let source = fs::read_to_string(&cli.infile).map_err(|err| {
        io_run_error(format!(
            "Could not load file '{}': {err}",
            cli.infile.display()
        ))
    })?;

    let mut assembler = Assembler::new();
    assembler.assemble_source(&source)?;

    let out_file = File::create(&config.out_path).map_err(|err| {
        io_run_error(format!(
            "Could not create '{}': {err}",
            config.out_path.display()
        ))
    })?;
    write_rsx_file(BufWriter::new(out_file), assembler.segments())
        .map_err(|err| io_run_error(format!("Write failed: {err}")))?;

    let stdout = io::stdout();
    if cli.dump {
        write_hex_dump(stdout.lock(), assembler.segments())
            .map_err(|err| io_run_error(format!("Write failed: {err}")))?;
    }
    if cli.symbols {
        assembler
            .symbols()
            .dump(stdout.lock())
            .map_err(|err| io_run_error(format!("Write failed: {err}")))?;
    }

    let total: usize = assembler.segments().iter().map(Segment::len).sum();
    Ok(AsmRunReport::new(Some(format!(
        "Assembled {} segment(s), {} bytes -> {}",
        assembler.segments().len(),
        total,
        config.out_path.display()
    ))))
}

fn io_run_error(message: String) -> AsmRunError {
    AsmRunError::new(
        AsmError::with_message(ErrorKind::Io, message),
        Vec::new(),
        Vec::new(),
    )
}

/// Assemble a source text into its segment list.
pub fn assemble(source: &str) -> Result<Vec<Segment>, AsmRunError> {
    let mut assembler = Assembler::new();
    assembler.assemble_source(source)?;
    Ok(assembler.into_segments())
}

#[derive(Debug, Default)]
pub struct Assembler {
    segments: Vec<Segment>,
    symbols: SymbolTable,
    pc: u32,
    line_number: u32,
}

impl Assembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[must_use]
    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }

    #[must_use]
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub(crate) fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    /// Assemble a complete source text, then resolve all deferred
    /// references. The first error aborts the run.
    pub fn assemble_source(&mut self, source: &str) -> Result<(), AsmRunError> {
        let source_lines: Vec<String> = source.lines().map(str::to_string).collect();

        for (idx, line) in source_lines.iter().enumerate() {
            self.line_number = idx as u32 + 1;
            if let Err(error) = self.process_line(line) {
                return Err(run_error(error, self.line_number, source_lines.clone()));
            }
        }

        if let Err((error, line)) = self.resolve_pending() {
            return Err(run_error(error, line, source_lines));
        }
        Ok(())
    }

    fn process_line(&mut self, line: &str) -> Result<(), AsmError> {
        let (code, _) = split_comment(line);
        if code.trim().is_empty() {
            return Ok(());
        }

        let code = self.take_label(code)?;
        let code = code.trim();
        if code.is_empty() {
            return Ok(());
        }

        if directives::process(self, code)? {
            return Ok(());
        }
        self.process_instruction(code)
    }

    /// Strip a leading `<id>:` label definition, recording it at the
    /// current program counter.
    fn take_label<'a>(&mut self, code: &'a str) -> Result<&'a str, AsmError> {
        let trimmed = code.trim_start();
        if let Some(colon) = trimmed.find(':') {
            let head = trimmed[..colon].trim_end();
            if is_identifier(head) {
                if self.symbols.define(head, self.pc) == SymbolTableResult::Duplicate {
                    return Err(AsmError::new(ErrorKind::DuplicateLabel, Some(head)));
                }
                return Ok(&trimmed[colon + 1..]);
            }
        }
        Ok(trimmed)
    }

    fn process_instruction(&mut self, code: &str) -> Result<(), AsmError> {
        let (head, operand_text) = match code.bytes().position(is_space) {
            Some(pos) => (&code[..pos], &code[pos + 1..]),
            None => (code, ""),
        };
        let (mnemonic, suffix) = match head.split_once('.') {
            Some((mnemonic, suffix)) => (mnemonic, suffix),
            None => (head, ""),
        };
        if mnemonic.is_empty() || !mnemonic.bytes().all(|c| c.is_ascii_alphabetic()) {
            return Err(AsmError::new(ErrorKind::SyntaxError, Some(code)));
        }

        let entry = table::lookup(mnemonic)
            .ok_or_else(|| AsmError::new(ErrorKind::InvalidMnemonic, Some(mnemonic)))?;
        let size = OpcodeSize::parse(&suffix.to_ascii_lowercase())?;
        if size != OpcodeSize::Dword && !entry.size_allowed {
            return Err(AsmError::new(
                ErrorKind::InvalidSizeSpecifier,
                Some(mnemonic),
            ));
        }

        let operands = operand::classify(operand_text)?;
        if self.segments.is_empty() {
            return Err(AsmError::new(ErrorKind::MissingSegment, None));
        }

        let encoded = encoder::encode(entry, size, &operands, &self.symbols, self.pc)?;
        for site in &encoded.refs {
            self.symbols.add_patch_site(
                &site.name,
                PatchSite {
                    address: self.pc + site.site_offset,
                    width: site.width,
                    is_relative: site.is_relative,
                    line: self.line_number,
                },
            );
        }

        let pc_step = encoded.bytes.len() as u32;
        let segment = self.active_segment()?;
        for &byte in &encoded.bytes {
            segment.add_byte(byte);
        }
        self.advance_pc(pc_step);
        Ok(())
    }

    /// Resolve every queued patch site against the final symbol table.
    fn resolve_pending(&mut self) -> Result<(), (AsmError, u32)> {
        for (name, sites) in self.symbols.take_pending() {
            let target = match self.symbols.lookup(&name) {
                Some(target) => target,
                None => {
                    let line = sites.first().map_or(0, |site| site.line);
                    return Err((AsmError::new(ErrorKind::UndefinedLabel, Some(&name)), line));
                }
            };
            for site in sites {
                self.patch_site(&name, target, &site)
                    .map_err(|error| (error, site.line))?;
            }
        }
        Ok(())
    }

    fn patch_site(&mut self, name: &str, target: u32, site: &PatchSite) -> Result<(), AsmError> {
        let segment = self
            .segments
            .iter_mut()
            .find(|segment| segment.contains(site.address))
            .ok_or_else(|| {
                AsmError::new(ErrorKind::InternalError, Some("patch site in no segment"))
            })?;

        if site.is_relative {
            // Site base is the instruction word; the displacement follows it.
            let value = target as i64 - site.address as i64 + 2;
            if !fits_signed(value, 16) {
                return Err(AsmError::new(ErrorKind::SymbolOutOfRange, Some(name)));
            }
            return segment.write_word(site.address + 2, value as u16);
        }

        if !fits_unsigned(target as i64, site.width.bits()) {
            return Err(AsmError::new(ErrorKind::SymbolOutOfRange, Some(name)));
        }
        match site.width {
            PatchWidth::Byte => segment.write_byte(site.address, target as u8),
            PatchWidth::Word => segment.write_word(site.address, target as u16),
            PatchWidth::Dword => segment.write_dword(site.address, target),
        }
    }

    // ---- emission context used by the directive handler ----

    /// Open a new segment at `base` and move the program counter there.
    pub(crate) fn open_segment(&mut self, base: u32) {
        self.segments.push(Segment::new(base));
        self.pc = base;
    }

    pub(crate) fn active_segment(&mut self) -> Result<&mut Segment, AsmError> {
        self.segments
            .last_mut()
            .ok_or_else(|| AsmError::new(ErrorKind::MissingSegment, None))
    }

    pub(crate) fn advance_pc(&mut self, bytes: u32) {
        self.pc = self.pc.wrapping_add(bytes);
        debug_assert!(
            self.segments
                .last()
                .map_or(true, |segment| segment.end() == self.pc),
            "program counter out of step with the active segment"
        );
    }

    /// Queue a data-directive reference to a not-yet-defined symbol at the
    /// current program counter.
    pub(crate) fn defer_data_reference(&mut self, name: &str, width: PatchWidth) {
        self.symbols.add_patch_site(
            name,
            PatchSite {
                address: self.pc,
                width,
                is_relative: false,
                line: self.line_number,
            },
        );
    }
}

fn run_error(error: AsmError, line: u32, source_lines: Vec<String>) -> AsmRunError {
    let diagnostic = Diagnostic::new(line, error.clone());
    AsmRunError::new(error, vec![diagnostic], source_lines)
}
