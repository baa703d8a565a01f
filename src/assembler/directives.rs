// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Assembler directives.
//!
//! `.pc` opens segments, `.def` feeds the symbol table, and the data
//! directives emit into the active segment. Directive keywords match
//! case-insensitively; only `.text`/`.textz` string bodies keep their
//! original case.

use super::Assembler;
use crate::core::error::{AsmError, ErrorKind};
use crate::core::numeric::{fits_unsigned, fits_width, parse_literal};
use crate::core::symbol_table::{PatchWidth, SymbolTableResult};
use crate::core::text_utils::is_identifier;

/// Dispatch a directive line (post label strip, comment removed).
///
/// Returns `Ok(false)` when the line carries no directive, so the driver
/// hands it to the instruction pipeline.
pub fn process(asm: &mut Assembler, text: &str) -> Result<bool, AsmError> {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix('.') else {
        return Ok(false);
    };

    let keyword_end = rest
        .bytes()
        .position(|c| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    let (keyword, args) = rest.split_at(keyword_end);

    match keyword.to_ascii_lowercase().as_str() {
        "pc" => set_pc(asm, args),
        "def" => define(asm, args),
        "text" => emit_text(asm, args, false),
        "textz" => emit_text(asm, args, true),
        "byte" => emit_data(asm, args, PatchWidth::Byte),
        "word" => emit_data(asm, args, PatchWidth::Word),
        "dword" => emit_data(asm, args, PatchWidth::Dword),
        _ => Err(AsmError::with_message(
            ErrorKind::SyntaxError,
            format!("Unrecognized directive: .{keyword}"),
        )),
    }?;
    Ok(true)
}

/// `.pc = <number>`: open a new segment anchored at the given address.
fn set_pc(asm: &mut Assembler, args: &str) -> Result<(), AsmError> {
    let value = args
        .trim()
        .strip_prefix('=')
        .ok_or_else(|| {
            AsmError::with_message(
                ErrorKind::SyntaxError,
                "No valid value found for .pc directive",
            )
        })?
        .trim();
    let addr = parse_literal(value)?;
    if !fits_unsigned(addr, 32) {
        return Err(AsmError::new(ErrorKind::ValueOutOfRange, Some(value)));
    }
    asm.open_segment(addr as u32);
    Ok(())
}

/// `.def <id> = <literal | symbol + literal>`.
fn define(asm: &mut Assembler, args: &str) -> Result<(), AsmError> {
    let (name, rvalue) = args
        .split_once('=')
        .ok_or_else(|| AsmError::with_message(ErrorKind::SyntaxError, "Invalid definition"))?;
    let name = name.trim();
    if !is_identifier(name) {
        return Err(AsmError::with_message(
            ErrorKind::SyntaxError,
            "Invalid definition",
        ));
    }

    let rvalue = rvalue.trim();
    let value = match rvalue.split_once('+') {
        Some((symbol, literal)) => {
            let symbol = symbol.trim();
            let base = asm
                .symbols()
                .lookup(symbol)
                .ok_or_else(|| AsmError::new(ErrorKind::UndefinedLabel, Some(symbol)))?;
            base.wrapping_add(parse_literal(literal)? as u32)
        }
        None => parse_literal(rvalue)? as u32,
    };

    match asm.symbols_mut().define(name, value) {
        SymbolTableResult::Ok => Ok(()),
        SymbolTableResult::Duplicate => Err(AsmError::new(ErrorKind::DuplicateLabel, Some(name))),
    }
}

/// `.text "<string>"` / `.textz "<string>"`.
///
/// The body is taken verbatim between the first and last double quote on
/// the line; `.textz` appends the ASCII digit zero terminator.
fn emit_text(asm: &mut Assembler, args: &str, zero_terminated: bool) -> Result<(), AsmError> {
    let first = args.find('"');
    let last = args.rfind('"');
    let body = match (first, last) {
        (Some(first), Some(last)) if last > first => &args[first + 1..last],
        _ => {
            return Err(AsmError::with_message(
                ErrorKind::SyntaxError,
                "No valid data found after .text directive",
            ))
        }
    };

    let segment = asm.active_segment()?;
    for &byte in body.as_bytes() {
        segment.add_byte(byte);
    }
    let mut emitted = body.len() as u32;
    if zero_terminated {
        segment.add_byte(b'0');
        emitted += 1;
    }
    asm.advance_pc(emitted);
    Ok(())
}

/// `.byte / .word / .dword <list>`: literals and symbols, range-checked
/// against the element width. Forward symbols go through the patch queue.
fn emit_data(asm: &mut Assembler, args: &str, width: PatchWidth) -> Result<(), AsmError> {
    let args = args.trim();
    if args.is_empty() {
        return Err(AsmError::with_message(
            ErrorKind::SyntaxError,
            "Missing data after directive",
        ));
    }
    asm.active_segment()?;

    for element in args.split(',') {
        let element = element.trim();
        if is_identifier(element) {
            match asm.symbols().lookup(element) {
                Some(addr) => {
                    if !fits_unsigned(addr as i64, width.bits()) {
                        return Err(AsmError::new(ErrorKind::SymbolOutOfRange, Some(element)));
                    }
                    emit_element(asm, addr, width)?;
                }
                None => {
                    asm.defer_data_reference(element, width);
                    emit_element(asm, 0, width)?;
                }
            }
        } else {
            let value = parse_literal(element)?;
            if !fits_width(value, width.bits()) {
                return Err(AsmError::new(ErrorKind::ValueOutOfRange, Some(element)));
            }
            emit_element(asm, value as u32, width)?;
        }
    }
    Ok(())
}

fn emit_element(asm: &mut Assembler, value: u32, width: PatchWidth) -> Result<(), AsmError> {
    let segment = asm.active_segment()?;
    match width {
        PatchWidth::Byte => segment.add_byte(value as u8),
        PatchWidth::Word => segment.add_word(value as u16),
        PatchWidth::Dword => segment.add_dword(value),
    }
    asm.advance_pc(width.bits() / 8);
    Ok(())
}
