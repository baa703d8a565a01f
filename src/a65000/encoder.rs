// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Instruction encoding.
//!
//! Maps classified operands to an addressing mode, checks it against the
//! mnemonic's allowed set, and produces the packed instruction word, the
//! register selector byte where the mode names registers, and the trailing
//! payload. References to not-yet-defined labels come back as
//! [`SymbolRef`]s for the driver to queue.

use crate::a65000::operand::{Fragment, Inner, Operands, Value};
use crate::a65000::table::InstructionEntry;
use crate::a65000::{
    register_pair, AddressingMode, InstructionWord, OpcodeSize, Postfix, Register, RegisterConfig,
};
use crate::core::error::{AsmError, ErrorKind};
use crate::core::numeric::{fits_signed, fits_unsigned, fits_width};
use crate::core::symbol_table::{PatchWidth, SymbolTable};

/// A deferred symbol reference inside an encoded instruction.
///
/// `site_offset` is relative to the first byte of the instruction word.
/// For absolute references it locates the value itself; for relative ones
/// it is 0 (the site base is the instruction word, the displacement lives
/// at base + 2).
#[derive(Debug, Clone)]
pub struct SymbolRef {
    pub name: String,
    pub site_offset: u32,
    pub width: PatchWidth,
    pub is_relative: bool,
}

/// The byte-level result of encoding one instruction.
#[derive(Debug, Default)]
pub struct EncodedInstruction {
    pub bytes: Vec<u8>,
    pub refs: Vec<SymbolRef>,
}

impl EncodedInstruction {
    fn push_word(&mut self, value: u16) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    fn push_dword(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    fn push_sized(&mut self, value: u32, size: OpcodeSize) {
        match size.payload_bytes() {
            1 => self.bytes.push(value as u8),
            2 => self.push_word(value as u16),
            _ => self.push_dword(value),
        }
    }
}

/// Encode one instruction at address `pc` (the address the instruction
/// word will occupy).
pub fn encode(
    entry: &InstructionEntry,
    size: OpcodeSize,
    operands: &Operands,
    symbols: &SymbolTable,
    pc: u32,
) -> Result<EncodedInstruction, AsmError> {
    if operands.has_postfix() && !entry.postfix_allowed {
        return Err(AsmError::new(
            ErrorKind::InvalidAddressingMode,
            Some(entry.mnemonic),
        ));
    }

    let mut enc = Encoder {
        entry,
        size,
        symbols,
        pc,
        out: EncodedInstruction::default(),
    };
    enc.run(operands)?;
    Ok(enc.out)
}

struct Encoder<'a> {
    entry: &'a InstructionEntry,
    size: OpcodeSize,
    symbols: &'a SymbolTable,
    pc: u32,
    out: EncodedInstruction,
}

impl Encoder<'_> {
    fn run(&mut self, operands: &Operands) -> Result<(), AsmError> {
        match operands {
            Operands::None => self.implied(),
            Operands::Monadic(frag) => self.monadic(frag),
            Operands::Diadic(left, right) => self.diadic(left, right),
        }
    }

    fn check_mode(&self, mode: AddressingMode) -> Result<(), AsmError> {
        if self.entry.allows_mode(mode) {
            Ok(())
        } else {
            Err(AsmError::new(
                ErrorKind::InvalidAddressingMode,
                Some(self.entry.mnemonic),
            ))
        }
    }

    fn word(&mut self, mode: AddressingMode, config: RegisterConfig) {
        self.word_sized(mode, config, self.size);
    }

    fn word_sized(&mut self, mode: AddressingMode, config: RegisterConfig, size: OpcodeSize) {
        let word = InstructionWord {
            mode,
            config,
            opcode: self.entry.opcode,
            size,
        };
        self.out.push_word(word.pack());
    }

    // ---- monadic forms ----

    fn implied(&mut self) -> Result<(), AsmError> {
        self.check_mode(AddressingMode::Implied)?;
        self.word(AddressingMode::Implied, RegisterConfig::NoRegister);
        Ok(())
    }

    fn monadic(&mut self, frag: &Fragment) -> Result<(), AsmError> {
        match frag {
            Fragment::Register(reg) => {
                self.check_mode(AddressingMode::Register1)?;
                self.word(AddressingMode::Register1, RegisterConfig::Register);
                self.out.bytes.push(reg.index());
                Ok(())
            }
            Fragment::Value(value) => self.ambiguous(value),
            Fragment::Indirect { inner, postfix } => match inner {
                Inner::Register(reg) => {
                    self.check_mode(AddressingMode::RegisterIndirect1)?;
                    self.word(AddressingMode::RegisterIndirect1, postfix.single_config());
                    self.out.bytes.push(reg.index());
                    Ok(())
                }
                Inner::Value(value) => {
                    self.check_mode(AddressingMode::Absolute1)?;
                    self.word(AddressingMode::Absolute1, RegisterConfig::NoRegister);
                    self.address(value)
                }
                Inner::RegisterPlusValue(reg, value) | Inner::ValuePlusRegister(value, reg) => {
                    self.check_mode(AddressingMode::Indexed1)?;
                    self.word(AddressingMode::Indexed1, postfix.single_config());
                    self.out.bytes.push(reg.index());
                    self.address(value)
                }
            },
        }
    }

    /// A bare constant or label: relative for branches, direct for jumps,
    /// an immediate for PUSH. Checked in that order; the three sets are
    /// disjoint across the instruction table.
    fn ambiguous(&mut self, value: &Value) -> Result<(), AsmError> {
        if self.entry.allows_mode(AddressingMode::Relative) {
            return self.relative(value);
        }
        if self.entry.allows_mode(AddressingMode::Direct) {
            self.word(AddressingMode::Direct, RegisterConfig::NoRegister);
            return self.address(value);
        }
        if self.entry.allows_mode(AddressingMode::ConstImmediate) {
            self.word(AddressingMode::ConstImmediate, RegisterConfig::NoRegister);
            return self.immediate(value);
        }
        Err(AsmError::new(
            ErrorKind::InvalidAddressingMode,
            Some(self.entry.mnemonic),
        ))
    }

    /// Branch target: a 16-bit displacement from the instruction word,
    /// with the size field forced to 16-bit.
    fn relative(&mut self, value: &Value) -> Result<(), AsmError> {
        self.word_sized(
            AddressingMode::Relative,
            RegisterConfig::NoRegister,
            OpcodeSize::Word,
        );
        let target = match value {
            Value::Constant(target) => *target,
            Value::Label(name) => match self.symbols.lookup(name) {
                Some(addr) => addr as i64,
                None => {
                    self.out.refs.push(SymbolRef {
                        name: name.clone(),
                        site_offset: 0,
                        width: PatchWidth::Word,
                        is_relative: true,
                    });
                    self.out.push_word(0);
                    return Ok(());
                }
            },
        };
        let disp = target - self.pc as i64 + 2;
        if !fits_signed(disp, 16) {
            return Err(AsmError::new(ErrorKind::SymbolOutOfRange, None));
        }
        self.out.push_word(disp as u16);
        Ok(())
    }

    // ---- diadic forms ----

    fn diadic(&mut self, left: &Fragment, right: &Fragment) -> Result<(), AsmError> {
        match (left, right) {
            (Fragment::Value(id), Fragment::Value(arg)) => self.syscall(id, arg),
            (Fragment::Register(dst), right) => self.register_dest(*dst, right),
            (Fragment::Indirect { inner, postfix }, Fragment::Register(src)) => {
                self.memory_dest(inner, *postfix, *src)
            }
            (Fragment::Indirect { inner, postfix }, Fragment::Value(Value::Constant(value))) => {
                self.memory_const(inner, *postfix, *value)
            }
            // The classifier's closed set keeps everything else out.
            _ => Err(AsmError::new(
                ErrorKind::InternalError,
                Some("operand pair escaped the classifier"),
            )),
        }
    }

    fn register_dest(&mut self, dst: Register, src: &Fragment) -> Result<(), AsmError> {
        match src {
            Fragment::Register(src) => {
                self.check_mode(AddressingMode::Register2)?;
                self.word(AddressingMode::Register2, RegisterConfig::TwoRegisters);
                self.out.bytes.push(register_pair(dst, *src));
                Ok(())
            }
            Fragment::Value(value) => {
                self.check_mode(AddressingMode::RegImmediate)?;
                self.word(AddressingMode::RegImmediate, RegisterConfig::Register);
                self.out.bytes.push(dst.index());
                self.immediate(value)
            }
            Fragment::Indirect { inner, postfix } => match inner {
                Inner::Register(src_reg) => {
                    self.check_mode(AddressingMode::RegisterIndirectSrc)?;
                    self.word(AddressingMode::RegisterIndirectSrc, postfix.pair_config());
                    self.out.bytes.push(register_pair(dst, *src_reg));
                    Ok(())
                }
                Inner::Value(value) => {
                    self.check_mode(AddressingMode::AbsoluteSrc)?;
                    self.word(AddressingMode::AbsoluteSrc, RegisterConfig::Register);
                    self.out.bytes.push(dst.index());
                    self.address(value)
                }
                Inner::RegisterPlusValue(index_reg, value)
                | Inner::ValuePlusRegister(value, index_reg) => {
                    self.check_mode(AddressingMode::IndexedSrc)?;
                    self.word(AddressingMode::IndexedSrc, postfix.pair_config());
                    self.out.bytes.push(register_pair(dst, *index_reg));
                    self.address(value)
                }
            },
        }
    }

    fn memory_dest(
        &mut self,
        inner: &Inner,
        postfix: Postfix,
        src: Register,
    ) -> Result<(), AsmError> {
        match inner {
            Inner::Register(dst_reg) => {
                self.check_mode(AddressingMode::RegisterIndirectDest)?;
                self.word(AddressingMode::RegisterIndirectDest, postfix.pair_config());
                self.out.bytes.push(register_pair(*dst_reg, src));
                Ok(())
            }
            Inner::Value(value) => {
                self.check_mode(AddressingMode::AbsoluteDest)?;
                self.word(AddressingMode::AbsoluteDest, RegisterConfig::Register);
                self.out.bytes.push(src.index());
                self.address(value)
            }
            Inner::RegisterPlusValue(index_reg, value)
            | Inner::ValuePlusRegister(value, index_reg) => {
                self.check_mode(AddressingMode::IndexedDest)?;
                self.word(AddressingMode::IndexedDest, postfix.pair_config());
                self.out.bytes.push(register_pair(*index_reg, src));
                self.address(value)
            }
        }
    }

    fn memory_const(
        &mut self,
        inner: &Inner,
        postfix: Postfix,
        value: i64,
    ) -> Result<(), AsmError> {
        match inner {
            Inner::Register(reg) => {
                self.check_mode(AddressingMode::RegisterIndirectConst)?;
                self.word(
                    AddressingMode::RegisterIndirectConst,
                    postfix.single_config(),
                );
                self.out.bytes.push(reg.index());
                self.constant(value)
            }
            Inner::Value(addr) => {
                self.check_mode(AddressingMode::AbsoluteConst)?;
                self.word(AddressingMode::AbsoluteConst, RegisterConfig::NoRegister);
                self.address(addr)?;
                self.constant(value)
            }
            Inner::RegisterPlusValue(index_reg, addr)
            | Inner::ValuePlusRegister(addr, index_reg) => {
                self.check_mode(AddressingMode::IndexedConst)?;
                self.word(AddressingMode::IndexedConst, postfix.single_config());
                self.out.bytes.push(index_reg.index());
                self.address(addr)?;
                self.constant(value)
            }
        }
    }

    /// `sys id, arg`: 16-bit call number, then a 32-bit argument.
    fn syscall(&mut self, id: &Value, arg: &Value) -> Result<(), AsmError> {
        self.check_mode(AddressingMode::Syscall)?;
        self.word(AddressingMode::Syscall, RegisterConfig::NoRegister);
        match id {
            Value::Constant(id) => {
                if !fits_width(*id, 16) {
                    return Err(AsmError::new(ErrorKind::SymbolOutOfRange, None));
                }
                self.out.push_word(*id as u16);
            }
            Value::Label(name) => match self.symbols.lookup(name) {
                Some(addr) => {
                    if !fits_unsigned(addr as i64, 16) {
                        return Err(AsmError::new(ErrorKind::SymbolOutOfRange, Some(name)));
                    }
                    self.out.push_word(addr as u16);
                }
                None => {
                    self.defer(name, PatchWidth::Word);
                    self.out.push_word(0);
                }
            },
        }
        self.address(arg)
    }

    // ---- payload helpers ----

    /// A 32-bit address or displacement, independent of the size suffix.
    fn address(&mut self, value: &Value) -> Result<(), AsmError> {
        match value {
            Value::Constant(value) => self.out.push_dword(*value as u32),
            Value::Label(name) => match self.symbols.lookup(name) {
                Some(addr) => self.out.push_dword(addr),
                None => {
                    self.defer(name, PatchWidth::Dword);
                    self.out.push_dword(0);
                }
            },
        }
        Ok(())
    }

    /// An immediate in the width selected by the size suffix.
    fn immediate(&mut self, value: &Value) -> Result<(), AsmError> {
        match value {
            Value::Constant(value) => self.constant(*value),
            Value::Label(name) => {
                let width = match self.size.payload_bytes() {
                    1 => PatchWidth::Byte,
                    2 => PatchWidth::Word,
                    _ => PatchWidth::Dword,
                };
                match self.symbols.lookup(name) {
                    Some(addr) => {
                        if !fits_unsigned(addr as i64, self.size.payload_bits()) {
                            return Err(AsmError::new(ErrorKind::SymbolOutOfRange, Some(name)));
                        }
                        self.out.push_sized(addr, self.size);
                    }
                    None => {
                        self.defer(name, width);
                        self.out.push_sized(0, self.size);
                    }
                }
                Ok(())
            }
        }
    }

    fn constant(&mut self, value: i64) -> Result<(), AsmError> {
        if !fits_width(value, self.size.payload_bits()) {
            return Err(AsmError::new(ErrorKind::SymbolOutOfRange, None));
        }
        self.out.push_sized(value as u32, self.size);
        Ok(())
    }

    fn defer(&mut self, name: &str, width: PatchWidth) {
        self.out.refs.push(SymbolRef {
            name: name.to_string(),
            site_offset: self.out.bytes.len() as u32,
            width,
            is_relative: false,
        });
    }
}
