// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Operand classification.
//!
//! The classifier turns the operand text of an instruction line into the
//! closed set of operand shapes the A65000 instruction set uses. It is
//! purely syntactic: whether a shape is legal for the mnemonic is decided
//! later against the instruction table.
//!
//! Shapes per fragment: register, constant, label, and `[inner]` with an
//! optional `+`/`-` postfix, where inner is a register, a constant, a
//! label, or a `register + value` / `value + register` pair. A comma makes
//! the operand diadic; the pair combinations accepted below are exactly
//! the ones the instruction set uses.

use crate::a65000::{Postfix, Register};
use crate::core::error::{AsmError, ErrorKind};
use crate::core::numeric::{looks_like_literal, parse_literal};
use crate::core::text_utils::{is_identifier, split_operands};

/// A scalar operand piece: a numeric literal or a symbol reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Constant(i64),
    Label(String),
}

/// The contents of a `[...]` group.
#[derive(Debug, Clone, PartialEq)]
pub enum Inner {
    Register(Register),
    Value(Value),
    RegisterPlusValue(Register, Value),
    ValuePlusRegister(Value, Register),
}

impl Inner {
    /// The register component, if the shape has one.
    #[must_use]
    pub fn register(&self) -> Option<Register> {
        match self {
            Inner::Register(reg)
            | Inner::RegisterPlusValue(reg, _)
            | Inner::ValuePlusRegister(_, reg) => Some(*reg),
            Inner::Value(_) => None,
        }
    }
}

/// One comma-free operand fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Register(Register),
    Value(Value),
    Indirect { inner: Inner, postfix: Postfix },
}

impl Fragment {
    #[must_use]
    pub fn postfix(&self) -> Postfix {
        match self {
            Fragment::Indirect { postfix, .. } => *postfix,
            _ => Postfix::None,
        }
    }
}

/// The classified operand field of an instruction line.
#[derive(Debug, Clone, PartialEq)]
pub enum Operands {
    None,
    Monadic(Fragment),
    Diadic(Fragment, Fragment),
}

impl Operands {
    /// True when any fragment carries a `+`/`-` postfix.
    #[must_use]
    pub fn has_postfix(&self) -> bool {
        match self {
            Operands::None => false,
            Operands::Monadic(frag) => frag.postfix() != Postfix::None,
            Operands::Diadic(left, right) => {
                left.postfix() != Postfix::None || right.postfix() != Postfix::None
            }
        }
    }
}

/// Classify the operand text of an instruction line.
pub fn classify(text: &str) -> Result<Operands, AsmError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Operands::None);
    }

    match split_operands(text) {
        Some((left, right)) => {
            let left = parse_fragment(left)?;
            let right = parse_fragment(right)?;
            if !pair_in_closed_set(&left, &right) {
                return Err(AsmError::new(ErrorKind::InvalidOperands, Some(text)));
            }
            Ok(Operands::Diadic(left, right))
        }
        None => Ok(Operands::Monadic(parse_fragment(text)?)),
    }
}

/// The diadic combinations the instruction set uses. Everything else is
/// rejected by the classifier, not the legality check.
fn pair_in_closed_set(left: &Fragment, right: &Fragment) -> bool {
    match (left, right) {
        // Rx, ...: register destination with any source shape
        (Fragment::Register(_), _) => true,
        // [...], Rx: memory destination from register
        (Fragment::Indirect { .. }, Fragment::Register(_)) => true,
        // [...], const: memory destination from constant
        (Fragment::Indirect { .. }, Fragment::Value(Value::Constant(_))) => true,
        // id, arg pairs (syscall); either side may be a label
        (Fragment::Value(_), Fragment::Value(_)) => true,
        _ => false,
    }
}

fn parse_fragment(text: &str) -> Result<Fragment, AsmError> {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix('[') {
        let close = rest
            .find(']')
            .ok_or_else(|| AsmError::new(ErrorKind::InvalidOperands, Some(text)))?;
        let inner = parse_inner(&rest[..close])?;
        let postfix = match rest[close + 1..].trim() {
            "" => Postfix::None,
            "+" => Postfix::PostIncrement,
            "-" => Postfix::PreDecrement,
            _ => return Err(AsmError::new(ErrorKind::InvalidOperands, Some(text))),
        };
        // The grammar attaches postfixes to register-bearing groups only.
        if postfix != Postfix::None && inner.register().is_none() {
            return Err(AsmError::new(ErrorKind::InvalidOperands, Some(text)));
        }
        return Ok(Fragment::Indirect { inner, postfix });
    }

    Ok(match parse_scalar(text)? {
        Scalar::Register(reg) => Fragment::Register(reg),
        Scalar::Value(value) => Fragment::Value(value),
    })
}

fn parse_inner(text: &str) -> Result<Inner, AsmError> {
    let text = text.trim();
    match text.split_once('+') {
        Some((left, right)) => {
            let left = parse_scalar(left.trim())?;
            let right = parse_scalar(right.trim())?;
            match (left, right) {
                (Scalar::Register(reg), Scalar::Value(value)) => {
                    Ok(Inner::RegisterPlusValue(reg, value))
                }
                (Scalar::Value(value), Scalar::Register(reg)) => {
                    Ok(Inner::ValuePlusRegister(value, reg))
                }
                _ => Err(AsmError::new(ErrorKind::InvalidOperands, Some(text))),
            }
        }
        None => Ok(match parse_scalar(text)? {
            Scalar::Register(reg) => Inner::Register(reg),
            Scalar::Value(value) => Inner::Value(value),
        }),
    }
}

enum Scalar {
    Register(Register),
    Value(Value),
}

fn parse_scalar(text: &str) -> Result<Scalar, AsmError> {
    let text = text.trim();
    if Register::is_register_token(text) {
        return Ok(Scalar::Register(Register::parse(text)?));
    }
    if looks_like_literal(text) {
        return Ok(Scalar::Value(Value::Constant(parse_literal(text)?)));
    }
    if is_identifier(text) {
        return Ok(Scalar::Value(Value::Label(text.to_ascii_lowercase())));
    }
    Err(AsmError::new(ErrorKind::InvalidOperands, Some(text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg(index: u8) -> Register {
        Register::parse(&format!("r{index}")).unwrap()
    }

    #[test]
    fn empty_operand_is_none() {
        assert_eq!(classify("").unwrap(), Operands::None);
        assert_eq!(classify("   ").unwrap(), Operands::None);
    }

    #[test]
    fn monadic_shapes() {
        assert_eq!(
            classify("r3").unwrap(),
            Operands::Monadic(Fragment::Register(reg(3)))
        );
        assert_eq!(
            classify("$f000").unwrap(),
            Operands::Monadic(Fragment::Value(Value::Constant(0xf000)))
        );
        assert_eq!(
            classify("names").unwrap(),
            Operands::Monadic(Fragment::Value(Value::Label("names".into())))
        );
        assert_eq!(
            classify("[r0]+").unwrap(),
            Operands::Monadic(Fragment::Indirect {
                inner: Inner::Register(reg(0)),
                postfix: Postfix::PostIncrement,
            })
        );
        assert_eq!(
            classify("[ r1 + $10 ]-").unwrap(),
            Operands::Monadic(Fragment::Indirect {
                inner: Inner::RegisterPlusValue(reg(1), Value::Constant(0x10)),
                postfix: Postfix::PreDecrement,
            })
        );
        assert_eq!(
            classify("[table + r2]").unwrap(),
            Operands::Monadic(Fragment::Indirect {
                inner: Inner::ValuePlusRegister(Value::Label("table".into()), reg(2)),
                postfix: Postfix::None,
            })
        );
    }

    #[test]
    fn diadic_shapes() {
        let classified = classify("r0, [r1 + 8]+").unwrap();
        assert_eq!(
            classified,
            Operands::Diadic(
                Fragment::Register(reg(0)),
                Fragment::Indirect {
                    inner: Inner::RegisterPlusValue(reg(1), Value::Constant(8)),
                    postfix: Postfix::PostIncrement,
                }
            )
        );
        assert!(classified.has_postfix());

        assert_eq!(
            classify("[$1234], r0").unwrap(),
            Operands::Diadic(
                Fragment::Indirect {
                    inner: Inner::Value(Value::Constant(0x1234)),
                    postfix: Postfix::None,
                },
                Fragment::Register(reg(0)),
            )
        );
        assert_eq!(
            classify("5, vector").unwrap(),
            Operands::Diadic(
                Fragment::Value(Value::Constant(5)),
                Fragment::Value(Value::Label("vector".into())),
            )
        );
    }

    #[test]
    fn case_is_folded_in_labels() {
        assert_eq!(
            classify("Names").unwrap(),
            Operands::Monadic(Fragment::Value(Value::Label("names".into())))
        );
    }

    #[test]
    fn rejects_shapes_outside_the_closed_set() {
        for text in [
            "5, r0",          // constant destination
            "names, r0",      // label destination
            "[r0], [r1]",     // two indirects
            "[r0], names",    // label source into memory
            "r0, r1, r2",     // too many operands
            "[names]+",       // postfix without register
            "[$10]-",         // postfix without register
            "[r0 + r1]",      // two registers in a group
            "[5 + 6]",        // two values in a group
            "[r0",            // unterminated group
            "r0 r1",          // missing comma
            "@foo",           // junk
        ] {
            let err = classify(text).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidOperands, "for {text:?}");
        }
    }

    #[test]
    fn register_and_number_errors_keep_their_kind() {
        assert_eq!(
            classify("r14").unwrap_err().kind(),
            ErrorKind::InvalidRegister
        );
        assert_eq!(
            classify("r0, $10000000000").unwrap_err().kind(),
            ErrorKind::ValueOutOfRange
        );
    }
}
