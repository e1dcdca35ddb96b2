//! Literal evaluation and emission.
//!
//! [`evaluate`] turns the raw text of a literal token into a typed
//! [`LiteralValue`]; [`emit_literal`] pushes that value with the cheapest
//! instruction sequence for its type.
//!
//! Numeric typing is driven by a suffix kept in the token text:
//!
//! | suffix | type | | suffix | type |
//! |---|---|---|---|---|
//! | none | `int` | | `f` / none with `.` | `float` |
//! | `b` | `byte` | | `d` | `double` |
//! | `sb` `bs` | `sbyte` | | `m` | `decimal` |
//! | `s` | `short` | | | |
//! | `su` `us` | `ushort` | | | |
//! | `u` | `uint` | | | |
//! | `l` | `long` | | | |
//! | `lu` `ul` | `ulong` | | | |
//!
//! Suffixes are case-insensitive.

use bitflags::bitflags;
use nyalang_core::{CompilationError, MethodId, Span, TypeId};
use nyalang_parser::ast::{LiteralExpr, LiteralKind};
use rust_decimal::Decimal;

use crate::bytecode::OpCode;
use crate::emit::MethodEmitter;
use crate::image::{MethodKind, ProgramImage, host};

bitflags! {
    /// Regex options, numbered as the runtime's `RegexOptions`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RegexOptions: u32 {
        const IGNORE_CASE = 1;
        const MULTILINE = 2;
        const EXPLICIT_CAPTURE = 4;
        const SINGLELINE = 16;
        const IGNORE_PATTERN_WHITESPACE = 32;
    }
}

impl RegexOptions {
    /// Map one regex literal flag character.
    pub fn from_flag(flag: char) -> Option<Self> {
        Some(match flag {
            'i' => RegexOptions::IGNORE_CASE,
            'm' => RegexOptions::MULTILINE,
            'n' => RegexOptions::EXPLICIT_CAPTURE,
            's' => RegexOptions::SINGLELINE,
            'x' => RegexOptions::IGNORE_PATTERN_WHITESPACE,
            _ => return None,
        })
    }

    /// Compile `pattern` with these options.
    ///
    /// Explicit capture has no counterpart in the `regex` crate and only
    /// affects which groups are numbered, so it is ignored for matching.
    pub fn build(self, pattern: &str) -> Result<regex::Regex, regex::Error> {
        regex::RegexBuilder::new(pattern)
            .case_insensitive(self.contains(RegexOptions::IGNORE_CASE))
            .multi_line(self.contains(RegexOptions::MULTILINE))
            .dot_matches_new_line(self.contains(RegexOptions::SINGLELINE))
            .ignore_whitespace(self.contains(RegexOptions::IGNORE_PATTERN_WHITESPACE))
            .build()
    }
}

/// A typed compile-time constant.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    String(String),
    Regex { pattern: String, options: RegexOptions },
    Nil,
}

impl LiteralValue {
    /// Static type of the value; `None` for `nil`.
    pub fn type_id(&self) -> Option<TypeId> {
        Some(match self {
            LiteralValue::Bool(_) => host::BOOL,
            LiteralValue::I8(_) => host::SBYTE,
            LiteralValue::I16(_) => host::INT16,
            LiteralValue::I32(_) => host::INT32,
            LiteralValue::I64(_) => host::INT64,
            LiteralValue::U8(_) => host::BYTE,
            LiteralValue::U16(_) => host::UINT16,
            LiteralValue::U32(_) => host::UINT32,
            LiteralValue::U64(_) => host::UINT64,
            LiteralValue::F32(_) => host::SINGLE,
            LiteralValue::F64(_) => host::DOUBLE,
            LiteralValue::Decimal(_) => host::DECIMAL,
            LiteralValue::String(_) => host::STRING,
            LiteralValue::Regex { .. } => host::REGEX,
            LiteralValue::Nil => return None,
        })
    }

    /// The value of an integer literal, widened.
    pub fn as_i64(&self) -> Option<i64> {
        Some(match *self {
            LiteralValue::I8(v) => v.into(),
            LiteralValue::I16(v) => v.into(),
            LiteralValue::I32(v) => v.into(),
            LiteralValue::I64(v) => v,
            LiteralValue::U8(v) => v.into(),
            LiteralValue::U16(v) => v.into(),
            LiteralValue::U32(v) => v.into(),
            LiteralValue::U64(v) => i64::try_from(v).ok()?,
            _ => return None,
        })
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// Evaluate a literal token.
pub fn evaluate(literal: &LiteralExpr<'_>) -> Result<LiteralValue, CompilationError> {
    let text = literal.text;
    let span = literal.span;
    match literal.kind {
        LiteralKind::Int => parse_integer(text, span),
        LiteralKind::Real => parse_real(text, span),
        LiteralKind::String => parse_string(text, span),
        LiteralKind::Regex => parse_regex(text, span),
        LiteralKind::Bool => Ok(LiteralValue::Bool(text == "true")),
        LiteralKind::Nil => Ok(LiteralValue::Nil),
    }
}

fn invalid(text: &str, reason: impl Into<String>, span: Span) -> CompilationError {
    CompilationError::InvalidLiteral {
        text: text.to_string(),
        reason: reason.into(),
        span,
    }
}

fn parse_integer(text: &str, span: Span) -> Result<LiteralValue, CompilationError> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let split = body
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(body.len());
    let (digits, suffix) = body.split_at(split);

    let magnitude: i128 = digits
        .parse::<u64>()
        .map_err(|e| invalid(text, e.to_string(), span))?
        .into();
    let value = if negative { -magnitude } else { magnitude };
    let out_of_range = |ty: &str| invalid(text, format!("value out of range for {ty}"), span);

    Ok(match suffix.to_ascii_lowercase().as_str() {
        "" => LiteralValue::I32(i32::try_from(value).map_err(|_| out_of_range("int"))?),
        "b" => LiteralValue::U8(u8::try_from(value).map_err(|_| out_of_range("byte"))?),
        "sb" | "bs" => LiteralValue::I8(i8::try_from(value).map_err(|_| out_of_range("sbyte"))?),
        "s" => LiteralValue::I16(i16::try_from(value).map_err(|_| out_of_range("short"))?),
        "su" | "us" => LiteralValue::U16(u16::try_from(value).map_err(|_| out_of_range("ushort"))?),
        "u" => LiteralValue::U32(u32::try_from(value).map_err(|_| out_of_range("uint"))?),
        "l" => LiteralValue::I64(i64::try_from(value).map_err(|_| out_of_range("long"))?),
        "lu" | "ul" => LiteralValue::U64(u64::try_from(value).map_err(|_| out_of_range("ulong"))?),
        other => return Err(invalid(text, format!("unknown integer suffix '{other}'"), span)),
    })
}

fn parse_real(text: &str, span: Span) -> Result<LiteralValue, CompilationError> {
    let (body, suffix) = match text.char_indices().last() {
        Some((i, c)) if matches!(c.to_ascii_lowercase(), 'f' | 'd' | 'm') => {
            (&text[..i], c.to_ascii_lowercase())
        }
        _ => (text, 'f'),
    };

    match suffix {
        'd' => body
            .parse::<f64>()
            .map(LiteralValue::F64)
            .map_err(|e| invalid(text, e.to_string(), span)),
        'm' => {
            let parsed = if body.contains(['e', 'E']) {
                Decimal::from_scientific(body)
            } else {
                body.parse::<Decimal>()
            };
            parsed
                .map(LiteralValue::Decimal)
                .map_err(|e| invalid(text, e.to_string(), span))
        }
        _ => body
            .parse::<f32>()
            .map(LiteralValue::F32)
            .map_err(|e| invalid(text, e.to_string(), span)),
    }
}

fn parse_string(text: &str, span: Span) -> Result<LiteralValue, CompilationError> {
    let inner = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .ok_or_else(|| invalid(text, "missing quotes", span))?;
    unescape(inner)
        .map(LiteralValue::String)
        .map_err(|reason| invalid(text, reason, span))
}

/// Resolve C-style escapes.
fn unescape(raw: &str) -> Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = chars.next().ok_or("dangling '\\'")?;
        out.push(match escaped {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            'a' => '\u{7}',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            '\\' | '"' | '\'' => escaped,
            'x' | 'u' => {
                let width = if escaped == 'x' { 2 } else { 4 };
                let hex: String = chars.by_ref().take(width).collect();
                u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == width)
                    .and_then(char::from_u32)
                    .ok_or_else(|| format!("invalid escape '\\{escaped}{hex}'"))?
            }
            other => return Err(format!("unknown escape '\\{other}'")),
        });
    }
    Ok(out)
}

fn parse_regex(text: &str, span: Span) -> Result<LiteralValue, CompilationError> {
    let end = text.rfind('/').filter(|&end| end > 0 && text.starts_with('/'));
    let Some(end) = end else {
        return Err(invalid(text, "regex must be delimited by '/'", span));
    };
    let pattern = &text[1..end];

    let mut options = RegexOptions::empty();
    for flag in text[end + 1..].chars() {
        options |= RegexOptions::from_flag(flag)
            .ok_or_else(|| invalid(text, format!("unknown regex flag '{flag}'"), span))?;
    }

    options
        .build(pattern)
        .map_err(|e| invalid(text, e.to_string(), span))?;

    Ok(LiteralValue::Regex {
        pattern: pattern.to_string(),
        options,
    })
}

// ============================================================================
// Emission
// ============================================================================

/// Push a literal value. Returns its type, `None` for `nil`.
pub fn emit_literal(
    em: &mut MethodEmitter,
    image: &mut ProgramImage,
    value: &LiteralValue,
) -> Result<Option<TypeId>, CompilationError> {
    let pool = image.constants_mut();
    match value {
        LiteralValue::Bool(b) => em.emit_bool(*b),
        LiteralValue::I8(v) => {
            em.emit_i32(pool, (*v).into());
            em.emit(OpCode::ConvI1);
        }
        LiteralValue::I16(v) => {
            em.emit_i32(pool, (*v).into());
            em.emit(OpCode::ConvI2);
        }
        LiteralValue::I32(v) => em.emit_i32(pool, *v),
        LiteralValue::U8(v) => {
            em.emit_i32(pool, (*v).into());
            em.emit(OpCode::ConvU1);
        }
        LiteralValue::U16(v) => {
            em.emit_i32(pool, (*v).into());
            em.emit(OpCode::ConvU2);
        }
        LiteralValue::U32(v) => {
            em.emit_i32(pool, *v as i32);
            em.emit(OpCode::ConvU4);
        }
        LiteralValue::I64(v) => em.emit_i64(pool, *v),
        LiteralValue::U64(v) => {
            em.emit_i64(pool, *v as i64);
            em.emit(OpCode::ConvU8);
        }
        LiteralValue::F32(v) => em.emit_f32(pool, *v),
        LiteralValue::F64(v) => em.emit_f64(pool, *v),
        LiteralValue::String(s) => em.emit_string(pool, s),
        LiteralValue::Nil => {
            em.emit_null();
            return Ok(None);
        }
        LiteralValue::Decimal(d) => emit_decimal(em, image, *d)?,
        LiteralValue::Regex { pattern, options } => {
            let ctor = host_ctor(image, host::REGEX, &[host::STRING, host::INT32])?;
            let pool = image.constants_mut();
            em.emit_string(pool, pattern);
            em.emit_i32(pool, options.bits() as i32);
            em.emit_call(OpCode::NewObj, ctor, 2, 1);
        }
    }
    Ok(value.type_id())
}

/// Push lo, mid, hi, sign and scale, then construct the decimal.
fn emit_decimal(em: &mut MethodEmitter, image: &mut ProgramImage, value: Decimal) -> Result<(), CompilationError> {
    let ctor = host_ctor(
        image,
        host::DECIMAL,
        &[host::INT32, host::INT32, host::INT32, host::BOOL, host::BYTE],
    )?;
    let mantissa = value.mantissa().unsigned_abs();
    let pool = image.constants_mut();
    em.emit_i32(pool, mantissa as u32 as i32);
    em.emit_i32(pool, (mantissa >> 32) as u32 as i32);
    em.emit_i32(pool, (mantissa >> 64) as u32 as i32);
    em.emit_bool(value.is_sign_negative());
    em.emit_i32(pool, value.scale() as i32);
    em.emit(OpCode::ConvU1);
    em.emit_call(OpCode::NewObj, ctor, 5, 1);
    Ok(())
}

fn host_ctor(image: &ProgramImage, ty: TypeId, params: &[TypeId]) -> Result<MethodId, CompilationError> {
    image
        .find_method(Some(ty), MethodKind::CTOR, params)
        .ok_or_else(|| CompilationError::internal(format!("host constructor missing on {}", image.type_name(ty))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(kind: LiteralKind, text: &str) -> Result<LiteralValue, CompilationError> {
        evaluate(&LiteralExpr {
            kind,
            text,
            span: Span::new(1, 1, text.len() as u32),
        })
    }

    fn int(text: &str) -> LiteralValue {
        lit(LiteralKind::Int, text).unwrap()
    }

    fn real(text: &str) -> LiteralValue {
        lit(LiteralKind::Real, text).unwrap()
    }

    #[test]
    fn integer_suffixes() {
        assert_eq!(int("12"), LiteralValue::I32(12));
        assert_eq!(int("12b"), LiteralValue::U8(12));
        assert_eq!(int("12B"), int("12b"));
        assert_eq!(int("5L"), LiteralValue::I64(5));
        assert_eq!(int("7s"), LiteralValue::I16(7));
        assert_eq!(int("7u"), LiteralValue::U32(7));
        assert_eq!(int("7lu"), LiteralValue::U64(7));
        assert_eq!(int("7UL"), LiteralValue::U64(7));
        assert_eq!(int("7us"), LiteralValue::U16(7));
        assert_eq!(int("7Sb"), LiteralValue::I8(7));
        assert_eq!(int("-3"), LiteralValue::I32(-3));
    }

    #[test]
    fn integer_overflow_is_rejected() {
        assert!(lit(LiteralKind::Int, "256b").is_err());
        assert!(lit(LiteralKind::Int, "2147483648").is_err());
        assert_eq!(int("-2147483648"), LiteralValue::I32(i32::MIN));
        assert!(lit(LiteralKind::Int, "-1u").is_err());
        let err = lit(LiteralKind::Int, "12q").unwrap_err();
        assert!(matches!(err, CompilationError::InvalidLiteral { reason, .. } if reason.contains("'q'")));
    }

    #[test]
    fn real_suffixes() {
        assert_eq!(real("7.4f"), LiteralValue::F32(7.4));
        assert_eq!(real("7.4"), LiteralValue::F32(7.4));
        assert_eq!(real("0.5d"), LiteralValue::F64(0.5));
        assert_eq!(real("0.5D"), LiteralValue::F64(0.5));
        assert_eq!(real("13e-3m"), LiteralValue::Decimal(Decimal::new(13, 3)));
        assert_eq!(real("1.25m"), LiteralValue::Decimal(Decimal::new(125, 2)));
        assert_eq!(real("-1.5d"), LiteralValue::F64(-1.5));
    }

    #[test]
    fn strings_are_unescaped() {
        let value = lit(LiteralKind::String, r#""a\tb\n\"c\" A""#).unwrap();
        assert_eq!(value, LiteralValue::String("a\tb\n\"c\" A".into()));
        assert!(lit(LiteralKind::String, r#""bad \q""#).is_err());
    }

    #[test]
    fn regex_flags_map_to_options() {
        let value = lit(LiteralKind::Regex, "/ab+c/im").unwrap();
        assert_eq!(
            value,
            LiteralValue::Regex {
                pattern: "ab+c".into(),
                options: RegexOptions::IGNORE_CASE | RegexOptions::MULTILINE,
            }
        );
        assert!(lit(LiteralKind::Regex, "/a(/").is_err());
        assert!(lit(LiteralKind::Regex, "/a/q").is_err());
    }

    #[test]
    fn regex_pattern_keeps_escaped_slash() {
        let LiteralValue::Regex { pattern, options } = lit(LiteralKind::Regex, r"/a\/b/").unwrap() else {
            panic!("expected regex");
        };
        assert_eq!(pattern, r"a\/b");
        assert!(options.build(&pattern).unwrap().is_match("a/b"));
    }

    #[test]
    fn narrow_integers_emit_conversions() {
        let mut image = ProgramImage::new();
        let mut em = MethodEmitter::new();
        let ty = emit_literal(&mut em, &mut image, &LiteralValue::U8(12)).unwrap();
        assert_eq!(ty, Some(host::BYTE));
        emit_literal(&mut em, &mut image, &LiteralValue::U64(5)).unwrap();
        em.chunk()
            .assert_opcodes(&[OpCode::Constant, OpCode::ConvU1, OpCode::Constant, OpCode::ConvU8]);
        assert_eq!(em.stack_depth(), 2);
    }

    #[test]
    fn decimal_emits_five_parts_and_constructs() {
        let mut image = ProgramImage::new();
        let mut em = MethodEmitter::new();
        let ty = emit_literal(&mut em, &mut image, &LiteralValue::Decimal(Decimal::new(-13, 3))).unwrap();
        assert_eq!(ty, Some(host::DECIMAL));
        em.chunk().assert_opcodes(&[
            OpCode::Constant,
            OpCode::PushZero,
            OpCode::PushZero,
            OpCode::PushTrue,
            OpCode::Constant,
            OpCode::ConvU1,
            OpCode::NewObj,
        ]);
        assert_eq!(em.stack_depth(), 1);
        assert_eq!(em.max_stack(), 5);
    }

    #[test]
    fn nil_has_no_type() {
        let mut image = ProgramImage::new();
        let mut em = MethodEmitter::new();
        assert_eq!(emit_literal(&mut em, &mut image, &LiteralValue::Nil).unwrap(), None);
        em.chunk().assert_opcodes(&[OpCode::PushNull]);
    }
}
