//! Runtime-typed argument and return values.

use std::fmt;

use serde::Serialize;

use crate::ParseError;
use crate::ctype::CType;

/// A scalar value tagged with its C type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    Void,
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    Isize(isize),
    Usize(usize),
    F32(f32),
    F64(f64),
    /// Raw address.
    Pointer(usize),
}

impl Value {
    #[must_use]
    pub const fn ctype(&self) -> CType {
        match self {
            Self::Void => CType::Void,
            Self::I8(_) => CType::I8,
            Self::U8(_) => CType::U8,
            Self::I16(_) => CType::I16,
            Self::U16(_) => CType::U16,
            Self::I32(_) => CType::I32,
            Self::U32(_) => CType::U32,
            Self::I64(_) => CType::I64,
            Self::U64(_) => CType::U64,
            Self::Isize(_) => CType::Isize,
            Self::Usize(_) => CType::Usize,
            Self::F32(_) => CType::F32,
            Self::F64(_) => CType::F64,
            Self::Pointer(_) => CType::Pointer,
        }
    }

    /// Parse `text` as a value of type `ty`.
    ///
    /// Integers and pointers accept decimal or `0x`-prefixed hex. `void` only
    /// accepts the empty string.
    pub fn parse(ty: CType, text: &str) -> Result<Self, ParseError> {
        let t = text.trim();
        let bad = || ParseError::BadValue {
            text: text.to_string(),
            ty: ty.c_name(),
        };
        let value = match ty {
            CType::Void if t.is_empty() => Self::Void,
            CType::Void => return Err(bad()),
            CType::I8 => Self::I8(parse_int(t).ok_or_else(bad)?),
            CType::U8 => Self::U8(parse_int(t).ok_or_else(bad)?),
            CType::I16 => Self::I16(parse_int(t).ok_or_else(bad)?),
            CType::U16 => Self::U16(parse_int(t).ok_or_else(bad)?),
            CType::I32 => Self::I32(parse_int(t).ok_or_else(bad)?),
            CType::U32 => Self::U32(parse_int(t).ok_or_else(bad)?),
            CType::I64 => Self::I64(parse_int(t).ok_or_else(bad)?),
            CType::U64 => Self::U64(parse_int(t).ok_or_else(bad)?),
            CType::Isize => Self::Isize(parse_int(t).ok_or_else(bad)?),
            CType::Usize => Self::Usize(parse_int(t).ok_or_else(bad)?),
            CType::Pointer => Self::Pointer(parse_int(t).ok_or_else(bad)?),
            CType::F32 => Self::F32(t.parse().map_err(|_| bad())?),
            CType::F64 => Self::F64(t.parse().map_err(|_| bad())?),
        };
        Ok(value)
    }
}

fn parse_int<T>(text: &str) -> Option<T>
where
    T: TryFrom<i128>,
{
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    // One sign at most; the digits themselves are unsigned.
    let (digits, radix) = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) if hex.bytes().all(|b| b.is_ascii_hexdigit()) => (hex, 16),
        None if digits.bytes().all(|b| b.is_ascii_digit()) => (digits, 10),
        _ => return None,
    };
    if digits.is_empty() {
        return None;
    }
    let magnitude = i128::from_str_radix(digits, radix).ok()?;
    let signed = if negative { -magnitude } else { magnitude };
    T::try_from(signed).ok()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::I8(v) => write!(f, "{v}"),
            Self::U8(v) => write!(f, "{v}"),
            Self::I16(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::Isize(v) => write!(f, "{v}"),
            Self::Usize(v) => write!(f, "{v}"),
            Self::F32(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
            Self::Pointer(v) => write!(f, "{v:#x}"),
        }
    }
}
