//! C scalar types that may appear in a declared signature.
//!
//! Only by-value scalars and pointers are modelled. Aggregates passed by value
//! have platform-specific calling conventions and cannot be declared.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ParseError;

/// A C scalar type.
///
/// `long`/`unsigned long` map to [`CType::Isize`]/[`CType::Usize`]: every unix
/// data model (ILP32, LP64) keeps `long` pointer-sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CType {
    Void,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    Isize,
    Usize,
    F32,
    F64,
    /// Any data or function pointer. Pointee types are not tracked.
    Pointer,
}

impl CType {
    /// Every variant, in declaration order.
    pub const ALL: [CType; 14] = [
        CType::Void,
        CType::I8,
        CType::U8,
        CType::I16,
        CType::U16,
        CType::I32,
        CType::U32,
        CType::I64,
        CType::U64,
        CType::Isize,
        CType::Usize,
        CType::F32,
        CType::F64,
        CType::Pointer,
    ];

    /// Canonical C spelling used for display and serialization.
    #[must_use]
    pub const fn c_name(self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::I8 => "int8_t",
            Self::U8 => "uint8_t",
            Self::I16 => "int16_t",
            Self::U16 => "uint16_t",
            Self::I32 => "int",
            Self::U32 => "unsigned int",
            Self::I64 => "int64_t",
            Self::U64 => "uint64_t",
            Self::Isize => "long",
            Self::Usize => "size_t",
            Self::F32 => "float",
            Self::F64 => "double",
            Self::Pointer => "void *",
        }
    }

    #[must_use]
    pub const fn is_void(self) -> bool {
        matches!(self, Self::Void)
    }

    /// Parse a C type spelling.
    ///
    /// Accepts standard C names (`int`, `unsigned long`, `size_t`,
    /// `const char *`, ...), fixed-width typedefs (`int32_t`) and the short
    /// Rust-style names (`i32`, `f64`, `usize`, `ptr`).
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return Err(ParseError::EmptyType);
        }
        if normalized.ends_with('*') {
            return Ok(Self::Pointer);
        }
        let ty = match normalized.as_str() {
            "void" => Self::Void,
            "char" | "signed char" | "int8_t" | "i8" => Self::I8,
            "unsigned char" | "uint8_t" | "bool" | "_Bool" | "u8" => Self::U8,
            "short" | "short int" | "signed short" | "signed short int" | "int16_t" | "i16" => {
                Self::I16
            }
            "unsigned short" | "unsigned short int" | "uint16_t" | "u16" => Self::U16,
            "int" | "signed" | "signed int" | "int32_t" | "i32" => Self::I32,
            "unsigned" | "unsigned int" | "uint32_t" | "u32" => Self::U32,
            "long long" | "long long int" | "signed long long" | "int64_t" | "i64" => Self::I64,
            "unsigned long long" | "unsigned long long int" | "uint64_t" | "u64" => Self::U64,
            "long" | "long int" | "signed long" | "ssize_t" | "ptrdiff_t" | "intptr_t"
            | "isize" => Self::Isize,
            "unsigned long" | "unsigned long int" | "size_t" | "uintptr_t" | "usize" => {
                Self::Usize
            }
            "float" | "f32" => Self::F32,
            "double" | "f64" => Self::F64,
            "ptr" | "pointer" => Self::Pointer,
            _ => return Err(ParseError::UnknownType(text.trim().to_string())),
        };
        Ok(ty)
    }
}

/// Collapse whitespace, drop `const`/`volatile` qualifiers and glue `*` tokens.
fn normalize(text: &str) -> String {
    let spaced = text.replace('*', " * ");
    let words: Vec<&str> = spaced
        .split_whitespace()
        .filter(|w| *w != "const" && *w != "volatile" && *w != "restrict")
        .collect();
    let mut out = String::with_capacity(text.len());
    for word in words {
        if word == "*" {
            out.push('*');
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.c_name())
    }
}

impl FromStr for CType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CType {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CType> for String {
    fn from(value: CType) -> Self {
        value.c_name().to_string()
    }
}
