//! Function signatures: ordered parameter types and a return type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ParseError;
use crate::ctype::CType;

/// Maximum number of parameters a declaration may carry.
pub const MAX_ARITY: usize = 6;

/// A C function signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Signature {
    params: Vec<CType>,
    returns: CType,
}

impl Signature {
    /// Build a signature, validating arity and parameter types.
    pub fn new(params: impl Into<Vec<CType>>, returns: CType) -> Result<Self, ParseError> {
        let params = params.into();
        if params.len() > MAX_ARITY {
            return Err(ParseError::TooManyParams {
                count: params.len(),
                max: MAX_ARITY,
            });
        }
        if let Some(pos) = params.iter().position(|p| p.is_void()) {
            return Err(ParseError::VoidParam(pos));
        }
        Ok(Self { params, returns })
    }

    #[must_use]
    pub fn params(&self) -> &[CType] {
        &self.params
    }

    #[must_use]
    pub fn returns(&self) -> CType {
        self.returns
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Parse `ret (p1, p2, ...)`. A function name between the return type and
    /// the parameter list is rejected; use [`parse_prototype`] for that form.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let (name, sig) = parse_prototype(text)?;
        match name {
            Some(name) => Err(ParseError::UnexpectedName(name)),
            None => Ok(sig),
        }
    }
}

/// Parse a C prototype such as `int add(int a, int b)` or `double (double)`.
///
/// Returns the optional function name and the signature. Parameter names are
/// accepted and discarded. `(void)` and `()` both declare zero parameters.
/// Variadic prototypes are rejected.
pub fn parse_prototype(text: &str) -> Result<(Option<String>, Signature), ParseError> {
    let text = text.trim().trim_end_matches(';').trim_end();
    let open = text
        .find('(')
        .ok_or_else(|| ParseError::MalformedSignature(text.to_string()))?;
    if !text.ends_with(')') || text[open + 1..].contains('(') {
        return Err(ParseError::MalformedSignature(text.to_string()));
    }
    let head = text[..open].trim();
    let body = text[open + 1..text.len() - 1].trim();

    let (returns, name) = parse_head(head)?;

    let mut params = Vec::new();
    if !(body.is_empty() || body == "void") {
        for raw in body.split(',') {
            let raw = raw.trim();
            if raw == "..." {
                return Err(ParseError::Variadic);
            }
            params.push(parse_param(raw)?);
        }
    }
    Ok((name, Signature::new(params, returns)?))
}

fn parse_head(head: &str) -> Result<(CType, Option<String>), ParseError> {
    if let Ok(ty) = CType::parse(head) {
        return Ok((ty, None));
    }
    let (ty_text, name) = split_trailing_ident(head)
        .ok_or_else(|| ParseError::UnknownType(head.to_string()))?;
    Ok((CType::parse(ty_text)?, Some(name.to_string())))
}

fn parse_param(raw: &str) -> Result<CType, ParseError> {
    if let Ok(ty) = CType::parse(raw) {
        return Ok(ty);
    }
    match split_trailing_ident(raw) {
        Some((ty_text, _)) => CType::parse(ty_text),
        None => Err(ParseError::UnknownType(raw.to_string())),
    }
}

/// Split `"char *name"` into `("char *", "name")`.
fn split_trailing_ident(text: &str) -> Option<(&str, &str)> {
    let text = text.trim_end();
    let start = text
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_alphanumeric() || *c == '_')
        .last()
        .map(|(i, _)| i)?;
    let (ty, ident) = text.split_at(start);
    if ty.trim().is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    Some((ty, ident))
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (", self.returns)?;
        if self.params.is_empty() {
            f.write_str("void")?;
        }
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        f.write_str(")")
    }
}

impl FromStr for Signature {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Signature {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Signature> for String {
    fn from(value: Signature) -> Self {
        value.to_string()
    }
}
