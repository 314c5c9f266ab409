//! Symbol declarations and library descriptors.
//!
//! A [`LibraryDescriptor`] is the closed set of symbols a loader may resolve
//! from one library. It is built once, validated once, and never mutated.
//! Callers address declarations through [`SymbolId`]s handed out by the
//! descriptor itself, so a declaration from one descriptor can be told apart
//! from a same-named declaration in another.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::ctype::CType;
use crate::error::{DescriptorError, ParseError};
use crate::signature::{Signature, parse_prototype};

static NEXT_DESCRIPTOR_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a built descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DescriptorId(u64);

impl DescriptorId {
    fn fresh() -> Self {
        Self(NEXT_DESCRIPTOR_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Handle to one declaration inside one descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId {
    descriptor: DescriptorId,
    index: u32,
}

impl SymbolId {
    #[must_use]
    pub const fn descriptor(self) -> DescriptorId {
        self.descriptor
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.descriptor.0, self.index)
    }
}

/// An immutable name + signature pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SymbolDecl {
    name: String,
    signature: Signature,
}

impl SymbolDecl {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}

impl fmt::Display for SymbolDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self
            .signature
            .params()
            .iter()
            .map(|p| p.c_name())
            .collect::<Vec<_>>()
            .join(", ");
        let params = if params.is_empty() { "void".to_string() } else { params };
        write!(f, "{} {}({})", self.signature.returns(), self.name, params)
    }
}

/// A declaration whose parts are all `'static`, for compile-time tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticDecl {
    pub name: &'static str,
    pub params: &'static [CType],
    pub returns: CType,
}

impl StaticDecl {
    #[must_use]
    pub const fn new(name: &'static str, params: &'static [CType], returns: CType) -> Self {
        Self {
            name,
            params,
            returns,
        }
    }
}

/// A library path bound to its closed set of declarations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryDescriptor {
    id: DescriptorId,
    path: String,
    symbols: Vec<SymbolDecl>,
}

impl LibraryDescriptor {
    /// Start building a descriptor for `path`.
    #[must_use]
    pub fn builder(path: impl Into<String>) -> DescriptorBuilder {
        DescriptorBuilder::new(path)
    }

    /// Build a descriptor from a compile-time declaration table.
    pub fn from_static(path: &str, decls: &[StaticDecl]) -> Result<Self, DescriptorError> {
        decls
            .iter()
            .fold(DescriptorBuilder::new(path), |b, d| {
                b.declare(d.name, d.params, d.returns)
            })
            .build()
    }

    #[must_use]
    pub fn id(&self) -> DescriptorId {
        self.id
    }

    /// Library path or platform library name. Not checked until open.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Declaration for `id`, or `None` if `id` belongs to another descriptor.
    #[must_use]
    pub fn symbol(&self, id: SymbolId) -> Option<&SymbolDecl> {
        if id.descriptor != self.id {
            return None;
        }
        self.symbols.get(id.index())
    }

    /// Id of the declaration at `index`.
    #[must_use]
    pub fn id_at(&self, index: usize) -> Option<SymbolId> {
        if index >= self.symbols.len() {
            return None;
        }
        Some(SymbolId {
            descriptor: self.id,
            index: index as u32,
        })
    }

    /// First declaration named `name`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<SymbolId> {
        self.symbols
            .iter()
            .position(|s| s.name == name)
            .and_then(|i| self.id_at(i))
    }

    /// All declarations with their ids, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &SymbolDecl)> {
        self.symbols.iter().enumerate().map(|(i, s)| {
            (
                SymbolId {
                    descriptor: self.id,
                    index: i as u32,
                },
                s,
            )
        })
    }
}

enum Pending {
    Decl(String, Result<Signature, ParseError>),
    Prototype(String),
}

/// Accumulates declarations; all validation happens in [`build`](Self::build).
pub struct DescriptorBuilder {
    path: String,
    pending: Vec<Pending>,
}

impl DescriptorBuilder {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            pending: Vec::new(),
        }
    }

    /// Declare `name` with an already-validated signature.
    #[must_use]
    pub fn symbol(mut self, name: impl Into<String>, signature: Signature) -> Self {
        self.pending.push(Pending::Decl(name.into(), Ok(signature)));
        self
    }

    /// Declare `name` from parameter and return types.
    #[must_use]
    pub fn declare(
        mut self,
        name: impl Into<String>,
        params: impl Into<Vec<CType>>,
        returns: CType,
    ) -> Self {
        let sig = Signature::new(params, returns);
        self.pending.push(Pending::Decl(name.into(), sig));
        self
    }

    /// Declare a symbol from a named C prototype, e.g. `int add(int, int)`.
    #[must_use]
    pub fn prototype(mut self, text: impl Into<String>) -> Self {
        self.pending.push(Pending::Prototype(text.into()));
        self
    }

    pub fn build(self) -> Result<LibraryDescriptor, DescriptorError> {
        if self.path.trim().is_empty() {
            return Err(DescriptorError::EmptyPath);
        }
        if self.path.contains('\0') {
            return Err(DescriptorError::PathContainsNul);
        }

        let mut symbols = Vec::with_capacity(self.pending.len());
        for (index, pending) in self.pending.into_iter().enumerate() {
            let (name, signature) = match pending {
                Pending::Decl(name, sig) => (name, sig),
                Pending::Prototype(text) => match parse_prototype(&text) {
                    Ok((Some(name), sig)) => (name, Ok(sig)),
                    Ok((None, _)) => (String::new(), Err(ParseError::MalformedSignature(text))),
                    Err(e) => (text, Err(e)),
                },
            };
            if name.is_empty() {
                return Err(DescriptorError::EmptySymbolName { index });
            }
            if name.contains('\0') {
                return Err(DescriptorError::SymbolContainsNul { name });
            }
            let signature = signature.map_err(|source| DescriptorError::Signature {
                name: name.clone(),
                source,
            })?;
            symbols.push(SymbolDecl { name, signature });
        }

        Ok(LibraryDescriptor {
            id: DescriptorId::fresh(),
            path: self.path,
            symbols,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_desc() -> LibraryDescriptor {
        LibraryDescriptor::builder("libadd.so")
            .declare("add", [CType::I32, CType::I32], CType::I32)
            .prototype("double scale(double x, int n)")
            .build()
            .unwrap()
    }

    #[test]
    fn build_keeps_declaration_order() {
        let d = add_desc();
        assert_eq!(d.path(), "libadd.so");
        assert_eq!(d.len(), 2);
        let names: Vec<_> = d.iter().map(|(_, s)| s.name().to_string()).collect();
        assert_eq!(names, ["add", "scale"]);
        assert_eq!(d.iter().nth(1).unwrap().1.to_string(), "double scale(double, int)");
    }

    #[test]
    fn ids_are_scoped_to_their_descriptor() {
        let a = add_desc();
        let b = add_desc();
        assert_ne!(a.id(), b.id());

        let add_in_a = a.find("add").unwrap();
        assert!(a.symbol(add_in_a).is_some());
        assert!(b.symbol(add_in_a).is_none());
        assert_eq!(b.symbol(b.find("add").unwrap()).unwrap().name(), "add");
    }

    #[test]
    fn clone_preserves_identity() {
        let a = add_desc();
        let copy = a.clone();
        let id = a.find("scale").unwrap();
        assert_eq!(copy.symbol(id).unwrap().name(), "scale");
    }

    #[test]
    fn duplicate_names_are_allowed_and_distinct() {
        let d = LibraryDescriptor::builder("libx.so")
            .declare("f", [CType::I32], CType::I32)
            .declare("f", [CType::F64], CType::F64)
            .build()
            .unwrap();
        assert_eq!(d.find("f").unwrap().index(), 0);
        let second = d.id_at(1).unwrap();
        assert_eq!(d.symbol(second).unwrap().signature().returns(), CType::F64);
    }

    #[test]
    fn structural_errors() {
        assert_eq!(
            LibraryDescriptor::builder("  ").build(),
            Err(DescriptorError::EmptyPath)
        );
        assert_eq!(
            LibraryDescriptor::builder("lib\0x.so").build(),
            Err(DescriptorError::PathContainsNul)
        );
        assert_eq!(
            LibraryDescriptor::builder("l.so")
                .declare("", Vec::<CType>::new(), CType::Void)
                .build(),
            Err(DescriptorError::EmptySymbolName { index: 0 })
        );
        assert!(matches!(
            LibraryDescriptor::builder("l.so")
                .declare("a\0b", Vec::<CType>::new(), CType::Void)
                .build(),
            Err(DescriptorError::SymbolContainsNul { .. })
        ));
        assert!(matches!(
            LibraryDescriptor::builder("l.so")
                .declare("g", [CType::Void], CType::I32)
                .build(),
            Err(DescriptorError::Signature {
                source: ParseError::VoidParam(0),
                ..
            })
        ));
        assert!(matches!(
            LibraryDescriptor::builder("l.so").prototype("int (int)").build(),
            Err(DescriptorError::EmptySymbolName { index: 0 })
        ));
    }

    #[test]
    fn from_static_table() {
        const TABLE: &[StaticDecl] = &[
            StaticDecl::new("cos", &[CType::F64], CType::F64),
            StaticDecl::new("abs", &[CType::I32], CType::I32),
        ];
        let d = LibraryDescriptor::from_static("libm.so.6", TABLE).unwrap();
        assert_eq!(d.len(), 2);
        assert_eq!(d.id_at(1).and_then(|id| d.symbol(id)).unwrap().name(), "abs");
        assert!(d.id_at(2).is_none());
    }
}
