//! # typedl-core
//!
//! Declarations for the typed dynamic-symbol loader.
//!
//! This crate holds everything that can be decided without touching the
//! platform loader: C types and signatures, symbol declarations, library
//! descriptors, JSON manifests, dlopen mode flags and loader configuration.
//! No `unsafe` code is permitted at the crate level.

#![deny(unsafe_code)]

pub mod config;
pub mod ctype;
pub mod descriptor;
pub mod dlfcn;
pub mod error;
pub mod manifest;
pub mod signature;
pub mod value;

pub use config::LoaderConfig;
pub use ctype::CType;
pub use descriptor::{
    DescriptorBuilder, DescriptorId, LibraryDescriptor, StaticDecl, SymbolDecl, SymbolId,
};
pub use error::{DescriptorError, ManifestError, ParseError};
pub use manifest::{Manifest, ManifestSymbol};
pub use signature::{MAX_ARITY, Signature, parse_prototype};
pub use value::Value;
