//! Error types for declaration parsing, descriptor construction and manifests.

use thiserror::Error;

/// A C type or signature could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty type")]
    EmptyType,
    #[error("unknown C type '{0}'")]
    UnknownType(String),
    #[error("malformed signature '{0}': expected `ret (params)`")]
    MalformedSignature(String),
    #[error("unexpected function name '{0}' in signature")]
    UnexpectedName(String),
    #[error("variadic functions cannot be declared")]
    Variadic,
    #[error("parameter {0} is void")]
    VoidParam(usize),
    #[error("{count} parameters exceed the maximum of {max}")]
    TooManyParams { count: usize, max: usize },
    #[error("cannot parse '{text}' as {ty}")]
    BadValue { text: String, ty: &'static str },
}

/// A descriptor failed structural validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("library path is empty")]
    EmptyPath,
    #[error("library path contains a NUL byte")]
    PathContainsNul,
    #[error("symbol #{index} has an empty name")]
    EmptySymbolName { index: usize },
    #[error("symbol '{name}' contains a NUL byte")]
    SymbolContainsNul { name: String },
    #[error("symbol '{name}': {source}")]
    Signature {
        name: String,
        #[source]
        source: ParseError,
    },
}

/// A manifest could not be read or turned into a descriptor.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("symbol '{name}' needs either `signature` or `returns`")]
    MissingSignature { name: String },
    #[error("symbol '{name}' has both `signature` and `params`/`returns`")]
    AmbiguousSignature { name: String },
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}
