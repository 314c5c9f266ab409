//! Loader error types.

use thiserror::Error;
use typedl_core::SymbolId;

/// Why a library could not be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadErrorKind {
    NotFound,
    PermissionDenied,
    /// The path exists but is not a loadable shared object for this target
    /// (for example a text file or a directory).
    Malformed,
    /// The path cannot be handed to the platform loader (e.g. interior NUL).
    InvalidPath,
    Other,
}

impl LoadErrorKind {
    /// Classify a platform `dlerror` message.
    #[must_use]
    pub fn classify(detail: &str) -> Self {
        let lower = detail.to_ascii_lowercase();
        if lower.contains("no such file")
            || lower.contains("not found")
            || lower.contains("image not found")
        {
            Self::NotFound
        } else if lower.contains("permission denied") {
            Self::PermissionDenied
        } else if lower.contains("invalid elf header")
            || lower.contains("file too short")
            || lower.contains("wrong elf class")
            || lower.contains("not a mach-o")
            || lower.contains("malformed")
            || lower.contains("not a dynamic")
            || lower.contains("only et_dyn")
            || lower.contains("position-independent executable")
            || lower.contains("cannot dynamically load executable")
            || lower.contains("is a directory")
        {
            Self::Malformed
        } else {
            Self::Other
        }
    }
}

/// A library could not be opened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot load '{path}': {detail}")]
pub struct LoadError {
    pub path: String,
    pub kind: LoadErrorKind,
    pub detail: String,
}

impl LoadError {
    pub(crate) fn from_platform(path: impl Into<String>, detail: String) -> Self {
        Self {
            path: path.into(),
            kind: LoadErrorKind::classify(&detail),
            detail,
        }
    }

    pub(crate) fn invalid_path(path: impl Into<String>, detail: impl ToString) -> Self {
        Self {
            path: path.into(),
            kind: LoadErrorKind::InvalidPath,
            detail: detail.to_string(),
        }
    }
}

/// A declared symbol could not be resolved or invoked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error("symbol '{symbol}' not found in '{library}': {detail}")]
    SymbolNotFound {
        symbol: String,
        library: String,
        detail: String,
    },
    #[error("symbol {id} is not declared for '{library}'")]
    UndeclaredSymbol { id: SymbolId, library: String },
    #[error("'{symbol}' expects ({expected}), got ({actual})")]
    ArgumentMismatch {
        symbol: String,
        expected: String,
        actual: String,
    },
    #[error("'{symbol}' has signature '{signature}', which has no dynamic call shape")]
    UnsupportedSignature { symbol: String, signature: String },
}

/// `dlclose` reported a failure on explicit close.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("closing '{path}' failed: {detail}")]
pub struct CloseError {
    pub path: String,
    pub detail: String,
}
