//! Harness error type.

use thiserror::Error;
use typedl_core::{ManifestError, ParseError};
use typedl_loader::{CallError, CloseError, LoadError};

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("manifest: {0}")]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Call(#[from] CallError),
    #[error(transparent)]
    Close(#[from] CloseError),
    #[error("argument: {0}")]
    Argument(#[from] ParseError),
    #[error("symbol '{name}' is not declared in the manifest for '{library}'")]
    UnknownSymbol { name: String, library: String },
    #[error("'{symbol}' takes {expected} argument(s), {actual} given")]
    Arity {
        symbol: String,
        expected: usize,
        actual: usize,
    },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}
