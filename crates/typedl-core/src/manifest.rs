//! JSON manifests describing a library and its declared symbols.
//!
//! ```json
//! {
//!   "library": "libm.so.6",
//!   "symbols": [
//!     { "name": "cos", "signature": "double (double)" },
//!     { "name": "ldexp", "params": ["double", "int"], "returns": "double" },
//!     { "prototype": "int abs(int)" }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ctype::CType;
use crate::descriptor::{DescriptorBuilder, LibraryDescriptor};
use crate::error::ManifestError;
use crate::signature::Signature;

/// Top-level manifest document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Library path or platform library name.
    pub library: String,
    #[serde(default)]
    pub symbols: Vec<ManifestSymbol>,
}

/// One declared symbol. Exactly one of `prototype`, `signature`, or
/// `params`/`returns` describes the type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestSymbol {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prototype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<CType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<CType>,
}

impl Manifest {
    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Validate and convert into a descriptor.
    pub fn to_descriptor(&self) -> Result<LibraryDescriptor, ManifestError> {
        let mut builder = DescriptorBuilder::new(self.library.clone());
        for sym in &self.symbols {
            builder = sym.apply(builder)?;
        }
        Ok(builder.build()?)
    }

    /// Manifest that reproduces `descriptor`'s declarations.
    #[must_use]
    pub fn from_descriptor(descriptor: &LibraryDescriptor) -> Self {
        Self {
            library: descriptor.path().to_string(),
            symbols: descriptor
                .iter()
                .map(|(_, decl)| ManifestSymbol {
                    name: Some(decl.name().to_string()),
                    prototype: None,
                    signature: Some(decl.signature().clone()),
                    params: None,
                    returns: None,
                })
                .collect(),
        }
    }
}

impl ManifestSymbol {
    fn apply(&self, builder: DescriptorBuilder) -> Result<DescriptorBuilder, ManifestError> {
        let label = self
            .name
            .clone()
            .or_else(|| self.prototype.clone())
            .unwrap_or_default();
        let explicit = self.params.is_some() || self.returns.is_some();

        if let Some(prototype) = &self.prototype {
            if self.name.is_some() || self.signature.is_some() || explicit {
                return Err(ManifestError::AmbiguousSignature { name: label });
            }
            return Ok(builder.prototype(prototype.clone()));
        }

        let name = self.name.clone().unwrap_or_default();
        match (&self.signature, explicit) {
            (Some(_), true) => Err(ManifestError::AmbiguousSignature { name: label }),
            (Some(sig), false) => Ok(builder.symbol(name, sig.clone())),
            (None, true) => {
                let Some(returns) = self.returns else {
                    return Err(ManifestError::MissingSignature { name: label });
                };
                let params = self.params.clone().unwrap_or_default();
                Ok(builder.declare(name, params, returns))
            }
            (None, false) => Err(ManifestError::MissingSignature { name: label }),
        }
    }
}
