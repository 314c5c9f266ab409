//! Opened libraries bound to their descriptors.

use std::ffi::{CString, c_void};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::Arc;

use parking_lot::Mutex;
use typedl_core::{LibraryDescriptor, LoaderConfig, SymbolDecl, SymbolId};

use crate::dl::{RawHandle, platform_flags};
use crate::error::{CallError, CloseError, LoadError};
use crate::observe::{LoaderEvent, observe};

/// Several owners of one open library; the handle is released when the last
/// clone drops.
pub type SharedLibrary = Arc<LoadedLibrary>;

/// An open shared object together with the descriptor it was opened from.
///
/// Only symbols declared in that descriptor can be resolved through this
/// handle. Addresses are looked up on first use and cached. The OS handle is
/// released exactly once, when this value is dropped or [`closed`](Self::close).
#[derive(Debug)]
pub struct LoadedLibrary {
    raw: RawHandle,
    descriptor: Arc<LibraryDescriptor>,
    path: PathBuf,
    // Resolved addresses by declaration index; 0 means not yet resolved.
    cache: Mutex<Vec<usize>>,
}

impl LoadedLibrary {
    /// Open `descriptor`'s library with the process-wide configuration.
    pub fn open(descriptor: impl Into<Arc<LibraryDescriptor>>) -> Result<Self, LoadError> {
        Self::open_with(descriptor, LoaderConfig::global())
    }

    /// Open `descriptor`'s library with an explicit configuration.
    pub fn open_with(
        descriptor: impl Into<Arc<LibraryDescriptor>>,
        config: &LoaderConfig,
    ) -> Result<Self, LoadError> {
        let descriptor = descriptor.into();
        let path = config.resolve_path(descriptor.path());
        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|e| LoadError::invalid_path(path.display().to_string(), e))?;
        let raw = RawHandle::open(&c_path, platform_flags(config))
            .map_err(|detail| LoadError::from_platform(path.display().to_string(), detail))?;
        let cache = Mutex::new(vec![0; descriptor.len()]);
        Ok(Self {
            raw,
            descriptor,
            path,
            cache,
        })
    }

    #[must_use]
    pub fn descriptor(&self) -> &LibraryDescriptor {
        &self.descriptor
    }

    /// Path handed to the platform loader, after search-path resolution.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The declaration behind `id`, if `id` belongs to this library's descriptor.
    pub fn declaration(&self, id: SymbolId) -> Result<&SymbolDecl, CallError> {
        self.descriptor
            .symbol(id)
            .ok_or_else(|| CallError::UndeclaredSymbol {
                id,
                library: self.descriptor.path().to_string(),
            })
    }

    /// Address of the declared symbol `id`.
    pub fn resolve(&self, id: SymbolId) -> Result<NonNull<c_void>, CallError> {
        let decl = self.declaration(id)?;

        if let Some(addr) = NonNull::new(self.cache.lock()[id.index()] as *mut c_void) {
            observe(LoaderEvent::ResolveCached);
            return Ok(addr);
        }

        let not_found = |detail: String| CallError::SymbolNotFound {
            symbol: decl.name().to_string(),
            library: self.descriptor.path().to_string(),
            detail,
        };
        // Names are NUL-free by descriptor validation.
        let name = CString::new(decl.name()).map_err(|e| not_found(e.to_string()))?;
        match self.raw.symbol(&name) {
            Ok(addr) => {
                observe(LoaderEvent::Resolve);
                self.cache.lock()[id.index()] = addr.as_ptr() as usize;
                Ok(addr)
            }
            Err(detail) => {
                observe(LoaderEvent::ResolveFailed);
                Err(not_found(detail))
            }
        }
    }

    /// Resolve every declaration, in declaration order.
    pub fn resolve_all(&self) -> Vec<(SymbolId, Result<NonNull<c_void>, CallError>)> {
        self.descriptor
            .iter()
            .map(|(id, _)| (id, self.resolve(id)))
            .collect()
    }

    /// Release the OS handle now, reporting a failing `dlclose`.
    pub fn close(self) -> Result<(), CloseError> {
        let Self { raw, path, .. } = self;
        raw.close().map_err(|detail| CloseError {
            path: path.display().to_string(),
            detail,
        })
    }

    #[must_use]
    pub fn into_shared(self) -> SharedLibrary {
        Arc::new(self)
    }
}
