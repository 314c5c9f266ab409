//! Typed handles for libraries declared with `declare_library!`.

use std::marker::PhantomData;
use std::sync::Arc;

use typedl_core::{LibraryDescriptor, LoaderConfig, SymbolId};

use crate::error::{CallError, CloseError, LoadError};
use crate::library::LoadedLibrary;
use crate::observe::{LoaderEvent, observe};
use crate::symbol::{DeclaredLibrary, FnSignature, Symbol};

/// An open library of declared type `L`.
///
/// Calls take [`Symbol<L, F>`] constants and arguments of `F`'s Rust types,
/// so the symbol set and the argument types are both fixed at compile time.
#[derive(Debug)]
pub struct TypedLibrary<L> {
    inner: LoadedLibrary,
    _lib: PhantomData<fn() -> L>,
}

impl<L: DeclaredLibrary> TypedLibrary<L> {
    /// Open `L` at its declared path.
    pub fn open() -> Result<Self, LoadError> {
        Self::open_at(L::PATH)
    }

    /// Open `L`'s declarations against the object at `path`.
    pub fn open_at(path: &str) -> Result<Self, LoadError> {
        Self::open_at_with(path, LoaderConfig::global())
    }

    pub fn open_at_with(path: &str, config: &LoaderConfig) -> Result<Self, LoadError> {
        let descriptor = LibraryDescriptor::from_static(path, L::SYMBOLS)
            .map_err(|e| LoadError::invalid_path(path, e))?;
        Ok(Self {
            inner: LoadedLibrary::open_with(descriptor, config)?,
            _lib: PhantomData,
        })
    }

    fn id_of<F>(&self, symbol: Symbol<L, F>) -> Result<SymbolId, CallError> {
        // Present by construction of `Symbol<L, _>`; checked anyway so a
        // hand-written `DeclaredLibrary` impl cannot index out of bounds.
        self.inner
            .descriptor()
            .id_at(symbol.index())
            .ok_or_else(|| CallError::SymbolNotFound {
                symbol: symbol.name().to_string(),
                library: self.inner.descriptor().path().to_string(),
                detail: "declaration index out of range".to_string(),
            })
    }

    /// Typed function pointer for `symbol`.
    ///
    /// The pointer is only valid while this library stays open.
    pub fn get<F: FnSignature>(&self, symbol: Symbol<L, F>) -> Result<F, CallError> {
        let addr = self.inner.resolve(self.id_of(symbol)?)?;
        // SAFETY: `symbol` was declared for `L` inside an `unsafe extern "C"`
        // block, whose author asserted the export has signature `F`.
        Ok(unsafe { F::from_address(addr) })
    }

    /// Resolve `symbol` and call it with `args`.
    ///
    /// The declared signature is trusted: if it does not match the export's
    /// real ABI the behaviour is undefined. Nothing at runtime can detect that.
    pub fn call<F: FnSignature>(
        &self,
        symbol: Symbol<L, F>,
        args: F::Args,
    ) -> Result<F::Output, CallError> {
        let f = self.get(symbol)?;
        observe(LoaderEvent::Call);
        // SAFETY: see `get`; the library stays open for the whole call.
        Ok(unsafe { f.invoke(args) })
    }

    /// The untyped handle underneath.
    #[must_use]
    pub fn library(&self) -> &LoadedLibrary {
        &self.inner
    }

    pub fn close(self) -> Result<(), CloseError> {
        self.inner.close()
    }

    #[must_use]
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}
