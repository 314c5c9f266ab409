//! Dynamic linking open modes.
//!
//! Platform-independent descriptions of how an object is opened. The loader
//! crate maps them to the target's `RTLD_*` values from `libc` and makes the
//! actual dlopen/dlsym/dlclose calls.

/// When function references in the opened object are bound.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindMode {
    /// Resolve everything at open time; unresolvable references fail the open.
    #[default]
    Now,
    /// Resolve function references on first call.
    Lazy,
}

impl BindMode {
    /// Parse from string (case-insensitive). Unknown values yield the default.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "lazy" | "deferred" => Self::Lazy,
            _ => Self::Now,
        }
    }
}

/// Whether the object's symbols are made available to later loads.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    #[default]
    Local,
    Global,
}

impl Visibility {
    /// Parse from string (case-insensitive). Unknown values yield the default.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" | "shared" => Self::Global,
            _ => Self::Local,
        }
    }
}

/// Error message strings used when the platform gives no `dlerror` text.
pub const ERR_NOT_FOUND: &str = "shared object not found";
pub const ERR_SYMBOL_NOT_FOUND: &str = "undefined symbol";
pub const ERR_INVALID_HANDLE: &str = "invalid handle";
