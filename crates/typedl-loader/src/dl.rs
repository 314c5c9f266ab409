//! Raw platform loader calls.
//!
//! Thin wrappers over `dlopen`, `dlsym`, `dlclose` and `dlerror` from the
//! system `libdl` via `libc`. Every call that can fail runs under one
//! process-wide lock together with the `dlerror` read, so the message we
//! report always belongs to our own failure.

use std::ffi::{CStr, c_int, c_void};
use std::ptr::NonNull;

use parking_lot::Mutex;
use typedl_core::LoaderConfig;
use typedl_core::dlfcn::{
    BindMode, ERR_INVALID_HANDLE, ERR_NOT_FOUND, ERR_SYMBOL_NOT_FOUND, Visibility,
};

use crate::observe::{LoaderEvent, observe};

static DL_LOCK: Mutex<()> = parking_lot::const_mutex(());

/// Platform dlopen flags for `config`.
///
/// Values come from `libc`, so they are correct for the build target. Exactly
/// one binding mode is always set.
pub(crate) fn platform_flags(config: &LoaderConfig) -> c_int {
    let bind = match config.bind {
        BindMode::Now => libc::RTLD_NOW,
        BindMode::Lazy => libc::RTLD_LAZY,
    };
    let visibility = match config.visibility {
        Visibility::Local => libc::RTLD_LOCAL,
        Visibility::Global => libc::RTLD_GLOBAL,
    };
    let mut flags = bind | visibility;
    if config.no_delete {
        flags |= libc::RTLD_NODELETE;
    }
    flags
}

/// Take the pending `dlerror` message, if any. Caller holds `DL_LOCK`.
fn take_error() -> Option<String> {
    // SAFETY: dlerror returns null or a NUL-terminated string valid until the
    // next dl* call on this thread; we copy it out before releasing the lock.
    let msg = unsafe { libc::dlerror() };
    if msg.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned())
}

/// An open OS library handle. `dlclose` runs exactly once: on drop, or in
/// [`RawHandle::close`].
#[derive(Debug)]
pub(crate) struct RawHandle(NonNull<c_void>);

// SAFETY: dl handles are process-global tokens; dlsym and dlclose are
// thread-safe on every supported libc.
unsafe impl Send for RawHandle {}
unsafe impl Sync for RawHandle {}

impl RawHandle {
    pub(crate) fn open(path: &CStr, flags: c_int) -> Result<Self, String> {
        let _guard = DL_LOCK.lock();
        let _ = take_error();
        // SAFETY: `path` is NUL-terminated; dlopen runs the object's
        // initialisers, which is inherent to loading it.
        let handle = unsafe { libc::dlopen(path.as_ptr(), flags) };
        match NonNull::new(handle) {
            Some(handle) => {
                observe(LoaderEvent::Open);
                Ok(Self(handle))
            }
            None => {
                observe(LoaderEvent::OpenFailed);
                Err(take_error().unwrap_or_else(|| ERR_NOT_FOUND.to_string()))
            }
        }
    }

    /// Address of `name`. A symbol whose address is null is reported as missing.
    pub(crate) fn symbol(&self, name: &CStr) -> Result<NonNull<c_void>, String> {
        let _guard = DL_LOCK.lock();
        let _ = take_error();
        // SAFETY: the handle is open for as long as `self` lives.
        let addr = unsafe { libc::dlsym(self.0.as_ptr(), name.as_ptr()) };
        NonNull::new(addr).ok_or_else(|| {
            take_error().unwrap_or_else(|| {
                format!("{ERR_SYMBOL_NOT_FOUND}: {}", name.to_string_lossy())
            })
        })
    }

    pub(crate) fn close(self) -> Result<(), String> {
        let handle = self.0;
        std::mem::forget(self);
        close_raw(handle)
    }
}

impl Drop for RawHandle {
    fn drop(&mut self) {
        // Errors on implicit release have nowhere to go; they are counted.
        let _ = close_raw(self.0);
    }
}

fn close_raw(handle: NonNull<c_void>) -> Result<(), String> {
    let _guard = DL_LOCK.lock();
    let _ = take_error();
    // SAFETY: `handle` came from a successful dlopen and is released once.
    let rc = unsafe { libc::dlclose(handle.as_ptr()) };
    if rc == 0 {
        observe(LoaderEvent::Close);
        Ok(())
    } else {
        observe(LoaderEvent::CloseFailed);
        Err(take_error().unwrap_or_else(|| ERR_INVALID_HANDLE.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_flags_bind_now_locally() {
        let flags = platform_flags(&LoaderConfig::default());
        assert_eq!(flags, libc::RTLD_NOW | libc::RTLD_LOCAL);
    }

    #[test]
    fn every_setting_reaches_the_flags() {
        let cfg = LoaderConfig {
            bind: BindMode::Lazy,
            visibility: Visibility::Global,
            no_delete: true,
            ..LoaderConfig::default()
        };
        let flags = platform_flags(&cfg);
        assert_eq!(
            flags,
            libc::RTLD_LAZY | libc::RTLD_GLOBAL | libc::RTLD_NODELETE
        );
        assert_eq!(flags & libc::RTLD_NOW, 0);
    }

    #[test]
    fn open_missing_path_reports_dlerror() {
        let path = c"/nonexistent/typedl/libmissing.so";
        let err = RawHandle::open(path, libc::RTLD_NOW).unwrap_err();
        assert!(err.contains("libmissing.so") || err == ERR_NOT_FOUND, "{err}");
    }

    #[test]
    fn self_handle_resolves_and_closes() {
        // A null path opens the main program, which always succeeds.
        let handle = unsafe { libc::dlopen(std::ptr::null(), libc::RTLD_NOW) };
        let handle = RawHandle(NonNull::new(handle).expect("main program handle"));
        assert!(handle.symbol(c"typedl_no_such_symbol_anywhere").is_err());
        handle.close().unwrap();
    }
}
