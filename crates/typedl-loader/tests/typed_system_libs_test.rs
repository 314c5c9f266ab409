//! Integration test: typed calls into system libraries
//!
//! Validates that:
//! 1. Declared libm and libc functions can be called with their Rust types.
//! 2. A declared symbol absent from the library reports SymbolNotFound.
//! 3. A library that cannot be opened reports LoadError with a kind: missing
//!    paths are NotFound, files that are not shared objects are Malformed.
//! 4. A shared typed handle can be used from many threads.
//!
//! Tests skip (with a note on stderr) when libm.so.6 / libc.so.6 are absent.
//!
//! Run: cargo test -p typedl-loader --test typed_system_libs_test

use std::ffi::c_char;
use std::thread;

use typedl_loader::{
    CallError, DeclaredLibrary, LoadErrorKind, TypedLibrary, declare_library,
};

declare_library! {
    /// The C math library.
    struct Libm = "libm.so.6";
    unsafe extern "C" {
        fn cos(x: f64) -> f64;
        fn ldexp(x: f64, exp: i32) -> f64;
        fn fabsf(x: f32) -> f32;
        /// Not exported by any libm.
        fn typedl_not_in_libm(x: f64) -> f64;
    }
}

declare_library! {
    struct Libc = "libc.so.6";
    unsafe extern "C" {
        fn abs(x: i32) -> i32;
        fn labs(x: isize) -> isize;
        fn strlen(s: *const c_char) -> usize;
    }
}

fn open<L: DeclaredLibrary>() -> Option<TypedLibrary<L>> {
    match TypedLibrary::<L>::open() {
        Ok(lib) => Some(lib),
        Err(e) => {
            eprintln!("skipping: {e}");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Calls
// ---------------------------------------------------------------------------

#[test]
fn libm_functions_return_expected_values() {
    let Some(libm) = open::<Libm>() else { return };
    assert_eq!(libm.call(Libm::cos, (0.0,)).unwrap(), 1.0);
    assert_eq!(libm.call(Libm::ldexp, (1.5, 2)).unwrap(), 6.0);
    assert_eq!(libm.call(Libm::fabsf, (-2.5f32,)).unwrap(), 2.5);
}

#[test]
fn libc_integer_and_pointer_arguments() {
    let Some(libc) = open::<Libc>() else { return };
    assert_eq!(libc.call(Libc::abs, (-7,)).unwrap(), 7);
    assert_eq!(libc.call(Libc::labs, (-9,)).unwrap(), 9);
    let text = c"typedl";
    assert_eq!(libc.call(Libc::strlen, (text.as_ptr(),)).unwrap(), 6);
}

#[test]
fn repeated_calls_reuse_the_resolved_address() {
    let Some(libm) = open::<Libm>() else { return };
    let first = libm.get(Libm::cos).unwrap();
    let second = libm.get(Libm::cos).unwrap();
    assert_eq!(first as usize, second as usize);
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn declared_but_missing_symbol_is_symbol_not_found() {
    let Some(libm) = open::<Libm>() else { return };
    let err = libm.call(Libm::typedl_not_in_libm, (1.0,)).unwrap_err();
    match err {
        CallError::SymbolNotFound { symbol, library, .. } => {
            assert_eq!(symbol, "typedl_not_in_libm");
            assert_eq!(library, "libm.so.6");
        }
        other => panic!("expected SymbolNotFound, got {other:?}"),
    }
    // The handle stays usable after a failed resolve.
    assert_eq!(libm.call(Libm::cos, (0.0,)).unwrap(), 1.0);
}

#[test]
fn missing_library_is_load_error_not_found() {
    let err = TypedLibrary::<Libm>::open_at("/nonexistent/typedl/libm-missing.so").unwrap_err();
    assert_eq!(err.path, "/nonexistent/typedl/libm-missing.so");
    assert_eq!(err.kind, LoadErrorKind::NotFound, "{}", err.detail);
}

fn scratch_dir(tag: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("typedl-{tag}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

#[test]
fn non_object_files_are_malformed() {
    let dir = scratch_dir("malformed");
    let text = dir.join("libtext.so");
    std::fs::write(&text, "this is not an ELF object\n").unwrap();
    let empty = dir.join("libempty.so");
    std::fs::write(&empty, "").unwrap();

    for path in [&text, &empty] {
        let path = path.to_str().unwrap();
        let err = TypedLibrary::<Libm>::open_at(path).unwrap_err();
        assert_eq!(err.path, path);
        assert_eq!(err.kind, LoadErrorKind::Malformed, "{}", err.detail);
    }
}

#[cfg(target_os = "linux")]
#[test]
fn directory_is_malformed() {
    let dir = scratch_dir("dir-as-lib");
    let err = TypedLibrary::<Libm>::open_at(dir.to_str().unwrap()).unwrap_err();
    assert_eq!(err.kind, LoadErrorKind::Malformed, "{}", err.detail);
}

#[test]
fn path_with_interior_nul_is_invalid_path() {
    let err = TypedLibrary::<Libm>::open_at("libm\0.so").unwrap_err();
    assert_eq!(err.kind, LoadErrorKind::InvalidPath);
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn shared_handle_serves_concurrent_callers() {
    let Some(libm) = open::<Libm>() else { return };
    let libm = libm.into_shared();
    let workers: Vec<_> = (0..8)
        .map(|i| {
            let libm = libm.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    let x = libm.call(Libm::ldexp, (1.0, i)).unwrap();
                    assert_eq!(x, f64::from(1u32 << i));
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
}
