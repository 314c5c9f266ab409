//! Integration test: a purpose-built shared object
//!
//! Compiles a small C library with the system `cc` and validates that:
//! 1. A typed declaration of `int add(int, int)` returns 5 for (2, 3).
//! 2. Bare library names resolve through configured search paths.
//! 3. Library state persists across calls on one handle.
//! 4. Descriptors built at runtime call the same exports dynamically.
//! 5. A declaration the object does not export fails alone.
//!
//! Tests skip (with a note on stderr) when no C compiler is available.
//!
//! Run: cargo test -p typedl-loader --test compiled_fixture_test

use std::path::PathBuf;
use std::process::Command;
use std::sync::OnceLock;

use typedl_loader::{
    CallError, LibraryDescriptor, LoadedLibrary, LoaderConfig, TypedLibrary, Value,
    declare_library,
};

const SOURCE: &str = r"
int add(int a, int b) { return a + b; }
double scale(double x, long n) { return x * (double)n; }
static int counter;
int bump(void) { return ++counter; }
";

const LIB_NAME: &str = "libtypedl_fixture.so";

declare_library! {
    struct Fixture = "libtypedl_fixture.so";
    unsafe extern "C" {
        fn add(a: i32, b: i32) -> i32;
        fn scale(x: f64, n: isize) -> f64;
        fn bump() -> i32;
        fn subtract(a: i32, b: i32) -> i32;
    }
}

/// Directory holding the compiled fixture, or `None` when `cc` is missing.
fn fixture_dir() -> Option<&'static PathBuf> {
    static DIR: OnceLock<Option<PathBuf>> = OnceLock::new();
    DIR.get_or_init(|| {
        let dir = std::env::temp_dir().join(format!("typedl-fixture-{}", std::process::id()));
        std::fs::create_dir_all(&dir).ok()?;
        let src = dir.join("fixture.c");
        std::fs::write(&src, SOURCE).ok()?;
        let status = Command::new("cc")
            .args(["-shared", "-fPIC", "-o"])
            .arg(dir.join(LIB_NAME))
            .arg(&src)
            .status();
        match status {
            Ok(s) if s.success() => Some(dir),
            Ok(s) => {
                eprintln!("skipping: cc exited with {s}");
                None
            }
            Err(e) => {
                eprintln!("skipping: cc unavailable: {e}");
                None
            }
        }
    })
    .as_ref()
}

fn fixture_path() -> Option<String> {
    fixture_dir().map(|d| d.join(LIB_NAME).display().to_string())
}

#[test]
fn typed_add_returns_sum() {
    let Some(path) = fixture_path() else { return };
    let lib = TypedLibrary::<Fixture>::open_at(&path).unwrap();
    assert_eq!(lib.call(Fixture::add, (2, 3)).unwrap(), 5);
    assert_eq!(lib.call(Fixture::scale, (1.5, 4)).unwrap(), 6.0);
}

#[test]
fn bare_name_resolves_through_search_path() {
    let Some(dir) = fixture_dir() else { return };
    let config = LoaderConfig {
        search_paths: vec![PathBuf::from("/nonexistent/typedl"), dir.clone()],
        ..LoaderConfig::default()
    };
    let lib = TypedLibrary::<Fixture>::open_at_with(LIB_NAME, &config).unwrap();
    assert_eq!(lib.library().path(), dir.join(LIB_NAME));
    assert_eq!(lib.call(Fixture::add, (-4, 4)).unwrap(), 0);
}

#[test]
fn state_persists_within_one_handle() {
    let Some(path) = fixture_path() else { return };
    let lib = TypedLibrary::<Fixture>::open_at(&path).unwrap();
    let a = lib.call(Fixture::bump, ()).unwrap();
    let b = lib.call(Fixture::bump, ()).unwrap();
    assert_eq!(b, a + 1);
}

#[test]
fn unexported_declaration_fails_alone() {
    let Some(path) = fixture_path() else { return };
    let lib = TypedLibrary::<Fixture>::open_at(&path).unwrap();
    let err = lib.call(Fixture::subtract, (5, 3)).unwrap_err();
    assert!(matches!(err, CallError::SymbolNotFound { ref symbol, .. } if symbol == "subtract"));
    assert_eq!(lib.call(Fixture::add, (5, 3)).unwrap(), 8);
}

#[test]
fn runtime_descriptor_calls_dynamically() {
    let Some(path) = fixture_path() else { return };
    let descriptor = LibraryDescriptor::builder(path)
        .prototype("int add(int a, int b)")
        .prototype("double scale(double x, long n)")
        .build()
        .unwrap();
    let add = descriptor.find("add").unwrap();
    let scale = descriptor.find("scale").unwrap();
    let lib = LoadedLibrary::open(descriptor).unwrap();

    let sum = unsafe { lib.call_dynamic(add, &[Value::I32(2), Value::I32(3)]) }.unwrap();
    assert_eq!(sum, Value::I32(5));
    let scaled = unsafe { lib.call_dynamic(scale, &[Value::F64(2.5), Value::Isize(2)]) }.unwrap();
    assert_eq!(scaled, Value::F64(5.0));
    lib.close().unwrap();
}
