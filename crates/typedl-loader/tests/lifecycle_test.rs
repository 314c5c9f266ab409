//! Integration test: handle lifecycle
//!
//! Validates that:
//! 1. Every successful open is released exactly once (drop or close).
//! 2. Open, close, open again works for the same library.
//! 3. A shared handle is released when the last owner drops, not before.
//! 4. Failed opens are counted and leave nothing to release.
//!
//! The loader counters are process-wide, so this binary holds a single test
//! and checks exact deltas.
//!
//! Run: cargo test -p typedl-loader --test lifecycle_test

use std::sync::Arc;

use typedl_loader::{LoaderStats, TypedLibrary, declare_library, snapshot};

declare_library! {
    struct Libm = "libm.so.6";
    unsafe extern "C" {
        fn cos(x: f64) -> f64;
    }
}

fn delta(before: LoaderStats) -> LoaderStats {
    let now = snapshot();
    LoaderStats {
        opens: now.opens - before.opens,
        open_failures: now.open_failures - before.open_failures,
        resolves: now.resolves - before.resolves,
        cache_hits: now.cache_hits - before.cache_hits,
        resolve_failures: now.resolve_failures - before.resolve_failures,
        calls: now.calls - before.calls,
        closes: now.closes - before.closes,
        close_failures: now.close_failures - before.close_failures,
    }
}

#[test]
fn handles_are_released_exactly_once() {
    let start = snapshot();
    let first = match TypedLibrary::<Libm>::open() {
        Ok(lib) => lib,
        Err(e) => {
            eprintln!("skipping: {e}");
            return;
        }
    };

    // -- explicit close, then reopen ----------------------------------------
    assert_eq!(first.call(Libm::cos, (0.0,)).unwrap(), 1.0);
    first.close().unwrap();
    let d = delta(start);
    assert_eq!((d.opens, d.closes), (1, 1));
    assert_eq!((d.resolves, d.calls), (1, 1));

    let second = TypedLibrary::<Libm>::open().unwrap();
    assert_eq!(second.call(Libm::cos, (0.0,)).unwrap(), 1.0);
    assert_eq!(second.call(Libm::cos, (0.0,)).unwrap(), 1.0);
    drop(second);
    let d = delta(start);
    assert_eq!((d.opens, d.closes), (2, 2));
    assert_eq!(d.cache_hits, 1);

    // -- shared handle --------------------------------------------------------
    let shared = TypedLibrary::<Libm>::open().unwrap().into_shared();
    let clones: Vec<_> = (0..4).map(|_| Arc::clone(&shared)).collect();
    drop(shared);
    assert_eq!(delta(start).closes, 2, "released while clones remain");
    for clone in &clones {
        assert_eq!(clone.call(Libm::cos, (0.0,)).unwrap(), 1.0);
    }
    drop(clones);
    let d = delta(start);
    assert_eq!((d.opens, d.closes), (3, 3));

    // -- failed open ------------------------------------------------------------
    assert!(TypedLibrary::<Libm>::open_at("/nonexistent/typedl/libm.so").is_err());
    let d = delta(start);
    assert_eq!(d.open_failures, 1);
    assert_eq!(d.opens, d.closes);
    assert_eq!(d.close_failures, 0);
}
