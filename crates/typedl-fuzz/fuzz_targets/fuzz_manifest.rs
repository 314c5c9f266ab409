#![no_main]
use libfuzzer_sys::fuzz_target;
use typedl_core::Manifest;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(manifest) = Manifest::from_json(text) else {
        return;
    };
    let Ok(descriptor) = manifest.to_descriptor() else {
        return;
    };

    // Every id the descriptor hands out resolves back to its declaration.
    for (id, decl) in descriptor.iter() {
        assert_eq!(descriptor.symbol(id), Some(decl));
        assert_eq!(id.descriptor(), descriptor.id());
    }

    // A descriptor re-exported as a manifest declares the same symbols.
    let rebuilt = Manifest::from_descriptor(&descriptor)
        .to_descriptor()
        .expect("exported manifest must build");
    assert_eq!(rebuilt.len(), descriptor.len());
    assert_ne!(rebuilt.id(), descriptor.id());
    for ((_, a), (_, b)) in rebuilt.iter().zip(descriptor.iter()) {
        assert_eq!(a, b);
    }
});
