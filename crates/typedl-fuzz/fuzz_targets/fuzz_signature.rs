#![no_main]
use libfuzzer_sys::fuzz_target;
use typedl_core::{CType, MAX_ARITY, Signature, parse_prototype};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(sig) = Signature::parse(text) {
        assert!(sig.arity() <= MAX_ARITY);
        assert!(sig.params().iter().all(|p| !p.is_void()));
        // The canonical spelling parses back to the same signature.
        let again = Signature::parse(&sig.to_string()).expect("canonical form must parse");
        assert_eq!(again, sig);
    }

    if let Ok((name, sig)) = parse_prototype(text) {
        assert!(sig.arity() <= MAX_ARITY);
        if let Some(name) = name {
            assert!(!name.is_empty());
        }
    }

    if let Ok(ty) = CType::parse(text) {
        assert_eq!(CType::parse(ty.c_name()), Ok(ty));
    }
});
