//! Runtime-typed calls for descriptors built at startup (e.g. from manifests).
//!
//! Without a foreign-call library the argument list cannot be assembled at
//! runtime, so only the signature shapes listed in [`SHAPES`] can be invoked.
//! Every other declared signature still resolves, but calling it reports
//! [`CallError::UnsupportedSignature`].

use std::ffi::c_void;
use std::ptr::NonNull;

use typedl_core::{CType, Signature, SymbolId, Value};

use crate::error::CallError;
use crate::library::LoadedLibrary;
use crate::observe::{LoaderEvent, observe};

macro_rules! rust_ty {
    (Void) => { () };
    (I8) => { i8 };
    (U8) => { u8 };
    (I16) => { i16 };
    (U16) => { u16 };
    (I32) => { i32 };
    (U32) => { u32 };
    (I64) => { i64 };
    (U64) => { u64 };
    (Isize) => { isize };
    (Usize) => { usize };
    (F32) => { f32 };
    (F64) => { f64 };
    // Pointer-width integer; same ABI class as a data pointer on unix.
    (Pointer) => { usize };
}

macro_rules! wrap {
    (Void, $e:expr) => {{
        $e;
        Value::Void
    }};
    ($r:ident, $e:expr) => {
        Value::$r($e)
    };
}

macro_rules! take {
    ($it:ident, $p:ident) => {
        match $it.next() {
            Some(Value::$p(v)) => *v,
            _ => unreachable!("argument types are checked before dispatch"),
        }
    };
}

macro_rules! call_shapes {
    ($( ($($p:ident),*) -> $r:ident ),* $(,)?) => {
        /// Parameter and return types `call_dynamic` can dispatch.
        pub const SHAPES: &[(&[CType], CType)] = &[
            $( (&[$(CType::$p),*], CType::$r) ),*
        ];

        /// Call `addr` as `sig`, or `None` when `sig` has no shape.
        ///
        /// # Safety
        ///
        /// `addr` must be a function with signature `sig`, and `args` must
        /// match `sig`'s parameters.
        unsafe fn invoke(sig: &Signature, addr: NonNull<c_void>, args: &[Value]) -> Option<Value> {
            match (sig.params(), sig.returns()) {
                $(
                    (&[$(CType::$p),*], CType::$r) => {
                        type Shape = unsafe extern "C" fn($(rust_ty!($p)),*) -> rust_ty!($r);
                        // SAFETY: `addr` has signature `sig`, which is `Shape`.
                        let f = unsafe { std::mem::transmute_copy::<*mut c_void, Shape>(&addr.as_ptr()) };
                        #[allow(unused_mut, unused_variables)]
                        let mut it = args.iter();
                        Some(wrap!($r, unsafe { f($(take!(it, $p)),*) }))
                    }
                )*
                _ => None,
            }
        }
    };
}

call_shapes! {
    () -> Void,
    () -> I32,
    () -> U32,
    () -> I64,
    () -> Isize,
    () -> Usize,
    () -> F64,
    () -> Pointer,
    (I32) -> I32,
    (I32) -> Void,
    (I32) -> Pointer,
    (I32, I32) -> I32,
    (I32, I32, I32) -> I32,
    (U32) -> U32,
    (U32, U32) -> U32,
    (I64) -> I64,
    (I64, I64) -> I64,
    (I64, I64, I64) -> I64,
    (U64) -> U64,
    (U64, U64) -> U64,
    (Isize) -> Isize,
    (Isize, Isize) -> Isize,
    (Usize) -> Usize,
    (Usize) -> Pointer,
    (Usize, Usize) -> Usize,
    (Usize, Usize) -> Pointer,
    (Pointer) -> Void,
    (Pointer) -> I32,
    (Pointer) -> Isize,
    (Pointer) -> Usize,
    (Pointer) -> F64,
    (Pointer) -> Pointer,
    (Pointer, Pointer) -> I32,
    (Pointer, Pointer) -> Pointer,
    (Pointer, I32) -> Pointer,
    (Pointer, Usize) -> Pointer,
    (Pointer, Pointer, Usize) -> I32,
    (Pointer, Pointer, Usize) -> Pointer,
    (Pointer, I32, Usize) -> Pointer,
    (F32) -> F32,
    (F32, F32) -> F32,
    (F64) -> F64,
    (F64) -> I32,
    (F64) -> Isize,
    (F64, F64) -> F64,
    (F64, I32) -> F64,
    (F64, Isize) -> F64,
    (F64, F64, F64) -> F64,
}

/// Whether `sig` has a dynamic call shape.
#[must_use]
pub fn is_dispatchable(sig: &Signature) -> bool {
    SHAPES
        .iter()
        .any(|(params, ret)| sig.params() == *params && sig.returns() == *ret)
}

fn render(types: impl Iterator<Item = CType>) -> String {
    types.map(CType::c_name).collect::<Vec<_>>().join(", ")
}

impl LoadedLibrary {
    /// Call the declared symbol `id` with runtime-typed arguments.
    ///
    /// Arguments must match the declared parameter types exactly, in count and
    /// in type.
    ///
    /// # Safety
    ///
    /// The declaration behind `id` must match the real ABI of the export.
    /// A mismatch is undefined behaviour and cannot be detected.
    pub unsafe fn call_dynamic(&self, id: SymbolId, args: &[Value]) -> Result<Value, CallError> {
        let decl = self.declaration(id)?;
        let sig = decl.signature();
        let unsupported = || CallError::UnsupportedSignature {
            symbol: decl.name().to_string(),
            signature: sig.to_string(),
        };

        let matches = sig.arity() == args.len()
            && sig.params().iter().zip(args).all(|(p, a)| *p == a.ctype());
        if !matches {
            return Err(CallError::ArgumentMismatch {
                symbol: decl.name().to_string(),
                expected: render(sig.params().iter().copied()),
                actual: render(args.iter().map(Value::ctype)),
            });
        }
        if !is_dispatchable(sig) {
            return Err(unsupported());
        }

        let addr = self.resolve(id)?;
        observe(LoaderEvent::Call);
        // SAFETY: the caller vouches for the declaration; arguments were
        // checked against it above.
        unsafe { invoke(sig, addr, args) }.ok_or_else(unsupported)
    }
}
