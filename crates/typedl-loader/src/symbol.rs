//! Compile-time symbol declarations.
//!
//! A library type implementing [`DeclaredLibrary`] carries a closed table of
//! declarations; each declaration is reachable as a [`Symbol<L, F>`] constant
//! whose `F` is the exact `unsafe extern "C" fn` type of the export. Both are
//! normally produced by [`declare_library!`](crate::declare_library).

use std::ffi::c_void;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use typedl_core::{CType, StaticDecl};

mod sealed {
    pub trait Sealed {}
}

/// Rust types with a fixed C scalar counterpart.
///
/// The mapping follows the Rust type, not the C spelling it aliases. Declare
/// C `long` and `unsigned long` parameters as `isize`/`usize`, which map to
/// [`CType::Isize`]/[`CType::Usize`] like the manifest spellings `long` and
/// `unsigned long`. `std::ffi::c_long` is an alias of a fixed-width integer
/// (`i64` on LP64 targets) and maps to that width instead, so a declaration
/// written with it compares unequal to the manifest form of the same
/// prototype even though both call the function correctly.
pub trait FfiType: Copy + sealed::Sealed {
    const CTYPE: CType;
}

/// [`FfiType`]s that may appear as parameters (everything except `()`).
pub trait FfiArg: FfiType {}

macro_rules! ffi_scalar {
    ($($ty:ty => $ctype:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}
            impl FfiType for $ty {
                const CTYPE: CType = CType::$ctype;
            }
            impl FfiArg for $ty {}
        )*
    };
}

ffi_scalar! {
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    isize => Isize,
    usize => Usize,
    f32 => F32,
    f64 => F64,
}

impl sealed::Sealed for () {}
impl FfiType for () {
    const CTYPE: CType = CType::Void;
}

impl<T> sealed::Sealed for *const T {}
impl<T> FfiType for *const T {
    const CTYPE: CType = CType::Pointer;
}
impl<T> FfiArg for *const T {}

impl<T> sealed::Sealed for *mut T {}
impl<T> FfiType for *mut T {
    const CTYPE: CType = CType::Pointer;
}
impl<T> FfiArg for *mut T {}

/// An `unsafe extern "C" fn` pointer type usable as a declared signature.
///
/// # Safety
///
/// `PARAMS` and `RETURNS` must describe `Self` exactly, and `from_address`
/// must reinterpret a code address as `Self` without changing it.
pub unsafe trait FnSignature: Copy {
    /// Argument tuple accepted by [`invoke`](Self::invoke).
    type Args;
    type Output;

    const PARAMS: &'static [CType];
    const RETURNS: CType;

    /// Reinterpret `addr` as a function of this type.
    ///
    /// # Safety
    ///
    /// `addr` must be the entry point of a function with exactly this ABI.
    unsafe fn from_address(addr: NonNull<c_void>) -> Self;

    /// Call the function.
    ///
    /// # Safety
    ///
    /// Same contract as calling the underlying `unsafe extern "C" fn`.
    unsafe fn invoke(self, args: Self::Args) -> Self::Output;
}

macro_rules! fn_signature {
    ($($arg:ident $val:ident),*) => {
        unsafe impl<R: FfiType, $($arg: FfiArg),*> FnSignature for unsafe extern "C" fn($($arg),*) -> R {
            type Args = ($($arg,)*);
            type Output = R;

            const PARAMS: &'static [CType] = &[$($arg::CTYPE),*];
            const RETURNS: CType = R::CTYPE;

            unsafe fn from_address(addr: NonNull<c_void>) -> Self {
                // SAFETY: function pointers and data pointers have the same size
                // and representation on every unix target.
                unsafe { std::mem::transmute_copy::<*mut c_void, Self>(&addr.as_ptr()) }
            }

            unsafe fn invoke(self, args: Self::Args) -> R {
                let ($($val,)*) = args;
                unsafe { (self)($($val),*) }
            }
        }
    };
}

fn_signature!();
fn_signature!(A a);
fn_signature!(A a, B b);
fn_signature!(A a, B b, C c);
fn_signature!(A a, B b, C c, D d);
fn_signature!(A a, B b, C c, D d, E e);
fn_signature!(A a, B b, C c, D d, E e, G g);

/// A library type with a compile-time declaration table.
pub trait DeclaredLibrary: 'static {
    /// Default path or platform library name.
    const PATH: &'static str;
    /// Declarations, indexed by [`Symbol::index`].
    const SYMBOLS: &'static [StaticDecl];
}

/// One declaration of library `L`, typed as the function pointer `F`.
///
/// A `Symbol<L, F>` can only be used with a handle for `L`; there is no way to
/// name a symbol `L` did not declare.
pub struct Symbol<L, F> {
    index: usize,
    name: &'static str,
    _marker: PhantomData<(fn() -> L, F)>,
}

impl<L, F> Symbol<L, F> {
    /// Used by `declare_library!`.
    ///
    /// # Safety
    ///
    /// `index` must be the position of a declaration named `name` in
    /// `L::SYMBOLS`, declared with the parameter and return types of `F`.
    #[doc(hidden)]
    pub const unsafe fn __declare(index: usize, name: &'static str) -> Self {
        Self {
            index,
            name,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<L, F: FnSignature> Symbol<L, F> {
    #[must_use]
    pub const fn decl(&self) -> StaticDecl {
        StaticDecl::new(self.name, F::PARAMS, F::RETURNS)
    }
}

impl<L, F> Clone for Symbol<L, F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<L, F> Copy for Symbol<L, F> {}

impl<L, F> fmt::Debug for Symbol<L, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Symbol")
            .field("index", &self.index)
            .field("name", &self.name)
            .finish()
    }
}
