//! `declare_library!`.

/// Declare a library type and its symbols.
///
/// ```
/// typedl_loader::declare_library! {
///     /// The C math library.
///     pub struct Libm = "libm.so.6";
///     unsafe extern "C" {
///         pub fn cos(x: f64) -> f64;
///         pub fn ldexp(x: f64, exp: i32) -> f64;
///     }
/// }
///
/// use typedl_loader::DeclaredLibrary;
/// assert_eq!(Libm::SYMBOLS.len(), 2);
/// assert_eq!(Libm::ldexp.name(), "ldexp");
/// assert_eq!(Libm::ldexp.index(), 1);
/// ```
///
/// This expands to a unit struct `Libm` implementing
/// [`DeclaredLibrary`](crate::DeclaredLibrary), plus one associated constant
/// per function, of type
/// [`Symbol<Libm, unsafe extern "C" fn(..) -> ..>`](crate::Symbol). The
/// `unsafe extern "C"` block is where the ABI is asserted: each signature is
/// trusted when the symbol is called, and a wrong one is undefined behaviour.
///
/// Symbol names must be unique within one declaration. Functions without a
/// `->` return `void`. At most six parameters are supported.
#[macro_export]
macro_rules! declare_library {
    (@ret) => { () };
    (@ret $ret:ty) => { $ret };

    (
        $(#[$meta:meta])*
        $vis:vis struct $lib:ident = $path:expr;
        unsafe extern "C" {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis fn $name:ident ( $($arg:ident : $argty:ty),* $(,)? ) $(-> $ret:ty)? ;
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis struct $lib;

        const _: () = {
            #[allow(non_camel_case_types, dead_code)]
            enum __Index {
                $($name,)*
            }

            impl $crate::DeclaredLibrary for $lib {
                const PATH: &'static str = $path;
                const SYMBOLS: &'static [$crate::StaticDecl] = &[
                    $(
                        $crate::StaticDecl::new(
                            ::core::stringify!($name),
                            <unsafe extern "C" fn($($argty),*) -> $crate::declare_library!(@ret $($ret)?)
                                as $crate::FnSignature>::PARAMS,
                            <unsafe extern "C" fn($($argty),*) -> $crate::declare_library!(@ret $($ret)?)
                                as $crate::FnSignature>::RETURNS,
                        ),
                    )*
                ];
            }

            #[allow(non_upper_case_globals)]
            impl $lib {
                $(
                    $(#[$fmeta])*
                    $fvis const $name: $crate::Symbol<
                        $lib,
                        unsafe extern "C" fn($($argty),*) -> $crate::declare_library!(@ret $($ret)?),
                    > = unsafe {
                        // SAFETY: `__Index::$name` is this declaration's position
                        // in `SYMBOLS`, built from the same signature.
                        $crate::Symbol::__declare(__Index::$name as usize, ::core::stringify!($name))
                    };
                )*
            }
        };
    };
}
