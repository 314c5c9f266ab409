//! # typedl-loader
//!
//! Open shared libraries and call their exports through declarations that are
//! checked before anything is loaded.
//!
//! Two ways in:
//!
//! - **Typed.** [`declare_library!`] produces a library type and one
//!   [`Symbol`] constant per function. [`TypedLibrary::call`] only accepts
//!   symbols of its own library, with arguments of the declared Rust types,
//!   so a misspelled, undeclared or foreign symbol is a compile error.
//! - **Dynamic.** A [`LibraryDescriptor`] built at startup (for example from a
//!   JSON [`Manifest`]) is opened as a [`LoadedLibrary`]. Declarations are
//!   addressed by [`SymbolId`]; ids from another descriptor are rejected with
//!   [`CallError::UndeclaredSymbol`].
//!
//! Every handle releases its OS library exactly once, when dropped or
//! explicitly closed.
//!
//! ```no_run
//! use typedl_loader::{TypedLibrary, declare_library};
//!
//! declare_library! {
//!     pub struct Libm = "libm.so.6";
//!     unsafe extern "C" {
//!         pub fn cos(x: f64) -> f64;
//!         pub fn ldexp(x: f64, exp: i32) -> f64;
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let libm = TypedLibrary::<Libm>::open()?;
//! assert_eq!(libm.call(Libm::cos, (0.0,))?, 1.0);
//! assert_eq!(libm.call(Libm::ldexp, (1.5, 2))?, 6.0);
//! libm.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! Symbols of one library cannot be used with another:
//!
//! ```compile_fail
//! use typedl_loader::{TypedLibrary, declare_library};
//!
//! declare_library! {
//!     pub struct Libm = "libm.so.6";
//!     unsafe extern "C" { pub fn cos(x: f64) -> f64; }
//! }
//! declare_library! {
//!     pub struct Libc = "libc.so.6";
//!     unsafe extern "C" { pub fn abs(x: i32) -> i32; }
//! }
//!
//! let libm = TypedLibrary::<Libm>::open().unwrap();
//! let _ = libm.call(Libc::abs, (-1,));
//! ```
//!
//! Undeclared names do not exist:
//!
//! ```compile_fail
//! use typedl_loader::{TypedLibrary, declare_library};
//!
//! declare_library! {
//!     pub struct Libm = "libm.so.6";
//!     unsafe extern "C" { pub fn cos(x: f64) -> f64; }
//! }
//!
//! let libm = TypedLibrary::<Libm>::open().unwrap();
//! let _ = libm.call(Libm::sin, (0.0,));
//! ```
//!
//! Arguments must have the declared types:
//!
//! ```compile_fail
//! use typedl_loader::{TypedLibrary, declare_library};
//!
//! declare_library! {
//!     pub struct Libm = "libm.so.6";
//!     unsafe extern "C" { pub fn ldexp(x: f64, exp: i32) -> f64; }
//! }
//!
//! let libm = TypedLibrary::<Libm>::open().unwrap();
//! let _ = libm.call(Libm::ldexp, (1.5, 2.0));
//! ```

#![cfg(unix)]

mod dl;
pub mod dynamic;
pub mod error;
pub mod library;
mod macros;
pub mod observe;
pub mod symbol;
pub mod typed;

pub use error::{CallError, CloseError, LoadError, LoadErrorKind};
pub use library::{LoadedLibrary, SharedLibrary};
pub use observe::{LoaderEvent, LoaderStats, observe, snapshot};
pub use symbol::{DeclaredLibrary, FfiArg, FfiType, FnSignature, Symbol};
pub use typed::TypedLibrary;

pub use typedl_core::{
    CType, DescriptorBuilder, DescriptorError, LibraryDescriptor, LoaderConfig, Manifest,
    Signature, StaticDecl, SymbolDecl, SymbolId, Value,
};
