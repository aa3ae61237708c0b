//! Mobile bindings for `otpkit-core`.
//!
//! This crate compiles the core library with its `ffi` feature and re-exports
//! the resulting `UniFFI` scaffolding, so a single static or dynamic library
//! carries everything a Swift or Kotlin host needs: the `SecureItemStore` and
//! `Logger` traits to implement, and `set_logger` to call at launch.

pub use otpkit_core::*;

otpkit_core::uniffi_reexport_scaffolding!();
