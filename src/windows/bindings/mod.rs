//! Windows API bindings
//!
//! Low-level FFI bindings to Windows system libraries.

pub mod advapi32;
pub mod userenv;
pub mod wtsapi32;
