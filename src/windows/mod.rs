//! Windows API layer for session and token operations
//!
//! Provides safe wrappers around the Windows security and terminal
//! services APIs. All unsafe FFI calls are contained within this module
//! with proper error handling and validation.

pub mod bindings;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use types::{AccessTokenHandle, ProcessHandle, WtsServerHandle};

// Re-export key bindings
pub use bindings::{advapi32, userenv, wtsapi32};
