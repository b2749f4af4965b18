//! Core module containing fundamental types for Session-Broker
//!
//! Provides the building blocks used throughout the crate: the error
//! taxonomy, the privilege catalog, session records and classification
//! flags, and impersonation options.

pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    ConnectState, ExtendedSessionRecord, ImpersonationOptions, Privilege, RawSession,
    SessionFlags, SessionRecord, TokenError, TokenResult,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

// Platform verification at compile time
#[cfg(not(target_os = "windows"))]
compile_error!("Session-Broker only supports Windows platform");
