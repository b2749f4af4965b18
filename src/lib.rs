//! Session-Broker library for Windows session and token management

pub mod core;
pub mod impersonation;
pub mod privilege;
pub mod session;
pub mod token;
pub mod windows;

// Re-export main types from core module
pub use crate::core::types::{
    ConnectState, ExtendedSessionRecord, ImpersonationOptions, Privilege, RawSession,
    SessionFlags, SessionRecord, TokenError, TokenResult,
};

pub use crate::impersonation::{ImpersonationGuard, ImpersonationManager, ManagerState};
pub use crate::token::TokenIdentity;

// Re-export core directly for full access
pub use crate::core::{AUTHORS, VERSION};
