//! Custom error types for Session-Broker

use crate::core::types::Privilege;
use std::fmt;
use thiserror::Error;

/// Main error type for session and token operations
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("{operation} failed for {target}: {source}")]
    NativeQuery {
        operation: &'static str,
        target: String,
        source: windows::core::Error,
    },

    #[error("privilege adjustment incomplete: {} adjusted, {} failed", succeeded.len(), failed.len())]
    PartialPrivilegeAdjustment {
        succeeded: Vec<Privilege>,
        failed: Vec<Privilege>,
    },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("impersonating the SYSTEM account requires explicit opt-in")]
    RestrictedImpersonation,

    #[error("no SYSTEM process available in session {session_id}")]
    NoSystemProcess { session_id: u32 },

    #[error("session not found: {0}")]
    SessionNotFound(u32),

    #[error("unknown privilege: {0}")]
    UnknownPrivilege(String),

    #[error("worker thread failed: {0}")]
    WorkerFailure(String),

    #[error("Windows API error: {0}")]
    WindowsApiError(#[from] windows::core::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("UTF-8 conversion error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for session and token operations
pub type TokenResult<T> = Result<T, TokenError>;

impl TokenError {
    /// Creates a native-query error capturing the thread's last OS error
    pub fn native(operation: &'static str, target: impl fmt::Display) -> Self {
        TokenError::NativeQuery {
            operation,
            target: target.to_string(),
            source: windows::core::Error::from_win32(),
        }
    }

    /// Creates a native-query error targeting a session id
    pub fn native_for_session(operation: &'static str, session_id: u32) -> Self {
        Self::native(operation, format!("session {}", session_id))
    }

    /// Creates an invalid-state error
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        TokenError::InvalidState(reason.into())
    }

    /// Creates a worker-failure error
    pub fn worker_failure(reason: impl Into<String>) -> Self {
        TokenError::WorkerFailure(reason.into())
    }

    /// The OS error code behind this error, when one was captured
    pub fn os_code(&self) -> Option<i32> {
        match self {
            TokenError::NativeQuery { source, .. } => Some(source.code().0),
            TokenError::WindowsApiError(source) => Some(source.code().0),
            _ => None,
        }
    }
}
