//! Fundamental types shared across the crate

pub mod error;
pub mod options;
pub mod privilege;
pub mod session;

pub use error::{TokenError, TokenResult};
pub use options::ImpersonationOptions;
pub use privilege::Privilege;
pub use session::{
    ConnectState, ExtendedSessionRecord, RawSession, SessionFlags, SessionRecord,
};
