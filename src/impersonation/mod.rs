//! Impersonation primitives and the scoped manager

pub mod guard;
pub mod manager;

pub use guard::ImpersonationGuard;
pub use manager::{ImpersonationManager, ManagerState};
