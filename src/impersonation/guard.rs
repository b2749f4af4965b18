//! RAII impersonation scope for the calling thread

use crate::core::types::TokenResult;
use crate::windows::bindings::advapi32;
use crate::windows::types::AccessTokenHandle;
use std::marker::PhantomData;
use tracing::error;

/// Active impersonation on the calling thread, reverted on drop
///
/// Thread-affine: the guard must be dropped on the thread that created it,
/// so it is deliberately `!Send`.
pub struct ImpersonationGuard {
    // Raw-pointer marker keeps the guard on its thread
    _not_send: PhantomData<*const ()>,
}

impl ImpersonationGuard {
    /// Impersonate a token on the calling thread
    pub fn impersonate(token: &AccessTokenHandle) -> TokenResult<Self> {
        advapi32::impersonate_logged_on_user(token.raw())?;
        Ok(ImpersonationGuard {
            _not_send: PhantomData,
        })
    }

    /// Adopt an impersonation already established on the calling thread,
    /// for example by ImpersonateNamedPipeClient
    pub fn adopt() -> Self {
        ImpersonationGuard {
            _not_send: PhantomData,
        }
    }

    /// Revert explicitly, surfacing the error the drop path would swallow
    pub fn revert(self) -> TokenResult<()> {
        std::mem::forget(self);
        advapi32::revert_to_self()
    }
}

impl Drop for ImpersonationGuard {
    fn drop(&mut self) {
        if let Err(err) = advapi32::revert_to_self() {
            // A thread stuck impersonating is a security hazard; make it loud
            error!(error = %err, "RevertToSelf failed while dropping impersonation guard");
        }
    }
}
