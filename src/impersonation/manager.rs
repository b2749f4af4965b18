//! Scoped impersonation of a resolved identity
//!
//! A manager resolves its target identity once, at construction, and then
//! runs caller work under that identity with a guaranteed revert. All
//! execution paths are serialized per instance; the manager itself is
//! shareable across threads.

use crate::core::types::{ImpersonationOptions, TokenError, TokenResult};
use crate::impersonation::guard::ImpersonationGuard;
use crate::privilege;
use crate::token::identity::{resolve_identity, TokenIdentity};
use crate::token::{broker, duplication};
use crate::windows::types::AccessTokenHandle;
use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::RwLock;
use tokio::sync::{oneshot, Mutex};
use tracing::debug;
use winapi::um::winnt::HANDLE;

/// Lifecycle of an impersonation manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ManagerState {
    /// Identity resolved, no work running
    Idle,
    /// Caller work is executing under the impersonated identity
    Impersonating,
    /// Work finished, thread identity being restored
    Reverting,
    /// Terminal; the identity token has been released
    Disposed,
}

const STATE_IDLE: u8 = 0;
const STATE_IMPERSONATING: u8 = 1;
const STATE_REVERTING: u8 = 2;
const STATE_DISPOSED: u8 = 3;

struct ResolvedIdentity {
    token: AccessTokenHandle,
    identity: TokenIdentity,
}

/// Runs work under the identity of a session user or pipe client
pub struct ImpersonationManager {
    options: ImpersonationOptions,
    state: AtomicU8,
    resolved: RwLock<Option<ResolvedIdentity>>,
    // Serializes the run paths; observation never takes this lock
    gate: Mutex<()>,
}

impl ImpersonationManager {
    /// Impersonate the user logged on to a session
    ///
    /// Resolution happens here: token acquisition, the SYSTEM gate and
    /// privilege adjustment all complete before a manager exists, so a
    /// failure leaves nothing behind.
    pub fn for_session(session_id: u32, options: ImpersonationOptions) -> TokenResult<Self> {
        let base = broker::acquire_security_identification_token(session_id)?;
        Self::from_base_token(base, options)
    }

    /// Impersonate the client connected to a named pipe
    pub fn for_pipe_client(pipe: HANDLE, options: ImpersonationOptions) -> TokenResult<Self> {
        let base = broker::acquire_pipe_client_token(pipe)?;
        Self::from_base_token(base, options)
    }

    fn from_base_token(
        base: AccessTokenHandle,
        options: ImpersonationOptions,
    ) -> TokenResult<Self> {
        let token = duplication::create_impersonation_token(&base)?;
        let identity = resolve_identity(&token)?;

        if identity.is_system && !options.allows_system_impersonation() {
            return Err(TokenError::RestrictedImpersonation);
        }

        let identity = Self::apply_token_options(&token, &options, identity)?;
        debug!(identity = %identity, "impersonation identity resolved");

        Ok(ImpersonationManager {
            options,
            state: AtomicU8::new(STATE_IDLE),
            resolved: RwLock::new(Some(ResolvedIdentity { token, identity })),
            gate: Mutex::new(()),
        })
    }

    /// Adjust the token per the options, then re-read who it represents
    fn apply_token_options(
        token: &AccessTokenHandle,
        options: &ImpersonationOptions,
        identity: TokenIdentity,
    ) -> TokenResult<TokenIdentity> {
        let mut adjusted = false;

        if options.reduces_admin_privileges() && identity.is_admin {
            privilege::remove_all_privileges(token)?;
            privilege::set_standard_user_privileges(token, true)?;
            adjusted = true;
        }
        if !options.privileges_to_enable().is_empty() {
            privilege::adjust_privileges(token, options.privileges_to_enable(), true)?;
            adjusted = true;
        }
        if !options.privileges_to_disable().is_empty() {
            privilege::adjust_privileges(token, options.privileges_to_disable(), false)?;
            adjusted = true;
        }

        if adjusted {
            // The pre-adjustment identity is stale; discard it
            resolve_identity(token)
        } else {
            Ok(identity)
        }
    }

    /// Run work impersonated on the calling thread
    ///
    /// For synchronous callers; inside an async runtime use
    /// [`run_work_async`](Self::run_work_async).
    pub fn run_work<T>(&self, work: impl FnOnce() -> T) -> TokenResult<T> {
        let _permit = self.gate.blocking_lock();
        let _reset = StateReset { state: &self.state };

        let resolved = self.resolved.read().unwrap();
        let resolved = resolved
            .as_ref()
            .ok_or_else(|| TokenError::invalid_state("impersonation manager is disposed"))?;

        let guard = ImpersonationGuard::impersonate(&resolved.token)?;
        self.transition(STATE_IDLE, STATE_IMPERSONATING);
        let output = work();
        self.transition(STATE_IMPERSONATING, STATE_REVERTING);
        guard.revert()?;
        Ok(output)
    }

    /// Run work impersonated on a dedicated worker thread
    ///
    /// The worker receives its own duplicate of the identity token and
    /// reverts on that thread regardless of the outcome.
    pub fn run_work_on_thread<T, F>(&self, work: F) -> TokenResult<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let _permit = self.gate.blocking_lock();
        let _reset = StateReset { state: &self.state };
        let token = self.duplicate_identity_token()?;
        self.transition(STATE_IDLE, STATE_IMPERSONATING);

        let (sender, receiver) = std::sync::mpsc::channel();
        let worker = std::thread::spawn(move || {
            let result = run_impersonated(&token, work);
            let _ = sender.send(result);
        });

        let received = receiver.recv();
        let joined = worker.join();
        self.transition(STATE_IMPERSONATING, STATE_REVERTING);

        if joined.is_err() {
            return Err(TokenError::worker_failure("worker thread panicked"));
        }
        received.map_err(|_| TokenError::worker_failure("worker result channel closed"))?
    }

    /// Run work impersonated without blocking the async caller
    ///
    /// Dropping the returned future abandons only the wait; the worker
    /// thread still completes and reverts on its own.
    pub async fn run_work_async<T, F>(&self, work: F) -> TokenResult<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let _permit = self.gate.lock().await;
        let _reset = StateReset { state: &self.state };
        let token = self.duplicate_identity_token()?;
        self.transition(STATE_IDLE, STATE_IMPERSONATING);

        let (sender, receiver) = oneshot::channel();
        std::thread::spawn(move || {
            let result = run_impersonated(&token, work);
            let _ = sender.send(result);
        });

        let outcome = receiver
            .await
            .map_err(|_| TokenError::worker_failure("worker exited without a result"));
        self.transition(STATE_IMPERSONATING, STATE_REVERTING);
        outcome?
    }

    /// The identity this manager impersonates
    pub fn current_identity(&self) -> TokenResult<TokenIdentity> {
        let resolved = self.resolved.read().unwrap();
        resolved
            .as_ref()
            .map(|r| r.identity.clone())
            .ok_or_else(|| TokenError::invalid_state("impersonation manager is disposed"))
    }

    /// Options this manager was constructed with
    pub fn options(&self) -> &ImpersonationOptions {
        &self.options
    }

    pub fn state(&self) -> ManagerState {
        match self.state.load(Ordering::SeqCst) {
            STATE_IMPERSONATING => ManagerState::Impersonating,
            STATE_REVERTING => ManagerState::Reverting,
            STATE_DISPOSED => ManagerState::Disposed,
            _ => ManagerState::Idle,
        }
    }

    pub fn is_impersonating(&self) -> bool {
        self.state() == ManagerState::Impersonating
    }

    /// Release the identity token and end this manager's life
    ///
    /// Waits for in-flight current-thread work to finish. Idempotent.
    pub fn dispose(&self) {
        self.state.store(STATE_DISPOSED, Ordering::SeqCst);
        let mut resolved = self.resolved.write().unwrap();
        if let Some(mut resolved) = resolved.take() {
            resolved.token.release();
        }
    }

    // Disposed is terminal; a transition never overwrites it
    fn transition(&self, from: u8, to: u8) {
        let _ = self
            .state
            .compare_exchange(from, to, Ordering::SeqCst, Ordering::SeqCst);
    }

    fn duplicate_identity_token(&self) -> TokenResult<AccessTokenHandle> {
        let resolved = self.resolved.read().unwrap();
        let resolved = resolved
            .as_ref()
            .ok_or_else(|| TokenError::invalid_state("impersonation manager is disposed"))?;
        duplication::create_impersonation_token(&resolved.token)
    }
}

impl Drop for ImpersonationManager {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Resets the observed state to Idle on every exit path, unless disposed
struct StateReset<'a> {
    state: &'a AtomicU8,
}

impl Drop for StateReset<'_> {
    fn drop(&mut self) {
        let _ = self.state.compare_exchange(
            STATE_IMPERSONATING,
            STATE_IDLE,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        let _ = self.state.compare_exchange(
            STATE_REVERTING,
            STATE_IDLE,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }
}

/// Worker-side body shared by the thread and async run paths
fn run_impersonated<T>(
    token: &AccessTokenHandle,
    work: impl FnOnce() -> T,
) -> TokenResult<T> {
    let guard = ImpersonationGuard::impersonate(token)?;
    let output = work();
    guard.revert()?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::windows::bindings::advapi32;
    use winapi::um::winnt::{TOKEN_DUPLICATE, TOKEN_QUERY};

    // Managers over the current process identity: the constructors need a
    // logged-on session, so these tests assemble the manager directly.
    fn manager_for_self() -> ImpersonationManager {
        let base = advapi32::current_process_token(TOKEN_QUERY | TOKEN_DUPLICATE)
            .expect("process token");
        ImpersonationManager::from_base_token(
            base,
            ImpersonationOptions::new().allow_system_impersonation(true),
        )
        .expect("manager")
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_run_work_returns_output() {
        let manager = manager_for_self();
        let result = manager.run_work(|| 21 * 2).unwrap();
        assert_eq!(result, 42);
        assert_eq!(manager.state(), ManagerState::Idle);
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_run_work_reverts_thread() {
        let manager = manager_for_self();
        manager.run_work(|| ()).unwrap();
        assert!(advapi32::current_thread_token(TOKEN_QUERY).is_err());
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_run_work_on_thread() {
        let manager = manager_for_self();
        let result = manager.run_work_on_thread(|| "done".to_string()).unwrap();
        assert_eq!(result, "done");
        assert_eq!(manager.state(), ManagerState::Idle);
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_worker_panic_reported() {
        let manager = manager_for_self();
        let result: TokenResult<()> = manager.run_work_on_thread(|| panic!("boom"));
        assert!(matches!(result, Err(TokenError::WorkerFailure(_))));
        // Instance remains usable
        assert_eq!(manager.run_work(|| 7).unwrap(), 7);
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_dispose_fails_fast() {
        let manager = manager_for_self();
        manager.dispose();
        assert_eq!(manager.state(), ManagerState::Disposed);
        assert!(matches!(
            manager.run_work(|| ()),
            Err(TokenError::InvalidState(_))
        ));
        assert!(manager.current_identity().is_err());
        // Idempotent
        manager.dispose();
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_dispose_during_work_stays_disposed() {
        use std::sync::{Arc, Barrier};

        let manager = Arc::new(manager_for_self());
        let barrier = Arc::new(Barrier::new(2));
        let worker = {
            let manager = Arc::clone(&manager);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                manager.run_work(|| {
                    barrier.wait();
                    std::thread::sleep(std::time::Duration::from_millis(50));
                    7
                })
            })
        };

        // Dispose while the worker is mid-impersonation; it waits for the
        // in-flight work, and the terminal state must survive the finish
        barrier.wait();
        manager.dispose();
        assert_eq!(worker.join().unwrap().unwrap(), 7);
        assert_eq!(manager.state(), ManagerState::Disposed);
        assert!(manager.current_identity().is_err());
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_panicking_work_still_reverts() {
        let manager = manager_for_self();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _: TokenResult<()> = manager.run_work(|| panic!("boom"));
        }));
        assert!(outcome.is_err());
        // The unwind dropped the guard, so the thread carries no token
        assert!(advapi32::current_thread_token(TOKEN_QUERY).is_err());
        assert_eq!(manager.state(), ManagerState::Idle);
        assert_eq!(manager.run_work(|| 3).unwrap(), 3);
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_current_identity() {
        let manager = manager_for_self();
        let identity = manager.current_identity().unwrap();
        assert!(identity.sid.starts_with("S-1-"));
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    async fn test_run_work_async() {
        let manager = manager_for_self();
        let result = manager.run_work_async(|| 5 + 5).await.unwrap();
        assert_eq!(result, 10);
        assert_eq!(manager.state(), ManagerState::Idle);
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    async fn test_async_worker_panic_reported() {
        let manager = manager_for_self();
        let result: TokenResult<()> = manager.run_work_async(|| panic!("boom")).await;
        assert!(matches!(result, Err(TokenError::WorkerFailure(_))));
        assert_eq!(manager.state(), ManagerState::Idle);
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&ManagerState::Impersonating).unwrap();
        assert_eq!(json, "\"Impersonating\"");
    }
}
