//! Live session enumeration and derived queries
//!
//! Every query here runs a fresh enumeration; records are never cached.

use crate::core::types::{SessionRecord, TokenError, TokenResult};
use crate::session::classifier::{classify_sessions, SessionProbe};
use crate::token::{broker, duplication};
use crate::windows::bindings::wtsapi32;
use crate::windows::types::WtsServerHandle;
use tracing::warn;
use winapi::shared::minwindef::FALSE;
use winapi::um::processthreadsapi::{GetCurrentProcessId, ProcessIdToSessionId};
use winapi::um::winnt::HANDLE;
use winapi::um::wtsapi32::WTSIsRemoteSession;

/// Enumerate and classify the sessions of a server
///
/// `None` targets the local machine. Zero sessions is a valid empty
/// result; only the enumeration call itself failing is an error.
pub fn enumerate_sessions(server_name: Option<&str>) -> TokenResult<Vec<SessionRecord>> {
    let server = match server_name {
        Some(name) => wtsapi32::open_server(name)?,
        None => WtsServerHandle::local(),
    };
    let raw = wtsapi32::enumerate_sessions(server.raw())?;
    let mut probe = LiveProbe::new(server.raw(), server.is_local());
    Ok(classify_sessions(&raw, &mut probe))
}

/// All sessions currently carrying an active user
pub fn get_all_active_user_sessions(
    server_name: Option<&str>,
) -> TokenResult<Vec<SessionRecord>> {
    Ok(enumerate_sessions(server_name)?
        .into_iter()
        .filter(|s| s.is_active_user_session())
        .collect())
}

/// A single session by id, `None` when it does not exist
pub fn get_session_by_id(
    session_id: u32,
    server_name: Option<&str>,
) -> TokenResult<Option<SessionRecord>> {
    Ok(enumerate_sessions(server_name)?
        .into_iter()
        .find(|s| s.session_id == session_id))
}

/// The primary active user session, when one exists
pub fn get_primary_active_user_session(
    server_name: Option<&str>,
) -> TokenResult<Option<SessionRecord>> {
    Ok(enumerate_sessions(server_name)?
        .into_iter()
        .find(|s| s.is_primary_active_user_session()))
}

/// Id of the primary active user session
pub fn get_primary_active_user_session_id(
    server_name: Option<&str>,
) -> TokenResult<Option<u32>> {
    Ok(get_primary_active_user_session(server_name)?.map(|s| s.session_id))
}

/// The primary active session belonging to a local administrator
pub fn get_primary_active_local_admin_user_session(
    server_name: Option<&str>,
) -> TokenResult<Option<SessionRecord>> {
    Ok(enumerate_sessions(server_name)?
        .into_iter()
        .find(|s| s.is_primary_active_local_admin_user_session()))
}

/// Id of the primary active local-admin session
pub fn get_primary_active_local_admin_user_session_id(
    server_name: Option<&str>,
) -> TokenResult<Option<u32>> {
    Ok(get_primary_active_local_admin_user_session(server_name)?.map(|s| s.session_id))
}

/// The session the current process runs in
pub fn current_process_session_id() -> TokenResult<u32> {
    unsafe {
        let mut session_id: u32 = 0;
        if ProcessIdToSessionId(GetCurrentProcessId(), &mut session_id) == FALSE {
            return Err(TokenError::native("ProcessIdToSessionId", "current process"));
        }
        Ok(session_id)
    }
}

/// Probe implementation backed by the live OS
struct LiveProbe {
    server: HANDLE,
    local: bool,
}

impl LiveProbe {
    fn new(server: HANDLE, local: bool) -> Self {
        LiveProbe { server, local }
    }
}

impl SessionProbe for LiveProbe {
    fn is_local_admin(&mut self, session_id: u32) -> bool {
        // A probe failure (no logon, insufficient rights) classifies as
        // not-admin rather than failing the whole enumeration
        let result = broker::acquire_security_identification_token(session_id)
            .and_then(|token| duplication::is_token_local_admin(&token));
        match result {
            Ok(is_admin) => is_admin,
            Err(error) => {
                warn!(session_id, error = %error, "admin probe failed");
                false
            }
        }
    }

    fn remote_override(&mut self, session_id: u32) -> Option<bool> {
        if !self.local {
            return None;
        }
        wtsapi32::query_session_bool(
            self.server,
            session_id,
            WTSIsRemoteSession,
            "WTSIsRemoteSession",
        )
        .ok()
    }

    fn current_process_session(&self) -> Option<u32> {
        if !self.local {
            return None;
        }
        current_process_session_id().ok()
    }
}
