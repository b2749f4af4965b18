//! Acquiring session and channel-peer tokens
//!
//! The broker hands out the primary token of the user logged on to a
//! session. With SeTcbPrivilege the WTS query is direct; without it the
//! broker borrows the identity of a SYSTEM process living in the target
//! session, impersonates it just long enough for the query, and reverts.

use crate::core::types::{Privilege, TokenError, TokenResult};
use crate::impersonation::guard::ImpersonationGuard;
use crate::privilege;
use crate::token::duplication;
use crate::windows::bindings::{advapi32, wtsapi32};
use crate::windows::types::{AccessTokenHandle, ProcessHandle};
use std::mem;
use tracing::debug;
use winapi::shared::minwindef::FALSE;
use winapi::um::handleapi::INVALID_HANDLE_VALUE;
use winapi::um::processthreadsapi::{OpenProcess, ProcessIdToSessionId};
use winapi::um::tlhelp32::{
    CreateToolhelp32Snapshot, Process32FirstW, Process32NextW, PROCESSENTRY32W,
    TH32CS_SNAPPROCESS,
};
use winapi::um::winnt::{
    HANDLE, TOKEN_ADJUST_PRIVILEGES, TOKEN_DUPLICATE, TOKEN_IMPERSONATE, TOKEN_QUERY,
};

/// The well-known SYSTEM process present in every interactive session
const SYSTEM_PROCESS_IMAGE: &str = "winlogon.exe";

/// Obtain the primary token of the user logged on to a session
///
/// Prefers the direct WTS query when SeTcbPrivilege can be enabled on the
/// current process; otherwise falls back to SYSTEM impersonation. The
/// calling thread's impersonation state is identical before and after
/// either path.
pub fn acquire_security_identification_token(
    session_id: u32,
) -> TokenResult<AccessTokenHandle> {
    if privilege::ensure_privilege_enabled(Privilege::Tcb).is_ok() {
        return wtsapi32::query_user_token(session_id);
    }

    debug!(session_id, "SeTcbPrivilege unavailable, borrowing a SYSTEM identity");
    if let Err(error) = privilege::ensure_privilege_enabled(Privilege::Debug) {
        // The SYSTEM process may still be openable without it
        debug!(error = %error, "could not enable SeDebugPrivilege");
    }

    let pid = find_system_process(session_id)?
        .ok_or(TokenError::NoSystemProcess { session_id })?;
    let system_primary = borrow_process_token(pid)?;

    let _guard = ImpersonationGuard::impersonate(&system_primary)?;
    // Reverted on every exit path by the guard
    wtsapi32::query_user_token(session_id)
}

/// Capture the identity of the client connected to a named pipe
pub fn acquire_pipe_client_token(pipe: HANDLE) -> TokenResult<AccessTokenHandle> {
    advapi32::impersonate_named_pipe_client(pipe)?;
    let guard = ImpersonationGuard::adopt();
    let token = advapi32::current_thread_token(
        TOKEN_QUERY | TOKEN_DUPLICATE | TOKEN_IMPERSONATE | TOKEN_ADJUST_PRIVILEGES,
    );
    drop(guard);
    token
}

/// Duplicate a primary token out of a process identified by pid
fn borrow_process_token(pid: u32) -> TokenResult<AccessTokenHandle> {
    unsafe {
        let raw = OpenProcess(winapi::um::winnt::PROCESS_QUERY_INFORMATION, FALSE, pid);
        if raw.is_null() {
            return Err(TokenError::native("OpenProcess", format!("pid {}", pid)));
        }
        let process = ProcessHandle::new(raw);
        let token =
            advapi32::open_process_token(process.raw(), TOKEN_QUERY | TOKEN_DUPLICATE)?;
        duplication::create_primary_token(&token)
    }
}

/// Find the pid of the well-known SYSTEM process in a session
pub fn find_system_process(session_id: u32) -> TokenResult<Option<u32>> {
    for (pid, name) in ProcessScan::new()? {
        if !name.eq_ignore_ascii_case(SYSTEM_PROCESS_IMAGE) {
            continue;
        }
        let mut pid_session: u32 = 0;
        let known = unsafe { ProcessIdToSessionId(pid, &mut pid_session) } != FALSE;
        if known && pid_session == session_id {
            return Ok(Some(pid));
        }
    }
    Ok(None)
}

/// Process scan over a ToolHelp32 snapshot
struct ProcessScan {
    snapshot: HANDLE,
    first_called: bool,
}

impl ProcessScan {
    fn new() -> TokenResult<Self> {
        unsafe {
            let snapshot = CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0);
            if snapshot.is_null() || snapshot == INVALID_HANDLE_VALUE {
                return Err(TokenError::native(
                    "CreateToolhelp32Snapshot",
                    "process snapshot",
                ));
            }
            Ok(ProcessScan {
                snapshot,
                first_called: false,
            })
        }
    }
}

impl Iterator for ProcessScan {
    type Item = (u32, String);

    fn next(&mut self) -> Option<Self::Item> {
        unsafe {
            let mut entry: PROCESSENTRY32W = mem::zeroed();
            entry.dwSize = mem::size_of::<PROCESSENTRY32W>() as u32;

            let success = if !self.first_called {
                self.first_called = true;
                Process32FirstW(self.snapshot, &mut entry)
            } else {
                Process32NextW(self.snapshot, &mut entry)
            };

            if success == FALSE {
                return None;
            }

            let name = crate::windows::utils::string_conv::wide_to_string(&entry.szExeFile);
            Some((entry.th32ProcessID, name))
        }
    }
}

impl Drop for ProcessScan {
    fn drop(&mut self) {
        if !self.snapshot.is_null() && self.snapshot != INVALID_HANDLE_VALUE {
            unsafe {
                winapi::um::handleapi::CloseHandle(self.snapshot);
            }
        }
    }
}
