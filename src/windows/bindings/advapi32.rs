//! Advapi32.dll bindings for token, privilege and SID operations

use crate::core::types::{TokenError, TokenResult};
use crate::windows::types::AccessTokenHandle;
use crate::windows::utils::string_conv::{string_to_wide, wide_ptr_to_string, wide_to_string};
use std::mem;
use std::ptr;
use winapi::shared::minwindef::{BOOL, DWORD, FALSE, LPVOID, TRUE};
use winapi::shared::winerror::{
    ERROR_INSUFFICIENT_BUFFER, ERROR_NOT_FOUND, ERROR_NO_SUCH_LOGON_SESSION,
};
use winapi::um::errhandlingapi::GetLastError;
use winapi::um::namedpipeapi::ImpersonateNamedPipeClient;
use winapi::um::processthreadsapi::{
    GetCurrentProcess, GetCurrentThread, OpenProcessToken, OpenThreadToken,
};
use winapi::um::sddl::ConvertSidToStringSidW;
use winapi::um::securitybaseapi::{
    AdjustTokenPrivileges, CheckTokenMembership, CreateWellKnownSid, DuplicateTokenEx, EqualSid,
    GetTokenInformation, ImpersonateLoggedOnUser, RevertToSelf,
};
use winapi::um::winbase::{
    LocalFree, LookupAccountNameW, LookupAccountSidW, LookupPrivilegeNameW, LookupPrivilegeValueW,
};
use winapi::um::winnt::{
    TokenLinkedToken, HANDLE, LUID, PSID, SECURITY_IMPERSONATION_LEVEL, SECURITY_MAX_SID_SIZE,
    SID_NAME_USE, TOKEN_INFORMATION_CLASS, TOKEN_LINKED_TOKEN, TOKEN_PRIVILEGES, TOKEN_TYPE,
    WELL_KNOWN_SID_TYPE,
};

/// Open a token on an arbitrary process handle
pub fn open_process_token(process: HANDLE, access: DWORD) -> TokenResult<AccessTokenHandle> {
    unsafe {
        let mut token: HANDLE = ptr::null_mut();
        if OpenProcessToken(process, access, &mut token) == FALSE {
            return Err(TokenError::native("OpenProcessToken", "process token"));
        }
        Ok(AccessTokenHandle::new(token))
    }
}

/// Open the current process's own token
pub fn current_process_token(access: DWORD) -> TokenResult<AccessTokenHandle> {
    unsafe { open_process_token(GetCurrentProcess(), access) }
}

/// Open the calling thread's impersonation token
///
/// Opens as self so the read is not subject to the impersonated context.
pub fn current_thread_token(access: DWORD) -> TokenResult<AccessTokenHandle> {
    unsafe {
        let mut token: HANDLE = ptr::null_mut();
        if OpenThreadToken(GetCurrentThread(), access, TRUE, &mut token) == FALSE {
            return Err(TokenError::native("OpenThreadToken", "thread token"));
        }
        Ok(AccessTokenHandle::new(token))
    }
}

/// Safe wrapper for DuplicateTokenEx
pub fn duplicate_token(
    token: HANDLE,
    access: DWORD,
    level: SECURITY_IMPERSONATION_LEVEL,
    token_type: TOKEN_TYPE,
) -> TokenResult<AccessTokenHandle> {
    unsafe {
        let mut duplicate: HANDLE = ptr::null_mut();
        if DuplicateTokenEx(
            token,
            access,
            ptr::null_mut(),
            level,
            token_type,
            &mut duplicate,
        ) == FALSE
        {
            return Err(TokenError::native("DuplicateTokenEx", "token"));
        }
        Ok(AccessTokenHandle::new(duplicate))
    }
}

/// Query token information as a raw buffer, sizing it in two calls
pub fn token_information(
    token: HANDLE,
    class: TOKEN_INFORMATION_CLASS,
    class_name: &'static str,
) -> TokenResult<Vec<u8>> {
    unsafe {
        let mut size: DWORD = 0;
        GetTokenInformation(token, class, ptr::null_mut(), 0, &mut size);
        if size == 0 || GetLastError() != ERROR_INSUFFICIENT_BUFFER {
            return Err(TokenError::native("GetTokenInformation", class_name));
        }

        let mut buffer = vec![0u8; size as usize];
        if GetTokenInformation(
            token,
            class,
            buffer.as_mut_ptr() as LPVOID,
            size,
            &mut size,
        ) == FALSE
        {
            return Err(TokenError::native("GetTokenInformation", class_name));
        }
        Ok(buffer)
    }
}

/// Query the linked token, when the logon session carries one
///
/// Absence of a linked token is reported by the OS through error codes
/// rather than an empty result; both map to `Ok(None)`.
pub fn linked_token(token: HANDLE) -> TokenResult<Option<AccessTokenHandle>> {
    unsafe {
        let mut linked: TOKEN_LINKED_TOKEN = mem::zeroed();
        let mut size: DWORD = 0;
        if GetTokenInformation(
            token,
            TokenLinkedToken,
            &mut linked as *mut _ as LPVOID,
            mem::size_of::<TOKEN_LINKED_TOKEN>() as DWORD,
            &mut size,
        ) == FALSE
        {
            return match GetLastError() {
                ERROR_NO_SUCH_LOGON_SESSION | ERROR_NOT_FOUND => Ok(None),
                _ => Err(TokenError::native("GetTokenInformation", "TokenLinkedToken")),
            };
        }
        Ok(Some(AccessTokenHandle::new(linked.LinkedToken)))
    }
}

/// Safe wrapper for AdjustTokenPrivileges
///
/// Returns `Ok(true)` when every requested change was applied and
/// `Ok(false)` when the OS accepted the call but could not assign all
/// privileges (ERROR_NOT_ALL_ASSIGNED).
///
/// # Safety
/// `new_state` must point to a properly laid out TOKEN_PRIVILEGES buffer,
/// or be null when `disable_all` is set.
pub unsafe fn adjust_token_privileges(
    token: HANDLE,
    disable_all: bool,
    new_state: *mut TOKEN_PRIVILEGES,
) -> TokenResult<bool> {
    let disable: BOOL = if disable_all { TRUE } else { FALSE };
    if AdjustTokenPrivileges(token, disable, new_state, 0, ptr::null_mut(), ptr::null_mut())
        == FALSE
    {
        return Err(TokenError::native("AdjustTokenPrivileges", "token"));
    }
    Ok(GetLastError() != winapi::shared::winerror::ERROR_NOT_ALL_ASSIGNED)
}

/// Resolve a privilege's locally unique identifier by system name
pub fn lookup_privilege_value(name: &str) -> TokenResult<LUID> {
    unsafe {
        let wide_name = string_to_wide(name);
        let mut luid = LUID {
            LowPart: 0,
            HighPart: 0,
        };
        if LookupPrivilegeValueW(ptr::null(), wide_name.as_ptr(), &mut luid) == FALSE {
            return Err(TokenError::UnknownPrivilege(name.to_string()));
        }
        Ok(luid)
    }
}

/// Resolve a privilege's system name from its LUID
pub fn lookup_privilege_name(luid: LUID) -> TokenResult<String> {
    unsafe {
        let mut luid = luid;
        let mut size: DWORD = 0;
        LookupPrivilegeNameW(ptr::null(), &mut luid, ptr::null_mut(), &mut size);
        if size == 0 {
            return Err(TokenError::native("LookupPrivilegeNameW", "LUID"));
        }

        let mut buffer = vec![0u16; size as usize];
        if LookupPrivilegeNameW(ptr::null(), &mut luid, buffer.as_mut_ptr(), &mut size) == FALSE {
            return Err(TokenError::native("LookupPrivilegeNameW", "LUID"));
        }
        Ok(wide_to_string(&buffer))
    }
}

/// Impersonate a token on the calling thread
pub fn impersonate_logged_on_user(token: HANDLE) -> TokenResult<()> {
    unsafe {
        if ImpersonateLoggedOnUser(token) == FALSE {
            return Err(TokenError::native("ImpersonateLoggedOnUser", "token"));
        }
        Ok(())
    }
}

/// End impersonation on the calling thread
pub fn revert_to_self() -> TokenResult<()> {
    unsafe {
        if RevertToSelf() == FALSE {
            return Err(TokenError::native("RevertToSelf", "calling thread"));
        }
        Ok(())
    }
}

/// Impersonate the client on the other end of a named pipe
pub fn impersonate_named_pipe_client(pipe: HANDLE) -> TokenResult<()> {
    unsafe {
        if ImpersonateNamedPipeClient(pipe) == FALSE {
            return Err(TokenError::native("ImpersonateNamedPipeClient", "pipe"));
        }
        Ok(())
    }
}

/// Test SID membership against an impersonation token
pub fn check_token_membership(token: HANDLE, sid: PSID) -> TokenResult<bool> {
    unsafe {
        let mut is_member: BOOL = FALSE;
        if CheckTokenMembership(token, sid, &mut is_member) == FALSE {
            return Err(TokenError::native("CheckTokenMembership", "token"));
        }
        Ok(is_member != FALSE)
    }
}

/// Build a well-known SID into an owned buffer
pub fn create_well_known_sid(kind: WELL_KNOWN_SID_TYPE) -> TokenResult<Vec<u8>> {
    unsafe {
        let mut buffer = vec![0u8; SECURITY_MAX_SID_SIZE as usize];
        let mut size = buffer.len() as DWORD;
        if CreateWellKnownSid(kind, ptr::null_mut(), buffer.as_mut_ptr() as PSID, &mut size)
            == FALSE
        {
            return Err(TokenError::native("CreateWellKnownSid", "well-known SID"));
        }
        buffer.truncate(size as usize);
        Ok(buffer)
    }
}

/// Compare two SIDs for equality
///
/// # Safety
/// Both pointers must reference valid SID structures.
pub unsafe fn equal_sids(a: PSID, b: PSID) -> bool {
    EqualSid(a, b) != FALSE
}

/// Render a SID in its string form (S-1-...)
///
/// # Safety
/// The pointer must reference a valid SID structure.
pub unsafe fn sid_to_string(sid: PSID) -> TokenResult<String> {
    let mut wide: *mut u16 = ptr::null_mut();
    if ConvertSidToStringSidW(sid, &mut wide) == FALSE {
        return Err(TokenError::native("ConvertSidToStringSidW", "SID"));
    }
    let result = wide_ptr_to_string(wide);
    LocalFree(wide as *mut _);
    Ok(result)
}

/// Resolve the account and domain names behind a SID
///
/// # Safety
/// The pointer must reference a valid SID structure.
pub unsafe fn lookup_account_sid(sid: PSID) -> TokenResult<(String, String)> {
    let mut name_size: DWORD = 0;
    let mut domain_size: DWORD = 0;
    let mut sid_use: SID_NAME_USE = 0;
    LookupAccountSidW(
        ptr::null(),
        sid,
        ptr::null_mut(),
        &mut name_size,
        ptr::null_mut(),
        &mut domain_size,
        &mut sid_use,
    );
    if name_size == 0 || GetLastError() != ERROR_INSUFFICIENT_BUFFER {
        return Err(TokenError::native("LookupAccountSidW", "SID"));
    }

    let mut name = vec![0u16; name_size as usize];
    let mut domain = vec![0u16; domain_size.max(1) as usize];
    if LookupAccountSidW(
        ptr::null(),
        sid,
        name.as_mut_ptr(),
        &mut name_size,
        domain.as_mut_ptr(),
        &mut domain_size,
        &mut sid_use,
    ) == FALSE
    {
        return Err(TokenError::native("LookupAccountSidW", "SID"));
    }
    Ok((wide_to_string(&name), wide_to_string(&domain)))
}

/// Resolve an account name (DOMAIN\user or plain user) to its SID bytes
pub fn lookup_account_name(account: &str) -> TokenResult<Vec<u8>> {
    unsafe {
        let wide_account = string_to_wide(account);
        let mut sid_size: DWORD = 0;
        let mut domain_size: DWORD = 0;
        let mut sid_use: SID_NAME_USE = 0;
        LookupAccountNameW(
            ptr::null(),
            wide_account.as_ptr(),
            ptr::null_mut(),
            &mut sid_size,
            ptr::null_mut(),
            &mut domain_size,
            &mut sid_use,
        );
        if sid_size == 0 || GetLastError() != ERROR_INSUFFICIENT_BUFFER {
            return Err(TokenError::native("LookupAccountNameW", account.to_string()));
        }

        let mut sid = vec![0u8; sid_size as usize];
        let mut domain = vec![0u16; domain_size.max(1) as usize];
        if LookupAccountNameW(
            ptr::null(),
            wide_account.as_ptr(),
            sid.as_mut_ptr() as PSID,
            &mut sid_size,
            domain.as_mut_ptr(),
            &mut domain_size,
            &mut sid_use,
        ) == FALSE
        {
            return Err(TokenError::native("LookupAccountNameW", account.to_string()));
        }
        Ok(sid)
    }
}
