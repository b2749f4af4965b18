//! Privilege adjustment and inspection on access tokens
//!
//! All multi-privilege changes go through a single batched
//! AdjustTokenPrivileges call. When the OS accepts the call but cannot
//! assign everything, the token is re-queried and the outcome is reported
//! per privilege instead of silently passing.

use crate::core::types::{Privilege, TokenError, TokenResult};
use crate::windows::bindings::advapi32;
use crate::windows::types::AccessTokenHandle;
use serde::Serialize;
use std::mem;
use std::ptr;
use tracing::debug;
use winapi::um::winnt::{
    TokenPrivileges, LUID, LUID_AND_ATTRIBUTES, SE_PRIVILEGE_ENABLED, TOKEN_ADJUST_PRIVILEGES,
    TOKEN_PRIVILEGES, TOKEN_QUERY,
};

/// State of a privilege on a particular token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PrivilegeState {
    /// Privilege is present and enabled
    Enabled,
    /// Privilege is present but disabled
    Disabled,
    /// Privilege is not available to the token
    NotPresent,
}

/// One privilege slot of a token, by resolved system name
#[derive(Debug, Clone, Serialize)]
pub struct TokenPrivilegeEntry {
    pub name: String,
    pub enabled: bool,
}

/// Enable or disable a set of privileges on a token in one batch
///
/// Logon rights and privileges unknown to this machine are collected as
/// failures up front; they never reach the OS call. Any failure yields
/// [`TokenError::PartialPrivilegeAdjustment`] naming both sides.
pub fn adjust_privileges(
    token: &AccessTokenHandle,
    privileges: &[Privilege],
    enable: bool,
) -> TokenResult<()> {
    if privileges.is_empty() {
        return Ok(());
    }

    let mut resolved: Vec<(Privilege, LUID)> = Vec::with_capacity(privileges.len());
    let mut failed: Vec<Privilege> = Vec::new();
    for &privilege in privileges {
        if privilege.is_logon_right() {
            debug!(privilege = %privilege, "logon rights cannot be toggled on a token");
            failed.push(privilege);
            continue;
        }
        match advapi32::lookup_privilege_value(privilege.system_name()) {
            Ok(luid) => resolved.push((privilege, luid)),
            Err(_) => {
                debug!(privilege = %privilege, "privilege unknown on this machine");
                failed.push(privilege);
            }
        }
    }

    if resolved.is_empty() {
        if failed.is_empty() {
            return Ok(());
        }
        return Err(TokenError::PartialPrivilegeAdjustment {
            succeeded: Vec::new(),
            failed,
        });
    }

    let attributes = if enable { SE_PRIVILEGE_ENABLED } else { 0 };
    let count = resolved.len();
    let byte_len = mem::size_of::<TOKEN_PRIVILEGES>()
        + count.saturating_sub(1) * mem::size_of::<LUID_AND_ATTRIBUTES>();
    let mut buffer = vec![0u8; byte_len];

    let all_assigned = unsafe {
        let state = buffer.as_mut_ptr() as *mut TOKEN_PRIVILEGES;
        (*state).PrivilegeCount = count as u32;
        let array = (*state).Privileges.as_mut_ptr();
        for (index, (_, luid)) in resolved.iter().enumerate() {
            *array.add(index) = LUID_AND_ATTRIBUTES {
                Luid: *luid,
                Attributes: attributes,
            };
        }
        advapi32::adjust_token_privileges(token.raw(), false, state)?
    };

    if all_assigned && failed.is_empty() {
        return Ok(());
    }

    let mut succeeded: Vec<Privilege> = Vec::with_capacity(count);
    if all_assigned {
        succeeded.extend(resolved.iter().map(|(privilege, _)| *privilege));
    } else {
        // Not all assigned: re-read the token and classify each request
        let slots = token_privilege_slots(token)?;
        for (privilege, luid) in &resolved {
            let actual = slots
                .iter()
                .find(|slot| luids_equal(&slot.Luid, luid))
                .map(|slot| slot.Attributes & SE_PRIVILEGE_ENABLED != 0);
            let applied = match (enable, actual) {
                (true, Some(true)) => true,
                (true, _) => false,
                (false, Some(true)) => false,
                (false, _) => true,
            };
            if applied {
                succeeded.push(*privilege);
            } else {
                failed.push(*privilege);
            }
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(TokenError::PartialPrivilegeAdjustment { succeeded, failed })
    }
}

/// Disable every privilege a token carries in a single call
pub fn remove_all_privileges(token: &AccessTokenHandle) -> TokenResult<()> {
    unsafe {
        advapi32::adjust_token_privileges(token.raw(), true, ptr::null_mut())?;
    }
    Ok(())
}

/// Toggle the privileges a plain standard-user token carries
pub fn set_standard_user_privileges(token: &AccessTokenHandle, enable: bool) -> TokenResult<()> {
    adjust_privileges(token, &Privilege::STANDARD_USER, enable)
}

/// Inspect a single privilege's state on a token
pub fn privilege_status(
    token: &AccessTokenHandle,
    privilege: Privilege,
) -> TokenResult<PrivilegeState> {
    if privilege.is_logon_right() {
        return Ok(PrivilegeState::NotPresent);
    }
    let luid = match advapi32::lookup_privilege_value(privilege.system_name()) {
        Ok(luid) => luid,
        Err(_) => return Ok(PrivilegeState::NotPresent),
    };

    let slots = token_privilege_slots(token)?;
    for slot in slots {
        if luids_equal(&slot.Luid, &luid) {
            return Ok(if slot.Attributes & SE_PRIVILEGE_ENABLED != 0 {
                PrivilegeState::Enabled
            } else {
                PrivilegeState::Disabled
            });
        }
    }
    Ok(PrivilegeState::NotPresent)
}

/// List every privilege slot on a token with its resolved system name
pub fn list_privileges(token: &AccessTokenHandle) -> TokenResult<Vec<TokenPrivilegeEntry>> {
    let slots = token_privilege_slots(token)?;
    let mut entries = Vec::with_capacity(slots.len());
    for slot in slots {
        let name = advapi32::lookup_privilege_name(slot.Luid)
            .unwrap_or_else(|_| format!("LUID {}:{}", slot.Luid.HighPart, slot.Luid.LowPart));
        entries.push(TokenPrivilegeEntry {
            name,
            enabled: slot.Attributes & SE_PRIVILEGE_ENABLED != 0,
        });
    }
    Ok(entries)
}

/// Enable a privilege on the current process token
pub fn ensure_privilege_enabled(privilege: Privilege) -> TokenResult<()> {
    let token = advapi32::current_process_token(TOKEN_ADJUST_PRIVILEGES | TOKEN_QUERY)?;
    adjust_privileges(&token, &[privilege], true)
}

/// Whether the current process token holds a privilege, enabled or not
pub fn current_process_has_privilege(privilege: Privilege) -> TokenResult<bool> {
    let token = advapi32::current_process_token(TOKEN_QUERY)?;
    Ok(privilege_status(&token, privilege)? != PrivilegeState::NotPresent)
}

fn token_privilege_slots(token: &AccessTokenHandle) -> TokenResult<Vec<LUID_AND_ATTRIBUTES>> {
    let buffer = advapi32::token_information(token.raw(), TokenPrivileges, "TokenPrivileges")?;
    unsafe {
        let state = buffer.as_ptr() as *const TOKEN_PRIVILEGES;
        let slots = std::slice::from_raw_parts(
            (*state).Privileges.as_ptr(),
            (*state).PrivilegeCount as usize,
        );
        Ok(slots.to_vec())
    }
}

fn luids_equal(a: &LUID, b: &LUID) -> bool {
    a.LowPart == b.LowPart && a.HighPart == b.HighPart
}
