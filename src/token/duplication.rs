//! Token duplication and information queries

use crate::core::types::{TokenError, TokenResult};
use crate::windows::bindings::advapi32;
use crate::windows::types::AccessTokenHandle;
use serde::Serialize;
use winapi::um::winnt::{
    SecurityImpersonation, TokenElevation, TokenElevationType, TokenImpersonation, TokenPrimary,
    TokenSessionId, TokenUser, PSID, TOKEN_ALL_ACCESS, TOKEN_DUPLICATE, TOKEN_QUERY, TOKEN_USER,
    WinBuiltinAdministratorsSid, WinLocalSystemSid,
};

const DUPLICATE_ACCESS: u32 = TOKEN_ALL_ACCESS | TOKEN_QUERY | TOKEN_DUPLICATE;

/// UAC elevation classification of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenElevationKind {
    /// No linked pair exists for the logon session
    Default,
    /// The elevated half of an admin-approval pair
    Full,
    /// The filtered half of an admin-approval pair
    Limited,
}

/// Duplicate to a primary token at SecurityImpersonation level
pub fn create_primary_token(token: &AccessTokenHandle) -> TokenResult<AccessTokenHandle> {
    advapi32::duplicate_token(
        token.raw(),
        DUPLICATE_ACCESS,
        SecurityImpersonation,
        TokenPrimary,
    )
}

/// Duplicate to an impersonation token at SecurityImpersonation level
pub fn create_impersonation_token(token: &AccessTokenHandle) -> TokenResult<AccessTokenHandle> {
    advapi32::duplicate_token(
        token.raw(),
        DUPLICATE_ACCESS,
        SecurityImpersonation,
        TokenImpersonation,
    )
}

/// The terminal-services session a token is bound to
pub fn token_session_id(token: &AccessTokenHandle) -> TokenResult<u32> {
    let buffer = advapi32::token_information(token.raw(), TokenSessionId, "TokenSessionId")?;
    if buffer.len() < 4 {
        return Err(TokenError::native("GetTokenInformation", "TokenSessionId"));
    }
    Ok(u32::from_le_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]))
}

/// Whether a token is currently elevated
pub fn is_token_elevated(token: &AccessTokenHandle) -> TokenResult<bool> {
    let buffer = advapi32::token_information(token.raw(), TokenElevation, "TokenElevation")?;
    if buffer.len() < 4 {
        return Err(TokenError::native("GetTokenInformation", "TokenElevation"));
    }
    Ok(u32::from_le_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) != 0)
}

/// UAC classification of a token
pub fn token_elevation_kind(token: &AccessTokenHandle) -> TokenResult<TokenElevationKind> {
    let buffer =
        advapi32::token_information(token.raw(), TokenElevationType, "TokenElevationType")?;
    if buffer.len() < 4 {
        return Err(TokenError::native("GetTokenInformation", "TokenElevationType"));
    }
    match u32::from_le_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) {
        2 => Ok(TokenElevationKind::Full),
        3 => Ok(TokenElevationKind::Limited),
        _ => Ok(TokenElevationKind::Default),
    }
}

/// The linked elevated token when this token is the filtered half of a pair
pub fn linked_elevated_token(
    token: &AccessTokenHandle,
) -> TokenResult<Option<AccessTokenHandle>> {
    if token_elevation_kind(token)? != TokenElevationKind::Limited {
        return Ok(None);
    }
    advapi32::linked_token(token.raw())
}

/// The linked filtered token when this token is the elevated half of a pair
pub fn linked_standard_token(
    token: &AccessTokenHandle,
) -> TokenResult<Option<AccessTokenHandle>> {
    if token_elevation_kind(token)? != TokenElevationKind::Full {
        return Ok(None);
    }
    advapi32::linked_token(token.raw())
}

/// The token user's SID in string form
pub fn token_user_sid(token: &AccessTokenHandle) -> TokenResult<String> {
    let buffer = advapi32::token_information(token.raw(), TokenUser, "TokenUser")?;
    unsafe {
        let user = &*(buffer.as_ptr() as *const TOKEN_USER);
        advapi32::sid_to_string(user.User.Sid)
    }
}

/// The account and domain names behind the token user's SID
pub fn token_account(token: &AccessTokenHandle) -> TokenResult<(String, String)> {
    let buffer = advapi32::token_information(token.raw(), TokenUser, "TokenUser")?;
    unsafe {
        let user = &*(buffer.as_ptr() as *const TOKEN_USER);
        advapi32::lookup_account_sid(user.User.Sid)
    }
}

/// Whether the token belongs to the LocalSystem account
pub fn is_token_system(token: &AccessTokenHandle) -> TokenResult<bool> {
    let system_sid = advapi32::create_well_known_sid(WinLocalSystemSid)?;
    let buffer = advapi32::token_information(token.raw(), TokenUser, "TokenUser")?;
    unsafe {
        let user = &*(buffer.as_ptr() as *const TOKEN_USER);
        Ok(advapi32::equal_sids(user.User.Sid, system_sid.as_ptr() as PSID))
    }
}

/// Whether the token's user belongs to BUILTIN\Administrators
///
/// The membership test needs an impersonation token, so the input is
/// duplicated first. A filtered UAC token that tests negative is retried
/// through its linked elevated half; absence of a linked token means the
/// account simply is not an administrator.
pub fn is_token_local_admin(token: &AccessTokenHandle) -> TokenResult<bool> {
    let admins_sid = advapi32::create_well_known_sid(WinBuiltinAdministratorsSid)?;
    let probe = create_impersonation_token(token)?;
    if advapi32::check_token_membership(probe.raw(), admins_sid.as_ptr() as PSID)? {
        return Ok(true);
    }

    match advapi32::linked_token(token.raw())? {
        Some(linked) => {
            let probe = create_impersonation_token(&linked)?;
            advapi32::check_token_membership(probe.raw(), admins_sid.as_ptr() as PSID)
        }
        None => Ok(false),
    }
}
