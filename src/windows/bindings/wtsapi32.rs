//! Wtsapi32.dll bindings for session enumeration and queries

use crate::core::types::{ConnectState, RawSession, TokenError, TokenResult};
use crate::windows::types::{AccessTokenHandle, WtsServerHandle};
use crate::windows::utils::string_conv::{string_to_wide, wide_ptr_to_string, wide_to_string};
use std::mem;
use std::ptr;
use winapi::shared::minwindef::{DWORD, FALSE};
use winapi::um::winnt::HANDLE;
use winapi::um::wtsapi32::{
    WTSEnumerateSessionsW, WTSFreeMemory, WTSOpenServerW, WTSQuerySessionInformationW,
    WTSQueryUserToken, PWTS_SESSION_INFOW, WTS_INFO_CLASS,
};

/// Open a named WTS server
pub fn open_server(name: &str) -> TokenResult<WtsServerHandle> {
    unsafe {
        let mut wide_name = string_to_wide(name);
        let handle = WTSOpenServerW(wide_name.as_mut_ptr());
        if handle.is_null() {
            return Err(TokenError::native("WTSOpenServerW", name.to_string()));
        }
        Ok(WtsServerHandle::from_raw(handle))
    }
}

/// Enumerate the raw session table of a server
pub fn enumerate_sessions(server: HANDLE) -> TokenResult<Vec<RawSession>> {
    unsafe {
        let mut info: PWTS_SESSION_INFOW = ptr::null_mut();
        let mut count: DWORD = 0;
        if WTSEnumerateSessionsW(server, 0, 1, &mut info, &mut count) == FALSE {
            return Err(TokenError::native("WTSEnumerateSessionsW", "server"));
        }

        let mut sessions = Vec::with_capacity(count as usize);
        for i in 0..count as isize {
            let entry = &*info.offset(i);
            sessions.push(RawSession {
                session_id: entry.SessionId,
                station_name: wide_ptr_to_string(entry.pWinStationName),
                state: ConnectState::from_wts(entry.State),
            });
        }
        WTSFreeMemory(info as *mut _);
        Ok(sessions)
    }
}

/// Query per-session information as a raw byte buffer
pub fn query_session_bytes(
    server: HANDLE,
    session_id: u32,
    class: WTS_INFO_CLASS,
    class_name: &'static str,
) -> TokenResult<Vec<u8>> {
    unsafe {
        let mut buffer: *mut u16 = ptr::null_mut();
        let mut bytes: DWORD = 0;
        if WTSQuerySessionInformationW(server, session_id, class, &mut buffer, &mut bytes)
            == FALSE
        {
            return Err(TokenError::native(
                "WTSQuerySessionInformationW",
                class_name,
            ));
        }
        let copy =
            std::slice::from_raw_parts(buffer as *const u8, bytes as usize).to_vec();
        WTSFreeMemory(buffer as *mut _);
        Ok(copy)
    }
}

/// Query a null-terminated wide-string session attribute
pub fn query_session_string(
    server: HANDLE,
    session_id: u32,
    class: WTS_INFO_CLASS,
    class_name: &'static str,
) -> TokenResult<String> {
    let bytes = query_session_bytes(server, session_id, class, class_name)?;
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    Ok(wide_to_string(&units))
}

/// Query a 32-bit session attribute
pub fn query_session_u32(
    server: HANDLE,
    session_id: u32,
    class: WTS_INFO_CLASS,
    class_name: &'static str,
) -> TokenResult<u32> {
    let bytes = query_session_bytes(server, session_id, class, class_name)?;
    if bytes.len() < 4 {
        return Err(TokenError::native("WTSQuerySessionInformationW", class_name));
    }
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Query a 16-bit session attribute
pub fn query_session_u16(
    server: HANDLE,
    session_id: u32,
    class: WTS_INFO_CLASS,
    class_name: &'static str,
) -> TokenResult<u16> {
    let bytes = query_session_bytes(server, session_id, class, class_name)?;
    if bytes.len() < 2 {
        return Err(TokenError::native("WTSQuerySessionInformationW", class_name));
    }
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

/// Query a boolean session attribute (the OS returns a single byte)
pub fn query_session_bool(
    server: HANDLE,
    session_id: u32,
    class: WTS_INFO_CLASS,
    class_name: &'static str,
) -> TokenResult<bool> {
    let bytes = query_session_bytes(server, session_id, class, class_name)?;
    match bytes.first() {
        Some(&value) => Ok(value != 0),
        None => Err(TokenError::native("WTSQuerySessionInformationW", class_name)),
    }
}

/// Query a fixed-layout session structure
pub fn query_session_struct<T: Copy>(
    server: HANDLE,
    session_id: u32,
    class: WTS_INFO_CLASS,
    class_name: &'static str,
) -> TokenResult<T> {
    let bytes = query_session_bytes(server, session_id, class, class_name)?;
    if bytes.len() < mem::size_of::<T>() {
        return Err(TokenError::native("WTSQuerySessionInformationW", class_name));
    }
    Ok(unsafe { ptr::read_unaligned(bytes.as_ptr() as *const T) })
}

/// Obtain the primary token of the user logged on to a session
///
/// Requires SeTcbPrivilege on the calling context.
pub fn query_user_token(session_id: u32) -> TokenResult<AccessTokenHandle> {
    unsafe {
        let mut token: HANDLE = ptr::null_mut();
        if WTSQueryUserToken(session_id, &mut token) == FALSE {
            return Err(TokenError::native_for_session("WTSQueryUserToken", session_id));
        }
        Ok(AccessTokenHandle::new(token))
    }
}
