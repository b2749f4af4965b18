//! On-demand extended session information
//!
//! Built fresh on every call and never cached; the underlying data moves
//! with logons, reconnects and input.

use crate::core::types::{ConnectState, ExtendedSessionRecord, TokenError, TokenResult};
use crate::windows::bindings::{advapi32, wtsapi32};
use crate::windows::types::WtsServerHandle;
use crate::windows::utils::string_conv::wide_to_string;
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::debug;
use winapi::um::winnt::PSID;
use winapi::um::wtsapi32::{
    WTSClientAddress, WTSClientBuildNumber, WTSClientDirectory, WTSClientDisplay, WTSClientName,
    WTSClientProtocolType, WTSDomainName, WTSIsRemoteSession, WTSSessionInfo, WTSUserName,
    WTSINFOW, WTS_CLIENT_ADDRESS, WTS_CLIENT_DISPLAY,
};

const AF_INET: u32 = 2;

/// Query the extended record for one session
///
/// The account queries are authoritative: when they fail the session id is
/// treated as invalid and reported as [`TokenError::SessionNotFound`].
/// Client, display and timing attributes degrade to absent values, since
/// not every session type reports them.
pub fn get_extended_session_info(
    session_id: u32,
    server_name: Option<&str>,
) -> TokenResult<ExtendedSessionRecord> {
    let server = match server_name {
        Some(name) => wtsapi32::open_server(name)?,
        None => WtsServerHandle::local(),
    };
    let server = server.raw();

    let user_name =
        wtsapi32::query_session_string(server, session_id, WTSUserName, "WTSUserName")
            .map_err(|error| session_not_found(session_id, error))?;
    let domain_name =
        wtsapi32::query_session_string(server, session_id, WTSDomainName, "WTSDomainName")
            .map_err(|error| session_not_found(session_id, error))?;
    let account = if domain_name.is_empty() {
        user_name.clone()
    } else {
        format!("{}\\{}", domain_name, user_name)
    };

    let mut record = ExtendedSessionRecord {
        session_id,
        user_name,
        domain_name,
        account,
        ..Default::default()
    };

    if !record.account.is_empty() {
        record.sid = resolve_account_sid(&record.account);
    }

    record.client_name = optional(
        wtsapi32::query_session_string(server, session_id, WTSClientName, "WTSClientName"),
        session_id,
    )
    .filter(|name| !name.is_empty());
    record.client_directory = optional(
        wtsapi32::query_session_string(
            server,
            session_id,
            WTSClientDirectory,
            "WTSClientDirectory",
        ),
        session_id,
    )
    .filter(|dir| !dir.is_empty());
    record.client_build_number = optional(
        wtsapi32::query_session_u32(
            server,
            session_id,
            WTSClientBuildNumber,
            "WTSClientBuildNumber",
        ),
        session_id,
    );
    record.client_protocol = optional(
        wtsapi32::query_session_u16(
            server,
            session_id,
            WTSClientProtocolType,
            "WTSClientProtocolType",
        ),
        session_id,
    );
    record.client_ipv4 = optional(
        wtsapi32::query_session_struct::<WTS_CLIENT_ADDRESS>(
            server,
            session_id,
            WTSClientAddress,
            "WTSClientAddress",
        ),
        session_id,
    )
    .and_then(parse_client_ipv4);

    if let Some(display) = optional(
        wtsapi32::query_session_struct::<WTS_CLIENT_DISPLAY>(
            server,
            session_id,
            WTSClientDisplay,
            "WTSClientDisplay",
        ),
        session_id,
    ) {
        if display.HorizontalResolution > 0 {
            record.display_width = Some(display.HorizontalResolution);
            record.display_height = Some(display.VerticalResolution);
            record.color_depth = Some(display.ColorDepth);
        }
    }

    if let Some(info) = optional(
        wtsapi32::query_session_struct::<WTSINFOW>(
            server,
            session_id,
            WTSSessionInfo,
            "WTSSessionInfo",
        ),
        session_id,
    ) {
        record.state = Some(ConnectState::from_wts(info.State));
        unsafe {
            record.logon_time = nonzero_time(*info.LogonTime.QuadPart());
            record.disconnect_time = nonzero_time(*info.DisconnectTime.QuadPart());
            record.last_input_time = nonzero_time(*info.LastInputTime.QuadPart());
            record.idle_time = idle_duration(
                *info.LastInputTime.QuadPart(),
                *info.CurrentTime.QuadPart(),
            );
        }
    }

    record.is_remote = optional(
        wtsapi32::query_session_bool(
            server,
            session_id,
            WTSIsRemoteSession,
            "WTSIsRemoteSession",
        ),
        session_id,
    );

    Ok(record)
}

fn session_not_found(session_id: u32, error: TokenError) -> TokenError {
    debug!(session_id, error = %error, "session does not resolve an account");
    TokenError::SessionNotFound(session_id)
}

fn optional<T>(result: TokenResult<T>, session_id: u32) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            debug!(session_id, error = %error, "extended session attribute unavailable");
            None
        }
    }
}

fn resolve_account_sid(account: &str) -> Option<String> {
    match advapi32::lookup_account_name(account) {
        Ok(sid) => unsafe { advapi32::sid_to_string(sid.as_ptr() as PSID).ok() },
        Err(error) => {
            debug!(account, error = %error, "account SID lookup failed");
            None
        }
    }
}

fn parse_client_ipv4(address: WTS_CLIENT_ADDRESS) -> Option<Ipv4Addr> {
    if address.AddressFamily != AF_INET {
        return None;
    }
    // For AF_INET the address starts at byte offset 2 of the buffer
    let bytes = &address.Address[2..6];
    let ip = Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]);
    if ip.is_unspecified() {
        None
    } else {
        Some(ip)
    }
}

fn nonzero_time(filetime: i64) -> Option<i64> {
    if filetime > 0 {
        Some(filetime)
    } else {
        None
    }
}

fn idle_duration(last_input: i64, current: i64) -> Option<Duration> {
    if last_input <= 0 || current <= last_input {
        return None;
    }
    // FILETIME ticks are 100ns
    Some(Duration::from_nanos((current - last_input) as u64 * 100))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_duration() {
        assert_eq!(idle_duration(0, 100), None);
        assert_eq!(idle_duration(100, 100), None);
        assert_eq!(idle_duration(200, 100), None);
        assert_eq!(
            idle_duration(100, 100 + 10_000_000),
            Some(Duration::from_secs(1))
        );
    }

    #[test]
    fn test_nonzero_time() {
        assert_eq!(nonzero_time(0), None);
        assert_eq!(nonzero_time(-5), None);
        assert_eq!(nonzero_time(7), Some(7));
    }

    #[test]
    fn test_parse_client_ipv4() {
        let mut address: WTS_CLIENT_ADDRESS = unsafe { std::mem::zeroed() };
        address.AddressFamily = AF_INET;
        address.Address[2] = 192;
        address.Address[3] = 168;
        address.Address[4] = 1;
        address.Address[5] = 20;
        assert_eq!(
            parse_client_ipv4(address),
            Some(Ipv4Addr::new(192, 168, 1, 20))
        );
    }

    #[test]
    fn test_parse_client_ipv4_rejects_other_families() {
        let mut address: WTS_CLIENT_ADDRESS = unsafe { std::mem::zeroed() };
        address.AddressFamily = 23; // AF_INET6
        address.Address[2] = 1;
        assert_eq!(parse_client_ipv4(address), None);
    }

    #[test]
    fn test_parse_client_ipv4_rejects_unspecified() {
        let mut address: WTS_CLIENT_ADDRESS = unsafe { std::mem::zeroed() };
        address.AddressFamily = AF_INET;
        assert_eq!(parse_client_ipv4(address), None);
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_invalid_session_is_an_error() {
        let result = get_extended_session_info(0xFFFF_FFF0, None);
        assert!(matches!(
            result,
            Err(TokenError::SessionNotFound(0xFFFF_FFF0))
        ));
    }
}
