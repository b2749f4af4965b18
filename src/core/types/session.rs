//! Session records and classification flags

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::Duration;

/// Connection state of a session, mirroring WTS_CONNECTSTATE_CLASS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectState {
    Active,
    Connected,
    ConnectQuery,
    Shadow,
    Disconnected,
    Idle,
    Listen,
    Reset,
    Down,
    Init,
}

impl ConnectState {
    /// Map the raw WTS state value; out-of-range values land on `Down`
    pub fn from_wts(value: u32) -> Self {
        match value {
            0 => ConnectState::Active,
            1 => ConnectState::Connected,
            2 => ConnectState::ConnectQuery,
            3 => ConnectState::Shadow,
            4 => ConnectState::Disconnected,
            5 => ConnectState::Idle,
            6 => ConnectState::Listen,
            7 => ConnectState::Reset,
            9 => ConnectState::Init,
            _ => ConnectState::Down,
        }
    }
}

bitflags! {
    /// Classification flags derived for a session during enumeration
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct SessionFlags: u32 {
        const CONSOLE                         = 1 << 0;
        const ACTIVE                          = 1 << 1;
        const CONNECTED                       = 1 << 2;
        const DISCONNECTED                    = 1 << 3;
        const LISTENER                        = 1 << 4;
        const REMOTE                          = 1 << 5;
        const RDP                             = 1 << 6;
        const HDX                             = 1 << 7;
        const LOCAL                           = 1 << 8;
        const SERVICES                        = 1 << 9;
        const CONNECTED_CONSOLE               = 1 << 10;
        const SYSTEM                          = 1 << 11;
        const USER                            = 1 << 12;
        const LOCAL_ADMIN_USER                = 1 << 13;
        const ACTIVE_USER                     = 1 << 14;
        const CONSOLE_ACTIVE_USER             = 1 << 15;
        const CONNECTED_USER                  = 1 << 16;
        const PRIMARY_ACTIVE_USER             = 1 << 17;
        const PRIMARY_ACTIVE_LOCAL_ADMIN_USER = 1 << 18;
        const CURRENT_PROCESS                 = 1 << 19;
    }
}

/// Raw enumeration row before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSession {
    pub session_id: u32,
    pub station_name: String,
    pub state: ConnectState,
}

/// A classified session
///
/// Immutable once the enumeration pass that produced it completes; the two
/// PRIMARY flags are settled by a tie-break pass over the whole table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: u32,
    pub station_name: String,
    pub state: ConnectState,
    pub flags: SessionFlags,
}

impl SessionRecord {
    pub fn is_console(&self) -> bool {
        self.flags.contains(SessionFlags::CONSOLE)
    }

    pub fn is_active(&self) -> bool {
        self.flags.contains(SessionFlags::ACTIVE)
    }

    pub fn is_connected(&self) -> bool {
        self.flags.contains(SessionFlags::CONNECTED)
    }

    pub fn is_disconnected(&self) -> bool {
        self.flags.contains(SessionFlags::DISCONNECTED)
    }

    pub fn is_listener(&self) -> bool {
        self.flags.contains(SessionFlags::LISTENER)
    }

    pub fn is_remote(&self) -> bool {
        self.flags.contains(SessionFlags::REMOTE)
    }

    pub fn is_rdp(&self) -> bool {
        self.flags.contains(SessionFlags::RDP)
    }

    pub fn is_hdx(&self) -> bool {
        self.flags.contains(SessionFlags::HDX)
    }

    pub fn is_local(&self) -> bool {
        self.flags.contains(SessionFlags::LOCAL)
    }

    pub fn is_services(&self) -> bool {
        self.flags.contains(SessionFlags::SERVICES)
    }

    pub fn is_connected_console(&self) -> bool {
        self.flags.contains(SessionFlags::CONNECTED_CONSOLE)
    }

    pub fn is_system_session(&self) -> bool {
        self.flags.contains(SessionFlags::SYSTEM)
    }

    pub fn is_user_session(&self) -> bool {
        self.flags.contains(SessionFlags::USER)
    }

    pub fn is_local_admin_user_session(&self) -> bool {
        self.flags.contains(SessionFlags::LOCAL_ADMIN_USER)
    }

    pub fn is_active_user_session(&self) -> bool {
        self.flags.contains(SessionFlags::ACTIVE_USER)
    }

    pub fn is_console_active_user_session(&self) -> bool {
        self.flags.contains(SessionFlags::CONSOLE_ACTIVE_USER)
    }

    pub fn is_connected_user_session(&self) -> bool {
        self.flags.contains(SessionFlags::CONNECTED_USER)
    }

    pub fn is_primary_active_user_session(&self) -> bool {
        self.flags.contains(SessionFlags::PRIMARY_ACTIVE_USER)
    }

    pub fn is_primary_active_local_admin_user_session(&self) -> bool {
        self.flags.contains(SessionFlags::PRIMARY_ACTIVE_LOCAL_ADMIN_USER)
    }

    pub fn is_current_process_session(&self) -> bool {
        self.flags.contains(SessionFlags::CURRENT_PROCESS)
    }
}

/// On-demand session detail, queried fresh on every call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtendedSessionRecord {
    pub session_id: u32,
    pub user_name: String,
    pub domain_name: String,
    /// DOMAIN\user when both halves resolved, otherwise whichever is present
    pub account: String,
    pub sid: Option<String>,
    pub state: Option<ConnectState>,
    pub is_remote: Option<bool>,
    pub client_name: Option<String>,
    pub client_directory: Option<String>,
    pub client_build_number: Option<u32>,
    pub client_protocol: Option<u16>,
    pub client_ipv4: Option<Ipv4Addr>,
    pub display_width: Option<u32>,
    pub display_height: Option<u32>,
    pub color_depth: Option<u32>,
    /// FILETIME ticks (100ns since 1601-01-01 UTC); zero means "not set"
    pub logon_time: Option<i64>,
    pub disconnect_time: Option<i64>,
    pub last_input_time: Option<i64>,
    pub idle_time: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_state_mapping() {
        assert_eq!(ConnectState::from_wts(0), ConnectState::Active);
        assert_eq!(ConnectState::from_wts(1), ConnectState::Connected);
        assert_eq!(ConnectState::from_wts(4), ConnectState::Disconnected);
        assert_eq!(ConnectState::from_wts(6), ConnectState::Listen);
        assert_eq!(ConnectState::from_wts(8), ConnectState::Down);
        assert_eq!(ConnectState::from_wts(99), ConnectState::Down);
    }

    #[test]
    fn test_flag_accessors() {
        let record = SessionRecord {
            session_id: 1,
            station_name: "Console".to_string(),
            state: ConnectState::Active,
            flags: SessionFlags::CONSOLE
                | SessionFlags::ACTIVE
                | SessionFlags::LOCAL
                | SessionFlags::USER
                | SessionFlags::ACTIVE_USER,
        };
        assert!(record.is_console());
        assert!(record.is_active());
        assert!(record.is_local());
        assert!(record.is_user_session());
        assert!(record.is_active_user_session());
        assert!(!record.is_remote());
        assert!(!record.is_system_session());
        assert!(!record.is_primary_active_user_session());
    }

    #[test]
    fn test_flags_serde_round_trip() {
        let flags = SessionFlags::CONSOLE | SessionFlags::ACTIVE | SessionFlags::USER;
        let json = serde_json::to_string(&flags).unwrap();
        let back: SessionFlags = serde_json::from_str(&json).unwrap();
        assert_eq!(back, flags);
    }

    #[test]
    fn test_record_serialization() {
        let record = SessionRecord {
            session_id: 2,
            station_name: "RDP-Tcp#3".to_string(),
            state: ConnectState::Active,
            flags: SessionFlags::REMOTE | SessionFlags::RDP | SessionFlags::USER,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"session_id\":2"));
        let back: SessionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.flags, record.flags);
        assert_eq!(back.state, ConnectState::Active);
    }

    #[test]
    fn test_extended_record_default() {
        let record = ExtendedSessionRecord::default();
        assert_eq!(record.session_id, 0);
        assert!(record.sid.is_none());
        assert!(record.idle_time.is_none());
    }
}
