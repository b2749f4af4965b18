//! Session classification
//!
//! Pure derivation of session flags from raw enumeration rows. The
//! OS-dependent probes (admin membership, remote override, current
//! process session) are injected so the logic is testable against
//! synthetic session tables.

use crate::core::types::{ConnectState, RawSession, SessionFlags, SessionRecord};

/// OS probes consulted during classification
pub trait SessionProbe {
    /// Whether the user logged on to a session is a local administrator
    fn is_local_admin(&mut self, session_id: u32) -> bool;

    /// Authoritative remote determination, when the host supports the
    /// direct query; `None` keeps the station-name heuristic
    fn remote_override(&mut self, session_id: u32) -> Option<bool>;

    /// Session id of the current process, when enumerating locally
    fn current_process_session(&self) -> Option<u32>;
}

/// Derive classification flags for a whole session table
///
/// Flags are settled in one forward pass; the two PRIMARY flags prefer a
/// console active user session and otherwise fall to the first-enumerated
/// qualifying session in a second pass.
pub fn classify_sessions(
    raw: &[RawSession],
    probe: &mut dyn SessionProbe,
) -> Vec<SessionRecord> {
    let current = probe.current_process_session();
    let mut records = Vec::with_capacity(raw.len());
    let mut primary_user_claimed = false;
    let mut primary_admin_claimed = false;

    for session in raw {
        let mut flags = SessionFlags::empty();
        let station = session.station_name.as_str();

        if station.eq_ignore_ascii_case("console") {
            flags |= SessionFlags::CONSOLE;
        }

        match session.state {
            ConnectState::Active => flags |= SessionFlags::ACTIVE,
            ConnectState::Connected => flags |= SessionFlags::CONNECTED,
            ConnectState::Disconnected => flags |= SessionFlags::DISCONNECTED,
            ConnectState::Listen => flags |= SessionFlags::LISTENER,
            _ => {}
        }

        let mut remote = if starts_with_ignore_case(station, "RDP-Tcp") {
            flags |= SessionFlags::RDP;
            true
        } else if starts_with_ignore_case(station, "ICA-Tcp") {
            flags |= SessionFlags::HDX;
            true
        } else {
            false
        };
        if let Some(authoritative) = probe.remote_override(session.session_id) {
            remote = authoritative;
        }
        if remote {
            flags |= SessionFlags::REMOTE;
        } else {
            flags |= SessionFlags::LOCAL;
        }

        if station.eq_ignore_ascii_case("services") {
            flags |= SessionFlags::SERVICES;
        }
        if flags.contains(SessionFlags::CONSOLE) && flags.contains(SessionFlags::CONNECTED) {
            flags |= SessionFlags::CONNECTED_CONSOLE;
        }

        if flags.intersects(
            SessionFlags::SERVICES | SessionFlags::CONNECTED_CONSOLE | SessionFlags::LISTENER,
        ) {
            flags |= SessionFlags::SYSTEM;
        } else {
            flags |= SessionFlags::USER;
            if probe.is_local_admin(session.session_id) {
                flags |= SessionFlags::LOCAL_ADMIN_USER;
            }
            if flags.contains(SessionFlags::ACTIVE) {
                flags |= SessionFlags::ACTIVE_USER;
            }
            if flags.contains(SessionFlags::CONNECTED) {
                flags |= SessionFlags::CONNECTED_USER;
            }
            if flags.contains(SessionFlags::CONSOLE) && flags.contains(SessionFlags::ACTIVE) {
                flags |= SessionFlags::CONSOLE_ACTIVE_USER;
                // Console takes the primary slots ahead of any remote session
                if !primary_user_claimed {
                    flags |= SessionFlags::PRIMARY_ACTIVE_USER;
                    primary_user_claimed = true;
                }
                if !primary_admin_claimed
                    && flags.contains(SessionFlags::LOCAL_ADMIN_USER)
                {
                    flags |= SessionFlags::PRIMARY_ACTIVE_LOCAL_ADMIN_USER;
                    primary_admin_claimed = true;
                }
            }
        }

        if current == Some(session.session_id) {
            flags |= SessionFlags::CURRENT_PROCESS;
        }

        records.push(SessionRecord {
            session_id: session.session_id,
            station_name: session.station_name.clone(),
            state: session.state,
            flags,
        });
    }

    // Tie-break: first-enumerated qualifying session fills unclaimed slots
    if !primary_user_claimed {
        if let Some(record) = records
            .iter_mut()
            .find(|r| r.flags.contains(SessionFlags::ACTIVE_USER))
        {
            record.flags |= SessionFlags::PRIMARY_ACTIVE_USER;
        }
    }
    if !primary_admin_claimed {
        if let Some(record) = records.iter_mut().find(|r| {
            r.flags
                .contains(SessionFlags::ACTIVE_USER | SessionFlags::LOCAL_ADMIN_USER)
        }) {
            record.flags |= SessionFlags::PRIMARY_ACTIVE_LOCAL_ADMIN_USER;
        }
    }

    records
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len()
        && text
            .chars()
            .zip(prefix.chars())
            .all(|(a, b)| a.eq_ignore_ascii_case(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Probe with a fixed admin set and no OS support
    struct FixedProbe {
        admins: Vec<u32>,
        current: Option<u32>,
        overrides: Vec<(u32, bool)>,
    }

    impl FixedProbe {
        fn new() -> Self {
            FixedProbe {
                admins: Vec::new(),
                current: None,
                overrides: Vec::new(),
            }
        }
    }

    impl SessionProbe for FixedProbe {
        fn is_local_admin(&mut self, session_id: u32) -> bool {
            self.admins.contains(&session_id)
        }

        fn remote_override(&mut self, session_id: u32) -> Option<bool> {
            self.overrides
                .iter()
                .find(|(id, _)| *id == session_id)
                .map(|(_, remote)| *remote)
        }

        fn current_process_session(&self) -> Option<u32> {
            self.current
        }
    }

    fn raw(session_id: u32, station: &str, state: ConnectState) -> RawSession {
        RawSession {
            session_id,
            station_name: station.to_string(),
            state,
        }
    }

    #[test]
    fn test_services_session_is_system() {
        let table = vec![raw(0, "Services", ConnectState::Disconnected)];
        let records = classify_sessions(&table, &mut FixedProbe::new());
        assert!(records[0].is_services());
        assert!(records[0].is_system_session());
        assert!(!records[0].is_user_session());
    }

    #[test]
    fn test_listener_is_system() {
        let table = vec![raw(65536, "RDP-Tcp", ConnectState::Listen)];
        let records = classify_sessions(&table, &mut FixedProbe::new());
        assert!(records[0].is_listener());
        assert!(records[0].is_system_session());
        assert!(records[0].is_rdp());
        assert!(records[0].is_remote());
    }

    #[test]
    fn test_connected_console_is_system() {
        // Console at the logon screen: connected but no interactive user
        let table = vec![raw(1, "Console", ConnectState::Connected)];
        let records = classify_sessions(&table, &mut FixedProbe::new());
        assert!(records[0].is_connected_console());
        assert!(records[0].is_system_session());
    }

    #[test]
    fn test_console_active_user_takes_primary() {
        let table = vec![
            raw(0, "Services", ConnectState::Disconnected),
            raw(1, "Console", ConnectState::Active),
        ];
        let records = classify_sessions(&table, &mut FixedProbe::new());
        assert!(records[1].is_console_active_user_session());
        assert!(records[1].is_primary_active_user_session());
        assert!(!records[1].is_primary_active_local_admin_user_session());
    }

    #[test]
    fn test_console_admin_takes_both_primaries() {
        let mut probe = FixedProbe::new();
        probe.admins.push(1);
        let table = vec![
            raw(1, "Console", ConnectState::Active),
            raw(2, "RDP-Tcp#0", ConnectState::Active),
        ];
        let records = classify_sessions(&table, &mut probe);
        assert!(records[0].is_primary_active_user_session());
        assert!(records[0].is_primary_active_local_admin_user_session());
        assert!(!records[1].is_primary_active_user_session());
        assert!(!records[1].is_primary_active_local_admin_user_session());
    }

    #[test]
    fn test_admin_primary_falls_to_remote_when_console_is_not_admin() {
        let mut probe = FixedProbe::new();
        probe.admins.push(2);
        let table = vec![
            raw(1, "Console", ConnectState::Active),
            raw(2, "RDP-Tcp#0", ConnectState::Active),
        ];
        let records = classify_sessions(&table, &mut probe);
        assert!(records[0].is_primary_active_user_session());
        assert!(!records[0].is_primary_active_local_admin_user_session());
        assert!(records[1].is_primary_active_local_admin_user_session());
        assert!(!records[1].is_primary_active_user_session());
    }

    #[test]
    fn test_first_active_wins_without_console() {
        let table = vec![
            raw(2, "RDP-Tcp#0", ConnectState::Active),
            raw(3, "RDP-Tcp#1", ConnectState::Active),
        ];
        let records = classify_sessions(&table, &mut FixedProbe::new());
        assert!(records[0].is_primary_active_user_session());
        assert!(!records[1].is_primary_active_user_session());
    }

    #[test]
    fn test_disconnected_remote_never_primary() {
        let table = vec![raw(2, "RDP-Tcp#0", ConnectState::Disconnected)];
        let records = classify_sessions(&table, &mut FixedProbe::new());
        assert!(records[0].is_user_session());
        assert!(records[0].is_disconnected());
        assert!(!records[0].is_active_user_session());
        assert!(!records[0].is_primary_active_user_session());
    }

    #[test]
    fn test_station_prefixes() {
        let table = vec![
            raw(2, "rdp-tcp#7", ConnectState::Active),
            raw(3, "ICA-Tcp#2", ConnectState::Active),
            raw(4, "31C5CE94259D4006A9E4#0", ConnectState::Active),
        ];
        let records = classify_sessions(&table, &mut FixedProbe::new());
        assert!(records[0].is_rdp() && records[0].is_remote());
        assert!(records[1].is_hdx() && records[1].is_remote());
        assert!(records[2].is_local() && !records[2].is_remote());
    }

    #[test]
    fn test_remote_override_beats_heuristic() {
        let mut probe = FixedProbe::new();
        // The host says this RDP-named station is actually local
        probe.overrides.push((2, false));
        let table = vec![raw(2, "RDP-Tcp#0", ConnectState::Active)];
        let records = classify_sessions(&table, &mut probe);
        assert!(records[0].is_rdp());
        assert!(records[0].is_local());
        assert!(!records[0].is_remote());
    }

    #[test]
    fn test_current_process_flag() {
        let mut probe = FixedProbe::new();
        probe.current = Some(1);
        let table = vec![
            raw(0, "Services", ConnectState::Disconnected),
            raw(1, "Console", ConnectState::Active),
        ];
        let records = classify_sessions(&table, &mut probe);
        assert!(!records[0].is_current_process_session());
        assert!(records[1].is_current_process_session());
    }

    #[test]
    fn test_empty_table() {
        let records = classify_sessions(&[], &mut FixedProbe::new());
        assert!(records.is_empty());
    }

    #[test]
    fn test_every_session_is_system_or_user() {
        let table = vec![
            raw(0, "Services", ConnectState::Disconnected),
            raw(1, "Console", ConnectState::Active),
            raw(2, "RDP-Tcp#0", ConnectState::Disconnected),
            raw(65536, "RDP-Tcp", ConnectState::Listen),
        ];
        for record in classify_sessions(&table, &mut FixedProbe::new()) {
            assert_ne!(record.is_system_session(), record.is_user_session());
        }
    }
}
