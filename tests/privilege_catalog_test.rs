//! Integration tests for the privilege catalog

use session_broker::Privilege;
use std::collections::HashSet;

#[test]
fn test_catalog_is_complete() {
    assert_eq!(Privilege::ALL.len(), 46);
    let names: HashSet<&str> = Privilege::ALL.iter().map(|p| p.system_name()).collect();
    assert_eq!(names.len(), Privilege::ALL.len());
}

#[test]
fn test_well_known_privileges_resolve() {
    for name in [
        "SeDebugPrivilege",
        "SeTcbPrivilege",
        "SeBackupPrivilege",
        "SeRestorePrivilege",
        "SeShutdownPrivilege",
        "SeChangeNotifyPrivilege",
        "SeAssignPrimaryTokenPrivilege",
        "SeIncreaseQuotaPrivilege",
    ] {
        let privilege = Privilege::from_name(name);
        assert!(privilege.is_some(), "{name} did not resolve");
        assert_eq!(privilege.unwrap().system_name(), name);
    }
}

#[test]
fn test_lookup_is_case_insensitive() {
    assert_eq!(
        Privilege::from_name("sedebugprivilege"),
        Some(Privilege::Debug)
    );
    assert_eq!(Privilege::from_name("DEBUG"), Some(Privilege::Debug));
    assert_eq!(Privilege::from_name("NoSuchPrivilege"), None);
}

#[test]
fn test_logon_rights_are_rights_not_privileges() {
    for privilege in Privilege::ALL {
        let name = privilege.system_name();
        if privilege.is_logon_right() {
            assert!(name.ends_with("Right"), "{name} should be a logon right");
        } else {
            assert!(name.ends_with("Privilege"), "{name} should be a privilege");
        }
    }
    assert!(Privilege::InteractiveLogon.is_logon_right());
    assert!(Privilege::DenyNetworkLogon.is_logon_right());
    assert!(!Privilege::Debug.is_logon_right());
}

#[test]
fn test_standard_user_set() {
    assert_eq!(Privilege::STANDARD_USER.len(), 5);
    for privilege in Privilege::STANDARD_USER {
        assert!(!privilege.is_logon_right());
        assert!(Privilege::ALL.contains(&privilege));
    }
    assert!(Privilege::STANDARD_USER.contains(&Privilege::ChangeNotify));
    assert!(Privilege::STANDARD_USER.contains(&Privilege::Shutdown));
    assert!(Privilege::STANDARD_USER.contains(&Privilege::Undock));
    assert!(Privilege::STANDARD_USER.contains(&Privilege::IncreaseWorkingSet));
    assert!(Privilege::STANDARD_USER.contains(&Privilege::TimeZone));
}

#[test]
fn test_display_matches_system_name() {
    for privilege in Privilege::ALL {
        assert_eq!(privilege.to_string(), privilege.system_name());
    }
}

#[test]
fn test_serde_uses_variant_names() {
    let json = serde_json::to_string(&Privilege::TakeOwnership).unwrap();
    assert_eq!(json, "\"TakeOwnership\"");
    let back: Privilege = serde_json::from_str(&json).unwrap();
    assert_eq!(back, Privilege::TakeOwnership);
}
