//! The privilege and logon-right catalog
//!
//! Closed set of the privileges and account rights a Windows access token
//! can carry. System names are resolved statically; LUIDs are looked up per
//! call because they are machine-local and not guaranteed stable.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A token privilege or account logon right
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Privilege {
    AssignPrimaryToken,
    Audit,
    Backup,
    ChangeNotify,
    CreateGlobal,
    CreatePagefile,
    CreatePermanent,
    CreateSymbolicLink,
    CreateToken,
    Debug,
    DelegateSessionUserImpersonate,
    EnableDelegation,
    Impersonate,
    IncreaseBasePriority,
    IncreaseQuota,
    IncreaseWorkingSet,
    LoadDriver,
    LockMemory,
    MachineAccount,
    ManageVolume,
    ProfileSingleProcess,
    Relabel,
    RemoteShutdown,
    Restore,
    Security,
    Shutdown,
    SyncAgent,
    SystemEnvironment,
    SystemProfile,
    SystemTime,
    TakeOwnership,
    Tcb,
    TimeZone,
    TrustedCredManAccess,
    Undock,
    UnsolicitedInput,
    InteractiveLogon,
    NetworkLogon,
    BatchLogon,
    ServiceLogon,
    RemoteInteractiveLogon,
    DenyInteractiveLogon,
    DenyNetworkLogon,
    DenyBatchLogon,
    DenyServiceLogon,
    DenyRemoteInteractiveLogon,
}

impl Privilege {
    /// The complete catalog in declaration order
    pub const ALL: [Privilege; 46] = [
        Privilege::AssignPrimaryToken,
        Privilege::Audit,
        Privilege::Backup,
        Privilege::ChangeNotify,
        Privilege::CreateGlobal,
        Privilege::CreatePagefile,
        Privilege::CreatePermanent,
        Privilege::CreateSymbolicLink,
        Privilege::CreateToken,
        Privilege::Debug,
        Privilege::DelegateSessionUserImpersonate,
        Privilege::EnableDelegation,
        Privilege::Impersonate,
        Privilege::IncreaseBasePriority,
        Privilege::IncreaseQuota,
        Privilege::IncreaseWorkingSet,
        Privilege::LoadDriver,
        Privilege::LockMemory,
        Privilege::MachineAccount,
        Privilege::ManageVolume,
        Privilege::ProfileSingleProcess,
        Privilege::Relabel,
        Privilege::RemoteShutdown,
        Privilege::Restore,
        Privilege::Security,
        Privilege::Shutdown,
        Privilege::SyncAgent,
        Privilege::SystemEnvironment,
        Privilege::SystemProfile,
        Privilege::SystemTime,
        Privilege::TakeOwnership,
        Privilege::Tcb,
        Privilege::TimeZone,
        Privilege::TrustedCredManAccess,
        Privilege::Undock,
        Privilege::UnsolicitedInput,
        Privilege::InteractiveLogon,
        Privilege::NetworkLogon,
        Privilege::BatchLogon,
        Privilege::ServiceLogon,
        Privilege::RemoteInteractiveLogon,
        Privilege::DenyInteractiveLogon,
        Privilege::DenyNetworkLogon,
        Privilege::DenyBatchLogon,
        Privilege::DenyServiceLogon,
        Privilege::DenyRemoteInteractiveLogon,
    ];

    /// The privileges a plain standard-user token carries
    pub const STANDARD_USER: [Privilege; 5] = [
        Privilege::ChangeNotify,
        Privilege::Shutdown,
        Privilege::Undock,
        Privilege::IncreaseWorkingSet,
        Privilege::TimeZone,
    ];

    /// The system identifier used by the OS for this entry
    pub fn system_name(&self) -> &'static str {
        match self {
            Privilege::AssignPrimaryToken => "SeAssignPrimaryTokenPrivilege",
            Privilege::Audit => "SeAuditPrivilege",
            Privilege::Backup => "SeBackupPrivilege",
            Privilege::ChangeNotify => "SeChangeNotifyPrivilege",
            Privilege::CreateGlobal => "SeCreateGlobalPrivilege",
            Privilege::CreatePagefile => "SeCreatePagefilePrivilege",
            Privilege::CreatePermanent => "SeCreatePermanentPrivilege",
            Privilege::CreateSymbolicLink => "SeCreateSymbolicLinkPrivilege",
            Privilege::CreateToken => "SeCreateTokenPrivilege",
            Privilege::Debug => "SeDebugPrivilege",
            Privilege::DelegateSessionUserImpersonate => {
                "SeDelegateSessionUserImpersonatePrivilege"
            }
            Privilege::EnableDelegation => "SeEnableDelegationPrivilege",
            Privilege::Impersonate => "SeImpersonatePrivilege",
            Privilege::IncreaseBasePriority => "SeIncreaseBasePriorityPrivilege",
            Privilege::IncreaseQuota => "SeIncreaseQuotaPrivilege",
            Privilege::IncreaseWorkingSet => "SeIncreaseWorkingSetPrivilege",
            Privilege::LoadDriver => "SeLoadDriverPrivilege",
            Privilege::LockMemory => "SeLockMemoryPrivilege",
            Privilege::MachineAccount => "SeMachineAccountPrivilege",
            Privilege::ManageVolume => "SeManageVolumePrivilege",
            Privilege::ProfileSingleProcess => "SeProfileSingleProcessPrivilege",
            Privilege::Relabel => "SeRelabelPrivilege",
            Privilege::RemoteShutdown => "SeRemoteShutdownPrivilege",
            Privilege::Restore => "SeRestorePrivilege",
            Privilege::Security => "SeSecurityPrivilege",
            Privilege::Shutdown => "SeShutdownPrivilege",
            Privilege::SyncAgent => "SeSyncAgentPrivilege",
            Privilege::SystemEnvironment => "SeSystemEnvironmentPrivilege",
            Privilege::SystemProfile => "SeSystemProfilePrivilege",
            Privilege::SystemTime => "SeSystemtimePrivilege",
            Privilege::TakeOwnership => "SeTakeOwnershipPrivilege",
            Privilege::Tcb => "SeTcbPrivilege",
            Privilege::TimeZone => "SeTimeZonePrivilege",
            Privilege::TrustedCredManAccess => "SeTrustedCredManAccessPrivilege",
            Privilege::Undock => "SeUndockPrivilege",
            Privilege::UnsolicitedInput => "SeUnsolicitedInputPrivilege",
            Privilege::InteractiveLogon => "SeInteractiveLogonRight",
            Privilege::NetworkLogon => "SeNetworkLogonRight",
            Privilege::BatchLogon => "SeBatchLogonRight",
            Privilege::ServiceLogon => "SeServiceLogonRight",
            Privilege::RemoteInteractiveLogon => "SeRemoteInteractiveLogonRight",
            Privilege::DenyInteractiveLogon => "SeDenyInteractiveLogonRight",
            Privilege::DenyNetworkLogon => "SeDenyNetworkLogonRight",
            Privilege::DenyBatchLogon => "SeDenyBatchLogonRight",
            Privilege::DenyServiceLogon => "SeDenyServiceLogonRight",
            Privilege::DenyRemoteInteractiveLogon => "SeDenyRemoteInteractiveLogonRight",
        }
    }

    /// Whether this entry is an account logon right rather than a privilege
    ///
    /// Logon rights have no LUID and cannot be toggled on a token; they are
    /// assigned through local security policy.
    pub fn is_logon_right(&self) -> bool {
        matches!(
            self,
            Privilege::InteractiveLogon
                | Privilege::NetworkLogon
                | Privilege::BatchLogon
                | Privilege::ServiceLogon
                | Privilege::RemoteInteractiveLogon
                | Privilege::DenyInteractiveLogon
                | Privilege::DenyNetworkLogon
                | Privilege::DenyBatchLogon
                | Privilege::DenyServiceLogon
                | Privilege::DenyRemoteInteractiveLogon
        )
    }

    /// Look up a catalog entry from a short or system name, case-insensitive
    pub fn from_name(name: &str) -> Option<Privilege> {
        NAME_LOOKUP.get(name.to_ascii_lowercase().as_str()).copied()
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.system_name())
    }
}

lazy_static::lazy_static! {
    static ref NAME_LOOKUP: HashMap<String, Privilege> = {
        let mut map = HashMap::with_capacity(Privilege::ALL.len() * 2);
        for privilege in Privilege::ALL {
            map.insert(privilege.system_name().to_ascii_lowercase(), privilege);
            map.insert(format!("{:?}", privilege).to_ascii_lowercase(), privilege);
        }
        map
    };
}
