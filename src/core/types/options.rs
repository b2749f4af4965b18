//! Options controlling how an impersonation context is prepared

use crate::core::types::Privilege;
use serde::{Deserialize, Serialize};

/// Token preparation options for an impersonation manager
///
/// Value object; cloneable and immutable once handed to a manager.
/// Impersonating the SYSTEM account is opt-in for crate-internal callers
/// only and cannot be requested through the public builder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImpersonationOptions {
    reduce_admin_privileges: bool,
    #[serde(skip)]
    allow_system_impersonation: bool,
    privileges_to_enable: Vec<Privilege>,
    privileges_to_disable: Vec<Privilege>,
}

impl ImpersonationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strip an administrator token down to the standard-user privilege set
    pub fn reduce_admin_privileges(mut self, reduce: bool) -> Self {
        self.reduce_admin_privileges = reduce;
        self
    }

    /// Privileges to enable on the impersonation token before use
    pub fn enable_privileges(mut self, privileges: impl IntoIterator<Item = Privilege>) -> Self {
        self.privileges_to_enable.extend(privileges);
        self
    }

    /// Privileges to disable on the impersonation token before use
    pub fn disable_privileges(mut self, privileges: impl IntoIterator<Item = Privilege>) -> Self {
        self.privileges_to_disable.extend(privileges);
        self
    }

    pub(crate) fn allow_system_impersonation(mut self, allow: bool) -> Self {
        self.allow_system_impersonation = allow;
        self
    }

    pub fn reduces_admin_privileges(&self) -> bool {
        self.reduce_admin_privileges
    }

    pub fn allows_system_impersonation(&self) -> bool {
        self.allow_system_impersonation
    }

    pub fn privileges_to_enable(&self) -> &[Privilege] {
        &self.privileges_to_enable
    }

    pub fn privileges_to_disable(&self) -> &[Privilege] {
        &self.privileges_to_disable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ImpersonationOptions::new();
        assert!(!options.reduces_admin_privileges());
        assert!(!options.allows_system_impersonation());
        assert!(options.privileges_to_enable().is_empty());
        assert!(options.privileges_to_disable().is_empty());
    }

    #[test]
    fn test_builder_chain() {
        let options = ImpersonationOptions::new()
            .reduce_admin_privileges(true)
            .enable_privileges([Privilege::Backup, Privilege::Restore])
            .disable_privileges([Privilege::Debug]);
        assert!(options.reduces_admin_privileges());
        assert_eq!(
            options.privileges_to_enable(),
            &[Privilege::Backup, Privilege::Restore]
        );
        assert_eq!(options.privileges_to_disable(), &[Privilege::Debug]);
    }

    #[test]
    fn test_system_impersonation_internal_only() {
        let options = ImpersonationOptions::new().allow_system_impersonation(true);
        assert!(options.allows_system_impersonation());
    }

    #[test]
    fn test_serde_skips_system_opt_in() {
        let options = ImpersonationOptions::new().allow_system_impersonation(true);
        let json = serde_json::to_string(&options).unwrap();
        let back: ImpersonationOptions = serde_json::from_str(&json).unwrap();
        assert!(!back.allows_system_impersonation());
    }
}
