//! Token privilege management

pub mod manager;

pub use manager::{
    adjust_privileges, current_process_has_privilege, ensure_privilege_enabled, list_privileges,
    privilege_status, remove_all_privileges, set_standard_user_privileges, PrivilegeState,
    TokenPrivilegeEntry,
};
