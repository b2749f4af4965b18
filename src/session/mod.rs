//! Session enumeration, classification and detail queries

pub mod classifier;
pub mod enumerator;
pub mod extended;

pub use classifier::{classify_sessions, SessionProbe};
pub use enumerator::{
    current_process_session_id, enumerate_sessions, get_all_active_user_sessions,
    get_primary_active_local_admin_user_session,
    get_primary_active_local_admin_user_session_id, get_primary_active_user_session,
    get_primary_active_user_session_id, get_session_by_id,
};
pub use extended::get_extended_session_info;
