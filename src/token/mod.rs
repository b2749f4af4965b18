//! Access token acquisition, duplication and environment blocks

pub mod broker;
pub mod duplication;
pub mod environment;
pub mod identity;

pub use broker::{acquire_pipe_client_token, acquire_security_identification_token};
pub use duplication::{
    create_impersonation_token, create_primary_token, is_token_elevated, is_token_local_admin,
    is_token_system, linked_elevated_token, linked_standard_token, token_elevation_kind,
    token_session_id, token_user_sid, TokenElevationKind,
};
pub use environment::{
    create_environment_block, create_environment_block_with, EnvironmentBlock,
};
pub use identity::{resolve_identity, TokenIdentity};
