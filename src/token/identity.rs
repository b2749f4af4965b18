//! Resolved identity behind an access token

use crate::core::types::TokenResult;
use crate::token::duplication;
use crate::windows::types::AccessTokenHandle;
use serde::Serialize;
use std::fmt;

/// Who a token represents, resolved at a point in time
#[derive(Debug, Clone, Serialize)]
pub struct TokenIdentity {
    pub account: String,
    pub domain: String,
    pub sid: String,
    pub is_system: bool,
    pub is_admin: bool,
}

impl TokenIdentity {
    /// DOMAIN\account, or just the account when the domain is empty
    pub fn qualified_name(&self) -> String {
        if self.domain.is_empty() {
            self.account.clone()
        } else {
            format!("{}\\{}", self.domain, self.account)
        }
    }
}

impl fmt::Display for TokenIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name())
    }
}

/// Resolve the identity a token currently represents
///
/// Reads the token fresh on every call; privilege adjustments between
/// calls are reflected in the admin determination.
pub fn resolve_identity(token: &AccessTokenHandle) -> TokenResult<TokenIdentity> {
    let sid = duplication::token_user_sid(token)?;
    let (account, domain) = duplication::token_account(token)?;
    let is_system = duplication::is_token_system(token)?;
    let is_admin = duplication::is_token_local_admin(token)?;
    Ok(TokenIdentity {
        account,
        domain,
        sid,
        is_system,
        is_admin,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::windows::bindings::advapi32;
    use winapi::um::winnt::{TOKEN_DUPLICATE, TOKEN_QUERY};

    #[test]
    fn test_qualified_name() {
        let identity = TokenIdentity {
            account: "alice".to_string(),
            domain: "CORP".to_string(),
            sid: "S-1-5-21-1-2-3-1001".to_string(),
            is_system: false,
            is_admin: false,
        };
        assert_eq!(identity.qualified_name(), "CORP\\alice");
        assert_eq!(identity.to_string(), "CORP\\alice");
    }

    #[test]
    fn test_qualified_name_no_domain() {
        let identity = TokenIdentity {
            account: "svc".to_string(),
            domain: String::new(),
            sid: "S-1-5-18".to_string(),
            is_system: true,
            is_admin: true,
        };
        assert_eq!(identity.qualified_name(), "svc");
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_resolve_current_process_identity() {
        let token =
            advapi32::current_process_token(TOKEN_QUERY | TOKEN_DUPLICATE).expect("process token");
        let identity = resolve_identity(&token).unwrap();
        assert!(!identity.account.is_empty());
        assert!(identity.sid.starts_with("S-1-"));
    }
}
