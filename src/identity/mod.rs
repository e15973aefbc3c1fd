/*!
 * Identity
 * Signed-in user, role lookup, sessions and the tokens that name them
 */
pub mod provider;
pub mod session;
pub mod tokens;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AuthErrorKind;

pub use provider::{PgIdentityProvider, StaticIdentityProvider};
pub use session::{Session, SessionRegistry, Subscription};
pub use tokens::{Claims, TokenKeys};

/// Role that unlocks the dashboard link and the admin surface.
pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

impl Identity {
    /// Display name when set, otherwise the email.
    pub fn name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

/// Credential check and role lookup against an identity backend. Backend
/// failures are reported as [`AuthErrorKind`], never as raw provider codes.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthErrorKind>;

    async fn lookup_role(&self, uid: &str) -> Result<Option<String>, AuthErrorKind>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::AdminAccountConfig;

    pub(crate) const TEST_PASSWORD: &str = "admin123";

    /// Static admin account with a cheap bcrypt hash.
    pub(crate) fn test_account() -> AdminAccountConfig {
        AdminAccountConfig {
            uid: "admin-user-id".to_string(),
            email: "admin@example.com".to_string(),
            password_hash: bcrypt::hash(TEST_PASSWORD, 4).unwrap(),
            display_name: Some("Site Admin".to_string()),
            role: ADMIN_ROLE.to_string(),
            uses_default_password: false,
        }
    }

    #[test]
    fn test_name_prefers_display_name() {
        let mut identity = Identity {
            uid: "u1".to_string(),
            email: "ada@example.com".to_string(),
            display_name: Some("Ada".to_string()),
        };
        assert_eq!(identity.name(), "Ada");

        identity.display_name = Some("  ".to_string());
        assert_eq!(identity.name(), "ada@example.com");

        identity.display_name = None;
        assert_eq!(identity.name(), "ada@example.com");
    }
}
