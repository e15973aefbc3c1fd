//! Identity backends: the `admin_users`/`user_roles` tables, or a single
//! account from configuration when running without a database.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use tokio::sync::Mutex;

use super::{Identity, IdentityProvider};
use crate::config::AdminAccountConfig;
use crate::db::models::AdminUserRow;
use crate::error::AuthErrorKind;
use crate::store::Clock;

/// Consecutive failures before the account is locked
pub const LOCKOUT_THRESHOLD: i32 = 5;
pub const LOCKOUT_MINUTES: i64 = 15;

/// bcrypt is CPU-bound; keep it off the async workers.
async fn verify_password(password: &str, hash: &str) -> Result<bool, AuthErrorKind> {
    let password = password.to_string();
    let hash = hash.to_string();
    match tokio::task::spawn_blocking(move || bcrypt::verify(&password, &hash)).await {
        Ok(Ok(ok)) => Ok(ok),
        Ok(Err(e)) => {
            tracing::error!("Stored password hash is unusable: {}", e);
            Err(AuthErrorKind::Unavailable)
        }
        Err(e) => {
            tracing::error!("spawn_blocking panic during password verify: {}", e);
            Err(AuthErrorKind::Unavailable)
        }
    }
}

fn is_locked(locked_until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    locked_until.is_some_and(|until| until > now)
}

/// Failure bookkeeping for one account.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Attempts {
    failures: i32,
    locked_until: Option<DateTime<Utc>>,
}

impl Attempts {
    /// Counts one wrong password. The failure that reaches the threshold
    /// locks the account and starts the count over.
    fn fail(&mut self, now: DateTime<Utc>) -> AuthErrorKind {
        self.failures += 1;
        if self.failures >= LOCKOUT_THRESHOLD {
            self.failures = 0;
            self.locked_until = Some(now + Duration::minutes(LOCKOUT_MINUTES));
            return AuthErrorKind::RateLimited;
        }
        AuthErrorKind::WrongCredential
    }
}

pub struct StaticIdentityProvider {
    account: AdminAccountConfig,
    attempts: Mutex<Attempts>,
    clock: Arc<dyn Clock>,
}

impl StaticIdentityProvider {
    pub fn new(account: AdminAccountConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            account,
            attempts: Mutex::new(Attempts::default()),
            clock,
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthErrorKind> {
        if !email.eq_ignore_ascii_case(&self.account.email) {
            tracing::warn!("Login attempt for unknown user: {}", email);
            return Err(AuthErrorKind::AccountNotFound);
        }

        let now = self.clock.now();
        if is_locked(self.attempts.lock().await.locked_until, now) {
            tracing::warn!("Login attempt on locked account: {}", email);
            return Err(AuthErrorKind::RateLimited);
        }

        let ok = verify_password(password, &self.account.password_hash).await?;
        let mut attempts = self.attempts.lock().await;
        if !ok {
            let outcome = attempts.fail(now);
            tracing::warn!(failures = attempts.failures, "Failed login attempt for: {}", email);
            return Err(outcome);
        }

        *attempts = Attempts::default();
        Ok(Identity {
            uid: self.account.uid.clone(),
            email: self.account.email.clone(),
            display_name: self.account.display_name.clone(),
        })
    }

    async fn lookup_role(&self, uid: &str) -> Result<Option<String>, AuthErrorKind> {
        Ok((uid == self.account.uid).then(|| self.account.role.clone()))
    }
}

pub struct PgIdentityProvider {
    pool: Arc<PgPool>,
    clock: Arc<dyn Clock>,
}

impl PgIdentityProvider {
    pub fn new(pool: Arc<PgPool>, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    async fn record_failure(
        &self,
        user_id: &str,
        attempts: Attempts,
        now: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE admin_users \
                 SET login_attempts = $2, locked_until = $3, updated_at = $4 \
                 WHERE id = $1",
        )
        .bind(user_id)
        .bind(attempts.failures)
        .bind(attempts.locked_until)
        .bind(now)
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for PgIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthErrorKind> {
        let row = sqlx::query_as::<_, AdminUserRow>(
            r#"SELECT id, email, password_hash, display_name, is_active, login_attempts, locked_until
               FROM admin_users
               WHERE LOWER(email) = LOWER($1)"#,
        )
        .bind(email)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(|e| {
            tracing::error!("Database error during login: {}", e);
            AuthErrorKind::Unavailable
        })?;

        let Some(user) = row else {
            tracing::warn!("Login attempt for unknown user: {}", email);
            return Err(AuthErrorKind::AccountNotFound);
        };

        let now = self.clock.now();
        if is_locked(user.locked_until, now) {
            tracing::warn!("Login attempt on locked account: {}", user.email);
            return Err(AuthErrorKind::RateLimited);
        }
        if !user.is_active {
            return Err(AuthErrorKind::Disabled);
        }

        if !verify_password(password, &user.password_hash).await? {
            let mut attempts = Attempts {
                failures: user.login_attempts,
                locked_until: user.locked_until,
            };
            let outcome = attempts.fail(now);
            tracing::warn!(failures = attempts.failures, "Failed login attempt for: {}", user.email);
            if let Err(e) = self.record_failure(&user.id, attempts, now).await {
                tracing::error!("Failed to record login attempt: {}", e);
            }
            return Err(outcome);
        }

        if let Err(e) = sqlx::query(
            "UPDATE admin_users \
                 SET last_login_at = $2, login_attempts = 0, locked_until = NULL, updated_at = $2 \
                 WHERE id = $1",
        )
        .bind(&user.id)
        .bind(now)
        .execute(self.pool.as_ref())
        .await
        {
            tracing::warn!("Failed to update last login for {}: {}", user.email, e);
        }

        Ok(Identity {
            uid: user.id,
            email: user.email,
            display_name: user.display_name,
        })
    }

    async fn lookup_role(&self, uid: &str) -> Result<Option<String>, AuthErrorKind> {
        let role: Option<(String,)> = sqlx::query_as("SELECT role FROM user_roles WHERE uid = $1")
            .bind(uid)
            .fetch_optional(self.pool.as_ref())
            .await
            .map_err(|e| {
                tracing::error!("Role lookup failed for {}: {}", uid, e);
                AuthErrorKind::Unavailable
            })?;
        Ok(role.map(|(r,)| r))
    }
}
