//! Sessions: one signed-in identity with change listeners, and the registry
//! of live sessions the HTTP layer resolves tokens against.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{Identity, IdentityProvider, ADMIN_ROLE};
use crate::error::AuthErrorKind;

pub type Listener = Arc<dyn Fn(Option<&Identity>) + Send + Sync>;

/// Handle returned by [`Session::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

#[derive(Debug, Clone, Default)]
struct SessionState {
    user: Option<Identity>,
    role: Option<String>,
}

pub struct Session {
    id: String,
    provider: Arc<dyn IdentityProvider>,
    state: RwLock<SessionState>,
    listeners: Mutex<Vec<(Subscription, Listener)>>,
    next_subscription: AtomicU64,
}

impl Session {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            provider,
            state: RwLock::new(SessionState::default()),
            listeners: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn current_user(&self) -> Option<Identity> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .user
            .clone()
    }

    pub fn role(&self) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .role
            .clone()
    }

    pub fn is_admin(&self) -> bool {
        self.role().as_deref() == Some(ADMIN_ROLE)
    }

    /// Registers `listener` and calls it once with the current identity.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(Option<&Identity>) + Send + Sync + 'static,
    {
        let subscription = Subscription(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        let listener: Listener = Arc::new(listener);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((subscription, listener.clone()));
        listener(self.current_user().as_ref());
        subscription
    }

    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(s, _)| *s != subscription);
        listeners.len() != before
    }

    fn notify(&self) {
        let user = self.current_user();
        // listeners may touch the session or the registry; call them unlocked
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener(user.as_ref());
        }
    }

    /// Signs in through the provider, then resolves the role. A failed role
    /// lookup leaves the user signed in without a role.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthErrorKind> {
        let identity = self.provider.sign_in(email, password).await?;
        let role = match self.provider.lookup_role(&identity.uid).await {
            Ok(role) => role,
            Err(e) => {
                tracing::warn!(uid = %identity.uid, "Role lookup failed, continuing without role: {}", e);
                None
            }
        };

        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.user = Some(identity.clone());
            state.role = role;
        }
        tracing::info!(uid = %identity.uid, session = %self.id, "Signed in");
        self.notify();
        Ok(identity)
    }

    /// Idempotent; listeners only fire when someone was signed in.
    pub fn sign_out(&self) {
        let was_signed_in = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let was = state.user.is_some();
            *state = SessionState::default();
            was
        };
        if was_signed_in {
            tracing::info!(session = %self.id, "Signed out");
            self.notify();
        }
    }
}

struct Entry {
    session: Arc<Session>,
    refresh_hash: String,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct Sessions {
    by_id: HashMap<String, Entry>,
    by_refresh: HashMap<String, String>,
}

impl Sessions {
    fn remove(&mut self, sid: &str) -> Option<Entry> {
        let entry = self.by_id.remove(sid)?;
        self.by_refresh.remove(&entry.refresh_hash);
        Some(entry)
    }

    /// Drops every entry whose refresh window has passed.
    fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let expired: Vec<String> = self
            .by_id
            .iter()
            .filter(|(_, e)| e.expires_at <= now)
            .map(|(sid, _)| sid.clone())
            .collect();
        for sid in &expired {
            self.remove(sid);
        }
        expired.len()
    }

    fn live(&mut self, sid: &str, now: DateTime<Utc>) -> Option<Arc<Session>> {
        let expired = self.by_id.get(sid)?.expires_at <= now;
        if expired {
            self.remove(sid);
            return None;
        }
        self.by_id.get(sid).map(|e| e.session.clone())
    }
}

/// Live sessions keyed by id, with a refresh-token-hash index.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<Sessions>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Sessions> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Tracks `session` until it signs out or `expires_at` passes. Entries
    /// already expired at `now` are dropped on the way in.
    pub fn register(
        &self,
        session: Arc<Session>,
        refresh_hash: String,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) {
        let sid = session.id().to_string();
        {
            let mut sessions = self.lock();
            let pruned = sessions.prune(now);
            if pruned > 0 {
                tracing::debug!(pruned, "expired sessions dropped");
            }
            sessions.by_refresh.insert(refresh_hash.clone(), sid.clone());
            sessions.by_id.insert(
                sid.clone(),
                Entry {
                    session: session.clone(),
                    refresh_hash,
                    expires_at,
                },
            );
        }

        let registry = Arc::downgrade(&self.inner);
        session.subscribe(move |user| {
            if user.is_some() {
                return;
            }
            if let Some(inner) = registry.upgrade() {
                inner
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&sid);
            }
        });
    }

    pub fn get(&self, sid: &str, now: DateTime<Utc>) -> Option<Arc<Session>> {
        self.lock().live(sid, now)
    }

    pub fn find_by_refresh(&self, refresh_hash: &str, now: DateTime<Utc>) -> Option<Arc<Session>> {
        let mut sessions = self.lock();
        let sid = sessions.by_refresh.get(refresh_hash)?.clone();
        sessions.live(&sid, now)
    }

    /// Replaces the session's refresh token; the old one stops resolving.
    pub fn rotate(&self, sid: &str, refresh_hash: String, expires_at: DateTime<Utc>) -> bool {
        let mut sessions = self.lock();
        let Some(entry) = sessions.by_id.get_mut(sid) else {
            return false;
        };
        let old = std::mem::replace(&mut entry.refresh_hash, refresh_hash.clone());
        entry.expires_at = expires_at;
        sessions.by_refresh.remove(&old);
        sessions.by_refresh.insert(refresh_hash, sid.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
