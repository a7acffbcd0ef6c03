// Persisted client session state.
//
// Three string-keyed entries: access token, refresh token, and the
// serialized current-user record. Written on login, cleared on logout or
// failed refresh, read once at startup to restore the session.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use secrecy::SecretString;
use tracing::{debug, warn};

use crate::error::Error;
use crate::rest::models::{LoginResponse, User};

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const USER_KEY: &str = "user";

/// String-keyed storage for session entries.
///
/// Implementations must be cheap to call from request paths; the REST
/// client reads the access token on every request.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), Error>;
    fn remove(&self, key: &str) -> Result<(), Error>;
}

/// Process-local session store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// A restored or freshly established session.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub user: Option<User>,
}

/// Observable session lifecycle.
///
/// `Expired` is the terminal outcome of a failed token refresh: callers
/// should route the user back to login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Anonymous,
    Authenticated,
    Expired,
}

/// Write all three entries after a successful login.
pub fn persist_login(store: &dyn SessionStore, login: &LoginResponse) -> Result<(), Error> {
    let user_json =
        serde_json::to_string(&login.user).map_err(|e| Error::Session(e.to_string()))?;
    store.set(ACCESS_TOKEN_KEY, &login.access_token)?;
    store.set(REFRESH_TOKEN_KEY, &login.refresh_token)?;
    store.set(USER_KEY, &user_json)?;
    debug!(user = %login.user.email, "session persisted");
    Ok(())
}

/// Remove every session entry. Individual failures are logged, not fatal.
pub fn clear(store: &dyn SessionStore) {
    for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY] {
        if let Err(e) = store.remove(key) {
            warn!(key, error = %e, "failed to clear session entry");
        }
    }
}

/// Read the persisted session, if an access token exists.
///
/// A corrupt user record is dropped rather than failing the restore.
pub fn restore(store: &dyn SessionStore) -> Option<Session> {
    let access_token = store.get(ACCESS_TOKEN_KEY)?;
    let user = store.get(USER_KEY).and_then(|raw| {
        serde_json::from_str::<User>(&raw)
            .inspect_err(|e| warn!(error = %e, "ignoring unreadable stored user record"))
            .ok()
    });
    Some(Session {
        access_token: SecretString::from(access_token),
        refresh_token: store.get(REFRESH_TOKEN_KEY).map(SecretString::from),
        user,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::rest::models::UserRole;
    use secrecy::ExposeSecret;

    fn login() -> LoginResponse {
        LoginResponse {
            user: User {
                id: "u1".into(),
                email: "ana@campus.edu".into(),
                name: "Ana".into(),
                cpf: None,
                role: UserRole::Technician,
                avatar: None,
                created_at: None,
                updated_at: None,
            },
            access_token: "acc".into(),
            refresh_token: "ref".into(),
        }
    }

    #[test]
    fn persist_then_restore() {
        let store = MemorySessionStore::new();
        persist_login(&store, &login()).unwrap();

        let session = restore(&store).unwrap();
        assert_eq!(session.access_token.expose_secret(), "acc");
        assert_eq!(session.refresh_token.unwrap().expose_secret(), "ref");
        assert_eq!(session.user.unwrap().email, "ana@campus.edu");
    }

    #[test]
    fn clear_removes_all_three_entries() {
        let store = MemorySessionStore::new();
        persist_login(&store, &login()).unwrap();
        clear(&store);

        assert!(store.get(ACCESS_TOKEN_KEY).is_none());
        assert!(store.get(REFRESH_TOKEN_KEY).is_none());
        assert!(store.get(USER_KEY).is_none());
        assert!(restore(&store).is_none());
    }

    #[test]
    fn corrupt_user_record_is_dropped() {
        let store = MemorySessionStore::new();
        store.set(ACCESS_TOKEN_KEY, "acc").unwrap();
        store.set(USER_KEY, "{not json").unwrap();

        let session = restore(&store).unwrap();
        assert!(session.user.is_none());
        assert!(session.refresh_token.is_none());
    }
}
