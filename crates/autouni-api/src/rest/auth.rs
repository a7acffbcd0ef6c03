// Authentication endpoints
//
// Login persists the three session entries; logout always clears local
// state, even when the server-side call fails.

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::rest::client::ApiClient;
use crate::rest::models::{ChangePasswordRequest, LoginRequest, LoginResponse, User};
use crate::session::{self, Session, SessionEvent, USER_KEY};

impl ApiClient {
    /// Authenticate with email and password.
    ///
    /// `POST /auth/login`. On success the tokens and user record are written
    /// to the session store.
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<LoginResponse, Error> {
        debug!(email, "logging in");
        let login: LoginResponse = self
            .post_anonymous(
                "auth/login",
                &LoginRequest {
                    email,
                    password: password.expose_secret(),
                },
            )
            .await?;

        session::persist_login(self.session_store().as_ref(), &login)?;
        self.publish(SessionEvent::Authenticated);
        info!(user = %login.user.email, role = ?login.user.role, "logged in");
        Ok(login)
    }

    /// End the session.
    ///
    /// `POST /auth/logout`, then clear the session store regardless of the
    /// server's answer.
    pub async fn logout(&self) -> Result<(), Error> {
        if self.is_authenticated() {
            if let Err(e) = self.post_no_response("auth/logout", None::<&()>).await {
                warn!(error = %e, "server-side logout failed, clearing local session anyway");
            }
        }
        session::clear(self.session_store().as_ref());
        self.publish(SessionEvent::Anonymous);
        info!("logged out");
        Ok(())
    }

    /// Fetch the current user and refresh the stored user record.
    ///
    /// `GET /auth/me`
    pub async fn me(&self) -> Result<User, Error> {
        let user: User = self.get("auth/me").await?;
        match serde_json::to_string(&user) {
            Ok(json) => self.session_store().set(USER_KEY, &json)?,
            Err(e) => warn!(error = %e, "could not serialize user record"),
        }
        Ok(user)
    }

    /// `POST /auth/change-password`
    pub async fn change_password(
        &self,
        current: &SecretString,
        new: &SecretString,
    ) -> Result<(), Error> {
        debug!("changing password");
        self.post_no_response(
            "auth/change-password",
            Some(&ChangePasswordRequest {
                current_password: current.expose_secret(),
                new_password: new.expose_secret(),
            }),
        )
        .await
    }

    /// Read the persisted session at startup.
    ///
    /// Returns `None` when no access token is stored.
    pub fn restore_session(&self) -> Option<Session> {
        let restored = session::restore(self.session_store().as_ref());
        if restored.is_some() {
            debug!("restored persisted session");
            self.publish(SessionEvent::Authenticated);
        }
        restored
    }
}
