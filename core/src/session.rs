//! Session manager: one transport, one identity, one login handshake.
//!
//! # Design
//! The cookie jar lives in the transport; the identity lives here behind a
//! `RwLock`. `login` holds the write lock for the whole handshake, so two
//! logins cannot interleave token extraction and submission, and a dispatch
//! never runs against a half-finished login. Dispatch (see `dispatch.rs`)
//! only ever takes the read lock.

use parking_lot::RwLock;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, RequestBody};
use crate::routes::{self, Origin};
use crate::scrape::{self, LoginTokenExtractor, PageExtractor, UserIdExtractor};
use crate::transport::Transport;
use crate::user::User;

pub struct Session<T: Transport> {
    pub(crate) transport: T,
    pub(crate) config: ClientConfig,
    user: RwLock<Option<User>>,
}

impl<T: Transport> Session<T> {
    /// An anonymous session.
    pub fn new(config: ClientConfig, transport: T) -> Self {
        Self {
            transport,
            config,
            user: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn current_user(&self) -> Option<User> {
        self.user.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.read().is_some()
    }

    /// Forget the identity. Cookies stay in the transport.
    pub fn logout(&self) {
        *self.user.write() = None;
    }

    /// Log in with site credentials.
    ///
    /// Returns `Ok(false)` when the site rejects the credentials; the previous
    /// identity, if any, is kept. Returns `LayoutChanged` when the login or
    /// landing page no longer has the expected structure.
    pub fn login(&self, username: &str, password: &str) -> Result<bool, ApiError> {
        let mut user = self.user.write();

        let url = routes::resolve(&self.config, "login", Origin::Frontend, &[])?;
        let form = self
            .transport
            .execute(HttpRequest::get(&url, self.config.timeout))?;
        let token = LoginTokenExtractor.extract(&form.body)?;

        let body = RequestBody::form([
            ("anchor", ""),
            ("logintoken", token.as_str()),
            ("username", username),
            ("password", password),
            ("rememberusername", "1"),
        ]);
        let landing = self
            .transport
            .execute(HttpRequest::post(&url, body, self.config.timeout))?;

        if !scrape::is_logged_in(&landing.body, &self.config.logged_in_marker) {
            tracing::info!(username, status = landing.status, "login rejected");
            return Ok(false);
        }

        let id = UserIdExtractor.extract(&landing.body)?;
        tracing::info!(username, user_id = id, "logged in");
        *user = Some(User::new(id));
        Ok(true)
    }

    /// Read access for the dispatcher.
    pub(crate) fn require_user(&self) -> Result<User, ApiError> {
        self.user.read().clone().ok_or(ApiError::Unauthorized)
    }
}
