use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::fmt;
use std::sync::{Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};

/// Credentials are dropped this long before the service says they expire,
/// so a request signed just before expiry is not rejected in flight.
const EXPIRY_MARGIN_SECONDS: i64 = 60;

/// Temporary credentials returned by login.
#[derive(Clone)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
    pub session_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credentials {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|expires_at| now + ChronoDuration::seconds(EXPIRY_MARGIN_SECONDS) >= expires_at)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Default)]
struct SessionState {
    credentials: Option<Credentials>,
    last_error: Option<String>,
}

/// Process-wide authentication state shared by every read.
///
/// State lives behind a plain mutex that is never held across an await; the
/// async `login_gate` serializes logins so concurrent reads trigger at most
/// one in-flight login.
#[derive(Debug, Default)]
pub struct Session {
    state: Mutex<SessionState>,
    login_gate: AsyncMutex<()>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials().is_some()
    }

    /// Unexpired credentials, if any.
    pub fn credentials(&self) -> Option<Credentials> {
        let now = Utc::now();
        self.with_state(|state| {
            state
                .credentials
                .as_ref()
                .filter(|credentials| !credentials.is_expired_at(now))
                .cloned()
        })
    }

    pub fn last_error(&self) -> Option<String> {
        self.with_state(|state| state.last_error.clone())
    }

    pub(crate) fn mark_authenticated(&self, credentials: Credentials) {
        self.with_state(|state| {
            state.credentials = Some(credentials);
            state.last_error = None;
        });
    }

    /// A failed login leaves the session unauthenticated; the next call
    /// retries.
    pub(crate) fn mark_failed(&self, message: String) {
        self.with_state(|state| {
            state.credentials = None;
            state.last_error = Some(message);
        });
    }

    pub(crate) async fn login_gate(&self) -> AsyncMutexGuard<'_, ()> {
        self.login_gate.lock().await
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }
}
