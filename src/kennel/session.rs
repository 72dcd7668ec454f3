use crate::error::Result;
use crate::store::backend::StorageBackend;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tracing::{debug, warn};

pub const SESSION_KEY: &str = "kennel_session";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub remember: bool,
}

impl Session {
    /// One day, or thirty when "remember me" was ticked.
    pub fn lifetime(&self) -> Duration {
        if self.remember {
            Duration::days(30)
        } else {
            Duration::days(1)
        }
    }

    /// Sessions stamped in the future are treated as invalid.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.timestamp <= now && now - self.timestamp < self.lifetime()
    }
}

/// The logged-in user on this device.
pub struct SessionManager {
    backend: Rc<dyn StorageBackend>,
}

impl SessionManager {
    pub fn new(backend: Rc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    pub fn start(&self, username: &str, remember: bool) -> Result<Session> {
        let session = Session {
            username: username.to_string(),
            timestamp: Utc::now(),
            remember,
        };
        self.backend
            .write_key(SESSION_KEY, &serde_json::to_string(&session)?)?;
        debug!(username, remember, "session started");
        Ok(session)
    }

    /// The active session. Expired or unreadable sessions are removed.
    pub fn current(&self) -> Option<Session> {
        self.current_at(Utc::now())
    }

    pub fn current_at(&self, now: DateTime<Utc>) -> Option<Session> {
        let raw = match self.backend.read_key(SESSION_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "session unreadable");
                return None;
            }
        };
        match serde_json::from_str::<Session>(&raw) {
            Ok(session) if session.is_active_at(now) => Some(session),
            Ok(_) => {
                debug!("session expired");
                self.discard();
                None
            }
            Err(e) => {
                warn!(error = %e, "session is corrupt, discarding");
                self.discard();
                None
            }
        }
    }

    pub fn clear(&self) -> Result<()> {
        self.backend.remove_key(SESSION_KEY)
    }

    fn discard(&self) {
        if let Err(e) = self.clear() {
            warn!(error = %e, "could not remove stale session");
        }
    }
}
