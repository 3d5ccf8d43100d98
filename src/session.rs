//! Local display-name sessions.
//!
//! There is no credential check and no server round trip: logging in only
//! records the name the user typed. Anything needing real identity must go
//! through a separate authentication service.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{Result, ScoutError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    /// Opaque, generated locally.
    pub id: String,
    pub display_name: String,
}

/// Holds at most one session until logout.
#[derive(Debug, Default)]
pub struct SessionStore {
    current: Option<UserSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session for `display_name`, replacing any existing one.
    ///
    /// Returns [`ScoutError::Validation`] if the trimmed name is empty.
    pub fn login(&mut self, display_name: &str) -> Result<&UserSession> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(ScoutError::Validation("display name is required".into()));
        }

        tracing::info!(display_name, "local session started");
        Ok(&*self.current.insert(UserSession {
            id: Uuid::new_v4().to_string(),
            display_name: display_name.to_string(),
        }))
    }

    pub fn logout(&mut self) -> Option<UserSession> {
        self.current.take()
    }

    pub fn current(&self) -> Option<&UserSession> {
        self.current.as_ref()
    }

    /// Headline text for the upload screen.
    pub fn greeting(&self) -> String {
        match &self.current {
            Some(user) => format!(
                "Welcome back, {}. Ready for a professional scouting report?",
                user.display_name
            ),
            None => "Upload your best goals and skill moves. Our AI analyst evaluates your \
                     performance and gives you a professional score."
                .to_string(),
        }
    }
}
