use serde::{Deserialize, Serialize};

/// One persisted login session for a single account.
///
/// Created after a successful network login, replaced wholesale on
/// re-login, and destroyed when its record can no longer be decrypted
/// or the user logs out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalUser {
    pub user_id: i64,
    pub email: String,
    pub device_uuid: String,
    pub access_token: String,
    pub refresh_token: String,
}

/// In-memory state for the currently authenticated user.
///
/// Exactly one session is active per client instance; it is created at
/// client construction and torn down with the client (or on logout).
#[derive(Debug, Default)]
pub struct SessionState {
    user: Option<LocalUser>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt `user` as the active session, replacing any previous one.
    pub fn set_user(&mut self, user: LocalUser) {
        self.user = Some(user);
    }

    /// Drop the active session.
    pub fn clear(&mut self) {
        self.user = None;
    }

    pub fn user(&self) -> Option<&LocalUser> {
        self.user.as_ref()
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user.as_ref().map(|u| u.user_id)
    }

    pub fn access_token(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.access_token.as_str())
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.refresh_token.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}
