//! Session data model.

use serde::{Deserialize, Serialize};

/// Identity returned by `user/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Response of the sign-in and register endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[derive(Debug, Serialize)]
pub(crate) struct SignInRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub username: &'a str,
}

/// Authentication phase derived from the session fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No resolved identity.
    Unauthenticated,
    /// A sign-in, sign-up or identity fetch is in flight.
    Authenticating,
    /// Token and identity are both held.
    Authenticated,
}

/// The client's authentication state.
///
/// `user` is only ever set while `token` is set; teardown clears both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<User>,
    #[serde(default)]
    pub loading: bool,
}

impl Session {
    pub fn phase(&self) -> SessionPhase {
        if self.loading {
            SessionPhase::Authenticating
        } else if self.is_authenticated() {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Unauthenticated
        }
    }

    /// True once the identity behind the token has been resolved.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }

    /// Token and user are either both present or both absent.
    pub fn is_consistent(&self) -> bool {
        self.token.is_some() == self.user.is_some()
    }
}
