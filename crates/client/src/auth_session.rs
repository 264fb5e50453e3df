//! Authenticated session handed to the client by the host application.
//!
//! Token exchange with the LMS happens elsewhere; the pipeline only needs an
//! identity to scope its push subscription and a bearer token to present.

/// Identity of the currently signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub user_id: i64,
    pub token: String,
}

impl AuthSession {
    pub fn new(user_id: i64, token: impl Into<String>) -> Self {
        Self {
            user_id,
            token: token.into(),
        }
    }
}
