use labstock_auth::{Identity, SessionToken};

/// The caller behind a validated bearer token.
///
/// Inserted by the auth middleware; present on every protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    identity: Identity,
    token: SessionToken,
}

impl SessionContext {
    pub fn new(identity: Identity, token: SessionToken) -> Self {
        Self { identity, token }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }
}
