//! Acting-user resolution.

use async_trait::async_trait;
use common::UserId;

/// Supplies the identity a note is recorded under.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns the acting user, or `None` if nobody is signed in.
    async fn current_user(&self) -> Option<UserId>;
}

/// Identity fixed at construction, e.g. resolved from a request header.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(Option<UserId>);

impl StaticIdentity {
    pub fn new(user: UserId) -> Self {
        Self(Some(user))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl From<Option<UserId>> for StaticIdentity {
    fn from(user: Option<UserId>) -> Self {
        Self(user)
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_user(&self) -> Option<UserId> {
        self.0.clone()
    }
}
