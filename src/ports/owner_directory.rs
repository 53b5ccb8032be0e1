//! OwnerDirectory port - read-only view of the platform's users.
//!
//! User records belong to the identity subsystem. Billing only checks that
//! the id a checkout placed in event metadata names a real user.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, UserId};

/// A platform user as billing sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub user_id: UserId,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl Owner {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            email: None,
            name: None,
        }
    }
}

#[async_trait]
pub trait OwnerDirectory: Send + Sync {
    /// Looks up a user by identity-provider id.
    async fn find_by_user_id(&self, user_id: &UserId) -> Result<Option<Owner>, DomainError>;
}
