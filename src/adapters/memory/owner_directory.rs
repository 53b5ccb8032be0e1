//! In-memory owner directory.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, UserId};
use crate::ports::{Owner, OwnerDirectory};

#[derive(Clone, Default)]
pub struct InMemoryOwnerDirectory {
    owners: Arc<RwLock<HashMap<UserId, Owner>>>,
}

impl InMemoryOwnerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user so events naming it can be attributed.
    pub async fn add(&self, owner: Owner) {
        self.owners.write().await.insert(owner.user_id.clone(), owner);
    }

    /// Convenience for tests: registers each id with no profile details.
    pub async fn with_users<'a>(self, ids: impl IntoIterator<Item = &'a str>) -> Self {
        for id in ids {
            if let Ok(user_id) = UserId::new(id) {
                self.add(Owner::new(user_id)).await;
            }
        }
        self
    }
}

#[async_trait]
impl OwnerDirectory for InMemoryOwnerDirectory {
    async fn find_by_user_id(&self, user_id: &UserId) -> Result<Option<Owner>, DomainError> {
        Ok(self.owners.read().await.get(user_id).cloned())
    }
}
