//! User directory
//!
//! Resolves the account a subscription is for.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find(&self, user_id: &str) -> Result<Option<User>>;
}

// == In-Memory Directory ==
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserDirectory {
    users: HashMap<String, User>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory holding the single demo account `1`.
    pub fn with_demo_user() -> Self {
        Self::new().with_user(User {
            id: "1".to_string(),
            email: "user@example.com".to_string(),
            name: "Test User".to_string(),
        })
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.users.insert(user.id.clone(), user);
        self
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.users.get(user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_demo_user_lookup() {
        let users = InMemoryUserDirectory::with_demo_user();

        let user = users.find("1").await.unwrap().unwrap();
        assert_eq!(user.email, "user@example.com");
        assert!(users.find("2").await.unwrap().is_none());
    }
}
