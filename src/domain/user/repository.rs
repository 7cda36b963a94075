//! User repository traits

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::{User, UserId};
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Read-only capability used by the validator to check email uniqueness
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EmailLookup: Send + Sync {
    /// ID of the user owning a normalised email, if any
    async fn find_id_by_email(&self, email: &str) -> Result<Option<UserId>, DomainError>;
}

/// Repository trait for user storage
///
/// Implementations must enforce email uniqueness themselves and report a
/// clash as [`DomainError::Conflict`], since a check made before `create`
/// can race with a concurrent registration.
#[async_trait]
pub trait UserRepository: EmailLookup + Debug {
    /// Get a user by their ID
    async fn get(&self, id: &UserId) -> Result<Option<User>, DomainError>;

    /// Get a user by their normalised email (for login)
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;

    /// Create a new user
    async fn create(&self, user: User) -> Result<User, DomainError>;

    /// Update an existing user
    async fn update(&self, user: &User) -> Result<User, DomainError>;

    /// List all users, oldest first
    async fn list(&self) -> Result<Vec<User>, DomainError>;

    /// Count stored users
    async fn count(&self) -> Result<usize, DomainError>;
}
