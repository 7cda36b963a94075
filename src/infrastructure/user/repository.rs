//! In-memory user repository implementation

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::user::{normalize_email, EmailLookup, User, UserId, UserRepository};
use crate::domain::DomainError;

/// Users plus an email -> ID index, guarded together so that the uniqueness
/// check and the insert happen under one write lock
#[derive(Debug, Default)]
struct UserTable {
    users: HashMap<UserId, User>,
    email_index: HashMap<String, UserId>,
}

impl UserTable {
    fn email_owner(&self, email: &str) -> Option<UserId> {
        self.email_index.get(&normalize_email(email)).copied()
    }
}

/// In-memory implementation of UserRepository
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    table: RwLock<UserTable>,
}

impl InMemoryUserRepository {
    /// Create a new empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository with initial users; later duplicates of an email are skipped
    pub fn with_users(users: Vec<User>) -> Self {
        let mut table = UserTable::default();

        for user in users {
            if table.email_owner(user.email()).is_some() {
                continue;
            }

            table.email_index.insert(user.email().to_string(), *user.id());
            table.users.insert(*user.id(), user);
        }

        Self {
            table: RwLock::new(table),
        }
    }
}

#[async_trait]
impl EmailLookup for InMemoryUserRepository {
    async fn find_id_by_email(&self, email: &str) -> Result<Option<UserId>, DomainError> {
        let table = self.table.read().await;
        Ok(table.email_owner(email))
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn get(&self, id: &UserId) -> Result<Option<User>, DomainError> {
        let table = self.table.read().await;
        Ok(table.users.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let table = self.table.read().await;

        Ok(table
            .email_owner(email)
            .and_then(|id| table.users.get(&id))
            .cloned())
    }

    async fn create(&self, user: User) -> Result<User, DomainError> {
        let mut table = self.table.write().await;

        if table.users.contains_key(user.id()) {
            return Err(DomainError::conflict(format!(
                "User with ID '{}' already exists",
                user.id()
            )));
        }

        if table.email_owner(user.email()).is_some() {
            return Err(DomainError::conflict(format!(
                "Email '{}' is already registered",
                user.email()
            )));
        }

        table
            .email_index
            .insert(user.email().to_string(), *user.id());
        table.users.insert(*user.id(), user.clone());

        Ok(user)
    }

    async fn update(&self, user: &User) -> Result<User, DomainError> {
        let mut table = self.table.write().await;

        let old_email = match table.users.get(user.id()) {
            Some(existing) => existing.email().to_string(),
            None => {
                return Err(DomainError::not_found(format!(
                    "User '{}' not found",
                    user.id()
                )));
            }
        };

        if old_email != user.email() {
            if let Some(owner) = table.email_owner(user.email()) {
                if owner != *user.id() {
                    return Err(DomainError::conflict(format!(
                        "Email '{}' is already registered",
                        user.email()
                    )));
                }
            }

            table.email_index.remove(&old_email);
            table
                .email_index
                .insert(user.email().to_string(), *user.id());
        }

        table.users.insert(*user.id(), user.clone());

        Ok(user.clone())
    }

    async fn list(&self) -> Result<Vec<User>, DomainError> {
        let table = self.table.read().await;

        let mut users: Vec<User> = table.users.values().cloned().collect();
        users.sort_by_key(|u| u.created_at());

        Ok(users)
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let table = self.table.read().await;
        Ok(table.users.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::UserDraft;

    fn create_test_user(email: &str) -> User {
        User::new(UserId::generate(), "Foo", "Bar", email, "hashed_password")
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = InMemoryUserRepository::new();
        let user = create_test_user("foo@bar.com");

        repo.create(user.clone()).await.unwrap();

        let retrieved = repo.get(user.id()).await.unwrap();
        assert_eq!(retrieved, Some(user));
    }

    #[tokio::test]
    async fn test_find_by_email_is_case_insensitive() {
        let repo = InMemoryUserRepository::new();
        let user = create_test_user("foo@bar.com");

        repo.create(user.clone()).await.unwrap();

        let retrieved = repo.find_by_email("Foo@Bar.com").await.unwrap();
        assert_eq!(retrieved.map(|u| *u.id()), Some(*user.id()));

        let not_found = repo.find_by_email("nonexistent@x.com").await.unwrap();
        assert!(not_found.is_none());
    }

    #[tokio::test]
    async fn test_find_id_by_email() {
        let repo = InMemoryUserRepository::new();
        let user = create_test_user("foo@bar.com");

        repo.create(user.clone()).await.unwrap();

        assert_eq!(
            repo.find_id_by_email("foo@bar.com").await.unwrap(),
            Some(*user.id())
        );
        assert_eq!(repo.find_id_by_email("bar@foo.com").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let repo = InMemoryUserRepository::new();

        repo.create(create_test_user("foo@bar.com")).await.unwrap();

        let result = repo.create(create_test_user("FOO@bar.com")).await;
        assert!(matches!(result, Err(DomainError::Conflict { .. })));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_id() {
        let repo = InMemoryUserRepository::new();
        let user = create_test_user("foo@bar.com");
        let mut clash = user.clone();
        clash.apply_profile(&UserDraft::new("Foo", "Bar", "other@bar.com", ""));

        repo.create(user).await.unwrap();

        let result = repo.create(clash).await;
        assert!(matches!(result, Err(DomainError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_update_moves_email_index() {
        let repo = InMemoryUserRepository::new();
        let mut user = create_test_user("foo@bar.com");

        repo.create(user.clone()).await.unwrap();

        user.apply_profile(&UserDraft::new("Foo", "Bar", "new@bar.com", ""));
        repo.update(&user).await.unwrap();

        assert!(repo.find_by_email("foo@bar.com").await.unwrap().is_none());
        assert!(repo.find_by_email("new@bar.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_email_conflict() {
        let repo = InMemoryUserRepository::new();
        let mut user = create_test_user("second@bar.com");

        repo.create(create_test_user("first@bar.com")).await.unwrap();
        repo.create(user.clone()).await.unwrap();

        user.apply_profile(&UserDraft::new("Foo", "Bar", "first@bar.com", ""));

        let result = repo.update(&user).await;
        assert!(matches!(result, Err(DomainError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_update_missing_user() {
        let repo = InMemoryUserRepository::new();

        let result = repo.update(&create_test_user("foo@bar.com")).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_and_count() {
        let repo = InMemoryUserRepository::new();

        repo.create(create_test_user("one@bar.com")).await.unwrap();
        repo.create(create_test_user("two@bar.com")).await.unwrap();

        assert_eq!(repo.list().await.unwrap().len(), 2);
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_with_users_skips_duplicate_emails() {
        let repo = InMemoryUserRepository::with_users(vec![
            create_test_user("one@bar.com"),
            create_test_user("two@bar.com"),
            create_test_user("one@bar.com"),
        ]);

        assert_eq!(repo.count().await.unwrap(), 2);
    }
}
