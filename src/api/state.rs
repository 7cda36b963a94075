//! Application state for shared services

use std::sync::Arc;

use crate::domain::user::{Credentials, User, UserRepository};
use crate::domain::DomainError;
use crate::infrastructure::user::{
    PasswordHasher, RegisterUserRequest, UserService, UserServiceError,
};

/// Application state containing shared services using dynamic dispatch
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<dyn UserServiceTrait>,
}

impl AppState {
    pub fn new(user_service: Arc<dyn UserServiceTrait>) -> Self {
        Self { user_service }
    }
}

/// Trait for user service operations used by the HTTP layer
#[async_trait::async_trait]
pub trait UserServiceTrait: Send + Sync {
    async fn register(&self, request: RegisterUserRequest) -> Result<User, UserServiceError>;
    async fn authenticate(&self, credentials: &Credentials) -> Result<Option<User>, DomainError>;
    async fn count(&self) -> Result<usize, DomainError>;
}

#[async_trait::async_trait]
impl<R, H> UserServiceTrait for UserService<R, H>
where
    R: UserRepository + 'static,
    H: PasswordHasher + 'static,
{
    async fn register(&self, request: RegisterUserRequest) -> Result<User, UserServiceError> {
        UserService::register(self, request).await
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<Option<User>, DomainError> {
        UserService::authenticate(self, credentials).await
    }

    async fn count(&self) -> Result<usize, DomainError> {
        UserService::count(self).await
    }
}
