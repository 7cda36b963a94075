//! User service for registration and authentication

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::user::{
    normalize_email, Credentials, RecordState, User, UserDraft, UserField, UserId,
    UserRepository, UserValidationError, UserValidator, ValidationErrors,
};
use crate::domain::DomainError;

use super::password::PasswordHasher;

/// Errors returned by user-changing operations
#[derive(Debug, Error)]
pub enum UserServiceError {
    /// The submitted values broke one or more field rules
    #[error("User is invalid: {0}")]
    Invalid(ValidationErrors),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Request for registering a new user
pub type RegisterUserRequest = UserDraft;

/// Request for editing a stored user
///
/// Omitted fields keep their stored value; an omitted or blank password keeps
/// the stored hash.
#[derive(Debug, Clone, Default)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// User service for registration and authentication
#[derive(Debug)]
pub struct UserService<R: UserRepository, H: PasswordHasher> {
    repository: Arc<R>,
    hasher: Arc<H>,
}

impl<R: UserRepository, H: PasswordHasher> UserService<R, H> {
    /// Create a new user service
    pub fn new(repository: Arc<R>, hasher: Arc<H>) -> Self {
        Self { repository, hasher }
    }

    /// Validate a draft without storing anything
    pub async fn validate(
        &self,
        draft: &UserDraft,
        state: RecordState,
    ) -> Result<ValidationErrors, DomainError> {
        UserValidator::new(self.repository.as_ref())
            .validate(draft, state)
            .await
    }

    /// Register a new user
    ///
    /// Nothing is stored unless the draft passes every rule.
    pub async fn register(&self, request: RegisterUserRequest) -> Result<User, UserServiceError> {
        let errors = self.validate(&request, RecordState::New).await?;

        if !errors.is_valid() {
            return Err(UserServiceError::Invalid(errors));
        }

        let password_hash = self.hasher.hash(&request.password)?;
        let user = User::new(
            UserId::generate(),
            request.first_name,
            request.last_name,
            &request.email,
            password_hash,
        );

        let user = self
            .repository
            .create(user)
            .await
            .map_err(conflict_as_taken_email)?;

        info!(user_id = %user.id(), "User registered");
        Ok(user)
    }

    /// Update a stored user
    pub async fn update(
        &self,
        id: &str,
        request: UpdateUserRequest,
    ) -> Result<User, UserServiceError> {
        let user_id = UserId::parse(id)?;

        let mut user = self
            .repository
            .get(&user_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("User '{}' not found", id)))?;

        let mut draft = UserDraft::from_user(&user);

        if let Some(first_name) = request.first_name {
            draft.first_name = first_name;
        }
        if let Some(last_name) = request.last_name {
            draft.last_name = last_name;
        }
        if let Some(email) = request.email {
            draft.email = email;
        }
        if let Some(password) = request.password {
            draft.password = password;
        }

        let errors = self
            .validate(&draft, RecordState::Persisted(user_id))
            .await?;

        if !errors.is_valid() {
            return Err(UserServiceError::Invalid(errors));
        }

        user.apply_profile(&draft);

        if !draft.password.trim().is_empty() {
            user.set_password_hash(self.hasher.hash(&draft.password)?);
        }

        let user = self
            .repository
            .update(&user)
            .await
            .map_err(conflict_as_taken_email)?;

        info!(user_id = %user.id(), "User updated");
        Ok(user)
    }

    /// Authenticate an email/password pair
    ///
    /// Returns `Ok(None)` for every kind of mismatch without saying which part
    /// was wrong. `Err` only reports a storage failure.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<Option<User>, DomainError> {
        let Some(email) = credentials
            .email
            .as_deref()
            .filter(|email| !email.trim().is_empty())
        else {
            debug!("Authentication rejected: no email supplied");
            return Ok(None);
        };

        let Some(user) = self.repository.find_by_email(&normalize_email(email)).await? else {
            debug!("Authentication rejected: unknown email");
            return Ok(None);
        };

        let Some(password) = credentials.password.as_deref() else {
            debug!(user_id = %user.id(), "Authentication rejected: no password supplied");
            return Ok(None);
        };

        if !self.hasher.verify(password, user.password_hash()) {
            warn!(user_id = %user.id(), "Authentication rejected: wrong password");
            return Ok(None);
        }

        Ok(Some(user))
    }

    /// Get a user by ID
    pub async fn get(&self, id: &str) -> Result<Option<User>, DomainError> {
        let user_id = UserId::parse(id)?;
        self.repository.get(&user_id).await
    }

    /// Get a user by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        self.repository.find_by_email(&normalize_email(email)).await
    }

    /// List all users
    pub async fn list(&self) -> Result<Vec<User>, DomainError> {
        self.repository.list().await
    }

    /// Count users
    pub async fn count(&self) -> Result<usize, DomainError> {
        self.repository.count().await
    }
}

/// A store-level uniqueness clash means another registration won the race
/// for the same email; report it like the validator would have.
fn conflict_as_taken_email(error: DomainError) -> UserServiceError {
    if error.is_conflict() {
        warn!("Email uniqueness enforced by the store: {}", error);

        let mut errors = ValidationErrors::new();
        errors.add(UserField::Email, UserValidationError::Taken);
        UserServiceError::Invalid(errors)
    } else {
        UserServiceError::Domain(error)
    }
}
