//! User domain
//!
//! This module provides domain types and traits for user registration and
//! authentication, including the user entity, validation rules, and
//! repository traits.

mod entity;
mod repository;
mod validation;

pub use entity::{Credentials, RecordState, User, UserDraft, UserId};
pub use repository::{EmailLookup, UserRepository};
pub use validation::{
    normalize_email, validate_email, validate_fields, validate_name, validate_password,
    UserField, UserValidationError, UserValidator, ValidationErrors, MAX_EMAIL_LENGTH,
    MAX_NAME_LENGTH, MAX_PASSWORD_LENGTH, MIN_NAME_LENGTH, MIN_PASSWORD_LENGTH,
    NAME_SPECIAL_CHARACTERS,
};

#[cfg(test)]
pub use repository::MockEmailLookup;
