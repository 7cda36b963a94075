//! User validation rules
//!
//! Field rules are pure functions over the submitted values. Email uniqueness
//! is the only cross-record rule and goes through the injected
//! [`EmailLookup`], so [`UserValidator`] never touches a store directly.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::entity::{RecordState, UserDraft};
use super::repository::EmailLookup;
use crate::domain::DomainError;

pub const MIN_NAME_LENGTH: usize = 2;
pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Punctuation accepted in names besides letters
pub const NAME_SPECIAL_CHARACTERS: [char; 3] = ['!', '@', '-'];

/// local-part@label(.label)+ where labels are alphanumeric with inner hyphens
static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$",
    )
    .unwrap()
});

/// Validated user attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserField {
    FirstName,
    LastName,
    Email,
    Password,
}

impl UserField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Email => "email",
            Self::Password => "password",
        }
    }

    /// Human-readable label used in full messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::FirstName => "First name",
            Self::LastName => "Last name",
            Self::Email => "Email",
            Self::Password => "Password",
        }
    }
}

impl fmt::Display for UserField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason a single field failed validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    #[error("can't be blank")]
    Blank,

    #[error("is too short (minimum is {0} characters)")]
    TooShort(usize),

    #[error("is too long (maximum is {0} characters)")]
    TooLong(usize),

    #[error("contains invalid character '{0}'. Only letters and ! @ - are allowed")]
    InvalidNameCharacter(char),

    #[error("is not a valid email address")]
    InvalidEmail,

    #[error("has already been taken")]
    Taken,

    #[error("must contain at least one letter")]
    MissingLetter,

    #[error("must contain at least one number")]
    MissingDigit,

    #[error("must contain at least one special character")]
    MissingSpecialCharacter,
}

/// Field-level verdict of a validation run; empty means valid
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: BTreeMap<UserField, Vec<UserValidationError>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one failure for a field
    pub fn add(&mut self, field: UserField, error: UserValidationError) {
        self.errors.entry(field).or_default().push(error);
    }

    /// Record every failure for a field; no-op for an empty list
    pub fn extend(&mut self, field: UserField, errors: Vec<UserValidationError>) {
        if errors.is_empty() {
            return;
        }

        self.errors.entry(field).or_default().extend(errors);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Reasons recorded for a field
    pub fn get(&self, field: UserField) -> &[UserValidationError] {
        self.errors.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, field: UserField) -> bool {
        self.errors.contains_key(&field)
    }

    pub fn contains(&self, field: UserField, error: &UserValidationError) -> bool {
        self.get(field).contains(error)
    }

    /// Fields with at least one failure
    pub fn fields(&self) -> impl Iterator<Item = UserField> + '_ {
        self.errors.keys().copied()
    }

    /// Messages keyed by field name, e.g. `{"email": ["has already been taken"]}`
    pub fn messages(&self) -> BTreeMap<String, Vec<String>> {
        self.errors
            .iter()
            .map(|(field, errors)| {
                (
                    field.as_str().to_string(),
                    errors.iter().map(ToString::to_string).collect(),
                )
            })
            .collect()
    }

    /// Messages prefixed with the field label, e.g. "Email has already been taken"
    pub fn full_messages(&self) -> Vec<String> {
        self.errors
            .iter()
            .flat_map(|(field, errors)| {
                errors
                    .iter()
                    .map(move |error| format!("{} {}", field.label(), error))
            })
            .collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_messages().join("; "))
    }
}

/// Canonical stored form of an email: trimmed and lower-cased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Validate a first or last name
///
/// Rules:
/// - Cannot be blank
/// - 2 to 100 characters
/// - Only letters and `!`, `@`, `-`
///
/// Letters are single code points: "Zoë" passes when precomposed (U+00EB) but
/// the decomposed form, `e` plus U+0308, is rejected on the combining mark.
/// No Unicode normalization is applied.
pub fn validate_name(name: &str) -> Vec<UserValidationError> {
    if is_blank(name) {
        return vec![UserValidationError::Blank];
    }

    let mut errors = Vec::new();
    let length = name.chars().count();

    if length < MIN_NAME_LENGTH {
        errors.push(UserValidationError::TooShort(MIN_NAME_LENGTH));
    }

    if length > MAX_NAME_LENGTH {
        errors.push(UserValidationError::TooLong(MAX_NAME_LENGTH));
    }

    let invalid = name
        .chars()
        .find(|c| !c.is_alphabetic() && !NAME_SPECIAL_CHARACTERS.contains(c));

    if let Some(c) = invalid {
        errors.push(UserValidationError::InvalidNameCharacter(c));
    }

    errors
}

/// Validate the syntax of an email address
///
/// Uniqueness is checked separately by [`UserValidator`].
pub fn validate_email(email: &str) -> Vec<UserValidationError> {
    let email = email.trim();

    if email.is_empty() {
        return vec![UserValidationError::Blank];
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return vec![UserValidationError::TooLong(MAX_EMAIL_LENGTH)];
    }

    if !EMAIL_PATTERN.is_match(email) {
        return vec![UserValidationError::InvalidEmail];
    }

    Vec::new()
}

/// Validate a password
///
/// Rules:
/// - Cannot be blank
/// - 6 to 128 characters
/// - At least one letter, one digit and one non-alphanumeric character
pub fn validate_password(password: &str) -> Vec<UserValidationError> {
    if is_blank(password) {
        return vec![UserValidationError::Blank];
    }

    let mut errors = Vec::new();
    let length = password.chars().count();

    if length < MIN_PASSWORD_LENGTH {
        errors.push(UserValidationError::TooShort(MIN_PASSWORD_LENGTH));
    }

    if length > MAX_PASSWORD_LENGTH {
        errors.push(UserValidationError::TooLong(MAX_PASSWORD_LENGTH));
    }

    if !password.chars().any(char::is_alphabetic) {
        errors.push(UserValidationError::MissingLetter);
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push(UserValidationError::MissingDigit);
    }

    if password.chars().all(char::is_alphanumeric) {
        errors.push(UserValidationError::MissingSpecialCharacter);
    }

    errors
}

/// Run every rule that needs no store access
///
/// A persisted record with a blank password is treated as "no password
/// change" and skips the password rules entirely.
pub fn validate_fields(draft: &UserDraft, state: RecordState) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    errors.extend(UserField::FirstName, validate_name(&draft.first_name));
    errors.extend(UserField::LastName, validate_name(&draft.last_name));
    errors.extend(UserField::Email, validate_email(&draft.email));

    if state.is_new_record() || !is_blank(&draft.password) {
        errors.extend(UserField::Password, validate_password(&draft.password));
    }

    errors
}

/// Validates candidate records, including email uniqueness
#[derive(Debug)]
pub struct UserValidator<'a, L: EmailLookup + ?Sized> {
    lookup: &'a L,
}

impl<'a, L: EmailLookup + ?Sized> UserValidator<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        Self { lookup }
    }

    /// Validate a draft against all rules
    ///
    /// Returns the collected field errors; `Err` only reports a failure of
    /// the lookup itself.
    pub async fn validate(
        &self,
        draft: &UserDraft,
        state: RecordState,
    ) -> Result<ValidationErrors, DomainError> {
        let mut errors = validate_fields(draft, state);

        // No point asking the store about an address that cannot exist
        if !errors.has(UserField::Email) {
            let email = normalize_email(&draft.email);

            if let Some(owner) = self.lookup.find_id_by_email(&email).await? {
                if state.persisted_id() != Some(&owner) {
                    errors.add(UserField::Email, UserValidationError::Taken);
                }
            }
        }

        if !errors.is_valid() {
            debug!(fields = ?errors.fields().collect::<Vec<_>>(), "User draft rejected");
        }

        Ok(errors)
    }
}
