//! Registration endpoints
//!
//! `GET /register` describes the sign-up form and `POST /register` submits it.

use axum::{extract::State, http::StatusCode, routing::get, Router};
use serde::Serialize;
use tracing::info;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, UserResponse};
use crate::domain::user::{
    UserDraft, UserField, MAX_EMAIL_LENGTH, MAX_NAME_LENGTH, MAX_PASSWORD_LENGTH,
    MIN_NAME_LENGTH, MIN_PASSWORD_LENGTH,
};

/// Create the registration router
pub fn create_registration_router() -> Router<AppState> {
    Router::new().route("/register", get(register).post(create_registration))
}

/// Description of the registration form
#[derive(Debug, Serialize)]
pub struct RegistrationForm {
    pub action: &'static str,
    pub method: &'static str,
    pub fields: Vec<FormField>,
}

/// One input of the registration form
#[derive(Debug, Serialize)]
pub struct FormField {
    pub name: UserField,
    #[serde(rename = "type")]
    pub input_type: &'static str,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    pub max_length: usize,
    pub hint: &'static str,
}

impl RegistrationForm {
    fn new() -> Self {
        let name_field = |name| FormField {
            name,
            input_type: "text",
            required: true,
            min_length: Some(MIN_NAME_LENGTH),
            max_length: MAX_NAME_LENGTH,
            hint: "Letters and ! @ - only",
        };

        Self {
            action: "/register",
            method: "POST",
            fields: vec![
                name_field(UserField::FirstName),
                name_field(UserField::LastName),
                FormField {
                    name: UserField::Email,
                    input_type: "email",
                    required: true,
                    min_length: None,
                    max_length: MAX_EMAIL_LENGTH,
                    hint: "Must not already be registered",
                },
                FormField {
                    name: UserField::Password,
                    input_type: "password",
                    required: true,
                    min_length: Some(MIN_PASSWORD_LENGTH),
                    max_length: MAX_PASSWORD_LENGTH,
                    hint: "At least one letter, one number and one special character",
                },
            ],
        }
    }
}

/// Show the registration form
///
/// GET /register
pub async fn register() -> Json<RegistrationForm> {
    Json(RegistrationForm::new())
}

/// Submit a registration
///
/// POST /register
///
/// Returns 201 with the new user, or 422 with per-field errors when any rule
/// fails. Nothing is stored in the failure case.
pub async fn create_registration(
    State(state): State<AppState>,
    Json(draft): Json<UserDraft>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let user = state.user_service.register(draft).await?;

    info!(user_id = %user.id(), "Registration completed");
    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_lists_every_field() {
        let json = serde_json::to_value(RegistrationForm::new()).unwrap();
        let names: Vec<_> = json["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["name"].as_str().unwrap().to_string())
            .collect();

        assert_eq!(names, ["first_name", "last_name", "email", "password"]);
        assert_eq!(json["fields"][3]["type"], "password");
        assert_eq!(json["fields"][3]["min_length"], 6);
        assert!(json["fields"][2].get("min_length").is_none());
    }
}
