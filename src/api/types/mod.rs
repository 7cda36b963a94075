//! API request/response types

mod error;
mod json;
mod user;

pub use error::{ApiError, ApiErrorDetail, ApiErrorResponse, ApiErrorType};
pub use json::Json;
pub use user::UserResponse;
