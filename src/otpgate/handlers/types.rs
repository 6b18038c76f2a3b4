//! Request/response types for the HTTP API.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::users::User;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RequestOtpRequest {
    pub phone: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyOtpRequest {
    pub phone: String,
    pub otp: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserListResponse {
    pub items: Vec<User>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
}

/// Raw query parameters. Parsed leniently: bad numbers fall back to defaults.
#[derive(IntoParams, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct UserListParams {
    /// Case-insensitive substring of phone or id
    pub search: Option<String>,
    /// 1-based page number (default 1)
    pub page: Option<String>,
    /// Items per page (default 10, max 100)
    pub page_size: Option<String>,
}
