//! Bearer-protected user endpoints. The session gate runs before these
//! handlers and leaves a [`Principal`] in the request extensions.

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::debug;
use uuid::Uuid;

use super::{
    positive_or,
    types::{ErrorResponse, UserListParams, UserListResponse},
};
use crate::{
    auth::{error_response, AuthState, Principal},
    users::{ListQuery, User, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE},
};

#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(UserListParams),
    responses(
        (status = 200, description = "Page of users, newest first", body = UserListResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn list_users(
    state: Extension<AuthState>,
    Query(params): Query<UserListParams>,
) -> Response {
    let query = ListQuery {
        search: params.search,
        page: positive_or(params.page.as_deref(), 1),
        page_size: positive_or(params.page_size.as_deref(), DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE),
    };

    let page = state.users.list(&query);

    Json(UserListResponse {
        items: page.items,
        page: query.page,
        page_size: query.page_size,
        total: page.total,
    })
    .into_response()
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(
        ("id" = String, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn get_user(state: Extension<AuthState>, Path(id): Path<String>) -> Response {
    find_user(&state, &id)
}

#[utoipa::path(
    get,
    path = "/api/v1/me",
    responses(
        (status = 200, description = "The user the session token was issued to", body = User),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 404, description = "User no longer exists", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn me(
    state: Extension<AuthState>,
    Extension(principal): Extension<Principal>,
) -> Response {
    find_user(&state, &principal.user_id)
}

fn find_user(state: &AuthState, id: &str) -> Response {
    let user = Uuid::parse_str(id)
        .ok()
        .and_then(|id| state.users.lookup(id));

    match user {
        Some(user) => (StatusCode::OK, Json(user)).into_response(),
        None => {
            debug!("user not found: {id}");
            error_response(StatusCode::NOT_FOUND, "user not found")
        }
    }
}
