use axum::Json;

use crate::{
    authz::{Op, Resource},
    dto::auth::{MeResponse, MessageResponse},
    error::AppResult,
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    services::auth_service,
};

fn message(text: &str) -> Json<ApiResponse<MessageResponse>> {
    Json(ApiResponse::success(
        "OK",
        MessageResponse::new(text),
        Some(Meta::empty()),
    ))
}

#[utoipa::path(
    get,
    path = "/api/secret/",
    responses(
        (status = 200, description = "Secret message", body = ApiResponse<MessageResponse>),
        (status = 401, description = "Unauthenticated")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn secret(_user: AuthUser) -> Json<ApiResponse<MessageResponse>> {
    message("You got the secret message")
}

#[utoipa::path(
    get,
    path = "/api/me/",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<MeResponse>),
        (status = 401, description = "Unauthenticated")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(user: AuthUser) -> Json<ApiResponse<MeResponse>> {
    Json(auth_service::me(&user))
}

#[utoipa::path(
    get,
    path = "/api/manager-view/",
    responses(
        (status = 200, description = "Manager greeting", body = ApiResponse<MessageResponse>),
        (status = 403, description = "Not a manager")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn manager_view(user: AuthUser) -> AppResult<Json<ApiResponse<MessageResponse>>> {
    user.ensure(Resource::ManagerView, Op::Read)?;
    Ok(message("You're world's best boss"))
}

#[utoipa::path(
    get,
    path = "/api/throttle-check/",
    responses(
        (status = 200, description = "Anonymous throttled endpoint", body = ApiResponse<MessageResponse>),
        (status = 429, description = "Throttled")
    ),
    tag = "Throttling"
)]
pub async fn throttle_check() -> Json<ApiResponse<MessageResponse>> {
    message("successful")
}

#[utoipa::path(
    get,
    path = "/api/throttle-check-auth/",
    responses(
        (status = 200, description = "Authenticated throttled endpoint", body = ApiResponse<MessageResponse>),
        (status = 401, description = "Unauthenticated"),
        (status = 429, description = "Throttled")
    ),
    security(("bearer_auth" = [])),
    tag = "Throttling"
)]
pub async fn throttle_check_auth(_user: AuthUser) -> Json<ApiResponse<MessageResponse>> {
    message("This message is only displayed to logged in users")
}
