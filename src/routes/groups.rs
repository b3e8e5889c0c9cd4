use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    authz::Role,
    dto::groups::{GroupMemberRequest, GroupMembers},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::group_service,
    state::AppState,
};

type MemberResponse = AppResult<(StatusCode, Json<ApiResponse<serde_json::Value>>)>;

#[utoipa::path(
    get,
    path = "/api/groups/manager/users/",
    responses(
        (status = 200, description = "Usernames of managers", body = ApiResponse<GroupMembers>),
        (status = 403, description = "Not a manager")
    ),
    security(("bearer_auth" = [])),
    tag = "Groups"
)]
pub async fn list_managers(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<GroupMembers>>> {
    let resp = group_service::list_members(&state, &user, Role::Manager).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/groups/manager/users/",
    request_body = GroupMemberRequest,
    responses(
        (status = 201, description = "User added to managers", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Missing username"),
        (status = 403, description = "Not a manager"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Groups"
)]
pub async fn add_manager(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<GroupMemberRequest>,
) -> MemberResponse {
    let resp = group_service::add_member(&state, &user, Role::Manager, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    delete,
    path = "/api/groups/manager/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User removed from managers", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "User is not a manager"),
        (status = 403, description = "Not a manager"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Groups"
)]
pub async fn remove_manager(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> MemberResponse {
    let resp = group_service::remove_member(&state, &user, Role::Manager, id).await?;
    Ok((StatusCode::OK, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/groups/delivery-crew/users",
    responses(
        (status = 200, description = "Usernames of the delivery crew", body = ApiResponse<GroupMembers>),
        (status = 403, description = "Not a manager")
    ),
    security(("bearer_auth" = [])),
    tag = "Groups"
)]
pub async fn list_delivery_crew(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<GroupMembers>>> {
    let resp = group_service::list_members(&state, &user, Role::DeliveryCrew).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/groups/delivery-crew/users",
    request_body = GroupMemberRequest,
    responses(
        (status = 201, description = "User added to the delivery crew", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Missing username"),
        (status = 403, description = "Not a manager"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Groups"
)]
pub async fn add_delivery_crew(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<GroupMemberRequest>,
) -> MemberResponse {
    let resp = group_service::add_member(&state, &user, Role::DeliveryCrew, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    delete,
    path = "/api/groups/delivery-crew/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User removed from the delivery crew", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "User is not in the delivery crew"),
        (status = 403, description = "Not a manager"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Groups"
)]
pub async fn remove_delivery_crew(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> MemberResponse {
    let resp = group_service::remove_member(&state, &user, Role::DeliveryCrew, id).await?;
    Ok((StatusCode::OK, Json(resp)))
}
