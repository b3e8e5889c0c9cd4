use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, sea_query::OnConflict,
};
use uuid::Uuid;

use crate::{
    audit,
    authz::{Op, Resource, Role, RoleSet},
    dto::groups::{GroupMemberRequest, GroupMembers},
    entity::{
        user_groups::{ActiveModel as GroupActive, Column as GroupCol, Entity as UserGroups},
        users::{Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Resolve the staff roles held by a user. No memberships means customer.
pub async fn roles_for<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<RoleSet> {
    let memberships = UserGroups::find()
        .filter(GroupCol::UserId.eq(user_id))
        .all(conn)
        .await?;
    Ok(memberships
        .iter()
        .filter_map(|m| Role::from_group_name(&m.group_name))
        .collect())
}

pub async fn has_role<C: ConnectionTrait>(conn: &C, user_id: Uuid, role: Role) -> AppResult<bool> {
    let count = UserGroups::find()
        .filter(GroupCol::UserId.eq(user_id))
        .filter(GroupCol::GroupName.eq(role.group_name()))
        .count(conn)
        .await?;
    Ok(count > 0)
}

fn group_resource(role: Role) -> Resource {
    match role {
        Role::Manager => Resource::ManagerGroup,
        Role::DeliveryCrew => Resource::DeliveryCrewGroup,
    }
}

pub async fn list_members(
    state: &AppState,
    user: &AuthUser,
    role: Role,
) -> AppResult<ApiResponse<GroupMembers>> {
    user.ensure(group_resource(role), Op::Read)?;

    let usernames: Vec<String> = Users::find()
        .select_only()
        .column(UserCol::Username)
        .inner_join(UserGroups)
        .filter(GroupCol::GroupName.eq(role.group_name()))
        .order_by_asc(UserCol::Username)
        .into_tuple()
        .all(&state.orm)
        .await?;

    let total = usernames.len() as i64;
    Ok(ApiResponse::success(
        "Members",
        GroupMembers { usernames },
        Some(Meta::unpaged(total)),
    ))
}

pub async fn add_member(
    state: &AppState,
    user: &AuthUser,
    role: Role,
    payload: GroupMemberRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    user.ensure(group_resource(role), Op::Create)?;

    let username = payload
        .username
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::Validation("Please provide a valid username".into()))?;

    let member = Users::find()
        .filter(UserCol::Username.eq(username.as_str()))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    UserGroups::insert(GroupActive {
        user_id: Set(member.id),
        group_name: Set(role.group_name().to_string()),
    })
    .on_conflict(
        OnConflict::columns([GroupCol::UserId, GroupCol::GroupName])
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(&state.orm)
    .await?;

    tracing::info!(member = %member.id, group = role.group_name(), "group member added");
    audit::record(
        &state.pool,
        user.user_id,
        "group_member_add",
        "user_groups",
        serde_json::json!({ "user_id": member.id, "group": role.group_name() }),
    )
    .await;

    Ok(ApiResponse::success(
        "Member added",
        serde_json::json!({ "username": member.username }),
        Some(Meta::empty()),
    ))
}

pub async fn remove_member(
    state: &AppState,
    user: &AuthUser,
    role: Role,
    member_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    user.ensure(group_resource(role), Op::Delete)?;

    let member = Users::find_by_id(member_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let result = UserGroups::delete_many()
        .filter(GroupCol::UserId.eq(member.id))
        .filter(GroupCol::GroupName.eq(role.group_name()))
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::Validation(format!(
            "user is not a member of the {} group",
            role.group_name()
        )));
    }

    tracing::info!(member = %member.id, group = role.group_name(), "group member removed");
    audit::record(
        &state.pool,
        user.user_id,
        "group_member_remove",
        "user_groups",
        serde_json::json!({ "user_id": member.id, "group": role.group_name() }),
    )
    .await;

    Ok(ApiResponse::success(
        "Member removed",
        serde_json::json!({ "username": member.username }),
        Some(Meta::empty()),
    ))
}
