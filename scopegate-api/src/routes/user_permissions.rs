/// User permission endpoints
///
/// # Endpoints
///
/// - `GET /user-permission` - List grants (encrypted)
/// - `POST /user-permission` - Grant a permission, optionally under a scope
/// - `GET /user-permission/:id` - Get a grant (encrypted)
/// - `PUT /user-permission/:id` - Change scope or revoked flag
/// - `DELETE /user-permission/:id` - Revoke a grant
///
/// Under the personal scope the caller only sees and manages their own
/// grants, and may only bind the personal scope.

use crate::{
    app::AppState,
    envelope::{created, done, encrypted, ok, ApiResponse, Page},
    error::{ApiResult, ErrorMessage},
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use scopegate_shared::{
    auth::{
        authorization::{authorize, Grant},
        middleware::AuthContext,
    },
    models::{
        permission::{Permission, PermissionName},
        scope::{Scope, PERSONAL},
        user::User,
        user_permission::{CreateUserPermission, UserPermission, UserPermissionDetail},
        Pagination,
    },
};
use serde::Deserialize;
use uuid::Uuid;

/// Create grant request
#[derive(Debug, Deserialize)]
pub struct CreateUserPermissionRequest {
    pub user_id: Uuid,
    pub permission_id: Uuid,

    /// Scope name; omitted means personal
    pub scope: Option<String>,
}

/// Update grant request; omitted fields are unchanged
#[derive(Debug, Deserialize)]
pub struct UpdateUserPermissionRequest {
    pub scope: Option<String>,
    pub revoked: Option<bool>,
}

/// Looks up a scope the caller is allowed to bind
///
/// A personally scoped caller can only hand out personal grants.
async fn bindable_scope(state: &AppState, grant: &Grant, name: &str) -> ApiResult<Scope> {
    if name != PERSONAL {
        grant.require_unrestricted()?;
    }

    Ok(Scope::find_by_name(&state.db, name)
        .await?
        .ok_or(ErrorMessage::ScopeNotFound)?)
}

async fn load_detail(
    state: &AppState,
    id: Uuid,
    owner: Option<Uuid>,
) -> ApiResult<UserPermissionDetail> {
    Ok(UserPermission::find_detail(&state.db, id, owner)
        .await?
        .ok_or(ErrorMessage::UserPermissionNotFound)?)
}

/// List grants
///
/// `data` is the encrypted form of a [`Page`] of grants.
pub async fn list_user_permissions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(page): Query<Pagination>,
) -> ApiResult<ApiResponse<String>> {
    let grant = authorize(&state.db, auth.user_id, PermissionName::ReadUserPermission).await?;
    let owner = grant.access.owner();

    let items = UserPermission::list_details(&state.db, owner, page).await?;
    let total = UserPermission::count(&state.db, owner).await?;

    encrypted(
        &state.cipher,
        "User permissions retrieved successfully",
        &Page {
            items,
            page: page.page(),
            limit: page.limit(),
            total,
        },
    )
}

/// Grant a permission to a user
///
/// # Errors
///
/// - `403 Forbidden`: Target user or scope out of the caller's reach
/// - `404 Not Found`: Unknown user, permission or scope
/// - `409 Conflict`: The user already holds an active grant for it
pub async fn create_user_permission(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateUserPermissionRequest>,
) -> ApiResult<ApiResponse<UserPermissionDetail>> {
    let grant =
        authorize(&state.db, auth.user_id, PermissionName::CreateUserPermission).await?;
    grant.require_reach(req.user_id)?;

    let scope_name = req.scope.as_deref().unwrap_or(PERSONAL);
    let scope = bindable_scope(&state, &grant, scope_name).await?;

    User::find_by_id(&state.db, req.user_id)
        .await?
        .ok_or(ErrorMessage::UserNotFound)?;
    Permission::find_by_id(&state.db, req.permission_id)
        .await?
        .ok_or(ErrorMessage::PermissionNotFound)?;

    let created_grant = UserPermission::create(
        &state.db,
        CreateUserPermission {
            user_id: req.user_id,
            permission_id: req.permission_id,
            scope_id: Some(scope.id),
        },
    )
    .await?;

    tracing::info!(
        user_id = %auth.user_id,
        grantee = %req.user_id,
        grant_id = %created_grant.id,
        scope = %scope.name,
        "permission granted"
    );

    let detail = load_detail(&state, created_grant.id, None).await?;

    Ok(created("User permission created successfully", detail))
}

/// Get a grant
///
/// `data` is the encrypted grant.
pub async fn get_user_permission(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<String>> {
    let grant = authorize(&state.db, auth.user_id, PermissionName::ReadUserPermission).await?;
    let detail = load_detail(&state, id, grant.access.owner()).await?;

    encrypted(&state.cipher, "User permission retrieved successfully", &detail)
}

/// Change a grant's scope or revoked flag
///
/// # Errors
///
/// - `409 Conflict`: Reinstating a grant while another active one exists
pub async fn update_user_permission(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserPermissionRequest>,
) -> ApiResult<ApiResponse<UserPermissionDetail>> {
    let grant =
        authorize(&state.db, auth.user_id, PermissionName::UpdateUserPermission).await?;
    let owner = grant.access.owner();

    load_detail(&state, id, owner).await?;

    if let Some(name) = req.scope.as_deref() {
        let scope = bindable_scope(&state, &grant, name).await?;
        Scope::bind_grant(&state.db, scope.id, id).await?;
    }

    if let Some(revoked) = req.revoked {
        UserPermission::set_revoked(&state.db, id, revoked).await?;
    }

    tracing::info!(user_id = %auth.user_id, grant_id = %id, "user permission updated");

    let detail = load_detail(&state, id, owner).await?;

    Ok(ok("User permission updated successfully", detail))
}

/// Revoke a grant
///
/// Revoking an already revoked grant succeeds.
pub async fn delete_user_permission(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    let grant =
        authorize(&state.db, auth.user_id, PermissionName::DeleteUserPermission).await?;

    load_detail(&state, id, grant.access.owner()).await?;

    if UserPermission::revoke(&state.db, id).await? {
        tracing::info!(user_id = %auth.user_id, grant_id = %id, "user permission revoked");
    }

    Ok(done("User permission revoked successfully"))
}
