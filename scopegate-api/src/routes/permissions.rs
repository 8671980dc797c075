/// Permission catalog endpoints
///
/// # Endpoints
///
/// - `GET /permission` - List catalog entries
/// - `POST /permission` - Add an entry
/// - `GET /permission/:id` - Get an entry
/// - `PUT /permission/:id` - Rename or describe an entry
/// - `DELETE /permission/:id` - Soft-delete an entry
///
/// The catalog is global. Reading it needs only the matching grant; changing
/// it also needs that grant to be unrestricted.

use crate::{
    app::AppState,
    envelope::{created, done, ok, ApiResponse, Page},
    error::{ApiError, ApiResult, ErrorMessage},
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use scopegate_shared::{
    auth::{authorization::authorize, middleware::AuthContext},
    models::{
        permission::{CreatePermission, Permission, PermissionName, UpdatePermission},
        Pagination,
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Create permission request
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePermissionRequest {
    /// Kebab-case, e.g. `publish-post`
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

/// Update permission request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePermissionRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

/// Lowercase ASCII words joined by single hyphens
fn is_kebab_case(name: &str) -> bool {
    name.split('-').all(|part| {
        !part.is_empty()
            && part
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
    })
}

fn check_name(name: &str) -> ApiResult<()> {
    if !is_kebab_case(name) {
        return Err(ApiError::invalid_field(
            "name",
            "Name must be lowercase words separated by hyphens",
        ));
    }
    Ok(())
}

/// List catalog entries, ordered by name
pub async fn list_permissions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(page): Query<Pagination>,
) -> ApiResult<ApiResponse<Page<Permission>>> {
    authorize(&state.db, auth.user_id, PermissionName::ReadPermission).await?;

    let items = Permission::list(&state.db, page).await?;
    let total = Permission::count(&state.db).await?;

    Ok(ok(
        "Permissions retrieved successfully",
        Page {
            items,
            page: page.page(),
            limit: page.limit(),
            total,
        },
    ))
}

/// Add a catalog entry
///
/// # Errors
///
/// - `403 Forbidden`: Grant missing or limited to the personal scope
/// - `409 Conflict`: A live entry already has this name
pub async fn create_permission(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreatePermissionRequest>,
) -> ApiResult<ApiResponse<Permission>> {
    req.validate()?;
    check_name(&req.name)?;

    authorize(&state.db, auth.user_id, PermissionName::CreatePermission)
        .await?
        .require_unrestricted()?;

    let permission = Permission::create(
        &state.db,
        CreatePermission {
            name: req.name,
            description: req.description,
        },
    )
    .await?;

    tracing::info!(user_id = %auth.user_id, permission = %permission.name, "permission created");

    Ok(created("Permission created successfully", permission))
}

/// Get a catalog entry
pub async fn get_permission(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<Permission>> {
    authorize(&state.db, auth.user_id, PermissionName::ReadPermission).await?;

    let permission = Permission::find_by_id(&state.db, id)
        .await?
        .ok_or(ErrorMessage::PermissionNotFound)?;

    Ok(ok("Permission retrieved successfully", permission))
}

/// Update a catalog entry
pub async fn update_permission(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePermissionRequest>,
) -> ApiResult<ApiResponse<Permission>> {
    req.validate()?;
    if let Some(name) = &req.name {
        check_name(name)?;
    }

    authorize(&state.db, auth.user_id, PermissionName::UpdatePermission)
        .await?
        .require_unrestricted()?;

    let permission = Permission::update(
        &state.db,
        id,
        UpdatePermission {
            name: req.name,
            description: req.description,
        },
    )
    .await?
    .ok_or(ErrorMessage::PermissionNotFound)?;

    tracing::info!(user_id = %auth.user_id, permission_id = %id, "permission updated");

    Ok(ok("Permission updated successfully", permission))
}

/// Soft-delete a catalog entry
///
/// # Errors
///
/// - `409 Conflict`: Active grants still reference the entry
pub async fn delete_permission(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    authorize(&state.db, auth.user_id, PermissionName::DeletePermission)
        .await?
        .require_unrestricted()?;

    Permission::find_by_id(&state.db, id)
        .await?
        .ok_or(ErrorMessage::PermissionNotFound)?;

    if Permission::active_grant_count(&state.db, id).await? > 0 {
        return Err(ErrorMessage::PermissionInUse.into());
    }

    if !Permission::soft_delete(&state.db, id).await? {
        return Err(ErrorMessage::PermissionNotFound.into());
    }

    tracing::info!(user_id = %auth.user_id, permission_id = %id, "permission deleted");

    Ok(done("Permission deleted successfully"))
}
