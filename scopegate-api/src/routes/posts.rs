/// Post endpoints
///
/// # Endpoints
///
/// - `GET /post` - List posts (encrypted, `?status=&page=&limit=`)
/// - `POST /post` - Create a post owned by the caller
/// - `GET /post/:id` - Get a post (encrypted)
/// - `PUT /post/:id` - Update a post
/// - `DELETE /post/:id` - Soft-delete a post
///
/// Every handler resolves the matching `*-post` permission first. Under the
/// personal scope only the caller's own posts are visible; a post owned by
/// someone else answers 404, the same as a missing one.

use crate::{
    app::AppState,
    envelope::{created, done, encrypted, ok, ApiResponse, Page},
    error::{ApiError, ApiResult, ErrorMessage},
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use scopegate_shared::{
    auth::{authorization::authorize, middleware::AuthContext},
    lock,
    models::{
        permission::PermissionName,
        post::{CreatePost, Post, PostStatus, PostVisibility, UpdatePost},
        Pagination,
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Query string of `GET /post`
#[derive(Debug, Default, Deserialize)]
pub struct ListPostsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<PostStatus>,
}

/// Create post request
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,

    /// Defaults to draft
    pub status: Option<PostStatus>,

    /// Defaults to public
    pub visibility: Option<PostVisibility>,
}

/// Update post request; omitted fields are unchanged
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 1, message = "Content must not be empty"))]
    pub content: Option<String>,

    pub status: Option<PostStatus>,
    pub visibility: Option<PostVisibility>,
}

impl From<UpdatePostRequest> for UpdatePost {
    fn from(req: UpdatePostRequest) -> Self {
        Self {
            title: req.title,
            content: req.content,
            status: req.status,
            visibility: req.visibility,
        }
    }
}

/// List posts
///
/// `data` is the encrypted form of a [`Page`] of posts.
pub async fn list_posts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListPostsQuery>,
) -> ApiResult<ApiResponse<String>> {
    let grant = authorize(&state.db, auth.user_id, PermissionName::ReadPost).await?;
    let owner = grant.access.owner();
    let page = Pagination {
        page: query.page,
        limit: query.limit,
    };

    let items = Post::list(&state.db, owner, query.status, page).await?;
    let total = Post::count(&state.db, owner, query.status).await?;

    encrypted(
        &state.cipher,
        "Posts retrieved successfully",
        &Page {
            items,
            page: page.page(),
            limit: page.limit(),
            total,
        },
    )
}

/// Create a post
pub async fn create_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreatePostRequest>,
) -> ApiResult<ApiResponse<Post>> {
    req.validate()?;
    authorize(&state.db, auth.user_id, PermissionName::CreatePost).await?;

    let post = Post::create(
        &state.db,
        CreatePost {
            user_id: auth.user_id,
            title: req.title,
            content: req.content,
            status: req.status.unwrap_or(PostStatus::Draft),
            visibility: req.visibility.unwrap_or(PostVisibility::Public),
        },
    )
    .await?;

    tracing::info!(user_id = %auth.user_id, post_id = %post.id, "post created");

    Ok(created("Post created successfully", post))
}

/// Get a post
///
/// `data` is the encrypted post.
pub async fn get_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<String>> {
    let grant = authorize(&state.db, auth.user_id, PermissionName::ReadPost).await?;

    let post = Post::find(&state.db, id, grant.access.owner())
        .await?
        .ok_or(ErrorMessage::PostNotFound)?;

    encrypted(&state.cipher, "Post retrieved successfully", &post)
}

/// Update a post
///
/// Runs under the post's lock; a concurrent update or delete answers 409
/// once the lock wait runs out.
pub async fn update_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePostRequest>,
) -> ApiResult<ApiResponse<Post>> {
    req.validate()?;
    let grant = authorize(&state.db, auth.user_id, PermissionName::UpdatePost).await?;
    let owner = grant.access.owner();
    let db = &state.db;
    let changes = UpdatePost::from(req);

    let post = state
        .locks
        .with_lock(&lock::post_key(id), move || async move {
            Post::update(db, id, owner, changes)
                .await?
                .ok_or(ApiError::from(ErrorMessage::PostNotFound))
        })
        .await?;

    tracing::info!(user_id = %auth.user_id, post_id = %id, "post updated");

    Ok(ok("Post updated successfully", post))
}

/// Soft-delete a post
pub async fn delete_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    let grant = authorize(&state.db, auth.user_id, PermissionName::DeletePost).await?;
    let owner = grant.access.owner();
    let db = &state.db;

    state
        .locks
        .with_lock(&lock::post_key(id), move || async move {
            if !Post::soft_delete(db, id, owner).await? {
                return Err(ApiError::from(ErrorMessage::PostNotFound));
            }
            Ok(())
        })
        .await?;

    tracing::info!(user_id = %auth.user_id, post_id = %id, "post deleted");

    Ok(done("Post deleted successfully"))
}
