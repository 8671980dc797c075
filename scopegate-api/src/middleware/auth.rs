/// Bearer authentication layer
///
/// Validates the access token and its session, then injects
/// [`AuthContext`] into request extensions for handlers.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use scopegate_shared::auth::middleware::{authenticate_bearer, AuthContext};

use crate::{app::AppState, error::ApiError};

pub async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth: AuthContext =
        authenticate_bearer(&state.db, state.jwt_secret(), req.headers()).await?;

    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}
