//! Bearer-token middleware
//!
//! Tokens are opaque to the dashboard; the upstream API is the only judge of
//! their validity. The middleware only requires one to be present and loads
//! whatever session is cached for it.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use common::AuthSession;

use crate::{error::ApiError, state::AppState};

/// Session of the caller, inserted into the request extensions
#[derive(Debug, Clone)]
pub struct CurrentSession(pub AuthSession);

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(ApiError::Unauthorized)?;
    let token = bearer.token().trim();
    if token.is_empty() {
        return Err(ApiError::Unauthorized);
    }

    let session = state
        .sessions
        .get(token)
        .await?
        .unwrap_or_else(|| AuthSession::new(token));

    req.extensions_mut().insert(CurrentSession(session));

    Ok(next.run(req).await)
}
