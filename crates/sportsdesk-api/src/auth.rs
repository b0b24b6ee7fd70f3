use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use sportsdesk_core::bearer_token;
use tracing::{debug, warn};

use crate::{ApiError, AppState};

/// Caller identity attached to the request extensions by [`require_bearer`].
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub uid: String,
    pub email: Option<String>,
}

/// Rejects requests without a verifiable `Authorization: Bearer` token before
/// they reach a handler.
pub async fn require_bearer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_owned)
        .ok_or(ApiError::MissingToken)?;

    let services = state.services()?;
    let verified = services.verifier.verify(&token).await.map_err(|e| {
        warn!(error = %e, path = %req.uri().path(), "Token verification failed");
        ApiError::InvalidToken
    })?;

    debug!(uid = %verified.uid, path = %req.uri().path(), "Request authenticated");
    req.extensions_mut().insert(AuthContext {
        uid: verified.uid,
        email: verified.email,
    });

    Ok(next.run(req).await)
}
