use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};

use crate::{
    error::AppError,
    middleware::auth::{bearer_token, decode_token},
    state::AppState,
    throttle::ThrottleScope,
};

/// Throttle authenticated callers in the `ten-per-minute` scope. Requests without a valid
/// token pass through so the handler can reject them as unauthenticated.
pub async fn per_user(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(user_id) = token_subject(&state, &request) {
        let identity = format!("user:{user_id}");
        state.limiter.check(&identity, ThrottleScope::TenPerMinute)?;
    }
    Ok(next.run(request).await)
}

/// Throttle anonymous callers by client address. Authenticated callers are not counted.
pub async fn per_anonymous(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if token_subject(&state, &request).is_none() {
        let identity = format!("addr:{}", client_addr(&request));
        state.limiter.check(&identity, ThrottleScope::AnonymousDefault)?;
    }
    Ok(next.run(request).await)
}

fn token_subject(state: &AppState, request: &Request) -> Option<uuid::Uuid> {
    let token = bearer_token(request.headers())?;
    decode_token(token, &state.jwt_secret).ok()
}

fn client_addr(request: &Request) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
