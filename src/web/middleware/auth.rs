use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{DecodingKey, Validation, decode};
use std::sync::Arc;
use tracing::warn;

use crate::web::models::{AuthenticatedAdmin, Claims};
use crate::web::{AppError, AppState};

const TOKEN_COOKIE: &str = "token";

/// Admin token from `Authorization: Bearer ..`, else from the `token` cookie.
fn admin_token(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    match bearer {
        Some(token) => Some(token.to_string()),
        None => jar.get(TOKEN_COOKIE).map(|cookie| cookie.value().to_string()),
    }
}

fn verify_admin(token: &str, secret: &str) -> Result<AuthenticatedAdmin, AppError> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        warn!(error = %e, "Rejected admin token.");
        AppError::InvalidCredentials
    })?
    .claims;
    Ok(AuthenticatedAdmin { username: claims.sub })
}

/// Guards the admin routes. Handlers behind it can extract [`AuthenticatedAdmin`].
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = admin_token(req.headers(), &jar).ok_or(AppError::InvalidCredentials)?;
    let admin = verify_admin(&token, &state.jwt_secret)?;
    req.extensions_mut().insert(admin);
    Ok(next.run(req).await)
}
