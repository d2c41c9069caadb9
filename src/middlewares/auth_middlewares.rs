//! JWT bearer authentication middleware

use axum::{
    body::Body,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::APP_CONFIG, error::AppError};

/// Claims carried by an access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

/// Authenticated caller, stored in request extensions by [`jwt_auth`].
#[derive(Clone, Copy, Debug)]
pub struct AuthUser(pub Uuid);

/// Signs an access token for the given user.
pub fn issue_token(user_id: Uuid, email: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        user_id,
        email: email.to_owned(),
        iat: now.timestamp(),
        exp: (now + chrono::Duration::hours(APP_CONFIG.jwt_ttl_hours)).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(APP_CONFIG.jwt_secret.as_bytes()),
    )
}

/// Verifies a token and returns its claims.
pub fn validate_token(token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(APP_CONFIG.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::Unauthorized("token expired".to_owned()),
        _ => AppError::Unauthorized("invalid token".to_owned()),
    })
}

/// Validates the `Authorization: Bearer` header and stores the caller's id in
/// request extensions for the handlers behind it.
pub async fn jwt_auth(mut req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let Some(value) = header else {
        return Err(AppError::Unauthorized("missing token".to_owned()));
    };

    let Some(token) = value.strip_prefix("Bearer ") else {
        return Err(AppError::Unauthorized("invalid token format".to_owned()));
    };

    let claims = validate_token(token)?;
    req.extensions_mut().insert(AuthUser(claims.user_id));

    Ok(next.run(req).await)
}
