//! User registration and login handlers

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::{
    error::{AppError, AppResult},
    middlewares::auth_middlewares,
    state::AppState,
};

const PASSWORD_MIN_LEN: usize = 8;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Creates a new account.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    validate_credentials(&req.email, &req.password)?;
    if req.name.trim().is_empty() {
        return Err(AppError::Validation("name is required".to_owned()));
    }

    if state.users.find_by_email(&req.email).await?.is_some() {
        return Err(AppError::BadRequest("user already exists".to_owned()));
    }

    let password_hash = hash_password(&req.password)?;
    let id = state
        .users
        .create(&req.email, &req.name, &password_hash)
        .await?;

    info!(user_id = %id, email = %req.email, "user registered");
    Ok((StatusCode::CREATED, Json(json!({ "result": id }))))
}

/// Exchanges credentials for an access token.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    validate_credentials(&req.email, &req.password)?;

    let Some(user) = state.users.find_by_email(&req.email).await? else {
        return Err(AppError::NotFound("user not found".to_owned()));
    };

    if !verify_password(&req.password, &user.password_hash) {
        warn!(email = %req.email, "failed login attempt");
        return Err(AppError::Unauthorized("invalid credentials".to_owned()));
    }

    let token = auth_middlewares::issue_token(user.id, &user.email)
        .map_err(|e| AppError::Internal(format!("failed to sign token: {e}")))?;

    info!(email = %req.email, "user logged in");
    Ok(Json(json!({ "result": { "token": token } })))
}

fn validate_credentials(email: &str, password: &str) -> Result<(), AppError> {
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation("invalid email".to_owned()));
    }
    if password.len() < PASSWORD_MIN_LEN {
        return Err(AppError::Validation(format!(
            "password must be at least {PASSWORD_MIN_LEN} characters"
        )));
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("failed to hash password: {e}")))
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use axum::response::IntoResponse;
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;
    use crate::services::{queue, reminder::ReminderScheduler};

    async fn setup_state() -> AppState {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();

        let (tx, _rx) = queue::bounded(8);
        AppState::new(pool, ReminderScheduler::new(tx))
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash));
        assert!(!verify_password("wrong password", &hash));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("whatever", "not-a-phc-string"));
    }

    #[test]
    fn credential_validation_rejects_bad_input() {
        assert!(validate_credentials("not-an-email", "longenough").is_err());
        assert!(validate_credentials("", "longenough").is_err());
        assert!(validate_credentials("a@b.c", "short").is_err());
        assert!(validate_credentials("a@b.c", "longenough").is_ok());
    }

    #[tokio::test]
    async fn register_then_login_issues_a_token() {
        let state = setup_state().await;

        let response = register(
            State(state.clone()),
            Json(RegisterRequest {
                email: "alice@example.com".to_owned(),
                name: "Alice".to_owned(),
                password: "hunter2hunter2".to_owned(),
            }),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = login(
            State(state),
            Json(LoginRequest {
                email: "alice@example.com".to_owned(),
                password: "hunter2hunter2".to_owned(),
            }),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let state = setup_state().await;

        let req = || {
            Json(RegisterRequest {
                email: "bob@example.com".to_owned(),
                name: "Bob".to_owned(),
                password: "hunter2hunter2".to_owned(),
            })
        };

        register(State(state.clone()), req()).await.unwrap();
        let err = register(State(state), req()).await.map(drop)
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_unauthorized() {
        let state = setup_state().await;

        register(
            State(state.clone()),
            Json(RegisterRequest {
                email: "carol@example.com".to_owned(),
                name: "Carol".to_owned(),
                password: "hunter2hunter2".to_owned(),
            }),
        )
        .await
        .unwrap();

        let err = login(
            State(state),
            Json(LoginRequest {
                email: "carol@example.com".to_owned(),
                password: "wrongpassword".to_owned(),
            }),
        )
        .await
        .map(drop)
        .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn login_of_unknown_user_is_not_found() {
        let state = setup_state().await;

        let err = login(
            State(state),
            Json(LoginRequest {
                email: "nobody@example.com".to_owned(),
                password: "hunter2hunter2".to_owned(),
            }),
        )
        .await
        .map(drop)
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
