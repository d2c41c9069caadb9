//! Event CRUD and calendar window handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middlewares::auth_middlewares::AuthUser,
    models::reminder::Reminder,
    state::AppState,
};

const TITLE_MIN_LEN: usize = 3;
const TITLE_MAX_LEN: usize = 255;
const DESCRIPTION_MAX_LEN: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct EventPayload {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub event_date: DateTime<Utc>,
    pub remind_at: Option<DateTime<Utc>>,
}

/// Creates an event. A future `remind_at` also hands a reminder to the
/// dispatch queue; a queue that cannot take it only logs, the response is
/// unaffected.
pub async fn create(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(req): Json<EventPayload>,
) -> AppResult<impl IntoResponse> {
    validate_payload(&req)?;

    let id = state
        .events
        .create(
            user_id,
            &req.title,
            &req.description,
            req.event_date,
            req.remind_at,
        )
        .await?;

    if let Some(remind_at) = req.remind_at {
        if remind_at > Utc::now() {
            state.reminders.schedule(Reminder {
                user_id,
                event_id: id,
                message: req.title.clone(),
                remind_at,
            });
        }
    }

    Ok((StatusCode::CREATED, Json(json!({ "result": id }))))
}

/// Updates an event owned by the caller.
pub async fn update(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(event_id): Path<Uuid>,
    Json(req): Json<EventPayload>,
) -> AppResult<impl IntoResponse> {
    validate_payload(&req)?;

    let updated = state
        .events
        .update(
            event_id,
            user_id,
            &req.title,
            &req.description,
            req.event_date,
            req.remind_at,
        )
        .await?;

    if !updated {
        return Err(AppError::NotFound("event not found".to_owned()));
    }

    Ok(Json(json!({ "result": "event updated" })))
}

/// Deletes an event owned by the caller.
pub async fn delete(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(event_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let deleted = state.events.delete(event_id, user_id).await?;
    if !deleted {
        return Err(AppError::NotFound("event not found".to_owned()));
    }

    Ok(Json(json!({ "result": "event deleted" })))
}

pub async fn get_day(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(date): Path<String>,
) -> AppResult<impl IntoResponse> {
    let events = state.events.for_day(user_id, parse_date(&date)?).await?;
    Ok(Json(json!({ "result": events })))
}

pub async fn get_week(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(date): Path<String>,
) -> AppResult<impl IntoResponse> {
    let events = state.events.for_week(user_id, parse_date(&date)?).await?;
    Ok(Json(json!({ "result": events })))
}

pub async fn get_month(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(date): Path<String>,
) -> AppResult<impl IntoResponse> {
    let events = state.events.for_month(user_id, parse_date(&date)?).await?;
    Ok(Json(json!({ "result": events })))
}

fn validate_payload(req: &EventPayload) -> Result<(), AppError> {
    let title_len = req.title.chars().count();
    if !(TITLE_MIN_LEN..=TITLE_MAX_LEN).contains(&title_len) {
        return Err(AppError::Validation(format!(
            "title must be {TITLE_MIN_LEN}-{TITLE_MAX_LEN} characters"
        )));
    }
    if req.description.chars().count() > DESCRIPTION_MAX_LEN {
        return Err(AppError::Validation(format!(
            "description must be at most {DESCRIPTION_MAX_LEN} characters"
        )));
    }
    Ok(())
}

/// Dates arrive as `YYYY-MM-DD` path segments.
fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest("invalid date".to_owned()))
}
