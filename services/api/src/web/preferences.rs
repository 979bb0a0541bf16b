//! services/api/src/web/preferences.rs
//!
//! Visitor preferences.

use axum::{extract::State, response::Json, Extension};
use moodigo_core::domain::UserSession;
use std::sync::Arc;

use crate::error::ApiError;
use crate::web::extract::JsonBody;
use crate::web::protocol::{PreferencesView, UpdatePreferencesRequest};
use crate::web::state::AppState;

const MAX_PREFERRED_NAME: usize = 50;
const MAX_UNIVERSITY: usize = 100;
const MAX_YEAR_OF_STUDY: usize = 20;

fn bounded(field: &str, value: String, max: usize) -> Result<String, ApiError> {
    let value = value.trim().to_string();
    if value.chars().count() > max {
        return Err(ApiError::BadRequest(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(value)
}

#[utoipa::path(
    get,
    path = "/preferences",
    responses(
        (status = 200, description = "Current preferences", body = PreferencesView),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_preferences_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<PreferencesView>, ApiError> {
    let preferences = state.db.get_or_create_preferences(session.id).await?;
    Ok(Json(preferences.into()))
}

#[utoipa::path(
    put,
    path = "/preferences",
    request_body = UpdatePreferencesRequest,
    responses(
        (status = 200, description = "Updated preferences", body = PreferencesView),
        (status = 400, description = "A text field is too long"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_preferences_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    JsonBody(req): JsonBody<UpdatePreferencesRequest>,
) -> Result<Json<PreferencesView>, ApiError> {
    let mut preferences = state.db.get_or_create_preferences(session.id).await?;

    if let Some(v) = req.enable_mood_tracking {
        preferences.enable_mood_tracking = v;
    }
    if let Some(v) = req.daily_check_ins {
        preferences.daily_check_ins = v;
    }
    if let Some(v) = req.crisis_mode {
        preferences.crisis_mode = v;
    }
    if let Some(v) = req.preferred_name {
        preferences.preferred_name = bounded("preferred_name", v, MAX_PREFERRED_NAME)?;
    }
    if let Some(v) = req.university {
        preferences.university = bounded("university", v, MAX_UNIVERSITY)?;
    }
    if let Some(v) = req.year_of_study {
        preferences.year_of_study = bounded("year_of_study", v, MAX_YEAR_OF_STUDY)?;
    }

    state.db.update_preferences(&preferences).await?;
    Ok(Json(preferences.into()))
}
