//! services/api/src/web/mood.rs
//!
//! Mood tracking endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{Duration, Utc};
use moodigo_core::analysis::mood_insights;
use moodigo_core::domain::{Intensity, Mood, UserSession};
use std::str::FromStr;
use std::sync::Arc;

use crate::error::ApiError;
use crate::web::extract::JsonBody;
use crate::web::protocol::{
    ChartData, ChartPoint, Choice, MoodEntryView, MoodTrackerView, NewMoodEntryRequest,
};
use crate::web::state::AppState;

pub const RECENT_ENTRY_LIMIT: i64 = 30;
pub const CHART_WINDOW_DAYS: i64 = 30;

/// Recent mood entries with a short insight.
#[utoipa::path(
    get,
    path = "/mood-tracker",
    responses(
        (status = 200, description = "Recent entries and insights", body = MoodTrackerView),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn mood_tracker_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<MoodTrackerView>, ApiError> {
    let entries = state
        .db
        .recent_mood_entries(session.id, RECENT_ENTRY_LIMIT)
        .await?;
    let insights = mood_insights(&entries);

    Ok(Json(MoodTrackerView {
        entries: entries.into_iter().map(Into::into).collect(),
        insights,
        moods: Mood::ALL
            .iter()
            .map(|m| Choice {
                value: m.as_str().to_string(),
                label: m.display().to_string(),
            })
            .collect(),
    }))
}

/// Record a mood entry.
#[utoipa::path(
    post,
    path = "/mood-tracker",
    request_body = NewMoodEntryRequest,
    responses(
        (status = 201, description = "Entry saved", body = MoodEntryView),
        (status = 400, description = "Unknown mood or intensity outside 1-10"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_mood_entry_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    JsonBody(req): JsonBody<NewMoodEntryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mood = Mood::from_str(&req.mood).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let intensity = Intensity::new(req.intensity).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Intensity must be between {} and {}",
            Intensity::MIN,
            Intensity::MAX
        ))
    })?;

    let entry = state
        .db
        .create_mood_entry(session.id, mood, intensity, req.notes.trim())
        .await?;
    Ok((StatusCode::CREATED, Json(MoodEntryView::from(entry))))
}

/// Mood entries from the last 30 days, oldest first, for charting.
#[utoipa::path(
    get,
    path = "/mood-chart-data",
    responses(
        (status = 200, description = "Chart points", body = ChartData),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn mood_chart_data_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<ChartData>, ApiError> {
    let since = Utc::now() - Duration::days(CHART_WINDOW_DAYS);
    let entries = state.db.mood_entries_since(session.id, since).await?;

    let chart_data = entries
        .into_iter()
        .map(|e| ChartPoint {
            date: e.created_at.format("%Y-%m-%d").to_string(),
            mood: e.mood.as_str().to_string(),
            intensity: e.intensity.value(),
            display_mood: e.mood.display().to_string(),
        })
        .collect();
    Ok(Json(ChartData { chart_data }))
}
