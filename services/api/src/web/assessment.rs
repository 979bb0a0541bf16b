//! services/api/src/web/assessment.rs
//!
//! The self-assessment questionnaire.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use moodigo_core::analysis::{ASSESSMENT_QUESTIONS, MAX_ANSWER, RESPONSE_OPTIONS};
use moodigo_core::domain::UserSession;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::web::extract::JsonBody;
use crate::web::protocol::{
    AssessmentForm, AssessmentRequest, AssessmentResult, Choice, QuestionView,
};
use crate::web::state::AppState;

fn question_key(index: usize) -> String {
    format!("question_{}", index)
}

/// Reads the answers in question order. Missing answers count as 0.
fn collect_answers(responses: &BTreeMap<String, i64>) -> Result<Vec<u8>, ApiError> {
    (0..ASSESSMENT_QUESTIONS.len())
        .map(|i| {
            let key = question_key(i);
            let answer = responses.get(&key).copied().unwrap_or(0);
            u8::try_from(answer)
                .ok()
                .filter(|a| *a <= MAX_ANSWER)
                .ok_or_else(|| {
                    ApiError::BadRequest(format!(
                        "{} must be between 0 and {}, got {}",
                        key, MAX_ANSWER, answer
                    ))
                })
        })
        .collect()
}

/// The questionnaire and its answer scale.
#[utoipa::path(
    get,
    path = "/assessment",
    responses((status = 200, description = "The questionnaire", body = AssessmentForm))
)]
pub async fn assessment_form_handler() -> Json<AssessmentForm> {
    Json(AssessmentForm {
        questions: ASSESSMENT_QUESTIONS
            .iter()
            .enumerate()
            .map(|(i, text)| QuestionView {
                key: question_key(i),
                text: text.to_string(),
            })
            .collect(),
        response_options: RESPONSE_OPTIONS
            .iter()
            .map(|(value, label)| Choice {
                value: value.to_string(),
                label: label.to_string(),
            })
            .collect(),
    })
}

/// Score a completed questionnaire and store the result.
#[utoipa::path(
    post,
    path = "/assessment",
    request_body = AssessmentRequest,
    responses(
        (status = 201, description = "Assessment stored", body = AssessmentResult),
        (status = 400, description = "An answer is outside 0-4"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn submit_assessment_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    JsonBody(req): JsonBody<AssessmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let answers = collect_answers(&req.responses)?;
    let outcome = state.analyzer.analyze_survey(&answers)?;

    // Stored keyed by question text.
    let responses: Map<String, Value> = ASSESSMENT_QUESTIONS
        .iter()
        .zip(&answers)
        .map(|(question, &answer)| (question.to_string(), Value::from(answer)))
        .collect();

    let assessment = state
        .db
        .create_assessment(
            session.id,
            outcome.total_score,
            outcome.risk_level,
            &Value::Object(responses),
            &outcome.recommendations.join("; "),
        )
        .await?;
    info!(
        "Stored assessment {} for session {} ({})",
        assessment.id,
        session.id,
        assessment.risk_level.as_str()
    );

    let result = AssessmentResult {
        id: assessment.id,
        risk_level: assessment.risk_level.as_str().to_string(),
        risk_label: assessment.risk_level.label().to_string(),
        confidence: outcome.confidence,
        total_score: assessment.total_score,
        recommendations: outcome.recommendations,
        created_at: assessment.created_at,
    };
    Ok((StatusCode::CREATED, Json(result)))
}
