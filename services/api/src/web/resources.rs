//! services/api/src/web/resources.rs
//!
//! Support resource listings.

use axum::{extract::State, response::Json};
use moodigo_core::domain::{Resource, ResourceType};
use std::sync::Arc;

use crate::error::ApiError;
use crate::web::protocol::{CrisisHelpView, ResourcesView, ResourceView};
use crate::web::state::AppState;

fn views(resources: Vec<Resource>) -> Vec<ResourceView> {
    resources.into_iter().map(Into::into).collect()
}

/// Active resources grouped the way the resources page shows them.
#[utoipa::path(
    get,
    path = "/resources",
    responses(
        (status = 200, description = "Grouped resources", body = ResourcesView),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn resources_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ResourcesView>, ApiError> {
    let db = &state.db;
    Ok(Json(ResourcesView {
        crisis_resources: views(db.list_resources(None, true).await?),
        counseling_resources: views(db.list_resources(Some(ResourceType::Counseling), false).await?),
        app_resources: views(db.list_resources(Some(ResourceType::App), false).await?),
        article_resources: views(db.list_resources(Some(ResourceType::Article), false).await?),
    }))
}

/// Active crisis resources.
#[utoipa::path(
    get,
    path = "/crisis-help",
    responses(
        (status = 200, description = "Crisis resources", body = CrisisHelpView),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn crisis_help_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CrisisHelpView>, ApiError> {
    let crisis_resources = views(state.db.list_resources(None, true).await?);
    Ok(Json(CrisisHelpView { crisis_resources }))
}
