/// Project analysis endpoint
///
/// ```text
/// POST /v1/projects/:id/analyze
/// ```
///
/// Answers the summarizer's verdict on the project. Requires membership.
/// `503 Service Unavailable` when no summarizer is configured or it fails.

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use trellis_shared::{auth::middleware::AuthContext, services::analysis::ProjectAnalysis};
use uuid::Uuid;

pub async fn analyze_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<ProjectAnalysis>> {
    let analysis = state.analysis.analyze(auth.user_id, project_id).await?;

    tracing::info!(
        project_id = %project_id,
        user_id = %auth.user_id,
        risk_score = analysis.risk_score,
        "Project analyzed"
    );

    Ok(Json(analysis))
}
