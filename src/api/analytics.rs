use std::sync::Arc;

use axum::{extract::State, Json};

use crate::errors::{AppError, ForwardExt, Operation};
use crate::models::analytics::AnalyticsReport;
use crate::models::credential::Credential;
use crate::AppState;

/// GET /api/threads/analytics: one page of posts merged with their insights, plus totals and averages
#[tracing::instrument(skip_all)]
pub async fn get_analytics(
    State(state): State<Arc<AppState>>,
    credential: Credential,
) -> Result<Json<AnalyticsReport>, AppError> {
    let report = state
        .threads
        .collect_analytics(&credential)
        .await
        .forwarding(Operation::Analytics)?;

    tracing::info!(
        posts = report.summary.posts,
        views = report.summary.totals.views,
        "analytics aggregated"
    );
    Ok(Json(report))
}
