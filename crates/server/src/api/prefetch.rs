//! Cache warm-up handlers. Both return immediately and warm in the background.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use streamfind_core::PrefetchSeriesRequest;
use tracing::{debug, warn};

use super::handlers::{error_response, ErrorResponse};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub status: String,
}

fn accepted() -> (StatusCode, Json<AcceptedResponse>) {
    (
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            status: "accepted".to_string(),
        }),
    )
}

/// POST /api/v1/prefetch/catalog
///
/// Load both catalogs of the configured provider.
pub async fn prefetch_catalog(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resolver = Arc::clone(state.resolver());
    tokio::spawn(async move {
        let credentials = resolver.credentials().clone();
        let loaded = resolver.prefetch_catalog(&credentials).await;
        debug!(loaded, "Catalog prefetch finished");
    });
    accepted()
}

/// POST /api/v1/prefetch/series
///
/// Warm the episode lists a lookup for this series would probe.
pub async fn prefetch_series(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PrefetchSeriesRequest>,
) -> Result<(StatusCode, Json<AcceptedResponse>), (StatusCode, Json<ErrorResponse>)> {
    let has_id = [&body.tmdb_id, &body.imdb_id]
        .iter()
        .any(|id| id.as_deref().is_some_and(|s| !s.trim().is_empty()));
    if body.title.trim().is_empty() && !has_id {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "a title or an external id is required",
        ));
    }

    let resolver = Arc::clone(state.resolver());
    tokio::spawn(async move {
        match resolver.prefetch_series_info(&body).await {
            Ok(warmed) => debug!(title = %body.title, warmed, "Series prefetch finished"),
            Err(e) => warn!(title = %body.title, error = %e, "Series prefetch rejected"),
        }
    });
    Ok(accepted())
}
