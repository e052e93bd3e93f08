//! Resolution API handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use streamfind_core::{
    CatalogEntry, EpisodeResolution, ResolveEpisodeRequest, ResolveError, ResolveMovieRequest,
};

use super::handlers::error_response;
use crate::state::AppState;

/// POST /api/v1/resolve/episode
///
/// Resolve a series episode to a stream. 404 when nothing matched.
pub async fn resolve_episode(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ResolveEpisodeRequest>,
) -> Result<Json<EpisodeResolution>, impl IntoResponse> {
    match state.resolver().resolve_episode_detailed(&body).await {
        Ok(outcome) if outcome.result.is_some() => Ok(Json(outcome)),
        Ok(_) => Err(error_response(
            StatusCode::NOT_FOUND,
            format!(
                "No stream found for {} S{:02}E{:02}",
                body.title, body.season, body.episode
            ),
        )),
        Err(ResolveError::InvalidRequest(msg)) => {
            Err(error_response(StatusCode::BAD_REQUEST, msg))
        }
    }
}

/// POST /api/v1/resolve/movie
///
/// Resolve a movie to its catalog entry. 404 when nothing matched.
pub async fn resolve_movie(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ResolveMovieRequest>,
) -> Result<Json<CatalogEntry>, impl IntoResponse> {
    match state.resolver().resolve_movie(&body).await {
        Ok(Some(entry)) => Ok(Json(entry)),
        Ok(None) => Err(error_response(
            StatusCode::NOT_FOUND,
            format!("No movie found for {}", body.title),
        )),
        Err(ResolveError::InvalidRequest(msg)) => {
            Err(error_response(StatusCode::BAD_REQUEST, msg))
        }
    }
}
