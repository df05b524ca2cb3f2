use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{catalog::types::ChapterPages, error::ApiError, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/:chapterId/pages", get(get_chapter_pages))
}

/// Page URLs are served as-is, no envelope: the payload is already the
/// complete response the reader needs.
#[instrument(skip(state))]
pub async fn get_chapter_pages(
    State(state): State<AppState>,
    Path(chapter_id): Path<String>,
) -> Result<Json<ChapterPages>, ApiError> {
    let pages = state
        .catalog
        .get_chapter_pages(&chapter_id)
        .await
        .map_err(ApiError::upstream)?;
    Ok(Json(pages))
}
