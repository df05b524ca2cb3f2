use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    catalog::{
        types::{ChapterSummary, Genre, Manga},
        FeedParams, SearchFilter,
    },
    error::ApiError,
    manga::dto::{
        parse_lenient, CatalogPageQuery, FeedQuery, GenreSearchQuery, TitleSearchQuery,
    },
    response::{DataResponse, Pagination},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/latest", get(get_latest))
        .route("/popular", get(get_popular))
        .route("/search/title", get(search_by_title))
        .route("/search/genre", get(search_by_genre))
        .route("/genres", get(get_genres))
        .route("/:mangaId/feed", get(get_feed))
}

#[instrument(skip(state))]
pub async fn get_latest(
    State(state): State<AppState>,
    Query(p): Query<CatalogPageQuery>,
) -> Result<Json<DataResponse<Vec<Manga>>>, ApiError> {
    let (offset, limit) = p.offset_limit();
    let page = state
        .catalog
        .get_latest(limit, offset)
        .await
        .map_err(ApiError::upstream)?;
    Ok(Json(DataResponse {
        message: "latest manga retrieved".into(),
        pagination: Some(Pagination::new(p.page, limit as i64, page.total as i64)),
        data: page.results,
    }))
}

#[instrument(skip(state))]
pub async fn get_popular(
    State(state): State<AppState>,
    Query(p): Query<CatalogPageQuery>,
) -> Result<Json<DataResponse<Vec<Manga>>>, ApiError> {
    let (offset, limit) = p.offset_limit();
    let page = state
        .catalog
        .get_popular(limit, offset)
        .await
        .map_err(ApiError::upstream)?;
    Ok(Json(DataResponse {
        message: "popular manga retrieved".into(),
        pagination: Some(Pagination::new(p.page, limit as i64, page.total as i64)),
        data: page.results,
    }))
}

#[instrument(skip(state))]
pub async fn search_by_title(
    State(state): State<AppState>,
    Query(q): Query<TitleSearchQuery>,
) -> Result<Json<DataResponse<Vec<Manga>>>, ApiError> {
    let title = q
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("title parameter is required".into()))?;

    let paging = CatalogPageQuery {
        page: q.page,
        limit: q.limit,
    };
    let (offset, limit) = paging.offset_limit();
    let page = state
        .catalog
        .search(SearchFilter {
            title: Some(title),
            limit: Some(limit),
            offset: Some(offset),
            ..Default::default()
        })
        .await
        .map_err(ApiError::upstream)?;

    Ok(Json(DataResponse {
        message: "title search results".into(),
        pagination: Some(Pagination::new(paging.page, limit as i64, page.total as i64)),
        data: page.results,
    }))
}

#[instrument(skip(state))]
pub async fn search_by_genre(
    State(state): State<AppState>,
    Query(q): Query<GenreSearchQuery>,
) -> Result<Json<DataResponse<Vec<Manga>>>, ApiError> {
    let genre_ids = q
        .genre_ids
        .filter(|g| !g.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("genreIds parameter is required".into()))?;

    let paging = CatalogPageQuery {
        page: q.page,
        limit: q.limit,
    };
    let (offset, limit) = paging.offset_limit();
    let page = state
        .catalog
        .search(SearchFilter {
            included_tags: genre_ids.split(',').map(|s| s.trim().to_string()).collect(),
            limit: Some(limit),
            offset: Some(offset),
            ..Default::default()
        })
        .await
        .map_err(ApiError::upstream)?;

    Ok(Json(DataResponse {
        message: "genre search results".into(),
        pagination: Some(Pagination::new(paging.page, limit as i64, page.total as i64)),
        data: page.results,
    }))
}

#[instrument(skip(state))]
pub async fn get_genres(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<Vec<Genre>>>, ApiError> {
    let genres = state
        .catalog
        .get_genres()
        .await
        .map_err(ApiError::upstream)?;
    Ok(Json(DataResponse {
        message: "genres retrieved".into(),
        data: genres,
        pagination: None,
    }))
}

#[instrument(skip(state))]
pub async fn get_feed(
    State(state): State<AppState>,
    Path(manga_id): Path<String>,
    Query(q): Query<FeedQuery>,
) -> Result<Json<DataResponse<Vec<ChapterSummary>>>, ApiError> {
    let params = FeedParams {
        limit: parse_lenient(q.limit.as_deref()),
        offset: parse_lenient(q.offset.as_deref()),
        languages: q
            .lang
            .map(|l| l.split(',').map(|s| s.trim().to_string()).collect()),
    };

    let chapters = state
        .catalog
        .get_feed(&manga_id, params)
        .await
        .map_err(ApiError::upstream)?;

    Ok(Json(DataResponse {
        message: "chapter list retrieved".into(),
        data: chapters,
        pagination: None,
    }))
}
