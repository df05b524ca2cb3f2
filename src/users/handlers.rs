use std::collections::{HashMap, HashSet};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, patch, post},
    Router,
};
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::MessageResponse,
        repo::User,
        services::{
            generate_otp_code, hash_password, normalize_email, verify_password, AuthUser,
            MIN_PASSWORD_LEN,
        },
    },
    catalog::{types::Manga, SearchFilter},
    error::{ApiError, Json},
    response::{DataResponse, PageQuery, Pagination},
    state::AppState,
    users::{
        dto::{
            AddBookmarkRequest, AddHistoryRequest, BookmarkResponse, EnrichedBookmark,
            EnrichedHistory, HistoryResponse, ProfileResponse, ResetPasswordRequest,
            SendResetOtpRequest, UpdatePasswordRequest, UpdateProfileRequest,
            VerifyResetOtpRequest, VerifyResetOtpResponse,
        },
        repo::{Bookmark, HistoryEntry, OneTimeCode, PURPOSE_PASSWORD_RESET},
    },
};

const OTP_TTL: Duration = Duration::minutes(10);
const INVALID_OTP: &str = "invalid or expired code";
const INVALID_RESET_TOKEN: &str = "invalid or expired token";

pub fn router() -> Router<AppState> {
    Router::new()
        // password reset is reachable without a token
        .route("/send-reset-otp", post(send_reset_otp))
        .route("/verify-reset-otp", post(verify_reset_otp))
        .route("/reset-password", post(reset_password))
        // everything below requires a bearer token (AuthUser extractor)
        .route("/bookmarks", post(add_bookmark).get(get_bookmarks))
        .route("/bookmarks/:mangaId", delete(delete_bookmark))
        .route("/history", post(add_history).get(get_history))
        .route("/profile", patch(update_profile))
        .route("/password", patch(update_password))
}

// --- bookmarks ---

#[instrument(skip(state, payload))]
pub async fn add_bookmark(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddBookmarkRequest>,
) -> Result<(StatusCode, Json<BookmarkResponse>), ApiError> {
    if payload.manga_id.is_empty() {
        return Err(ApiError::Validation("mangaId is required".into()));
    }

    // Duplicate adds are idempotent: hand back the existing row.
    if let Some(existing) = Bookmark::find(&state.db, user.id, &payload.manga_id).await? {
        return Ok((
            StatusCode::OK,
            Json(BookmarkResponse {
                message: "manga already bookmarked".into(),
                bookmark: existing,
            }),
        ));
    }

    let bookmark = Bookmark::insert(&state.db, user.id, &payload.manga_id).await?;
    info!(user_id = %user.id, manga_id = %payload.manga_id, "bookmark added");
    Ok((
        StatusCode::CREATED,
        Json(BookmarkResponse {
            message: "bookmark added".into(),
            bookmark,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn get_bookmarks(
    State(state): State<AppState>,
    user: AuthUser,
    Query(p): Query<PageQuery>,
) -> Result<Json<DataResponse<Vec<EnrichedBookmark>>>, ApiError> {
    let (offset, limit) = p.offset_limit();

    let total = Bookmark::count_by_user(&state.db, user.id).await?;
    if total == 0 {
        return Ok(Json(DataResponse {
            message: "no bookmarks".into(),
            data: vec![],
            pagination: Some(Pagination::empty(limit)),
        }));
    }

    let bookmarks = Bookmark::list_by_user(&state.db, user.id, limit, offset).await?;
    let details = manga_details(&state, bookmarks.iter().map(|b| b.manga_id.as_str())).await;

    let data = bookmarks
        .into_iter()
        .map(|b| {
            let m = details.get(&b.manga_id);
            EnrichedBookmark {
                title: m.map(|m| m.title.clone()).unwrap_or_else(|| "N/A".into()),
                cover_url: m.map(|m| m.cover_url.clone()),
                author: m.map(|m| m.author.clone()).unwrap_or_else(|| "N/A".into()),
                status: m
                    .and_then(|m| m.status.clone())
                    .unwrap_or_else(|| "N/A".into()),
                manga_id: b.manga_id,
                created_at: b.created_at,
            }
        })
        .collect();

    Ok(Json(DataResponse {
        message: "bookmarks retrieved".into(),
        data,
        pagination: Some(Pagination::new(p.page, limit, total)),
    }))
}

#[instrument(skip(state))]
pub async fn delete_bookmark(
    State(state): State<AppState>,
    user: AuthUser,
    Path(manga_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let removed = Bookmark::delete(&state.db, user.id, &manga_id).await?;
    if removed == 0 {
        return Err(ApiError::NotFound("bookmark not found".into()));
    }
    info!(user_id = %user.id, %manga_id, "bookmark removed");
    Ok(Json(MessageResponse {
        message: "bookmark removed".into(),
    }))
}

// --- reading history ---

#[instrument(skip(state, payload))]
pub async fn add_history(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddHistoryRequest>,
) -> Result<Json<HistoryResponse>, ApiError> {
    if payload.manga_id.is_empty() || payload.chapter_id.is_empty() {
        return Err(ApiError::Validation(
            "mangaId and chapterId are required".into(),
        ));
    }
    let last_page = payload.last_page.filter(|p| *p >= 0).unwrap_or(0) as i32;

    let history = HistoryEntry::upsert(
        &state.db,
        user.id,
        &payload.manga_id,
        &payload.chapter_id,
        last_page,
    )
    .await?;
    Ok(Json(HistoryResponse {
        message: "history updated".into(),
        history,
    }))
}

#[instrument(skip(state))]
pub async fn get_history(
    State(state): State<AppState>,
    user: AuthUser,
    Query(p): Query<PageQuery>,
) -> Result<Json<DataResponse<Vec<EnrichedHistory>>>, ApiError> {
    let (offset, limit) = p.offset_limit();

    let total = HistoryEntry::count_by_user(&state.db, user.id).await?;
    if total == 0 {
        return Ok(Json(DataResponse {
            message: "no history".into(),
            data: vec![],
            pagination: Some(Pagination::empty(limit)),
        }));
    }

    let entries = HistoryEntry::list_by_user(&state.db, user.id, limit, offset).await?;
    let details = manga_details(&state, entries.iter().map(|h| h.manga_id.as_str())).await;

    let data = entries
        .into_iter()
        .map(|h| {
            let m = details.get(&h.manga_id);
            EnrichedHistory {
                manga_title: m.map(|m| m.title.clone()).unwrap_or_else(|| "N/A".into()),
                manga_cover_url: m.map(|m| m.cover_url.clone()),
                manga_id: h.manga_id,
                chapter_id: h.chapter_id,
                last_page: h.last_page,
                updated_at: h.updated_at,
            }
        })
        .collect();

    Ok(Json(DataResponse {
        message: "history retrieved".into(),
        data,
        pagination: Some(Pagination::new(p.page, limit, total)),
    }))
}

/// Looks up catalog details for the page's distinct manga ids. Best-effort:
/// an upstream failure degrades the listing to fallback fields instead of
/// failing the request.
async fn manga_details<'a>(
    state: &AppState,
    manga_ids: impl Iterator<Item = &'a str>,
) -> HashMap<String, Manga> {
    let ids: Vec<String> = manga_ids
        .map(|s| s.to_string())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    if ids.is_empty() {
        return HashMap::new();
    }

    let filter = SearchFilter {
        limit: Some(ids.len() as u32),
        ids,
        ..Default::default()
    };
    match state.catalog.search(filter).await {
        Ok(page) => page
            .results
            .into_iter()
            .map(|m| (m.id.clone(), m))
            .collect(),
        Err(e) => {
            warn!(error = %e, "catalog enrichment failed, serving bare rows");
            HashMap::new()
        }
    }
}

// --- profile & password ---

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    if payload.username.is_none() && payload.profile_image_url.is_none() {
        return Err(ApiError::Validation("nothing to update".into()));
    }

    let updated = User::update_profile(
        &state.db,
        user.id,
        payload.username.as_deref(),
        payload.profile_image_url.as_deref(),
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("user not found".into()))?;

    info!(user_id = %user.id, "profile updated");
    Ok(Json(ProfileResponse {
        message: "profile updated".into(),
        user: updated.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.new_password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(
            "new password must be at least 6 characters".into(),
        ));
    }

    let record = User::find_by_id(&state.db, user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;

    if !verify_password(&payload.current_password, &record.password_hash)? {
        warn!(user_id = %user.id, "password change with wrong current password");
        return Err(ApiError::Unauthorized("current password is incorrect".into()));
    }

    let hash = hash_password(&payload.new_password)?;
    User::update_password_hash(&state.db, user.id, &hash).await?;

    info!(user_id = %user.id, "password changed");
    Ok(Json(MessageResponse {
        message: "password updated".into(),
    }))
}

// --- password reset (three-step OTP flow) ---

#[instrument(skip(state, payload))]
pub async fn send_reset_otp(
    State(state): State<AppState>,
    Json(payload): Json<SendResetOtpRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = normalize_email(&payload.email);

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::NotFound("no account with that email".into()))?;

    let code = generate_otp_code();
    let expires_at = OffsetDateTime::now_utc() + OTP_TTL;
    OneTimeCode::upsert(
        &state.db,
        user.id,
        &email,
        &code,
        PURPOSE_PASSWORD_RESET,
        expires_at,
    )
    .await?;

    state.mailer.send_otp(&email, &code).await?;

    info!(user_id = %user.id, "reset otp dispatched");
    Ok(Json(MessageResponse {
        message: "reset code sent".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn verify_reset_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyResetOtpRequest>,
) -> Result<Json<VerifyResetOtpResponse>, ApiError> {
    let email = normalize_email(&payload.email);

    let otc = OneTimeCode::find_active(&state.db, &email, &payload.otp, PURPOSE_PASSWORD_RESET)
        .await?
        .ok_or_else(|| ApiError::Validation(INVALID_OTP.into()))?;

    // The code stays unconsumed here: the completion step is the single
    // consuming transition.
    OneTimeCode::mark_verified(&state.db, otc.id).await?;

    info!(user_id = %otc.user_id, "reset otp verified");
    Ok(Json(VerifyResetOtpResponse {
        message: "code verified".into(),
        token: otc.id.to_string(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = normalize_email(&payload.email);

    if payload.new_password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(
            "new password must be at least 6 characters".into(),
        ));
    }

    // Any mismatch below collapses into the same generic rejection; the
    // caller learns nothing about which check failed.
    let token_id = Uuid::parse_str(&payload.token)
        .map_err(|_| ApiError::Validation(INVALID_RESET_TOKEN.into()))?;

    let otc = OneTimeCode::find_for_completion(&state.db, token_id, &email, PURPOSE_PASSWORD_RESET)
        .await?
        .ok_or_else(|| ApiError::Validation(INVALID_RESET_TOKEN.into()))?;

    if !otc.can_complete(OffsetDateTime::now_utc()) {
        return Err(ApiError::Validation(INVALID_RESET_TOKEN.into()));
    }

    let hash = hash_password(&payload.new_password)?;
    User::update_password_hash(&state.db, otc.user_id, &hash).await?;
    OneTimeCode::mark_used(&state.db, otc.id).await?;

    info!(user_id = %otc.user_id, "password reset completed");
    Ok(Json(MessageResponse {
        message: "password reset successful".into(),
    }))
}
