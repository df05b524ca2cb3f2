use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::auth::repo::PublicUser;
use crate::users::repo::{Bookmark, HistoryEntry};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddBookmarkRequest {
    pub manga_id: String,
}

#[derive(Debug, Serialize)]
pub struct BookmarkResponse {
    pub message: String,
    pub bookmark: Bookmark,
}

/// Bookmark row joined with catalog display fields. Enrichment is
/// best-effort: a catalog failure leaves the fallback values in place.
#[derive(Debug, Serialize)]
pub struct EnrichedBookmark {
    pub manga_id: String,
    pub created_at: OffsetDateTime,
    pub title: String,
    #[serde(rename = "coverUrl")]
    pub cover_url: Option<String>,
    pub author: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddHistoryRequest {
    pub manga_id: String,
    pub chapter_id: String,
    #[serde(default)]
    pub last_page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub message: String,
    pub history: HistoryEntry,
}

#[derive(Debug, Serialize)]
pub struct EnrichedHistory {
    pub manga_id: String,
    pub chapter_id: String,
    pub last_page: i32,
    pub updated_at: OffsetDateTime,
    #[serde(rename = "mangaTitle")]
    pub manga_title: String,
    #[serde(rename = "mangaCoverUrl")]
    pub manga_cover_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub profile_image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub message: String,
    pub user: PublicUser,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct SendResetOtpRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyResetOtpRequest {
    pub email: String,
    pub otp: String,
}

/// The opaque token handed back by verification is presented at completion.
#[derive(Debug, Serialize)]
pub struct VerifyResetOtpResponse {
    pub message: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub token: String,
    pub new_password: String,
}
