use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

pub const PURPOSE_PASSWORD_RESET: &str = "password_reset";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Bookmark {
    pub user_id: Uuid,
    pub manga_id: String,
    pub created_at: OffsetDateTime,
}

impl Bookmark {
    pub async fn find(
        db: &PgPool,
        user_id: Uuid,
        manga_id: &str,
    ) -> anyhow::Result<Option<Bookmark>> {
        let row = sqlx::query_as::<_, Bookmark>(
            r#"
            SELECT user_id, manga_id, created_at
            FROM bookmarks
            WHERE user_id = $1 AND manga_id = $2
            "#,
        )
        .bind(user_id)
        .bind(manga_id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn insert(db: &PgPool, user_id: Uuid, manga_id: &str) -> anyhow::Result<Bookmark> {
        let row = sqlx::query_as::<_, Bookmark>(
            r#"
            INSERT INTO bookmarks (user_id, manga_id)
            VALUES ($1, $2)
            RETURNING user_id, manga_id, created_at
            "#,
        )
        .bind(user_id)
        .bind(manga_id)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    pub async fn count_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM bookmarks WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(db)
                .await?;
        Ok(count)
    }

    pub async fn list_by_user(
        db: &PgPool,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Bookmark>> {
        let rows = sqlx::query_as::<_, Bookmark>(
            r#"
            SELECT user_id, manga_id, created_at
            FROM bookmarks
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Returns the number of rows removed (0 when nothing matched).
    pub async fn delete(db: &PgPool, user_id: Uuid, manga_id: &str) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM bookmarks WHERE user_id = $1 AND manga_id = $2")
            .bind(user_id)
            .bind(manga_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HistoryEntry {
    pub user_id: Uuid,
    pub manga_id: String,
    pub chapter_id: String,
    pub last_page: i32,
    pub updated_at: OffsetDateTime,
}

impl HistoryEntry {
    /// Upserts reading progress; a user has one row per chapter and the
    /// row always reflects the most recent progress.
    pub async fn upsert(
        db: &PgPool,
        user_id: Uuid,
        manga_id: &str,
        chapter_id: &str,
        last_page: i32,
    ) -> anyhow::Result<HistoryEntry> {
        let row = sqlx::query_as::<_, HistoryEntry>(
            r#"
            INSERT INTO history (user_id, manga_id, chapter_id, last_page, updated_at)
            VALUES ($1, $2, $3, $4, now())
            ON CONFLICT (user_id, chapter_id)
            DO UPDATE SET manga_id = EXCLUDED.manga_id,
                          last_page = EXCLUDED.last_page,
                          updated_at = now()
            RETURNING user_id, manga_id, chapter_id, last_page, updated_at
            "#,
        )
        .bind(user_id)
        .bind(manga_id)
        .bind(chapter_id)
        .bind(last_page)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    pub async fn count_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM history WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(db)
            .await?;
        Ok(count)
    }

    pub async fn list_by_user(
        db: &PgPool,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<HistoryEntry>> {
        let rows = sqlx::query_as::<_, HistoryEntry>(
            r#"
            SELECT user_id, manga_id, chapter_id, last_page, updated_at
            FROM history
            WHERE user_id = $1
            ORDER BY updated_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OneTimeCode {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub code: String,
    pub purpose: String,
    pub expires_at: OffsetDateTime,
    pub is_used: bool,
    pub verified_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl OneTimeCode {
    /// A code can complete a reset only while it is unused, already
    /// verified, and not past its expiry.
    pub fn can_complete(&self, now: OffsetDateTime) -> bool {
        !self.is_used && self.verified_at.is_some() && self.expires_at > now
    }

    /// Stores a fresh code for (user, purpose), overwriting any prior one:
    /// a user has at most one active code per purpose.
    pub async fn upsert(
        db: &PgPool,
        user_id: Uuid,
        email: &str,
        code: &str,
        purpose: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<OneTimeCode> {
        let row = sqlx::query_as::<_, OneTimeCode>(
            r#"
            INSERT INTO one_time_codes (id, user_id, email, code, purpose, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, purpose)
            DO UPDATE SET id = EXCLUDED.id,
                          email = EXCLUDED.email,
                          code = EXCLUDED.code,
                          expires_at = EXCLUDED.expires_at,
                          is_used = FALSE,
                          verified_at = NULL,
                          created_at = now()
            RETURNING id, user_id, email, code, purpose, expires_at, is_used, verified_at, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(email)
        .bind(code)
        .bind(purpose)
        .bind(expires_at)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    /// Matches an unused, unexpired code for the verification step.
    pub async fn find_active(
        db: &PgPool,
        email: &str,
        code: &str,
        purpose: &str,
    ) -> anyhow::Result<Option<OneTimeCode>> {
        let row = sqlx::query_as::<_, OneTimeCode>(
            r#"
            SELECT id, user_id, email, code, purpose, expires_at, is_used, verified_at, created_at
            FROM one_time_codes
            WHERE email = $1 AND code = $2 AND purpose = $3
              AND is_used = FALSE AND expires_at > now()
            "#,
        )
        .bind(email)
        .bind(code)
        .bind(purpose)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    /// Point lookup for the completion step; state checks happen in the
    /// handler via `can_complete`.
    pub async fn find_for_completion(
        db: &PgPool,
        id: Uuid,
        email: &str,
        purpose: &str,
    ) -> anyhow::Result<Option<OneTimeCode>> {
        let row = sqlx::query_as::<_, OneTimeCode>(
            r#"
            SELECT id, user_id, email, code, purpose, expires_at, is_used, verified_at, created_at
            FROM one_time_codes
            WHERE id = $1 AND email = $2 AND purpose = $3
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(purpose)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn mark_verified(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE one_time_codes SET verified_at = now() WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn mark_used(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE one_time_codes SET is_used = TRUE WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn code(is_used: bool, verified: bool, expires_in_secs: i64) -> OneTimeCode {
        let now = OffsetDateTime::now_utc();
        OneTimeCode {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            email: "reader@example.com".into(),
            code: "123456".into(),
            purpose: PURPOSE_PASSWORD_RESET.into(),
            expires_at: now + Duration::seconds(expires_in_secs),
            is_used,
            verified_at: verified.then_some(now),
            created_at: now,
        }
    }

    #[test]
    fn verified_unused_unexpired_code_can_complete() {
        let now = OffsetDateTime::now_utc();
        assert!(code(false, true, 600).can_complete(now));
    }

    #[test]
    fn used_code_cannot_complete() {
        let now = OffsetDateTime::now_utc();
        assert!(!code(true, true, 600).can_complete(now));
    }

    #[test]
    fn unverified_code_cannot_complete() {
        let now = OffsetDateTime::now_utc();
        assert!(!code(false, false, 600).can_complete(now));
    }

    #[test]
    fn expired_code_cannot_complete() {
        let now = OffsetDateTime::now_utc();
        assert!(!code(false, true, -1).can_complete(now));
    }
}
