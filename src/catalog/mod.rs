//! Client for the upstream MangaDex catalog API.
//!
//! Normalizes the upstream relationship graphs into flat records the
//! frontend can render, and shields callers from upstream volatility with
//! a small TTL cache for the hot list endpoints.

use std::time::Duration;

use anyhow::{anyhow, bail};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::config::CatalogConfig;

mod cache;
pub mod types;

use cache::TtlCache;
use types::{
    ChapterPages, ChapterSummary, Genre, Manga, MangaPage, RawAtHome, RawChapter, RawChapterList,
    RawManga, RawMangaList, RawTag, RawTagList,
};

const STANDARD_TTL: Duration = Duration::from_secs(5 * 60);
const GENRES_TTL: Duration = Duration::from_secs(5 * 60 * 12);
const DEFAULT_SEARCH_LIMIT: u32 = 20;
const FEED_DEFAULT_LIMIT: u32 = 500;
const FEED_MAX_LIMIT: u32 = 500;
const DESCRIPTION_MAX_CHARS: usize = 200;

const FETCH_MANGA_FAILED: &str = "failed to fetch manga data";
const FETCH_FEED_FAILED: &str = "failed to fetch chapter list";
const FETCH_PAGES_FAILED: &str = "failed to fetch chapter pages";

/// Fixed sort orders exposed by the list endpoints.
#[derive(Debug, Clone, Copy)]
pub enum SearchOrder {
    LatestUploadedChapter,
    FollowedCount,
}

impl SearchOrder {
    fn query_key(self) -> &'static str {
        match self {
            SearchOrder::LatestUploadedChapter => "order[latestUploadedChapter]",
            SearchOrder::FollowedCount => "order[followedCount]",
        }
    }
}

/// Caller-supplied search parameters; defaults are merged in by `search`.
#[derive(Debug, Default, Clone)]
pub struct SearchFilter {
    pub title: Option<String>,
    pub ids: Vec<String>,
    pub included_tags: Vec<String>,
    pub order: Option<SearchOrder>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Caller-supplied feed parameters. `limit`/`offset` stay optional so the
/// client can substitute safe defaults for missing or garbage input.
#[derive(Debug, Default, Clone)]
pub struct FeedParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub languages: Option<Vec<String>>,
}

pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
    uploads_base_url: String,
    placeholder_cover_url: String,
    pages_cache: TtlCache<MangaPage>,
    genres_cache: TtlCache<Vec<Genre>>,
}

impl CatalogClient {
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            uploads_base_url: config.uploads_base_url.trim_end_matches('/').to_string(),
            placeholder_cover_url: config.placeholder_cover_url.clone(),
            pages_cache: TtlCache::new(STANDARD_TTL),
            genres_cache: TtlCache::new(GENRES_TTL),
        }
    }

    /// Searches the catalog and returns normalized records plus the
    /// upstream paging envelope.
    pub async fn search(&self, filter: SearchFilter) -> anyhow::Result<MangaPage> {
        let mut query: Vec<(String, String)> = vec![(
            "limit".into(),
            filter.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).to_string(),
        )];
        if let Some(offset) = filter.offset {
            query.push(("offset".into(), offset.to_string()));
        }
        for include in ["cover_art", "author", "artist"] {
            query.push(("includes[]".into(), include.into()));
        }
        for rating in ["safe", "suggestive"] {
            query.push(("contentRating[]".into(), rating.into()));
        }
        if let Some(title) = &filter.title {
            query.push(("title".into(), title.clone()));
        }
        for id in &filter.ids {
            query.push(("ids[]".into(), id.clone()));
        }
        for tag in &filter.included_tags {
            query.push(("includedTags[]".into(), tag.clone()));
        }
        if let Some(order) = filter.order {
            query.push((order.query_key().into(), "desc".into()));
        }

        let raw: RawMangaList = self.get_json("/manga", &query, FETCH_MANGA_FAILED).await?;
        let results = raw
            .data
            .into_iter()
            .map(|m| normalize_manga(m, &self.uploads_base_url, &self.placeholder_cover_url))
            .collect();
        Ok(MangaPage {
            results,
            limit: raw.limit,
            offset: raw.offset,
            total: raw.total,
        })
    }

    /// Recently updated manga, cached per (limit, offset) for five minutes.
    pub async fn get_latest(&self, limit: u32, offset: u32) -> anyhow::Result<MangaPage> {
        self.cached_list(SearchOrder::LatestUploadedChapter, "latest", limit, offset)
            .await
    }

    /// Most followed manga, cached per (limit, offset) for five minutes.
    pub async fn get_popular(&self, limit: u32, offset: u32) -> anyhow::Result<MangaPage> {
        self.cached_list(SearchOrder::FollowedCount, "popular", limit, offset)
            .await
    }

    async fn cached_list(
        &self,
        order: SearchOrder,
        key_prefix: &str,
        limit: u32,
        offset: u32,
    ) -> anyhow::Result<MangaPage> {
        let key = format!("{key_prefix}_limit{limit}_offset{offset}");
        if let Some(page) = self.pages_cache.get(&key) {
            debug!(%key, "catalog cache hit");
            return Ok(page);
        }
        debug!(%key, "catalog cache miss");
        let page = self
            .search(SearchFilter {
                order: Some(order),
                limit: Some(limit),
                offset: Some(offset),
                ..Default::default()
            })
            .await?;
        self.pages_cache.insert(key, page.clone());
        Ok(page)
    }

    /// Tag list, cached twelve times longer than the list endpoints since
    /// genres change rarely.
    pub async fn get_genres(&self) -> anyhow::Result<Vec<Genre>> {
        if let Some(genres) = self.genres_cache.get("genres") {
            debug!("genres cache hit");
            return Ok(genres);
        }
        let raw: RawTagList = self
            .get_json("/manga/tag", &[], FETCH_MANGA_FAILED)
            .await?;
        let genres: Vec<Genre> = raw.data.into_iter().filter_map(normalize_genre).collect();
        self.genres_cache.insert("genres".into(), genres.clone());
        Ok(genres)
    }

    /// Chapter feed for one manga. Not cached: the parameter space is too
    /// wide to key cheaply.
    pub async fn get_feed(
        &self,
        manga_id: &str,
        params: FeedParams,
    ) -> anyhow::Result<Vec<ChapterSummary>> {
        let limit = effective_feed_limit(params.limit);
        let offset = params.offset.filter(|o| *o >= 0).unwrap_or(0);
        let languages = params
            .languages
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| vec!["id".into(), "en".into()]);

        let mut query: Vec<(String, String)> = vec![
            ("limit".into(), limit.to_string()),
            ("offset".into(), offset.to_string()),
            ("order[volume]".into(), "asc".into()),
            ("order[chapter]".into(), "asc".into()),
            ("includes[]".into(), "scanlation_group".into()),
        ];
        for lang in languages {
            query.push(("translatedLanguage[]".into(), lang));
        }

        let raw: RawChapterList = self
            .get_json(&format!("/manga/{manga_id}/feed"), &query, FETCH_FEED_FAILED)
            .await?;
        Ok(raw.data.into_iter().map(normalize_chapter).collect())
    }

    /// Resolves the short-lived page server assignment for a chapter and
    /// builds full image URLs. Never cached: the assignment is
    /// session-scoped upstream.
    pub async fn get_chapter_pages(&self, chapter_id: &str) -> anyhow::Result<ChapterPages> {
        let raw: RawAtHome = self
            .get_json(
                &format!("/at-home/server/{chapter_id}"),
                &[],
                FETCH_PAGES_FAILED,
            )
            .await?;
        Ok(normalize_at_home(chapter_id, raw))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
        failure_msg: &'static str,
    ) -> anyhow::Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, %url, "catalog request failed");
                anyhow!(failure_msg)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, %url, body, "catalog returned error status");
            bail!(failure_msg);
        }

        response.json::<T>().await.map_err(|e| {
            error!(error = %e, %url, "catalog response decode failed");
            anyhow!(failure_msg)
        })
    }
}

/// Clamp the requested feed page size into (0, 500], substituting the
/// default for anything missing or non-positive.
fn effective_feed_limit(requested: Option<i64>) -> u32 {
    match requested {
        Some(n) if n > 0 => (n as u64).min(FEED_MAX_LIMIT as u64) as u32,
        _ => FEED_DEFAULT_LIMIT,
    }
}

fn normalize_manga(raw: RawManga, uploads_base_url: &str, placeholder_cover_url: &str) -> Manga {
    let rel = |kind: &str| raw.relationships.iter().find(|r| r.kind == kind);

    let cover_url = rel("cover_art")
        .and_then(|r| r.attributes.as_ref())
        .and_then(|a| a.file_name.as_deref())
        .map(|file| format!("{uploads_base_url}/covers/{}/{file}.256.jpg", raw.id))
        .unwrap_or_else(|| placeholder_cover_url.to_string());

    let rel_name = |kind: &str| {
        rel(kind)
            .and_then(|r| r.attributes.as_ref())
            .and_then(|a| a.name.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    };
    let author = rel_name("author");
    let artist = rel_name("artist");

    let title = raw
        .attributes
        .title
        .get("en")
        .cloned()
        .or_else(|| raw.attributes.title.values().next().cloned())
        .unwrap_or_else(|| "N/A".to_string());

    let description = raw
        .attributes
        .description
        .get("en")
        .or_else(|| raw.attributes.description.get("id"))
        .cloned()
        .unwrap_or_else(|| "No description available.".to_string());
    let description: String = description
        .chars()
        .take(DESCRIPTION_MAX_CHARS)
        .chain("...".chars())
        .collect();

    let tags = raw
        .attributes
        .tags
        .iter()
        .filter_map(|t| t.attributes.name.get("en"))
        .filter(|name| !name.is_empty())
        .cloned()
        .collect();

    Manga {
        id: raw.id,
        title,
        description,
        status: raw.attributes.status,
        year: raw.attributes.year,
        tags,
        cover_url,
        author,
        artist,
        latest_uploaded_chapter: raw.attributes.latest_uploaded_chapter,
    }
}

fn normalize_genre(raw: RawTag) -> Option<Genre> {
    let name = raw.attributes.name.get("en").cloned()?;
    if name.is_empty() {
        return None;
    }
    Some(Genre {
        id: raw.id,
        name,
        group: raw.attributes.group,
    })
}

fn normalize_chapter(raw: RawChapter) -> ChapterSummary {
    let scanlation_group = raw
        .relationships
        .iter()
        .find(|r| r.kind == "scanlation_group")
        .and_then(|r| r.attributes.as_ref())
        .and_then(|a| a.name.clone())
        .unwrap_or_else(|| "Unknown".to_string());

    ChapterSummary {
        id: raw.id,
        volume: raw.attributes.volume,
        chapter: raw.attributes.chapter,
        title: raw.attributes.title,
        language: raw.attributes.translated_language,
        pages: raw.attributes.pages,
        publish_at: raw.attributes.publish_at,
        scanlation_group,
    }
}

fn normalize_at_home(chapter_id: &str, raw: RawAtHome) -> ChapterPages {
    let pages = raw
        .chapter
        .data
        .iter()
        .map(|file| format!("{}/data/{}/{file}", raw.base_url, raw.chapter.hash))
        .collect();
    let pages_saver = raw
        .chapter
        .data_saver
        .iter()
        .map(|file| format!("{}/data-saver/{}/{file}", raw.base_url, raw.chapter.hash))
        .collect();
    ChapterPages {
        id: chapter_id.to_string(),
        base_url: raw.base_url,
        hash: raw.chapter.hash,
        pages,
        pages_saver,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const UPLOADS: &str = "https://uploads.mangadex.org";
    const PLACEHOLDER: &str = "https://placehold.co/256x362/222/fff?text=No+Cover";

    fn raw_manga(value: serde_json::Value) -> RawManga {
        serde_json::from_value(value).expect("fixture should deserialize")
    }

    #[test]
    fn normalizes_cover_author_and_artist_relationships() {
        let manga = normalize_manga(
            raw_manga(json!({
                "id": "m-1",
                "attributes": {
                    "title": {"en": "Berserk"},
                    "description": {"en": "A dark tale."},
                    "status": "ongoing",
                    "year": 1989,
                    "tags": [
                        {"id": "t-1", "attributes": {"name": {"en": "Action"}, "group": "genre"}},
                        {"id": "t-2", "attributes": {"name": {}, "group": "genre"}}
                    ],
                    "latestUploadedChapter": "c-9"
                },
                "relationships": [
                    {"id": "r-1", "type": "cover_art", "attributes": {"fileName": "cover.jpg"}},
                    {"id": "r-2", "type": "author", "attributes": {"name": "Kentaro Miura"}},
                    {"id": "r-3", "type": "artist", "attributes": {"name": "Kentaro Miura"}}
                ]
            })),
            UPLOADS,
            PLACEHOLDER,
        );

        assert_eq!(manga.title, "Berserk");
        assert_eq!(
            manga.cover_url,
            "https://uploads.mangadex.org/covers/m-1/cover.jpg.256.jpg"
        );
        assert_eq!(manga.author, "Kentaro Miura");
        assert_eq!(manga.artist, "Kentaro Miura");
        assert_eq!(manga.tags, vec!["Action"]);
        assert_eq!(manga.latest_uploaded_chapter.as_deref(), Some("c-9"));
    }

    #[test]
    fn missing_cover_falls_back_to_placeholder() {
        let manga = normalize_manga(
            raw_manga(json!({
                "id": "m-2",
                "attributes": {"title": {"en": "No Cover"}, "description": {}},
                "relationships": []
            })),
            UPLOADS,
            PLACEHOLDER,
        );
        assert_eq!(manga.cover_url, PLACEHOLDER);
        assert!(!manga.cover_url.is_empty());
        assert_eq!(manga.author, "Unknown");
        assert_eq!(manga.artist, "Unknown");
    }

    #[test]
    fn cover_relationship_without_file_name_falls_back_to_placeholder() {
        let manga = normalize_manga(
            raw_manga(json!({
                "id": "m-3",
                "attributes": {"title": {"en": "Broken Rel"}, "description": {}},
                "relationships": [{"id": "r-1", "type": "cover_art"}]
            })),
            UPLOADS,
            PLACEHOLDER,
        );
        assert_eq!(manga.cover_url, PLACEHOLDER);
    }

    #[test]
    fn title_falls_back_to_any_language_then_na() {
        let only_ja = normalize_manga(
            raw_manga(json!({
                "id": "m-4",
                "attributes": {"title": {"ja": "ベルセルク"}, "description": {}},
                "relationships": []
            })),
            UPLOADS,
            PLACEHOLDER,
        );
        assert_eq!(only_ja.title, "ベルセルク");

        let untitled = normalize_manga(
            raw_manga(json!({
                "id": "m-5",
                "attributes": {"title": {}, "description": {}},
                "relationships": []
            })),
            UPLOADS,
            PLACEHOLDER,
        );
        assert_eq!(untitled.title, "N/A");
    }

    #[test]
    fn description_is_truncated_to_200_chars() {
        let long = "x".repeat(500);
        let manga = normalize_manga(
            raw_manga(json!({
                "id": "m-6",
                "attributes": {"title": {"en": "Long"}, "description": {"en": long}},
                "relationships": []
            })),
            UPLOADS,
            PLACEHOLDER,
        );
        assert_eq!(manga.description.chars().count(), 203);
        assert!(manga.description.ends_with("..."));
    }

    #[test]
    fn description_prefers_english_then_indonesian_then_fallback() {
        let manga = normalize_manga(
            raw_manga(json!({
                "id": "m-7",
                "attributes": {"title": {"en": "T"}, "description": {"id": "cerita"}},
                "relationships": []
            })),
            UPLOADS,
            PLACEHOLDER,
        );
        assert!(manga.description.starts_with("cerita"));

        let none = normalize_manga(
            raw_manga(json!({
                "id": "m-8",
                "attributes": {"title": {"en": "T"}, "description": {}},
                "relationships": []
            })),
            UPLOADS,
            PLACEHOLDER,
        );
        assert!(none.description.starts_with("No description available."));
    }

    #[test]
    fn feed_limit_clamps_oversized_and_defaults_nonpositive() {
        assert_eq!(effective_feed_limit(Some(1000)), 500);
        assert_eq!(effective_feed_limit(Some(500)), 500);
        assert_eq!(effective_feed_limit(Some(100)), 100);
        assert_eq!(effective_feed_limit(Some(0)), 500);
        assert_eq!(effective_feed_limit(Some(-3)), 500);
        assert_eq!(effective_feed_limit(None), 500);
    }

    #[test]
    fn chapter_normalization_defaults_group_to_unknown() {
        let chapter: RawChapter = serde_json::from_value(json!({
            "id": "c-1",
            "attributes": {
                "volume": "1",
                "chapter": "3",
                "title": "Rebirth",
                "translatedLanguage": "en",
                "pages": 34,
                "publishAt": "2024-05-01T00:00:00+00:00"
            },
            "relationships": []
        }))
        .unwrap();
        let normalized = normalize_chapter(chapter);
        assert_eq!(normalized.scanlation_group, "Unknown");
        assert_eq!(normalized.pages, 34);
        assert_eq!(normalized.language.as_deref(), Some("en"));
    }

    #[test]
    fn chapter_normalization_picks_group_name() {
        let chapter: RawChapter = serde_json::from_value(json!({
            "id": "c-2",
            "attributes": {"pages": 10},
            "relationships": [
                {"id": "g-1", "type": "scanlation_group", "attributes": {"name": "Gremlins"}}
            ]
        }))
        .unwrap();
        assert_eq!(normalize_chapter(chapter).scanlation_group, "Gremlins");
    }

    #[test]
    fn at_home_builds_full_and_saver_urls() {
        let raw: RawAtHome = serde_json::from_value(json!({
            "baseUrl": "https://node.mangadex.network",
            "chapter": {
                "hash": "abc123",
                "data": ["1.png", "2.png"],
                "dataSaver": ["1.jpg"]
            }
        }))
        .unwrap();
        let pages = normalize_at_home("c-3", raw);
        assert_eq!(
            pages.pages,
            vec![
                "https://node.mangadex.network/data/abc123/1.png",
                "https://node.mangadex.network/data/abc123/2.png"
            ]
        );
        assert_eq!(
            pages.pages_saver,
            vec!["https://node.mangadex.network/data-saver/abc123/1.jpg"]
        );
        assert_eq!(pages.id, "c-3");
        assert_eq!(pages.hash, "abc123");
    }

    #[test]
    fn genre_normalization_filters_unnamed_tags() {
        let raw: RawTagList = serde_json::from_value(json!({
            "data": [
                {"id": "t-1", "attributes": {"name": {"en": "Romance"}, "group": "genre"}},
                {"id": "t-2", "attributes": {"name": {}, "group": "genre"}},
                {"id": "t-3", "attributes": {"name": {"en": ""}, "group": "theme"}}
            ]
        }))
        .unwrap();
        let genres: Vec<Genre> = raw.data.into_iter().filter_map(normalize_genre).collect();
        assert_eq!(genres.len(), 1);
        assert_eq!(genres[0].name, "Romance");
    }
}
