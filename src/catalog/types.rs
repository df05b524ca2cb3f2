use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// --- raw upstream shapes (subset we consume) ---

#[derive(Debug, Deserialize)]
pub struct RawMangaList {
    pub data: Vec<RawManga>,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Deserialize)]
pub struct RawManga {
    pub id: String,
    pub attributes: RawMangaAttributes,
    #[serde(default)]
    pub relationships: Vec<RawRelationship>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMangaAttributes {
    #[serde(default)]
    pub title: HashMap<String, String>,
    #[serde(default)]
    pub description: HashMap<String, String>,
    pub status: Option<String>,
    pub year: Option<i32>,
    #[serde(default)]
    pub tags: Vec<RawTag>,
    pub latest_uploaded_chapter: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawTag {
    pub id: String,
    pub attributes: RawTagAttributes,
}

#[derive(Debug, Deserialize)]
pub struct RawTagAttributes {
    #[serde(default)]
    pub name: HashMap<String, String>,
    #[serde(default)]
    pub group: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawTagList {
    pub data: Vec<RawTag>,
}

/// Relationship objects are a union over every related entity type; only
/// the fields we read are modeled.
#[derive(Debug, Deserialize)]
pub struct RawRelationship {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Option<RawRelationshipAttributes>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRelationshipAttributes {
    pub file_name: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawChapterList {
    pub data: Vec<RawChapter>,
}

#[derive(Debug, Deserialize)]
pub struct RawChapter {
    pub id: String,
    pub attributes: RawChapterAttributes,
    #[serde(default)]
    pub relationships: Vec<RawRelationship>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChapterAttributes {
    pub volume: Option<String>,
    pub chapter: Option<String>,
    pub title: Option<String>,
    pub translated_language: Option<String>,
    #[serde(default)]
    pub pages: u32,
    pub publish_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAtHome {
    pub base_url: String,
    pub chapter: RawAtHomeChapter,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAtHomeChapter {
    pub hash: String,
    #[serde(default)]
    pub data: Vec<String>,
    #[serde(default)]
    pub data_saver: Vec<String>,
}

// --- normalized shapes served to clients ---

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manga {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: Option<String>,
    pub year: Option<i32>,
    pub tags: Vec<String>,
    pub cover_url: String,
    pub author: String,
    pub artist: String,
    pub latest_uploaded_chapter: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MangaPage {
    pub results: Vec<Manga>,
    pub limit: u32,
    pub offset: u32,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Genre {
    pub id: String,
    pub name: String,
    pub group: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterSummary {
    pub id: String,
    pub volume: Option<String>,
    pub chapter: Option<String>,
    pub title: Option<String>,
    pub language: Option<String>,
    pub pages: u32,
    pub publish_at: Option<String>,
    pub scanlation_group: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterPages {
    pub id: String,
    pub base_url: String,
    pub hash: String,
    pub pages: Vec<String>,
    pub pages_saver: Vec<String>,
}
