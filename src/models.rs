use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use std::fmt;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas ---

/// ContentKind
///
/// Discriminates the two kinds of publishable content. Stored as the lowercase
/// `content_type` column of `user_progress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ContentKind {
    Article,
    Video,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Article => "article",
            ContentKind::Video => "video",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a stored `content_type` value is neither `article` nor `video`.
#[derive(Debug, thiserror::Error)]
#[error("unknown content type: {0}")]
pub struct UnknownContentKind(pub String);

impl TryFrom<&str> for ContentKind {
    type Error = UnknownContentKind;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "article" => Ok(ContentKind::Article),
            "video" => Ok(ContentKind::Video),
            other => Err(UnknownContentKind(other.to_string())),
        }
    }
}

/// User
///
/// The caller's identity record from the `users` table. Rows are provisioned by the
/// external identity service; the portal only reads them to resolve `is_admin`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    // Static admin flag. There is no role hierarchy.
    pub is_admin: bool,
}

/// Article
///
/// Immutable snapshot of a row from the `articles` table. Tags are an ordered list
/// here; the comma-joined form only exists at the storage boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub is_published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Video
///
/// Immutable snapshot of a row from the `videos` table. `filename` is the object key
/// of the uploaded media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Video {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub filename: String,
    pub thumbnail: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub is_published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// UserProgress
///
/// One row per (user_id, content_type, content_id). `completed` is derived from
/// `progress` when the row is written and never set independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserProgress {
    pub id: i64,
    pub user_id: Uuid,
    pub content_type: ContentKind,
    pub content_id: i64,
    pub progress: f64,
    pub completed: bool,
    #[ts(type = "string")]
    pub last_accessed: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// CreateArticleRequest
///
/// Input payload for `POST /admin/articles`. Missing text fields deserialize to an
/// empty string so that validation, not the JSON extractor, reports them.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateArticleRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_published: bool,
}

/// CreateVideoRequest
///
/// Input payload for `POST /admin/videos`. `filename` is normally the `resource_key`
/// returned by the upload endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateVideoRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_published: bool,
}

/// UpdateArticleRequest
///
/// Partial update payload for `PUT /admin/articles/{id}`.
///
/// Every field is optional and a field is applied whenever it is *present*, even when
/// its value is falsy (`false`, `[]`). `category` is doubly optional so that an explicit
/// `null` clears it while an absent key leaves it untouched.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateArticleRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    #[ts(type = "string | null")]
    pub category: Option<Option<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
}

/// Marks a key as present. Combined with `#[serde(default)]`, an absent key stays
/// `None` and an explicit `null` becomes `Some(None)`.
fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// ProgressRequest
///
/// Body of `POST /videos/{id}/progress`. A missing `progress` key counts as 0.0.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ProgressRequest {
    #[serde(default)]
    #[schema(example = 0.5)]
    pub progress: f64,
}

/// VideoUploadRequest
///
/// Input payload for requesting a short-lived upload URL for a video file
/// (`POST /admin/videos/upload`).
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct VideoUploadRequest {
    /// The original filename, used to derive the file extension.
    #[schema(example = "lesson_01.mp4")]
    pub filename: String,
    /// The MIME type the upload is constrained to.
    #[schema(example = "video/mp4")]
    pub file_type: String,
}

/// VideoUploadResponse
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct VideoUploadResponse {
    /// The time-limited URL for the PUT request.
    pub upload_url: String,
    /// The object key to send back as the video's `filename`.
    pub resource_key: String,
}

/// ErrorBody
///
/// Shape of every error response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct ErrorBody {
    pub error: String,
}

// --- Response Envelopes ---
// Every success body is an object keyed by what it carries, so clients read
// `data.articles`, `data.article`, `data.progress` and so on.

/// ArticleListResponse
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct ArticleListResponse {
    pub articles: Vec<Article>,
}

/// ArticleResponse
///
/// Single article. Writes add a short confirmation `message`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct ArticleResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub article: Article,
}

/// VideoListResponse
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct VideoListResponse {
    pub videos: Vec<Video>,
}

/// VideoResponse
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct VideoResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub video: Video,
}

/// ProgressListResponse
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct ProgressListResponse {
    pub progress: Vec<UserProgress>,
}

/// ProgressResponse
///
/// Result of `POST /videos/{id}/progress`: the upserted row.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct ProgressResponse {
    pub message: String,
    pub progress: UserProgress,
}

/// UserResponse
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct UserResponse {
    pub user: User,
}

impl ArticleResponse {
    pub fn new(article: Article) -> Self {
        Self {
            message: None,
            article,
        }
    }

    pub fn with_message(message: &str, article: Article) -> Self {
        Self {
            message: Some(message.to_string()),
            article,
        }
    }
}

impl VideoResponse {
    pub fn new(video: Video) -> Self {
        Self {
            message: None,
            video,
        }
    }

    pub fn with_message(message: &str, video: Video) -> Self {
        Self {
            message: Some(message.to_string()),
            video,
        }
    }
}
