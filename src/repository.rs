use crate::{
    content::{ArticlePatch, NewArticle, NewVideo, join_tags, split_tags},
    models::{Article, ContentKind, User, UserProgress, Video},
    policy::Visibility,
    progress::{ARTICLE_VIEW_PROGRESS, is_completed},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// The persistence contract for the Content Store and the Progress Tracker. Every
/// method returns immutable snapshots; nothing hands out a live, mutable row.
///
/// The caller's identity is always an explicit argument. Visibility is decided by the
/// access policy and passed in, so implementations only filter.
///
/// **Send + Sync + async_trait** make `Arc<dyn Repository>` shareable across Axum tasks.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Identity ---
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, sqlx::Error>;

    // --- Articles ---
    // Newest first.
    async fn list_articles(&self, visibility: Visibility) -> Result<Vec<Article>, sqlx::Error>;
    async fn get_article(
        &self,
        id: i64,
        visibility: Visibility,
    ) -> Result<Option<Article>, sqlx::Error>;
    async fn create_article(&self, article: NewArticle) -> Result<Article, sqlx::Error>;
    // `None` when the article does not exist. An empty patch returns the current snapshot.
    async fn update_article(
        &self,
        id: i64,
        patch: ArticlePatch,
    ) -> Result<Option<Article>, sqlx::Error>;

    // --- Videos ---
    async fn list_videos(&self, visibility: Visibility) -> Result<Vec<Video>, sqlx::Error>;
    async fn get_video(&self, id: i64, visibility: Visibility)
    -> Result<Option<Video>, sqlx::Error>;
    async fn create_video(&self, video: NewVideo) -> Result<Video, sqlx::Error>;

    /// Returns true if a row was removed.
    async fn delete_content(&self, kind: ContentKind, id: i64) -> Result<bool, sqlx::Error>;

    // --- Progress ---
    /// First-view upsert for articles. `None` if the article does not exist.
    async fn record_article_view(
        &self,
        user_id: Uuid,
        article_id: i64,
    ) -> Result<Option<UserProgress>, sqlx::Error>;
    /// Overwriting upsert for videos. `None` if the video is absent or unpublished.
    async fn record_video_progress(
        &self,
        user_id: Uuid,
        video_id: i64,
        progress: f64,
    ) -> Result<Option<UserProgress>, sqlx::Error>;
    async fn get_user_progress(&self, user_id: Uuid) -> Result<Vec<UserProgress>, sqlx::Error>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- Storage Rows ---
// These mirror the table layout. Tags are still comma-joined text at this level.

#[derive(FromRow)]
struct ArticleRecord {
    id: i64,
    title: String,
    content: String,
    category: Option<String>,
    tags: String,
    is_published: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ArticleRecord> for Article {
    fn from(row: ArticleRecord) -> Self {
        Article {
            id: row.id,
            title: row.title,
            content: row.content,
            category: row.category,
            tags: split_tags(&row.tags),
            is_published: row.is_published,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct VideoRecord {
    id: i64,
    title: String,
    description: Option<String>,
    filename: String,
    thumbnail: Option<String>,
    category: Option<String>,
    tags: String,
    is_published: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<VideoRecord> for Video {
    fn from(row: VideoRecord) -> Self {
        Video {
            id: row.id,
            title: row.title,
            description: row.description,
            filename: row.filename,
            thumbnail: row.thumbnail,
            category: row.category,
            tags: split_tags(&row.tags),
            is_published: row.is_published,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct ProgressRecord {
    id: i64,
    user_id: Uuid,
    content_type: String,
    content_id: i64,
    progress: f64,
    completed: bool,
    last_accessed: DateTime<Utc>,
}

impl TryFrom<ProgressRecord> for UserProgress {
    type Error = sqlx::Error;

    fn try_from(row: ProgressRecord) -> Result<Self, Self::Error> {
        let content_type = ContentKind::try_from(row.content_type.as_str())
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(UserProgress {
            id: row.id,
            user_id: row.user_id,
            content_type,
            content_id: row.content_id,
            progress: row.progress,
            completed: row.completed,
            last_accessed: row.last_accessed,
        })
    }
}

const ARTICLE_COLUMNS: &str =
    "id, title, content, category, tags, is_published, created_at, updated_at";

const VIDEO_COLUMNS: &str = "id, title, description, filename, thumbnail, category, tags, \
     is_published, created_at, updated_at";

const PROGRESS_COLUMNS: &str =
    "id, user_id, content_type, content_id, progress, completed, last_accessed";

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
///
/// Every mutating method opens a transaction and only commits after its last
/// statement succeeds. Any `?` before `commit` drops the transaction, which rolls
/// the work back.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn fetch_article_for_update(
        tx: &mut Transaction<'_, Postgres>,
        id: i64,
    ) -> Result<Option<Article>, sqlx::Error> {
        let row = sqlx::query_as::<_, ArticleRecord>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row.map(Article::from))
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT id, username, email, is_admin FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// list_articles
    ///
    /// `$1` switches off the publication filter for admin listings. Ties on
    /// `created_at` fall back to the id so the order is stable.
    async fn list_articles(&self, visibility: Visibility) -> Result<Vec<Article>, sqlx::Error> {
        let rows = sqlx::query_as::<_, ArticleRecord>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles \
             WHERE ($1 OR is_published = true) \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(visibility.includes_unpublished())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Article::from).collect())
    }

    /// get_article
    ///
    /// A hidden article yields `None` exactly like a missing one.
    async fn get_article(
        &self,
        id: i64,
        visibility: Visibility,
    ) -> Result<Option<Article>, sqlx::Error> {
        let row = sqlx::query_as::<_, ArticleRecord>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1 AND ($2 OR is_published = true)"
        ))
        .bind(id)
        .bind(visibility.includes_unpublished())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Article::from))
    }

    async fn create_article(&self, article: NewArticle) -> Result<Article, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ArticleRecord>(&format!(
            "INSERT INTO articles (title, content, category, tags, is_published, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, NOW(), NOW()) \
             RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(&article.title)
        .bind(&article.content)
        .bind(&article.category)
        .bind(join_tags(&article.tags))
        .bind(article.is_published)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// update_article
    ///
    /// Locks the row, applies the patch to the current snapshot in Rust and writes the
    /// whole result back. This is what lets an explicit `null` category or `[]` tags
    /// overwrite, which a `COALESCE` update cannot express.
    async fn update_article(
        &self,
        id: i64,
        patch: ArticlePatch,
    ) -> Result<Option<Article>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let Some(current) = Self::fetch_article_for_update(&mut tx, id).await? else {
            return Ok(None);
        };

        if patch.is_empty() {
            tx.commit().await?;
            return Ok(Some(current));
        }

        let next = patch.apply(current);
        let row = sqlx::query_as::<_, ArticleRecord>(&format!(
            "UPDATE articles \
             SET title = $2, content = $3, category = $4, tags = $5, is_published = $6, \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(id)
        .bind(&next.title)
        .bind(&next.content)
        .bind(&next.category)
        .bind(join_tags(&next.tags))
        .bind(next.is_published)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(row.into()))
    }

    async fn list_videos(&self, visibility: Visibility) -> Result<Vec<Video>, sqlx::Error> {
        let rows = sqlx::query_as::<_, VideoRecord>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos \
             WHERE ($1 OR is_published = true) \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(visibility.includes_unpublished())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Video::from).collect())
    }

    async fn get_video(
        &self,
        id: i64,
        visibility: Visibility,
    ) -> Result<Option<Video>, sqlx::Error> {
        let row = sqlx::query_as::<_, VideoRecord>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE id = $1 AND ($2 OR is_published = true)"
        ))
        .bind(id)
        .bind(visibility.includes_unpublished())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Video::from))
    }

    async fn create_video(&self, video: NewVideo) -> Result<Video, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, VideoRecord>(&format!(
            "INSERT INTO videos (title, description, filename, thumbnail, category, tags, is_published, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW()) \
             RETURNING {VIDEO_COLUMNS}"
        ))
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.filename)
        .bind(&video.thumbnail)
        .bind(&video.category)
        .bind(join_tags(&video.tags))
        .bind(video.is_published)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn delete_content(&self, kind: ContentKind, id: i64) -> Result<bool, sqlx::Error> {
        let statement = match kind {
            ContentKind::Article => "DELETE FROM articles WHERE id = $1",
            ContentKind::Video => "DELETE FROM videos WHERE id = $1",
        };

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(statement).bind(id).execute(&mut *tx).await?;
        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    /// record_article_view
    ///
    /// The first view inserts a completed row. Later views hit the unique constraint
    /// and only touch `last_accessed`; progress and completion never change.
    async fn record_article_view(
        &self,
        user_id: Uuid,
        article_id: i64,
    ) -> Result<Option<UserProgress>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM articles WHERE id = $1)")
                .bind(article_id)
                .fetch_one(&mut *tx)
                .await?;
        if !exists {
            return Ok(None);
        }

        let row = sqlx::query_as::<_, ProgressRecord>(&format!(
            "INSERT INTO user_progress (user_id, content_type, content_id, progress, completed, last_accessed) \
             VALUES ($1, $2, $3, $4, $5, NOW()) \
             ON CONFLICT (user_id, content_type, content_id) \
             DO UPDATE SET last_accessed = NOW() \
             RETURNING {PROGRESS_COLUMNS}"
        ))
        .bind(user_id)
        .bind(ContentKind::Article.as_str())
        .bind(article_id)
        .bind(ARTICLE_VIEW_PROGRESS)
        .bind(is_completed(ARTICLE_VIEW_PROGRESS))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(UserProgress::try_from(row)?))
    }

    /// record_video_progress
    ///
    /// The publication check and the upsert share one transaction. The unique
    /// constraint on (user_id, content_type, content_id) turns concurrent first
    /// reports into a single row.
    async fn record_video_progress(
        &self,
        user_id: Uuid,
        video_id: i64,
        progress: f64,
    ) -> Result<Option<UserProgress>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let published: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM videos WHERE id = $1 AND is_published = true)",
        )
        .bind(video_id)
        .fetch_one(&mut *tx)
        .await?;
        if !published {
            return Ok(None);
        }

        let row = sqlx::query_as::<_, ProgressRecord>(&format!(
            "INSERT INTO user_progress (user_id, content_type, content_id, progress, completed, last_accessed) \
             VALUES ($1, $2, $3, $4, $5, NOW()) \
             ON CONFLICT (user_id, content_type, content_id) \
             DO UPDATE SET progress = EXCLUDED.progress, \
                           completed = EXCLUDED.completed, \
                           last_accessed = NOW() \
             RETURNING {PROGRESS_COLUMNS}"
        ))
        .bind(user_id)
        .bind(ContentKind::Video.as_str())
        .bind(video_id)
        .bind(progress)
        .bind(is_completed(progress))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(UserProgress::try_from(row)?))
    }

    async fn get_user_progress(&self, user_id: Uuid) -> Result<Vec<UserProgress>, sqlx::Error> {
        let rows = sqlx::query_as::<_, ProgressRecord>(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM user_progress WHERE user_id = $1 ORDER BY last_accessed DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(UserProgress::try_from).collect()
    }
}
