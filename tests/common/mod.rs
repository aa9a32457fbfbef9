#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex},
};
use study_portal::{
    AppConfig, AppState, MockStorageService,
    auth::AuthUser,
    content::{ArticlePatch, NewArticle, NewVideo},
    models::{Article, ContentKind, User, UserProgress, Video},
    policy::Visibility,
    progress::{ARTICLE_VIEW_PROGRESS, is_completed},
    repository::Repository,
};
use uuid::Uuid;

pub const READER_ID: Uuid = Uuid::from_u128(0x1001);
pub const ADMIN_ID: Uuid = Uuid::from_u128(0x2002);

// --- IN-MEMORY REPOSITORY ---

#[derive(Default)]
struct Store {
    users: HashMap<Uuid, User>,
    articles: BTreeMap<i64, Article>,
    videos: BTreeMap<i64, Video>,
    progress: Vec<UserProgress>,
    next_id: i64,
    ticks: i64,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    // Strictly increasing timestamps so "newest first" is deterministic.
    fn now(&mut self) -> DateTime<Utc> {
        self.ticks += 1;
        DateTime::from_timestamp(1_700_000_000 + self.ticks, 0).unwrap()
    }
}

/// Behaves like `PostgresRepository`, including the one-row-per-pair progress rule.
/// With `fail_writes` set, every mutating call fails before touching state, the way a
/// rolled-back transaction leaves nothing behind.
#[derive(Default)]
pub struct InMemoryRepository {
    store: Mutex<Store>,
    pub fail_writes: bool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        let repo = Self::default();
        repo.add_user(READER_ID, "reader", false);
        repo.add_user(ADMIN_ID, "admin", true);
        repo
    }

    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::new()
        }
    }

    pub fn add_user(&self, id: Uuid, username: &str, is_admin: bool) {
        self.store.lock().unwrap().users.insert(
            id,
            User {
                id,
                username: username.to_string(),
                email: format!("{}@example.com", username),
                is_admin,
            },
        );
    }

    pub fn progress_rows(&self) -> Vec<UserProgress> {
        self.store.lock().unwrap().progress.clone()
    }

    fn check_writable(&self) -> Result<(), sqlx::Error> {
        if self.fail_writes {
            Err(sqlx::Error::PoolTimedOut)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        Ok(self.store.lock().unwrap().users.get(&id).cloned())
    }

    async fn list_articles(&self, visibility: Visibility) -> Result<Vec<Article>, sqlx::Error> {
        let store = self.store.lock().unwrap();
        let mut articles: Vec<Article> = store
            .articles
            .values()
            .filter(|a| visibility.admits(a.is_published))
            .cloned()
            .collect();
        articles.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(articles)
    }

    async fn get_article(
        &self,
        id: i64,
        visibility: Visibility,
    ) -> Result<Option<Article>, sqlx::Error> {
        let store = self.store.lock().unwrap();
        Ok(store
            .articles
            .get(&id)
            .filter(|a| visibility.admits(a.is_published))
            .cloned())
    }

    async fn create_article(&self, article: NewArticle) -> Result<Article, sqlx::Error> {
        self.check_writable()?;
        let mut store = self.store.lock().unwrap();
        let id = store.next_id();
        let now = store.now();
        let created = Article {
            id,
            title: article.title,
            content: article.content,
            category: article.category,
            tags: article.tags,
            is_published: article.is_published,
            created_at: now,
            updated_at: now,
        };
        store.articles.insert(id, created.clone());
        Ok(created)
    }

    async fn update_article(
        &self,
        id: i64,
        patch: ArticlePatch,
    ) -> Result<Option<Article>, sqlx::Error> {
        self.check_writable()?;
        let mut store = self.store.lock().unwrap();
        let Some(current) = store.articles.get(&id).cloned() else {
            return Ok(None);
        };
        if patch.is_empty() {
            return Ok(Some(current));
        }
        let mut next = patch.apply(current);
        next.updated_at = store.now();
        store.articles.insert(id, next.clone());
        Ok(Some(next))
    }

    async fn list_videos(&self, visibility: Visibility) -> Result<Vec<Video>, sqlx::Error> {
        let store = self.store.lock().unwrap();
        let mut videos: Vec<Video> = store
            .videos
            .values()
            .filter(|v| visibility.admits(v.is_published))
            .cloned()
            .collect();
        videos.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(videos)
    }

    async fn get_video(
        &self,
        id: i64,
        visibility: Visibility,
    ) -> Result<Option<Video>, sqlx::Error> {
        let store = self.store.lock().unwrap();
        Ok(store
            .videos
            .get(&id)
            .filter(|v| visibility.admits(v.is_published))
            .cloned())
    }

    async fn create_video(&self, video: NewVideo) -> Result<Video, sqlx::Error> {
        self.check_writable()?;
        let mut store = self.store.lock().unwrap();
        let id = store.next_id();
        let now = store.now();
        let created = Video {
            id,
            title: video.title,
            description: video.description,
            filename: video.filename,
            thumbnail: video.thumbnail,
            category: video.category,
            tags: video.tags,
            is_published: video.is_published,
            created_at: now,
            updated_at: now,
        };
        store.videos.insert(id, created.clone());
        Ok(created)
    }

    async fn delete_content(&self, kind: ContentKind, id: i64) -> Result<bool, sqlx::Error> {
        self.check_writable()?;
        let mut store = self.store.lock().unwrap();
        Ok(match kind {
            ContentKind::Article => store.articles.remove(&id).is_some(),
            ContentKind::Video => store.videos.remove(&id).is_some(),
        })
    }

    async fn record_article_view(
        &self,
        user_id: Uuid,
        article_id: i64,
    ) -> Result<Option<UserProgress>, sqlx::Error> {
        self.check_writable()?;
        let mut store = self.store.lock().unwrap();
        if !store.articles.contains_key(&article_id) {
            return Ok(None);
        }
        let now = store.now();
        if let Some(row) = store.progress.iter_mut().find(|p| {
            p.user_id == user_id
                && p.content_type == ContentKind::Article
                && p.content_id == article_id
        }) {
            row.last_accessed = now;
            return Ok(Some(row.clone()));
        }
        let id = store.next_id();
        let row = UserProgress {
            id,
            user_id,
            content_type: ContentKind::Article,
            content_id: article_id,
            progress: ARTICLE_VIEW_PROGRESS,
            completed: is_completed(ARTICLE_VIEW_PROGRESS),
            last_accessed: now,
        };
        store.progress.push(row.clone());
        Ok(Some(row))
    }

    async fn record_video_progress(
        &self,
        user_id: Uuid,
        video_id: i64,
        progress: f64,
    ) -> Result<Option<UserProgress>, sqlx::Error> {
        self.check_writable()?;
        let mut store = self.store.lock().unwrap();
        let published = store
            .videos
            .get(&video_id)
            .map(|v| v.is_published)
            .unwrap_or(false);
        if !published {
            return Ok(None);
        }
        let now = store.now();
        if let Some(row) = store.progress.iter_mut().find(|p| {
            p.user_id == user_id && p.content_type == ContentKind::Video && p.content_id == video_id
        }) {
            row.progress = progress;
            row.completed = is_completed(progress);
            row.last_accessed = now;
            return Ok(Some(row.clone()));
        }
        let id = store.next_id();
        let row = UserProgress {
            id,
            user_id,
            content_type: ContentKind::Video,
            content_id: video_id,
            progress,
            completed: is_completed(progress),
            last_accessed: now,
        };
        store.progress.push(row.clone());
        Ok(Some(row))
    }

    async fn get_user_progress(&self, user_id: Uuid) -> Result<Vec<UserProgress>, sqlx::Error> {
        let store = self.store.lock().unwrap();
        Ok(store
            .progress
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }
}

// --- TEST UTILITIES ---

pub fn test_state(repo: Arc<InMemoryRepository>) -> AppState {
    AppState {
        repo,
        storage: Arc::new(MockStorageService::new()),
        config: AppConfig::default(),
    }
}

pub fn reader() -> AuthUser {
    AuthUser {
        id: READER_ID,
        is_admin: false,
    }
}

pub fn admin() -> AuthUser {
    AuthUser {
        id: ADMIN_ID,
        is_admin: true,
    }
}

pub fn new_article(title: &str, is_published: bool) -> NewArticle {
    NewArticle {
        title: title.to_string(),
        content: format!("Body of {}", title),
        category: Some("basics".to_string()),
        tags: vec!["intro".to_string(), "rust".to_string()],
        is_published,
    }
}

pub fn new_video(title: &str, is_published: bool) -> NewVideo {
    NewVideo {
        title: title.to_string(),
        description: None,
        filename: format!("videos/{}.mp4", title.to_lowercase().replace(' ', "-")),
        thumbnail: None,
        category: None,
        tags: vec![],
        is_published,
    }
}
