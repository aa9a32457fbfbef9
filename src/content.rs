//! Content Store rules: tag encoding, input validation and partial-update patches.
//!
//! Nothing in here touches the database. The repository receives already-validated
//! values (`NewArticle`, `NewVideo`, `ArticlePatch`) and persists them.

use crate::{
    error::AppError,
    models::{Article, CreateArticleRequest, CreateVideoRequest, UpdateArticleRequest},
};

const TAG_SEPARATOR: char = ',';

// Column widths of `migrations/20250101000000_init.sql`, counted in characters the
// way Postgres counts VARCHAR(n).
pub const TITLE_MAX_CHARS: usize = 200;
pub const CATEGORY_MAX_CHARS: usize = 50;
pub const MEDIA_KEY_MAX_CHARS: usize = 200;

/// join_tags
///
/// Encodes an ordered tag list into its stored text form. An empty list encodes to
/// the empty string.
pub fn join_tags(tags: &[String]) -> String {
    tags.join(",")
}

/// split_tags
///
/// Decodes the stored text form. The empty string decodes to an empty list, never
/// to `[""]`, so `split_tags(&join_tags(tags)) == tags` for every comma-free tag list.
pub fn split_tags(stored: &str) -> Vec<String> {
    if stored.is_empty() {
        return Vec::new();
    }
    stored.split(TAG_SEPARATOR).map(str::to_string).collect()
}

/// Rejects tag lists that would not survive the join/split round trip.
fn validate_tags(tags: &[String]) -> Result<(), AppError> {
    if let Some(bad) = tags.iter().find(|tag| tag.contains(TAG_SEPARATOR)) {
        return Err(AppError::validation(format!(
            "tag '{}' must not contain a comma",
            bad
        )));
    }
    // A single empty tag would encode to "" and decode back to no tags at all.
    if tags.len() == 1 && tags[0].is_empty() {
        return Err(AppError::validation("tags must not be empty strings"));
    }
    Ok(())
}

fn require_text(field: &'static str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{} is required", field)));
    }
    Ok(())
}

/// Rejects values the column cannot hold, so they fail as 400 instead of in the INSERT.
fn limit_chars(field: &'static str, value: &str, max: usize) -> Result<(), AppError> {
    if value.chars().count() > max {
        return Err(AppError::validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

fn limit_optional(field: &'static str, value: Option<&str>, max: usize) -> Result<(), AppError> {
    value.map_or(Ok(()), |v| limit_chars(field, v, max))
}

/// NewArticle
///
/// A validated article, ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub is_published: bool,
}

impl TryFrom<CreateArticleRequest> for NewArticle {
    type Error = AppError;

    fn try_from(req: CreateArticleRequest) -> Result<Self, Self::Error> {
        require_text("title", &req.title)?;
        limit_chars("title", &req.title, TITLE_MAX_CHARS)?;
        require_text("content", &req.content)?;
        limit_optional("category", req.category.as_deref(), CATEGORY_MAX_CHARS)?;
        validate_tags(&req.tags)?;

        Ok(NewArticle {
            title: req.title,
            content: req.content,
            category: req.category,
            tags: req.tags,
            is_published: req.is_published,
        })
    }
}

/// NewVideo
///
/// A validated video, ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVideo {
    pub title: String,
    pub description: Option<String>,
    pub filename: String,
    pub thumbnail: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub is_published: bool,
}

impl TryFrom<CreateVideoRequest> for NewVideo {
    type Error = AppError;

    fn try_from(req: CreateVideoRequest) -> Result<Self, Self::Error> {
        require_text("title", &req.title)?;
        limit_chars("title", &req.title, TITLE_MAX_CHARS)?;
        require_text("filename", &req.filename)?;
        limit_chars("filename", &req.filename, MEDIA_KEY_MAX_CHARS)?;
        limit_optional("thumbnail", req.thumbnail.as_deref(), MEDIA_KEY_MAX_CHARS)?;
        limit_optional("category", req.category.as_deref(), CATEGORY_MAX_CHARS)?;
        validate_tags(&req.tags)?;

        Ok(NewVideo {
            title: req.title,
            description: req.description,
            filename: req.filename,
            thumbnail: req.thumbnail,
            category: req.category,
            tags: req.tags,
            is_published: req.is_published,
        })
    }
}

/// ArticlePatch
///
/// A validated partial update. `None` means "leave unchanged"; for `category`,
/// `Some(None)` clears the value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArticlePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub is_published: Option<bool>,
}

impl ArticlePatch {
    /// True when the patch carries no fields, in which case no write happens.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.category.is_none()
            && self.tags.is_none()
            && self.is_published.is_none()
    }

    /// apply
    ///
    /// Produces the next snapshot of `article`. Only present fields are replaced;
    /// `id` and the timestamps are left to the repository.
    pub fn apply(&self, article: Article) -> Article {
        Article {
            title: self.title.clone().unwrap_or(article.title),
            content: self.content.clone().unwrap_or(article.content),
            category: self.category.clone().unwrap_or(article.category),
            tags: self.tags.clone().unwrap_or(article.tags),
            is_published: self.is_published.unwrap_or(article.is_published),
            ..article
        }
    }
}

impl TryFrom<UpdateArticleRequest> for ArticlePatch {
    type Error = AppError;

    fn try_from(req: UpdateArticleRequest) -> Result<Self, Self::Error> {
        // A present title/content still has to satisfy the non-empty invariant.
        if let Some(title) = &req.title {
            require_text("title", title)?;
            limit_chars("title", title, TITLE_MAX_CHARS)?;
        }
        if let Some(content) = &req.content {
            require_text("content", content)?;
        }
        if let Some(category) = &req.category {
            limit_optional("category", category.as_deref(), CATEGORY_MAX_CHARS)?;
        }
        if let Some(tags) = &req.tags {
            validate_tags(tags)?;
        }

        Ok(ArticlePatch {
            title: req.title,
            content: req.content,
            category: req.category,
            tags: req.tags,
            is_published: req.is_published,
        })
    }
}
