use crate::{
    AppState,
    auth::AuthUser,
    content::{ArticlePatch, NewArticle, NewVideo},
    error::AppError,
    models::{
        ArticleListResponse, ArticleResponse, ContentKind, CreateArticleRequest,
        CreateVideoRequest, ErrorBody, ProgressListResponse, ProgressRequest, ProgressResponse,
        UpdateArticleRequest, UserResponse, VideoListResponse, VideoResponse, VideoUploadRequest,
        VideoUploadResponse,
    },
    policy::{self, Visibility},
    progress,
    storage::video_object_key,
};
use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};

// --- Reader Handlers ---

/// list_articles
///
/// [Authenticated Route] Published articles, newest first. Unpublished articles never
/// appear here, even for admins; they use `GET /admin/articles`.
#[utoipa::path(
    get,
    path = "/articles",
    responses(
        (status = 200, description = "Published articles", body = ArticleListResponse),
        (status = 401, description = "Not authenticated", body = ErrorBody)
    )
)]
pub async fn list_articles(
    _user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ArticleListResponse>, AppError> {
    let articles = state.repo.list_articles(Visibility::PublishedOnly).await?;
    Ok(Json(ArticleListResponse { articles }))
}

/// get_article
///
/// [Authenticated Route] Retrieves one article and records that the caller viewed it.
///
/// *Visibility*: non-admins get 404 for unpublished articles, exactly as for missing ones.
/// *Side effect*: the first view creates a completed progress row for the caller.
#[utoipa::path(
    get,
    path = "/articles/{id}",
    params(("id" = i64, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Found", body = ArticleResponse),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn get_article(
    user: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<ArticleResponse>, AppError> {
    let Path(id) = path?;
    let article = state
        .repo
        .get_article(id, policy::read_visibility(&user))
        .await?
        .ok_or(AppError::NotFound("article"))?;

    if state.repo.record_article_view(user.id, article.id).await?.is_none() {
        // Deleted between the read and the upsert.
        tracing::debug!(article_id = article.id, "article vanished before view was recorded");
    }

    Ok(Json(ArticleResponse::new(article)))
}

/// list_videos
///
/// [Authenticated Route] Published videos, newest first.
#[utoipa::path(
    get,
    path = "/videos",
    responses((status = 200, description = "Published videos", body = VideoListResponse))
)]
pub async fn list_videos(
    _user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<VideoListResponse>, AppError> {
    let videos = state.repo.list_videos(Visibility::PublishedOnly).await?;
    Ok(Json(VideoListResponse { videos }))
}

/// get_video
///
/// [Authenticated Route] Retrieves one video. Reading a video does not touch progress.
#[utoipa::path(
    get,
    path = "/videos/{id}",
    params(("id" = i64, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Found", body = VideoResponse),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn get_video(
    user: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<VideoResponse>, AppError> {
    let Path(id) = path?;
    state
        .repo
        .get_video(id, policy::read_visibility(&user))
        .await?
        .map(|video| Json(VideoResponse::new(video)))
        .ok_or(AppError::NotFound("video"))
}

/// record_video_progress
///
/// [Authenticated Route] Upserts the caller's progress for a published video.
/// `completed` is recomputed from the submitted value on every call.
#[utoipa::path(
    post,
    path = "/videos/{id}/progress",
    params(("id" = i64, Path, description = "Video ID")),
    request_body = ProgressRequest,
    responses(
        (status = 200, description = "Progress recorded", body = ProgressResponse),
        (status = 400, description = "Progress outside [0, 1]", body = ErrorBody),
        (status = 404, description = "Video not found or unpublished", body = ErrorBody)
    )
)]
pub async fn record_video_progress(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<ProgressRequest>, JsonRejection>,
) -> Result<Json<ProgressResponse>, AppError> {
    let Path(video_id) = path?;
    let Json(request) = payload?;
    let value = progress::validate_progress(request.progress)?;

    let row = state
        .repo
        .record_video_progress(user_id, video_id, value)
        .await?
        .ok_or(AppError::NotFound("video"))?;

    tracing::info!(%user_id, video_id, progress = value, completed = row.completed, "video progress recorded");
    Ok(Json(ProgressResponse {
        message: "progress updated".to_string(),
        progress: row,
    }))
}

/// get_progress
///
/// [Authenticated Route] Every progress row belonging to the caller.
#[utoipa::path(
    get,
    path = "/progress",
    responses((status = 200, description = "My progress", body = ProgressListResponse))
)]
pub async fn get_progress(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ProgressListResponse>, AppError> {
    let progress = state.repo.get_user_progress(id).await?;
    Ok(Json(ProgressListResponse { progress }))
}

/// get_me
///
/// [Authenticated Route] The caller's identity record.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Current user", body = UserResponse))
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, AppError> {
    state
        .repo
        .get_user(id)
        .await?
        .map(|user| Json(UserResponse { user }))
        .ok_or(AppError::Unauthenticated)
}

/// Unknown paths answer with the same JSON error body as every other failure.
pub async fn route_not_found() -> AppError {
    AppError::NotFound("route")
}

// --- Admin Handlers ---
// Each one checks the admin flag before reading the body or touching the store, so a
// non-admin sees 403 regardless of payload or target.

/// admin_list_articles
///
/// [Admin Route] All articles including drafts.
#[utoipa::path(
    get,
    path = "/admin/articles",
    responses(
        (status = 200, description = "All articles", body = ArticleListResponse),
        (status = 403, description = "Not an admin", body = ErrorBody)
    )
)]
pub async fn admin_list_articles(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ArticleListResponse>, AppError> {
    policy::require_admin(&user)?;
    let articles = state.repo.list_articles(Visibility::All).await?;
    Ok(Json(ArticleListResponse { articles }))
}

/// create_article
///
/// [Admin Route] Creates an article. Title and content are required.
#[utoipa::path(
    post,
    path = "/admin/articles",
    request_body = CreateArticleRequest,
    responses(
        (status = 201, description = "Created", body = ArticleResponse),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody)
    )
)]
pub async fn create_article(
    user: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<CreateArticleRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ArticleResponse>), AppError> {
    policy::require_admin(&user)?;
    let Json(request) = payload?;
    let new_article = NewArticle::try_from(request)?;

    let article = state.repo.create_article(new_article).await?;
    tracing::info!(article_id = article.id, admin_id = %user.id, "article created");

    Ok((
        StatusCode::CREATED,
        Json(ArticleResponse::with_message("article created", article)),
    ))
}

/// update_article
///
/// [Admin Route] Applies a partial update. Fields absent from the body are left alone;
/// fields present with falsy values (`false`, `[]`, `null` category) are written.
#[utoipa::path(
    put,
    path = "/admin/articles/{id}",
    params(("id" = i64, Path, description = "Article ID")),
    request_body = UpdateArticleRequest,
    responses(
        (status = 200, description = "Updated", body = ArticleResponse),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn update_article(
    user: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateArticleRequest>, JsonRejection>,
) -> Result<Json<ArticleResponse>, AppError> {
    policy::require_admin(&user)?;
    let Path(id) = path?;
    let Json(request) = payload?;
    let patch = ArticlePatch::try_from(request)?;

    let article = state
        .repo
        .update_article(id, patch)
        .await?
        .ok_or(AppError::NotFound("article"))?;

    tracing::info!(article_id = id, admin_id = %user.id, "article updated");
    Ok(Json(ArticleResponse::with_message("article updated", article)))
}

/// delete_article
///
/// [Admin Route] Deletes an article. Deleting twice yields 404 the second time.
#[utoipa::path(
    delete,
    path = "/admin/articles/{id}",
    params(("id" = i64, Path, description = "Article ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not an admin", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn delete_article(
    user: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, AppError> {
    delete_content(user, state, ContentKind::Article, path).await
}

/// admin_list_videos
///
/// [Admin Route] All videos including drafts.
#[utoipa::path(
    get,
    path = "/admin/videos",
    responses((status = 200, description = "All videos", body = VideoListResponse))
)]
pub async fn admin_list_videos(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<VideoListResponse>, AppError> {
    policy::require_admin(&user)?;
    let videos = state.repo.list_videos(Visibility::All).await?;
    Ok(Json(VideoListResponse { videos }))
}

/// create_video
///
/// [Admin Route] Registers a video. Title and filename are required; the filename is
/// normally the `resource_key` returned by `POST /admin/videos/upload`.
#[utoipa::path(
    post,
    path = "/admin/videos",
    request_body = CreateVideoRequest,
    responses(
        (status = 201, description = "Created", body = VideoResponse),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody)
    )
)]
pub async fn create_video(
    user: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<CreateVideoRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<VideoResponse>), AppError> {
    policy::require_admin(&user)?;
    let Json(request) = payload?;
    let new_video = NewVideo::try_from(request)?;

    let video = state.repo.create_video(new_video).await?;
    tracing::info!(video_id = video.id, admin_id = %user.id, "video created");

    Ok((
        StatusCode::CREATED,
        Json(VideoResponse::with_message("video created", video)),
    ))
}

/// delete_video
#[utoipa::path(
    delete,
    path = "/admin/videos/{id}",
    params(("id" = i64, Path, description = "Video ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn delete_video(
    user: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, AppError> {
    delete_content(user, state, ContentKind::Video, path).await
}

async fn delete_content(
    user: AuthUser,
    state: AppState,
    kind: ContentKind,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, AppError> {
    policy::require_admin(&user)?;
    let Path(id) = path?;

    if !state.repo.delete_content(kind, id).await? {
        return Err(AppError::NotFound(kind.as_str()));
    }

    tracing::info!(%kind, content_id = id, admin_id = %user.id, "content deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// get_video_upload_url
///
/// [Admin Route] Issues a short-lived presigned PUT URL for a video file. The returned
/// `resource_key` becomes the `filename` of the video created afterwards.
#[utoipa::path(
    post,
    path = "/admin/videos/upload",
    request_body = VideoUploadRequest,
    responses(
        (status = 200, description = "Upload URL", body = VideoUploadResponse),
        (status = 403, description = "Not an admin", body = ErrorBody)
    )
)]
pub async fn get_video_upload_url(
    user: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<VideoUploadRequest>, JsonRejection>,
) -> Result<Json<VideoUploadResponse>, AppError> {
    policy::require_admin(&user)?;
    let Json(request) = payload?;

    if !request.file_type.starts_with("video/") {
        return Err(AppError::validation("file_type must be a video/* MIME type"));
    }

    let resource_key = video_object_key(&request.filename);
    let upload_url = state
        .storage
        .get_presigned_upload_url(&resource_key, &request.file_type)
        .await?;

    Ok(Json(VideoUploadResponse {
        upload_url,
        resource_key,
    }))
}
