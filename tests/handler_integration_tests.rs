mod common;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use common::{InMemoryRepository, admin, new_article, new_video, reader, test_state};
use std::sync::Arc;
use study_portal::{
    AppError, AppState, MockStorageService,
    config::AppConfig,
    handlers,
    models::{
        ArticleListResponse, ArticleResponse, ContentKind, CreateArticleRequest,
        CreateVideoRequest, ProgressListResponse, ProgressRequest, ProgressResponse,
        UpdateArticleRequest, VideoResponse, VideoUploadRequest,
    },
    repository::Repository,
};
use tokio::test;

fn setup() -> (Arc<InMemoryRepository>, AppState) {
    let repo = Arc::new(InMemoryRepository::new());
    let state = test_state(repo.clone());
    (repo, state)
}

// --- READ HANDLERS ---

#[test]
async fn test_list_articles_hides_unpublished_even_for_admin() {
    let (repo, state) = setup();
    repo.create_article(new_article("Draft", false)).await.unwrap();
    let published = repo.create_article(new_article("Live", true)).await.unwrap();

    let Json(ArticleListResponse { articles }) = handlers::list_articles(admin(), State(state))
        .await
        .unwrap();

    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].id, published.id);
}

#[test]
async fn test_list_articles_newest_first() {
    let (repo, state) = setup();
    let first = repo.create_article(new_article("First", true)).await.unwrap();
    let second = repo.create_article(new_article("Second", true)).await.unwrap();

    let Json(ArticleListResponse { articles }) = handlers::list_articles(reader(), State(state))
        .await
        .unwrap();

    let ids: Vec<i64> = articles.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

#[test]
async fn test_get_unpublished_article_is_not_found_for_reader() {
    let (repo, state) = setup();
    let draft = repo.create_article(new_article("Draft", false)).await.unwrap();

    let err = handlers::get_article(reader(), State(state), Ok(Path(draft.id)))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    assert!(repo.progress_rows().is_empty(), "hidden article must not record a view");
}

#[test]
async fn test_get_unpublished_article_is_visible_to_admin() {
    let (repo, state) = setup();
    let draft = repo.create_article(new_article("Draft", false)).await.unwrap();

    let Json(ArticleResponse { article, .. }) =
        handlers::get_article(admin(), State(state), Ok(Path(draft.id)))
            .await
            .unwrap();

    assert_eq!(article.id, draft.id);
}

#[test]
async fn test_get_article_records_single_completed_view() {
    let (repo, state) = setup();
    let article = repo.create_article(new_article("Intro", true)).await.unwrap();

    for _ in 0..2 {
        let Json(ArticleResponse { article: viewed, .. }) =
            handlers::get_article(reader(), State(state.clone()), Ok(Path(article.id)))
                .await
                .unwrap();
        assert_eq!(viewed.id, article.id);
    }

    let rows = repo.progress_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].content_type, ContentKind::Article);
    assert_eq!(rows[0].progress, 1.0);
    assert!(rows[0].completed);
}

#[test]
async fn test_get_missing_video_is_not_found() {
    let (_repo, state) = setup();

    let err = handlers::get_video(reader(), State(state), Ok(Path(999)))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
}

#[test]
async fn test_get_video_has_no_progress_side_effect() {
    let (repo, state) = setup();
    let video = repo.create_video(new_video("Lesson", true)).await.unwrap();

    let Json(VideoResponse { video: fetched, .. }) =
        handlers::get_video(reader(), State(state), Ok(Path(video.id)))
            .await
            .unwrap();
    assert_eq!(fetched.id, video.id);

    assert!(repo.progress_rows().is_empty());
}

// --- PROGRESS HANDLERS ---

#[test]
async fn test_video_progress_upserts_one_row() {
    let (repo, state) = setup();
    let video = repo.create_video(new_video("Lesson", true)).await.unwrap();

    for value in [0.2, 0.5, 0.95] {
        let Json(ProgressResponse { progress: row, .. }) = handlers::record_video_progress(
            reader(),
            State(state.clone()),
            Ok(Path(video.id)),
            Ok(Json(ProgressRequest { progress: value })),
        )
        .await
        .unwrap();
        assert_eq!(row.progress, value);
    }

    let rows = repo.progress_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].progress, 0.95);
    assert!(rows[0].completed);
}

#[test]
async fn test_video_progress_regression_uncompletes() {
    let (repo, state) = setup();
    let video = repo.create_video(new_video("Lesson", true)).await.unwrap();

    for value in [0.9, 0.4] {
        let Json(ProgressResponse { progress: row, .. }) = handlers::record_video_progress(
            reader(),
            State(state.clone()),
            Ok(Path(video.id)),
            Ok(Json(ProgressRequest { progress: value })),
        )
        .await
        .unwrap();
        assert_eq!(row.progress, value);
    }

    let Json(ProgressListResponse { progress: rows }) =
        handlers::get_progress(reader(), State(state)).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].progress, 0.4);
    assert!(!rows[0].completed);
}

#[test]
async fn test_video_progress_on_unpublished_video_is_not_found() {
    let (repo, state) = setup();
    let video = repo.create_video(new_video("Hidden", false)).await.unwrap();

    let err = handlers::record_video_progress(
        admin(),
        State(state),
        Ok(Path(video.id)),
        Ok(Json(ProgressRequest { progress: 0.5 })),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    assert!(repo.progress_rows().is_empty());
}

#[test]
async fn test_video_progress_out_of_range_is_validation_error() {
    let (repo, state) = setup();
    let video = repo.create_video(new_video("Lesson", true)).await.unwrap();

    let err = handlers::record_video_progress(
        reader(),
        State(state),
        Ok(Path(video.id)),
        Ok(Json(ProgressRequest { progress: 1.5 })),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
}

#[test]
async fn test_progress_is_scoped_to_caller() {
    let (repo, state) = setup();
    let article = repo.create_article(new_article("Intro", true)).await.unwrap();
    repo.record_article_view(common::ADMIN_ID, article.id)
        .await
        .unwrap();

    let Json(ProgressListResponse { progress: rows }) =
        handlers::get_progress(reader(), State(state)).await.unwrap();
    assert!(rows.is_empty());
}

// --- ADMIN HANDLERS ---

#[test]
async fn test_create_article_forbidden_for_reader() {
    let (_repo, state) = setup();

    let err = handlers::create_article(
        reader(),
        State(state),
        Ok(Json(CreateArticleRequest {
            title: "T".to_string(),
            content: "C".to_string(),
            ..Default::default()
        })),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::Forbidden));
}

#[test]
async fn test_create_article_returns_created() {
    let (_repo, state) = setup();

    let (status, Json(ArticleResponse { message, article })) = handlers::create_article(
        admin(),
        State(state),
        Ok(Json(CreateArticleRequest {
            title: "Borrowing".to_string(),
            content: "References".to_string(),
            tags: vec!["rust".to_string()],
            ..Default::default()
        })),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(message.as_deref(), Some("article created"));
    assert!(!article.is_published);
    assert_eq!(article.tags, vec!["rust".to_string()]);
}

#[test]
async fn test_create_article_missing_content_is_bad_request() {
    let (_repo, state) = setup();

    let err = handlers::create_article(
        admin(),
        State(state),
        Ok(Json(CreateArticleRequest {
            title: "No body".to_string(),
            ..Default::default()
        })),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
}

#[test]
async fn test_update_missing_article_is_not_found_for_admin() {
    let (_repo, state) = setup();

    let err = handlers::update_article(
        admin(),
        State(state),
        Ok(Path(404)),
        Ok(Json(UpdateArticleRequest::default())),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
}

#[test]
async fn test_update_missing_article_is_forbidden_for_reader() {
    let (_repo, state) = setup();

    // The admin check runs before the lookup.
    let err = handlers::update_article(
        reader(),
        State(state),
        Ok(Path(404)),
        Ok(Json(UpdateArticleRequest::default())),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
}

#[test]
async fn test_update_article_explicit_false_unpublishes() {
    let (repo, state) = setup();
    let article = repo.create_article(new_article("Live", true)).await.unwrap();

    let Json(ArticleResponse { article: updated, .. }) = handlers::update_article(
        admin(),
        State(state),
        Ok(Path(article.id)),
        Ok(Json(UpdateArticleRequest {
            is_published: Some(false),
            ..Default::default()
        })),
    )
    .await
    .unwrap();

    assert!(!updated.is_published);
    assert_eq!(updated.title, article.title);
    assert_eq!(updated.tags, article.tags);
}

#[test]
async fn test_delete_article_twice_is_not_found() {
    let (repo, state) = setup();
    let article = repo.create_article(new_article("Old", true)).await.unwrap();

    let status = handlers::delete_article(admin(), State(state.clone()), Ok(Path(article.id)))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);

    let err = handlers::delete_article(admin(), State(state), Ok(Path(article.id)))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(err.to_string(), "article not found");
}

#[test]
async fn test_create_and_delete_video() {
    let (repo, state) = setup();

    let (status, Json(VideoResponse { video, .. })) = handlers::create_video(
        admin(),
        State(state.clone()),
        Ok(Json(CreateVideoRequest {
            title: "Lesson 2".to_string(),
            filename: "videos/lesson-2.mp4".to_string(),
            is_published: true,
            ..Default::default()
        })),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);

    let status = handlers::delete_video(admin(), State(state.clone()), Ok(Path(video.id)))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);

    let err = handlers::delete_video(admin(), State(state), Ok(Path(video.id)))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "video not found");
    assert!(repo.list_videos(study_portal::policy::Visibility::All).await.unwrap().is_empty());
}

#[test]
async fn test_admin_list_articles_includes_drafts() {
    let (repo, state) = setup();
    repo.create_article(new_article("Draft", false)).await.unwrap();
    repo.create_article(new_article("Live", true)).await.unwrap();

    let Json(ArticleListResponse { articles }) =
        handlers::admin_list_articles(admin(), State(state.clone()))
            .await
            .unwrap();
    assert_eq!(articles.len(), 2);

    let err = handlers::admin_list_articles(reader(), State(state))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
}

#[test]
async fn test_storage_failure_surfaces_as_internal_error() {
    let repo = Arc::new(InMemoryRepository::failing());
    let state = test_state(repo.clone());

    let err = handlers::create_article(
        admin(),
        State(state),
        Ok(Json(CreateArticleRequest {
            title: "T".to_string(),
            content: "C".to_string(),
            ..Default::default()
        })),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::Database(_)));
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        repo.list_articles(study_portal::policy::Visibility::All)
            .await
            .unwrap()
            .is_empty()
    );
}

// --- UPLOAD HANDLER ---

#[test]
async fn test_video_upload_url_uses_generated_key() {
    let (_repo, state) = setup();

    let Json(body) = handlers::get_video_upload_url(
        admin(),
        State(state),
        Ok(Json(VideoUploadRequest {
            filename: "lesson.mp4".to_string(),
            file_type: "video/mp4".to_string(),
        })),
    )
    .await
    .unwrap();

    assert!(body.resource_key.starts_with("videos/"));
    assert!(body.resource_key.ends_with(".mp4"));
    assert!(
        body.upload_url
            .starts_with("http://localhost:9000/mock-bucket/")
    );
    assert!(body.upload_url.contains(&body.resource_key));
}

#[test]
async fn test_video_upload_url_storage_failure() {
    let state = AppState {
        repo: Arc::new(InMemoryRepository::new()),
        storage: Arc::new(MockStorageService::new_failing()),
        config: AppConfig::default(),
    };

    let err = handlers::get_video_upload_url(
        admin(),
        State(state),
        Ok(Json(VideoUploadRequest {
            filename: "lesson.mp4".to_string(),
            file_type: "video/mp4".to_string(),
        })),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::Upload(_)));
}

#[test]
async fn test_video_upload_rejects_non_video_type() {
    let (_repo, state) = setup();

    let err = handlers::get_video_upload_url(
        admin(),
        State(state),
        Ok(Json(VideoUploadRequest {
            filename: "notes.pdf".to_string(),
            file_type: "application/pdf".to_string(),
        })),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
}
