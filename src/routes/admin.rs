use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Admin Router Module
///
/// Content management, nested under `/admin`. Authentication comes from the
/// `AuthUser` extractor (401), then each handler calls `policy::require_admin` (403)
/// before it parses the body or looks anything up.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET/POST /admin/articles
        // Listing includes unpublished drafts.
        .route(
            "/articles",
            get(handlers::admin_list_articles).post(handlers::create_article),
        )
        // PUT/DELETE /admin/articles/{id}
        .route(
            "/articles/{id}",
            put(handlers::update_article).delete(handlers::delete_article),
        )
        // GET/POST /admin/videos
        .route(
            "/videos",
            get(handlers::admin_list_videos).post(handlers::create_video),
        )
        // POST /admin/videos/upload
        // Presigned URL for uploading the media file before the video row is created.
        .route("/videos/upload", post(handlers::get_video_upload_url))
        // DELETE /admin/videos/{id}
        // Videos have no update route.
        .route("/videos/{id}", delete(handlers::delete_video))
}
