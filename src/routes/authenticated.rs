use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Reader-facing routes. The router layer above applies the auth middleware, and each
/// handler additionally receives the resolved `AuthUser` so the caller's identity is
/// passed explicitly into every repository call.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        .route("/me", get(handlers::get_me))
        // --- Articles ---
        // GET /articles
        // Published articles only, newest first.
        .route("/articles", get(handlers::list_articles))
        // GET /articles/{id}
        // Reading an article marks it completed for the caller.
        .route("/articles/{id}", get(handlers::get_article))
        // --- Videos ---
        .route("/videos", get(handlers::list_videos))
        .route("/videos/{id}", get(handlers::get_video))
        // POST /videos/{id}/progress
        // Upserts the caller's progress row; completed once progress >= 0.9.
        .route(
            "/videos/{id}/progress",
            post(handlers::record_video_progress),
        )
        // --- Progress ---
        .route("/progress", get(handlers::get_progress))
}
