use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod content;
pub mod error;
pub mod handlers;
pub mod models;
pub mod policy;
pub mod progress;
pub mod repository;
pub mod storage;

// Routing split by access level (public, authenticated, admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::AppError;
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document aggregated from the `#[utoipa::path]` handlers and `ToSchema`
/// models. Served at `/api-docs/openapi.json` and rendered at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_articles, handlers::get_article, handlers::list_videos,
        handlers::get_video, handlers::record_video_progress, handlers::get_progress,
        handlers::get_me, handlers::admin_list_articles, handlers::create_article,
        handlers::update_article, handlers::delete_article, handlers::admin_list_videos,
        handlers::create_video, handlers::delete_video, handlers::get_video_upload_url
    ),
    components(
        schemas(
            models::Article, models::Video, models::UserProgress, models::ContentKind,
            models::User, models::CreateArticleRequest, models::UpdateArticleRequest,
            models::CreateVideoRequest, models::ProgressRequest, models::VideoUploadRequest,
            models::VideoUploadResponse, models::ErrorBody, models::ArticleListResponse,
            models::ArticleResponse, models::VideoListResponse, models::VideoResponse,
            models::ProgressListResponse, models::ProgressResponse, models::UserResponse,
        )
    ),
    tags(
        (name = "study-portal", description = "Learning content and progress API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared state container. Handlers and extractors pull the slice they
/// need through `FromRef`.
#[derive(Clone)]
pub struct AppState {
    /// Content Store and Progress Tracker persistence.
    pub repo: RepositoryState,
    /// Object storage for video media files.
    pub storage: StorageState,
    pub config: AppConfig,
}

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Rejects unauthenticated requests for the authenticated router before routing
/// reaches a handler. The work is done by the `AuthUser` extractor; if it fails, its
/// `AppError::Unauthenticated` rejection becomes the response.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing table, scoped middleware and the observability stack.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Admin handlers extract `AuthUser` themselves and then check the admin flag.
        .nest("/admin", admin::admin_routes())
        .fallback(handlers::route_not_found)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                // Generates an x-request-id for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // Echoes the request id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span so every log line of a request carries its id.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
