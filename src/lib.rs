pub mod api;
pub mod client;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod services;
pub mod utils;

use crate::config::AppConfig;
use crate::services::image_service::ImageService;
use crate::services::storage::StorageService;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::auth::register,
        api::handlers::auth::login,
        api::handlers::images::upload_images,
        api::handlers::images::search_images,
        api::handlers::images::delete_image,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::auth::RegisterRequest,
            api::handlers::auth::LoginRequest,
            api::handlers::auth::AuthResponse,
            api::handlers::images::UploadForm,
            api::handlers::images::MessageResponse,
            api::handlers::health::HealthResponse,
            services::image_service::UploadResult,
            services::image_service::ImageSummary,
        )
    ),
    tags(
        (name = "users", description = "Registration and login"),
        (name = "images", description = "Image upload, search and deletion"),
        (name = "system", description = "Service health")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub storage: Arc<dyn StorageService>,
    pub image_service: Arc<ImageService>,
    pub config: Arc<AppConfig>,
    /// Cancelled on shutdown; upload batches derive their tokens from it
    pub shutdown: CancellationToken,
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if config.allows_any_origin() {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        layer.allow_origin(origins)
    }
}

pub fn create_app(state: AppState) -> Router {
    let auth = from_fn_with_state(state.clone(), api::middleware::auth::auth_middleware);

    let users = Router::new()
        .route("/register", post(api::handlers::auth::register))
        .route("/login", post(api::handlers::auth::login));

    let images = Router::new()
        .route(
            "/upload",
            post(api::handlers::images::upload_images).layer(
                axum::extract::DefaultBodyLimit::max(state.config.max_request_size()),
            ),
        )
        .route("/search", get(api::handlers::images::search_images))
        .route("/delete/:key", delete(api::handlers::images::delete_image))
        .route_layer(auth);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .nest("/api/users", users)
        .nest("/api/images", images)
        .layer(cors_layer(&state.config))
        .with_state(state)
}
