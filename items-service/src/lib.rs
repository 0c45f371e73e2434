pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod supabase;
pub mod utils;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::tracing::{make_request_span, request_id_middleware};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::ItemsConfig;
use crate::services::{ItemRepository, TokenVerifier};
use crate::supabase::SupabaseClient;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ItemsConfig>,
    pub client: SupabaseClient,
    pub repository: ItemRepository,
    pub verifier: TokenVerifier,
}

impl AppState {
    pub fn new(config: ItemsConfig) -> Result<Self, AppError> {
        let client = SupabaseClient::new(config.supabase.settings())
            .map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))?;

        let verifier = TokenVerifier::new(
            &config.supabase.jwt_secret,
            config.supabase.jwt_audience.as_deref(),
        )
        .map_err(AppError::ConfigError)?;

        tracing::info!(base_url = %client.base_url(), "Data service client initialized");

        Ok(Self {
            config: Arc::new(config),
            repository: ItemRepository::new(client.clone()),
            client,
            verifier,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/api/v1/items",
            get(handlers::items::list_items).post(handlers::items::create_item),
        )
        .route(
            "/api/v1/items/:id",
            get(handlers::items::get_item)
                .patch(handlers::items::update_item)
                .delete(handlers::items::delete_item),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/auth/logout", post(handlers::auth::logout))
        .merge(protected)
        .layer(cors_layer(&state.config.allowed_origins))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span::<axum::body::Body>))
        // Outermost so the trace span already sees the request id
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
