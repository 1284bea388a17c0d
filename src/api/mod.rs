pub mod dto;
pub mod errors;
pub mod handlers;
pub mod owner;

use axum::{
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use handlers::ApiDoc;

use crate::{config::Config, store::postgres::PgStore, thingspeak::ThingSpeakClient};

/// Shared per-request dependencies. Cheap to clone: the store shares a pool,
/// the client shares a `reqwest::Client`.
#[derive(Clone)]
pub struct AppState {
    pub store: PgStore,
    pub thingspeak: ThingSpeakClient,
    pub config: Config,
}

pub fn router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route("/logs", get(handlers::get_logs).delete(handlers::clear_logs))
        .route(
            "/settings",
            get(handlers::get_settings).put(handlers::update_settings),
        )
        .route("/thingspeak/latest", get(handlers::get_latest_reading))
        .route("/thingspeak/sync", post(handlers::refresh))
        .route("/water/manual", post(handlers::manual_water))
        .with_state(state)
        .split_for_parts();

    router
        .route("/health", get(handlers::health))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(api) }),
        )
}
