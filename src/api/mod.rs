use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod error;
mod state;
mod webinars;

pub use error::*;
pub use state::*;
pub use webinars::{Reschedule, StateResponse, VideoUpload};

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

const MAX_VIDEO_SIZE: usize = 512 * 1024 * 1024;

pub fn create_router(app: App) -> Router {
    Router::new()
        .route("/webinars", get(webinars::list).post(webinars::create))
        .route("/webinars/:slug", get(webinars::info).delete(webinars::delete))
        .route("/webinars/:slug/state", get(webinars::state))
        .route("/webinars/:slug/live", get(webinars::live))
        .route("/webinars/:slug/chat", put(webinars::replace_chat))
        .route("/webinars/:slug/ctas", put(webinars::replace_ctas))
        .route("/webinars/:slug/schedule", put(webinars::reschedule))
        .route(
            "/webinars/:slug/video",
            put(webinars::upload_video).layer(DefaultBodyLimit::max(MAX_VIDEO_SIZE)),
        )
        .route("/sessions/:id/resume", post(webinars::resume))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app)
}
