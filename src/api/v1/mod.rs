//! v1 API endpoints

pub mod ask;

use axum::{Router, routing::post};

use super::state::AppState;

pub fn create_v1_router() -> Router<AppState> {
    Router::new().route("/ask", post(ask::ask))
}
