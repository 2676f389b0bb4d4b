pub mod error;
pub mod extract;
mod routes;

use axum::Router;
use livepoll_core::AppState;

pub fn build_router() -> Router<AppState> {
    Router::new().nest("/api", routes::api_router())
}
