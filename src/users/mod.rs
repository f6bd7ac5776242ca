use axum::Router;

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::open_routes())
        .merge(handlers::me_routes())
        .merge(handlers::admin_routes())
}
