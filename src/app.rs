use crate::handlers;
use crate::state::AppState;
use axum::{routing::{delete, get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/status", get(handlers::get_status))
        .route("/api/notifications", get(handlers::get_notifications))
        .route("/api/notifications/:id/dismiss", post(handlers::dismiss_notification))
        .route("/api/reconnect", post(handlers::reconnect))
        .route("/api/rfid", delete(handlers::clear_rfid))
        .with_state(state)
}
