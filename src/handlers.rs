use crate::errors::AppError;
use crate::models::{ConfirmationResult, Notification, SessionMode, StatusResponse, Transport};
use crate::state::AppState;
use crate::ui::render_index;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Html,
    Json,
};

pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_index(state.console.session()))
}

pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(state.console.status())
}

pub async fn get_notifications(State(state): State<AppState>) -> Json<Vec<Notification>> {
    Json(state.console.relay().active().await)
}

pub async fn dismiss_notification(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, AppError> {
    if state.console.relay().dismiss(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found(format!("no active notification {id}")))
    }
}

pub async fn reconnect(State(state): State<AppState>) -> Result<Json<StatusResponse>, AppError> {
    if state.console.config().transport != Transport::Socket {
        return Err(AppError::bad_request("console is not using the scanner socket"));
    }
    state.console.reconnect().await;
    Ok(Json(state.console.status()))
}

pub async fn clear_rfid(
    State(state): State<AppState>,
) -> Result<Json<ConfirmationResult>, AppError> {
    if state.console.session().mode != SessionMode::UserRegistration {
        return Err(AppError::bad_request("tags can only be cleared from a user console"));
    }
    Ok(Json(state.console.clear_tag().await))
}
