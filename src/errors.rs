use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("scanner transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("not authorized")]
    Authorization,
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ConsoleError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}
