use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;

pub enum AppError {
    Database(diesel::result::Error),
    Pool(diesel_async::pooled_connection::deadpool::PoolError),
    NotFound(&'static str),
    Unhandled(String),
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

fn envelope(code: &str, message: impl Into<String>) -> ErrorEnvelope {
    ErrorEnvelope {
        error: ErrorBody {
            code: code.into(),
            message: message.into(),
        },
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status_code, body) = match self {
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error while serving request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    #[cfg(debug_assertions)]
                    envelope("db_error", format!("Database error: {e}")),
                    #[cfg(not(debug_assertions))]
                    envelope("internal_error", "Internal server error"),
                )
            }
            AppError::Pool(e) => {
                tracing::error!(error = %e, "Could not check out a database connection");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    envelope("internal_error", "Internal server error"),
                )
            }
            AppError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                envelope("not_found", format!("{what} not found")),
            ),
            AppError::Unhandled(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                envelope("internal_error", e),
            ),
        };

        (status_code, Json(body)).into_response()
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(e: diesel::result::Error) -> Self {
        AppError::Database(e)
    }
}

impl From<diesel_async::pooled_connection::deadpool::PoolError> for AppError {
    fn from(e: diesel_async::pooled_connection::deadpool::PoolError) -> Self {
        AppError::Pool(e)
    }
}

impl From<&'static str> for AppError {
    fn from(e: &'static str) -> Self {
        AppError::Unhandled(e.into())
    }
}
