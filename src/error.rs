use actix_web::{HttpResponse, http::StatusCode};
use derive_more::Display;
use serde_json::json;

/// Closed error taxonomy for the leave core. Boundary layers match on
/// this exhaustively instead of parsing message strings.
#[derive(Debug, Display)]
pub enum DomainError {
    #[display(fmt = "validation failed: {}", _0)]
    Validation(String),

    #[display(fmt = "{} not found", _0)]
    NotFound(&'static str),

    #[display(fmt = "not authorized: {}", _0)]
    Authorization(String),

    #[display(fmt = "illegal transition: {}", _0)]
    State(String),

    #[display(fmt = "insufficient balance: need {} day(s), have {}", needed, available)]
    InsufficientBalance { needed: i64, available: i64 },

    #[display(fmt = "conflict: {}", _0)]
    Conflict(String),

    #[display(fmt = "transient storage failure: {}", _0)]
    Transient(String),
}

impl DomainError {
    /// Stable machine-readable kind used in JSON error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "validation",
            DomainError::NotFound(_) => "not_found",
            DomainError::Authorization(_) => "authorization",
            DomainError::State(_) => "state",
            DomainError::InsufficientBalance { .. } => "insufficient_balance",
            DomainError::Conflict(_) => "conflict",
            DomainError::Transient(_) => "transient",
        }
    }
}

impl std::error::Error for DomainError {}

impl actix_web::ResponseError for DomainError {
    fn status_code(&self) -> StatusCode {
        match self {
            DomainError::Validation(_) | DomainError::State(_) => StatusCode::BAD_REQUEST,
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::Authorization(_) => StatusCode::FORBIDDEN,
            DomainError::InsufficientBalance { .. } | DomainError::Conflict(_) => {
                StatusCode::CONFLICT
            }
            DomainError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.kind(),
            "message": self.to_string(),
        }))
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => DomainError::NotFound("record"),
            other => DomainError::Transient(other.to_string()),
        }
    }
}
