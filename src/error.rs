use actix_web::ResponseError;
use actix_web::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ProxyError {
    /// Request shape was well-formed JSON but violated the sequence
    /// count bounds. Surfaced as 400, never reaches the queue.
    #[error("Need 1\u{2013}5 sequences")]
    Validation,

    /// Malformed body (missing field, wrong type). Surfaced as 422.
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    /// Downstream transport or protocol failure (connect, timeout,
    /// non-2xx, malformed body); both are treated identically.
    #[error("{0}")]
    Downstream(String),

    /// Some positions in the downstream response never arrived.
    #[error("truncated downstream response")]
    Truncated,

    /// The dispatcher was signalled to exit before servicing this item.
    #[error("service shutting down")]
    ShuttingDown,

    /// The item's completion sender was dropped without resolving it.
    #[error("proxy dispatch error: {0}")]
    Dispatch(#[from] tokio::sync::oneshot::error::RecvError),

    /// `POST /strategy` or similar control input failed to parse.
    #[error("invalid strategy: {0}")]
    InvalidStrategy(String),
}

impl ResponseError for ProxyError {
    fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Validation => StatusCode::BAD_REQUEST,
            ProxyError::InvalidBody(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ProxyError::InvalidStrategy(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ProxyError::Downstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::Truncated => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::ShuttingDown => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::Dispatch(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        let body = match self {
            ProxyError::Validation => self.to_string(),
            ProxyError::Downstream(_) | ProxyError::Truncated | ProxyError::ShuttingDown | ProxyError::Dispatch(_) => {
                format!("Downstream service error: {self}")
            }
            ProxyError::InvalidBody(_) | ProxyError::InvalidStrategy(_) => self.to_string(),
        };
        actix_web::HttpResponse::build(self.status_code()).body(body)
    }
}
