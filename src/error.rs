use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// The application's error type.
///
/// Every variant is terminal for the request that produced it. The numeric
/// code returned by [`AppError::code`] is part of the wire contract.
#[derive(Error, Debug)]
pub enum AppError {
    /// The body was not parseable or a required field was missing.
    #[error("Malformed input: {0}")]
    InputMalformed(String),

    /// Key material could not be parsed.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Plaintext does not fit a single PKCS#1 v1.5 block.
    #[error("Payload of {len} bytes exceeds the {max} byte limit of the key")]
    PayloadTooLarge { len: usize, max: usize },

    /// Any other failure inside the crypto library.
    #[error("Crypto failure: {0}")]
    CryptoFailure(String),

    #[error("Unknown session")]
    UnknownSession,

    #[error("Unknown client")]
    UnknownClient,

    #[error("Unknown user")]
    UnknownUser,

    #[error("Invalid credential")]
    InvalidCredential,

    /// The serial number is already bound to another user.
    #[error("Client is owned by another user")]
    OwnershipConflict,

    #[error("Forbidden")]
    Forbidden,

    /// A referential constraint rejected the write.
    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),

    /// An external store or collaborator could not be reached.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The user already owns as many clients as the licence allows.
    #[error("Client quota of {0} exhausted")]
    QuotaExceeded(i32),

    /// The user's licence validity window has closed.
    #[error("Authorization expired")]
    AuthorizationExpired,

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// The negative code reported in the response envelope.
    pub fn code(&self) -> i32 {
        match self {
            AppError::InputMalformed(_) => -1,
            AppError::InvalidKey(_) => -2,
            AppError::PayloadTooLarge { .. } => -3,
            AppError::CryptoFailure(_) => -4,
            AppError::UnknownSession => -5,
            AppError::UnknownClient => -6,
            AppError::UnknownUser => -7,
            AppError::InvalidCredential => -8,
            AppError::OwnershipConflict => -9,
            AppError::Forbidden => -10,
            AppError::IntegrityViolation(_) => -11,
            AppError::StoreUnavailable(_) => -12,
            AppError::QuotaExceeded(_) => -13,
            AppError::AuthorizationExpired => -14,
            AppError::Internal(_) => -15,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::InputMalformed(_)
            | AppError::InvalidKey(_)
            | AppError::PayloadTooLarge { .. } => StatusCode::BAD_REQUEST,
            AppError::UnknownSession | AppError::UnknownClient | AppError::UnknownUser => {
                StatusCode::NOT_FOUND
            }
            AppError::InvalidCredential => StatusCode::UNAUTHORIZED,
            AppError::Forbidden | AppError::AuthorizationExpired | AppError::QuotaExceeded(_) => {
                StatusCode::FORBIDDEN
            }
            AppError::OwnershipConflict | AppError::IntegrityViolation(_) => StatusCode::CONFLICT,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::CryptoFailure(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<redis::RedisError> for AppError {
    fn from(e: redis::RedisError) -> Self {
        AppError::StoreUnavailable(format!("cache: {}", e))
    }
}

impl From<tokio_postgres::Error> for AppError {
    fn from(e: tokio_postgres::Error) -> Self {
        use tokio_postgres::error::SqlState;

        match e.code() {
            Some(code)
                if *code == SqlState::FOREIGN_KEY_VIOLATION
                    || *code == SqlState::UNIQUE_VIOLATION
                    || *code == SqlState::CHECK_VIOLATION =>
            {
                AppError::IntegrityViolation(e.to_string())
            }
            _ => AppError::StoreUnavailable(format!("database: {}", e)),
        }
    }
}

impl From<deadpool_postgres::PoolError> for AppError {
    fn from(e: deadpool_postgres::PoolError) -> Self {
        AppError::StoreUnavailable(format!("database pool: {}", e))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::StoreUnavailable(format!("identity backend: {}", e))
    }
}

impl From<sonic_rs::Error> for AppError {
    fn from(e: sonic_rs::Error) -> Self {
        AppError::Internal(format!("serialization: {}", e))
    }
}

impl From<garde::Report> for AppError {
    fn from(report: garde::Report) -> Self {
        AppError::InputMalformed(report.to_string().trim().to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::StoreUnavailable(ref msg) => {
                tracing::error!("Store unavailable: {}", msg);
                "Store unavailable".to_string()
            }
            AppError::CryptoFailure(ref msg) => {
                tracing::error!("Crypto failure: {}", msg);
                self.to_string()
            }
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::IntegrityViolation(ref msg) => {
                tracing::warn!("Integrity violation: {}", msg);
                "Integrity violation".to_string()
            }
            AppError::InvalidCredential
            | AppError::Forbidden
            | AppError::OwnershipConflict
            | AppError::AuthorizationExpired
            | AppError::QuotaExceeded(_) => {
                tracing::warn!("Request rejected: {}", self);
                self.to_string()
            }
            _ => {
                tracing::debug!("Request failed: {}", self);
                self.to_string()
            }
        };

        let body = sonic_rs::to_string(&sonic_rs::json!({
            "code": self.code(),
            "msg": message,
            "body": null,
        }))
        .unwrap_or_else(|_| r#"{"code":-15,"msg":"Internal server error","body":null}"#.to_string());

        (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
    }
}
