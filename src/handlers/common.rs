use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde::Serialize;
use crate::error::AppError;

/// The envelope every successful response is wrapped in.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub msg: String,
    pub body: T,
}

/// Wraps `body` in a success envelope.
pub fn ok<T: Serialize>(body: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code: 0,
        msg: String::new(),
        body,
    })
}

/// `axum::Json` whose rejections render as `InputMalformed` envelopes.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!("Rejected request body: {}", rejection.body_text());
                Err(AppError::InputMalformed(rejection.body_text()))
            }
        }
    }
}
