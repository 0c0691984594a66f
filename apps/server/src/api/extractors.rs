//! Custom Axum extractors.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::json;

/// JSON body extractor whose rejections use the API's error envelope
/// instead of axum's plain-text defaults.
pub struct JsonBody<T>(pub T);

pub struct JsonBodyRejection {
    message: String,
}

impl IntoResponse for JsonBodyRejection {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "message": self.message,
        }));
        (StatusCode::BAD_REQUEST, body).into_response()
    }
}

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = JsonBodyRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| JsonBodyRejection {
                message: format!("Failed to read request body: {e}"),
            })?;

        let value = serde_json::from_slice(&bytes).map_err(|e| JsonBodyRejection {
            message: format!("Invalid request body: {e}"),
        })?;

        Ok(JsonBody(value))
    }
}
