use axum::{
    extract::{FromRequest, Request},
    Json,
};

use crate::handlers::explain::ExplainError;

/// JSON extractor whose rejections use the proxy's `{error, details}` body
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: serde::de::DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = ExplainError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => {
                let message = format!("Failed to parse JSON request body: {}", rejection.body_text());
                tracing::warn!("{}", message);
                Err(ExplainError::InvalidBody(message))
            }
        }
    }
}
