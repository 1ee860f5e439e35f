//! JSON request bodies with rejections in the API's error shape.
//!
//! `axum::Json` answers a bad body with a plain-text rejection. [`JsonBody`]
//! turns it into `AppError::Validation`, so clients always get
//! `{"error": "..."}` with a 400.

use axum::Json;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;

use courier_common::error::AppError;

/// Deserialized JSON body of the current request.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    fn from_request(
        req: Request,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let extracted = Json::<T>::from_request(req, state);

        async move {
            match extracted.await {
                Ok(Json(value)) => Ok(JsonBody(value)),
                Err(rejection) => {
                    tracing::debug!(status = %rejection.status(), "Rejected request body");
                    Err(AppError::Validation(rejection.body_text()))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use courier_common::requests::SendSmsRequest;

    async fn extract(content_type: &str, body: &str) -> Result<SendSmsRequest, AppError> {
        let req = Request::builder()
            .method("POST")
            .uri("/api/notifications/sms")
            .header("content-type", content_type)
            .body(Body::from(body.to_string()))
            .unwrap();
        JsonBody::<SendSmsRequest>::from_request(req, &())
            .await
            .map(|JsonBody(value)| value)
    }

    #[tokio::test]
    async fn test_valid_body_is_parsed() {
        let req = extract(
            "application/json",
            r#"{"message": "Hi", "send_to": "+15550001111"}"#,
        )
        .await
        .unwrap();
        assert_eq!(req.message, "Hi");
        assert_eq!(req.send_to, "+15550001111");
    }

    #[tokio::test]
    async fn test_syntax_error_is_validation() {
        assert!(matches!(
            extract("application/json", r#"{"message": "Hi""#).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_field_names_the_field() {
        match extract("application/json", r#"{"message": "Hi"}"#).await {
            Err(AppError::Validation(msg)) => assert!(msg.contains("send_to"), "{}", msg),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wrong_content_type_is_validation() {
        assert!(matches!(
            extract("text/plain", r#"{"message": "Hi", "send_to": "+15550001111"}"#).await,
            Err(AppError::Validation(_))
        ));
    }
}
