//! `X-Idempotency-Key` extraction.
//!
//! Every submission route takes an [`IdempotencyHeader`]. A request without
//! the header, or with a value that is not a UUID, is rejected before the
//! body is read.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use courier_common::error::AppError;
use courier_common::requests::IDEMPOTENCY_HEADER;
use courier_common::types::IdempotencyKey;

/// Client-supplied idempotency key of the current request.
///
/// ```ignore
/// async fn handler(IdempotencyHeader(key): IdempotencyHeader) -> impl IntoResponse {
///     // key is the parsed UUID
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct IdempotencyHeader(pub IdempotencyKey);

impl<S> FromRequestParts<S> for IdempotencyHeader
where
    S: Send + Sync,
{
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let result = match parts.headers.get(IDEMPOTENCY_HEADER) {
            None => Err(AppError::MissingIdempotencyKey),
            Some(value) => value
                .to_str()
                .map_err(|_| AppError::InvalidIdempotencyKey("<non-ascii>".to_string()))
                .and_then(IdempotencyKey::parse)
                .map(IdempotencyHeader),
        };

        async move { result }
    }
}
