pub mod idempotency;
pub mod json_body;
