//! Idempotent outbox: the transactional write path for notifications and
//! typed access to the outbox tables.

pub mod guard;
pub mod intake;
pub mod repository;
pub mod store;

pub use guard::{Admission, IdempotencyGuard};
pub use intake::IntakeService;
pub use repository::{IdempotencyRepository, NotificationRepository};
pub use store::{Store, UnitOfWork};
