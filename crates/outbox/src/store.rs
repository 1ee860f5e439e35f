//! Durable store: a Postgres pool handing out explicit units of work.
//!
//! Every repository call takes the `UnitOfWork` it runs in as an argument.

use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use courier_common::error::AppError;

#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Open a transaction. Row locks taken inside it are held until
    /// [`UnitOfWork::commit`] or [`UnitOfWork::rollback`].
    pub async fn begin(&self) -> Result<UnitOfWork, AppError> {
        let tx = self.pool.begin().await?;
        Ok(UnitOfWork { tx })
    }
}

/// One open transaction. Dropping it without committing rolls it back.
pub struct UnitOfWork {
    tx: Transaction<'static, Postgres>,
}

impl UnitOfWork {
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut self.tx
    }

    pub async fn commit(self) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> Result<(), AppError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
