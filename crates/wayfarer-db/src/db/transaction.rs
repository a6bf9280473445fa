//! Database transaction utilities
//!
//! Multi-row operations (conversion, enquiry intake, payout batching) run
//! inside a single transaction so a failure part-way leaves no partial writes.

use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use wayfarer_core::AppError;

/// A database transaction that is rolled back unless explicitly committed.
///
/// Dropping the guard without calling [`TransactionGuard::commit`] discards
/// every statement executed through it.
///
/// # Example
///
/// ```ignore
/// use wayfarer_db::TransactionGuard;
///
/// async fn example(pool: &sqlx::PgPool) -> Result<(), wayfarer_core::AppError> {
///     let mut tx = TransactionGuard::begin(pool, "example").await?;
///     sqlx::query("INSERT INTO ...").execute(tx.conn()).await?;
///     tx.commit().await
/// }
/// ```
pub struct TransactionGuard {
    transaction: Transaction<'static, Postgres>,
    operation: &'static str,
}

impl TransactionGuard {
    /// Begin a new database transaction labelled with the operation it serves
    pub async fn begin(pool: &PgPool, operation: &'static str) -> Result<Self, AppError> {
        let transaction = pool.begin().await.map_err(|e| {
            tracing::error!(error = %e, operation, "Failed to begin database transaction");
            AppError::Database(e)
        })?;

        Ok(Self {
            transaction,
            operation,
        })
    }

    /// Connection to execute statements on.
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut self.transaction
    }

    /// Commit the transaction
    pub async fn commit(self) -> Result<(), AppError> {
        let operation = self.operation;
        self.transaction.commit().await.map_err(|e| {
            tracing::error!(error = %e, operation, "Failed to commit database transaction");
            AppError::Database(e)
        })?;
        tracing::debug!(operation, "Transaction committed");
        Ok(())
    }

    /// Roll back explicitly; equivalent to dropping the guard but surfaces errors.
    pub async fn rollback(self) -> Result<(), AppError> {
        let operation = self.operation;
        self.transaction.rollback().await.map_err(|e| {
            tracing::warn!(error = %e, operation, "Failed to roll back database transaction");
            AppError::Database(e)
        })?;
        tracing::debug!(operation, "Transaction rolled back");
        Ok(())
    }
}
