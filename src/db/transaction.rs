/*!
 * Transaction Helper Utilities
 *
 * Every engine workflow is one unit of work against the store: it commits only
 * when the closure returns `Ok` and is rolled back on every other exit path.
 */

use crate::errors::ServiceError;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionError, TransactionTrait};
use std::future::Future;
use std::pin::Pin;

/// Type alias for boxed future used in transactions
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Execute a function within a database transaction
///
/// This helper ensures:
/// - Automatic rollback on error (including early `?` returns)
/// - Automatic commit on success
/// - The closure's own `ServiceError` reaches the caller unchanged
///
/// The closure must own everything it captures; the future it returns
/// may only borrow the transaction handle.
///
/// # Example
///
/// ```rust,ignore
/// use crate::db::transaction::with_transaction;
///
/// let id = with_transaction(&db, move |txn| {
///     Box::pin(async move {
///         ledger::decrement_quantity(txn, product_id, 2).await?;
///         let sale = sale_transaction::ActiveModel { .. }.insert(txn).await?;
///         Ok(sale.id)
///     })
/// })
/// .await?;
/// ```
pub async fn with_transaction<F, T>(db: &DatabaseConnection, f: F) -> Result<T, ServiceError>
where
    F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, ServiceError>> + Send,
    T: Send,
{
    db.transaction::<_, T, ServiceError>(f)
        .await
        .map_err(|e| match e {
            TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
            TransactionError::Transaction(service_err) => service_err,
        })
}
