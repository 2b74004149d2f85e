//! Stock ledger primitives.
//!
//! Every function takes any [`ConnectionTrait`] so the same code runs against the
//! pool for reads and against an open transaction inside a workflow. Writes go
//! through single conditional statements rather than read-modify-write, so two
//! transactions decrementing the same product serialize on the row.

use crate::{
    entities::product::{self, Entity as Product},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{sea_query::Expr, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect};
use tracing::debug;

/// On-hand units of `product_id`.
pub async fn current_quantity<C>(db: &C, product_id: i32) -> Result<i32, ServiceError>
where
    C: ConnectionTrait,
{
    Product::find_by_id(product_id)
        .select_only()
        .column(product::Column::Quantity)
        .into_tuple::<i32>()
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("product", product_id))
}

/// Reads the product row under an exclusive row lock (`SELECT ... FOR UPDATE`).
///
/// The lock is held until the surrounding transaction ends. SQLite has no row
/// locks; there the database-wide write lock gives the same exclusion.
pub async fn lock_product<C>(db: &C, product_id: i32) -> Result<product::Model, ServiceError>
where
    C: ConnectionTrait,
{
    Product::find_by_id(product_id)
        .lock_exclusive()
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("product", product_id))
}

/// Adds `delta` units to the product. No upper bound.
pub async fn increment_quantity<C>(db: &C, product_id: i32, delta: i32) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    if delta < 0 {
        return Err(ServiceError::ValidationError(format!(
            "increment must not be negative, got {}",
            delta
        )));
    }

    let res = Product::update_many()
        .col_expr(
            product::Column::Quantity,
            Expr::col(product::Column::Quantity).add(delta),
        )
        .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(product::Column::Id.eq(product_id))
        .exec(db)
        .await
        .map_err(ServiceError::db_error)?;

    if res.rows_affected == 0 {
        return Err(ServiceError::not_found("product", product_id));
    }

    debug!(product_id, delta, "incremented quantity");
    Ok(())
}

/// Removes `delta` units from the product, refusing to go below zero.
///
/// The non-negativity check is part of the `UPDATE` predicate, so it holds at
/// write time regardless of what the caller read earlier.
pub async fn decrement_quantity<C>(db: &C, product_id: i32, delta: i32) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    if delta < 0 {
        return Err(ServiceError::ValidationError(format!(
            "decrement must not be negative, got {}",
            delta
        )));
    }

    let res = Product::update_many()
        .col_expr(
            product::Column::Quantity,
            Expr::col(product::Column::Quantity).sub(delta),
        )
        .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(product::Column::Id.eq(product_id))
        .filter(product::Column::Quantity.gte(delta))
        .exec(db)
        .await
        .map_err(ServiceError::db_error)?;

    if res.rows_affected == 0 {
        // Either the row is gone or the guard rejected the update.
        let available = current_quantity(db, product_id).await?;
        return Err(ServiceError::InsufficientStock {
            product_id,
            requested: delta,
            available,
        });
    }

    debug!(product_id, delta, "decremented quantity");
    Ok(())
}
