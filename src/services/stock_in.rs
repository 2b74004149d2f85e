use crate::{
    db::{with_transaction, DbPool},
    entities::{
        invoice::Entity as Invoice,
        stock_in::{self, Entity as StockIn},
    },
    errors::ServiceError,
    services::{expiry, ledger},
};
use chrono::NaiveDate;
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::{Validate, ValidationError};

/// Stock received against an invoice.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StockInRequest {
    #[validate(range(min = 1, message = "product reference is required"))]
    pub product_id: i32,
    #[validate(range(min = 1, message = "invoice reference is required"))]
    pub invoice_id: i32,
    #[validate(range(min = 1, message = "quantity must be positive"))]
    pub quantity: i32,
    #[validate(custom = "validate_positive_price")]
    pub cost_price: Decimal,
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub comment: String,
}

fn validate_positive_price(price: &Decimal) -> Result<(), ValidationError> {
    if *price > Decimal::ZERO {
        return Ok(());
    }
    let mut err = ValidationError::new("cost_price");
    err.message = Some("cost price must be positive".into());
    Err(err)
}

/// Stock-in and stock-in reversal workflows.
#[derive(Clone)]
pub struct StockInService {
    db_pool: Arc<DbPool>,
}

impl StockInService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Records a receipt and applies it to the product in one transaction.
    ///
    /// The expiry policy is chosen from the quantity on hand before the
    /// increment, read under a row lock.
    #[instrument(skip(self, request), fields(product_id = request.product_id, invoice_id = request.invoice_id, quantity = request.quantity))]
    pub async fn stock_in(&self, request: StockInRequest) -> Result<stock_in::Model, ServiceError> {
        request.validate()?;

        let result = with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move { receive(txn, request).await })
        })
        .await;

        match &result {
            Ok(record) => {
                counter!("pharmacy_inventory.stock_ins", 1);
                info!(
                    stock_in_id = record.id,
                    expiry_date = ?record.expiry_date,
                    "Stock-in recorded"
                );
            }
            Err(e) => warn!(error = %e, "Stock-in rejected"),
        }

        result
    }

    /// Undoes a stock-in: removes its units, deletes it, and drops its expiry
    /// date once no other stock-in of the product carries that date.
    #[instrument(skip(self))]
    pub async fn reverse_stock_in(&self, stock_in_id: i32) -> Result<stock_in::Model, ServiceError> {
        let result = with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move { reverse(txn, stock_in_id).await })
        })
        .await;

        match &result {
            Ok(record) => {
                counter!("pharmacy_inventory.stock_in_reversals", 1);
                info!(
                    product_id = record.product_id,
                    quantity = record.quantity,
                    "Stock-in reversed"
                );
            }
            Err(e @ ServiceError::InsufficientStock { .. }) => {
                counter!("pharmacy_inventory.insufficient_stock", 1, "operation" => "reverse_stock_in");
                warn!(error = %e, "Stock-in reversal rejected");
            }
            Err(e) => warn!(error = %e, "Stock-in reversal failed"),
        }

        result
    }

    #[instrument(skip(self))]
    pub async fn get_stock_in(&self, stock_in_id: i32) -> Result<stock_in::Model, ServiceError> {
        StockIn::find_by_id(stock_in_id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("stock-in", stock_in_id))
    }

    /// Stock-ins received against `invoice_id`, oldest first.
    #[instrument(skip(self))]
    pub async fn invoice_stock_ins(&self, invoice_id: i32) -> Result<Vec<stock_in::Model>, ServiceError> {
        let db = &*self.db_pool;

        Invoice::find_by_id(invoice_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("invoice", invoice_id))?;

        StockIn::find()
            .filter(stock_in::Column::InvoiceId.eq(invoice_id))
            .order_by_asc(stock_in::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }
}

async fn receive<C>(txn: &C, request: StockInRequest) -> Result<stock_in::Model, ServiceError>
where
    C: ConnectionTrait,
{
    let product = ledger::lock_product(txn, request.product_id).await?;

    Invoice::find_by_id(request.invoice_id)
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("invoice", request.invoice_id))?;

    let record = stock_in::ActiveModel {
        product_id: Set(product.id),
        invoice_id: Set(request.invoice_id),
        quantity: Set(request.quantity),
        cost_price: Set(request.cost_price),
        expiry_date: Set(request.expiry_date),
        comment: Set(request.comment),
        ..Default::default()
    }
    .insert(txn)
    .await
    .map_err(ServiceError::db_error)?;

    expiry::apply_stock_in_expiry(txn, &product, request.expiry_date).await?;
    ledger::increment_quantity(txn, product.id, request.quantity).await?;

    Ok(record)
}

async fn reverse<C>(txn: &C, stock_in_id: i32) -> Result<stock_in::Model, ServiceError>
where
    C: ConnectionTrait,
{
    let record = StockIn::find_by_id(stock_in_id)
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("stock-in", stock_in_id))?;

    ledger::decrement_quantity(txn, record.product_id, record.quantity).await?;

    StockIn::delete_by_id(record.id)
        .exec(txn)
        .await
        .map_err(ServiceError::db_error)?;

    if let Some(date) = record.expiry_date {
        let still_carried = StockIn::find()
            .filter(stock_in::Column::ProductId.eq(record.product_id))
            .filter(stock_in::Column::ExpiryDate.eq(date))
            .count(txn)
            .await
            .map_err(ServiceError::db_error)?;

        if still_carried == 0 {
            expiry::remove_expiry_date(txn, record.product_id, date).await?;
        }
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request() -> StockInRequest {
        StockInRequest {
            product_id: 1,
            invoice_id: 1,
            quantity: 5,
            cost_price: dec!(1200),
            expiry_date: None,
            comment: String::new(),
        }
    }

    #[test]
    fn accepts_well_formed_request() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_fields() {
        let mut bad = request();
        bad.quantity = 0;
        bad.invoice_id = 0;
        bad.cost_price = dec!(0);
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("quantity"));
        assert!(fields.contains_key("invoice_id"));
        assert!(fields.contains_key("cost_price"));

        let mut negative = request();
        negative.cost_price = dec!(-5);
        assert!(negative.validate().is_err());
    }

    #[test]
    fn comment_defaults_to_empty() {
        let parsed: StockInRequest = serde_json::from_str(
            r#"{"product_id":1,"invoice_id":2,"quantity":3,"cost_price":"10.00","expiry_date":"2025-06-01"}"#,
        )
        .unwrap();
        assert_eq!(parsed.comment, "");
        assert_eq!(parsed.expiry_date, NaiveDate::from_ymd_opt(2025, 6, 1));
    }
}
