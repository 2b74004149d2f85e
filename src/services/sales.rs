use crate::{
    db::{with_transaction, DbPool},
    entities::{
        product::Entity as Product,
        sale_transaction::{self, Entity as SaleTransaction, LineItems, SaleLineItem, SNAPSHOT_VERSION},
    },
    errors::ServiceError,
    services::ledger,
};
use chrono::Utc;
use chrono_tz::Tz;
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::{Validate, ValidationError};

/// Largest page `list_sales` will return.
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLineRequest {
    pub product_id: i32,
    pub quantity: i32,
}

/// A point-of-sale checkout.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecordSaleRequest {
    #[validate(range(min = 1, message = "user is required"))]
    pub user_id: i32,
    #[validate(
        length(min = 1, message = "a sale needs at least one item"),
        custom = "validate_lines"
    )]
    pub items: Vec<SaleLineRequest>,
}

fn validate_lines(lines: &[SaleLineRequest]) -> Result<(), ValidationError> {
    if let Some(line) = lines.iter().find(|l| l.product_id < 1 || l.quantity < 1) {
        let mut err = ValidationError::new("items");
        err.message = Some(
            format!(
                "product {} has invalid quantity {}",
                line.product_id, line.quantity
            )
            .into(),
        );
        return Err(err);
    }
    Ok(())
}

/// Sale and sale reversal workflows.
#[derive(Clone)]
pub struct SaleService {
    db_pool: Arc<DbPool>,
    timezone: Tz,
}

impl SaleService {
    /// `timezone` stamps the snapshot and the sale record.
    pub fn new(db_pool: Arc<DbPool>, timezone: Tz) -> Self {
        Self { db_pool, timezone }
    }

    /// Checks stock, snapshots the sold products and decrements their
    /// quantities, all in one transaction.
    ///
    /// The upfront availability check only produces the early error; the
    /// conditional decrement is what rejects a concurrent oversell.
    #[instrument(skip(self, request), fields(user_id = request.user_id, lines = request.items.len()))]
    pub async fn record_sale(
        &self,
        request: RecordSaleRequest,
    ) -> Result<sale_transaction::Model, ServiceError> {
        request.validate()?;

        let tz = self.timezone;
        let result = with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move { checkout(txn, request, tz).await })
        })
        .await;

        match &result {
            Ok(sale) => {
                counter!("pharmacy_inventory.sales", 1);
                info!(
                    sale_id = sale.id,
                    total = %sale.total(),
                    "Sale recorded"
                );
            }
            Err(e @ ServiceError::InsufficientStock { .. }) => {
                counter!("pharmacy_inventory.insufficient_stock", 1, "operation" => "record_sale");
                warn!(error = %e, "Sale rejected");
            }
            Err(e) => warn!(error = %e, "Sale failed"),
        }

        result
    }

    /// Returns every snapshotted line to stock and deletes the sale.
    #[instrument(skip(self))]
    pub async fn reverse_sale(&self, sale_id: i32) -> Result<sale_transaction::Model, ServiceError> {
        let result = with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move { refund(txn, sale_id).await })
        })
        .await;

        match &result {
            Ok(sale) => {
                counter!("pharmacy_inventory.sale_reversals", 1);
                info!(units = sale.units(), "Sale reversed");
            }
            Err(e) => warn!(error = %e, "Sale reversal failed"),
        }

        result
    }

    #[instrument(skip(self))]
    pub async fn get_sale(&self, sale_id: i32) -> Result<sale_transaction::Model, ServiceError> {
        SaleTransaction::find_by_id(sale_id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("sale", sale_id))
    }

    /// One page of sales, newest first, plus the total number of sales.
    ///
    /// `page` is 1-based; values below 1 read the first page. `limit` is
    /// clamped to `1..=MAX_PAGE_SIZE`.
    #[instrument(skip(self))]
    pub async fn list_sales(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<sale_transaction::Model>, u64), ServiceError> {
        let page = page.max(1);
        let limit = limit.clamp(1, MAX_PAGE_SIZE);

        let paginator = SaleTransaction::find()
            .order_by_desc(sale_transaction::Column::Id)
            .paginate(&*self.db_pool, limit);

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let sales = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((sales, total))
    }
}

async fn checkout<C>(
    txn: &C,
    request: RecordSaleRequest,
    tz: Tz,
) -> Result<sale_transaction::Model, ServiceError>
where
    C: ConnectionTrait,
{
    let sold_at = Utc::now().with_timezone(&tz).fixed_offset();
    let mut snapshot = Vec::with_capacity(request.items.len());

    for line in &request.items {
        let product = Product::find_by_id(line.product_id)
            .one(txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("product", line.product_id))?;

        if line.quantity > product.quantity {
            return Err(ServiceError::InsufficientStock {
                product_id: product.id,
                requested: line.quantity,
                available: product.quantity,
            });
        }

        snapshot.push(SaleLineItem {
            product_id: product.id,
            generic_name: product.generic_name,
            brand_name: product.brand_name,
            barcode: product.barcode,
            cost_price: product.cost_price,
            selling_price: product.selling_price,
            quantity: line.quantity,
            created_at: sold_at,
        });
    }

    for line in &request.items {
        ledger::decrement_quantity(txn, line.product_id, line.quantity).await?;
    }

    sale_transaction::ActiveModel {
        items: Set(LineItems::from(snapshot)),
        snapshot_version: Set(SNAPSHOT_VERSION),
        user_id: Set(request.user_id),
        created_at: Set(sold_at),
        ..Default::default()
    }
    .insert(txn)
    .await
    .map_err(ServiceError::db_error)
}

async fn refund<C>(txn: &C, sale_id: i32) -> Result<sale_transaction::Model, ServiceError>
where
    C: ConnectionTrait,
{
    let sale = SaleTransaction::find_by_id(sale_id)
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("sale", sale_id))?;

    if sale.snapshot_version > SNAPSHOT_VERSION {
        return Err(ServiceError::SerializationError(format!(
            "sale {} uses snapshot version {}, newest supported is {}",
            sale.id, sale.snapshot_version, SNAPSHOT_VERSION
        )));
    }

    for item in &sale.items {
        ledger::increment_quantity(txn, item.product_id, item.quantity).await?;
    }

    SaleTransaction::delete_by_id(sale.id)
        .exec(txn)
        .await
        .map_err(ServiceError::db_error)?;

    Ok(sale)
}
