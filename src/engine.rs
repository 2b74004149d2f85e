use std::sync::Arc;

use chrono::NaiveDate;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use tracing::instrument;

use crate::{
    config::AppConfig,
    db::{self, DbPool},
    entities::{product::ExpiryDates, sale_transaction, stock_in},
    errors::ServiceError,
    services::{
        expiry, ledger, RecordSaleRequest, SaleLineRequest, SaleService, StockInRequest,
        StockInService,
    },
};

/// Inventory consistency engine.
///
/// Holds its own store handle and store time zone; nothing is global. Every
/// mutating call is one transaction that either commits completely or leaves
/// the store untouched. Cloning is cheap and shares the pool.
#[derive(Clone)]
pub struct InventoryEngine {
    db_pool: Arc<DbPool>,
    stock_ins: StockInService,
    sales: SaleService,
}

impl InventoryEngine {
    /// Engine over an existing pool, stamping sales in `timezone`.
    pub fn new(db_pool: Arc<DbPool>, timezone: Tz) -> Self {
        Self {
            stock_ins: StockInService::new(db_pool.clone()),
            sales: SaleService::new(db_pool.clone(), timezone),
            db_pool,
        }
    }

    /// Connects with the configured pool settings and migrates when
    /// `auto_migrate` is set.
    pub async fn from_config(cfg: &AppConfig) -> Result<Self, ServiceError> {
        let timezone = cfg
            .timezone()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        let pool = db::establish_connection_from_app_config(cfg).await?;
        if cfg.auto_migrate {
            db::run_migrations(&pool).await?;
        }
        Ok(Self::new(Arc::new(pool), timezone))
    }

    /// Shared handle to the underlying pool.
    pub fn db_pool(&self) -> &Arc<DbPool> {
        &self.db_pool
    }

    /// Receives stock against an invoice. Returns the new stock-in id.
    pub async fn stock_in(
        &self,
        product_id: i32,
        invoice_id: i32,
        quantity: i32,
        cost_price: Decimal,
        expiry_date: Option<NaiveDate>,
    ) -> Result<i32, ServiceError> {
        let record = self
            .stock_ins
            .stock_in(StockInRequest {
                product_id,
                invoice_id,
                quantity,
                cost_price,
                expiry_date,
                comment: String::new(),
            })
            .await?;
        Ok(record.id)
    }

    /// Full-form stock-in, including the free-text comment.
    pub async fn stock_in_with(&self, request: StockInRequest) -> Result<stock_in::Model, ServiceError> {
        self.stock_ins.stock_in(request).await
    }

    /// Undoes a stock-in: takes its units back off the shelf and drops its
    /// expiry date unless another stock-in of the product shares it.
    pub async fn reverse_stock_in(&self, stock_in_id: i32) -> Result<(), ServiceError> {
        self.stock_ins.reverse_stock_in(stock_in_id).await?;
        Ok(())
    }

    /// Records a multi-line sale atomically, snapshotting each product as sold.
    pub async fn record_sale(
        &self,
        user_id: i32,
        items: Vec<SaleLineRequest>,
    ) -> Result<sale_transaction::Model, ServiceError> {
        self.sales
            .record_sale(RecordSaleRequest { user_id, items })
            .await
    }

    /// Restores every quantity of a recorded sale and deletes it.
    pub async fn reverse_sale(&self, sale_id: i32) -> Result<(), ServiceError> {
        self.sales.reverse_sale(sale_id).await?;
        Ok(())
    }

    /// On-hand units of a product.
    #[instrument(skip(self))]
    pub async fn current_quantity(&self, product_id: i32) -> Result<i32, ServiceError> {
        ledger::current_quantity(&*self.db_pool, product_id).await
    }

    /// Distinct expiry dates of a product, earliest first.
    #[instrument(skip(self))]
    pub async fn expiry_dates(&self, product_id: i32) -> Result<ExpiryDates, ServiceError> {
        expiry::expiry_dates(&*self.db_pool, product_id).await
    }

    /// Fetches one stock-in record.
    pub async fn get_stock_in(&self, stock_in_id: i32) -> Result<stock_in::Model, ServiceError> {
        self.stock_ins.get_stock_in(stock_in_id).await
    }

    /// Stock-ins received against an invoice.
    pub async fn invoice_stock_ins(&self, invoice_id: i32) -> Result<Vec<stock_in::Model>, ServiceError> {
        self.stock_ins.invoice_stock_ins(invoice_id).await
    }

    /// Fetches one recorded sale with its snapshot.
    pub async fn get_sale(&self, sale_id: i32) -> Result<sale_transaction::Model, ServiceError> {
        self.sales.get_sale(sale_id).await
    }

    /// One page of sales, newest first, with the total count.
    pub async fn list_sales(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<sale_transaction::Model>, u64), ServiceError> {
        self.sales.list_sales(page, limit).await
    }
}
