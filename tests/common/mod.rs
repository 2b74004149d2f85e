#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use pharmacy_inventory::{
    db::{self, DbConfig, DbPool},
    entities::{
        invoice, product,
        product::ExpiryDates,
        sale_transaction::Entity as SaleTransaction,
        stock_in::Entity as StockIn,
    },
    InventoryEngine, SaleLineRequest,
};
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};

/// Engine backed by a fresh, migrated SQLite database.
///
/// The pool holds a single connection: the in-memory database lives only as
/// long as that connection, and concurrent transactions queue on it.
pub struct TestStore {
    pub engine: InventoryEngine,
    pub db: Arc<DbPool>,
}

impl TestStore {
    pub async fn new() -> Self {
        Self::connect("sqlite::memory:".to_string(), 1).await
    }

    /// Store on a database file under `dir`, asking for a pool the size the
    /// shipped configuration uses.
    pub async fn file_backed(dir: &Path) -> Self {
        let url = format!("sqlite://{}?mode=rwc", dir.join("pharmacy.db").display());
        Self::connect(url, 10).await
    }

    async fn connect(url: String, max_connections: u32) -> Self {
        let pool = db::establish_connection_with_config(&DbConfig {
            url,
            max_connections,
            min_connections: 1,
            ..Default::default()
        })
        .await
        .expect("failed to create test database");

        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db = Arc::new(pool);
        let engine = InventoryEngine::new(db.clone(), chrono_tz::Africa::Kampala);
        Self { engine, db }
    }

    /// Inserts a product with the given stock and expiry set.
    pub async fn seed_product(&self, barcode: &str, quantity: i32, expiry: &[NaiveDate]) -> product::Model {
        product::ActiveModel {
            generic_name: Set(format!("Generic {barcode}")),
            brand_name: Set(format!("Brand {barcode}")),
            quantity: Set(quantity),
            cost_price: Set(dec!(800)),
            selling_price: Set(dec!(1000)),
            expiry_dates: Set(ExpiryDates::from(expiry.to_vec())),
            barcode: Set(barcode.to_string()),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .expect("failed to seed product")
    }

    pub async fn seed_invoice(&self, number: &str) -> invoice::Model {
        invoice::ActiveModel {
            invoice_number: Set(number.to_string()),
            purchase_date: Set(date(2024, 3, 1)),
            invoice_total: Set(dec!(50000)),
            amount_paid: Set(dec!(20000)),
            balance: Set(dec!(30000)),
            supplier: Set("Quality Chemicals".to_string()),
            user_id: Set(1),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .expect("failed to seed invoice")
    }

    pub async fn quantity(&self, product_id: i32) -> i32 {
        self.engine
            .current_quantity(product_id)
            .await
            .expect("failed to read quantity")
    }

    pub async fn expiry(&self, product_id: i32) -> Vec<NaiveDate> {
        self.engine
            .expiry_dates(product_id)
            .await
            .expect("failed to read expiry dates")
            .as_slice()
            .to_vec()
    }

    pub async fn stock_in(
        &self,
        product_id: i32,
        invoice_id: i32,
        quantity: i32,
        expiry: Option<NaiveDate>,
    ) -> i32 {
        self.engine
            .stock_in(product_id, invoice_id, quantity, dec!(750), expiry)
            .await
            .expect("stock-in should succeed")
    }

    pub async fn sale_count(&self) -> u64 {
        SaleTransaction::find()
            .count(&*self.db)
            .await
            .expect("failed to count sales")
    }

    pub async fn stock_in_count(&self) -> u64 {
        StockIn::find()
            .count(&*self.db)
            .await
            .expect("failed to count stock-ins")
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn line(product_id: i32, quantity: i32) -> SaleLineRequest {
    SaleLineRequest {
        product_id,
        quantity,
    }
}
