use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, FromJsonQueryResult};
use serde::{Deserialize, Serialize};

/// Snapshot layout written by this crate.
pub const SNAPSHOT_VERSION: i32 = 1;

/// A recorded point-of-sale transaction.
///
/// Sold products are captured only through the `items` snapshot; there is no
/// live join to `products`, so later product edits never rewrite history.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "Json")]
    pub items: LineItems,

    pub snapshot_version: i32,

    pub user_id: i32,

    /// Sale time in the store's time zone
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Amount charged for the whole sale.
    pub fn total(&self) -> Decimal {
        self.items.iter().map(SaleLineItem::subtotal).sum()
    }

    /// Units sold across all lines.
    pub fn units(&self) -> i64 {
        self.items.iter().map(|item| i64::from(item.quantity)).sum()
    }
}

/// Frozen view of one sold product.
///
/// The JSON shape is
/// `{product_id, generic_name, brand_name, barcode, cost_price, selling_price, quantity, created_at}`
/// with prices as JSON numbers. Older blobs that stored whole product rows use
/// `id` for the product and carry extra keys; both still decode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLineItem {
    #[serde(alias = "id")]
    pub product_id: i32,
    pub generic_name: String,
    pub brand_name: String,
    pub barcode: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub cost_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub selling_price: Decimal,
    pub quantity: i32,
    pub created_at: DateTime<FixedOffset>,
}

impl SaleLineItem {
    pub fn subtotal(&self) -> Decimal {
        self.selling_price * Decimal::from(self.quantity)
    }
}

/// Ordered line-item snapshot stored in `transactions.items`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct LineItems(pub Vec<SaleLineItem>);

impl LineItems {
    pub fn iter(&self) -> std::slice::Iter<'_, SaleLineItem> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<SaleLineItem>> for LineItems {
    fn from(items: Vec<SaleLineItem>) -> Self {
        Self(items)
    }
}

impl<'a> IntoIterator for &'a LineItems {
    type Item = &'a SaleLineItem;
    type IntoIter = std::slice::Iter<'a, SaleLineItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
