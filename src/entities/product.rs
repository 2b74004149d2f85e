use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, ActiveValue::Set, ConnectionTrait, FromJsonQueryResult};
use serde::{Deserialize, Serialize};

/// Product entity: the single source of truth for on-hand quantity and expiry state
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Primary key
    #[sea_orm(primary_key)]
    pub id: i32,

    pub generic_name: String,

    pub brand_name: String,

    /// On-hand units, never negative
    pub quantity: i32,

    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub cost_price: Decimal,

    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub selling_price: Decimal,

    /// Expiry dates of the stock currently on the shelf
    #[sea_orm(column_type = "Json")]
    pub expiry_dates: ExpiryDates,

    #[sea_orm(unique)]
    pub barcode: String,

    /// Creation timestamp
    pub created_at: DateTimeUtc,

    /// Last update timestamp
    pub updated_at: DateTimeUtc,
}

/// Product entity relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::stock_in::Entity")]
    StockIns,
}

impl Related<super::stock_in::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockIns.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            if let ActiveValue::NotSet = active_model.expiry_dates {
                active_model.expiry_dates = Set(ExpiryDates::default());
            }
            if let ActiveValue::NotSet = active_model.quantity {
                active_model.quantity = Set(0);
            }
            active_model.created_at = Set(now);
        }

        active_model.updated_at = Set(now);
        Ok(active_model)
    }
}

/// Ascending, duplicate-free set of expiry dates stored as a JSON array.
///
/// Stored arrays written by older code may be unsorted or contain repeats;
/// they are normalized on read.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(from = "Vec<NaiveDate>", into = "Vec<NaiveDate>")]
pub struct ExpiryDates(Vec<NaiveDate>);

impl ExpiryDates {
    pub fn single(date: NaiveDate) -> Self {
        Self(vec![date])
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.0.binary_search(&date).is_ok()
    }

    /// Adds `date` unless already present. Returns whether the set changed.
    pub fn insert(&mut self, date: NaiveDate) -> bool {
        match self.0.binary_search(&date) {
            Ok(_) => false,
            Err(pos) => {
                self.0.insert(pos, date);
                true
            }
        }
    }

    /// Removes `date` if present. Returns whether the set changed.
    pub fn remove(&mut self, date: NaiveDate) -> bool {
        match self.0.binary_search(&date) {
            Ok(pos) => {
                self.0.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Replaces the whole set with `date`. Returns whether the set changed.
    pub fn replace_with(&mut self, date: NaiveDate) -> bool {
        if self.0.len() == 1 && self.0[0] == date {
            return false;
        }
        self.0 = vec![date];
        true
    }

    /// Earliest date on the shelf
    pub fn earliest(&self) -> Option<NaiveDate> {
        self.0.first().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NaiveDate> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[NaiveDate] {
        &self.0
    }
}

impl From<Vec<NaiveDate>> for ExpiryDates {
    fn from(mut dates: Vec<NaiveDate>) -> Self {
        dates.sort_unstable();
        dates.dedup();
        Self(dates)
    }
}

impl From<ExpiryDates> for Vec<NaiveDate> {
    fn from(dates: ExpiryDates) -> Self {
        dates.0
    }
}

impl FromIterator<NaiveDate> for ExpiryDates {
    fn from_iter<I: IntoIterator<Item = NaiveDate>>(iter: I) -> Self {
        iter.into_iter().collect::<Vec<_>>().into()
    }
}
