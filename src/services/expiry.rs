//! Expiry set manager.
//!
//! A product's expiry set follows the stock on its shelf: restocking an empty
//! shelf starts a fresh set, restocking a non-empty one adds to it.

use crate::{
    entities::product::{self, Entity as Product, ExpiryDates},
    errors::ServiceError,
    services::ledger,
};
use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, QuerySelect, Set};
use tracing::debug;

/// What a stock-in does to the receiving product's expiry set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryPolicy {
    /// Shelf was empty: discard leftover dates, keep only the new one.
    Replace(NaiveDate),
    /// Shelf had stock: add the date unless already present.
    Append(NaiveDate),
    /// No expiry date on the stock-in.
    Unchanged,
}

impl ExpiryPolicy {
    /// Chooses the policy from the quantity on hand *before* the stock-in.
    pub fn for_stock_in(on_hand: i32, incoming: Option<NaiveDate>) -> Self {
        match incoming {
            None => ExpiryPolicy::Unchanged,
            Some(date) if on_hand <= 0 => ExpiryPolicy::Replace(date),
            Some(date) => ExpiryPolicy::Append(date),
        }
    }

    /// Applies the policy in place. Returns whether the set changed.
    pub fn apply(self, dates: &mut ExpiryDates) -> bool {
        match self {
            ExpiryPolicy::Replace(date) => dates.replace_with(date),
            ExpiryPolicy::Append(date) => dates.insert(date),
            ExpiryPolicy::Unchanged => false,
        }
    }
}

/// Current expiry set of `product_id`.
pub async fn expiry_dates<C>(db: &C, product_id: i32) -> Result<ExpiryDates, ServiceError>
where
    C: ConnectionTrait,
{
    Product::find_by_id(product_id)
        .select_only()
        .column(product::Column::ExpiryDates)
        .into_tuple::<ExpiryDates>()
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("product", product_id))
}

/// Applies the stock-in policy to `product`, which must have been read under
/// lock in the current transaction, and persists the result if it changed.
pub async fn apply_stock_in_expiry<C>(
    db: &C,
    product: &product::Model,
    incoming: Option<NaiveDate>,
) -> Result<ExpiryDates, ServiceError>
where
    C: ConnectionTrait,
{
    let policy = ExpiryPolicy::for_stock_in(product.quantity, incoming);
    let mut dates = product.expiry_dates.clone();

    if policy.apply(&mut dates) {
        debug!(product_id = product.id, ?policy, "expiry set changed");
        store(db, product.id, dates.clone()).await?;
    }

    Ok(dates)
}

/// Removes `date` from the product's expiry set. Absent dates are a no-op.
/// Returns whether the set changed.
pub async fn remove_expiry_date<C>(
    db: &C,
    product_id: i32,
    date: NaiveDate,
) -> Result<bool, ServiceError>
where
    C: ConnectionTrait,
{
    let product = ledger::lock_product(db, product_id).await?;
    let mut dates = product.expiry_dates;

    if !dates.remove(date) {
        return Ok(false);
    }

    debug!(product_id, %date, "expiry date removed");
    store(db, product_id, dates).await?;
    Ok(true)
}

async fn store<C>(db: &C, product_id: i32, dates: ExpiryDates) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    product::ActiveModel {
        id: Set(product_id),
        expiry_dates: Set(dates),
        ..Default::default()
    }
    .update(db)
    .await
    .map_err(ServiceError::db_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn policy_depends_on_pre_stock_in_quantity() {
        assert_eq!(
            ExpiryPolicy::for_stock_in(0, Some(d(2025, 6, 1))),
            ExpiryPolicy::Replace(d(2025, 6, 1))
        );
        assert_eq!(
            ExpiryPolicy::for_stock_in(-2, Some(d(2025, 6, 1))),
            ExpiryPolicy::Replace(d(2025, 6, 1))
        );
        assert_eq!(
            ExpiryPolicy::for_stock_in(10, Some(d(2025, 6, 1))),
            ExpiryPolicy::Append(d(2025, 6, 1))
        );
        assert_eq!(ExpiryPolicy::for_stock_in(0, None), ExpiryPolicy::Unchanged);
        assert_eq!(ExpiryPolicy::for_stock_in(10, None), ExpiryPolicy::Unchanged);
    }

    #[test]
    fn replace_discards_stale_dates() {
        let mut dates = ExpiryDates::single(d(2024, 1, 1));
        assert!(ExpiryPolicy::for_stock_in(0, Some(d(2025, 6, 1))).apply(&mut dates));
        assert_eq!(dates.as_slice(), &[d(2025, 6, 1)]);
    }

    #[test]
    fn append_has_set_semantics() {
        let mut dates = ExpiryDates::single(d(2025, 6, 1));
        assert!(!ExpiryPolicy::for_stock_in(10, Some(d(2025, 6, 1))).apply(&mut dates));
        assert_eq!(dates.as_slice(), &[d(2025, 6, 1)]);

        assert!(ExpiryPolicy::for_stock_in(10, Some(d(2025, 9, 1))).apply(&mut dates));
        assert_eq!(dates.as_slice(), &[d(2025, 6, 1), d(2025, 9, 1)]);
    }

    fn arb_date() -> impl Strategy<Value = NaiveDate> {
        (0i64..3650).prop_map(|offset| d(2020, 1, 1) + chrono::Duration::days(offset))
    }

    proptest! {
        #[test]
        fn expiry_set_stays_sorted_and_unique(
            start in proptest::collection::vec(arb_date(), 0..8),
            steps in proptest::collection::vec((-5i32..20, proptest::option::of(arb_date())), 0..20),
        ) {
            let mut dates: ExpiryDates = start.into();
            for (on_hand, incoming) in steps {
                let before = dates.clone();
                let policy = ExpiryPolicy::for_stock_in(on_hand, incoming);
                policy.apply(&mut dates);

                let slice = dates.as_slice();
                prop_assert!(slice.windows(2).all(|w| w[0] < w[1]));

                match policy {
                    ExpiryPolicy::Replace(date) => prop_assert_eq!(slice, &[date][..]),
                    ExpiryPolicy::Append(date) => {
                        prop_assert!(dates.contains(date));
                        prop_assert!(before.iter().all(|old| dates.contains(*old)));
                    }
                    ExpiryPolicy::Unchanged => prop_assert_eq!(&dates, &before),
                }
            }
        }

        #[test]
        fn remove_after_insert_restores_set(
            start in proptest::collection::vec(arb_date(), 0..8),
            date in arb_date(),
        ) {
            let original: ExpiryDates = start.into();
            prop_assume!(!original.contains(date));
            let mut dates = original.clone();
            dates.insert(date);
            dates.remove(date);
            prop_assert_eq!(dates, original);
        }
    }
}
