mod common;

use assert_matches::assert_matches;
use common::{line, TestStore};
use pharmacy_inventory::{
    entities::sale_transaction::{self, SaleLineItem},
    ErrorKind, ServiceError, SNAPSHOT_VERSION,
};
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DbBackend, EntityTrait, Set, Statement};

#[tokio::test]
async fn sale_decrements_stock_and_snapshots_products() {
    let store = TestStore::new().await;
    let a = store.seed_product("7001", 10, &[]).await;
    let b = store.seed_product("7002", 3, &[]).await;

    let sale = store
        .engine
        .record_sale(42, vec![line(a.id, 4), line(b.id, 3)])
        .await
        .unwrap();

    assert_eq!(store.quantity(a.id).await, 6);
    assert_eq!(store.quantity(b.id).await, 0);

    assert_eq!(sale.user_id, 42);
    assert_eq!(sale.snapshot_version, SNAPSHOT_VERSION);
    assert_eq!(sale.items.len(), 2);
    let first: &SaleLineItem = sale.items.iter().next().unwrap();
    assert_eq!(first.product_id, a.id);
    assert_eq!(first.generic_name, a.generic_name);
    assert_eq!(first.brand_name, a.brand_name);
    assert_eq!(first.barcode, "7001");
    assert_eq!(first.cost_price, dec!(800));
    assert_eq!(first.selling_price, dec!(1000));
    assert_eq!(first.quantity, 4);
    assert_eq!(sale.total(), dec!(7000));

    // Stamped in the store's zone (East Africa Time, UTC+3).
    assert_eq!(first.created_at.offset().local_minus_utc(), 3 * 3600);
    assert_eq!(sale.created_at, first.created_at);

    let stored = store.engine.get_sale(sale.id).await.unwrap();
    assert_eq!(stored.items, sale.items);
    assert_eq!(stored.total(), dec!(7000));
}

#[tokio::test]
async fn snapshot_is_immune_to_later_product_edits() {
    let store = TestStore::new().await;
    let product = store.seed_product("7003", 5, &[]).await;

    let sale = store
        .engine
        .record_sale(1, vec![line(product.id, 2)])
        .await
        .unwrap();

    let mut edit: pharmacy_inventory::entities::product::ActiveModel = product.clone().into();
    edit.selling_price = Set(dec!(2500));
    edit.brand_name = Set("Renamed".to_string());
    edit.update(&*store.db).await.unwrap();

    let stored = store.engine.get_sale(sale.id).await.unwrap();
    let item = stored.items.iter().next().unwrap();
    assert_eq!(item.selling_price, dec!(1000));
    assert_eq!(item.brand_name, product.brand_name);
    assert_eq!(stored.total(), dec!(2000));
}

#[tokio::test]
async fn oversell_is_rejected_without_side_effects() {
    let store = TestStore::new().await;
    let product = store.seed_product("7004", 3, &[]).await;

    let err = store
        .engine
        .record_sale(1, vec![line(product.id, 5)])
        .await
        .unwrap_err();

    assert_matches!(
        err,
        ServiceError::InsufficientStock {
            product_id,
            requested: 5,
            available: 3,
        } if product_id == product.id
    );
    assert_eq!(err.kind(), ErrorKind::InsufficientStock);
    assert!(err.is_user_facing());
    assert_eq!(store.quantity(product.id).await, 3);
    assert_eq!(store.sale_count().await, 0);
}

#[tokio::test]
async fn failing_line_rolls_back_earlier_decrements() {
    let store = TestStore::new().await;
    let a = store.seed_product("7005", 5, &[]).await;
    let b = store.seed_product("7006", 8, &[]).await;

    // Each line passes the upfront check on its own; the second decrement of
    // `a` is the one the store refuses.
    let err = store
        .engine
        .record_sale(1, vec![line(b.id, 2), line(a.id, 3), line(a.id, 3)])
        .await
        .unwrap_err();

    assert_matches!(
        err,
        ServiceError::InsufficientStock {
            requested: 3,
            available: 2,
            ..
        }
    );
    assert_eq!(store.quantity(a.id).await, 5);
    assert_eq!(store.quantity(b.id).await, 8);
    assert_eq!(store.sale_count().await, 0);
}

#[tokio::test]
async fn repeated_lines_within_stock_are_accepted() {
    let store = TestStore::new().await;
    let product = store.seed_product("7007", 6, &[]).await;

    let sale = store
        .engine
        .record_sale(1, vec![line(product.id, 2), line(product.id, 4)])
        .await
        .unwrap();

    assert_eq!(store.quantity(product.id).await, 0);
    assert_eq!(sale.units(), 6);
}

#[tokio::test]
async fn malformed_sales_are_validation_errors() {
    let store = TestStore::new().await;
    let product = store.seed_product("7008", 6, &[]).await;

    let empty = store.engine.record_sale(1, vec![]).await.unwrap_err();
    assert_matches!(empty, ServiceError::ValidationError(_));

    let zero = store
        .engine
        .record_sale(1, vec![line(product.id, 0)])
        .await
        .unwrap_err();
    assert_eq!(zero.kind(), ErrorKind::Validation);

    assert_eq!(store.quantity(product.id).await, 6);
    assert_eq!(store.sale_count().await, 0);
}

#[tokio::test]
async fn unknown_product_is_not_found_and_nothing_changes() {
    let store = TestStore::new().await;
    let product = store.seed_product("7009", 6, &[]).await;

    let err = store
        .engine
        .record_sale(1, vec![line(product.id, 1), line(999, 1)])
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::NotFound { entity: "product", id: 999 });
    assert_eq!(store.quantity(product.id).await, 6);
    assert_eq!(store.sale_count().await, 0);
}

#[tokio::test]
async fn reversing_sale_restores_every_quantity() {
    let store = TestStore::new().await;
    let a = store.seed_product("7010", 10, &[]).await;
    let b = store.seed_product("7011", 4, &[]).await;

    let sale = store
        .engine
        .record_sale(1, vec![line(a.id, 7), line(b.id, 4)])
        .await
        .unwrap();
    assert_eq!(store.quantity(a.id).await, 3);
    assert_eq!(store.quantity(b.id).await, 0);

    store.engine.reverse_sale(sale.id).await.unwrap();

    assert_eq!(store.quantity(a.id).await, 10);
    assert_eq!(store.quantity(b.id).await, 4);
    assert_eq!(store.sale_count().await, 0);
    assert_matches!(
        store.engine.get_sale(sale.id).await,
        Err(ServiceError::NotFound { entity: "sale", .. })
    );
}

#[tokio::test]
async fn reversing_unknown_sale_is_not_found() {
    let store = TestStore::new().await;
    let err = store.engine.reverse_sale(77).await.unwrap_err();
    assert_matches!(err, ServiceError::NotFound { entity: "sale", id: 77 });
}

#[tokio::test]
async fn reversing_sale_with_missing_product_rolls_back() {
    let store = TestStore::new().await;
    let a = store.seed_product("7012", 5, &[]).await;

    let sale = store
        .engine
        .record_sale(1, vec![line(a.id, 2)])
        .await
        .unwrap();

    // Point the second snapshot line at a product that does not exist.
    let mut items = sale.items.0.clone();
    let mut ghost = items[0].clone();
    ghost.product_id = 555;
    items.push(ghost);
    let mut edit: sale_transaction::ActiveModel = sale.clone().into();
    edit.items = Set(items.into());
    edit.update(&*store.db).await.unwrap();

    let err = store.engine.reverse_sale(sale.id).await.unwrap_err();
    assert_matches!(err, ServiceError::NotFound { entity: "product", id: 555 });
    assert_eq!(store.quantity(a.id).await, 3);
    assert_eq!(store.sale_count().await, 1);
}

#[tokio::test]
async fn legacy_snapshot_blob_is_reversible() {
    let store = TestStore::new().await;
    let product = store.seed_product("7013", 1, &[]).await;

    let blob = format!(
        r#"[{{"id":{},"generic_name":"Amoxicillin","brand_name":"Amoxil","quantity":3,"cost_price":800,"selling_price":1000.5,"expiry_dates":["2025-06-01"],"barcode":"7013","created_at":"2023-11-20T08:00:00+03:00"}}]"#,
        product.id
    );
    store
        .db
        .execute(Statement::from_sql_and_values(
            DbBackend::Sqlite,
            "INSERT INTO transactions (items, snapshot_version, user_id, created_at) VALUES (?, 1, 9, ?)",
            [blob.into(), "2023-11-20T08:00:00+03:00".into()],
        ))
        .await
        .unwrap();

    let sale = sale_transaction::Entity::find()
        .one(&*store.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sale.total(), dec!(3001.5));

    store.engine.reverse_sale(sale.id).await.unwrap();
    assert_eq!(store.quantity(product.id).await, 4);
}

#[tokio::test]
async fn newer_snapshot_versions_are_refused() {
    let store = TestStore::new().await;
    let product = store.seed_product("7014", 5, &[]).await;

    let sale = store
        .engine
        .record_sale(1, vec![line(product.id, 2)])
        .await
        .unwrap();
    let mut edit: sale_transaction::ActiveModel = sale.clone().into();
    edit.snapshot_version = Set(SNAPSHOT_VERSION + 1);
    edit.update(&*store.db).await.unwrap();

    let err = store.engine.reverse_sale(sale.id).await.unwrap_err();
    assert_matches!(err, ServiceError::SerializationError(_));
    assert_eq!(err.kind(), ErrorKind::StorageFailure);
    assert_eq!(store.quantity(product.id).await, 3);
    assert_eq!(store.sale_count().await, 1);
}

#[tokio::test]
async fn sales_are_listed_newest_first_in_pages() {
    let store = TestStore::new().await;
    let product = store.seed_product("7015", 50, &[]).await;

    let mut ids = Vec::new();
    for quantity in 1..=5 {
        let sale = store
            .engine
            .record_sale(1, vec![line(product.id, quantity)])
            .await
            .unwrap();
        ids.push(sale.id);
    }

    let (first, total) = store.engine.list_sales(1, 2).await.unwrap();
    assert_eq!(total, 5);
    assert_eq!(
        first.iter().map(|s| s.id).collect::<Vec<_>>(),
        vec![ids[4], ids[3]]
    );

    let (last, _) = store.engine.list_sales(3, 2).await.unwrap();
    assert_eq!(last.iter().map(|s| s.id).collect::<Vec<_>>(), vec![ids[0]]);

    // Page 0 reads page 1; a zero limit still returns one row.
    let (clamped, _) = store.engine.list_sales(0, 0).await.unwrap();
    assert_eq!(clamped.iter().map(|s| s.id).collect::<Vec<_>>(), vec![ids[4]]);

    let (all, _) = store.engine.list_sales(1, 1000).await.unwrap();
    assert_eq!(all.len(), 5);
}
