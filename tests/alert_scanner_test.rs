mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use stockledger::entities::alert::AlertKind;
use stockledger::errors::ServiceError;
use stockledger::services::alerts::AlertFilters;
use stockledger::services::lots::NewLot;
use stockledger::services::stock_ledger::EntryRequest;

async fn seed_stock(
    services: &stockledger::AppServices,
    product_id: i64,
    location_id: i64,
    quantity: i32,
) {
    services
        .ledger
        .register_entry(EntryRequest {
            product_id,
            location_id,
            quantity,
            actor_id: None,
            lot: None,
            note: None,
        })
        .await
        .expect("seed stock");
}

#[tokio::test]
async fn low_stock_is_alerted_once_until_acknowledged() {
    let (pool, services) = common::setup().await;
    let product = common::seed_product(&pool, "syringe 5ml", 5).await;
    let depot = common::seed_location(&pool, "central depot").await;

    seed_stock(&services, product.id, depot.id, 3).await;

    let created = services.alerts.scan_low_stock().await.unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].kind(), Some(AlertKind::LowStock));
    assert_eq!(created[0].product_id, product.id);
    assert!(!created[0].acknowledged);

    // While the alert stays unacknowledged the scan never duplicates it.
    let repeat = services.alerts.scan_low_stock().await.unwrap();
    assert!(repeat.is_empty());

    let acked = services.alerts.acknowledge(created[0].id).await.unwrap();
    assert!(acked.acknowledged);

    // The condition still holds, so the next scan raises a fresh alert.
    let after_ack = services.alerts.scan_low_stock().await.unwrap();
    assert_eq!(after_ack.len(), 1);
    assert_ne!(after_ack[0].id, created[0].id);
}

#[tokio::test]
async fn sufficient_stock_raises_no_alert() {
    let (pool, services) = common::setup().await;
    let product = common::seed_product(&pool, "gauze roll", 5).await;
    let unbounded = common::seed_product(&pool, "no minimum", 0).await;
    let depot = common::seed_location(&pool, "central depot").await;

    seed_stock(&services, product.id, depot.id, 9).await;
    seed_stock(&services, unbounded.id, depot.id, 1).await;

    let created = services.alerts.scan_low_stock().await.unwrap();
    assert!(created.is_empty());
}

#[tokio::test]
async fn inactive_reference_data_is_skipped() {
    let (pool, services) = common::setup().await;
    // The retired product has no stock anywhere, which would trip the
    // threshold if it were scanned at all.
    let _retired = common::seed_product_with_status(&pool, "retired", "inactive", 5).await;
    let _closed = common::seed_location_with_status(&pool, "closed room", "inactive").await;

    let created = services.alerts.scan_low_stock().await.unwrap();
    assert!(created.is_empty());
}

#[tokio::test]
async fn acknowledge_is_idempotent_and_checked() {
    let (pool, services) = common::setup().await;
    let product = common::seed_product(&pool, "saline bag", 2).await;
    let depot = common::seed_location(&pool, "central depot").await;

    seed_stock(&services, product.id, depot.id, 1).await;
    let created = services.alerts.scan_low_stock().await.unwrap();
    let alert_id = created[0].id;

    let first = services.alerts.acknowledge(alert_id).await.unwrap();
    let second = services.alerts.acknowledge(alert_id).await.unwrap();
    assert!(first.acknowledged);
    assert_eq!(first, second);

    let err = services
        .alerts
        .acknowledge(987_654)
        .await
        .expect_err("unknown alert id");
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn near_expiry_and_expired_lots_are_partitioned() {
    let (pool, services) = common::setup().await;
    let product = common::seed_product(&pool, "vaccine vial", 0).await;
    let today = Utc::now().date_naive();

    let closing = services
        .lots
        .create_lot(NewLot {
            product_id: product.id,
            lot_number: "CLOSE".to_string(),
            quantity: 5,
            expiry_date: Some(today + Duration::days(3)),
            manufacture_date: None,
            location_id: None,
        })
        .await
        .unwrap();
    let expired = services
        .lots
        .create_lot(NewLot {
            product_id: product.id,
            lot_number: "PAST".to_string(),
            quantity: 5,
            expiry_date: Some(today - Duration::days(1)),
            manufacture_date: None,
            location_id: None,
        })
        .await
        .unwrap();
    let empty = services
        .lots
        .create_lot(NewLot {
            product_id: product.id,
            lot_number: "EMPTY".to_string(),
            quantity: 0,
            expiry_date: Some(today + Duration::days(3)),
            manufacture_date: None,
            location_id: None,
        })
        .await
        .unwrap();

    let near = services.alerts.scan_near_expiry(7).await.unwrap();
    assert_eq!(near.len(), 1);
    assert_eq!(near[0].lot_id, Some(closing.id));
    assert_eq!(near[0].kind(), Some(AlertKind::NearExpiry));

    let gone = services.alerts.scan_expired().await.unwrap();
    assert_eq!(gone.len(), 1);
    assert_eq!(gone[0].lot_id, Some(expired.id));
    assert_eq!(gone[0].kind(), Some(AlertKind::Expired));

    // Emptied and expired batches never show up in the near-expiry sweep.
    let near_lots = services.lots.find_near_expiry(7).await.unwrap();
    assert!(near_lots.iter().all(|l| l.id != empty.id && l.id != expired.id));

    // Draining the closing batch stops the near-expiry listing for it.
    services
        .lots
        .adjust_quantity(closing.id, -5)
        .await
        .unwrap();
    let near_lots = services.lots.find_near_expiry(7).await.unwrap();
    assert!(near_lots.is_empty());
}

#[tokio::test]
async fn full_scan_summarizes_and_listings_filter() {
    let (pool, services) = common::setup().await;
    let product = common::seed_product(&pool, "antibiotic", 4).await;
    let depot = common::seed_location(&pool, "pharmacy").await;
    let today = Utc::now().date_naive();

    seed_stock(&services, product.id, depot.id, 2).await;
    let lot = services
        .lots
        .create_lot(NewLot {
            product_id: product.id,
            lot_number: "X-9".to_string(),
            quantity: 2,
            expiry_date: Some(today + Duration::days(2)),
            manufacture_date: None,
            location_id: Some(depot.id),
        })
        .await
        .unwrap();

    let summary = services.alerts.run_scan(7).await.unwrap();
    assert_eq!(summary.low_stock.len(), 1);
    assert_eq!(summary.near_expiry.len(), 1);
    assert!(summary.expired.is_empty());
    assert_eq!(summary.total(), 2);

    let only_expiry = services
        .alerts
        .list_active(AlertFilters {
            kind: Some(AlertKind::NearExpiry),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(only_expiry.len(), 1);
    assert_eq!(only_expiry[0].lot_id, Some(lot.id));

    let for_product = services
        .alerts
        .list_active(AlertFilters {
            product_id: Some(product.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(for_product.len(), 2);

    let recent = services.alerts.recent(1).await.unwrap();
    assert_eq!(recent.len(), 1);

    // The scanner only wrote alert rows; ledger state is untouched.
    assert_eq!(
        services
            .stock
            .current_quantity(product.id, depot.id)
            .await
            .unwrap(),
        2
    );
    assert_eq!(services.lots.get(lot.id).await.unwrap().quantity, 2);
}
