mod common;

use assert_matches::assert_matches;
use stockledger::errors::ServiceError;
use stockledger::services::stock_ledger::{EntryRequest, ExitRequest};

/// Twenty writers race to take two units each out of a stock of twenty.
/// Exactly ten can win; the rest must see `InsufficientStock`, and the final
/// projection is the fold of the committed movements, never negative.
#[tokio::test]
async fn concurrent_exits_never_oversell() {
    let (pool, services) = common::setup().await;
    let product = common::seed_product(&pool, "contested item", 0).await;
    let depot = common::seed_location(&pool, "central depot").await;

    services
        .ledger
        .register_entry(EntryRequest {
            product_id: product.id,
            location_id: depot.id,
            quantity: 20,
            actor_id: None,
            lot: None,
            note: None,
        })
        .await
        .expect("seed stock");

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let ledger = services.ledger.clone();
        let product_id = product.id;
        let location_id = depot.id;
        tasks.push(tokio::spawn(async move {
            ledger
                .register_exit(ExitRequest {
                    product_id,
                    location_id,
                    quantity: 2,
                    actor_id: None,
                    lot_id: None,
                    note: None,
                })
                .await
        }));
    }

    let mut successes = 0;
    let mut rejections = 0;
    for task in tasks {
        match task.await.expect("task panicked") {
            Ok(outcome) => {
                assert!(outcome.new_quantity >= 0);
                successes += 1;
            }
            Err(err) => {
                assert_matches!(err, ServiceError::InsufficientStock { .. });
                rejections += 1;
            }
        }
    }

    assert_eq!(successes, 10, "exactly ten exits fit into the stock");
    assert_eq!(rejections, 10);

    let final_stock = services
        .stock
        .current_quantity(product.id, depot.id)
        .await
        .unwrap();
    assert_eq!(final_stock, 0);

    // 1 entry + 10 committed exits; the rejected units of work left nothing.
    let history = services
        .movements
        .list_by_product(product.id)
        .await
        .unwrap();
    assert_eq!(history.len(), 11);
}

/// Interleaved entries and exits across two locations keep every projection
/// non-negative.
#[tokio::test]
async fn mixed_concurrent_traffic_keeps_projections_consistent() {
    let (pool, services) = common::setup().await;
    let product = common::seed_product(&pool, "busy item", 0).await;
    let depot = common::seed_location(&pool, "central depot").await;
    let ward = common::seed_location(&pool, "ward shelf").await;

    let mut tasks = Vec::new();
    for i in 0..30 {
        let ledger = services.ledger.clone();
        let product_id = product.id;
        let location_id = if i % 2 == 0 { depot.id } else { ward.id };
        tasks.push(tokio::spawn(async move {
            if i % 3 == 0 {
                ledger
                    .register_exit(ExitRequest {
                        product_id,
                        location_id,
                        quantity: 3,
                        actor_id: None,
                        lot_id: None,
                        note: None,
                    })
                    .await
                    .map(|_| ())
            } else {
                ledger
                    .register_entry(EntryRequest {
                        product_id,
                        location_id,
                        quantity: 2,
                        actor_id: None,
                        lot: None,
                        note: None,
                    })
                    .await
                    .map(|_| ())
            }
        }));
    }

    for task in tasks {
        match task.await.expect("task panicked") {
            Ok(()) => {}
            Err(err) => assert_matches!(err, ServiceError::InsufficientStock { .. }),
        }
    }

    for location_id in [depot.id, ward.id] {
        let quantity = services
            .stock
            .current_quantity(product.id, location_id)
            .await
            .unwrap();
        assert!(quantity >= 0, "projection went negative: {}", quantity);
    }
}
