mod common;

use proptest::prelude::*;
use stockledger::entities::stock_movement::MovementKind;
use stockledger::errors::ServiceError;
use stockledger::services::stock_ledger::{EntryRequest, ExitRequest, TransferRequest};

#[derive(Debug, Clone)]
enum Op {
    Entry { location: usize, quantity: i32 },
    Exit { location: usize, quantity: i32 },
    Transfer { source: usize, dest: usize, quantity: i32 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..2usize, 1..20i32).prop_map(|(location, quantity)| Op::Entry { location, quantity }),
        (0..2usize, 1..20i32).prop_map(|(location, quantity)| Op::Exit { location, quantity }),
        (0..2usize, 0..2usize, 1..20i32)
            .prop_map(|(source, dest, quantity)| Op::Transfer { source, dest, quantity }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    /// Any sequence of accepted operations keeps every (product, location)
    /// projection non-negative and equal to the signed fold of the log.
    #[test]
    fn projection_equals_fold_and_never_goes_negative(
        ops in proptest::collection::vec(op_strategy(), 1..24)
    ) {
        let rt = tokio::runtime::Runtime::new().expect("runtime");
        rt.block_on(async move {
            let (pool, services) = common::setup().await;
            let product = common::seed_product(&pool, "prop item", 0).await;
            let depot = common::seed_location(&pool, "depot").await;
            let ward = common::seed_location(&pool, "ward").await;
            let locations = [depot.id, ward.id];

            for op in ops {
                match op {
                    Op::Entry { location, quantity } => {
                        services
                            .ledger
                            .register_entry(EntryRequest {
                                product_id: product.id,
                                location_id: locations[location],
                                quantity,
                                actor_id: None,
                                lot: None,
                                note: None,
                            })
                            .await
                            .expect("entries always fit");
                    }
                    Op::Exit { location, quantity } => {
                        match services
                            .ledger
                            .register_exit(ExitRequest {
                                product_id: product.id,
                                location_id: locations[location],
                                quantity,
                                actor_id: None,
                                lot_id: None,
                                note: None,
                            })
                            .await
                        {
                            Ok(_) => {}
                            Err(ServiceError::InsufficientStock { .. }) => {}
                            Err(other) => panic!("unexpected exit error: {}", other),
                        }
                    }
                    Op::Transfer { source, dest, quantity } => {
                        match services
                            .ledger
                            .transfer(TransferRequest {
                                product_id: product.id,
                                source_location_id: locations[source],
                                dest_location_id: locations[dest],
                                quantity,
                                actor_id: None,
                                lot_id: None,
                                note: None,
                            })
                            .await
                        {
                            Ok(_) => assert_ne!(source, dest),
                            Err(ServiceError::InsufficientStock { .. }) => {}
                            Err(ServiceError::InvalidMovement(_)) => assert_eq!(source, dest),
                            Err(other) => panic!("unexpected transfer error: {}", other),
                        }
                    }
                }
            }

            let history = services
                .movements
                .list_by_product(product.id)
                .await
                .expect("history read");
            for location_id in locations {
                let mut folded: i64 = 0;
                for m in &history {
                    let quantity = i64::from(m.quantity);
                    match m.kind().expect("known kind") {
                        MovementKind::Entry => {
                            if m.dest_location_id == Some(location_id) {
                                folded += quantity;
                            }
                        }
                        MovementKind::Exit => {
                            if m.source_location_id == Some(location_id) {
                                folded -= quantity;
                            }
                        }
                        MovementKind::Transfer => {
                            if m.source_location_id == Some(location_id) {
                                folded -= quantity;
                            }
                            if m.dest_location_id == Some(location_id) {
                                folded += quantity;
                            }
                        }
                    }
                }
                let projected = services
                    .stock
                    .current_quantity(product.id, location_id)
                    .await
                    .expect("projection read");
                assert_eq!(projected, folded, "projection must equal the fold");
                assert!(projected >= 0, "projection went negative: {}", projected);
            }
        });
    }
}
