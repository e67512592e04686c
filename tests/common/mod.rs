#![allow(dead_code)]

use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use std::sync::Arc;
use stockledger::db::{self, DbConfig, DbPool};
use stockledger::entities::{location, product};
use stockledger::events::{process_events, EventSender};
use stockledger::AppServices;
use tokio::sync::mpsc;

/// Fresh in-memory database with the schema applied and services wired.
///
/// The pool is capped at a single connection so the memory database survives
/// for the whole test; units of work still serialize exactly as they would
/// against a shared server.
pub async fn setup() -> (Arc<DbPool>, AppServices) {
    stockledger::logging::init("warn");

    let config = DbConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    };
    let pool = db::establish_connection_with_config(&config)
        .await
        .expect("failed to connect to test database");
    db::run_migrations(&pool)
        .await
        .expect("failed to run migrations");
    let pool = Arc::new(pool);

    let (tx, rx) = mpsc::channel(100);
    let sender = EventSender::new(tx);
    tokio::spawn(process_events(rx));

    let services = AppServices::new(pool.clone(), sender);
    (pool, services)
}

pub async fn seed_product(db: &DbPool, name: &str, minimum_stock: i32) -> product::Model {
    seed_product_with_status(db, name, "active", minimum_stock).await
}

pub async fn seed_product_with_status(
    db: &DbPool,
    name: &str,
    status: &str,
    minimum_stock: i32,
) -> product::Model {
    let now = Utc::now();
    product::ActiveModel {
        name: Set(name.to_string()),
        status: Set(status.to_string()),
        minimum_stock: Set(minimum_stock),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("failed to seed product")
}

pub async fn seed_location(db: &DbPool, name: &str) -> location::Model {
    seed_location_with_status(db, name, "active").await
}

pub async fn seed_location_with_status(db: &DbPool, name: &str, status: &str) -> location::Model {
    let now = Utc::now();
    location::ActiveModel {
        name: Set(name.to_string()),
        status: Set(status.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("failed to seed location")
}
