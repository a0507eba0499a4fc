use std::sync::Arc;

use rust_decimal::Decimal;
use scylla::client::execution_profile::ExecutionProfile;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{AppConfig, StoreBackend};
use crate::domain::catalog::ProductCatalog;
use crate::domain::inventory::{InventoryLedger, Product};
use crate::domain::order::OrderCommandHandler;
use crate::store::{InMemoryInventory, InMemoryOrderStore, OrderStore, ScyllaInventory, ScyllaOrderStore};

mod api;
mod config;
mod domain;
mod event_sourcing;
mod metrics;
mod store;
mod utils;

struct Backend {
    orders: Arc<dyn OrderStore>,
    inventory: Arc<dyn InventoryLedger>,
    catalog: Arc<dyn ProductCatalog>,
}

fn demo_catalog() -> Vec<Product> {
    vec![
        Product::new("Brass desk lamp", "lighting", Decimal::new(2500, 2), 25),
        Product::new("Linen lampshade", "lighting", Decimal::new(1299, 2), 40),
        Product::new("Oak bookshelf", "furniture", Decimal::new(18000, 2), 6),
        Product::new("Walnut cutting board", "kitchen", Decimal::new(4550, 2), 18),
        Product::new("Stoneware mug", "kitchen", Decimal::new(900, 2), 120),
    ]
}

async fn memory_backend() -> Backend {
    let inventory = Arc::new(InMemoryInventory::new());
    for product in demo_catalog() {
        inventory.upsert_product(product).await;
    }

    Backend {
        orders: Arc::new(InMemoryOrderStore::new()),
        inventory: inventory.clone(),
        catalog: inventory,
    }
}

async fn scylla_backend(config: &AppConfig) -> anyhow::Result<Backend> {
    tracing::info!(nodes = %config.scylla_nodes, "Connecting to ScyllaDB...");

    let profile = ExecutionProfile::builder()
        .request_timeout(Some(config.request_timeout()))
        .build();

    let session: Session = SessionBuilder::new()
        .known_nodes(config.scylla_nodes())
        .default_execution_profile_handle(profile.into_handle())
        .build()
        .await?;

    store::schema::ensure_schema(&session, &config.scylla_keyspace).await?;
    let session = Arc::new(session);

    let inventory = Arc::new(ScyllaInventory::new(session.clone()));
    if inventory.all_products().await?.is_empty() {
        tracing::info!("Seeding empty product table with the demo catalog");
        for product in demo_catalog() {
            inventory.upsert_product(&product).await?;
        }
    }

    Ok(Backend {
        orders: Arc::new(ScyllaOrderStore::new(session)),
        inventory: inventory.clone(),
        catalog: inventory,
    })
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // RUST_LOG overrides the default filter, e.g. RUST_LOG=debug
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,storefront_orders=debug"))
        )
        .init();

    let config = AppConfig::load()?;
    tracing::info!("🚀 Starting storefront order service ({:?} store)", config.store_backend);

    let backend = match config.store_backend {
        StoreBackend::Memory => memory_backend().await,
        StoreBackend::Scylla => scylla_backend(&config).await?,
    };

    let metrics = Arc::new(metrics::Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    let orders = OrderCommandHandler::new(backend.orders, backend.inventory, metrics.clone())
        .with_read_retry(config.read_retry());

    let state = Arc::new(api::AppState {
        orders: Arc::new(orders),
        catalog: backend.catalog,
    });

    futures_util::future::try_join(
        api::start_api_server(state, config.http_port),
        metrics::start_metrics_server(metrics, config.metrics_port),
    )
    .await?;

    tracing::info!("👋 Shutting down");
    Ok(())
}
