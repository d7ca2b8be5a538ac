//! Marketplace Orders - multi-merchant order service

use anyhow::Result;
use marketplace_orders::{
    api::{self, AppState},
    notify::{LogNotifier, MerchantNotifier, NatsNotifier},
    services::{PageLimits, Pricing},
    store::{
        CartStore, Catalog, CustomerDirectory, MemoryCartStore, MemoryCatalog, MemoryCustomerDirectory,
        MemoryOrderRepository, OrderRepository, PgCartStore, PgCatalog, PgCustomerDirectory, PgOrderRepository,
    },
    Config, OrderQueryService, OrderService,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct Stores {
    orders: Arc<dyn OrderRepository>,
    carts: Arc<dyn CartStore>,
    catalog: Arc<dyn Catalog>,
    customers: Arc<dyn CustomerDirectory>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let stores = open_stores(&config).await?;
    let notifier = connect_notifier(&config).await;

    let orders = OrderService::new(
        stores.orders.clone(),
        stores.carts,
        stores.catalog,
        notifier,
        Pricing::from_config(&config),
    );
    let queries = OrderQueryService::new(stores.orders, stores.customers, PageLimits::from_config(&config));

    let app = api::router(AppState { orders, queries })
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(%addr, "Marketplace orders listening");
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}

async fn open_stores(config: &Config) -> Result<Stores> {
    let Some(url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set, using in-memory stores");
        return Ok(Stores {
            orders: Arc::new(MemoryOrderRepository::new()),
            carts: Arc::new(MemoryCartStore::new()),
            catalog: Arc::new(MemoryCatalog::new()),
            customers: Arc::new(MemoryCustomerDirectory::new()),
        });
    };
    let db = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(url)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;
    Ok(Stores {
        orders: Arc::new(PgOrderRepository::new(db.clone())),
        carts: Arc::new(PgCartStore::new(db.clone())),
        catalog: Arc::new(PgCatalog::new(db.clone())),
        customers: Arc::new(PgCustomerDirectory::new(db)),
    })
}

async fn connect_notifier(config: &Config) -> Arc<dyn MerchantNotifier> {
    let Some(url) = config.nats_url.as_deref() else {
        return Arc::new(LogNotifier);
    };
    match NatsNotifier::connect(url, config.nats_subject_prefix.clone()).await {
        Ok(nats) => Arc::new(nats),
        Err(e) => {
            tracing::warn!(error = %e, "NATS unavailable, merchant notifications will only be logged");
            Arc::new(LogNotifier)
        }
    }
}
