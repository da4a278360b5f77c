use std::sync::Arc;

use labstock_api::app::{AppState, build_router};
use labstock_catalog::ProductSpec;
use labstock_infra::{CatalogService, InMemoryStore, PgStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    labstock_observability::init();

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let state = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let store = PgStore::connect(&url).await?;
            AppState::new(Arc::new(store))
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set; using in-memory store with dev seed data");
            let state = AppState::new(Arc::new(InMemoryStore::new()));
            seed_dev_catalog(&state.catalog).await;
            state
        }
    };

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Dev-only starter catalog, seeded through the service so every product
/// gets its status row and opening operation.
async fn seed_dev_catalog(catalog: &CatalogService) {
    let seed = [
        ("Glass Beaker", "Beaker", "250 mL", "Glass"),
        ("Plastic Flask", "Erlenmeyer Flask", "100 mL", "Plastic"),
        ("Test Tube", "Tube", "15 mL", "Glass"),
    ];

    for (name, kind, size, material) in seed {
        let spec = match ProductSpec::new(name, kind, size, material) {
            Ok(spec) => spec,
            Err(e) => {
                tracing::warn!("invalid seed product {name}: {e}");
                continue;
            }
        };
        if let Err(e) = catalog.create_product(spec, 100).await {
            tracing::warn!("failed to seed product {name}: {e}");
        }
    }
}
