//! # Demo Data Seeder
//!
//! Fills a local store with a small bodega catalog for demos and manual
//! testing.
//!
//! ## Usage
//! ```bash
//! cargo run -p mercado-store --bin mercado-seed
//! cargo run -p mercado-store --bin mercado-seed -- ./data/mercado.db
//! ```
//!
//! Writes the default config, the walk-in client, one category per entry in
//! [`CATALOG`] and its products. Existing documents with the same ids are
//! replaced, so running it twice is harmless.

use std::env;

use mercado_core::{AppConfig, Category, Client, Product, ProductStatus};
use mercado_store::{to_body, Collection, Commit, DocumentStore, LocalConfig, LocalStore, CONFIG_DOC_ID};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// (category, colour, [(code, name, cost, price, stock)])
type SeedProduct = (&'static str, &'static str, f64, f64, i64);

const CATALOG: &[(&str, &str, &[SeedProduct])] = &[
    (
        "Viveres",
        "#f59e0b",
        &[
            ("7591001", "Arroz 1kg", 0.85, 1.20, 40),
            ("7591002", "Harina de Maiz 1kg", 0.90, 1.35, 60),
            ("7591003", "Pasta Larga 500g", 0.55, 0.90, 35),
            ("7591004", "Azucar 1kg", 0.95, 1.40, 25),
            ("7591005", "Aceite 1L", 2.40, 3.50, 18),
        ],
    ),
    (
        "Bebidas",
        "#3b82f6",
        &[
            ("7592001", "Refresco Cola 2L", 1.30, 2.10, 24),
            ("7592002", "Agua Mineral 1.5L", 0.40, 0.75, 48),
            ("7592003", "Jugo de Naranja 1L", 1.10, 1.80, 12),
        ],
    ),
    (
        "Limpieza",
        "#10b981",
        &[
            ("7593001", "Jabon en Polvo 1kg", 2.10, 3.20, 10),
            ("7593002", "Cloro 1L", 0.70, 1.15, 4),
        ],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let path = env::args().nth(1).unwrap_or_else(|| "mercado.db".to_string());
    let store = LocalStore::open(LocalConfig::new(&path)).await?;

    let mut commit = Commit::new()
        .set(Collection::Config, CONFIG_DOC_ID, to_body(&AppConfig::default())?);
    let walk_in = Client::walk_in();
    commit = commit.set(Collection::Clients, walk_in.id.clone(), to_body(&walk_in)?);

    let mut product_count = 0;
    for (index, (name, color, products)) in CATALOG.iter().enumerate() {
        let category = Category {
            id: format!("cat-{:02}", index + 1),
            name: name.to_string(),
            color: color.to_string(),
        };
        commit = commit.set(Collection::Categories, category.id.clone(), to_body(&category)?);

        for (code, product_name, cost, price, stock) in products.iter() {
            let product = Product {
                id: format!("prod-{code}"),
                code: code.to_string(),
                name: product_name.to_string(),
                category_id: category.id.clone(),
                cost_price: *cost,
                sale_price: *price,
                stock: *stock,
                status: ProductStatus::Active,
                ..Product::default()
            };
            commit = commit.set(Collection::Products, product.id.clone(), to_body(&product)?);
            product_count += 1;
        }
    }

    let receipt = store.commit(commit).await?;
    info!(
        path = %path,
        categories = CATALOG.len(),
        products = product_count,
        writes = receipt.writes,
        "Seed complete"
    );

    store.close().await;
    Ok(())
}
