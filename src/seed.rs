//! One-time sample data seeding

use sqlx::PgPool;

use crate::{error::Result, models::CreateItem, repository::ItemRepository};

const SAMPLE_ITEMS: [(&str, i32, f64); 5] = [
    ("Laptop", 10, 999.99),
    ("Smartphone", 25, 699.99),
    ("Headphones", 15, 199.99),
    ("Keyboard", 30, 89.99),
    ("Monitor", 12, 299.99),
];

/// Insert the sample dataset, but only into an empty table
pub async fn seed_items(pool: &PgPool) -> Result<()> {
    let repo = ItemRepository::new(pool.clone());

    if repo.count().await? > 0 {
        tracing::debug!("Items table already populated, skipping seed");
        return Ok(());
    }

    for (name, stock, price) in SAMPLE_ITEMS {
        repo.create(CreateItem {
            id: None,
            name: name.to_string(),
            stock,
            price,
        })
        .await?;
    }

    tracing::info!("Seeded {} sample items", SAMPLE_ITEMS.len());
    Ok(())
}
