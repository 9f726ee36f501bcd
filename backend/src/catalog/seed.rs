//! Start-up catalog seeding from a JSON file.

use std::fs;
use std::path::Path;

use crate::db::repository::{DataStore, RepositoryError, RepositoryResult};
use crate::db::specification::Specification;
use crate::models::Product;

/// Read a JSON array of products. Ids in the file are ignored.
///
/// # Errors
/// `ConfigurationError` when the file cannot be read or parsed, or when an
/// entry fails [`Product::validate`].
pub fn load_products<P: AsRef<Path>>(path: P) -> RepositoryResult<Vec<Product>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        RepositoryError::configuration(format!(
            "Failed to read seed file {}: {}",
            path.display(),
            e
        ))
    })?;
    parse_products(&content)
}

pub fn parse_products(json: &str) -> RepositoryResult<Vec<Product>> {
    let mut products: Vec<Product> = serde_json::from_str(json)
        .map_err(|e| RepositoryError::configuration(format!("Invalid seed data: {}", e)))?;

    for (index, product) in products.iter_mut().enumerate() {
        product.validate().map_err(|e| {
            RepositoryError::configuration(format!("Seed entry {} rejected: {}", index, e))
        })?;
        product.id = 0;
    }

    Ok(products)
}

/// Insert `products` through one unit of work if the store has no products
/// yet. Returns how many rows were inserted.
pub async fn seed_if_empty(
    store: &dyn DataStore<Product>,
    products: Vec<Product>,
) -> RepositoryResult<usize> {
    let mut repo = store.begin();
    let existing = repo.count_with_spec(&Specification::new()).await?;
    if existing > 0 {
        log::info!("Catalog already holds {} products, skipping seed", existing);
        return Ok(0);
    }

    for product in products {
        repo.add(product);
    }
    if !repo.commit().await? {
        return Ok(0);
    }

    let inserted = repo.inserted().len();
    log::info!("Seeded catalog with {} products", inserted);
    Ok(inserted)
}
