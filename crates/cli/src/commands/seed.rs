//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! - slug: arabic-coffee
//!   name: قهوة عربية
//!   description: بن مختص محمص
//!   price: "45.00"
//! - slug: dates-box
//!   name: علبة تمر
//!   price: "80.50"
//!   is_active: false
//! ```
//!
//! Products are upserted by slug, so re-running a file is safe.

use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use tracing::{error, info};

use souq_storefront::db::ProductRepository;
use souq_storefront::db::products::NewProduct;

use super::{CliError, connect, store_currency};

/// Problems found in a product list, one message per problem.
fn validate(products: &[NewProduct]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut slugs = HashSet::new();

    for (i, product) in products.iter().enumerate() {
        let at = format!("entry {} ({})", i + 1, product.slug);
        if product.slug.trim().is_empty() {
            errors.push(format!("entry {}: empty slug", i + 1));
        } else if !slugs.insert(product.slug.as_str()) {
            errors.push(format!("{at}: duplicate slug"));
        }
        if product.name.trim().is_empty() {
            errors.push(format!("{at}: empty name"));
        }
        if product.price <= Decimal::ZERO {
            errors.push(format!("{at}: price must be positive"));
        }
    }

    errors
}

/// Upsert products from `file_path`.
///
/// With `clear_existing`, every product is deactivated first so products
/// missing from the file stop being sold. Carts holding them keep the lines
/// but checkout refuses them.
///
/// # Errors
///
/// Returns an error if the file cannot be read or validated, or a database
/// operation fails.
pub async fn products(file_path: &str, clear_existing: bool) -> Result<(), CliError> {
    let path = Path::new(file_path);
    info!(path = %file_path, "Loading products from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CliError::Io(file_path.to_owned(), e))?;
    let products: Vec<NewProduct> = serde_yaml::from_str(&content)?;

    let errors = validate(&products);
    if !errors.is_empty() {
        error!("Product file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(CliError::Invalid(format!(
            "{} validation errors found",
            errors.len()
        )));
    }

    let pool = connect().await?;
    let repo = ProductRepository::new(&pool, store_currency()?);

    if clear_existing {
        let deactivated = repo.deactivate_all().await?;
        info!(deactivated, "Deactivated existing products");
    }

    for product in &products {
        let id = repo.upsert_by_slug(product).await?;
        info!(%id, slug = %product.slug, "Upserted product");
    }

    info!(count = products.len(), "Seeding complete!");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_validate_catalog() {
        let yaml = r#"
- slug: arabic-coffee
  name: قهوة عربية
  price: "45.00"
- slug: dates-box
  name: علبة تمر
  price: "80.50"
  is_active: false
"#;
        let products: Vec<NewProduct> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(products.len(), 2);
        assert!(products[0].is_active);
        assert!(!products[1].is_active);
        assert!(validate(&products).is_empty());
    }

    #[test]
    fn test_validate_reports_each_problem() {
        let yaml = r#"
- slug: tea
  name: شاي
  price: "0"
- slug: tea
  name: " "
  price: "12"
"#;
        let products: Vec<NewProduct> = serde_yaml::from_str(yaml).unwrap();
        let errors = validate(&products);
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.contains("duplicate slug")));
    }
}
