//! # Product Repository
//!
//! Database operations for food and equipment.
//!
//! ## Key Operations
//! - Catalog listing with category and text search
//! - CRUD operations
//! - Stock adjustment that can never go negative
//! - Soft delete (`is_active = 0`) so past orders keep resolving
//!
//! ## Search
//! ```text
//! Shopper types: "hay"
//!      │
//!      ▼
//! name LIKE '%hay%' OR description LIKE '%hay%'   (case-insensitive ASCII)
//!      │
//!      ▼
//! [Timothy Hay 1kg, Alfalfa Hay 500g, Hay Rack]
//! ```

use chrono::Utc;
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use warren_core::{CoreError, ItemKey, Product, ProductCategory, ProductInput};

pub(crate) const PRODUCT_COLUMNS: &str = "id, name, category, price_cents, stock, description, \
     image_path, is_active, created_at, updated_at";

/// Catalog filters, deserialized from the query string of `GET /api/products`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    pub category: Option<ProductCategory>,
    /// Free-text search over name and description.
    pub q: Option<String>,
    /// Admin listings include soft-deleted products.
    #[serde(default)]
    pub include_inactive: bool,
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists products matching the filter, sorted by name.
    pub async fn list(&self, filter: &ProductFilter) -> DbResult<Vec<Product>> {
        debug!(?filter, "Listing products");

        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE 1 = 1"));

        if !filter.include_inactive {
            qb.push(" AND is_active = 1");
        }
        if let Some(category) = filter.category {
            qb.push(" AND category = ").push_bind(category);
        }
        if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = format!("%{}%", escape_like(q));
            qb.push(" AND (name LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR description LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
        qb.push(" ORDER BY name COLLATE NOCASE, id");

        let products = qb.build_query_as::<Product>().fetch_all(&self.pool).await?;

        debug!(count = products.len(), "Product list returned");
        Ok(products)
    }

    /// Gets a product by ID (active or not).
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Inserts a new product (active).
    pub async fn insert(&self, input: &ProductInput) -> DbResult<Product> {
        debug!(name = %input.name, "Inserting product");

        let sql = format!(
            "INSERT INTO products (
                name, category, price_cents, stock, description, is_active, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6)
             RETURNING {PRODUCT_COLUMNS}"
        );

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(input.name.trim())
            .bind(input.category)
            .bind(input.price_cents)
            .bind(input.stock)
            .bind(input.description.as_deref())
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;

        Ok(product)
    }

    /// Replaces a product's editable fields, including its stock count.
    pub async fn update(&self, id: i64, input: &ProductInput) -> DbResult<Product> {
        debug!(id, "Updating product");

        let sql = format!(
            "UPDATE products SET
                name = ?1, category = ?2, price_cents = ?3, stock = ?4,
                description = ?5, updated_at = ?6
             WHERE id = ?7
             RETURNING {PRODUCT_COLUMNS}"
        );

        sqlx::query_as::<_, Product>(&sql)
            .bind(input.name.trim())
            .bind(input.category)
            .bind(input.price_cents)
            .bind(input.stock)
            .bind(input.description.as_deref())
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Points the product at a newly uploaded image.
    ///
    /// ## Returns
    /// The updated product and the previous image path (for cleanup).
    pub async fn set_image(&self, id: i64, path: &str) -> DbResult<(Product, Option<String>)> {
        let previous: Option<Option<String>> =
            sqlx::query_scalar("SELECT image_path FROM products WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        let previous = previous.ok_or_else(|| DbError::not_found("Product", id))?;

        let sql = format!(
            "UPDATE products SET image_path = ?1, updated_at = ?2 WHERE id = ?3 RETURNING {PRODUCT_COLUMNS}"
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(path)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        Ok((product, previous))
    }

    /// Adds `delta` (negative to remove) to a product's stock.
    ///
    /// ## Returns
    /// * `Ok(Product)` - the new stock level
    /// * `Err(DbError::Domain(InsufficientStock))` - would go below zero
    /// * `Err(DbError::NotFound)` - no such product
    pub async fn adjust_stock(&self, id: i64, delta: i64) -> DbResult<Product> {
        debug!(id, delta, "Adjusting product stock");

        let sql = format!(
            "UPDATE products SET stock = stock + ?1, updated_at = ?2
             WHERE id = ?3 AND stock + ?1 >= 0
             RETURNING {PRODUCT_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Product>(&sql)
            .bind(delta)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match updated {
            Some(product) => Ok(product),
            None => {
                let current = self
                    .get_by_id(id)
                    .await?
                    .ok_or_else(|| DbError::not_found("Product", id))?;
                Err(CoreError::InsufficientStock {
                    item: ItemKey::product(id).to_string(),
                    available: current.stock,
                    requested: -delta,
                }
                .into())
            }
        }
    }

    /// Soft-deletes a product: hidden from the catalog, kept for order history.
    pub async fn deactivate(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deactivating product");

        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?1 WHERE id = ?2")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }
}

/// Escapes `%`, `_` and `\` for a LIKE pattern using `ESCAPE '\'`.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{product_input, test_db};

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("hay"), "hay");
    }

    #[tokio::test]
    async fn test_list_search_and_category() {
        let db = test_db().await;
        let repo = db.products();
        repo.insert(&product_input("Timothy Hay 1kg", 10)).await.unwrap();
        repo.insert(&product_input("Alfalfa Pellets", 5)).await.unwrap();
        let mut cage = product_input("Hay Rack", 2);
        cage.category = ProductCategory::Equipment;
        repo.insert(&cage).await.unwrap();

        let hay = repo
            .list(&ProductFilter {
                q: Some("hay".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        let names: Vec<_> = hay.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Hay Rack", "Timothy Hay 1kg"]);

        let food = repo
            .list(&ProductFilter {
                category: Some(ProductCategory::Food),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(food.len(), 2);
    }

    #[tokio::test]
    async fn test_deactivate_hides_from_catalog() {
        let db = test_db().await;
        let repo = db.products();
        let product = repo.insert(&product_input("Water Bottle", 3)).await.unwrap();

        repo.deactivate(product.id).await.unwrap();

        assert!(repo.list(&ProductFilter::default()).await.unwrap().is_empty());
        let admin_view = repo
            .list(&ProductFilter {
                include_inactive: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(admin_view.len(), 1);
        assert!(!admin_view[0].is_active);

        assert!(repo.get_by_id(product.id).await.unwrap().is_some());
        assert!(matches!(
            repo.deactivate(9999).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_adjust_stock_never_negative() {
        let db = test_db().await;
        let repo = db.products();
        let product = repo.insert(&product_input("Timothy Hay 1kg", 3)).await.unwrap();

        let restocked = repo.adjust_stock(product.id, 5).await.unwrap();
        assert_eq!(restocked.stock, 8);

        let err = repo.adjust_stock(product.id, -9).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { available: 8, requested: 9, .. })
        ));

        assert!(matches!(
            repo.adjust_stock(9999, 1).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_and_set_image() {
        let db = test_db().await;
        let repo = db.products();
        let product = repo.insert(&product_input("Pellets", 3)).await.unwrap();

        let mut input = product_input("Pellets 2kg", 7);
        input.price_cents = 59_000;
        let updated = repo.update(product.id, &input).await.unwrap();
        assert_eq!(updated.stock, 7);
        assert_eq!(updated.price_cents, 59_000);

        let (with_image, previous) = repo
            .set_image(product.id, "products/p.webp")
            .await
            .unwrap();
        assert!(previous.is_none());
        assert_eq!(with_image.image_path.as_deref(), Some("products/p.webp"));
    }
}
