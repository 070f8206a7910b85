//! # Rabbit Repository
//!
//! Database operations for rabbit listings.
//!
//! ## Status Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Who moves rabbits.status                                               │
//! │                                                                         │
//! │  OrderRepository::place ............ available → reserved              │
//! │  OrderRepository::change_status .... reserved  → sold / available      │
//! │  LoanRepository::transition ........ available ↔ on_loan               │
//! │  RabbitRepository::set_status ...... admin override (any → any)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use warren_core::{Gender, Rabbit, RabbitInput, RabbitStatus};

pub(crate) const RABBIT_COLUMNS: &str = "id, name, breed, gender, birth_date, price_cents, status, \
     is_breeder, loan_fee_cents, description, image_path, created_at, updated_at";

/// Catalog filters, deserialized from the query string of `GET /api/rabbits`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RabbitFilter {
    pub status: Option<RabbitStatus>,
    pub breed: Option<String>,
    pub gender: Option<Gender>,
    #[serde(default)]
    pub breeders_only: bool,
}

/// Repository for rabbit database operations.
#[derive(Debug, Clone)]
pub struct RabbitRepository {
    pool: SqlitePool,
}

impl RabbitRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RabbitRepository { pool }
    }

    /// Lists rabbits matching the filter, newest listing first.
    ///
    /// ## Arguments
    /// * `filter` - every set field narrows the result; breed matches
    ///   case-insensitively
    pub async fn list(&self, filter: &RabbitFilter) -> DbResult<Vec<Rabbit>> {
        debug!(?filter, "Listing rabbits");

        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {RABBIT_COLUMNS} FROM rabbits WHERE 1 = 1"));

        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(breed) = filter.breed.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
            qb.push(" AND breed = ")
                .push_bind(breed.to_string())
                .push(" COLLATE NOCASE");
        }
        if let Some(gender) = filter.gender {
            qb.push(" AND gender = ").push_bind(gender);
        }
        if filter.breeders_only {
            qb.push(" AND is_breeder = 1");
        }
        qb.push(" ORDER BY id DESC");

        let rabbits = qb.build_query_as::<Rabbit>().fetch_all(&self.pool).await?;

        debug!(count = rabbits.len(), "Rabbit list returned");
        Ok(rabbits)
    }

    /// Gets a rabbit by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Rabbit>> {
        let sql = format!("SELECT {RABBIT_COLUMNS} FROM rabbits WHERE id = ?1");
        let rabbit = sqlx::query_as::<_, Rabbit>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(rabbit)
    }

    /// Inserts a new listing (status starts as `available`).
    pub async fn insert(&self, input: &RabbitInput) -> DbResult<Rabbit> {
        let now = Utc::now();
        debug!(name = %input.name, breed = %input.breed, "Inserting rabbit");

        let sql = format!(
            "INSERT INTO rabbits (
                name, breed, gender, birth_date, price_cents, status,
                is_breeder, loan_fee_cents, description, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
             RETURNING {RABBIT_COLUMNS}"
        );

        let rabbit = sqlx::query_as::<_, Rabbit>(&sql)
            .bind(input.name.trim())
            .bind(input.breed.trim())
            .bind(input.gender)
            .bind(input.birth_date)
            .bind(input.price_cents)
            .bind(RabbitStatus::Available)
            .bind(input.is_breeder)
            .bind(input.loan_fee_cents)
            .bind(input.description.as_deref())
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        Ok(rabbit)
    }

    /// Replaces a listing's editable fields. Status and image are untouched.
    pub async fn update(&self, id: i64, input: &RabbitInput) -> DbResult<Rabbit> {
        debug!(id, "Updating rabbit");

        let sql = format!(
            "UPDATE rabbits SET
                name = ?1, breed = ?2, gender = ?3, birth_date = ?4, price_cents = ?5,
                is_breeder = ?6, loan_fee_cents = ?7, description = ?8, updated_at = ?9
             WHERE id = ?10
             RETURNING {RABBIT_COLUMNS}"
        );

        sqlx::query_as::<_, Rabbit>(&sql)
            .bind(input.name.trim())
            .bind(input.breed.trim())
            .bind(input.gender)
            .bind(input.birth_date)
            .bind(input.price_cents)
            .bind(input.is_breeder)
            .bind(input.loan_fee_cents)
            .bind(input.description.as_deref())
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Rabbit", id))
    }

    /// Sets a rabbit's status directly (admin override).
    pub async fn set_status(&self, id: i64, status: RabbitStatus) -> DbResult<Rabbit> {
        debug!(id, status = %status, "Setting rabbit status");

        let sql = format!(
            "UPDATE rabbits SET status = ?1, updated_at = ?2 WHERE id = ?3 RETURNING {RABBIT_COLUMNS}"
        );
        sqlx::query_as::<_, Rabbit>(&sql)
            .bind(status)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Rabbit", id))
    }

    /// Points the listing at a newly uploaded image.
    ///
    /// ## Returns
    /// The updated rabbit and the previous image path (for cleanup).
    pub async fn set_image(&self, id: i64, path: &str) -> DbResult<(Rabbit, Option<String>)> {
        let previous: Option<Option<String>> =
            sqlx::query_scalar("SELECT image_path FROM rabbits WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        let previous = previous.ok_or_else(|| DbError::not_found("Rabbit", id))?;

        let sql = format!(
            "UPDATE rabbits SET image_path = ?1, updated_at = ?2 WHERE id = ?3 RETURNING {RABBIT_COLUMNS}"
        );
        let rabbit = sqlx::query_as::<_, Rabbit>(&sql)
            .bind(path)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Rabbit", id))?;

        Ok((rabbit, previous))
    }

    /// Deletes a listing.
    ///
    /// Rabbits referenced by a loan cannot be deleted (foreign key).
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting rabbit");

        let result = sqlx::query("DELETE FROM rabbits WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Rabbit", id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{rabbit_input, test_db};

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = test_db().await;
        let rabbit = db.rabbits().insert(&rabbit_input("Mochi", true)).await.unwrap();

        assert_eq!(rabbit.status, RabbitStatus::Available);
        assert!(rabbit.is_breeder);

        let fetched = db.rabbits().get_by_id(rabbit.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Mochi");
        assert_eq!(fetched.birth_date, rabbit.birth_date);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = test_db().await;
        let repo = db.rabbits();
        let mochi = repo.insert(&rabbit_input("Mochi", true)).await.unwrap();
        let mut pudding = rabbit_input("Pudding", false);
        pudding.breed = "Netherland Dwarf".to_string();
        pudding.gender = Gender::Male;
        let pudding = repo.insert(&pudding).await.unwrap();
        repo.set_status(pudding.id, RabbitStatus::Sold).await.unwrap();

        let all = repo.list(&RabbitFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let available = repo
            .list(&RabbitFilter {
                status: Some(RabbitStatus::Available),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id, mochi.id);

        let dwarfs = repo
            .list(&RabbitFilter {
                breed: Some("netherland dwarf".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(dwarfs.len(), 1);

        let breeders = repo
            .list(&RabbitFilter {
                breeders_only: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(breeders.len(), 1);

        let males = repo
            .list(&RabbitFilter {
                gender: Some(Gender::Male),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(males[0].id, pudding.id);
    }

    #[tokio::test]
    async fn test_update_set_image_delete() {
        let db = test_db().await;
        let repo = db.rabbits();
        let rabbit = repo.insert(&rabbit_input("Mochi", false)).await.unwrap();

        let mut input = rabbit_input("Mochi II", false);
        input.price_cents = 199_000;
        let updated = repo.update(rabbit.id, &input).await.unwrap();
        assert_eq!(updated.name, "Mochi II");
        assert_eq!(updated.price_cents, 199_000);

        let (with_image, previous) = repo.set_image(rabbit.id, "rabbits/a.png").await.unwrap();
        assert_eq!(with_image.image_path.as_deref(), Some("rabbits/a.png"));
        assert_eq!(previous, None);

        let (_, previous) = repo.set_image(rabbit.id, "rabbits/b.png").await.unwrap();
        assert_eq!(previous.as_deref(), Some("rabbits/a.png"));

        repo.delete(rabbit.id).await.unwrap();
        assert!(repo.get_by_id(rabbit.id).await.unwrap().is_none());
        assert!(matches!(
            repo.update(rabbit.id, &input).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
