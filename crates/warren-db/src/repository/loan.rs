//! # Loan Repository
//!
//! Breeding loan requests and their admin-driven lifecycle.
//!
//! ## Rabbit Side Effects
//! ```text
//!   action    loan status            rabbit status
//!   ───────   ────────────────────   ───────────────────────
//!   request   → requested            must be available breeder
//!   approve   requested → approved   unchanged
//!   start     approved  → active     available → on_loan
//!   return    active    → returned   on_loan   → available
//!   cancel    req/appr  → cancelled  unchanged
//! ```

use chrono::Utc;
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::rabbit::RABBIT_COLUMNS;
use warren_core::{
    BreedingLoan, CoreError, LoanAction, LoanRequest, LoanStatus, Rabbit, RabbitStatus,
};

const LOAN_COLUMNS: &str = "id, rabbit_id, user_id, status, fee_cents, start_date, due_date, \
     returned_at, notes, created_at, updated_at";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoanFilter {
    pub user_id: Option<i64>,
    pub status: Option<LoanStatus>,
}

/// Repository for breeding loan operations.
#[derive(Debug, Clone)]
pub struct LoanRepository {
    pool: SqlitePool,
}

impl LoanRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LoanRepository { pool }
    }

    /// Files a loan request for a breeder rabbit.
    ///
    /// ## Returns
    /// * `Ok(BreedingLoan)` - in `requested`, fee copied from the rabbit
    /// * `Err(DbError::NotFound)` - unknown rabbit or user
    /// * `Err(DbError::Domain(NotABreeder | RabbitUnavailable))`
    pub async fn request(&self, req: &LoanRequest) -> DbResult<BreedingLoan> {
        debug!(rabbit_id = req.rabbit_id, user_id = req.user_id, "Requesting breeding loan");

        let sql = format!("SELECT {RABBIT_COLUMNS} FROM rabbits WHERE id = ?1");
        let rabbit = sqlx::query_as::<_, Rabbit>(&sql)
            .bind(req.rabbit_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Rabbit", req.rabbit_id))?;

        if !rabbit.is_breeder {
            return Err(CoreError::NotABreeder(rabbit.id).into());
        }
        if !rabbit.is_available() {
            return Err(CoreError::RabbitUnavailable {
                rabbit_id: rabbit.id,
                status: rabbit.status.to_string(),
            }
            .into());
        }

        let user: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?1")
            .bind(req.user_id)
            .fetch_optional(&self.pool)
            .await?;
        if user.is_none() {
            return Err(DbError::not_found("User", req.user_id));
        }

        let sql = format!(
            "INSERT INTO breeding_loans (
                rabbit_id, user_id, status, fee_cents, start_date, due_date, notes,
                created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
             RETURNING {LOAN_COLUMNS}"
        );
        let loan = sqlx::query_as::<_, BreedingLoan>(&sql)
            .bind(rabbit.id)
            .bind(req.user_id)
            .bind(LoanStatus::Requested)
            .bind(rabbit.loan_fee_cents.unwrap_or(0))
            .bind(req.start_date)
            .bind(req.due_date)
            .bind(req.notes.as_deref())
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;

        info!(loan_id = loan.id, rabbit_id = rabbit.id, "Breeding loan requested");
        Ok(loan)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<BreedingLoan>> {
        let sql = format!("SELECT {LOAN_COLUMNS} FROM breeding_loans WHERE id = ?1");
        let loan = sqlx::query_as::<_, BreedingLoan>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(loan)
    }

    /// Lists loans, newest first.
    pub async fn list(&self, filter: &LoanFilter) -> DbResult<Vec<BreedingLoan>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {LOAN_COLUMNS} FROM breeding_loans WHERE 1 = 1"));
        if let Some(user_id) = filter.user_id {
            qb.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        qb.push(" ORDER BY id DESC");

        let loans = qb
            .build_query_as::<BreedingLoan>()
            .fetch_all(&self.pool)
            .await?;
        Ok(loans)
    }

    /// Applies an admin action to a loan.
    ///
    /// `start` refuses when the rabbit is no longer available (sold,
    /// reserved by an order, or lent out on another loan).
    pub async fn transition(&self, id: i64, action: LoanAction) -> DbResult<BreedingLoan> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {LOAN_COLUMNS} FROM breeding_loans WHERE id = ?1");
        let loan = sqlx::query_as::<_, BreedingLoan>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Loan", id))?;

        let next = loan.status.apply(action)?;
        let now = Utc::now();

        if let Some(rabbit_status) = action.rabbit_status_after() {
            let required = match action {
                LoanAction::Start => RabbitStatus::Available,
                _ => RabbitStatus::OnLoan,
            };
            let result = sqlx::query(
                "UPDATE rabbits SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
            )
            .bind(rabbit_status)
            .bind(now)
            .bind(loan.rabbit_id)
            .bind(required)
            .execute(&mut *tx)
            .await?;

            // Start must actually take the rabbit; a return tolerates an
            // admin having already moved it.
            if result.rows_affected() == 0 && action == LoanAction::Start {
                let current: Option<RabbitStatus> =
                    sqlx::query_scalar("SELECT status FROM rabbits WHERE id = ?1")
                        .bind(loan.rabbit_id)
                        .fetch_optional(&mut *tx)
                        .await?;
                return Err(CoreError::RabbitUnavailable {
                    rabbit_id: loan.rabbit_id,
                    status: current.map(|s| s.to_string()).unwrap_or_else(|| "missing".into()),
                }
                .into());
            }
        }

        let start_date = match action {
            LoanAction::Start => loan.start_date.or_else(|| Some(now.date_naive())),
            _ => loan.start_date,
        };
        let returned_at = match action {
            LoanAction::Return => Some(now),
            _ => loan.returned_at,
        };

        let sql = format!(
            "UPDATE breeding_loans
             SET status = ?1, start_date = ?2, returned_at = ?3, updated_at = ?4
             WHERE id = ?5
             RETURNING {LOAN_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, BreedingLoan>(&sql)
            .bind(next)
            .bind(start_date)
            .bind(returned_at)
            .bind(now)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(loan_id = id, action = %action, status = %next, "Loan updated");
        Ok(updated)
    }

    /// Cancels a loan on behalf of the user who requested it.
    ///
    /// Another user's loan is reported as not found.
    pub async fn cancel_by_user(&self, id: i64, user_id: i64) -> DbResult<BreedingLoan> {
        let loan = self
            .get_by_id(id)
            .await?
            .filter(|l| l.user_id == user_id)
            .ok_or_else(|| DbError::not_found("Loan", id))?;
        self.transition(loan.id, LoanAction::Cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{customer, rabbit_input, test_db};
    use chrono::NaiveDate;

    fn request(rabbit_id: i64, user_id: i64) -> LoanRequest {
        LoanRequest {
            rabbit_id,
            user_id,
            start_date: None,
            due_date: NaiveDate::from_ymd_opt(2024, 7, 1),
            notes: Some("Spring litter".to_string()),
        }
    }

    #[tokio::test]
    async fn test_request_copies_fee() {
        let db = test_db().await;
        let user = customer(&db, "ploy@example.com").await;
        let buck = db.rabbits().insert(&rabbit_input("Thunder", true)).await.unwrap();

        let loan = db.loans().request(&request(buck.id, user.id)).await.unwrap();
        assert_eq!(loan.status, LoanStatus::Requested);
        assert_eq!(Some(loan.fee_cents), buck.loan_fee_cents);
        assert_eq!(loan.notes.as_deref(), Some("Spring litter"));
    }

    #[tokio::test]
    async fn test_request_rejections() {
        let db = test_db().await;
        let user = customer(&db, "ploy@example.com").await;
        let pet = db.rabbits().insert(&rabbit_input("Mochi", false)).await.unwrap();
        let buck = db.rabbits().insert(&rabbit_input("Thunder", true)).await.unwrap();

        assert!(matches!(
            db.loans().request(&request(pet.id, user.id)).await,
            Err(DbError::Domain(CoreError::NotABreeder(_)))
        ));
        assert!(matches!(
            db.loans().request(&request(buck.id, 404)).await,
            Err(DbError::NotFound { .. })
        ));

        db.rabbits().set_status(buck.id, RabbitStatus::Sold).await.unwrap();
        assert!(matches!(
            db.loans().request(&request(buck.id, user.id)).await,
            Err(DbError::Domain(CoreError::RabbitUnavailable { .. }))
        ));
    }

    #[tokio::test]
    async fn test_lifecycle_moves_rabbit() {
        let db = test_db().await;
        let user = customer(&db, "ploy@example.com").await;
        let buck = db.rabbits().insert(&rabbit_input("Thunder", true)).await.unwrap();
        let loan = db.loans().request(&request(buck.id, user.id)).await.unwrap();

        db.loans().transition(loan.id, LoanAction::Approve).await.unwrap();
        let active = db.loans().transition(loan.id, LoanAction::Start).await.unwrap();
        assert_eq!(active.status, LoanStatus::Active);
        assert!(active.start_date.is_some());
        let rabbit = db.rabbits().get_by_id(buck.id).await.unwrap().unwrap();
        assert_eq!(rabbit.status, RabbitStatus::OnLoan);

        assert!(matches!(
            db.loans().transition(loan.id, LoanAction::Cancel).await,
            Err(DbError::Domain(CoreError::InvalidTransition { .. }))
        ));

        let returned = db.loans().transition(loan.id, LoanAction::Return).await.unwrap();
        assert_eq!(returned.status, LoanStatus::Returned);
        assert!(returned.returned_at.is_some());
        let rabbit = db.rabbits().get_by_id(buck.id).await.unwrap().unwrap();
        assert_eq!(rabbit.status, RabbitStatus::Available);
    }

    #[tokio::test]
    async fn test_start_fails_when_rabbit_taken() {
        let db = test_db().await;
        let user = customer(&db, "ploy@example.com").await;
        let buck = db.rabbits().insert(&rabbit_input("Thunder", true)).await.unwrap();
        let loan = db.loans().request(&request(buck.id, user.id)).await.unwrap();
        db.loans().transition(loan.id, LoanAction::Approve).await.unwrap();

        db.rabbits().set_status(buck.id, RabbitStatus::Reserved).await.unwrap();

        assert!(matches!(
            db.loans().transition(loan.id, LoanAction::Start).await,
            Err(DbError::Domain(CoreError::RabbitUnavailable { .. }))
        ));
        let loan = db.loans().get_by_id(loan.id).await.unwrap().unwrap();
        assert_eq!(loan.status, LoanStatus::Approved);
    }

    #[tokio::test]
    async fn test_cancel_by_user_and_list() {
        let db = test_db().await;
        let ploy = customer(&db, "ploy@example.com").await;
        let nok = customer(&db, "nok@example.com").await;
        let buck = db.rabbits().insert(&rabbit_input("Thunder", true)).await.unwrap();
        let loan = db.loans().request(&request(buck.id, ploy.id)).await.unwrap();

        assert!(matches!(
            db.loans().cancel_by_user(loan.id, nok.id).await,
            Err(DbError::NotFound { .. })
        ));
        let cancelled = db.loans().cancel_by_user(loan.id, ploy.id).await.unwrap();
        assert_eq!(cancelled.status, LoanStatus::Cancelled);

        let mine = db
            .loans()
            .list(&LoanFilter {
                user_id: Some(ploy.id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        let theirs = db
            .loans()
            .list(&LoanFilter {
                user_id: Some(nok.id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(theirs.is_empty());
    }
}
