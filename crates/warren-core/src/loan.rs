//! # Breeding Loans
//!
//! A customer borrows a breeder rabbit for a fixed period.
//!
//! ```text
//!  request ──► Requested ──approve──► Approved ──start──► Active ──return──► Returned
//!                  │                     │                  │
//!                  └──── cancel ─────────┘            rabbit: OnLoan   rabbit: Available
//!                          ▼
//!                      Cancelled
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::RabbitStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    #[default]
    Requested,
    Approved,
    Active,
    Returned,
    Cancelled,
}

impl LoanStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Requested => "requested",
            LoanStatus::Approved => "approved",
            LoanStatus::Active => "active",
            LoanStatus::Returned => "returned",
            LoanStatus::Cancelled => "cancelled",
        }
    }

    /// Applies an action, returning the resulting status.
    pub fn apply(self, action: LoanAction) -> CoreResult<LoanStatus> {
        use LoanStatus::*;
        let next = match (self, action) {
            (Requested, LoanAction::Approve) => Approved,
            (Approved, LoanAction::Start) => Active,
            (Active, LoanAction::Return) => Returned,
            (Requested, LoanAction::Cancel) | (Approved, LoanAction::Cancel) => Cancelled,
            _ => {
                return Err(CoreError::InvalidTransition {
                    entity: "loan",
                    from: self.to_string(),
                    action: action.to_string(),
                })
            }
        };
        Ok(next)
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Admin (and requester, for `Cancel`) actions on a loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LoanAction {
    Approve,
    Start,
    Return,
    Cancel,
}

impl LoanAction {
    /// The rabbit status implied by this action, if it changes.
    pub const fn rabbit_status_after(&self) -> Option<RabbitStatus> {
        match self {
            LoanAction::Start => Some(RabbitStatus::OnLoan),
            LoanAction::Return => Some(RabbitStatus::Available),
            LoanAction::Approve | LoanAction::Cancel => None,
        }
    }
}

impl fmt::Display for LoanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoanAction::Approve => "approve",
            LoanAction::Start => "start",
            LoanAction::Return => "return",
            LoanAction::Cancel => "cancel",
        })
    }
}

impl std::str::FromStr for LoanAction {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(LoanAction::Approve),
            "start" => Ok(LoanAction::Start),
            "return" => Ok(LoanAction::Return),
            "cancel" => Ok(LoanAction::Cancel),
            _ => Err(crate::error::ValidationError::NotAllowed {
                field: "action".to_string(),
                allowed: ["approve", "start", "return", "cancel"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }),
        }
    }
}

/// A breeding loan row.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct BreedingLoan {
    pub id: i64,
    pub rabbit_id: i64,
    pub user_id: i64,
    pub status: LoanStatus,
    /// Fee copied from the rabbit when the loan was requested.
    pub fee_cents: i64,
    #[ts(as = "Option<String>")]
    pub start_date: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub returned_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/loans`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LoanRequest {
    pub rabbit_id: i64,
    pub user_id: i64,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let s = LoanStatus::Requested;
        let s = s.apply(LoanAction::Approve).unwrap();
        assert_eq!(s, LoanStatus::Approved);
        let s = s.apply(LoanAction::Start).unwrap();
        assert_eq!(s, LoanStatus::Active);
        let s = s.apply(LoanAction::Return).unwrap();
        assert_eq!(s, LoanStatus::Returned);
    }

    #[test]
    fn test_cancel_window() {
        assert_eq!(
            LoanStatus::Requested.apply(LoanAction::Cancel).unwrap(),
            LoanStatus::Cancelled
        );
        assert_eq!(
            LoanStatus::Approved.apply(LoanAction::Cancel).unwrap(),
            LoanStatus::Cancelled
        );
        assert!(LoanStatus::Active.apply(LoanAction::Cancel).is_err());
        assert!(LoanStatus::Returned.apply(LoanAction::Cancel).is_err());
    }

    #[test]
    fn test_out_of_order_actions_rejected() {
        let err = LoanStatus::Requested.apply(LoanAction::Start).unwrap_err();
        assert_eq!(err.to_string(), "Cannot start loan in status requested");
        assert!(LoanStatus::Cancelled.apply(LoanAction::Approve).is_err());
    }

    #[test]
    fn test_rabbit_status_side_effects() {
        assert_eq!(
            LoanAction::Start.rabbit_status_after(),
            Some(RabbitStatus::OnLoan)
        );
        assert_eq!(
            LoanAction::Return.rabbit_status_after(),
            Some(RabbitStatus::Available)
        );
        assert_eq!(LoanAction::Approve.rabbit_status_after(), None);
    }

    #[test]
    fn test_action_parse() {
        assert_eq!("return".parse::<LoanAction>().unwrap(), LoanAction::Return);
        assert!("extend".parse::<LoanAction>().is_err());
    }
}
