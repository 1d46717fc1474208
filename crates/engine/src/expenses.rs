//! Shared expenses.
//!
//! An `Expense` is the economic event behind a set of split obligations: one
//! payer covered a total amount and the non-payer participants each owe the
//! payer their share. The expense row itself never moves account balances;
//! the payer settled the bill with the outside world, not with a tracked
//! account.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, SplitShare, util::model_currency};

/// Result of recording or regenerating a shared expense: the persisted
/// expense id and the computed shares (payer's own share included).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpenseCreated {
    pub expense_id: Uuid,
    pub shares: Vec<SplitShare>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub payer_id: String,
    pub total_minor: i64,
    pub currency: Currency,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub created_by: String,
}

impl Expense {
    pub fn new(
        payer_id: String,
        total_minor: i64,
        currency: Currency,
        description: Option<String>,
        occurred_at: DateTime<Utc>,
        created_by: String,
    ) -> Result<Self, EngineError> {
        if total_minor < 0 {
            return Err(EngineError::InvalidAmount(
                "total_minor must be >= 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            payer_id,
            total_minor,
            currency,
            description,
            occurred_at,
            created_by,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub payer_id: String,
    pub total_minor: i64,
    pub currency: String,
    pub description: Option<String>,
    pub occurred_at: DateTimeUtc,
    pub created_by: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::obligations::Entity")]
    Obligations,
}

impl Related<super::obligations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Obligations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Expense> for ActiveModel {
    fn from(expense: &Expense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id.to_string()),
            payer_id: ActiveValue::Set(expense.payer_id.clone()),
            total_minor: ActiveValue::Set(expense.total_minor),
            currency: ActiveValue::Set(expense.currency.code().to_string()),
            description: ActiveValue::Set(expense.description.clone()),
            occurred_at: ActiveValue::Set(expense.occurred_at),
            created_by: ActiveValue::Set(expense.created_by.clone()),
        }
    }
}

impl TryFrom<Model> for Expense {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::InvalidId("invalid expense id".to_string()))?,
            payer_id: model.payer_id,
            total_minor: model.total_minor,
            currency: model_currency(&model.currency)?,
            description: model.description,
            occurred_at: model.occurred_at,
            created_by: model.created_by,
        })
    }
}
