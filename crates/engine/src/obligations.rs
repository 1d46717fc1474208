//! Split obligations.
//!
//! A `SplitObligation` is one recorded debt arising from a shared expense:
//! `ower_id` owes `owed_to_id` the amount. Obligations are created in full
//! with their expense (or replaced in full when the expense's split is
//! regenerated) and are never deleted by settlement; settling flips
//! `is_paid`/`paid_at` and keeps the row as a historical record.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, util::model_currency};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SplitObligation {
    pub id: Uuid,
    pub expense_id: Uuid,
    pub ower_id: String,
    pub owed_to_id: String,
    pub amount_minor: i64,
    pub currency: Currency,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
}

impl SplitObligation {
    pub fn new(
        expense_id: Uuid,
        ower_id: String,
        owed_to_id: String,
        amount_minor: i64,
        currency: Currency,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            expense_id,
            ower_id,
            owed_to_id,
            amount_minor,
            currency,
            is_paid: false,
            paid_at: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "split_obligations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub expense_id: String,
    pub ower_id: String,
    pub owed_to_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub is_paid: bool,
    pub paid_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expenses::Entity",
        from = "Column::ExpenseId",
        to = "super::expenses::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Expenses,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&SplitObligation> for ActiveModel {
    fn from(obligation: &SplitObligation) -> Self {
        Self {
            id: ActiveValue::Set(obligation.id.to_string()),
            expense_id: ActiveValue::Set(obligation.expense_id.to_string()),
            ower_id: ActiveValue::Set(obligation.ower_id.clone()),
            owed_to_id: ActiveValue::Set(obligation.owed_to_id.clone()),
            amount_minor: ActiveValue::Set(obligation.amount_minor),
            currency: ActiveValue::Set(obligation.currency.code().to_string()),
            is_paid: ActiveValue::Set(obligation.is_paid),
            paid_at: ActiveValue::Set(obligation.paid_at),
        }
    }
}

impl TryFrom<Model> for SplitObligation {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::InvalidId("invalid obligation id".to_string()))?,
            expense_id: Uuid::parse_str(&model.expense_id)
                .map_err(|_| EngineError::InvalidId("invalid expense id".to_string()))?,
            ower_id: model.ower_id,
            owed_to_id: model.owed_to_id,
            amount_minor: model.amount_minor,
            currency: model_currency(&model.currency)?,
            is_paid: model.is_paid,
            paid_at: model.paid_at,
        })
    }
}
