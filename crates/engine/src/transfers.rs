//! Transfer audit records.
//!
//! A `TransferRecord` is the immutable audit entry for money moved between
//! two accounts. Rows are append-only: every ledger commit that changes
//! balances writes exactly one in the same atomic batch, and no code path
//! updates or deletes them afterwards.
//!
//! The owners of both accounts are denormalized onto the row
//! (`from_user_id`/`to_user_id`) so the debt netting query can match
//! settlement payments between two users without joining accounts twice.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, util::model_currency};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferKind {
    /// Plain inter-account move, no debt meaning.
    Transfer,
    /// Payment toward what `from_user_id` owes `to_user_id`; counted by the
    /// debt netting until the pair's next settlement close.
    Settlement,
}

impl TransferKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::Settlement => "settlement",
        }
    }
}

impl TryFrom<&str> for TransferKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "transfer" => Ok(Self::Transfer),
            "settlement" => Ok(Self::Settlement),
            other => Err(EngineError::InvalidId(format!(
                "invalid transfer kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub id: Uuid,
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub from_user_id: String,
    pub to_user_id: String,
    pub amount_minor: i64,
    pub currency: Currency,
    pub kind: TransferKind,
    pub note: Option<String>,
    pub idempotency_key: Option<String>,
    pub recorded_at: DateTime<Utc>,
    pub created_by: String,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transfers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub from_account_id: String,
    pub to_account_id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub kind: String,
    pub note: Option<String>,
    pub idempotency_key: Option<String>,
    pub recorded_at: DateTimeUtc,
    pub created_by: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::FromAccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    FromAccount,
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&TransferRecord> for ActiveModel {
    fn from(record: &TransferRecord) -> Self {
        Self {
            id: ActiveValue::Set(record.id.to_string()),
            from_account_id: ActiveValue::Set(record.from_account_id.to_string()),
            to_account_id: ActiveValue::Set(record.to_account_id.to_string()),
            from_user_id: ActiveValue::Set(record.from_user_id.clone()),
            to_user_id: ActiveValue::Set(record.to_user_id.clone()),
            amount_minor: ActiveValue::Set(record.amount_minor),
            currency: ActiveValue::Set(record.currency.code().to_string()),
            kind: ActiveValue::Set(record.kind.as_str().to_string()),
            note: ActiveValue::Set(record.note.clone()),
            idempotency_key: ActiveValue::Set(record.idempotency_key.clone()),
            recorded_at: ActiveValue::Set(record.recorded_at),
            created_by: ActiveValue::Set(record.created_by.clone()),
        }
    }
}

impl TryFrom<Model> for TransferRecord {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::InvalidId("invalid transfer id".to_string()))?,
            from_account_id: Uuid::parse_str(&model.from_account_id)
                .map_err(|_| EngineError::InvalidId("invalid account id".to_string()))?,
            to_account_id: Uuid::parse_str(&model.to_account_id)
                .map_err(|_| EngineError::InvalidId("invalid account id".to_string()))?,
            from_user_id: model.from_user_id,
            to_user_id: model.to_user_id,
            amount_minor: model.amount_minor,
            currency: model_currency(&model.currency)?,
            kind: TransferKind::try_from(model.kind.as_str())?,
            note: model.note,
            idempotency_key: model.idempotency_key,
            recorded_at: model.recorded_at,
            created_by: model.created_by,
        })
    }
}
