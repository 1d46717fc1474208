//! The module contains the `Account` struct and its implementation.
//!
//! An account is a representation of a place money is kept (cash, a bank
//! account) owned by exactly one user. Its balance is mutated **only**
//! through the ledger commit path; `version` is the optimistic stamp that
//! conditional updates check so two concurrent commits cannot both apply
//! against the same snapshot.

use sea_orm::entity::{ActiveValue, prelude::*};
use uuid::Uuid;

use crate::{Currency, EngineError, util::model_currency};

#[derive(Clone, Debug, PartialEq)]
pub struct Account {
    /// Stable identifier, generated once and persisted, so the account can be
    /// renamed without breaking references.
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
    pub balance_minor: i64,
    /// Balance at creation time; the reconciliation base for
    /// `recompute_balances`.
    pub opening_balance_minor: i64,
    pub currency: Currency,
    pub version: i64,
    pub archived: bool,
}

impl Account {
    pub fn new(
        name: String,
        owner_id: String,
        opening_balance_minor: i64,
        currency: Currency,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name,
            balance_minor: opening_balance_minor,
            opening_balance_minor,
            currency,
            version: 0,
            archived: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub balance_minor: i64,
    pub opening_balance_minor: i64,
    pub currency: String,
    pub version: i64,
    pub archived: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Account> for ActiveModel {
    fn from(value: &Account) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            owner_id: ActiveValue::Set(value.owner_id.clone()),
            name: ActiveValue::Set(value.name.clone()),
            balance_minor: ActiveValue::Set(value.balance_minor),
            opening_balance_minor: ActiveValue::Set(value.opening_balance_minor),
            currency: ActiveValue::Set(value.currency.code().to_string()),
            version: ActiveValue::Set(value.version),
            archived: ActiveValue::Set(value.archived),
        }
    }
}

impl TryFrom<Model> for Account {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::InvalidId("invalid account id".to_string()))?,
            owner_id: model.owner_id,
            name: model.name,
            balance_minor: model.balance_minor,
            opening_balance_minor: model.opening_balance_minor,
            currency: model_currency(&model.currency)?,
            version: model.version,
            archived: model.archived,
        })
    }
}
