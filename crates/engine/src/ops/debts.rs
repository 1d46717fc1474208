//! Debt aggregation between two users.
//!
//! Read-only: nothing here mutates state, so the balance can be recomputed
//! arbitrarily often (UI refresh, precondition checks before settlement or
//! member removal).

use chrono::{DateTime, Utc};
use sea_orm::{
    Condition, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};

use crate::{
    Currency, DebtBalance, ResultEngine, SplitObligation, TransferKind, obligations, transfers,
};

use super::{Engine, with_tx};

impl Engine {
    /// Reduces everything outstanding between `user_a` and `user_b` to one
    /// signed net balance.
    ///
    /// Unpaid obligations are summed in both directions; on-account
    /// settlement payments recorded since the pair's last close (the latest
    /// `paid_at` between them) reduce the outstanding net without touching
    /// the underlying obligations. A settle commit stamps `paid_at` and
    /// `recorded_at` with the same instant, so its own transfer never
    /// double-counts.
    pub async fn net_balance(&self, user_a: &str, user_b: &str) -> ResultEngine<DebtBalance> {
        with_tx!(self, |db_tx| {
            let (owed_ab, owed_ba, currency) =
                self.sum_unpaid_between(&db_tx, user_a, user_b).await?;
            let last_close = self.last_close_between(&db_tx, user_a, user_b).await?;
            let (paid_ab, paid_ba) = self
                .sum_on_account_between(&db_tx, user_a, user_b, last_close)
                .await?;

            let net_minor = owed_ab - owed_ba - paid_ab + paid_ba;
            Ok(DebtBalance::from_net(user_a, user_b, net_minor, currency))
        })
    }

    /// All unpaid obligations between the two users, either direction, in
    /// stable id order. The settlement UI picks from this list.
    pub async fn unpaid_obligations_between(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> ResultEngine<Vec<SplitObligation>> {
        with_tx!(self, |db_tx| {
            let models = obligations::Entity::find()
                .filter(obligations::Column::IsPaid.eq(false))
                .filter(pair_condition(user_a, user_b))
                .order_by_asc(obligations::Column::Id)
                .all(&db_tx)
                .await?;
            models
                .into_iter()
                .map(SplitObligation::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    async fn sum_unpaid_between(
        &self,
        db_tx: &DatabaseTransaction,
        user_a: &str,
        user_b: &str,
    ) -> ResultEngine<(i64, i64, Currency)> {
        let models = obligations::Entity::find()
            .filter(obligations::Column::IsPaid.eq(false))
            .filter(pair_condition(user_a, user_b))
            .all(db_tx)
            .await?;

        let mut owed_ab = 0i64;
        let mut owed_ba = 0i64;
        let mut currency = Currency::default();
        for model in models {
            let obligation = SplitObligation::try_from(model)?;
            currency = obligation.currency;
            if obligation.ower_id == user_a {
                owed_ab += obligation.amount_minor;
            } else {
                owed_ba += obligation.amount_minor;
            }
        }
        Ok((owed_ab, owed_ba, currency))
    }

    /// Latest `paid_at` among settled obligations between the pair; the
    /// boundary of the open netting period.
    async fn last_close_between(
        &self,
        db_tx: &DatabaseTransaction,
        user_a: &str,
        user_b: &str,
    ) -> ResultEngine<Option<DateTime<Utc>>> {
        let model = obligations::Entity::find()
            .filter(obligations::Column::IsPaid.eq(true))
            .filter(pair_condition(user_a, user_b))
            .order_by_desc(obligations::Column::PaidAt)
            .one(db_tx)
            .await?;
        Ok(model.and_then(|m| m.paid_at))
    }

    async fn sum_on_account_between(
        &self,
        db_tx: &DatabaseTransaction,
        user_a: &str,
        user_b: &str,
        last_close: Option<DateTime<Utc>>,
    ) -> ResultEngine<(i64, i64)> {
        let mut query = transfers::Entity::find()
            .filter(transfers::Column::Kind.eq(TransferKind::Settlement.as_str()))
            .filter(
                Condition::any()
                    .add(
                        Condition::all()
                            .add(transfers::Column::FromUserId.eq(user_a))
                            .add(transfers::Column::ToUserId.eq(user_b)),
                    )
                    .add(
                        Condition::all()
                            .add(transfers::Column::FromUserId.eq(user_b))
                            .add(transfers::Column::ToUserId.eq(user_a)),
                    ),
            );
        if let Some(close) = last_close {
            query = query.filter(transfers::Column::RecordedAt.gt(close));
        }
        let models = query.all(db_tx).await?;

        let mut paid_ab = 0i64;
        let mut paid_ba = 0i64;
        for model in models {
            if model.from_user_id == user_a {
                paid_ab += model.amount_minor;
            } else {
                paid_ba += model.amount_minor;
            }
        }
        Ok((paid_ab, paid_ba))
    }
}

fn pair_condition(user_a: &str, user_b: &str) -> Condition {
    Condition::any()
        .add(
            Condition::all()
                .add(obligations::Column::OwerId.eq(user_a))
                .add(obligations::Column::OwedToId.eq(user_b)),
        )
        .add(
            Condition::all()
                .add(obligations::Column::OwerId.eq(user_b))
                .add(obligations::Column::OwedToId.eq(user_a)),
        )
}
