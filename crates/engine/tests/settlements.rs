use chrono::Utc;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use uuid::Uuid;

use engine::{
    BalanceOp, CommitCmd, DebtDirection, Engine, EngineError, OnAccountCmd, Participant,
    RegenerateSplitsCmd, SettleCmd, SharedExpenseCmd, TransferCmd, TransferKind,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn account_balance(engine: &Engine, account_id: Uuid, user_id: &str) -> i64 {
    engine
        .account(account_id, user_id)
        .await
        .unwrap()
        .balance_minor
}

/// One expense paid by `payer`, split evenly with `other`; returns the
/// obligation ids `other` now owes `payer`.
async fn even_expense(engine: &Engine, payer: &str, other: &str, total_minor: i64) -> Vec<Uuid> {
    engine
        .record_shared_expense(SharedExpenseCmd::new(
            payer,
            payer,
            total_minor,
            vec![Participant::new(payer, 1), Participant::new(other, 1)],
            Utc::now(),
        ))
        .await
        .unwrap();
    engine
        .unpaid_obligations_between(payer, other)
        .await
        .unwrap()
        .into_iter()
        .filter(|o| o.ower_id == other)
        .map(|o| o.id)
        .collect()
}

#[tokio::test]
async fn transfer_moves_balances_and_appends_one_audit_record() {
    let (engine, _db) = engine_with_db().await;
    let alice_acc = engine.new_account("Main", "alice", 100_00).await.unwrap();
    let bob_acc = engine.new_account("Main", "bob", 20_00).await.unwrap();

    let result = engine
        .transfer(TransferCmd::new(
            "alice",
            alice_acc,
            bob_acc,
            50_00,
            Utc::now(),
        ))
        .await
        .unwrap();

    assert_eq!(result.transfer_ids.len(), 1);
    assert_eq!(account_balance(&engine, alice_acc, "alice").await, 50_00);
    assert_eq!(account_balance(&engine, bob_acc, "bob").await, 70_00);

    let trail = engine
        .list_transfers_for_account(alice_acc, "alice", 10)
        .await
        .unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].amount_minor, 50_00);
    assert_eq!(trail[0].kind, TransferKind::Transfer);
    assert_eq!(trail[0].from_user_id, "alice");
    assert_eq!(trail[0].to_user_id, "bob");
}

#[tokio::test]
async fn transfer_rejects_insufficient_funds_without_side_effects() {
    let (engine, _db) = engine_with_db().await;
    let alice_acc = engine.new_account("Main", "alice", 100_00).await.unwrap();
    let bob_acc = engine.new_account("Main", "bob", 0).await.unwrap();

    let err = engine
        .transfer(TransferCmd::new(
            "alice",
            alice_acc,
            bob_acc,
            150_00,
            Utc::now(),
        ))
        .await
        .unwrap_err();

    assert_eq!(err, EngineError::InsufficientFunds("Main".to_string()));
    assert!(!err.is_retryable());
    assert_eq!(account_balance(&engine, alice_acc, "alice").await, 100_00);
    assert_eq!(account_balance(&engine, bob_acc, "bob").await, 0);
    assert!(
        engine
            .list_transfers_for_account(alice_acc, "alice", 10)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn transfer_rejects_same_source_and_destination() {
    let (engine, _db) = engine_with_db().await;
    let alice_acc = engine.new_account("Main", "alice", 100_00).await.unwrap();

    let err = engine
        .transfer(TransferCmd::new(
            "alice",
            alice_acc,
            alice_acc,
            10_00,
            Utc::now(),
        ))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidAmount("from_account_id and to_account_id must differ".to_string())
    );
}

#[tokio::test]
async fn only_the_owner_may_debit_an_account() {
    let (engine, _db) = engine_with_db().await;
    let alice_acc = engine.new_account("Main", "alice", 100_00).await.unwrap();
    let bob_acc = engine.new_account("Main", "bob", 0).await.unwrap();

    let err = engine
        .transfer(TransferCmd::new("bob", alice_acc, bob_acc, 10_00, Utc::now()))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
    assert_eq!(account_balance(&engine, alice_acc, "alice").await, 100_00);
}

#[tokio::test]
async fn shared_expense_creates_obligations_for_nonpayer_shares() {
    let (engine, _db) = engine_with_db().await;

    let created = engine
        .record_shared_expense(
            SharedExpenseCmd::new(
                "alice",
                "alice",
                90_00,
                vec![
                    Participant::new("alice", 1),
                    Participant::new("bob", 1),
                    Participant::new("carol", 1),
                ],
                Utc::now(),
            )
            .description("groceries"),
        )
        .await
        .unwrap();

    let share_sum: i64 = created.shares.iter().map(|s| s.amount.minor()).sum();
    assert_eq!(share_sum, 90_00);

    let (expense, obligations) = engine.expense(created.expense_id).await.unwrap();
    assert_eq!(expense.payer_id, "alice");
    assert_eq!(expense.description.as_deref(), Some("groceries"));
    assert_eq!(obligations.len(), 2);
    assert!(obligations.iter().all(|o| o.owed_to_id == "alice"));
    assert!(obligations.iter().all(|o| !o.is_paid));
    assert_eq!(obligations.iter().map(|o| o.amount_minor).sum::<i64>(), 60_00);
}

#[tokio::test]
async fn net_balance_nets_both_directions_symmetrically() {
    let (engine, _db) = engine_with_db().await;

    // bob fronted 60.00 split evenly → alice owes bob 30.00;
    // alice fronted 20.00 split evenly → bob owes alice 10.00.
    even_expense(&engine, "bob", "alice", 60_00).await;
    even_expense(&engine, "alice", "bob", 20_00).await;

    let balance = engine.net_balance("alice", "bob").await.unwrap();
    assert_eq!(balance.net_minor, 20_00);
    assert_eq!(balance.direction, DebtDirection::FirstOwesSecond);

    let mirrored = engine.net_balance("bob", "alice").await.unwrap();
    assert_eq!(mirrored.net_minor, -20_00);
    assert_eq!(mirrored.direction, DebtDirection::SecondOwesFirst);
    assert_eq!(balance.magnitude(), mirrored.magnitude());
}

#[tokio::test]
async fn settle_marks_obligations_paid_and_moves_funds() {
    let (engine, _db) = engine_with_db().await;
    let alice_acc = engine.new_account("Main", "alice", 100_00).await.unwrap();
    let bob_acc = engine.new_account("Main", "bob", 0).await.unwrap();

    let owed = even_expense(&engine, "bob", "alice", 60_00).await;
    assert_eq!(owed.len(), 1);

    let result = engine
        .settle(
            SettleCmd::new("alice", owed.clone(), Utc::now())
                .accounts(alice_acc, bob_acc)
                .note("paying you back"),
        )
        .await
        .unwrap();

    assert_eq!(result.settled_obligation_ids, owed);
    assert_eq!(result.transfer_ids.len(), 1);
    assert_eq!(account_balance(&engine, alice_acc, "alice").await, 70_00);
    assert_eq!(account_balance(&engine, bob_acc, "bob").await, 30_00);

    let balance = engine.net_balance("alice", "bob").await.unwrap();
    assert_eq!(balance.direction, DebtDirection::Settled);
    assert!(
        engine
            .unpaid_obligations_between("alice", "bob")
            .await
            .unwrap()
            .is_empty()
    );

    let trail = engine
        .list_transfers_for_account(bob_acc, "bob", 10)
        .await
        .unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].kind, TransferKind::Settlement);
}

#[tokio::test]
async fn on_account_payment_reduces_net_until_the_next_close() {
    let (engine, _db) = engine_with_db().await;
    let alice_acc = engine.new_account("Main", "alice", 100_00).await.unwrap();
    let bob_acc = engine.new_account("Main", "bob", 0).await.unwrap();

    let owed = even_expense(&engine, "bob", "alice", 60_00).await;

    engine
        .settle_on_account(OnAccountCmd::new(
            "alice",
            alice_acc,
            bob_acc,
            10_00,
            Utc::now(),
        ))
        .await
        .unwrap();

    let balance = engine.net_balance("alice", "bob").await.unwrap();
    assert_eq!(balance.net_minor, 20_00);
    assert_eq!(balance.direction, DebtDirection::FirstOwesSecond);

    // Clearing the obligations moves only the remaining due and closes the
    // netting period, so the earlier payment stops counting.
    engine
        .settle(
            SettleCmd::new("alice", owed, Utc::now())
                .accounts(alice_acc, bob_acc)
                .amount_minor(20_00),
        )
        .await
        .unwrap();

    assert_eq!(account_balance(&engine, alice_acc, "alice").await, 70_00);
    assert_eq!(account_balance(&engine, bob_acc, "bob").await, 30_00);
    let balance = engine.net_balance("alice", "bob").await.unwrap();
    assert_eq!(balance.net_minor, 0);
    assert_eq!(balance.direction, DebtDirection::Settled);
}

#[tokio::test]
async fn settle_rejects_double_clearing() {
    let (engine, _db) = engine_with_db().await;
    let owed = even_expense(&engine, "bob", "alice", 60_00).await;

    engine
        .settle(SettleCmd::new("alice", owed.clone(), Utc::now()))
        .await
        .unwrap();

    let err = engine
        .settle(SettleCmd::new("alice", owed.clone(), Utc::now()))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::AlreadySettled(owed[0].to_string()));
}

#[tokio::test]
async fn settle_rejects_someone_elses_obligations() {
    let (engine, _db) = engine_with_db().await;
    let owed = even_expense(&engine, "bob", "alice", 60_00).await;

    let err = engine
        .settle(SettleCmd::new("bob", owed, Utc::now()))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn commit_rejection_leaves_no_partial_state() {
    let (engine, _db) = engine_with_db().await;
    let alice_acc = engine.new_account("Main", "alice", 100_00).await.unwrap();
    let missing = Uuid::new_v4();

    let err = engine
        .commit(CommitCmd::new(
            "alice",
            Utc::now(),
            vec![
                BalanceOp::debit(alice_acc, 50_00),
                BalanceOp::credit(missing, 50_00),
                BalanceOp::AppendTransfer {
                    from_account_id: alice_acc,
                    to_account_id: missing,
                    amount_minor: 50_00,
                    kind: TransferKind::Transfer,
                },
            ],
        ))
        .await
        .unwrap_err();

    assert_eq!(err, EngineError::KeyNotFound("account not exists".to_string()));
    assert_eq!(account_balance(&engine, alice_acc, "alice").await, 100_00);
    assert!(
        engine
            .list_transfers_for_account(alice_acc, "alice", 10)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn unbalanced_batches_trip_the_conservation_invariant() {
    let (engine, _db) = engine_with_db().await;
    let alice_acc = engine.new_account("Main", "alice", 100_00).await.unwrap();
    let bob_acc = engine.new_account("Main", "bob", 0).await.unwrap();

    // Deltas that do not sum to zero.
    let err = engine
        .commit(CommitCmd::new(
            "alice",
            Utc::now(),
            vec![
                BalanceOp::debit(alice_acc, 50_00),
                BalanceOp::credit(bob_acc, 30_00),
                BalanceOp::AppendTransfer {
                    from_account_id: alice_acc,
                    to_account_id: bob_acc,
                    amount_minor: 50_00,
                    kind: TransferKind::Transfer,
                },
            ],
        ))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Invariant("account deltas do not sum to zero".to_string())
    );

    // Movement without its audit record.
    let err = engine
        .commit(CommitCmd::new(
            "alice",
            Utc::now(),
            vec![
                BalanceOp::debit(alice_acc, 50_00),
                BalanceOp::credit(bob_acc, 50_00),
            ],
        ))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Invariant("audit records do not cover the moved amount".to_string())
    );

    assert_eq!(account_balance(&engine, alice_acc, "alice").await, 100_00);
    assert_eq!(account_balance(&engine, bob_acc, "bob").await, 0);
}

#[tokio::test]
async fn idempotency_key_makes_transfer_replay_safe() {
    let (engine, _db) = engine_with_db().await;
    let alice_acc = engine.new_account("Main", "alice", 100_00).await.unwrap();
    let bob_acc = engine.new_account("Main", "bob", 0).await.unwrap();

    let first = engine
        .transfer(
            TransferCmd::new("alice", alice_acc, bob_acc, 25_00, Utc::now())
                .idempotency_key("rent-2026-01"),
        )
        .await
        .unwrap();
    let replay = engine
        .transfer(
            TransferCmd::new("alice", alice_acc, bob_acc, 25_00, Utc::now())
                .idempotency_key("rent-2026-01"),
        )
        .await
        .unwrap();

    assert_eq!(first.transfer_ids, replay.transfer_ids);
    assert_eq!(account_balance(&engine, alice_acc, "alice").await, 75_00);
    assert_eq!(account_balance(&engine, bob_acc, "bob").await, 25_00);
    assert_eq!(
        engine
            .list_transfers_for_account(alice_acc, "alice", 10)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn regenerate_replaces_the_obligation_set_in_full() {
    let (engine, _db) = engine_with_db().await;

    let created = engine
        .record_shared_expense(SharedExpenseCmd::new(
            "alice",
            "alice",
            90_00,
            vec![
                Participant::new("alice", 1),
                Participant::new("bob", 1),
                Participant::new("carol", 1),
            ],
            Utc::now(),
        ))
        .await
        .unwrap();

    let regenerated = engine
        .regenerate_splits(RegenerateSplitsCmd::new(
            "alice",
            created.expense_id,
            vec![
                Participant::new("alice", 1),
                Participant::new("bob", 2),
                Participant::new("carol", 0),
            ],
        ))
        .await
        .unwrap();

    let (_, obligations) = engine.expense(regenerated.expense_id).await.unwrap();
    assert_eq!(obligations.len(), 1);
    assert_eq!(obligations[0].ower_id, "bob");
    assert_eq!(obligations[0].amount_minor, 60_00);
}

#[tokio::test]
async fn regenerate_is_rejected_once_an_obligation_is_paid() {
    let (engine, _db) = engine_with_db().await;
    let owed = even_expense(&engine, "bob", "alice", 60_00).await;
    let expense_id = engine
        .unpaid_obligations_between("alice", "bob")
        .await
        .unwrap()[0]
        .expense_id;

    engine
        .settle(SettleCmd::new("alice", owed, Utc::now()))
        .await
        .unwrap();

    let err = engine
        .regenerate_splits(RegenerateSplitsCmd::new(
            "bob",
            expense_id,
            vec![Participant::new("bob", 1), Participant::new("alice", 1)],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AlreadySettled(_)));
}

#[tokio::test]
async fn archived_accounts_reject_ledger_operations() {
    let (engine, _db) = engine_with_db().await;
    let alice_acc = engine.new_account("Main", "alice", 100_00).await.unwrap();
    let bob_acc = engine.new_account("Main", "bob", 0).await.unwrap();

    engine.archive_account(bob_acc, "bob").await.unwrap();

    let err = engine
        .transfer(TransferCmd::new(
            "alice",
            alice_acc,
            bob_acc,
            10_00,
            Utc::now(),
        ))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Forbidden("account 'Main' is archived".to_string()));
}

#[tokio::test]
async fn recompute_balances_restores_corrupted_state_from_the_audit_trail() {
    let (engine, db) = engine_with_db().await;
    let backend = db.get_database_backend();
    let alice_acc = engine.new_account("Main", "alice", 100_00).await.unwrap();
    let bob_acc = engine.new_account("Main", "bob", 0).await.unwrap();

    engine
        .transfer(TransferCmd::new(
            "alice",
            alice_acc,
            bob_acc,
            25_00,
            Utc::now(),
        ))
        .await
        .unwrap();

    // Corrupt denormalized balances directly in DB.
    for account_id in [alice_acc, bob_acc] {
        db.execute(Statement::from_sql_and_values(
            backend,
            "UPDATE accounts SET balance_minor = ? WHERE id = ?;",
            vec![999i64.into(), account_id.to_string().into()],
        ))
        .await
        .unwrap();
    }

    engine.recompute_balances("alice").await.unwrap();
    engine.recompute_balances("bob").await.unwrap();

    assert_eq!(account_balance(&engine, alice_acc, "alice").await, 75_00);
    assert_eq!(account_balance(&engine, bob_acc, "bob").await, 25_00);
}

#[tokio::test]
async fn public_value_types_serialize_for_api_consumers() {
    let (engine, _db) = engine_with_db().await;
    even_expense(&engine, "bob", "alice", 60_00).await;

    let balance = engine.net_balance("alice", "bob").await.unwrap();
    let json = serde_json::to_value(&balance).unwrap();
    assert_eq!(json["direction"], "first_owes_second");
    assert_eq!(json["net_minor"], 30_00);

    let shares = engine::split(
        engine::Money::new(10_00),
        &[Participant::new("a", 1), Participant::new("b", 1)],
    );
    let json = serde_json::to_value(&shares).unwrap();
    assert_eq!(json[0]["amount"], 5_00);
}
