use chrono::Utc;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use uuid::Uuid;

use engine::{
    CategoryKind, CreateCategoryCmd, CreateTransactionCmd, CreateTransferCmd, CreateWalletCmd,
    Engine, LedgerError, SignupCmd, TransactionKind, UpdateTransactionCmd, UpdateTransferCmd,
    UpdateWalletCmd, WalletKind,
};
use migration::MigratorTrait;

async fn engine_with_user() -> (Engine, DatabaseConnection, String, Uuid) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db.clone()).build();
    let user_id = engine
        .signup(SignupCmd {
            email: "alice@example.com".to_string(),
            password: "password".to_string(),
            currency: "EUR".to_string(),
        })
        .await
        .unwrap();
    let cash_id = engine.wallets(&user_id).await.unwrap()[0].id;
    (engine, db, user_id, cash_id)
}

fn income(user_id: &str, wallet_id: Uuid, amount_minor: i64) -> CreateTransactionCmd {
    CreateTransactionCmd {
        user_id: user_id.to_string(),
        wallet_id,
        category_id: None,
        amount_minor,
        kind: TransactionKind::Income,
        occurred_at: Utc::now(),
        note: None,
        tags: None,
        exclude_from_report: false,
    }
}

fn expense(user_id: &str, wallet_id: Uuid, amount_minor: i64) -> CreateTransactionCmd {
    CreateTransactionCmd {
        kind: TransactionKind::Expense,
        ..income(user_id, wallet_id, amount_minor)
    }
}

#[tokio::test]
async fn signup_creates_starter_wallet() {
    let (engine, _db, user_id, cash_id) = engine_with_user().await;

    let wallets = engine.wallets(&user_id).await.unwrap();
    assert_eq!(wallets.len(), 1);
    assert_eq!(wallets[0].id, cash_id);
    assert_eq!(wallets[0].name, "Cash");
    assert_eq!(wallets[0].balance, 0);
    assert_eq!(wallets[0].kind, WalletKind::Available);
}

#[tokio::test]
async fn signup_rejects_duplicate_email() {
    let (engine, _db, _user_id, _cash_id) = engine_with_user().await;

    let err = engine
        .signup(SignupCmd {
            email: "Alice@Example.com".to_string(),
            password: "other".to_string(),
            currency: "EUR".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::ExistingKey(_)));
}

// Wallet starts at 0. Expense 200 -> -200. Income 500 -> 300. Raise the
// expense to 350 -> 150. Delete the income -> -350.
#[tokio::test]
async fn create_update_delete_chain_keeps_ledger_arithmetic() {
    let (engine, _db, user_id, cash_id) = engine_with_user().await;

    let tx1 = engine
        .create_transaction(expense(&user_id, cash_id, 200))
        .await
        .unwrap();
    assert_eq!(engine.wallet(cash_id, &user_id).await.unwrap().balance, -200);

    let tx2 = engine
        .create_transaction(income(&user_id, cash_id, 500))
        .await
        .unwrap();
    assert_eq!(engine.wallet(cash_id, &user_id).await.unwrap().balance, 300);

    engine
        .update_transaction(UpdateTransactionCmd {
            user_id: user_id.clone(),
            transaction_id: tx1,
            amount_minor: Some(350),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(engine.wallet(cash_id, &user_id).await.unwrap().balance, 150);

    engine.delete_transaction(tx2, &user_id).await.unwrap();
    assert_eq!(engine.wallet(cash_id, &user_id).await.unwrap().balance, -350);
}

#[tokio::test]
async fn debt_flows_in_and_loan_flows_out() {
    let (engine, _db, user_id, cash_id) = engine_with_user().await;

    engine
        .create_transaction(CreateTransactionCmd {
            kind: TransactionKind::Debt,
            ..income(&user_id, cash_id, 1000)
        })
        .await
        .unwrap();
    assert_eq!(engine.wallet(cash_id, &user_id).await.unwrap().balance, 1000);

    engine
        .create_transaction(CreateTransactionCmd {
            kind: TransactionKind::Loan,
            ..income(&user_id, cash_id, 400)
        })
        .await
        .unwrap();
    assert_eq!(engine.wallet(cash_id, &user_id).await.unwrap().balance, 600);
}

#[tokio::test]
async fn flipping_kind_changes_balance_by_twice_the_amount() {
    let (engine, _db, user_id, cash_id) = engine_with_user().await;

    let tx = engine
        .create_transaction(expense(&user_id, cash_id, 500))
        .await
        .unwrap();
    assert_eq!(engine.wallet(cash_id, &user_id).await.unwrap().balance, -500);

    engine
        .update_transaction(UpdateTransactionCmd {
            user_id: user_id.clone(),
            transaction_id: tx,
            kind: Some(TransactionKind::Income),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(engine.wallet(cash_id, &user_id).await.unwrap().balance, 500);
}

#[tokio::test]
async fn delete_then_recreate_restores_balance() {
    let (engine, _db, user_id, cash_id) = engine_with_user().await;

    engine
        .create_transaction(income(&user_id, cash_id, 700))
        .await
        .unwrap();
    let tx = engine
        .create_transaction(expense(&user_id, cash_id, 250))
        .await
        .unwrap();
    let before = engine.wallet(cash_id, &user_id).await.unwrap().balance;

    engine.delete_transaction(tx, &user_id).await.unwrap();
    engine
        .create_transaction(expense(&user_id, cash_id, 250))
        .await
        .unwrap();

    assert_eq!(engine.wallet(cash_id, &user_id).await.unwrap().balance, before);
}

#[tokio::test]
async fn moving_a_transaction_updates_both_wallets() {
    let (engine, _db, user_id, cash_id) = engine_with_user().await;
    let bank_id = engine
        .create_wallet(CreateWalletCmd {
            user_id: user_id.clone(),
            name: "Bank".to_string(),
            kind: WalletKind::Available,
            currency: "EUR".to_string(),
            initial_balance: 0,
            icon: None,
            color: None,
        })
        .await
        .unwrap();

    let tx = engine
        .create_transaction(expense(&user_id, cash_id, 300))
        .await
        .unwrap();
    engine
        .update_transaction(UpdateTransactionCmd {
            user_id: user_id.clone(),
            transaction_id: tx,
            wallet_id: Some(bank_id),
            amount_minor: Some(450),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(engine.wallet(cash_id, &user_id).await.unwrap().balance, 0);
    assert_eq!(engine.wallet(bank_id, &user_id).await.unwrap().balance, -450);
}

#[tokio::test]
async fn transfer_creates_two_linked_legs() {
    let (engine, _db, user_id, cash_id) = engine_with_user().await;
    let bank_id = engine
        .create_wallet(CreateWalletCmd {
            user_id: user_id.clone(),
            name: "Bank".to_string(),
            kind: WalletKind::Available,
            currency: "EUR".to_string(),
            initial_balance: 0,
            icon: None,
            color: None,
        })
        .await
        .unwrap();

    let (out_id, in_id) = engine
        .create_transfer(CreateTransferCmd {
            user_id: user_id.clone(),
            from_wallet_id: cash_id,
            to_wallet_id: bank_id,
            amount_minor: 1000,
            occurred_at: Utc::now(),
            note: Some("move".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(engine.wallet(cash_id, &user_id).await.unwrap().balance, -1000);
    assert_eq!(engine.wallet(bank_id, &user_id).await.unwrap().balance, 1000);

    let outgoing = engine.transaction(out_id, &user_id).await.unwrap();
    let incoming = engine.transaction(in_id, &user_id).await.unwrap();
    assert!(outgoing.is_transfer);
    assert_eq!(outgoing.kind, TransactionKind::Expense);
    assert_eq!(outgoing.linked_transaction_id, Some(in_id));
    assert_eq!(outgoing.to_wallet_id, Some(bank_id));
    assert!(incoming.is_transfer);
    assert_eq!(incoming.kind, TransactionKind::Income);
    assert_eq!(incoming.linked_transaction_id, Some(out_id));
}

#[tokio::test]
async fn transfer_to_same_wallet_is_rejected() {
    let (engine, _db, user_id, cash_id) = engine_with_user().await;

    let err = engine
        .create_transfer(CreateTransferCmd {
            user_id: user_id.clone(),
            from_wallet_id: cash_id,
            to_wallet_id: cash_id,
            amount_minor: 100,
            occurred_at: Utc::now(),
            note: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidArgument(_)));
    assert_eq!(engine.wallet(cash_id, &user_id).await.unwrap().balance, 0);
    assert!(engine.transactions(&user_id, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn transfer_legs_cannot_be_edited_directly() {
    let (engine, _db, user_id, cash_id) = engine_with_user().await;
    let bank_id = engine
        .create_wallet(CreateWalletCmd {
            user_id: user_id.clone(),
            name: "Bank".to_string(),
            kind: WalletKind::Available,
            currency: "EUR".to_string(),
            initial_balance: 0,
            icon: None,
            color: None,
        })
        .await
        .unwrap();
    let (out_id, _in_id) = engine
        .create_transfer(CreateTransferCmd {
            user_id: user_id.clone(),
            from_wallet_id: cash_id,
            to_wallet_id: bank_id,
            amount_minor: 100,
            occurred_at: Utc::now(),
            note: None,
        })
        .await
        .unwrap();

    let err = engine
        .update_transaction(UpdateTransactionCmd {
            user_id: user_id.clone(),
            transaction_id: out_id,
            amount_minor: Some(50),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidArgument(_)));

    let err = engine.delete_transaction(out_id, &user_id).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidArgument(_)));
}

#[tokio::test]
async fn transfer_update_and_delete_touch_both_legs() {
    let (engine, _db, user_id, cash_id) = engine_with_user().await;
    let bank_id = engine
        .create_wallet(CreateWalletCmd {
            user_id: user_id.clone(),
            name: "Bank".to_string(),
            kind: WalletKind::Available,
            currency: "EUR".to_string(),
            initial_balance: 0,
            icon: None,
            color: None,
        })
        .await
        .unwrap();
    let (out_id, in_id) = engine
        .create_transfer(CreateTransferCmd {
            user_id: user_id.clone(),
            from_wallet_id: cash_id,
            to_wallet_id: bank_id,
            amount_minor: 1000,
            occurred_at: Utc::now(),
            note: None,
        })
        .await
        .unwrap();

    // Addressing the incoming leg must reprice both.
    engine
        .update_transfer(UpdateTransferCmd {
            user_id: user_id.clone(),
            transaction_id: in_id,
            amount_minor: Some(400),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(engine.wallet(cash_id, &user_id).await.unwrap().balance, -400);
    assert_eq!(engine.wallet(bank_id, &user_id).await.unwrap().balance, 400);
    assert_eq!(
        engine.transaction(out_id, &user_id).await.unwrap().amount_minor,
        400
    );

    engine.delete_transfer(out_id, &user_id).await.unwrap();
    assert_eq!(engine.wallet(cash_id, &user_id).await.unwrap().balance, 0);
    assert_eq!(engine.wallet(bank_id, &user_id).await.unwrap().balance, 0);
    assert!(engine.transactions(&user_id, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn recalculation_restores_corrupted_balances_and_is_idempotent() {
    let (engine, db, user_id, cash_id) = engine_with_user().await;

    engine
        .create_transaction(income(&user_id, cash_id, 1000))
        .await
        .unwrap();
    engine
        .create_transaction(expense(&user_id, cash_id, 300))
        .await
        .unwrap();
    engine
        .create_transaction(CreateTransactionCmd {
            kind: TransactionKind::Debt,
            ..income(&user_id, cash_id, 200)
        })
        .await
        .unwrap();
    engine
        .create_transaction(CreateTransactionCmd {
            kind: TransactionKind::Loan,
            ..income(&user_id, cash_id, 50)
        })
        .await
        .unwrap();
    let live = engine.wallet(cash_id, &user_id).await.unwrap().balance;
    assert_eq!(live, 850);

    // Corrupt the cached balance directly in the store.
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "UPDATE wallets SET balance = ? WHERE id = ?;",
        vec![999_999i64.into(), cash_id.to_string().into()],
    ))
    .await
    .unwrap();

    let written = engine.recalculate_balances(&user_id).await.unwrap();
    assert_eq!(written, 1);
    assert_eq!(engine.wallet(cash_id, &user_id).await.unwrap().balance, live);

    // Second run with no intervening edits changes nothing.
    engine.recalculate_balances(&user_id).await.unwrap();
    assert_eq!(engine.wallet(cash_id, &user_id).await.unwrap().balance, live);
}

#[tokio::test]
async fn reorder_assigns_exact_orders_and_spares_other_kind() {
    let (engine, _db, user_id, cash_id) = engine_with_user().await;
    let bank_id = engine
        .create_wallet(CreateWalletCmd {
            user_id: user_id.clone(),
            name: "Bank".to_string(),
            kind: WalletKind::Available,
            currency: "EUR".to_string(),
            initial_balance: 0,
            icon: None,
            color: None,
        })
        .await
        .unwrap();
    let visa_id = engine
        .create_wallet(CreateWalletCmd {
            user_id: user_id.clone(),
            name: "Visa".to_string(),
            kind: WalletKind::Credit,
            currency: "EUR".to_string(),
            initial_balance: 500_000,
            icon: None,
            color: None,
        })
        .await
        .unwrap();

    engine
        .reorder_wallets(&user_id, &[(bank_id, 1), (cash_id, 2)])
        .await
        .unwrap();

    assert_eq!(engine.wallet(bank_id, &user_id).await.unwrap().display_order, 1);
    assert_eq!(engine.wallet(cash_id, &user_id).await.unwrap().display_order, 2);
    assert_eq!(engine.wallet(visa_id, &user_id).await.unwrap().display_order, 1);
}

#[tokio::test]
async fn empty_reorder_is_rejected() {
    let (engine, _db, user_id, _cash_id) = engine_with_user().await;

    let err = engine.reorder_wallets(&user_id, &[]).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidArgument(_)));
}

#[tokio::test]
async fn category_kind_must_match_transaction_kind() {
    let (engine, _db, user_id, cash_id) = engine_with_user().await;
    let salary_id = engine
        .create_category(CreateCategoryCmd {
            user_id: user_id.clone(),
            name: "Salary".to_string(),
            kind: CategoryKind::Income,
            parent_id: None,
            icon: None,
            color: None,
            display_order: None,
        })
        .await
        .unwrap();

    let err = engine
        .create_transaction(CreateTransactionCmd {
            category_id: Some(salary_id),
            ..expense(&user_id, cash_id, 100)
        })
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidArgument(_)));

    let tx = engine
        .create_transaction(CreateTransactionCmd {
            category_id: Some(salary_id),
            ..income(&user_id, cash_id, 100)
        })
        .await
        .unwrap();
    assert_eq!(
        engine.transaction(tx, &user_id).await.unwrap().category_id,
        Some(salary_id)
    );
}

#[tokio::test]
async fn kind_flip_with_stale_category_is_rejected() {
    let (engine, _db, user_id, cash_id) = engine_with_user().await;
    let food_id = engine
        .create_category(CreateCategoryCmd {
            user_id: user_id.clone(),
            name: "Food".to_string(),
            kind: CategoryKind::Expense,
            parent_id: None,
            icon: None,
            color: None,
            display_order: None,
        })
        .await
        .unwrap();
    let tx = engine
        .create_transaction(CreateTransactionCmd {
            category_id: Some(food_id),
            ..expense(&user_id, cash_id, 100)
        })
        .await
        .unwrap();

    // A kind-only patch would leave an income transaction carrying an
    // expense category.
    let err = engine
        .update_transaction(UpdateTransactionCmd {
            user_id: user_id.clone(),
            transaction_id: tx,
            kind: Some(TransactionKind::Income),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidArgument(_)));

    let stored = engine.transaction(tx, &user_id).await.unwrap();
    assert_eq!(stored.kind, TransactionKind::Expense);
    assert_eq!(stored.category_id, Some(food_id));
    assert_eq!(engine.wallet(cash_id, &user_id).await.unwrap().balance, -100);
}

#[tokio::test]
async fn explicit_null_clears_the_category() {
    let (engine, _db, user_id, cash_id) = engine_with_user().await;
    let food_id = engine
        .create_category(CreateCategoryCmd {
            user_id: user_id.clone(),
            name: "Food".to_string(),
            kind: CategoryKind::Expense,
            parent_id: None,
            icon: None,
            color: None,
            display_order: None,
        })
        .await
        .unwrap();
    let tx = engine
        .create_transaction(CreateTransactionCmd {
            category_id: Some(food_id),
            ..expense(&user_id, cash_id, 100)
        })
        .await
        .unwrap();

    engine
        .update_transaction(UpdateTransactionCmd {
            user_id: user_id.clone(),
            transaction_id: tx,
            kind: Some(TransactionKind::Income),
            category_id: Some(None),
            ..Default::default()
        })
        .await
        .unwrap();

    let stored = engine.transaction(tx, &user_id).await.unwrap();
    assert_eq!(stored.kind, TransactionKind::Income);
    assert_eq!(stored.category_id, None);
    assert_eq!(engine.wallet(cash_id, &user_id).await.unwrap().balance, 100);
}

#[tokio::test]
async fn blank_note_patch_clears_the_note() {
    let (engine, _db, user_id, cash_id) = engine_with_user().await;
    let tx = engine
        .create_transaction(CreateTransactionCmd {
            note: Some("groceries".to_string()),
            ..expense(&user_id, cash_id, 100)
        })
        .await
        .unwrap();

    engine
        .update_transaction(UpdateTransactionCmd {
            user_id: user_id.clone(),
            transaction_id: tx,
            note: Some("   ".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(engine.transaction(tx, &user_id).await.unwrap().note, None);
}

#[tokio::test]
async fn deleting_a_root_category_promotes_children() {
    let (engine, _db, user_id, _cash_id) = engine_with_user().await;
    let food_id = engine
        .create_category(CreateCategoryCmd {
            user_id: user_id.clone(),
            name: "Food".to_string(),
            kind: CategoryKind::Expense,
            parent_id: None,
            icon: None,
            color: None,
            display_order: None,
        })
        .await
        .unwrap();
    let lunch_id = engine
        .create_category(CreateCategoryCmd {
            user_id: user_id.clone(),
            name: "Lunch".to_string(),
            kind: CategoryKind::Expense,
            parent_id: Some(food_id),
            icon: None,
            color: None,
            display_order: None,
        })
        .await
        .unwrap();

    engine.delete_category(food_id, &user_id).await.unwrap();

    let categories = engine.categories(&user_id).await.unwrap();
    let lunch = categories.iter().find(|c| c.id == lunch_id).unwrap();
    assert_eq!(lunch.parent_id, None);
}

#[tokio::test]
async fn wallet_with_history_cannot_be_deleted() {
    let (engine, _db, user_id, cash_id) = engine_with_user().await;
    engine
        .create_transaction(income(&user_id, cash_id, 100))
        .await
        .unwrap();

    let err = engine.delete_wallet(cash_id, &user_id).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidArgument(_)));
    assert!(engine.wallet(cash_id, &user_id).await.is_ok());
}

#[tokio::test]
async fn editing_initial_balance_shifts_balance() {
    let (engine, _db, user_id, cash_id) = engine_with_user().await;
    engine
        .create_transaction(income(&user_id, cash_id, 100))
        .await
        .unwrap();

    engine
        .update_wallet(UpdateWalletCmd {
            user_id: user_id.clone(),
            wallet_id: cash_id,
            initial_balance: Some(5000),
            ..Default::default()
        })
        .await
        .unwrap();

    let wallet = engine.wallet(cash_id, &user_id).await.unwrap();
    assert_eq!(wallet.initial_balance, 5000);
    assert_eq!(wallet.balance, 5100);
}

#[tokio::test]
async fn credit_wallet_tracks_remaining_credit_and_debt() {
    let (engine, _db, user_id, _cash_id) = engine_with_user().await;
    let visa_id = engine
        .create_wallet(CreateWalletCmd {
            user_id: user_id.clone(),
            name: "Visa".to_string(),
            kind: WalletKind::Credit,
            currency: "EUR".to_string(),
            initial_balance: 500_000,
            icon: None,
            color: None,
        })
        .await
        .unwrap();

    engine
        .create_transaction(expense(&user_id, visa_id, 80_000))
        .await
        .unwrap();

    let visa = engine.wallet(visa_id, &user_id).await.unwrap();
    assert_eq!(visa.balance, 420_000);
    assert_eq!(visa.debt(), Some(80_000));
}

#[tokio::test]
async fn foreign_wallet_is_unauthorized() {
    let (engine, _db, user_id, cash_id) = engine_with_user().await;
    let other = engine
        .signup(SignupCmd {
            email: "bob@example.com".to_string(),
            password: "password".to_string(),
            currency: "EUR".to_string(),
        })
        .await
        .unwrap();

    let err = engine.wallet(cash_id, &other).await.unwrap_err();
    assert!(matches!(err, LedgerError::Unauthorized(_)));

    let err = engine
        .create_transaction(income(&other, cash_id, 100))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Unauthorized(_)));
    assert_eq!(engine.wallet(cash_id, &user_id).await.unwrap().balance, 0);
}

#[tokio::test]
async fn missing_transaction_is_not_found() {
    let (engine, _db, user_id, _cash_id) = engine_with_user().await;

    let err = engine
        .transaction(Uuid::new_v4(), &user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
}

#[tokio::test]
async fn wallet_feed_yields_snapshot_per_change() {
    let (engine, _db, user_id, cash_id) = engine_with_user().await;
    let mut feed = engine.watch_wallets(&user_id);

    // First recv is immediate.
    let wallets = feed.recv().await.unwrap();
    assert_eq!(wallets.len(), 1);
    assert_eq!(wallets[0].balance, 0);

    engine
        .create_transaction(income(&user_id, cash_id, 250))
        .await
        .unwrap();
    let wallets = feed.recv().await.unwrap();
    assert_eq!(wallets[0].balance, 250);
}

#[tokio::test]
async fn transaction_feed_restarts_from_current_state() {
    let (engine, _db, user_id, cash_id) = engine_with_user().await;
    engine
        .create_transaction(income(&user_id, cash_id, 100))
        .await
        .unwrap();

    let mut feed = engine.watch_transactions(&user_id);
    let txs = feed.recv().await.unwrap();
    assert_eq!(txs.len(), 1);
    drop(feed);

    // A fresh feed picks up from the current collection, not from a cursor.
    let mut feed = engine.watch_transactions(&user_id);
    let txs = feed.recv().await.unwrap();
    assert_eq!(txs.len(), 1);
}
