//! The ledger engine: every mutation that touches a wallet balance lives
//! here, grouped per collection.
//!
//! All writes run inside a database transaction and go through the
//! [`with_commit!`] loop: a failed optimistic revision check on a wallet row
//! aborts the attempt and re-executes the whole body against fresh reads, up
//! to [`MAX_COMMIT_ATTEMPTS`]. Bodies therefore must not perform side effects
//! outside the transaction's write set.

use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseConnection, DatabaseTransaction, QueryFilter, prelude::*,
    sea_query::Expr,
};
use uuid::Uuid;

use crate::feed::ChangeFeed;
use crate::{LedgerError, ResultLedger, TransactionKind};

mod categories;
mod classify;
mod profile;
mod recalculate;
mod reorder;
mod transactions;
mod transfers;
mod wallets;

pub use categories::{CreateCategoryCmd, UpdateCategoryCmd};
pub use classify::{CategoryRef, Suggestion, TransactionRef, accept_suggestions};
pub use profile::{SignupCmd, UpdatePreferencesCmd};
pub use transactions::{CreateTransactionCmd, UpdateTransactionCmd};
pub use transfers::{CreateTransferCmd, UpdateTransferCmd};
pub use wallets::{CreateWalletCmd, UpdateWalletCmd};

/// Upper bound on optimistic re-executions of a mutation body.
pub(crate) const MAX_COMMIT_ATTEMPTS: u32 = 5;

/// Run a mutation body inside a DB transaction.
///
/// Commits on success and bumps the change feed; rolls back and re-executes
/// the body on `Conflict`; surfaces `ConflictExceeded` once the retry budget
/// is spent. Any other error rolls back and propagates.
macro_rules! with_commit {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let mut attempt = 1u32;
        loop {
            let $tx = $self.database.begin().await?;
            let result = $body;
            match result {
                Ok(value) => {
                    $tx.commit().await?;
                    $self.feed.mark();
                    break Ok(value);
                }
                Err($crate::LedgerError::Conflict(reason)) => {
                    $tx.rollback().await?;
                    if attempt >= $crate::ops::MAX_COMMIT_ATTEMPTS {
                        break Err($crate::LedgerError::ConflictExceeded(reason));
                    }
                    attempt += 1;
                }
                Err(err) => break Err(err),
            }
        }
    }};
}

pub(crate) use with_commit;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    feed: ChangeFeed,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub(crate) fn database(&self) -> &DatabaseConnection {
        &self.database
    }

    pub(crate) fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// Load a wallet row, checking existence and ownership.
    pub(crate) async fn require_wallet(
        &self,
        db_tx: &DatabaseTransaction,
        wallet_id: Uuid,
        user_id: &str,
    ) -> ResultLedger<crate::wallets::Model> {
        let model = crate::wallets::Entity::find_by_id(wallet_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| LedgerError::NotFound("wallet not exists".to_string()))?;
        if model.user_id != user_id {
            return Err(LedgerError::Unauthorized(
                "wallet belongs to another user".to_string(),
            ));
        }
        Ok(model)
    }

    /// Load a transaction row, checking existence and ownership.
    pub(crate) async fn require_transaction(
        &self,
        db_tx: &DatabaseTransaction,
        transaction_id: Uuid,
        user_id: &str,
    ) -> ResultLedger<crate::transactions::Model> {
        let model = crate::transactions::Entity::find_by_id(transaction_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| LedgerError::NotFound("transaction not exists".to_string()))?;
        if model.user_id != user_id {
            return Err(LedgerError::Unauthorized(
                "transaction belongs to another user".to_string(),
            ));
        }
        Ok(model)
    }

    /// Load a category row and check it may be assigned to a transaction of
    /// `kind`: owned by the user, and kind-matched (debt/loan transactions
    /// never carry a category).
    pub(crate) async fn require_category_for(
        &self,
        db_tx: &DatabaseTransaction,
        category_id: Uuid,
        user_id: &str,
        kind: TransactionKind,
    ) -> ResultLedger<crate::categories::Model> {
        let model = crate::categories::Entity::find_by_id(category_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| LedgerError::NotFound("category not exists".to_string()))?;
        if model.user_id != user_id {
            return Err(LedgerError::Unauthorized(
                "category belongs to another user".to_string(),
            ));
        }
        let category_kind = crate::CategoryKind::try_from(model.kind.as_str())?;
        if !category_kind.matches(kind) {
            return Err(LedgerError::InvalidArgument(format!(
                "category kind {} does not match transaction kind {}",
                category_kind.as_str(),
                kind.as_str()
            )));
        }
        Ok(model)
    }

    /// Conditional wallet balance write.
    ///
    /// The update filters on the revision read at the start of the operation;
    /// zero affected rows means the wallet moved underneath us and the
    /// attempt must be retried.
    pub(crate) async fn apply_wallet_balance(
        &self,
        db_tx: &DatabaseTransaction,
        wallet: &crate::wallets::Model,
        new_balance: i64,
    ) -> ResultLedger<()> {
        let result = crate::wallets::Entity::update_many()
            .col_expr(crate::wallets::Column::Balance, Expr::value(new_balance))
            .col_expr(crate::wallets::Column::Revision, Expr::value(wallet.revision + 1))
            .col_expr(crate::wallets::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(crate::wallets::Column::Id.eq(wallet.id.clone()))
            .filter(crate::wallets::Column::Revision.eq(wallet.revision))
            .exec(db_tx)
            .await?;
        if result.rows_affected == 0 {
            return Err(LedgerError::Conflict(format!(
                "wallet {} changed concurrently",
                wallet.id
            )));
        }
        Ok(())
    }

    /// Conditional wallet order write, same revision discipline as
    /// [`Engine::apply_wallet_balance`].
    pub(crate) async fn apply_wallet_order(
        &self,
        db_tx: &DatabaseTransaction,
        wallet: &crate::wallets::Model,
        display_order: i32,
    ) -> ResultLedger<()> {
        let result = crate::wallets::Entity::update_many()
            .col_expr(
                crate::wallets::Column::DisplayOrder,
                Expr::value(display_order),
            )
            .col_expr(crate::wallets::Column::Revision, Expr::value(wallet.revision + 1))
            .col_expr(crate::wallets::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(crate::wallets::Column::Id.eq(wallet.id.clone()))
            .filter(crate::wallets::Column::Revision.eq(wallet.revision))
            .exec(db_tx)
            .await?;
        if result.rows_affected == 0 {
            return Err(LedgerError::Conflict(format!(
                "wallet {} changed concurrently",
                wallet.id
            )));
        }
        Ok(())
    }
}

pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultLedger<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::InvalidArgument(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

pub(crate) fn normalize_currency(value: &str) -> ResultLedger<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.len() > 8 || !trimmed.chars().all(|c| c.is_ascii_alphabetic())
    {
        return Err(LedgerError::InvalidArgument(format!(
            "invalid currency code: {trimmed:?}"
        )));
    }
    Ok(trimmed.to_ascii_uppercase())
}

pub(crate) fn optional_set<T>(value: Option<T>) -> ActiveValue<T>
where
    T: Into<sea_orm::Value>,
{
    match value {
        Some(value) => ActiveValue::Set(value),
        None => ActiveValue::NotSet,
    }
}

pub(crate) async fn require_user(
    db_tx: &DatabaseTransaction,
    user_id: &str,
) -> ResultLedger<crate::users::Model> {
    crate::users::Entity::find_by_id(user_id.to_string())
        .one(db_tx)
        .await?
        .ok_or_else(|| LedgerError::NotFound("user not exists".to_string()))
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub fn build(self) -> Engine {
        Engine {
            database: self.database,
            feed: ChangeFeed::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::Cell;

    use migration::MigratorTrait;
    use sea_orm::{ConnectionTrait, Database, Statement, TransactionTrait};

    async fn engine_with_wallet() -> (Engine, crate::wallets::Model, String) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let engine = Engine::builder().database(db).build();
        let user_id = engine
            .signup(SignupCmd {
                email: "alice@example.com".to_string(),
                password: "password".to_string(),
                currency: "EUR".to_string(),
            })
            .await
            .unwrap();
        let wallet = crate::wallets::Entity::find()
            .one(engine.database())
            .await
            .unwrap()
            .unwrap();
        (engine, wallet, user_id)
    }

    #[tokio::test]
    async fn stale_revision_write_is_a_conflict() {
        let (engine, wallet, _user_id) = engine_with_wallet().await;

        // Move the wallet out from under the model read above.
        let backend = engine.database().get_database_backend();
        engine
            .database()
            .execute(Statement::from_sql_and_values(
                backend,
                "UPDATE wallets SET revision = revision + 1 WHERE id = ?;",
                vec![wallet.id.clone().into()],
            ))
            .await
            .unwrap();

        let db_tx = engine.database().begin().await.unwrap();
        let err = engine
            .apply_wallet_balance(&db_tx, &wallet, 10)
            .await
            .unwrap_err();
        db_tx.rollback().await.unwrap();
        assert!(matches!(err, LedgerError::Conflict(_)));
    }

    #[tokio::test]
    async fn commit_loop_retries_a_conflicted_attempt() -> ResultLedger<()> {
        let (engine, wallet, user_id) = engine_with_wallet().await;
        let wallet_id = Uuid::parse_str(&wallet.id).unwrap();
        let attempts = Cell::new(0u32);

        let result: ResultLedger<()> = with_commit!(engine, |db_tx| {
            async {
                attempts.set(attempts.get() + 1);
                let fresh = engine.require_wallet(&db_tx, wallet_id, &user_id).await?;
                if attempts.get() == 1 {
                    return Err(LedgerError::Conflict("wallet moved".to_string()));
                }
                engine.apply_wallet_balance(&db_tx, &fresh, 42).await?;
                Ok(())
            }
            .await
        });

        assert!(result.is_ok());
        assert_eq!(attempts.get(), 2);
        let wallet = engine.wallet(wallet_id, &user_id).await.unwrap();
        assert_eq!(wallet.balance, 42);
        Ok(())
    }

    #[tokio::test]
    async fn exhausted_retries_surface_conflict_exceeded() -> ResultLedger<()> {
        let (engine, _wallet, _user_id) = engine_with_wallet().await;
        let attempts = Cell::new(0u32);

        let result: ResultLedger<()> = with_commit!(engine, |db_tx| {
            async {
                let _ = &db_tx;
                attempts.set(attempts.get() + 1);
                Err(LedgerError::Conflict("wallet moved".to_string()))
            }
            .await
        });

        assert!(matches!(result, Err(LedgerError::ConflictExceeded(_))));
        assert_eq!(attempts.get(), MAX_COMMIT_ATTEMPTS);
        Ok(())
    }
}
