//! Wallet lifecycle: create, edit, delete, read.
//!
//! Editing `initial_balance` shifts the stored balance by the same amount, so
//! the wallet invariant keeps holding without replaying history. Deleting a
//! wallet that still has transactions is rejected; there is no cascade.

use chrono::Utc;
use uuid::Uuid;

use sea_orm::{
    PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr,
};

use crate::{LedgerError, ResultLedger, Wallet, WalletKind, transactions, wallets};

use super::{
    Engine, normalize_currency, normalize_optional_text, normalize_required_name, with_commit,
};

#[derive(Clone, Debug)]
pub struct CreateWalletCmd {
    pub user_id: String,
    pub name: String,
    pub kind: WalletKind,
    pub currency: String,
    pub initial_balance: i64,
    pub icon: Option<String>,
    pub color: Option<String>,
}

/// Patch for a wallet; omitted fields keep their old values.
#[derive(Clone, Debug, Default)]
pub struct UpdateWalletCmd {
    pub user_id: String,
    pub wallet_id: Uuid,
    pub name: Option<String>,
    pub kind: Option<WalletKind>,
    pub initial_balance: Option<i64>,
    pub icon: Option<String>,
    pub color: Option<String>,
}

impl Engine {
    /// Adds a wallet at the end of its kind's display group.
    pub async fn create_wallet(&self, cmd: CreateWalletCmd) -> ResultLedger<Uuid> {
        let name = normalize_required_name(&cmd.name, "wallet")?;
        let currency = normalize_currency(&cmd.currency)?;
        with_commit!(self, |db_tx| {
            async {
                super::require_user(&db_tx, &cmd.user_id).await?;

                let exists = wallets::Entity::find()
                    .filter(wallets::Column::UserId.eq(cmd.user_id.clone()))
                    .filter(Expr::cust("LOWER(name)").eq(name.to_lowercase()))
                    .one(&db_tx)
                    .await?
                    .is_some();
                if exists {
                    return Err(LedgerError::ExistingKey(name.clone()));
                }

                let display_order = self
                    .next_display_order(&db_tx, &cmd.user_id, cmd.kind)
                    .await?;

                let mut wallet = Wallet::new(
                    cmd.user_id.clone(),
                    name.clone(),
                    cmd.initial_balance,
                    currency.clone(),
                    cmd.kind,
                    display_order,
                );
                wallet.icon = normalize_optional_text(cmd.icon.as_deref());
                wallet.color = normalize_optional_text(cmd.color.as_deref());

                let wallet_id = wallet.id;
                wallets::ActiveModel::from(&wallet).insert(&db_tx).await?;
                Ok(wallet_id)
            }
            .await
        })
    }

    /// Applies a patch to a wallet.
    ///
    /// A new `initial_balance` shifts `balance` by the same difference; a new
    /// `kind` moves the wallet to the end of the new kind's display group.
    pub async fn update_wallet(&self, cmd: UpdateWalletCmd) -> ResultLedger<()> {
        let name = cmd
            .name
            .as_deref()
            .map(|name| normalize_required_name(name, "wallet"))
            .transpose()?;
        with_commit!(self, |db_tx| {
            async {
                let wallet = self
                    .require_wallet(&db_tx, cmd.wallet_id, &cmd.user_id)
                    .await?;
                let old_kind = WalletKind::try_from(wallet.kind.as_str())?;
                let new_kind = cmd.kind.unwrap_or(old_kind);

                if let Some(name) = name.as_deref() {
                    let clash = wallets::Entity::find()
                        .filter(wallets::Column::UserId.eq(cmd.user_id.clone()))
                        .filter(Expr::cust("LOWER(name)").eq(name.to_lowercase()))
                        .filter(wallets::Column::Id.ne(wallet.id.clone()))
                        .one(&db_tx)
                        .await?
                        .is_some();
                    if clash {
                        return Err(LedgerError::ExistingKey(name.to_string()));
                    }
                }

                let new_initial = cmd.initial_balance.unwrap_or(wallet.initial_balance);
                let new_balance = wallet.balance + (new_initial - wallet.initial_balance);
                let display_order = if new_kind != old_kind {
                    self.next_display_order(&db_tx, &cmd.user_id, new_kind)
                        .await?
                } else {
                    wallet.display_order
                };

                let mut update = wallets::Entity::update_many()
                    .col_expr(wallets::Column::Balance, Expr::value(new_balance))
                    .col_expr(wallets::Column::InitialBalance, Expr::value(new_initial))
                    .col_expr(wallets::Column::Kind, Expr::value(new_kind.as_str()))
                    .col_expr(wallets::Column::DisplayOrder, Expr::value(display_order))
                    .col_expr(wallets::Column::Revision, Expr::value(wallet.revision + 1))
                    .col_expr(wallets::Column::UpdatedAt, Expr::value(Utc::now()));
                if let Some(name) = name.as_deref() {
                    update = update.col_expr(wallets::Column::Name, Expr::value(name));
                }
                if let Some(icon) = normalize_optional_text(cmd.icon.as_deref()) {
                    update = update.col_expr(wallets::Column::Icon, Expr::value(icon));
                }
                if let Some(color) = normalize_optional_text(cmd.color.as_deref()) {
                    update = update.col_expr(wallets::Column::Color, Expr::value(color));
                }

                let result = update
                    .filter(wallets::Column::Id.eq(wallet.id.clone()))
                    .filter(wallets::Column::Revision.eq(wallet.revision))
                    .exec(&db_tx)
                    .await?;
                if result.rows_affected == 0 {
                    return Err(LedgerError::Conflict(format!(
                        "wallet {} changed concurrently",
                        wallet.id
                    )));
                }

                // A kind change leaves a hole in the old display group.
                if new_kind != old_kind {
                    wallets::Entity::update_many()
                        .col_expr(
                            wallets::Column::DisplayOrder,
                            Expr::col(wallets::Column::DisplayOrder).sub(1),
                        )
                        .filter(wallets::Column::UserId.eq(cmd.user_id.clone()))
                        .filter(wallets::Column::Kind.eq(old_kind.as_str()))
                        .filter(wallets::Column::DisplayOrder.gt(wallet.display_order))
                        .exec(&db_tx)
                        .await?;
                }

                Ok(())
            }
            .await
        })
    }

    /// Deletes a wallet with no transaction history.
    ///
    /// Rejected with `InvalidArgument` while transactions still reference the
    /// wallet: delete or move them first. The surviving wallets of the same
    /// kind close ranks so orders stay dense.
    pub async fn delete_wallet(&self, wallet_id: Uuid, user_id: &str) -> ResultLedger<()> {
        with_commit!(self, |db_tx| {
            async {
                let wallet = self.require_wallet(&db_tx, wallet_id, user_id).await?;

                let referenced = transactions::Entity::find()
                    .filter(transactions::Column::WalletId.eq(wallet.id.clone()))
                    .count(&db_tx)
                    .await?;
                if referenced > 0 {
                    return Err(LedgerError::InvalidArgument(format!(
                        "wallet still referenced by {referenced} transactions"
                    )));
                }

                wallets::Entity::delete_by_id(wallet.id.clone())
                    .exec(&db_tx)
                    .await?;

                wallets::Entity::update_many()
                    .col_expr(
                        wallets::Column::DisplayOrder,
                        Expr::col(wallets::Column::DisplayOrder).sub(1),
                    )
                    .filter(wallets::Column::UserId.eq(user_id))
                    .filter(wallets::Column::Kind.eq(wallet.kind.clone()))
                    .filter(wallets::Column::DisplayOrder.gt(wallet.display_order))
                    .exec(&db_tx)
                    .await?;

                Ok(())
            }
            .await
        })
    }

    /// Returns a wallet owned by the user.
    pub async fn wallet(&self, wallet_id: Uuid, user_id: &str) -> ResultLedger<Wallet> {
        let model = wallets::Entity::find_by_id(wallet_id.to_string())
            .one(self.database())
            .await?
            .ok_or_else(|| LedgerError::NotFound("wallet not exists".to_string()))?;
        if model.user_id != user_id {
            return Err(LedgerError::Unauthorized(
                "wallet belongs to another user".to_string(),
            ));
        }
        Wallet::try_from(model)
    }

    /// Lists the user's wallets, grouped by kind and ordered for display.
    pub async fn wallets(&self, user_id: &str) -> ResultLedger<Vec<Wallet>> {
        let models = wallets::Entity::find()
            .filter(wallets::Column::UserId.eq(user_id))
            .order_by_asc(wallets::Column::Kind)
            .order_by_asc(wallets::Column::DisplayOrder)
            .all(self.database())
            .await?;
        models.into_iter().map(Wallet::try_from).collect()
    }

    async fn next_display_order(
        &self,
        db_tx: &sea_orm::DatabaseTransaction,
        user_id: &str,
        kind: WalletKind,
    ) -> ResultLedger<i32> {
        let last = wallets::Entity::find()
            .filter(wallets::Column::UserId.eq(user_id))
            .filter(wallets::Column::Kind.eq(kind.as_str()))
            .order_by_desc(wallets::Column::DisplayOrder)
            .one(db_tx)
            .await?;
        Ok(last.map(|w| w.display_order + 1).unwrap_or(1))
    }
}
