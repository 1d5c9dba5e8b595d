//! Create/update/delete for ordinary ledger transactions.
//!
//! Each operation writes the transaction row and the affected wallet
//! balance(s) in one atomic commit, so a concurrent reader never observes one
//! without the other. Transfer legs are rejected here; they are edited and
//! deleted through the transfer operations, which touch both legs.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use sea_orm::{ActiveValue, TransactionTrait, prelude::*};

use crate::{
    LedgerError, ResultLedger, Transaction, TransactionKind, balance::signed_delta, transactions,
};

use super::{Engine, normalize_optional_text, optional_set, with_commit};

#[derive(Clone, Debug)]
pub struct CreateTransactionCmd {
    pub user_id: String,
    pub wallet_id: Uuid,
    pub category_id: Option<Uuid>,
    pub amount_minor: i64,
    pub kind: TransactionKind,
    pub occurred_at: DateTime<Utc>,
    pub note: Option<String>,
    pub tags: Option<Vec<String>>,
    pub exclude_from_report: bool,
}

/// Patch for an existing transaction; omitted fields keep their old values.
#[derive(Clone, Debug, Default)]
pub struct UpdateTransactionCmd {
    pub user_id: String,
    pub transaction_id: Uuid,
    pub wallet_id: Option<Uuid>,
    /// `Some(None)` clears the category; `None` keeps it.
    pub category_id: Option<Option<Uuid>>,
    pub amount_minor: Option<i64>,
    pub kind: Option<TransactionKind>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
    pub tags: Option<Vec<String>>,
    pub exclude_from_report: Option<bool>,
}

fn reject_transfer_leg(model: &transactions::Model) -> ResultLedger<()> {
    if model.is_transfer {
        return Err(LedgerError::InvalidArgument(
            "transaction is a transfer leg; use the transfer operations".to_string(),
        ));
    }
    Ok(())
}

impl Engine {
    /// Creates a transaction and applies its delta to the wallet balance.
    pub async fn create_transaction(&self, cmd: CreateTransactionCmd) -> ResultLedger<Uuid> {
        if cmd.amount_minor <= 0 {
            return Err(LedgerError::InvalidArgument(
                "amount_minor must be > 0".to_string(),
            ));
        }
        let note = normalize_optional_text(cmd.note.as_deref());
        with_commit!(self, |db_tx| {
            async {
                let wallet = self
                    .require_wallet(&db_tx, cmd.wallet_id, &cmd.user_id)
                    .await?;
                if let Some(category_id) = cmd.category_id {
                    self.require_category_for(&db_tx, category_id, &cmd.user_id, cmd.kind)
                        .await?;
                }

                let tx = Transaction::new(
                    cmd.user_id.clone(),
                    cmd.wallet_id,
                    cmd.category_id,
                    cmd.amount_minor,
                    cmd.occurred_at,
                    cmd.kind,
                    cmd.tags.clone(),
                    note.clone(),
                    cmd.exclude_from_report,
                )?;
                transactions::ActiveModel::try_from(&tx)?
                    .insert(&db_tx)
                    .await?;

                let new_balance = wallet.balance + signed_delta(cmd.kind, cmd.amount_minor);
                self.apply_wallet_balance(&db_tx, &wallet, new_balance)
                    .await?;

                Ok(tx.id)
            }
            .await
        })
    }

    /// Applies a patch to a transaction, reverting the old delta and applying
    /// the new one.
    ///
    /// When the patch moves the transaction to another wallet, the old wallet
    /// is reverted and the new wallet receives the new delta; both wallet
    /// writes land in the same commit.
    pub async fn update_transaction(&self, cmd: UpdateTransactionCmd) -> ResultLedger<()> {
        if let Some(amount_minor) = cmd.amount_minor
            && amount_minor <= 0
        {
            return Err(LedgerError::InvalidArgument(
                "amount_minor must be > 0".to_string(),
            ));
        }
        let note = normalize_optional_text(cmd.note.as_deref());
        with_commit!(self, |db_tx| {
            async {
                let tx_model = self
                    .require_transaction(&db_tx, cmd.transaction_id, &cmd.user_id)
                    .await?;
                reject_transfer_leg(&tx_model)?;

                let old_kind = TransactionKind::try_from(tx_model.kind.as_str())?;
                let new_kind = cmd.kind.unwrap_or(old_kind);
                let new_amount = cmd.amount_minor.unwrap_or(tx_model.amount_minor);
                let old_wallet_id = Uuid::parse_str(&tx_model.wallet_id)
                    .map_err(|_| LedgerError::InvalidArgument("invalid wallet id".to_string()))?;
                let new_wallet_id = cmd.wallet_id.unwrap_or(old_wallet_id);

                match cmd.category_id {
                    Some(Some(category_id)) => {
                        self.require_category_for(&db_tx, category_id, &cmd.user_id, new_kind)
                            .await?;
                    }
                    Some(None) => {}
                    // A kind change must not leave the stored category
                    // mismatched; clear it explicitly first.
                    None => {
                        if new_kind != old_kind
                            && let Some(raw) = tx_model.category_id.as_deref()
                        {
                            let category_id = Uuid::parse_str(raw).map_err(|_| {
                                LedgerError::InvalidArgument("invalid category id".to_string())
                            })?;
                            self.require_category_for(
                                &db_tx,
                                category_id,
                                &cmd.user_id,
                                new_kind,
                            )
                            .await?;
                        }
                    }
                }

                let old_wallet = self
                    .require_wallet(&db_tx, old_wallet_id, &cmd.user_id)
                    .await?;
                let old_delta = signed_delta(old_kind, tx_model.amount_minor);
                let new_delta = signed_delta(new_kind, new_amount);

                if new_wallet_id == old_wallet_id {
                    let balance = old_wallet.balance - old_delta + new_delta;
                    self.apply_wallet_balance(&db_tx, &old_wallet, balance)
                        .await?;
                } else {
                    let new_wallet = self
                        .require_wallet(&db_tx, new_wallet_id, &cmd.user_id)
                        .await?;
                    self.apply_wallet_balance(&db_tx, &old_wallet, old_wallet.balance - old_delta)
                        .await?;
                    self.apply_wallet_balance(&db_tx, &new_wallet, new_wallet.balance + new_delta)
                        .await?;
                }

                let tags = cmd
                    .tags
                    .as_ref()
                    .map(|tags| {
                        serde_json::to_string(tags).map_err(|err| {
                            LedgerError::InvalidArgument(format!("invalid tags: {err}"))
                        })
                    })
                    .transpose()?;

                let active = transactions::ActiveModel {
                    id: ActiveValue::Set(cmd.transaction_id.to_string()),
                    wallet_id: ActiveValue::Set(new_wallet_id.to_string()),
                    category_id: optional_set(
                        cmd.category_id
                            .map(|category| category.map(|id| id.to_string())),
                    ),
                    amount_minor: ActiveValue::Set(new_amount),
                    kind: ActiveValue::Set(new_kind.as_str().to_string()),
                    occurred_at: optional_set(cmd.occurred_at),
                    note: optional_set(cmd.note.as_ref().map(|_| note.clone())),
                    tags: optional_set(tags.map(Some)),
                    exclude_from_report: optional_set(cmd.exclude_from_report),
                    updated_at: ActiveValue::Set(Utc::now()),
                    ..Default::default()
                };
                active.update(&db_tx).await?;

                Ok(())
            }
            .await
        })
    }

    /// Deletes a transaction, reverting its delta on the wallet balance.
    pub async fn delete_transaction(
        &self,
        transaction_id: Uuid,
        user_id: &str,
    ) -> ResultLedger<()> {
        with_commit!(self, |db_tx| {
            async {
                let tx_model = self
                    .require_transaction(&db_tx, transaction_id, user_id)
                    .await?;
                reject_transfer_leg(&tx_model)?;

                let kind = TransactionKind::try_from(tx_model.kind.as_str())?;
                let wallet_id = Uuid::parse_str(&tx_model.wallet_id)
                    .map_err(|_| LedgerError::InvalidArgument("invalid wallet id".to_string()))?;
                let wallet = self.require_wallet(&db_tx, wallet_id, user_id).await?;

                let balance = wallet.balance - signed_delta(kind, tx_model.amount_minor);
                self.apply_wallet_balance(&db_tx, &wallet, balance).await?;

                transactions::Entity::delete_by_id(transaction_id.to_string())
                    .exec(&db_tx)
                    .await?;

                Ok(())
            }
            .await
        })
    }

    /// Returns a transaction owned by the user.
    pub async fn transaction(
        &self,
        transaction_id: Uuid,
        user_id: &str,
    ) -> ResultLedger<Transaction> {
        let model = transactions::Entity::find_by_id(transaction_id.to_string())
            .one(self.database())
            .await?
            .ok_or_else(|| LedgerError::NotFound("transaction not exists".to_string()))?;
        if model.user_id != user_id {
            return Err(LedgerError::Unauthorized(
                "transaction belongs to another user".to_string(),
            ));
        }
        Transaction::try_from(model)
    }

    /// Lists the user's transactions, newest first, optionally limited.
    pub async fn transactions(
        &self,
        user_id: &str,
        limit: Option<u64>,
    ) -> ResultLedger<Vec<Transaction>> {
        use sea_orm::{QueryFilter, QueryOrder, QuerySelect};

        let mut query = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .order_by_desc(transactions::Column::OccurredAt);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        let models = query.all(self.database()).await?;
        models.into_iter().map(Transaction::try_from).collect()
    }
}
