//! Transfers between wallets.
//!
//! A transfer is stored as two linked transactions: an expense leg on the
//! source wallet and an income leg on the destination, each flagged
//! `is_transfer` and pointing at the other through `linked_transaction_id`.
//! The two rows and the two wallet balance writes commit as one unit, and
//! every edit or delete goes through both legs, so an orphan leg is never
//! observable.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use sea_orm::{ActiveValue, TransactionTrait, prelude::*};

use crate::{
    LedgerError, ResultLedger, Transaction, TransactionKind, balance::signed_delta, transactions,
};

use super::{Engine, normalize_optional_text, optional_set, with_commit};

#[derive(Clone, Debug)]
pub struct CreateTransferCmd {
    pub user_id: String,
    pub from_wallet_id: Uuid,
    pub to_wallet_id: Uuid,
    pub amount_minor: i64,
    pub occurred_at: DateTime<Utc>,
    pub note: Option<String>,
}

/// Patch for a transfer, addressed by either leg; omitted fields keep their
/// old values. Amount, date and note always change on both legs.
#[derive(Clone, Debug, Default)]
pub struct UpdateTransferCmd {
    pub user_id: String,
    pub transaction_id: Uuid,
    pub amount_minor: Option<i64>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

impl Engine {
    /// Moves money between two wallets, returning `(outgoing, incoming)` leg
    /// ids.
    pub async fn create_transfer(&self, cmd: CreateTransferCmd) -> ResultLedger<(Uuid, Uuid)> {
        if cmd.from_wallet_id == cmd.to_wallet_id {
            return Err(LedgerError::InvalidArgument(
                "from_wallet_id and to_wallet_id must differ".to_string(),
            ));
        }
        if cmd.amount_minor <= 0 {
            return Err(LedgerError::InvalidArgument(
                "amount_minor must be > 0".to_string(),
            ));
        }
        let note = normalize_optional_text(cmd.note.as_deref());
        with_commit!(self, |db_tx| {
            async {
                let from_wallet = self
                    .require_wallet(&db_tx, cmd.from_wallet_id, &cmd.user_id)
                    .await?;
                let to_wallet = self
                    .require_wallet(&db_tx, cmd.to_wallet_id, &cmd.user_id)
                    .await?;

                let out_id = Uuid::new_v4();
                let in_id = Uuid::new_v4();

                let outgoing = Transaction::transfer_leg(
                    out_id,
                    cmd.user_id.clone(),
                    cmd.from_wallet_id,
                    in_id,
                    Some(cmd.to_wallet_id),
                    cmd.amount_minor,
                    cmd.occurred_at,
                    TransactionKind::Expense,
                    note.clone(),
                )?;
                let incoming = Transaction::transfer_leg(
                    in_id,
                    cmd.user_id.clone(),
                    cmd.to_wallet_id,
                    out_id,
                    None,
                    cmd.amount_minor,
                    cmd.occurred_at,
                    TransactionKind::Income,
                    note.clone(),
                )?;

                transactions::ActiveModel::try_from(&outgoing)?
                    .insert(&db_tx)
                    .await?;
                transactions::ActiveModel::try_from(&incoming)?
                    .insert(&db_tx)
                    .await?;

                self.apply_wallet_balance(
                    &db_tx,
                    &from_wallet,
                    from_wallet.balance - cmd.amount_minor,
                )
                .await?;
                self.apply_wallet_balance(&db_tx, &to_wallet, to_wallet.balance + cmd.amount_minor)
                    .await?;

                Ok((out_id, in_id))
            }
            .await
        })
    }

    /// Updates both legs of a transfer and both wallet balances atomically.
    pub async fn update_transfer(&self, cmd: UpdateTransferCmd) -> ResultLedger<()> {
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
                let (leg, linked) = self
                    .require_transfer_pair(&db_tx, cmd.transaction_id, &cmd.user_id)
                    .await?;
                let new_amount = cmd.amount_minor.unwrap_or(leg.amount_minor);

                for model in [&leg, &linked] {
                    let kind = TransactionKind::try_from(model.kind.as_str())?;
                    let wallet_id = Uuid::parse_str(&model.wallet_id).map_err(|_| {
                        LedgerError::InvalidArgument("invalid wallet id".to_string())
                    })?;
                    let wallet = self.require_wallet(&db_tx, wallet_id, &cmd.user_id).await?;
                    let balance = wallet.balance - signed_delta(kind, model.amount_minor)
                        + signed_delta(kind, new_amount);
                    self.apply_wallet_balance(&db_tx, &wallet, balance).await?;

                    let active = transactions::ActiveModel {
                        id: ActiveValue::Set(model.id.clone()),
                        amount_minor: ActiveValue::Set(new_amount),
                        occurred_at: optional_set(cmd.occurred_at),
                        note: optional_set(cmd.note.as_ref().map(|_| note.clone())),
                        updated_at: ActiveValue::Set(Utc::now()),
                        ..Default::default()
                    };
                    active.update(&db_tx).await?;
                }

                Ok(())
            }
            .await
        })
    }

    /// Deletes both legs of a transfer, reverting both wallet balances.
    pub async fn delete_transfer(&self, transaction_id: Uuid, user_id: &str) -> ResultLedger<()> {
        with_commit!(self, |db_tx| {
            async {
                let (leg, linked) = self
                    .require_transfer_pair(&db_tx, transaction_id, user_id)
                    .await?;

                for model in [&leg, &linked] {
                    let kind = TransactionKind::try_from(model.kind.as_str())?;
                    let wallet_id = Uuid::parse_str(&model.wallet_id).map_err(|_| {
                        LedgerError::InvalidArgument("invalid wallet id".to_string())
                    })?;
                    let wallet = self.require_wallet(&db_tx, wallet_id, user_id).await?;
                    let balance = wallet.balance - signed_delta(kind, model.amount_minor);
                    self.apply_wallet_balance(&db_tx, &wallet, balance).await?;

                    transactions::Entity::delete_by_id(model.id.clone())
                        .exec(&db_tx)
                        .await?;
                }

                Ok(())
            }
            .await
        })
    }

    /// Loads a transfer leg and its pair, rejecting non-transfer rows.
    async fn require_transfer_pair(
        &self,
        db_tx: &sea_orm::DatabaseTransaction,
        transaction_id: Uuid,
        user_id: &str,
    ) -> ResultLedger<(transactions::Model, transactions::Model)> {
        let leg = self
            .require_transaction(db_tx, transaction_id, user_id)
            .await?;
        if !leg.is_transfer {
            return Err(LedgerError::InvalidArgument(
                "transaction is not a transfer leg".to_string(),
            ));
        }
        let linked_id = leg.linked_transaction_id.as_deref().ok_or_else(|| {
            LedgerError::InvalidArgument("transfer leg has no linked transaction".to_string())
        })?;
        let linked_id = Uuid::parse_str(linked_id)
            .map_err(|_| LedgerError::InvalidArgument("invalid transaction id".to_string()))?;
        let linked = self.require_transaction(db_tx, linked_id, user_id).await?;
        Ok((leg, linked))
    }
}
