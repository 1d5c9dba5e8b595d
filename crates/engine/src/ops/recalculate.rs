//! Full rebuild of wallet balances from the transaction history.
//!
//! Drift correction: recomputes every wallet of a user as
//! `initial_balance + Σ signed_delta(kind, amount)` over the wallet's
//! transactions and writes the results in one atomic batch. All four
//! transaction kinds count, with the same arithmetic the live mutations use,
//! so a recalculation right after any sequence of edits is a no-op.

use std::collections::HashMap;

use sea_orm::{QueryFilter, TransactionTrait, prelude::*};

use crate::{ResultLedger, TransactionKind, balance::signed_delta, transactions, wallets};

use super::{Engine, with_commit};

impl Engine {
    /// Recomputes all wallet balances for a user; returns the number of
    /// wallets written. Idempotent.
    pub async fn recalculate_balances(&self, user_id: &str) -> ResultLedger<usize> {
        with_commit!(self, |db_tx| {
            async {
                let wallet_models = wallets::Entity::find()
                    .filter(wallets::Column::UserId.eq(user_id))
                    .all(&db_tx)
                    .await?;
                let tx_models = transactions::Entity::find()
                    .filter(transactions::Column::UserId.eq(user_id))
                    .all(&db_tx)
                    .await?;

                let mut sums: HashMap<String, i64> = HashMap::new();
                for tx in &tx_models {
                    let kind = TransactionKind::try_from(tx.kind.as_str())?;
                    *sums.entry(tx.wallet_id.clone()).or_insert(0) +=
                        signed_delta(kind, tx.amount_minor);
                }

                let mut written = 0usize;
                for wallet in &wallet_models {
                    let target =
                        wallet.initial_balance + sums.get(&wallet.id).copied().unwrap_or(0);
                    self.apply_wallet_balance(&db_tx, wallet, target).await?;
                    written += 1;
                }

                Ok(written)
            }
            .await
        })
    }
}
