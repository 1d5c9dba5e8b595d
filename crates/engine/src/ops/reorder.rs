//! Atomic batch update of wallet display order.
//!
//! The engine validates existence and ownership only; keeping the two display
//! groups (available/credit) independently dense is the caller's contract,
//! which restricts one reorder call to wallets of a single kind.

use uuid::Uuid;

use sea_orm::TransactionTrait;

use crate::{LedgerError, ResultLedger};

use super::{Engine, with_commit};

impl Engine {
    /// Writes the given `(wallet id, order)` pairs in one commit.
    pub async fn reorder_wallets(
        &self,
        user_id: &str,
        updates: &[(Uuid, i32)],
    ) -> ResultLedger<()> {
        if updates.is_empty() {
            return Err(LedgerError::InvalidArgument(
                "updates must not be empty".to_string(),
            ));
        }
        with_commit!(self, |db_tx| {
            async {
                for (wallet_id, display_order) in updates {
                    let wallet = self.require_wallet(&db_tx, *wallet_id, user_id).await?;
                    self.apply_wallet_order(&db_tx, &wallet, *display_order)
                        .await?;
                }
                Ok(())
            }
            .await
        })
    }
}
