//! Auto-categorization boundary.
//!
//! The text classifier itself is an external collaborator: it consumes
//! `{id, note, amount, kind}` per transaction plus the category list and
//! returns `{id, category_id, confidence}` suggestions. The engine's job is
//! the guardrail and the write: drop any suggestion whose category kind does
//! not match the transaction kind, then bulk-assign the survivors. Category
//! assignment never touches a balance.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{ActiveValue, TransactionTrait, prelude::*};

use crate::{CategoryKind, ResultLedger, TransactionKind, transactions};

use super::{Engine, with_commit};

/// What the classifier sees of a transaction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionRef {
    pub id: Uuid,
    pub note: Option<String>,
    pub amount_minor: i64,
    pub kind: TransactionKind,
}

/// What the classifier sees of a category.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: Uuid,
    pub name: String,
    pub kind: CategoryKind,
}

/// One classifier result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub transaction_id: Uuid,
    pub category_id: Uuid,
    pub confidence: f32,
}

/// Filters classifier output: a suggestion survives only if its transaction
/// and category are known and their kinds match.
pub fn accept_suggestions(
    transactions: &[TransactionRef],
    categories: &[CategoryRef],
    suggestions: Vec<Suggestion>,
) -> Vec<Suggestion> {
    let tx_kinds: HashMap<Uuid, TransactionKind> =
        transactions.iter().map(|tx| (tx.id, tx.kind)).collect();
    let category_kinds: HashMap<Uuid, CategoryKind> =
        categories.iter().map(|cat| (cat.id, cat.kind)).collect();

    suggestions
        .into_iter()
        .filter(|suggestion| {
            match (
                tx_kinds.get(&suggestion.transaction_id),
                category_kinds.get(&suggestion.category_id),
            ) {
                (Some(tx_kind), Some(category_kind)) => category_kind.matches(*tx_kind),
                _ => false,
            }
        })
        .collect()
}

impl Engine {
    /// Bulk-assigns categories from accepted suggestions; returns how many
    /// transactions were updated. Transfer legs and kind mismatches are
    /// skipped, not errors: the classifier worked from a possibly stale
    /// snapshot.
    pub async fn apply_suggestions(
        &self,
        user_id: &str,
        suggestions: &[Suggestion],
    ) -> ResultLedger<usize> {
        with_commit!(self, |db_tx| {
            async {
                let mut applied = 0usize;
                for suggestion in suggestions {
                    let tx_model = match self
                        .require_transaction(&db_tx, suggestion.transaction_id, user_id)
                        .await
                    {
                        Ok(model) => model,
                        Err(crate::LedgerError::NotFound(_)) => continue,
                        Err(err) => return Err(err),
                    };
                    if tx_model.is_transfer {
                        continue;
                    }
                    let kind = TransactionKind::try_from(tx_model.kind.as_str())?;
                    match self
                        .require_category_for(&db_tx, suggestion.category_id, user_id, kind)
                        .await
                    {
                        Ok(_) => {}
                        Err(
                            crate::LedgerError::NotFound(_)
                            | crate::LedgerError::InvalidArgument(_)
                            | crate::LedgerError::Unauthorized(_),
                        ) => continue,
                        Err(err) => return Err(err),
                    }

                    let active = transactions::ActiveModel {
                        id: ActiveValue::Set(tx_model.id.clone()),
                        category_id: ActiveValue::Set(Some(suggestion.category_id.to_string())),
                        updated_at: ActiveValue::Set(chrono::Utc::now()),
                        ..Default::default()
                    };
                    active.update(&db_tx).await?;
                    applied += 1;
                }
                Ok(applied)
            }
            .await
        })
    }
}
