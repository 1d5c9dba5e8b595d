//! Balance arithmetic shared by every ledger operation.
//!
//! Create, update (revert + reapply), delete, transfers and recalculation all
//! go through [`signed_delta`], so live mutation and full recalculation use
//! the same sign table.

use crate::TransactionKind;

/// Signed effect of a transaction on its wallet balance, in minor units.
///
/// Income and debt (money borrowed) flow in; expense and loan (money lent
/// out) flow out. `amount_minor` is always a positive magnitude.
pub fn signed_delta(kind: TransactionKind, amount_minor: i64) -> i64 {
    match kind {
        TransactionKind::Income | TransactionKind::Debt => amount_minor,
        TransactionKind::Expense | TransactionKind::Loan => -amount_minor,
    }
}
