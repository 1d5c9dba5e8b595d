use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Distinguishes an absent field from an explicit `null`: absence leaves the
/// outer option `None`, `null` yields `Some(None)`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub mod wallet {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum WalletKind {
        Available,
        Credit,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WalletNew {
        pub name: String,
        pub kind: WalletKind,
        pub currency: String,
        pub initial_balance_minor: i64,
        pub icon: Option<String>,
        pub color: Option<String>,
    }

    /// Patch body; absent fields keep their server-side values.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct WalletUpdate {
        pub name: Option<String>,
        pub kind: Option<WalletKind>,
        pub initial_balance_minor: Option<i64>,
        pub icon: Option<String>,
        pub color: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WalletView {
        pub id: Uuid,
        pub name: String,
        pub kind: WalletKind,
        pub currency: String,
        pub balance_minor: i64,
        pub initial_balance_minor: i64,
        /// Outstanding debt; only set for credit wallets.
        pub debt_minor: Option<i64>,
        pub display_order: i32,
        pub icon: Option<String>,
        pub color: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WalletCreated {
        pub id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WalletsResponse {
        pub wallets: Vec<WalletView>,
    }

    /// Full assignment of display positions, restricted to one kind.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct WalletReorder {
        pub orders: Vec<WalletOrder>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WalletOrder {
        pub id: Uuid,
        pub display_order: i32,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RecalculateResponse {
        pub wallets_written: usize,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Income,
        Expense,
        Debt,
        Loan,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub wallet_id: Uuid,
        pub kind: TransactionKind,
        /// Must be > 0; the kind defines the sign.
        pub amount_minor: i64,
        pub category_id: Option<Uuid>,
        pub note: Option<String>,
        pub tags: Option<Vec<String>>,
        pub exclude_from_report: Option<bool>,
        /// RFC3339 timestamp, including timezone offset (local user time).
        pub occurred_at: DateTime<FixedOffset>,
    }

    /// Patch body; absent fields keep their server-side values. `category_id`
    /// uses a double option so `null` clears the category while absence keeps
    /// it.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionUpdate {
        pub wallet_id: Option<Uuid>,
        pub kind: Option<TransactionKind>,
        pub amount_minor: Option<i64>,
        #[serde(default, deserialize_with = "super::double_option")]
        pub category_id: Option<Option<Uuid>>,
        pub note: Option<String>,
        pub tags: Option<Vec<String>>,
        pub exclude_from_report: Option<bool>,
        pub occurred_at: Option<DateTime<FixedOffset>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub wallet_id: Uuid,
        pub kind: TransactionKind,
        pub amount_minor: i64,
        pub category_id: Option<Uuid>,
        pub note: Option<String>,
        pub tags: Option<Vec<String>>,
        pub is_transfer: bool,
        pub linked_transaction_id: Option<Uuid>,
        pub to_wallet_id: Option<Uuid>,
        pub exclude_from_report: bool,
        pub occurred_at: DateTime<FixedOffset>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionList {
        pub limit: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionsResponse {
        pub transactions: Vec<TransactionView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionCreated {
        pub id: Uuid,
    }
}

pub mod transfer {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransferNew {
        pub from_wallet_id: Uuid,
        pub to_wallet_id: Uuid,
        pub amount_minor: i64,
        pub note: Option<String>,
        /// RFC3339 timestamp, including timezone offset (local user time).
        pub occurred_at: DateTime<FixedOffset>,
    }

    /// Patch body addressed by either leg; both legs change together.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransferUpdate {
        pub amount_minor: Option<i64>,
        pub note: Option<String>,
        pub occurred_at: Option<DateTime<FixedOffset>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransferCreated {
        pub outgoing_id: Uuid,
        pub incoming_id: Uuid,
    }
}

pub mod category {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum CategoryKind {
        Income,
        Expense,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryNew {
        pub name: String,
        pub kind: CategoryKind,
        pub parent_id: Option<Uuid>,
        pub icon: Option<String>,
        pub color: Option<String>,
        pub display_order: Option<i32>,
    }

    /// Patch body; `parent_id` uses a double option so `null` detaches the
    /// category from its parent while absence keeps it.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CategoryUpdate {
        pub name: Option<String>,
        #[serde(default, deserialize_with = "super::double_option")]
        pub parent_id: Option<Option<Uuid>>,
        pub icon: Option<String>,
        pub color: Option<String>,
        pub display_order: Option<i32>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryView {
        pub id: Uuid,
        pub name: String,
        pub kind: CategoryKind,
        pub parent_id: Option<Uuid>,
        pub icon: Option<String>,
        pub color: Option<String>,
        pub display_order: Option<i32>,
        pub is_default: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryCreated {
        pub id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoriesResponse {
        pub categories: Vec<CategoryView>,
    }
}

pub mod user {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Signup {
        pub email: String,
        pub password: String,
        /// Currency of the auto-created starter wallet.
        pub currency: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SignupResponse {
        pub user_id: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProfileView {
        pub id: String,
        pub email: String,
        pub default_wallet_id: Option<Uuid>,
        pub recent_transactions_limit: Option<i32>,
        pub language: Option<String>,
        pub theme: Option<String>,
        pub gemini_model: Option<String>,
    }

    /// Patch body; absent fields keep their server-side values.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct PreferencesUpdate {
        pub default_wallet_id: Option<Uuid>,
        pub recent_transactions_limit: Option<i32>,
        pub language: Option<String>,
        pub theme: Option<String>,
        pub gemini_api_key: Option<String>,
        pub gemini_model: Option<String>,
    }
}

pub mod classify {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SuggestionApply {
        pub suggestions: Vec<SuggestionBody>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SuggestionBody {
        pub transaction_id: Uuid,
        pub category_id: Uuid,
        pub confidence: f32,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SuggestionApplied {
        pub applied: usize,
    }
}
