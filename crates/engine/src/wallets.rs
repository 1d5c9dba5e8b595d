//! The module contains the `Wallet` struct and its persisted entity.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{LedgerError, ResultLedger};

/// How a wallet's stored numbers are interpreted.
///
/// For `Available` wallets `balance` is money on hand. For `Credit` wallets
/// `initial_balance` is the credit limit and `balance` the remaining credit;
/// the outstanding debt is derived, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletKind {
    Available,
    Credit,
}

impl WalletKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Credit => "credit",
        }
    }
}

impl TryFrom<&str> for WalletKind {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "available" => Ok(Self::Available),
            "credit" => Ok(Self::Credit),
            other => Err(LedgerError::InvalidArgument(format!(
                "invalid wallet kind: {other}"
            ))),
        }
    }
}

/// A wallet: a place money is kept (cash, bank account) or a revolving
/// credit line.
///
/// Invariant maintained by the ledger operations:
/// `balance == initial_balance + Σ signed_delta(kind, amount)` over the
/// wallet's non-deleted transactions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub balance: i64,
    pub initial_balance: i64,
    pub currency: String,
    pub kind: WalletKind,
    /// Position in the wallet list, dense and 1-based per kind.
    pub display_order: i32,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(
        user_id: String,
        name: String,
        initial_balance: i64,
        currency: String,
        kind: WalletKind,
        display_order: i32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            name,
            balance: initial_balance,
            initial_balance,
            currency,
            kind,
            display_order,
            icon: None,
            color: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Outstanding debt on a credit wallet (limit minus remaining credit).
    ///
    /// `None` for available wallets.
    pub fn debt(&self) -> Option<i64> {
        match self.kind {
            WalletKind::Credit => Some(self.initial_balance - self.balance),
            WalletKind::Available => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub balance: i64,
    pub initial_balance: i64,
    pub currency: String,
    pub kind: String,
    pub display_order: i32,
    pub icon: Option<String>,
    pub color: Option<String>,
    /// Optimistic-concurrency counter: balance writes are conditional on the
    /// revision read at the start of the operation.
    pub revision: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Users,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Wallet> for ActiveModel {
    fn from(wallet: &Wallet) -> Self {
        Self {
            id: ActiveValue::Set(wallet.id.to_string()),
            user_id: ActiveValue::Set(wallet.user_id.clone()),
            name: ActiveValue::Set(wallet.name.clone()),
            balance: ActiveValue::Set(wallet.balance),
            initial_balance: ActiveValue::Set(wallet.initial_balance),
            currency: ActiveValue::Set(wallet.currency.clone()),
            kind: ActiveValue::Set(wallet.kind.as_str().to_string()),
            display_order: ActiveValue::Set(wallet.display_order),
            icon: ActiveValue::Set(wallet.icon.clone()),
            color: ActiveValue::Set(wallet.color.clone()),
            revision: ActiveValue::Set(0),
            created_at: ActiveValue::Set(wallet.created_at),
            updated_at: ActiveValue::Set(wallet.updated_at),
        }
    }
}

impl TryFrom<Model> for Wallet {
    type Error = LedgerError;

    fn try_from(model: Model) -> ResultLedger<Self> {
        let id = Uuid::parse_str(&model.id)
            .map_err(|_| LedgerError::InvalidArgument("invalid wallet id".to_string()))?;
        let kind = WalletKind::try_from(model.kind.as_str())?;
        Ok(Self {
            id,
            user_id: model.user_id,
            name: model.name,
            balance: model.balance,
            initial_balance: model.initial_balance,
            currency: model.currency,
            kind,
            display_order: model.display_order,
            icon: model.icon,
            color: model.color,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
