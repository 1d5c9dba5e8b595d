//! Transaction primitives.
//!
//! A `Transaction` is a single ledger event against exactly one wallet. A
//! transfer between wallets is stored as two linked transactions (an expense
//! leg and an income leg) that are created, edited and deleted together.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{LedgerError, ResultLedger};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
    /// Money borrowed: flows into the wallet.
    Debt,
    /// Money lent out: flows out of the wallet.
    Loan,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Debt => "debt",
            Self::Loan => "loan",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "debt" => Ok(Self::Debt),
            "loan" => Ok(Self::Loan),
            other => Err(LedgerError::InvalidArgument(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: String,
    pub wallet_id: Uuid,
    pub category_id: Option<Uuid>,
    /// Positive magnitude in minor units; the sign comes from `kind`.
    pub amount_minor: i64,
    /// User-assigned date of the event, distinct from `created_at`.
    pub occurred_at: DateTime<Utc>,
    pub kind: TransactionKind,
    pub tags: Option<Vec<String>>,
    pub note: Option<String>,
    pub is_transfer: bool,
    /// The paired leg, present iff `is_transfer`.
    pub linked_transaction_id: Option<Uuid>,
    /// Display hint on the outgoing leg of a transfer.
    pub to_wallet_id: Option<Uuid>,
    pub exclude_from_report: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: String,
        wallet_id: Uuid,
        category_id: Option<Uuid>,
        amount_minor: i64,
        occurred_at: DateTime<Utc>,
        kind: TransactionKind,
        tags: Option<Vec<String>>,
        note: Option<String>,
        exclude_from_report: bool,
    ) -> ResultLedger<Self> {
        if amount_minor <= 0 {
            return Err(LedgerError::InvalidArgument(
                "amount_minor must be > 0".to_string(),
            ));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            wallet_id,
            category_id,
            amount_minor,
            occurred_at,
            kind,
            tags,
            note,
            is_transfer: false,
            linked_transaction_id: None,
            to_wallet_id: None,
            exclude_from_report,
            created_at: now,
            updated_at: now,
        })
    }

    /// Builds one leg of a transfer with a preassigned id so the two legs can
    /// link to each other before either is persisted.
    #[allow(clippy::too_many_arguments)]
    pub fn transfer_leg(
        id: Uuid,
        user_id: String,
        wallet_id: Uuid,
        linked_transaction_id: Uuid,
        to_wallet_id: Option<Uuid>,
        amount_minor: i64,
        occurred_at: DateTime<Utc>,
        kind: TransactionKind,
        note: Option<String>,
    ) -> ResultLedger<Self> {
        if amount_minor <= 0 {
            return Err(LedgerError::InvalidArgument(
                "amount_minor must be > 0".to_string(),
            ));
        }
        let now = Utc::now();
        Ok(Self {
            id,
            user_id,
            wallet_id,
            category_id: None,
            amount_minor,
            occurred_at,
            kind,
            tags: None,
            note,
            is_transfer: true,
            linked_transaction_id: Some(linked_transaction_id),
            to_wallet_id,
            exclude_from_report: true,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub wallet_id: String,
    pub category_id: Option<String>,
    pub amount_minor: i64,
    pub occurred_at: DateTimeUtc,
    pub kind: String,
    /// JSON array of tag strings, or NULL.
    pub tags: Option<String>,
    pub note: Option<String>,
    pub is_transfer: bool,
    pub linked_transaction_id: Option<String>,
    pub to_wallet_id: Option<String>,
    pub exclude_from_report: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::wallets::Entity",
        from = "Column::WalletId",
        to = "super::wallets::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Wallets,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Users,
}

impl Related<super::wallets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallets.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

fn encode_tags(tags: Option<&Vec<String>>) -> ResultLedger<Option<String>> {
    tags.map(|tags| {
        serde_json::to_string(tags)
            .map_err(|err| LedgerError::InvalidArgument(format!("invalid tags: {err}")))
    })
    .transpose()
}

fn decode_tags(raw: Option<&str>) -> ResultLedger<Option<Vec<String>>> {
    raw.map(|raw| {
        serde_json::from_str(raw)
            .map_err(|err| LedgerError::InvalidArgument(format!("invalid tags: {err}")))
    })
    .transpose()
}

impl TryFrom<&Transaction> for ActiveModel {
    type Error = LedgerError;

    fn try_from(tx: &Transaction) -> ResultLedger<Self> {
        Ok(Self {
            id: ActiveValue::Set(tx.id.to_string()),
            user_id: ActiveValue::Set(tx.user_id.clone()),
            wallet_id: ActiveValue::Set(tx.wallet_id.to_string()),
            category_id: ActiveValue::Set(tx.category_id.map(|id| id.to_string())),
            amount_minor: ActiveValue::Set(tx.amount_minor),
            occurred_at: ActiveValue::Set(tx.occurred_at),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            tags: ActiveValue::Set(encode_tags(tx.tags.as_ref())?),
            note: ActiveValue::Set(tx.note.clone()),
            is_transfer: ActiveValue::Set(tx.is_transfer),
            linked_transaction_id: ActiveValue::Set(
                tx.linked_transaction_id.map(|id| id.to_string()),
            ),
            to_wallet_id: ActiveValue::Set(tx.to_wallet_id.map(|id| id.to_string())),
            exclude_from_report: ActiveValue::Set(tx.exclude_from_report),
            created_at: ActiveValue::Set(tx.created_at),
            updated_at: ActiveValue::Set(tx.updated_at),
        })
    }
}

fn parse_uuid(raw: &str, label: &str) -> ResultLedger<Uuid> {
    Uuid::parse_str(raw).map_err(|_| LedgerError::InvalidArgument(format!("invalid {label} id")))
}

impl TryFrom<Model> for Transaction {
    type Error = LedgerError;

    fn try_from(model: Model) -> ResultLedger<Self> {
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            user_id: model.user_id,
            wallet_id: parse_uuid(&model.wallet_id, "wallet")?,
            category_id: model
                .category_id
                .as_deref()
                .map(|id| parse_uuid(id, "category"))
                .transpose()?,
            amount_minor: model.amount_minor,
            occurred_at: model.occurred_at,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            tags: decode_tags(model.tags.as_deref())?,
            note: model.note,
            is_transfer: model.is_transfer,
            linked_transaction_id: model
                .linked_transaction_id
                .as_deref()
                .map(|id| parse_uuid(id, "transaction"))
                .transpose()?,
            to_wallet_id: model
                .to_wallet_id
                .as_deref()
                .map(|id| parse_uuid(id, "wallet"))
                .transpose()?,
            exclude_from_report: model.exclude_from_report,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
