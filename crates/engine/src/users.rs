//! User records and the `Profile` view the engine hands out.
//!
//! Preferences are presentational configuration; nothing in the ledger
//! operations reads them implicitly. Every operation takes an explicit
//! `user_id`.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{LedgerError, ResultLedger};

/// A user's profile and preferences, without credentials.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub default_wallet_id: Option<Uuid>,
    pub recent_transactions_limit: Option<i32>,
    pub language: Option<String>,
    pub theme: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub email: String,
    pub password: String,
    pub default_wallet_id: Option<String>,
    pub recent_transactions_limit: Option<i32>,
    pub language: Option<String>,
    pub theme: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::wallets::Entity")]
    Wallets,
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
    #[sea_orm(has_many = "super::categories::Entity")]
    Categories,
}

impl Related<super::wallets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallets.def()
    }
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Profile {
    type Error = LedgerError;

    fn try_from(model: Model) -> ResultLedger<Self> {
        let default_wallet_id = model
            .default_wallet_id
            .as_deref()
            .map(|raw| {
                Uuid::parse_str(raw)
                    .map_err(|_| LedgerError::InvalidArgument("invalid wallet id".to_string()))
            })
            .transpose()?;
        Ok(Self {
            id: model.id,
            email: model.email,
            default_wallet_id,
            recent_transactions_limit: model.recent_transactions_limit,
            language: model.language,
            theme: model.theme,
            gemini_api_key: model.gemini_api_key,
            gemini_model: model.gemini_model,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
