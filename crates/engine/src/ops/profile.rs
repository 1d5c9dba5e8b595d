//! Signup and user preferences.

use chrono::Utc;
use uuid::Uuid;

use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*};

use crate::{LedgerError, Profile, ResultLedger, Wallet, WalletKind, users, wallets};

use super::{Engine, normalize_currency, normalize_optional_text, optional_set, with_commit};

#[derive(Clone, Debug)]
pub struct SignupCmd {
    pub email: String,
    pub password: String,
    /// Currency of the auto-created "Cash" wallet.
    pub currency: String,
}

/// Preference patch; omitted fields keep their old values. Purely
/// presentational configuration, nothing here feeds the ledger arithmetic.
#[derive(Clone, Debug, Default)]
pub struct UpdatePreferencesCmd {
    pub user_id: String,
    pub default_wallet_id: Option<Uuid>,
    pub recent_transactions_limit: Option<i32>,
    pub language: Option<String>,
    pub theme: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,
}

impl Engine {
    /// Creates a user and their starter "Cash" wallet; returns the user id.
    pub async fn signup(&self, cmd: SignupCmd) -> ResultLedger<String> {
        let email = cmd.email.trim().to_ascii_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(LedgerError::InvalidArgument(format!(
                "invalid email: {email:?}"
            )));
        }
        if cmd.password.is_empty() {
            return Err(LedgerError::InvalidArgument(
                "password must not be empty".to_string(),
            ));
        }
        let currency = normalize_currency(&cmd.currency)?;
        with_commit!(self, |db_tx| {
            async {
                let exists = users::Entity::find()
                    .filter(users::Column::Email.eq(email.clone()))
                    .one(&db_tx)
                    .await?
                    .is_some();
                if exists {
                    return Err(LedgerError::ExistingKey(email.clone()));
                }

                let user_id = Uuid::new_v4().to_string();
                let now = Utc::now();
                let user = users::ActiveModel {
                    id: ActiveValue::Set(user_id.clone()),
                    email: ActiveValue::Set(email.clone()),
                    password: ActiveValue::Set(cmd.password.clone()),
                    default_wallet_id: ActiveValue::Set(None),
                    recent_transactions_limit: ActiveValue::Set(None),
                    language: ActiveValue::Set(None),
                    theme: ActiveValue::Set(None),
                    gemini_api_key: ActiveValue::Set(None),
                    gemini_model: ActiveValue::Set(None),
                    created_at: ActiveValue::Set(now),
                    updated_at: ActiveValue::Set(now),
                };
                user.insert(&db_tx).await?;

                // Starter wallet so clients can record money immediately.
                let cash = Wallet::new(
                    user_id.clone(),
                    "Cash".to_string(),
                    0,
                    currency.clone(),
                    WalletKind::Available,
                    1,
                );
                wallets::ActiveModel::from(&cash).insert(&db_tx).await?;

                Ok(user_id)
            }
            .await
        })
    }

    /// Returns the user's profile without credentials.
    pub async fn profile(&self, user_id: &str) -> ResultLedger<Profile> {
        let model = users::Entity::find_by_id(user_id.to_string())
            .one(self.database())
            .await?
            .ok_or_else(|| LedgerError::NotFound("user not exists".to_string()))?;
        Profile::try_from(model)
    }

    /// Applies a preference patch; the default wallet must exist and belong
    /// to the user.
    pub async fn update_preferences(&self, cmd: UpdatePreferencesCmd) -> ResultLedger<()> {
        with_commit!(self, |db_tx| {
            async {
                super::require_user(&db_tx, &cmd.user_id).await?;
                if let Some(wallet_id) = cmd.default_wallet_id {
                    self.require_wallet(&db_tx, wallet_id, &cmd.user_id).await?;
                }

                let active = users::ActiveModel {
                    id: ActiveValue::Set(cmd.user_id.clone()),
                    default_wallet_id: optional_set(
                        cmd.default_wallet_id.map(|id| Some(id.to_string())),
                    ),
                    recent_transactions_limit: optional_set(
                        cmd.recent_transactions_limit.map(Some),
                    ),
                    language: optional_set(
                        normalize_optional_text(cmd.language.as_deref()).map(Some),
                    ),
                    theme: optional_set(normalize_optional_text(cmd.theme.as_deref()).map(Some)),
                    gemini_api_key: optional_set(
                        normalize_optional_text(cmd.gemini_api_key.as_deref()).map(Some),
                    ),
                    gemini_model: optional_set(
                        normalize_optional_text(cmd.gemini_model.as_deref()).map(Some),
                    ),
                    updated_at: ActiveValue::Set(Utc::now()),
                    ..Default::default()
                };
                active.update(&db_tx).await?;
                Ok(())
            }
            .await
        })
    }
}
