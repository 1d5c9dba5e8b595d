//! Account endpoints and the credential row the auth middleware reads.

use api_types::user::{PreferencesUpdate, ProfileView, Signup, SignupResponse};
use axum::{Extension, Json, extract::State, http::StatusCode};
use engine::{SignupCmd, UpdatePreferencesCmd};
use sea_orm::entity::prelude::*;

use crate::{ServerError, server::ServerState};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub email: String,
    pub password: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Unauthenticated: creates an account and its starter wallet.
pub async fn signup(
    State(state): State<ServerState>,
    Json(payload): Json<Signup>,
) -> Result<(StatusCode, Json<SignupResponse>), ServerError> {
    let user_id = state
        .engine
        .signup(SignupCmd {
            email: payload.email,
            password: payload.password,
            currency: payload.currency,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(SignupResponse { user_id })))
}

pub async fn profile(
    Extension(user): Extension<Model>,
    State(state): State<ServerState>,
) -> Result<Json<ProfileView>, ServerError> {
    let profile = state.engine.profile(&user.id).await?;

    Ok(Json(ProfileView {
        id: profile.id,
        email: profile.email,
        default_wallet_id: profile.default_wallet_id,
        recent_transactions_limit: profile.recent_transactions_limit,
        language: profile.language,
        theme: profile.theme,
        gemini_model: profile.gemini_model,
    }))
}

pub async fn update_preferences(
    Extension(user): Extension<Model>,
    State(state): State<ServerState>,
    Json(payload): Json<PreferencesUpdate>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .update_preferences(UpdatePreferencesCmd {
            user_id: user.id,
            default_wallet_id: payload.default_wallet_id,
            recent_transactions_limit: payload.recent_transactions_limit,
            language: payload.language,
            theme: payload.theme,
            gemini_api_key: payload.gemini_api_key,
            gemini_model: payload.gemini_model,
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
