//! Wallet API endpoints

use api_types::wallet::{
    RecalculateResponse, WalletCreated, WalletKind as ApiKind, WalletNew, WalletReorder,
    WalletUpdate, WalletView, WalletsResponse,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};
use engine::{CreateWalletCmd, UpdateWalletCmd, Wallet, WalletKind};

fn map_kind(kind: WalletKind) -> ApiKind {
    match kind {
        WalletKind::Available => ApiKind::Available,
        WalletKind::Credit => ApiKind::Credit,
    }
}

fn map_api_kind(kind: ApiKind) -> WalletKind {
    match kind {
        ApiKind::Available => WalletKind::Available,
        ApiKind::Credit => WalletKind::Credit,
    }
}

fn view(wallet: Wallet) -> WalletView {
    WalletView {
        id: wallet.id,
        name: wallet.name.clone(),
        kind: map_kind(wallet.kind),
        currency: wallet.currency.clone(),
        balance_minor: wallet.balance,
        initial_balance_minor: wallet.initial_balance,
        debt_minor: wallet.debt(),
        display_order: wallet.display_order,
        icon: wallet.icon,
        color: wallet.color,
    }
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<WalletNew>,
) -> Result<(StatusCode, Json<WalletCreated>), ServerError> {
    let id = state
        .engine
        .create_wallet(CreateWalletCmd {
            user_id: user.id,
            name: payload.name,
            kind: map_api_kind(payload.kind),
            currency: payload.currency,
            initial_balance: payload.initial_balance_minor,
            icon: payload.icon,
            color: payload.color,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(WalletCreated { id })))
}

pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<WalletView>, ServerError> {
    let wallet = state.engine.wallet(id, &user.id).await?;
    Ok(Json(view(wallet)))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<WalletsResponse>, ServerError> {
    let wallets = state.engine.wallets(&user.id).await?;
    Ok(Json(WalletsResponse {
        wallets: wallets.into_iter().map(view).collect(),
    }))
}

pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<WalletUpdate>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .update_wallet(UpdateWalletCmd {
            user_id: user.id,
            wallet_id: id,
            name: payload.name,
            kind: payload.kind.map(map_api_kind),
            initial_balance: payload.initial_balance_minor,
            icon: payload.icon,
            color: payload.color,
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_wallet(id, &user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reorder(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<WalletReorder>,
) -> Result<StatusCode, ServerError> {
    let updates: Vec<(Uuid, i32)> = payload
        .orders
        .iter()
        .map(|order| (order.id, order.display_order))
        .collect();
    state.engine.reorder_wallets(&user.id, &updates).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn recalculate(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<RecalculateResponse>, ServerError> {
    let wallets_written = state.engine.recalculate_balances(&user.id).await?;
    Ok(Json(RecalculateResponse { wallets_written }))
}
