//! Transfer API endpoints
//!
//! A transfer is addressed by either of its two legs; the engine keeps both
//! legs and both wallet balances in step.

use api_types::transfer::{TransferCreated, TransferNew, TransferUpdate};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};
use engine::{CreateTransferCmd, UpdateTransferCmd};

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<TransferNew>,
) -> Result<(StatusCode, Json<TransferCreated>), ServerError> {
    let (outgoing_id, incoming_id) = state
        .engine
        .create_transfer(CreateTransferCmd {
            user_id: user.id,
            from_wallet_id: payload.from_wallet_id,
            to_wallet_id: payload.to_wallet_id,
            amount_minor: payload.amount_minor,
            occurred_at: payload.occurred_at.with_timezone(&Utc),
            note: payload.note,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(TransferCreated {
            outgoing_id,
            incoming_id,
        }),
    ))
}

pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransferUpdate>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .update_transfer(UpdateTransferCmd {
            user_id: user.id,
            transaction_id: id,
            amount_minor: payload.amount_minor,
            occurred_at: payload.occurred_at.map(|dt| dt.with_timezone(&Utc)),
            note: payload.note,
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_transfer(id, &user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
