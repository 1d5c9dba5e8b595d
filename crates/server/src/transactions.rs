//! Transaction API endpoints

use api_types::transaction::{
    TransactionCreated, TransactionKind as ApiKind, TransactionList, TransactionNew,
    TransactionUpdate, TransactionView, TransactionsResponse,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{FixedOffset, Utc};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};
use engine::{CreateTransactionCmd, Transaction, TransactionKind, UpdateTransactionCmd};

fn map_kind(kind: TransactionKind) -> ApiKind {
    match kind {
        TransactionKind::Income => ApiKind::Income,
        TransactionKind::Expense => ApiKind::Expense,
        TransactionKind::Debt => ApiKind::Debt,
        TransactionKind::Loan => ApiKind::Loan,
    }
}

fn map_api_kind(kind: ApiKind) -> TransactionKind {
    match kind {
        ApiKind::Income => TransactionKind::Income,
        ApiKind::Expense => TransactionKind::Expense,
        ApiKind::Debt => TransactionKind::Debt,
        ApiKind::Loan => TransactionKind::Loan,
    }
}

pub(crate) fn view(tx: Transaction) -> Result<TransactionView, ServerError> {
    let utc = FixedOffset::east_opt(0)
        .ok_or_else(|| ServerError::Generic("invalid UTC offset".to_string()))?;
    Ok(TransactionView {
        id: tx.id,
        wallet_id: tx.wallet_id,
        kind: map_kind(tx.kind),
        amount_minor: tx.amount_minor,
        category_id: tx.category_id,
        note: tx.note,
        tags: tx.tags,
        is_transfer: tx.is_transfer,
        linked_transaction_id: tx.linked_transaction_id,
        to_wallet_id: tx.to_wallet_id,
        exclude_from_report: tx.exclude_from_report,
        occurred_at: tx.occurred_at.with_timezone(&utc),
    })
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionCreated>), ServerError> {
    let id = state
        .engine
        .create_transaction(CreateTransactionCmd {
            user_id: user.id,
            wallet_id: payload.wallet_id,
            category_id: payload.category_id,
            amount_minor: payload.amount_minor,
            kind: map_api_kind(payload.kind),
            occurred_at: payload.occurred_at.with_timezone(&Utc),
            note: payload.note,
            tags: payload.tags,
            exclude_from_report: payload.exclude_from_report.unwrap_or(false),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(TransactionCreated { id })))
}

pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state.engine.transaction(id, &user.id).await?;
    Ok(Json(view(tx)?))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(payload): Query<TransactionList>,
) -> Result<Json<TransactionsResponse>, ServerError> {
    let txs = state.engine.transactions(&user.id, payload.limit).await?;
    let transactions = txs.into_iter().map(view).collect::<Result<Vec<_>, _>>()?;
    Ok(Json(TransactionsResponse { transactions }))
}

pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransactionUpdate>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .update_transaction(UpdateTransactionCmd {
            user_id: user.id,
            transaction_id: id,
            wallet_id: payload.wallet_id,
            category_id: payload.category_id,
            amount_minor: payload.amount_minor,
            kind: payload.kind.map(map_api_kind),
            occurred_at: payload.occurred_at.map(|dt| dt.with_timezone(&Utc)),
            note: payload.note,
            tags: payload.tags,
            exclude_from_report: payload.exclude_from_report,
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_transaction(id, &user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
