//! Category API endpoints

use api_types::category::{
    CategoriesResponse, CategoryCreated, CategoryKind as ApiKind, CategoryNew, CategoryUpdate,
    CategoryView,
};
use api_types::classify::{SuggestionApplied, SuggestionApply};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};
use engine::{Category, CategoryKind, CreateCategoryCmd, Suggestion, UpdateCategoryCmd};

fn map_kind(kind: CategoryKind) -> ApiKind {
    match kind {
        CategoryKind::Income => ApiKind::Income,
        CategoryKind::Expense => ApiKind::Expense,
    }
}

fn map_api_kind(kind: ApiKind) -> CategoryKind {
    match kind {
        ApiKind::Income => CategoryKind::Income,
        ApiKind::Expense => CategoryKind::Expense,
    }
}

fn view(category: Category) -> CategoryView {
    CategoryView {
        id: category.id,
        name: category.name,
        kind: map_kind(category.kind),
        parent_id: category.parent_id,
        icon: category.icon,
        color: category.color,
        display_order: category.display_order,
        is_default: category.is_default,
    }
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<CategoryNew>,
) -> Result<(StatusCode, Json<CategoryCreated>), ServerError> {
    let id = state
        .engine
        .create_category(CreateCategoryCmd {
            user_id: user.id,
            name: payload.name,
            kind: map_api_kind(payload.kind),
            parent_id: payload.parent_id,
            icon: payload.icon,
            color: payload.color,
            display_order: payload.display_order,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(CategoryCreated { id })))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<CategoriesResponse>, ServerError> {
    let categories = state.engine.categories(&user.id).await?;
    Ok(Json(CategoriesResponse {
        categories: categories.into_iter().map(view).collect(),
    }))
}

pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryUpdate>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .update_category(UpdateCategoryCmd {
            user_id: user.id,
            category_id: id,
            name: payload.name,
            parent_id: payload.parent_id,
            icon: payload.icon,
            color: payload.color,
            display_order: payload.display_order,
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_category(id, &user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Bulk-assigns classifier suggestions; mismatches are skipped, not errors.
pub async fn apply_suggestions(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<SuggestionApply>,
) -> Result<Json<SuggestionApplied>, ServerError> {
    let suggestions: Vec<Suggestion> = payload
        .suggestions
        .into_iter()
        .map(|s| Suggestion {
            transaction_id: s.transaction_id,
            category_id: s.category_id,
            confidence: s.confidence,
        })
        .collect();

    let applied = state
        .engine
        .apply_suggestions(&user.id, &suggestions)
        .await?;

    Ok(Json(SuggestionApplied { applied }))
}
