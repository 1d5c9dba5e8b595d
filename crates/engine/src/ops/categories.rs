//! Category lifecycle.
//!
//! The tree is two levels deep: a parent must be a root (no parent of its
//! own) of the same kind. Deleting a category never cascades: transactions
//! keep their dangling `category_id` and render as "unknown", and children of
//! a deleted root are promoted to roots.

use chrono::Utc;
use uuid::Uuid;

use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};

use crate::{Category, CategoryKind, LedgerError, ResultLedger, categories};

use super::{
    Engine, normalize_optional_text, normalize_required_name, optional_set, with_commit,
};

#[derive(Clone, Debug)]
pub struct CreateCategoryCmd {
    pub user_id: String,
    pub name: String,
    pub kind: CategoryKind,
    pub parent_id: Option<Uuid>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub display_order: Option<i32>,
}

/// Patch for a category; omitted fields keep their old values. Kind is
/// immutable once created.
#[derive(Clone, Debug, Default)]
pub struct UpdateCategoryCmd {
    pub user_id: String,
    pub category_id: Uuid,
    pub name: Option<String>,
    pub parent_id: Option<Option<Uuid>>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub display_order: Option<i32>,
}

impl Engine {
    pub async fn create_category(&self, cmd: CreateCategoryCmd) -> ResultLedger<Uuid> {
        let name = normalize_required_name(&cmd.name, "category")?;
        with_commit!(self, |db_tx| {
            async {
                super::require_user(&db_tx, &cmd.user_id).await?;
                if let Some(parent_id) = cmd.parent_id {
                    self.require_root_category(&db_tx, parent_id, &cmd.user_id, cmd.kind)
                        .await?;
                }

                let mut category = Category::new(
                    cmd.user_id.clone(),
                    name.clone(),
                    cmd.kind,
                    cmd.parent_id,
                );
                category.icon = normalize_optional_text(cmd.icon.as_deref());
                category.color = normalize_optional_text(cmd.color.as_deref());
                category.display_order = cmd.display_order;

                let category_id = category.id;
                categories::ActiveModel::from(&category)
                    .insert(&db_tx)
                    .await?;
                Ok(category_id)
            }
            .await
        })
    }

    pub async fn update_category(&self, cmd: UpdateCategoryCmd) -> ResultLedger<()> {
        let name = cmd
            .name
            .as_deref()
            .map(|name| normalize_required_name(name, "category"))
            .transpose()?;
        with_commit!(self, |db_tx| {
            async {
                let model = self
                    .require_category(&db_tx, cmd.category_id, &cmd.user_id)
                    .await?;
                let kind = CategoryKind::try_from(model.kind.as_str())?;

                if let Some(new_parent) = cmd.parent_id {
                    if let Some(parent_id) = new_parent {
                        if parent_id == cmd.category_id {
                            return Err(LedgerError::InvalidArgument(
                                "category cannot be its own parent".to_string(),
                            ));
                        }
                        self.require_root_category(&db_tx, parent_id, &cmd.user_id, kind)
                            .await?;
                        // A root that gains a parent must not strand children
                        // on a third level.
                        let children = categories::Entity::find()
                            .filter(categories::Column::ParentId.eq(model.id.clone()))
                            .one(&db_tx)
                            .await?;
                        if children.is_some() {
                            return Err(LedgerError::InvalidArgument(
                                "category with children cannot become a child".to_string(),
                            ));
                        }
                    }
                }

                let active = categories::ActiveModel {
                    id: ActiveValue::Set(model.id.clone()),
                    name: optional_set(name.clone()),
                    parent_id: optional_set(
                        cmd.parent_id.map(|parent| parent.map(|id| id.to_string())),
                    ),
                    icon: optional_set(
                        normalize_optional_text(cmd.icon.as_deref()).map(Some),
                    ),
                    color: optional_set(
                        normalize_optional_text(cmd.color.as_deref()).map(Some),
                    ),
                    display_order: optional_set(cmd.display_order.map(Some)),
                    updated_at: ActiveValue::Set(Utc::now()),
                    ..Default::default()
                };
                active.update(&db_tx).await?;
                Ok(())
            }
            .await
        })
    }

    /// Deletes a category without touching transactions; children become
    /// roots.
    pub async fn delete_category(&self, category_id: Uuid, user_id: &str) -> ResultLedger<()> {
        with_commit!(self, |db_tx| {
            async {
                let model = self
                    .require_category(&db_tx, category_id, user_id)
                    .await?;

                categories::Entity::update_many()
                    .col_expr(categories::Column::ParentId, Expr::value(None::<String>))
                    .filter(categories::Column::ParentId.eq(model.id.clone()))
                    .exec(&db_tx)
                    .await?;
                categories::Entity::delete_by_id(model.id.clone())
                    .exec(&db_tx)
                    .await?;
                Ok(())
            }
            .await
        })
    }

    /// Lists the user's categories, roots before children.
    pub async fn categories(&self, user_id: &str) -> ResultLedger<Vec<Category>> {
        let models = categories::Entity::find()
            .filter(categories::Column::UserId.eq(user_id))
            .order_by_asc(categories::Column::Kind)
            .order_by_asc(categories::Column::DisplayOrder)
            .all(self.database())
            .await?;
        models.into_iter().map(Category::try_from).collect()
    }

    async fn require_category(
        &self,
        db_tx: &DatabaseTransaction,
        category_id: Uuid,
        user_id: &str,
    ) -> ResultLedger<categories::Model> {
        let model = categories::Entity::find_by_id(category_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| LedgerError::NotFound("category not exists".to_string()))?;
        if model.user_id != user_id {
            return Err(LedgerError::Unauthorized(
                "category belongs to another user".to_string(),
            ));
        }
        Ok(model)
    }

    async fn require_root_category(
        &self,
        db_tx: &DatabaseTransaction,
        category_id: Uuid,
        user_id: &str,
        kind: CategoryKind,
    ) -> ResultLedger<categories::Model> {
        let parent = self.require_category(db_tx, category_id, user_id).await?;
        if parent.parent_id.is_some() {
            return Err(LedgerError::InvalidArgument(
                "parent category must be a root".to_string(),
            ));
        }
        let parent_kind = CategoryKind::try_from(parent.kind.as_str())?;
        if parent_kind != kind {
            return Err(LedgerError::InvalidArgument(
                "parent category kind must match".to_string(),
            ));
        }
        Ok(parent)
    }
}
