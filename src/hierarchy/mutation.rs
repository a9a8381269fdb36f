//! Structural changes to the department tree
//!
//! Each operation runs its invariant checks and its writes inside one
//! transaction. The checks are not serialized against concurrent writers;
//! the unique indexes, the self-parent CHECK and the foreign keys reject
//! whatever slips through, and those rejections are translated back into
//! the same domain errors.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set, TransactionTrait, Unchanged,
};
use serde::{Deserialize, Serialize};

use crate::entity::{department, employee};
use crate::error::{department_write_error, AppError, AppResult};

use super::query;

/// Input for a new department; `name` is already trimmed and validated
#[derive(Debug, Clone)]
pub struct NewDepartment {
    pub name: String,
    pub parent_id: Option<i64>,
}

/// Partial update. `parent_id: Some(None)` promotes to root, `None` leaves it alone.
#[derive(Debug, Clone, Default)]
pub struct DepartmentChanges {
    pub name: Option<String>,
    pub parent_id: Option<Option<i64>>,
}

impl DepartmentChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.parent_id.is_none()
    }
}

/// What happens to the employees of a deleted department
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeleteMode {
    /// Subtree and every employee in it are removed
    #[default]
    Cascade,
    /// Direct employees move to another department first
    Reassign,
}

/// Whether another department under `parent_id` already uses `name`
async fn name_taken<C>(
    db: &C,
    parent_id: Option<i64>,
    name: &str,
    exclude_id: Option<i64>,
) -> Result<bool, DbErr>
where
    C: ConnectionTrait,
{
    let mut query = department::Entity::find().filter(department::Column::Name.eq(name));
    query = match parent_id {
        Some(parent_id) => query.filter(department::Column::ParentId.eq(parent_id)),
        None => query.filter(department::Column::ParentId.is_null()),
    };
    if let Some(id) = exclude_id {
        query = query.filter(department::Column::Id.ne(id));
    }
    Ok(query.one(db).await?.is_some())
}

async fn exists<C>(db: &C, id: i64) -> Result<bool, DbErr>
where
    C: ConnectionTrait,
{
    Ok(department::Entity::find_by_id(id).one(db).await?.is_some())
}

/// Create a root (no parent) or a child department
pub async fn create(db: &DatabaseConnection, new: NewDepartment) -> AppResult<department::Model> {
    let created = db
        .transaction::<_, department::Model, AppError>(move |txn| {
            Box::pin(async move {
                if name_taken(txn, new.parent_id, &new.name, None).await? {
                    return Err(AppError::DepartmentNameExists);
                }

                department::ActiveModel {
                    name: Set(new.name),
                    parent_id: Set(new.parent_id),
                    ..Default::default()
                }
                .insert(txn)
                .await
                .map_err(department_write_error)
            })
        })
        .await?;

    tracing::info!(id = created.id, parent_id = ?created.parent_id, "Department created");
    Ok(created)
}

/// Rename and/or re-parent a department
pub async fn update(
    db: &DatabaseConnection,
    id: i64,
    changes: DepartmentChanges,
) -> AppResult<department::Model> {
    if changes.is_empty() {
        return Err(AppError::RequestBodyRequired);
    }

    let updated = db
        .transaction::<_, department::Model, AppError>(move |txn| {
            Box::pin(async move {
                let current = department::Entity::find_by_id(id)
                    .one(txn)
                    .await?
                    .ok_or(AppError::DepartmentNotFound)?;

                if let Some(Some(parent_id)) = changes.parent_id {
                    if parent_id == id {
                        return Err(AppError::DepartmentNotSelfParent);
                    }
                    if !exists(txn, parent_id).await? {
                        return Err(AppError::ParentDepartmentNotFound);
                    }
                    if query::is_descendant(txn, id, parent_id).await? {
                        return Err(AppError::DepartmentCycle);
                    }
                }

                let target_parent = changes.parent_id.unwrap_or(current.parent_id);
                let target_name = changes.name.as_deref().unwrap_or(&current.name);
                if name_taken(txn, target_parent, target_name, Some(id)).await? {
                    return Err(AppError::DepartmentNameExists);
                }

                let mut active = department::ActiveModel {
                    id: Unchanged(id),
                    ..Default::default()
                };
                if let Some(name) = changes.name {
                    active.name = Set(name);
                }
                if let Some(parent_id) = changes.parent_id {
                    active.parent_id = Set(parent_id);
                }

                active.update(txn).await.map_err(department_write_error)
            })
        })
        .await?;

    tracing::info!(id = updated.id, parent_id = ?updated.parent_id, "Department updated");
    Ok(updated)
}

/// Delete a department and its whole subtree.
///
/// In `Reassign` mode only the employees owned directly by `id` are moved to
/// `reassign_to`; employees of deeper departments go with the cascade.
pub async fn delete(
    db: &DatabaseConnection,
    id: i64,
    mode: DeleteMode,
    reassign_to: Option<i64>,
) -> AppResult<()> {
    db.transaction::<_, (), AppError>(move |txn| {
        Box::pin(async move {
            if !exists(txn, id).await? {
                return Err(AppError::DepartmentNotFound);
            }

            if mode == DeleteMode::Reassign {
                let target = reassign_to.ok_or(AppError::ReassignTargetRequired)?;
                if target == id {
                    return Err(AppError::ReassignToSelf);
                }
                if !exists(txn, target).await? {
                    return Err(AppError::TargetDepartmentNotFound);
                }

                let moved = employee::Entity::update_many()
                    .col_expr(employee::Column::DepartmentId, Expr::value(target))
                    .filter(employee::Column::DepartmentId.eq(id))
                    .exec(txn)
                    .await?;
                tracing::debug!(from = id, to = target, moved = moved.rows_affected, "Employees reassigned");
            }

            let deleted = department::Entity::delete_by_id(id).exec(txn).await?;
            if deleted.rows_affected == 0 {
                return Err(AppError::DepartmentNotFound);
            }
            Ok(())
        })
    })
    .await?;

    tracing::info!(id, mode = ?mode, reassign_to = ?reassign_to, "Department deleted");
    Ok(())
}
