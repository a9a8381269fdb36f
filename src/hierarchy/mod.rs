//! Department hierarchy engine
//!
//! - `query`: recursive ancestry/descendant traversal
//! - `assembly`: flat rows to a nested tree
//! - `mutation`: create / update / delete with tree invariants

pub mod assembly;
pub mod mutation;
pub mod query;

use sea_orm::ConnectionTrait;

use crate::entity::department::DepartmentTree;
use crate::error::{AppError, AppResult};

pub use mutation::{DeleteMode, DepartmentChanges, NewDepartment};
pub use query::{MAX_DEPTH, MIN_DEPTH};

pub fn validate_depth(depth: i32) -> AppResult<()> {
    if !(MIN_DEPTH..=MAX_DEPTH).contains(&depth) {
        return Err(AppError::Validation(format!(
            "depth must be between {} and {}",
            MIN_DEPTH, MAX_DEPTH
        )));
    }
    Ok(())
}

/// Materialize the subtree under `id`, `depth` levels deep.
pub async fn department_tree<C>(
    db: &C,
    id: i64,
    depth: i32,
    include_employees: bool,
) -> AppResult<DepartmentTree>
where
    C: ConnectionTrait,
{
    validate_depth(depth)?;

    let rows = query::get_subtree(db, id, depth).await?;
    if rows.is_empty() {
        return Err(AppError::DepartmentNotFound);
    }

    let employees = if include_employees {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let staff = query::get_employees_by_departments(db, &ids).await?;
        Some(assembly::group_by_department(staff))
    } else {
        None
    };

    assembly::build_tree(rows, employees).ok_or(AppError::DepartmentNotFound)
}
