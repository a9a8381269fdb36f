//! Recursive traversals over the department tree
//!
//! Both traversals run as a single `WITH RECURSIVE` statement, so a subtree
//! of any width costs one round trip plus one round trip for the rows.

use std::collections::HashMap;

use sea_orm::{
    ColumnTrait, ConnectionTrait, DbBackend, DbErr, EntityTrait, FromQueryResult, QueryFilter,
    QueryOrder, Statement,
};
use sea_orm::prelude::DateTimeWithTimeZone;

use crate::entity::{department, employee};

/// Smallest and largest subtree depth a caller may request
pub const MIN_DEPTH: i32 = 1;
pub const MAX_DEPTH: i32 = 5;

/// A department row tagged with its distance from the queried root
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubtreeNode {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub created_at: DateTimeWithTimeZone,
    /// Edges traversed from the root; the root itself is 0
    pub depth: i32,
}

impl SubtreeNode {
    pub fn new(model: department::Model, depth: i32) -> Self {
        Self {
            id: model.id,
            name: model.name,
            parent_id: model.parent_id,
            created_at: model.created_at,
            depth,
        }
    }
}

#[derive(Debug, FromQueryResult)]
struct SubtreeRow {
    id: i64,
    depth: i32,
}

#[derive(Debug, FromQueryResult)]
struct HitCount {
    hits: i64,
}

/// Positional bind marker for the backend
fn param(backend: DbBackend, index: usize) -> String {
    match backend {
        DbBackend::Postgres => format!("${}", index),
        _ => "?".to_string(),
    }
}

/// All departments within `max_depth` edges below `root_id`, root included.
///
/// Rows come back ordered by depth, then id. An unknown root yields an empty
/// list; callers treat that as not-found.
pub async fn get_subtree<C>(db: &C, root_id: i64, max_depth: i32) -> Result<Vec<SubtreeNode>, DbErr>
where
    C: ConnectionTrait,
{
    let backend = db.get_database_backend();
    let sql = format!(
        r#"WITH RECURSIVE subtree(id, depth) AS (
    SELECT id, 0 FROM departments WHERE id = {root}
    UNION ALL
    SELECT d.id, s.depth + 1
    FROM departments d
    JOIN subtree s ON d.parent_id = s.id
    WHERE s.depth < {max_depth}
)
SELECT id, depth FROM subtree ORDER BY depth, id"#,
        root = param(backend, 1),
        max_depth = param(backend, 2),
    );

    let rows = SubtreeRow::find_by_statement(Statement::from_sql_and_values(
        backend,
        sql,
        [root_id.into(), max_depth.into()],
    ))
    .all(db)
    .await?;

    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut models: HashMap<i64, department::Model> = department::Entity::find()
        .filter(department::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|m| (m.id, m))
        .collect();

    // a row deleted between the two reads is simply skipped
    Ok(rows
        .into_iter()
        .filter_map(|row| models.remove(&row.id).map(|m| SubtreeNode::new(m, row.depth)))
        .collect())
}

/// True when `candidate_id` is `node_id` itself or lies anywhere below it.
pub async fn is_descendant<C>(db: &C, node_id: i64, candidate_id: i64) -> Result<bool, DbErr>
where
    C: ConnectionTrait,
{
    let backend = db.get_database_backend();
    // UNION (not UNION ALL) stops at already-visited ids
    let sql = format!(
        r#"WITH RECURSIVE subtree(id) AS (
    SELECT id FROM departments WHERE id = {node}
    UNION
    SELECT d.id
    FROM departments d
    JOIN subtree s ON d.parent_id = s.id
)
SELECT COUNT(*) AS hits FROM subtree WHERE id = {candidate}"#,
        node = param(backend, 1),
        candidate = param(backend, 2),
    );

    let found = HitCount::find_by_statement(Statement::from_sql_and_values(
        backend,
        sql,
        [node_id.into(), candidate_id.into()],
    ))
    .one(db)
    .await?;

    Ok(found.map(|c| c.hits > 0).unwrap_or(false))
}

/// Employees of the given departments in one query, oldest first
pub async fn get_employees_by_departments<C>(
    db: &C,
    department_ids: &[i64],
) -> Result<Vec<employee::Model>, DbErr>
where
    C: ConnectionTrait,
{
    if department_ids.is_empty() {
        return Ok(Vec::new());
    }

    employee::Entity::find()
        .filter(employee::Column::DepartmentId.is_in(department_ids.iter().copied()))
        .order_by_asc(employee::Column::CreatedAt)
        .order_by_asc(employee::Column::Id)
        .all(db)
        .await
}
