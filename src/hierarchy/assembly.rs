//! Flat depth-tagged rows to a nested department tree

use std::collections::HashMap;

use crate::entity::department::DepartmentTree;
use crate::entity::employee;

use super::query::SubtreeNode;

/// Group employees under the department that directly owns them.
///
/// Input order is kept within each group.
pub fn group_by_department(employees: Vec<employee::Model>) -> HashMap<i64, Vec<employee::Model>> {
    let mut grouped: HashMap<i64, Vec<employee::Model>> = HashMap::new();
    for emp in employees {
        grouped.entry(emp.department_id).or_default().push(emp);
    }
    grouped
}

/// Build the tree rooted at the `depth == 0` row.
///
/// First pass indexes every row by id and records child ids per parent in row
/// order; second pass links children under their parent. Every non-root row
/// must have its parent in the same set; rows that cannot be reached from the
/// root are dropped and logged. Returns `None` for empty input or when no root
/// row is present.
pub fn build_tree(
    rows: Vec<SubtreeNode>,
    mut employees: Option<HashMap<i64, Vec<employee::Model>>>,
) -> Option<DepartmentTree> {
    let mut nodes: HashMap<i64, DepartmentTree> = HashMap::with_capacity(rows.len());
    let mut children_of: HashMap<i64, Vec<i64>> = HashMap::new();
    let mut root_id = None;

    for row in rows {
        if row.depth == 0 {
            root_id = Some(row.id);
        } else if let Some(parent_id) = row.parent_id {
            children_of.entry(parent_id).or_default().push(row.id);
        }

        let own_employees = employees
            .as_mut()
            .and_then(|by_dept| by_dept.remove(&row.id))
            .unwrap_or_default();

        nodes.insert(
            row.id,
            DepartmentTree {
                id: row.id,
                name: row.name,
                parent_id: row.parent_id,
                created_at: row.created_at,
                employees: own_employees,
                children: Vec::new(),
            },
        );
    }

    let tree = link(root_id?, &mut nodes, &children_of);
    if !nodes.is_empty() {
        let mut orphans: Vec<i64> = nodes.keys().copied().collect();
        orphans.sort_unstable();
        tracing::debug!(?orphans, "Dropped subtree rows with no linked parent");
    }
    tree
}

fn link(
    id: i64,
    nodes: &mut HashMap<i64, DepartmentTree>,
    children_of: &HashMap<i64, Vec<i64>>,
) -> Option<DepartmentTree> {
    let mut node = nodes.remove(&id)?;
    if let Some(child_ids) = children_of.get(&id) {
        node.children = child_ids
            .iter()
            .filter_map(|child_id| link(*child_id, nodes, children_of))
            .collect();
    }
    Some(node)
}
