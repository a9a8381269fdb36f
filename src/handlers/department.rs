//! Department handlers
//!
//! Boundary validation and JSON shapes; tree rules live in `crate::hierarchy`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_extra::extract::WithRejection;
use sea_orm::{EntityTrait, QueryOrder};
use serde::{Deserialize, Deserializer};

use crate::entity::department::{self, DepartmentTree, NAME_MAX_LEN};
use crate::error::{AppError, AppResult};
use crate::hierarchy::{self, DeleteMode, DepartmentChanges, NewDepartment};
use crate::state::AppState;

use super::required_text;

/// Create department request
#[derive(Debug, Deserialize)]
pub struct CreateDepartmentRequest {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

/// Update department request; absent keys are left unchanged
#[derive(Debug, Default, Deserialize)]
pub struct UpdateDepartmentRequest {
    #[serde(default)]
    pub name: Option<String>,
    /// `Some(None)` when the body carries `"parent_id": null`
    #[serde(default, deserialize_with = "present")]
    pub parent_id: Option<Option<i64>>,
}

/// Marks a key as present even when its value is null
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl CreateDepartmentRequest {
    fn into_new(self) -> AppResult<NewDepartment> {
        Ok(NewDepartment {
            name: required_text("name", &self.name, NAME_MAX_LEN)?,
            parent_id: self.parent_id,
        })
    }
}

impl UpdateDepartmentRequest {
    fn into_changes(self) -> AppResult<DepartmentChanges> {
        let name = match self.name {
            Some(name) => Some(required_text("name", &name, NAME_MAX_LEN)?),
            None => None,
        };
        Ok(DepartmentChanges {
            name,
            parent_id: self.parent_id,
        })
    }
}

/// Query parameters for subtree reads
#[derive(Debug, Deserialize)]
pub struct TreeQuery {
    #[serde(default = "default_depth")]
    pub depth: i32,
    #[serde(default = "default_include_employees")]
    pub include_employees: bool,
}

fn default_depth() -> i32 {
    1
}

fn default_include_employees() -> bool {
    true
}

/// Query parameters for delete
#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub mode: DeleteMode,
    pub reassign_to_department_id: Option<i64>,
}

/// GET /api/v1/departments/
pub async fn list_departments(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<department::Model>>> {
    let departments = department::Entity::find()
        .order_by_asc(department::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(departments))
}

/// GET /api/v1/departments/:id
pub async fn get_department(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
    WithRejection(Query(query), _): WithRejection<Query<TreeQuery>, AppError>,
) -> AppResult<Json<DepartmentTree>> {
    let tree = hierarchy::department_tree(&state.db, id, query.depth, query.include_employees).await?;
    Ok(Json(tree))
}

/// POST /api/v1/departments/
pub async fn create_department(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<CreateDepartmentRequest>, AppError>,
) -> AppResult<Json<department::Model>> {
    let created = hierarchy::mutation::create(&state.db, req.into_new()?).await?;
    Ok(Json(created))
}

/// PATCH /api/v1/departments/:id
pub async fn update_department(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateDepartmentRequest>, AppError>,
) -> AppResult<Json<department::Model>> {
    let updated = hierarchy::mutation::update(&state.db, id, req.into_changes()?).await?;
    Ok(Json(updated))
}

/// DELETE /api/v1/departments/:id
pub async fn delete_department(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
    WithRejection(Query(query), _): WithRejection<Query<DeleteQuery>, AppError>,
) -> AppResult<StatusCode> {
    hierarchy::mutation::delete(&state.db, id, query.mode, query.reassign_to_department_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
