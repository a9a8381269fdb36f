//! Employee handlers
//!
//! Flat CRUD: employees are created under a department and listed as a whole.

use axum::{
    extract::{Path, State},
    response::Json,
};
use axum_extra::extract::WithRejection;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};
use serde::Deserialize;

use crate::entity::employee::{self, FIELD_MAX_LEN};
use crate::error::{employee_write_error, AppError, AppResult};
use crate::state::AppState;

use super::required_text;

/// Create employee request
#[derive(Debug, Deserialize)]
pub struct CreateEmployeeRequest {
    pub full_name: String,
    pub position: String,
    #[serde(default)]
    pub hired_at: Option<chrono::NaiveDate>,
}

/// GET /api/v1/employees/
pub async fn list_employees(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<employee::Model>>> {
    let employees = employee::Entity::find()
        .order_by_asc(employee::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(employees))
}

/// POST /api/v1/departments/:id/employees/
pub async fn create_employee(
    State(state): State<AppState>,
    WithRejection(Path(department_id), _): WithRejection<Path<i64>, AppError>,
    WithRejection(Json(req), _): WithRejection<Json<CreateEmployeeRequest>, AppError>,
) -> AppResult<Json<employee::Model>> {
    let full_name = required_text("full_name", &req.full_name, FIELD_MAX_LEN)?;
    let position = required_text("position", &req.position, FIELD_MAX_LEN)?;

    let new_employee = employee::ActiveModel {
        department_id: Set(department_id),
        full_name: Set(full_name),
        position: Set(position),
        hired_at: Set(req.hired_at),
        ..Default::default()
    };

    // a missing department surfaces as a foreign-key violation
    let created = new_employee
        .insert(&state.db)
        .await
        .map_err(employee_write_error)?;

    tracing::info!(id = created.id, department_id, "Employee created");
    Ok(Json(created))
}
