//! Plan handlers
//!
//! Subscription plans catalog: list, get, create, delete.

use axum::{
    extract::{Path, State},
    response::Json,
};
use axum_extra::extract::WithRejection;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, ModelTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};

use crate::entity::plan::{self, TITLE_MAX_LEN};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

use super::required_text;

/// Price precision: NUMERIC(10, 2)
const PRICE_MAX_DIGITS: u32 = 10;
const PRICE_MAX_SCALE: u32 = 2;

/// Create plan request
#[derive(Debug, Deserialize)]
pub struct CreatePlanRequest {
    pub title: String,
    pub duration_days: i32,
    pub price: Decimal,
}

impl CreatePlanRequest {
    fn validate(&self) -> AppResult<String> {
        let title = required_text("title", &self.title, TITLE_MAX_LEN)?;
        if self.duration_days <= 0 {
            return Err(AppError::Validation("duration_days must be positive".to_string()));
        }
        if self.price <= Decimal::ZERO {
            return Err(AppError::Validation("price must be positive".to_string()));
        }
        let price = self.price.normalize();
        if price.scale() > PRICE_MAX_SCALE {
            return Err(AppError::Validation(format!(
                "price allows at most {} decimal places",
                PRICE_MAX_SCALE
            )));
        }
        let whole_digits = price.trunc().to_string().trim_start_matches('0').len() as u32;
        if whole_digits + PRICE_MAX_SCALE > PRICE_MAX_DIGITS {
            return Err(AppError::Validation(format!(
                "price allows at most {} digits",
                PRICE_MAX_DIGITS
            )));
        }
        Ok(title)
    }
}

#[derive(Debug, Serialize)]
pub struct PlanCreated {
    pub status: &'static str,
    pub new_plan: plan::Model,
}

#[derive(Debug, Serialize)]
pub struct PlanDeleted {
    pub status: &'static str,
    pub deleted_plan: plan::Model,
}

/// GET /api/v1/plans/
pub async fn list_plans(State(state): State<AppState>) -> AppResult<Json<Vec<plan::Model>>> {
    let plans = plan::Entity::find()
        .order_by_asc(plan::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(plans))
}

/// GET /api/v1/plans/:id
pub async fn get_plan(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> AppResult<Json<plan::Model>> {
    let plan = plan::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or(AppError::PlanNotFound)?;
    Ok(Json(plan))
}

/// POST /api/v1/plans/
pub async fn create_plan(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<CreatePlanRequest>, AppError>,
) -> AppResult<Json<PlanCreated>> {
    let title = req.validate()?;

    let new_plan = plan::ActiveModel {
        title: Set(title),
        duration_days: Set(req.duration_days),
        price: Set(req.price),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    tracing::info!(id = new_plan.id, "Plan created");
    Ok(Json(PlanCreated {
        status: "OK",
        new_plan,
    }))
}

/// DELETE /api/v1/plans/:id
pub async fn delete_plan(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> AppResult<Json<PlanDeleted>> {
    let plan = plan::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or(AppError::PlanNotFound)?;
    plan.clone().delete(&state.db).await?;

    tracing::info!(id, "Plan deleted");
    Ok(Json(PlanDeleted {
        status: "OK",
        deleted_plan: plan,
    }))
}
