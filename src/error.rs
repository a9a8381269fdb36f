use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{DbErr, SqlErr, TransactionError};
use serde::Serialize;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Request body must not be empty")]
    RequestBodyRequired,

    #[error("Department not found")]
    DepartmentNotFound,

    #[error("Parent department not found")]
    ParentDepartmentNotFound,

    #[error("Target department not found")]
    TargetDepartmentNotFound,

    #[error("Plan not found")]
    PlanNotFound,

    #[error("Department name must be unique within its parent")]
    DepartmentNameExists,

    #[error("Department cannot be its own parent")]
    DepartmentNotSelfParent,

    #[error("Department cannot be moved under its own descendant")]
    DepartmentCycle,

    #[error("Deleted department cannot be the reassign target")]
    ReassignToSelf,

    #[error("reassign_to_department_id is required in REASSIGN mode")]
    ReassignTargetRequired,

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::RequestBodyRequired
            | AppError::ReassignToSelf
            | AppError::ReassignTargetRequired => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::DepartmentNotFound
            | AppError::ParentDepartmentNotFound
            | AppError::TargetDepartmentNotFound
            | AppError::PlanNotFound => StatusCode::NOT_FOUND,
            AppError::DepartmentNameExists
            | AppError::DepartmentNotSelfParent
            | AppError::DepartmentCycle => StatusCode::CONFLICT,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    code: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, details) = match &self {
            AppError::Database(err) => {
                tracing::error!("Database error: {}", err);
                ("Database Error", None)
            }
            AppError::Validation(msg) => ("Validation Error", Some(msg.clone())),
            other => {
                let title = match status {
                    StatusCode::NOT_FOUND => "Not Found",
                    StatusCode::CONFLICT => "Conflict",
                    _ => "Unprocessable Entity",
                };
                (title, Some(other.to_string()))
            }
        };

        let body = ErrorResponse {
            code: status.as_u16(),
            message: message.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for application
pub type AppResult<T> = Result<T, AppError>;

impl From<TransactionError<AppError>> for AppError {
    fn from(err: TransactionError<AppError>) -> Self {
        match err {
            TransactionError::Connection(e) => AppError::Database(e),
            TransactionError::Transaction(e) => e,
        }
    }
}

// Extractor rejections answer with the same body as handler validation errors
impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Which store constraint rejected a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    Unique,
    ForeignKey,
    Check,
}

/// Classify a database error by the constraint that fired, if any
pub fn violation(err: &DbErr) -> Option<Violation> {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => return Some(Violation::Unique),
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => return Some(Violation::ForeignKey),
        _ => {}
    }
    // sqlite: "CHECK constraint failed", postgres: "violates check constraint"
    if err.to_string().to_lowercase().contains("check constraint") {
        return Some(Violation::Check);
    }
    None
}

/// Translate a failed department insert/update into its domain error
pub fn department_write_error(err: DbErr) -> AppError {
    if matches!(err, DbErr::RecordNotUpdated | DbErr::RecordNotFound(_)) {
        return AppError::DepartmentNotFound;
    }
    match violation(&err) {
        Some(kind) => {
            tracing::warn!(constraint = ?kind, "Department write rejected: {}", err);
            match kind {
                Violation::Unique => AppError::DepartmentNameExists,
                Violation::ForeignKey => AppError::ParentDepartmentNotFound,
                Violation::Check => AppError::DepartmentNotSelfParent,
            }
        }
        None => AppError::Database(err),
    }
}

/// Translate a failed employee insert into its domain error
pub fn employee_write_error(err: DbErr) -> AppError {
    match violation(&err) {
        Some(Violation::ForeignKey) => {
            tracing::warn!("Employee write rejected: {}", err);
            AppError::DepartmentNotFound
        }
        _ => AppError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response() {
        let err = AppError::DepartmentNotFound;
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::DepartmentCycle.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::DepartmentNameExists.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::DepartmentNotSelfParent.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::ReassignTargetRequired.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(AppError::ReassignToSelf.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(AppError::RequestBodyRequired.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(AppError::TargetDepartmentNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::PlanNotFound.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_transaction_error_unwraps() {
        let err: AppError = TransactionError::Transaction(AppError::DepartmentCycle).into();
        assert!(matches!(err, AppError::DepartmentCycle));
    }

    #[test]
    fn test_record_not_updated_is_not_found() {
        let err = department_write_error(DbErr::RecordNotUpdated);
        assert!(matches!(err, AppError::DepartmentNotFound));
    }

    #[test]
    fn test_check_violation_from_message() {
        let err = DbErr::Custom(
            "new row for relation \"departments\" violates check constraint \"departments_check\""
                .to_string(),
        );
        assert_eq!(violation(&err), Some(Violation::Check));
        assert!(matches!(department_write_error(err), AppError::DepartmentNotSelfParent));
    }

    #[test]
    fn test_unrelated_error_stays_database() {
        let err = department_write_error(DbErr::Custom("connection reset".to_string()));
        assert!(matches!(err, AppError::Database(_)));
    }
}
