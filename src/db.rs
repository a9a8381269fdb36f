use sea_orm::{
    ConnectionTrait, ConnectOptions, Database, DatabaseConnection, DbBackend, DbErr, Schema,
    Statement,
};
use sea_orm::sea_query::{Expr, TableCreateStatement};
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::entity::{department, employee, plan};

/// Sibling names are unique per parent
pub const UQ_DEPARTMENT_NAME_PER_PARENT: &str = "uq_department_name_per_parent";
/// Root names are unique among roots (NULL parents never collide in a plain unique index)
pub const UQ_DEPARTMENT_ROOT_NAME: &str = "uq_department_root_name";

/// Initialize database connection and auto-migrate tables
pub async fn init_database(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let database_url = config.connection_url();

    if config.is_sqlite() {
        info!("Connecting to sqlite database: {}", config.name);
    } else {
        info!("Connecting to database: {}:{}/{}", config.host, config.port, config.name);
    }

    let mut opt = ConnectOptions::new(&database_url);
    opt.connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(true)
        .sqlx_logging_level(tracing::log::LevelFilter::Debug);

    if config.is_memory() {
        // every pooled connection would otherwise open its own empty database
        opt.max_connections(1).min_connections(1);
    } else {
        opt.max_connections(config.max_connections.max(1))
            .min_connections(1)
            .idle_timeout(Duration::from_secs(300));
    }
    if !config.is_sqlite() {
        opt.set_schema_search_path("public");
    }

    let db = Database::connect(opt).await?;
    info!("Database connection established");

    // Auto-migrate tables
    auto_migrate(&db).await?;

    Ok(db)
}

/// Create tables and indexes if they do not exist yet
async fn auto_migrate(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    info!("Running auto-migration for all entities...");

    // Departments first: employees reference them
    let mut departments = schema.create_table_from_entity(department::Entity);
    departments.check(
        Expr::col(department::Column::ParentId).ne(Expr::col(department::Column::Id)),
    );
    create_table_if_not_exists(db, backend, departments).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(employee::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(plan::Entity)).await?;

    execute_raw(
        db,
        backend,
        &format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {} ON departments (parent_id, name)",
            UQ_DEPARTMENT_NAME_PER_PARENT
        ),
    )
    .await?;
    execute_raw(
        db,
        backend,
        &format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {} ON departments (name) WHERE parent_id IS NULL",
            UQ_DEPARTMENT_ROOT_NAME
        ),
    )
    .await?;
    execute_raw(
        db,
        backend,
        "CREATE INDEX IF NOT EXISTS ix_employees_department_id ON employees (department_id)",
    )
    .await?;

    info!("Auto-migration completed successfully");
    Ok(())
}

async fn execute_raw(db: &DatabaseConnection, backend: DbBackend, sql: &str) -> Result<(), DbErr> {
    db.execute(Statement::from_string(backend, sql.to_string())).await?;
    Ok(())
}

/// Create a table if it doesn't exist
async fn create_table_if_not_exists(
    db: &DatabaseConnection,
    backend: DbBackend,
    mut stmt: TableCreateStatement,
) -> Result<(), DbErr> {
    // Add IF NOT EXISTS to avoid errors when table already exists
    stmt.if_not_exists();

    db.execute(backend.build(&stmt)).await?;

    Ok(())
}

/// Fresh in-memory database with the full schema, for tests
#[cfg(test)]
pub(crate) async fn memory_database() -> DatabaseConnection {
    init_database(&DatabaseConfig::sqlite_memory())
        .await
        .expect("in-memory database")
}
