use sqlx::migrate::MigrateError;
use sqlx::{Pool, Sqlite};

pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<(), MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
