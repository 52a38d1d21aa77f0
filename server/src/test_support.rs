#![allow(dead_code)]

use chrono::Utc;
use tempfile::TempDir;
use uuid::Uuid;

use roster_core::{AppConfig, Database};

use crate::{
    state::{AppState, build_state},
    utils::db::run_migrations,
};

pub(crate) async fn setup_state() -> (TempDir, Database, AppState) {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let mut config = AppConfig::default();
    let db_path = temp_dir.path().join("test.db");
    config.database_path = db_path.to_string_lossy().into_owned();

    let database = Database::connect(&config).await.expect("connect database");
    run_migrations(database.pool())
        .await
        .expect("apply migrations");

    let state = build_state(&database);

    (temp_dir, database, state)
}

pub(crate) async fn seed_user(database: &Database, email: &str, name: Option<&str>) -> String {
    let id = Uuid::new_v4().to_string();

    sqlx::query("INSERT INTO users (id, name, email, image, created_at) VALUES (?, ?, ?, NULL, ?)")
        .bind(&id)
        .bind(name)
        .bind(email)
        .bind(Utc::now().timestamp())
        .execute(database.pool())
        .await
        .expect("insert user");

    id
}

pub(crate) async fn seed_session(database: &Database, user_id: &str) -> String {
    seed_session_with_expiry(database, user_id, Utc::now().timestamp() + 3600).await
}

pub(crate) async fn seed_expired_session(database: &Database, user_id: &str) -> String {
    seed_session_with_expiry(database, user_id, Utc::now().timestamp() - 60).await
}

async fn seed_session_with_expiry(database: &Database, user_id: &str, expires_at: i64) -> String {
    let token = Uuid::new_v4().to_string();

    sqlx::query(
        "INSERT INTO sessions (id, user_id, token, created_at, expires_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(&token)
    .bind(Utc::now().timestamp())
    .bind(expires_at)
    .execute(database.pool())
    .await
    .expect("insert session");

    token
}

pub(crate) async fn seed_organization(database: &Database, name: &str, slug: &str) -> String {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        "INSERT INTO organizations (id, name, slug, logo, created_at) VALUES (?, ?, ?, NULL, ?)",
    )
    .bind(&id)
    .bind(name)
    .bind(slug)
    .bind(Utc::now().timestamp())
    .execute(database.pool())
    .await
    .expect("insert organization");

    id
}

/// `roles` is the raw tag set stored in the row, e.g. "member" or
/// "admin,member".
pub(crate) async fn seed_member(
    database: &Database,
    organization_id: &str,
    user_id: &str,
    roles: &str,
    created_at: i64,
) -> String {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        "INSERT INTO members (id, organization_id, user_id, role, created_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(organization_id)
    .bind(user_id)
    .bind(roles)
    .bind(created_at)
    .execute(database.pool())
    .await
    .expect("insert member");

    id
}

pub(crate) async fn seed_project(
    database: &Database,
    organization_id: &str,
    responsible_user_id: &str,
    archived: bool,
) -> String {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO projects (id, organization_id, name, start_date, end_date, location, \
                               country, welcome_message, responsible_user_id, archived, \
                               created_at, updated_at) \
         VALUES (?, ?, 'Test Project', ?, ?, NULL, 'NL', NULL, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(organization_id)
    .bind(now)
    .bind(now + 86_400)
    .bind(responsible_user_id)
    .bind(if archived { 1_i64 } else { 0_i64 })
    .bind(now)
    .bind(now)
    .execute(database.pool())
    .await
    .expect("insert project");

    id
}

pub(crate) async fn seed_participant(database: &Database, project_id: &str, user_id: &str) {
    sqlx::query(
        "INSERT INTO project_participants (id, project_id, user_id, created_at) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(project_id)
    .bind(user_id)
    .bind(Utc::now().timestamp())
    .execute(database.pool())
    .await
    .expect("insert participant");
}

pub(crate) async fn seed_activity(database: &Database, project_id: &str) {
    sqlx::query(
        "INSERT INTO project_activities (id, project_id, activity_type, distance_km, \
                                         description, activity_date, created_at) \
         VALUES (?, ?, 'train', 120.5, NULL, NULL, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(project_id)
    .bind(Utc::now().timestamp())
    .execute(database.pool())
    .await
    .expect("insert activity");
}
