use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Pool, Row, Sqlite, sqlite::SqliteRow};
use uuid::Uuid;

use crate::db::Database;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub welcome_message: Option<String>,
    pub responsible_user_id: String,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub organization_id: String,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub location: Option<String>,
    pub country: String,
    pub welcome_message: Option<String>,
    pub responsible_user_id: String,
}

/// Per-organization aggregate numbers shown on the dashboard. The three
/// counts come from independent queries; each is a consistent snapshot on its
/// own and no cross-query transaction is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationStats {
    pub total_projects: i64,
    pub total_participants: i64,
    pub total_activities: i64,
}

#[derive(Clone)]
pub struct ProjectStore {
    pool: Pool<Sqlite>,
}

impl ProjectStore {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }

    pub async fn create(&self, params: NewProject) -> Result<ProjectRecord> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO projects (id, organization_id, name, start_date, end_date, location, \
                                   country, welcome_message, responsible_user_id, archived, \
                                   created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(&id)
        .bind(&params.organization_id)
        .bind(&params.name)
        .bind(params.start_date.timestamp())
        .bind(params.end_date.timestamp())
        .bind(&params.location)
        .bind(&params.country)
        .bind(&params.welcome_message)
        .bind(&params.responsible_user_id)
        .bind(now.timestamp())
        .bind(now.timestamp())
        .execute(&self.pool)
        .await
        .context("failed to insert project")?;

        Ok(ProjectRecord {
            id,
            organization_id: params.organization_id,
            name: params.name,
            start_date: params.start_date,
            end_date: params.end_date,
            location: params.location,
            country: params.country,
            welcome_message: params.welcome_message,
            responsible_user_id: params.responsible_user_id,
            archived: false,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn list_for_organization(&self, organization_id: &str) -> Result<Vec<ProjectRecord>> {
        let rows = sqlx::query(
            "SELECT id, organization_id, name, start_date, end_date, location, country, \
                    welcome_message, responsible_user_id, archived, created_at, updated_at \
             FROM projects \
             WHERE organization_id = ? AND archived = 0 \
             ORDER BY created_at DESC, id ASC",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
        .context("failed to list projects")?;

        Ok(rows.iter().map(map_project_row).collect())
    }

    pub async fn organization_stats(&self, organization_id: &str) -> Result<OrganizationStats> {
        let total_projects: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM projects WHERE organization_id = ? AND archived = 0",
        )
        .bind(organization_id)
        .fetch_one(&self.pool)
        .await
        .context("failed to count projects")?;

        let total_participants: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT pp.user_id) \
             FROM project_participants pp \
             JOIN projects p ON p.id = pp.project_id \
             WHERE p.organization_id = ? AND p.archived = 0",
        )
        .bind(organization_id)
        .fetch_one(&self.pool)
        .await
        .context("failed to count participants")?;

        let total_activities: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) \
             FROM project_activities pa \
             JOIN projects p ON p.id = pa.project_id \
             WHERE p.organization_id = ? AND p.archived = 0",
        )
        .bind(organization_id)
        .fetch_one(&self.pool)
        .await
        .context("failed to count activities")?;

        Ok(OrganizationStats {
            total_projects,
            total_participants,
            total_activities,
        })
    }
}

fn map_project_row(row: &SqliteRow) -> ProjectRecord {
    ProjectRecord {
        id: row.get("id"),
        organization_id: row.get("organization_id"),
        name: row.get("name"),
        start_date: datetime_column(row, "start_date"),
        end_date: datetime_column(row, "end_date"),
        location: row.get("location"),
        country: row.get("country"),
        welcome_message: row.get("welcome_message"),
        responsible_user_id: row.get("responsible_user_id"),
        archived: row.get::<i64, _>("archived") != 0,
        created_at: datetime_column(row, "created_at"),
        updated_at: datetime_column(row, "updated_at"),
    }
}

fn datetime_column(row: &SqliteRow, column: &str) -> DateTime<Utc> {
    let seconds: i64 = row.get(column);
    DateTime::from_timestamp(seconds, 0).unwrap_or_default()
}
