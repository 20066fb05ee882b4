use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{kinds::label_for, logger::ActivityEvent};

/// Append-only activity row.
#[derive(Debug, Clone, FromRow)]
pub struct UserActivity {
    pub id: i64,
    pub user_id: Uuid,
    pub action_type: String,
    pub resource_type: Option<String>,
    pub details: Option<serde_json::Value>,
    pub created_at: OffsetDateTime,
}

/// Activity as returned to clients.
#[derive(Debug, Serialize)]
pub struct ActivityView {
    pub id: i64,
    pub action_type: String,
    pub label: String,
    pub resource_type: Option<String>,
    pub details: Option<serde_json::Value>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<UserActivity> for ActivityView {
    fn from(row: UserActivity) -> Self {
        Self {
            id: row.id,
            label: label_for(&row.action_type),
            action_type: row.action_type,
            resource_type: row.resource_type,
            details: row.details,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ActionCount {
    pub action: String,
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ActivityStats {
    pub days_back: i32,
    pub total_activities: i64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_activity_date: Option<OffsetDateTime>,
    pub by_action: Vec<ActionCount>,
}

impl ActivityStats {
    /// Folds per-action `(action_type, count, last_at)` rows.
    pub fn from_rows(days_back: i32, rows: Vec<(String, i64, OffsetDateTime)>) -> Self {
        let total_activities = rows.iter().map(|(_, count, _)| count).sum();
        let last_activity_date = rows.iter().map(|(_, _, last)| *last).max();
        let by_action = rows
            .into_iter()
            .map(|(action, count, _)| ActionCount {
                label: label_for(&action),
                action,
                count,
            })
            .collect();
        Self {
            days_back,
            total_activities,
            last_activity_date,
            by_action,
        }
    }
}

pub async fn insert(db: &PgPool, event: &ActivityEvent) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO user_activities (user_id, action_type, resource_type, details)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(event.user_id)
    .bind(event.kind.as_str())
    .bind(event.kind.resource_type())
    .bind(&event.details)
    .execute(db)
    .await?;
    Ok(())
}

/// Newest first.
pub async fn list_for_user(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<UserActivity>> {
    let rows = sqlx::query_as::<_, UserActivity>(
        r#"
        SELECT id, user_id, action_type, resource_type, details, created_at
        FROM user_activities
        WHERE user_id = $1
        ORDER BY created_at DESC, id DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn count_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<i64> {
    let (count,) = sqlx::query_as::<_, (i64,)>(
        r#"SELECT COUNT(*) FROM user_activities WHERE user_id = $1"#,
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;
    Ok(count)
}

pub async fn stats_for_user(db: &PgPool, user_id: Uuid, days_back: i32) -> anyhow::Result<ActivityStats> {
    let rows = sqlx::query_as::<_, (String, i64, OffsetDateTime)>(
        r#"
        SELECT action_type, COUNT(*) AS count, MAX(created_at) AS last_at
        FROM user_activities
        WHERE user_id = $1
          AND created_at >= now() - make_interval(days => $2)
        GROUP BY action_type
        ORDER BY count DESC, action_type ASC
        "#,
    )
    .bind(user_id)
    .bind(days_back)
    .fetch_all(db)
    .await?;
    Ok(ActivityStats::from_rows(days_back, rows))
}
