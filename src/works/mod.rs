pub mod keywords;
pub mod stats;
pub mod status;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

pub use status::{Decision, WorkStatus, WorkType};

const WORK_SELECT: &str = r#"SELECT t.id, t.title, t.author, t.work_type, t.status, t.year, t.abstract,
       t.file_url, t.file_name, t.object_key, t.research_area_id, a.name AS research_area_name,
       t.advisor, t.justification, t.student_id, t.created_at, t.updated_at,
       COALESCE(ARRAY_AGG(k.text ORDER BY k.text) FILTER (WHERE k.id IS NOT NULL), ARRAY[]::TEXT[]) AS keywords
FROM tfcs t
LEFT JOIN research_areas a ON a.id = t.research_area_id
LEFT JOIN tfc_keywords tk ON tk.tfc_id = t.id
LEFT JOIN keywords k ON k.id = tk.keyword_id"#;

const WORK_GROUP_ORDER: &str = "GROUP BY t.id, a.name ORDER BY t.created_at DESC";

#[derive(Clone, Debug, Serialize)]
pub struct ResearchAreaRef {
    pub id: Uuid,
    pub name: String,
}

/// A work joined with its research area and keywords.
#[derive(Clone, Debug, Serialize)]
pub struct Work {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub work_type: WorkType,
    pub status: WorkStatus,
    pub year: i32,
    pub summary: Option<String>,
    pub file_url: String,
    pub file_name: String,
    #[serde(skip)]
    pub object_key: String,
    pub research_area: Option<ResearchAreaRef>,
    pub advisor: Option<String>,
    pub justification: Option<String>,
    pub student_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub keywords: Vec<String>,
}

impl Work {
    pub fn area_name(&self) -> Option<&str> {
        self.research_area.as_ref().map(|area| area.name.as_str())
    }
}

#[derive(FromRow)]
struct WorkRow {
    id: Uuid,
    title: String,
    author: String,
    work_type: String,
    status: String,
    year: i32,
    #[sqlx(rename = "abstract")]
    summary: Option<String>,
    file_url: String,
    file_name: String,
    object_key: String,
    research_area_id: Option<Uuid>,
    research_area_name: Option<String>,
    advisor: Option<String>,
    justification: Option<String>,
    student_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    keywords: Vec<String>,
}

impl TryFrom<WorkRow> for Work {
    type Error = anyhow::Error;

    fn try_from(row: WorkRow) -> Result<Self> {
        let status = WorkStatus::parse(&row.status)
            .ok_or_else(|| anyhow!("work {} has unknown status `{}`", row.id, row.status))?;
        let work_type = WorkType::parse(&row.work_type)
            .ok_or_else(|| anyhow!("work {} has unknown type `{}`", row.id, row.work_type))?;
        let research_area = match (row.research_area_id, row.research_area_name) {
            (Some(id), Some(name)) => Some(ResearchAreaRef { id, name }),
            _ => None,
        };

        Ok(Work {
            id: row.id,
            title: row.title,
            author: row.author,
            work_type,
            status,
            year: row.year,
            summary: row.summary,
            file_url: row.file_url,
            file_name: row.file_name,
            object_key: row.object_key,
            research_area,
            advisor: row.advisor,
            justification: row.justification,
            student_id: row.student_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            keywords: row.keywords,
        })
    }
}

fn into_works(rows: Vec<WorkRow>) -> Result<Vec<Work>> {
    rows.into_iter().map(Work::try_from).collect()
}

pub async fn fetch_all_works(pool: &PgPool) -> Result<Vec<Work>> {
    let rows = sqlx::query_as::<_, WorkRow>(&format!("{WORK_SELECT} {WORK_GROUP_ORDER}"))
        .fetch_all(pool)
        .await
        .context("failed to load works")?;
    into_works(rows)
}

pub async fn fetch_student_works(pool: &PgPool, student_id: Uuid) -> Result<Vec<Work>> {
    let rows = sqlx::query_as::<_, WorkRow>(&format!(
        "{WORK_SELECT} WHERE t.student_id = $1 {WORK_GROUP_ORDER}"
    ))
    .bind(student_id)
    .fetch_all(pool)
    .await
    .context("failed to load student works")?;
    into_works(rows)
}

pub async fn fetch_work(pool: &PgPool, work_id: Uuid) -> Result<Option<Work>> {
    let row = sqlx::query_as::<_, WorkRow>(&format!(
        "{WORK_SELECT} WHERE t.id = $1 {WORK_GROUP_ORDER}"
    ))
    .bind(work_id)
    .fetch_optional(pool)
    .await
    .context("failed to load work")?;
    row.map(Work::try_from).transpose()
}

pub async fn fetch_student_work(
    pool: &PgPool,
    work_id: Uuid,
    student_id: Uuid,
) -> Result<Option<Work>> {
    let row = sqlx::query_as::<_, WorkRow>(&format!(
        "{WORK_SELECT} WHERE t.id = $1 AND t.student_id = $2 {WORK_GROUP_ORDER}"
    ))
    .bind(work_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await
    .context("failed to load student work")?;
    row.map(Work::try_from).transpose()
}

#[derive(Clone, Debug, Serialize)]
pub struct ValidationRecord {
    pub id: Uuid,
    pub coordinator_name: String,
    pub decision: Decision,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct ValidationRow {
    id: Uuid,
    coordinator_name: String,
    decision: String,
    comment: Option<String>,
    created_at: DateTime<Utc>,
}

/// Decision history for a work, newest first.
pub async fn fetch_validations(pool: &PgPool, work_id: Uuid) -> Result<Vec<ValidationRecord>> {
    let rows = sqlx::query_as::<_, ValidationRow>(
        "SELECT id, coordinator_name, decision, comment, created_at FROM validations WHERE tfc_id = $1 ORDER BY created_at DESC",
    )
    .bind(work_id)
    .fetch_all(pool)
    .await
    .context("failed to load validations")?;

    rows.into_iter()
        .map(|row| {
            let decision = Decision::parse(&row.decision)
                .ok_or_else(|| anyhow!("validation {} has unknown decision", row.id))?;
            Ok(ValidationRecord {
                id: row.id,
                coordinator_name: row.coordinator_name,
                decision,
                comment: row.comment,
                created_at: row.created_at,
            })
        })
        .collect()
}

#[derive(Clone, Debug, FromRow, Serialize)]
pub struct CommentRecord {
    pub id: Uuid,
    pub coordinator_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Comment thread for a work, oldest first.
pub async fn fetch_comments(pool: &PgPool, work_id: Uuid) -> Result<Vec<CommentRecord>> {
    sqlx::query_as::<_, CommentRecord>(
        "SELECT id, coordinator_name, body, created_at FROM comments WHERE tfc_id = $1 ORDER BY created_at ASC",
    )
    .bind(work_id)
    .fetch_all(pool)
    .await
    .context("failed to load comments")
}

pub const NOTIFICATION_COMMENT: &str = "comment";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewNotification {
    pub work_id: Uuid,
    pub kind: &'static str,
    pub message: String,
}

pub async fn insert_notification(
    conn: &mut PgConnection,
    notification: &NewNotification,
) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO notifications (id, tfc_id, kind, message, read) VALUES ($1, $2, $3, $4, FALSE)")
        .bind(Uuid::new_v4())
        .bind(notification.work_id)
        .bind(notification.kind)
        .bind(&notification.message)
        .execute(conn)
        .await
        .map(|_| ())
}
