use sqlx::PgPool;

use super::models::{ResearchAreaRow, UserRow};

pub async fn fetch_research_areas(pool: &PgPool) -> sqlx::Result<Vec<ResearchAreaRow>> {
    sqlx::query_as::<_, ResearchAreaRow>(
        "SELECT a.id, a.name, COUNT(t.id) AS work_count
         FROM research_areas a
         LEFT JOIN tfcs t ON t.research_area_id = a.id
         GROUP BY a.id, a.name
         ORDER BY a.name",
    )
    .fetch_all(pool)
    .await
}

pub async fn fetch_users(pool: &PgPool) -> sqlx::Result<Vec<UserRow>> {
    sqlx::query_as::<_, UserRow>(
        "SELECT id, email, display_name, access_level, active, created_at FROM users ORDER BY created_at",
    )
    .fetch_all(pool)
    .await
}
