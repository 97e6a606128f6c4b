use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use crate::{
    web::AuthUser,
    works::{Decision, NOTIFICATION_COMMENT, NewNotification, Work, WorkStatus, insert_notification},
};

#[derive(Debug, PartialEq, Eq)]
pub enum ReviewError {
    UnknownDecision,
    CommentRequired,
    CommentEmpty,
    Closed(WorkStatus),
    Stale,
    Database,
}

impl ReviewError {
    /// Flash code used in the redirect back to the review page.
    pub fn code(&self) -> &'static str {
        match self {
            ReviewError::UnknownDecision => "invalid_decision",
            ReviewError::CommentRequired => "comment_required",
            ReviewError::CommentEmpty => "comment_empty",
            ReviewError::Closed(_) | ReviewError::Stale => "review_closed",
            ReviewError::Database => "review_failed",
        }
    }
}

impl std::fmt::Display for ReviewError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewError::UnknownDecision => write!(f, "unknown decision"),
            ReviewError::CommentRequired => write!(f, "decision requires a comment"),
            ReviewError::CommentEmpty => write!(f, "comment is empty"),
            ReviewError::Closed(status) => {
                write!(f, "work is {} and no longer accepts decisions", status.as_str())
            }
            ReviewError::Stale => write!(f, "work status changed concurrently"),
            ReviewError::Database => write!(f, "database error"),
        }
    }
}

impl std::error::Error for ReviewError {}

/// A coordinator decision checked against the work's current state, ready to persist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReviewPlan {
    pub work_id: Uuid,
    pub decision: Decision,
    pub new_status: WorkStatus,
    pub coordinator_id: Uuid,
    pub coordinator_name: String,
    pub comment: Option<String>,
    pub notification: NewNotification,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommentPlan {
    pub work_id: Uuid,
    pub coordinator_id: Uuid,
    pub coordinator_name: String,
    pub body: String,
    pub notification: NewNotification,
}

fn clean_comment(comment: Option<&str>) -> Option<String> {
    comment
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

pub fn plan_review(
    work: &Work,
    decision: Decision,
    comment: Option<&str>,
    coordinator: &AuthUser,
) -> Result<ReviewPlan, ReviewError> {
    let new_status = work
        .status
        .after(decision)
        .ok_or(ReviewError::Closed(work.status))?;

    let comment = clean_comment(comment);
    if decision.requires_comment() && comment.is_none() {
        return Err(ReviewError::CommentRequired);
    }

    Ok(ReviewPlan {
        work_id: work.id,
        decision,
        new_status,
        coordinator_id: coordinator.id,
        coordinator_name: coordinator.display_name.clone(),
        notification: NewNotification {
            work_id: work.id,
            kind: decision.as_str(),
            message: decision.notification_message(&work.title, comment.as_deref()),
        },
        comment,
    })
}

pub fn plan_comment(
    work: &Work,
    body: Option<&str>,
    coordinator: &AuthUser,
) -> Result<CommentPlan, ReviewError> {
    let body = clean_comment(body).ok_or(ReviewError::CommentEmpty)?;

    Ok(CommentPlan {
        work_id: work.id,
        coordinator_id: coordinator.id,
        coordinator_name: coordinator.display_name.clone(),
        body,
        notification: NewNotification {
            work_id: work.id,
            kind: NOTIFICATION_COMMENT,
            message: format!("Novo comentário adicionado ao seu TFC \"{}\"", work.title),
        },
    })
}

/// Status update, validation and notification in one transaction.
///
/// The update only matches a work that is still Submitted, so two coordinators racing on
/// the same work produce a single validation.
pub async fn persist_review(pool: &PgPool, plan: &ReviewPlan) -> Result<(), ReviewError> {
    write_review(pool, plan).await.map_err(|err| match err {
        WriteError::Stale => ReviewError::Stale,
        WriteError::Sql(err) => {
            error!(?err, work = %plan.work_id, "failed to persist review");
            ReviewError::Database
        }
    })
}

enum WriteError {
    Stale,
    Sql(sqlx::Error),
}

impl From<sqlx::Error> for WriteError {
    fn from(err: sqlx::Error) -> Self {
        WriteError::Sql(err)
    }
}

async fn write_review(pool: &PgPool, plan: &ReviewPlan) -> Result<(), WriteError> {
    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        "UPDATE tfcs SET status = $2, updated_at = NOW() WHERE id = $1 AND status = $3",
    )
    .bind(plan.work_id)
    .bind(plan.new_status.as_str())
    .bind(WorkStatus::Submitted.as_str())
    .execute(&mut *tx)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(WriteError::Stale);
    }

    sqlx::query(
        "INSERT INTO validations (id, tfc_id, coordinator_id, coordinator_name, decision, comment)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(Uuid::new_v4())
    .bind(plan.work_id)
    .bind(plan.coordinator_id)
    .bind(&plan.coordinator_name)
    .bind(plan.decision.as_str())
    .bind(plan.comment.as_deref())
    .execute(&mut *tx)
    .await?;

    insert_notification(&mut *tx, &plan.notification).await?;

    tx.commit().await?;
    Ok(())
}

pub async fn persist_comment(pool: &PgPool, plan: &CommentPlan) -> Result<(), ReviewError> {
    let result: sqlx::Result<()> = async {
        let mut tx = pool.begin().await?;
        sqlx::query(
            "INSERT INTO comments (id, tfc_id, coordinator_id, coordinator_name, body)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::new_v4())
        .bind(plan.work_id)
        .bind(plan.coordinator_id)
        .bind(&plan.coordinator_name)
        .bind(&plan.body)
        .execute(&mut *tx)
        .await?;
        insert_notification(&mut *tx, &plan.notification).await?;
        tx.commit().await
    }
    .await;

    result.map_err(|err| {
        error!(?err, work = %plan.work_id, "failed to persist comment");
        ReviewError::Database
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::works::{
        fetch_work,
        fixtures::{count, seed_user, seed_work, work},
    };

    fn coordinator() -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: "coord@uni.pt".into(),
            display_name: "Prof. Marta Costa".into(),
            access_level: "admin".into(),
        }
    }

    #[test]
    fn approve_without_comment_targets_approved() {
        let tfc = work("Redes Mesh", WorkStatus::Submitted, None, 2025);
        let coord = coordinator();
        let plan = plan_review(&tfc, Decision::Approve, Some("   "), &coord).unwrap();

        assert_eq!(plan.new_status, WorkStatus::Approved);
        assert_eq!(plan.decision, Decision::Approve);
        assert_eq!(plan.comment, None);
        assert_eq!(plan.coordinator_id, coord.id);
        assert_eq!(plan.coordinator_name, "Prof. Marta Costa");
        assert_eq!(plan.notification.kind, "approve");
        assert_eq!(
            plan.notification.message,
            "O seu TFC \"Redes Mesh\" foi aprovado!"
        );
    }

    #[test]
    fn reject_and_justification_need_a_comment() {
        let tfc = work("Redes Mesh", WorkStatus::Submitted, None, 2025);
        let coord = coordinator();
        for decision in [Decision::Reject, Decision::RequestJustification] {
            assert_eq!(
                plan_review(&tfc, decision, None, &coord),
                Err(ReviewError::CommentRequired)
            );
            assert_eq!(
                plan_review(&tfc, decision, Some(" \n "), &coord),
                Err(ReviewError::CommentRequired)
            );
        }
    }

    #[test]
    fn notification_messages_carry_the_comment() {
        let tfc = work("Redes Mesh", WorkStatus::Submitted, None, 2025);
        let coord = coordinator();

        let rejected = plan_review(&tfc, Decision::Reject, Some(" Plágio "), &coord).unwrap();
        assert_eq!(rejected.new_status, WorkStatus::Rejected);
        assert_eq!(rejected.comment.as_deref(), Some("Plágio"));
        assert_eq!(
            rejected.notification.message,
            "O seu TFC \"Redes Mesh\" foi rejeitado. Motivo: Plágio"
        );

        let justify =
            plan_review(&tfc, Decision::RequestJustification, Some("Falta metodologia"), &coord)
                .unwrap();
        assert_eq!(justify.new_status, WorkStatus::UnderReview);
        assert_eq!(justify.notification.kind, "request_justification");
        assert_eq!(
            justify.notification.message,
            "Solicitada justificação adicional para o TFC \"Redes Mesh\". Falta metodologia"
        );
    }

    #[test]
    fn only_submitted_works_accept_decisions() {
        let coord = coordinator();
        for status in [WorkStatus::UnderReview, WorkStatus::Approved, WorkStatus::Rejected] {
            let tfc = work("T", status, None, 2025);
            for decision in Decision::ALL {
                let err = plan_review(&tfc, decision, Some("motivo"), &coord).unwrap_err();
                assert_eq!(err, ReviewError::Closed(status));
                assert_eq!(err.code(), "review_closed");
            }
        }
    }

    #[test]
    fn comments_are_allowed_at_any_status_but_not_empty() {
        let coord = coordinator();
        for status in WorkStatus::ALL {
            let tfc = work("Compiladores", status, None, 2024);
            let plan = plan_comment(&tfc, Some(" Bom trabalho "), &coord).unwrap();
            assert_eq!(plan.body, "Bom trabalho");
            assert_eq!(plan.notification.kind, NOTIFICATION_COMMENT);
            assert_eq!(
                plan.notification.message,
                "Novo comentário adicionado ao seu TFC \"Compiladores\""
            );
        }

        let tfc = work("Compiladores", WorkStatus::Approved, None, 2024);
        assert_eq!(
            plan_comment(&tfc, Some("   "), &coord),
            Err(ReviewError::CommentEmpty)
        );
        assert_eq!(plan_comment(&tfc, None, &coord), Err(ReviewError::CommentEmpty));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn approval_is_recorded_once_and_later_decisions_are_stale(pool: PgPool) {
        let student = seed_user(&pool, "Nkanga Pedro", "student").await;
        let mut coord = coordinator();
        coord.id = seed_user(&pool, &coord.display_name, "admin").await;
        let work_id = seed_work(&pool, student, "Redes Mesh").await;
        let snapshot = fetch_work(&pool, work_id).await.unwrap().unwrap();

        let approve = plan_review(&snapshot, Decision::Approve, None, &coord).unwrap();
        persist_review(&pool, &approve).await.unwrap();

        let reject =
            plan_review(&snapshot, Decision::Reject, Some("Fora do âmbito."), &coord).unwrap();
        assert_eq!(persist_review(&pool, &reject).await, Err(ReviewError::Stale));

        let stored = fetch_work(&pool, work_id).await.unwrap().unwrap();
        assert_eq!(stored.status, WorkStatus::Approved);
        assert_eq!(
            count(
                &pool,
                "SELECT COUNT(*) FROM validations WHERE tfc_id = $1 AND decision = 'approve'",
                work_id
            )
            .await,
            1
        );
        assert_eq!(
            count(
                &pool,
                "SELECT COUNT(*) FROM validations WHERE tfc_id = $1",
                work_id
            )
            .await,
            1
        );
        assert_eq!(
            count(
                &pool,
                "SELECT COUNT(*) FROM notifications WHERE tfc_id = $1",
                work_id
            )
            .await,
            1
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn comment_is_stored_with_its_notification(pool: PgPool) {
        let student = seed_user(&pool, "Nkanga Pedro", "student").await;
        let mut coord = coordinator();
        coord.id = seed_user(&pool, &coord.display_name, "admin").await;
        let work_id = seed_work(&pool, student, "Redes Mesh").await;
        let tfc = fetch_work(&pool, work_id).await.unwrap().unwrap();

        let plan = plan_comment(&tfc, Some("Rever a metodologia."), &coord).unwrap();
        persist_comment(&pool, &plan).await.unwrap();

        assert_eq!(
            count(
                &pool,
                "SELECT COUNT(*) FROM comments WHERE tfc_id = $1",
                work_id
            )
            .await,
            1
        );
        assert_eq!(
            count(
                &pool,
                "SELECT COUNT(*) FROM notifications WHERE tfc_id = $1 AND kind = 'comment'",
                work_id
            )
            .await,
            1
        );
        let stored = fetch_work(&pool, work_id).await.unwrap().unwrap();
        assert_eq!(stored.status, WorkStatus::Submitted);
    }
}
