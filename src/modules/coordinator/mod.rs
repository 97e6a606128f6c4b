pub mod export;
pub mod review;

use axum::{
    Form, Json, Router,
    extract::{Path as AxumPath, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    modules::work_views::{
        WORK_VIEW_STYLES, download_work_file, render_comment_thread, render_validation_history,
        render_work_details,
    },
    web::{
        ApiMessage, AppState, AuthUser,
        access::Area,
        admin::{DashboardQuery, DashboardTab, render_settings_tab, require_admin_user},
        auth, escape_html,
        data::{fetch_research_areas, fetch_users},
        flash::{FlashQuery, compose_flash_message},
        json_error,
        storage::content_disposition,
        templates::{PageLayout, format_date, render_page, status_badge},
    },
    works::{
        Decision, Work, WorkStatus, fetch_all_works, fetch_comments, fetch_validations, fetch_work,
        stats::{DashboardStats, dashboard_stats},
    },
};

use self::{
    export::{EXPORT_FILE_NAME, works_workbook},
    review::{ReviewError, persist_comment, persist_review, plan_comment, plan_review},
};

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/dashboard/export.xlsx", get(export_works))
        .route("/dashboard/tfcs/:id", get(review_page))
        .route("/dashboard/tfcs/:id/validar", post(submit_decision))
        .route("/dashboard/tfcs/:id/comentarios", post(add_comment))
        .route("/dashboard/tfcs/:id/download", get(download_work))
        .route("/api/dashboard/stats", get(stats_json))
}

#[derive(Deserialize)]
pub struct DecisionForm {
    pub decision: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
}

#[derive(Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub body: Option<String>,
}

async fn dashboard(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<DashboardQuery>,
) -> Result<Html<String>, Redirect> {
    let admin = require_admin_user(&state, &jar).await?;
    let pool = state.pool_ref();
    let tab = DashboardTab::from_param(params.tab.as_deref());
    let mut flash = compose_flash_message(params.status.as_deref(), params.error.as_deref());

    let works = match fetch_all_works(pool).await {
        Ok(works) => works,
        Err(err) => {
            error!(?err, "failed to load works for dashboard");
            flash = compose_flash_message(None, Some("load_failed"));
            Vec::new()
        }
    };

    let content = match tab {
        DashboardTab::Overview => render_overview(&dashboard_stats(&works)),
        DashboardTab::Pending => render_pending(&works),
        DashboardTab::All => render_all_works(&works),
        DashboardTab::Settings => {
            let areas = fetch_research_areas(pool).await;
            let users = fetch_users(pool).await;
            match (areas, users) {
                (Ok(areas), Ok(users)) => render_settings_tab(&areas, &users, admin.id),
                (Err(err), _) | (_, Err(err)) => {
                    error!(?err, "failed to load dashboard settings");
                    flash = compose_flash_message(None, Some("load_failed"));
                    String::new()
                }
            }
        }
    };

    Ok(Html(render_dashboard(&admin, tab, &works, &content, &flash)))
}

fn render_dashboard(
    admin: &AuthUser,
    active: DashboardTab,
    works: &[Work],
    content: &str,
    flash_html: &str,
) -> String {
    let pending = works
        .iter()
        .filter(|work| work.status == WorkStatus::Submitted)
        .count();

    let tabs = DashboardTab::ALL
        .iter()
        .map(|tab| {
            let label = match tab {
                DashboardTab::Pending => format!("{} ({pending})", tab.label()),
                DashboardTab::All => format!("{} ({})", tab.label(), works.len()),
                _ => tab.label().to_string(),
            };
            format!(
                r#"<a href="/dashboard?tab={key}" class="{class}">{label}</a>"#,
                key = tab.key(),
                class = if *tab == active { "active" } else { "" },
            )
        })
        .collect::<String>();

    let body = format!(
        r#"        <div class="actions" style="justify-content:space-between;margin-bottom:1rem;">
            <nav class="tabs" style="margin:0;">{tabs}</nav>
            <a class="button secondary" href="/dashboard/export.xlsx">Exportar XLSX</a>
        </div>
        {content}"#
    );

    render_page(
        PageLayout::new("Painel de coordenação", "Painel de coordenação", Some(admin))
            .subtitle(format!(
                "Sessão iniciada como {}.",
                escape_html(&admin.display_name)
            ))
            .flash(flash_html)
            .body(body)
            .style(WORK_VIEW_STYLES),
    )
}

fn render_overview(stats: &DashboardStats) -> String {
    let counts = &stats.counts;
    let cards = [
        ("Total", counts.total, "#2563eb"),
        ("Pendentes", counts.submitted, "#3b82f6"),
        ("Em Validação", counts.under_review, "#f59e0b"),
        ("Aprovados", counts.approved, "#16a34a"),
        ("Rejeitados", counts.rejected, "#dc2626"),
    ]
    .iter()
    .map(|(label, value, color)| {
        format!(
            r#"<div class="stat-card" style="border-left-color:{color};"><div class="label">{label}</div><div class="value">{value}</div></div>"#
        )
    })
    .collect::<String>();

    let by_area: Vec<(String, usize)> = stats
        .by_area
        .iter()
        .map(|row| (row.area.clone(), row.count))
        .collect();
    let by_year: Vec<(String, usize)> = stats
        .by_year
        .iter()
        .map(|row| (row.year.to_string(), row.total))
        .collect();

    format!(
        r#"<div class="stat-grid">{cards}</div>
        <section class="panel">
            <h2>TFCs por área de investigação</h2>
            {areas}
        </section>
        <section class="panel">
            <h2>TFCs por ano</h2>
            {years}
        </section>"#,
        areas = render_bar_chart(&by_area),
        years = render_bar_chart(&by_year),
    )
}

/// Horizontal bars scaled against the largest value.
fn render_bar_chart(rows: &[(String, usize)]) -> String {
    let Some(max) = rows.iter().map(|(_, value)| *value).max().filter(|max| *max > 0) else {
        return r#"<p class="note">Sem dados para apresentar.</p>"#.to_string();
    };

    let bars = rows
        .iter()
        .map(|(label, value)| {
            let width = (*value as f64 / max as f64 * 100.0).round();
            format!(
                r#"<div class="bar-row"><span>{label}</span><div class="bar-track"><div class="bar-fill" style="width:{width}%;"></div></div><strong>{value}</strong></div>"#,
                label = escape_html(label),
            )
        })
        .collect::<String>();
    format!(r#"<div class="bars">{bars}</div>"#)
}

/// Comment box plus one submit button per decision.
fn render_decision_form(work_id: Uuid, origin: &str) -> String {
    let buttons = Decision::ALL
        .iter()
        .map(|decision| {
            let class = match decision {
                Decision::Approve => "success",
                Decision::Reject => "danger",
                Decision::RequestJustification => "warning",
            };
            format!(
                r#"<button type="submit" name="decision" value="{value}" class="{class}">{label}</button>"#,
                value = decision.as_str(),
                label = decision.label_pt(),
            )
        })
        .collect::<String>();

    format!(
        r#"<form method="post" action="/dashboard/tfcs/{work_id}/validar">
            <input type="hidden" name="origin" value="{origin}">
            <label for="comment-{work_id}">Comentário (obrigatório para rejeitar ou pedir justificação)</label>
            <textarea id="comment-{work_id}" name="comment" rows="3"></textarea>
            <div class="actions" style="margin-top:0.75rem;">{buttons}</div>
        </form>"#,
        origin = escape_html(origin),
    )
}

fn render_pending(works: &[Work]) -> String {
    let pending: Vec<&Work> = works
        .iter()
        .filter(|work| work.status.accepts_decisions())
        .collect();
    if pending.is_empty() {
        return r#"<div class="panel"><p class="note">Não existem TFCs pendentes de validação.</p></div>"#
            .to_string();
    }

    let items = pending
        .iter()
        .map(|work| {
            format!(
                r#"<div class="panel">
                    <div class="work-row">
                        <div>
                            <h3><a href="/dashboard/tfcs/{id}">{title}</a></h3>
                            <div class="meta">{author} · {work_type} · {year} · submetido em {date}</div>
                        </div>
                        <a class="button secondary" href="/dashboard/tfcs/{id}/download">Descarregar</a>
                    </div>
                    {form}
                </div>"#,
                id = work.id,
                title = escape_html(&work.title),
                author = escape_html(&work.author),
                work_type = work.work_type.label_pt(),
                year = work.year,
                date = format_date(&work.created_at),
                form = render_decision_form(work.id, DashboardTab::Pending.key()),
            )
        })
        .collect::<String>();
    format!(r#"<div class="work-list">{items}</div>"#)
}

fn render_all_works(works: &[Work]) -> String {
    if works.is_empty() {
        return r#"<div class="panel"><p class="note">Ainda não foram submetidos TFCs.</p></div>"#
            .to_string();
    }

    let rows = works
        .iter()
        .map(|work| {
            format!(
                r#"<tr><td><a href="/dashboard/tfcs/{id}">{title}</a></td><td>{author}</td><td>{work_type}</td><td>{area}</td><td>{year}</td><td>{badge}</td><td>{date}</td></tr>"#,
                id = work.id,
                title = escape_html(&work.title),
                author = escape_html(&work.author),
                work_type = work.work_type.label_pt(),
                area = work.area_name().map(escape_html).unwrap_or_else(|| "—".to_string()),
                year = work.year,
                badge = status_badge(work.status),
                date = format_date(&work.created_at),
            )
        })
        .collect::<String>();

    format!(
        r#"<div class="panel" style="overflow-x:auto;">
            <table>
                <thead><tr><th>Título</th><th>Autor</th><th>Tipo</th><th>Área</th><th>Ano</th><th>Estado</th><th>Submetido</th></tr></thead>
                <tbody>{rows}</tbody>
            </table>
        </div>"#
    )
}

async fn load_work(state: &AppState, work_id: Uuid) -> Result<Work, Redirect> {
    match fetch_work(state.pool_ref(), work_id).await {
        Ok(Some(work)) => Ok(work),
        Ok(None) => Err(Redirect::to("/dashboard?error=work_not_found")),
        Err(err) => {
            error!(?err, work = %work_id, "failed to load work");
            Err(Redirect::to("/dashboard?error=load_failed"))
        }
    }
}

async fn review_page(
    State(state): State<AppState>,
    jar: CookieJar,
    AxumPath(work_id): AxumPath<Uuid>,
    Query(params): Query<FlashQuery>,
) -> Result<Html<String>, Redirect> {
    let admin = require_admin_user(&state, &jar).await?;
    let work = load_work(&state, work_id).await?;

    let pool = state.pool_ref();
    let (validations, comments) =
        match (fetch_validations(pool, work.id).await, fetch_comments(pool, work.id).await) {
            (Ok(validations), Ok(comments)) => (validations, comments),
            (Err(err), _) | (_, Err(err)) => {
                error!(?err, work = %work_id, "failed to load review history");
                return Err(Redirect::to("/dashboard?error=load_failed"));
            }
        };

    let decision_panel = if work.status.accepts_decisions() {
        format!(
            r#"<section class="panel"><h2>Validação</h2>{}</section>"#,
            render_decision_form(work.id, "")
        )
    } else {
        String::new()
    };

    let comment_form = format!(
        r#"<form method="post" action="/dashboard/tfcs/{id}/comentarios" style="margin-top:1rem;">
            <label for="comment-body">Novo comentário</label>
            <textarea id="comment-body" name="body" rows="3" required></textarea>
            <div class="actions" style="margin-top:0.75rem;"><button type="submit">Adicionar comentário</button></div>
        </form>"#,
        id = work.id,
    );

    let body = format!(
        r#"        <p><a href="/dashboard?tab=todos">← Voltar ao painel</a></p>
        {details}
        {decision_panel}
        {history}
        {comments}"#,
        details = render_work_details(&work, &format!("/dashboard/tfcs/{}/download", work.id)),
        history = render_validation_history(&validations),
        comments = render_comment_thread(&comments, &comment_form),
    );

    let flash = compose_flash_message(params.status.as_deref(), params.error.as_deref());
    Ok(Html(render_page(
        PageLayout::new(&work.title, "Revisão do TFC", Some(&admin))
            .flash(flash)
            .body(body)
            .style(WORK_VIEW_STYLES),
    )))
}

fn decision_redirect(work_id: Uuid, origin: Option<&str>, kind: &str, code: &str) -> Redirect {
    if origin == Some(DashboardTab::Pending.key()) {
        Redirect::to(&format!(
            "/dashboard?tab={}&{kind}={code}",
            DashboardTab::Pending.key()
        ))
    } else {
        Redirect::to(&format!("/dashboard/tfcs/{work_id}?{kind}={code}"))
    }
}

async fn submit_decision(
    State(state): State<AppState>,
    jar: CookieJar,
    AxumPath(work_id): AxumPath<Uuid>,
    Form(form): Form<DecisionForm>,
) -> Result<Redirect, Redirect> {
    let admin = require_admin_user(&state, &jar).await?;
    let origin = form.origin.as_deref();

    let decision = Decision::parse(form.decision.trim()).ok_or_else(|| {
        decision_redirect(work_id, origin, "error", ReviewError::UnknownDecision.code())
    })?;
    let work = load_work(&state, work_id).await?;

    let plan = plan_review(&work, decision, form.comment.as_deref(), &admin)
        .map_err(|err| decision_redirect(work_id, origin, "error", err.code()))?;
    persist_review(state.pool_ref(), &plan)
        .await
        .map_err(|err| decision_redirect(work_id, origin, "error", err.code()))?;

    info!(
        work = %work_id,
        coordinator = %admin.id,
        decision = decision.as_str(),
        "work reviewed"
    );
    Ok(decision_redirect(work_id, origin, "status", decision.flash_status()))
}

async fn add_comment(
    State(state): State<AppState>,
    jar: CookieJar,
    AxumPath(work_id): AxumPath<Uuid>,
    Form(form): Form<CommentForm>,
) -> Result<Redirect, Redirect> {
    let admin = require_admin_user(&state, &jar).await?;
    let work = load_work(&state, work_id).await?;

    let plan = plan_comment(&work, form.body.as_deref(), &admin)
        .map_err(|err| Redirect::to(&format!("/dashboard/tfcs/{work_id}?error={}", err.code())))?;
    persist_comment(state.pool_ref(), &plan)
        .await
        .map_err(|_| Redirect::to(&format!("/dashboard/tfcs/{work_id}?error=comment_failed")))?;

    Ok(Redirect::to(&format!(
        "/dashboard/tfcs/{work_id}?status=comment_added"
    )))
}

async fn download_work(
    State(state): State<AppState>,
    jar: CookieJar,
    AxumPath(work_id): AxumPath<Uuid>,
) -> Result<Response, Redirect> {
    require_admin_user(&state, &jar).await?;
    let work = load_work(&state, work_id).await?;

    let fallback = format!("/dashboard/tfcs/{}?error=file_unavailable", work.id);
    Ok(download_work_file(state.store(), &work, &fallback).await)
}

async fn export_works(State(state): State<AppState>, jar: CookieJar) -> Result<Response, Redirect> {
    require_admin_user(&state, &jar).await?;

    let works = fetch_all_works(state.pool_ref()).await.map_err(|err| {
        error!(?err, "failed to load works for export");
        Redirect::to("/dashboard?error=export_failed")
    })?;
    let bytes = works_workbook(&works).map_err(|err| {
        error!(?err, "failed to build export workbook");
        Redirect::to("/dashboard?error=export_failed")
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(XLSX_CONTENT_TYPE));
    if let Ok(value) = HeaderValue::from_str(&content_disposition("attachment", EXPORT_FILE_NAME)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok((headers, bytes).into_response())
}

async fn stats_json(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<DashboardStats>, (StatusCode, Json<ApiMessage>)> {
    auth::current_user_or_json_error(&state, &jar, Area::Coordinator)
        .await
        .map_err(|err| json_error(err.status, err.message))?;

    let works = fetch_all_works(state.pool_ref()).await.map_err(|err| {
        error!(?err, "failed to load works for stats");
        json_error(StatusCode::INTERNAL_SERVER_ERROR, "Erro ao carregar dados.")
    })?;
    Ok(Json(dashboard_stats(&works)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::works::fixtures::work;

    #[test]
    fn bars_scale_against_the_largest_value() {
        let html = render_bar_chart(&[("IA".into(), 4), ("Redes".into(), 1)]);
        assert!(html.contains("width:100%"));
        assert!(html.contains("width:25%"));
        assert!(render_bar_chart(&[]).contains("Sem dados"));
    }

    #[test]
    fn overview_shows_counts_and_fallback_area() {
        let works = vec![
            work("A", WorkStatus::Submitted, Some("IA"), 2024),
            work("B", WorkStatus::Approved, None, 2025),
        ];
        let html = render_overview(&dashboard_stats(&works));
        assert!(html.contains("Sem área"));
        assert!(html.contains("2024"));
        assert!(html.contains("2025"));
        assert!(html.contains(r#"<div class="label">Aprovados</div><div class="value">1</div>"#));
    }

    #[test]
    fn pending_tab_lists_only_submitted_works_with_actions() {
        let works = vec![
            work("Pendente", WorkStatus::Submitted, None, 2025),
            work("Fechado", WorkStatus::Approved, None, 2025),
            work("Em revisão", WorkStatus::UnderReview, None, 2025),
        ];
        let html = render_pending(&works);
        assert!(html.contains("Pendente"));
        assert!(!html.contains("Fechado"));
        assert!(!html.contains("Em revisão"));
        assert!(html.contains(r#"value="request_justification""#));
        assert!(html.contains(r#"name="origin" value="pendentes""#));

        let none = render_pending(&works[1..]);
        assert!(none.contains("Não existem TFCs pendentes"));
    }

    #[test]
    fn decision_redirect_returns_to_origin() {
        let id = Uuid::new_v4();
        let to_tab = decision_redirect(id, Some("pendentes"), "status", "approved").into_response();
        assert_eq!(
            to_tab.headers()[header::LOCATION],
            "/dashboard?tab=pendentes&status=approved"
        );

        let to_page = decision_redirect(id, None, "error", "comment_required").into_response();
        assert_eq!(
            to_page.headers()[header::LOCATION],
            format!("/dashboard/tfcs/{id}?error=comment_required").as_str()
        );
    }

    #[test]
    fn all_works_table_escapes_titles() {
        let works = vec![work("<script>", WorkStatus::Rejected, Some("IA"), 2023)];
        let html = render_all_works(&works);
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("badge rejected"));
    }
}
