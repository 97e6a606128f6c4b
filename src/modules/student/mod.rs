use axum::{
    Router,
    extract::{Path as AxumPath, Query, State},
    response::{Html, Redirect, Response},
    routing::get,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use crate::{
    modules::work_views::{
        WORK_VIEW_STYLES, download_work_file, render_comment_thread, render_validation_history,
        render_work_details, render_work_row,
    },
    web::{
        AppState, AuthUser, auth, escape_html,
        flash::{FlashQuery, compose_flash_message},
        templates::{PageLayout, percent_encode, render_page},
    },
    works::{
        Work, WorkStatus, fetch_comments, fetch_student_work, fetch_student_works,
        fetch_validations,
        stats::{StatusCounts, StatusFilter, filter_works},
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/estudante", get(student_dashboard))
        .route("/estudante/detalhes/:id", get(work_detail))
        .route("/estudante/detalhes/:id/download", get(download_work))
}

#[derive(Default, Deserialize)]
pub struct StudentQuery {
    pub q: Option<String>,
    pub estado: Option<String>,
    pub status: Option<String>,
    pub error: Option<String>,
}

async fn student_dashboard(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<StudentQuery>,
) -> Result<Html<String>, Redirect> {
    let user = auth::require_student(&state, &jar).await?;

    let flash = compose_flash_message(params.status.as_deref(), params.error.as_deref());
    let works = match fetch_student_works(state.pool_ref(), user.id).await {
        Ok(works) => works,
        Err(err) => {
            error!(?err, student = %user.id, "failed to load student works");
            return Ok(Html(render_dashboard(
                &user,
                &[],
                "",
                StatusFilter::All,
                &compose_flash_message(None, Some("load_failed")),
            )));
        }
    };

    let query = params.q.as_deref().unwrap_or_default();
    let filter = StatusFilter::from_param(params.estado.as_deref());

    Ok(Html(render_dashboard(&user, &works, query, filter, &flash)))
}

fn dashboard_href(query: &str, filter: StatusFilter) -> String {
    let mut href = format!("/estudante?estado={}", filter.key());
    if !query.trim().is_empty() {
        href.push_str("&q=");
        href.push_str(&percent_encode(query.trim()));
    }
    href
}

fn render_dashboard(
    user: &AuthUser,
    works: &[Work],
    query: &str,
    filter: StatusFilter,
    flash_html: &str,
) -> String {
    let counts = StatusCounts::tally(works);

    let cards = std::iter::once(("Total", counts.total, "#2563eb"))
        .chain(WorkStatus::ALL.iter().map(|status| {
            let color = match status {
                WorkStatus::Submitted => "#3b82f6",
                WorkStatus::UnderReview => "#f59e0b",
                WorkStatus::Approved => "#16a34a",
                WorkStatus::Rejected => "#dc2626",
            };
            (status.label_pt(), counts.get(*status), color)
        }))
        .map(|(label, value, color)| {
            format!(
                r#"<div class="stat-card" style="border-left-color:{color};"><div class="label">{label}</div><div class="value">{value}</div></div>"#
            )
        })
        .collect::<String>();

    let tabs = std::iter::once((StatusFilter::All, "Todos", counts.total))
        .chain(
            WorkStatus::ALL
                .iter()
                .map(|status| (StatusFilter::Only(*status), status.label_pt(), counts.get(*status))),
        )
        .map(|(tab, label, count)| {
            format!(
                r#"<a href="{href}" class="{class}">{label} ({count})</a>"#,
                href = escape_html(&dashboard_href(query, tab)),
                class = if tab == filter { "active" } else { "" },
            )
        })
        .collect::<String>();

    let visible = filter_works(works, query, filter);
    let list = if works.is_empty() {
        r#"<div class="panel"><p class="note">Ainda não submeteu nenhum TFC.</p><a class="button" href="/estudante/submissao">Submeter o primeiro TFC</a></div>"#.to_string()
    } else if visible.is_empty() {
        r#"<div class="panel"><p class="note">Nenhum TFC corresponde à pesquisa.</p></div>"#.to_string()
    } else {
        visible
            .iter()
            .map(|work| render_work_row(work, &format!("/estudante/detalhes/{}", work.id)))
            .collect()
    };

    let body = format!(
        r#"        <div class="stat-grid">{cards}</div>
        <section>
            <form method="get" action="/estudante" class="actions" style="margin-bottom:1rem;">
                <input type="hidden" name="estado" value="{filter_key}">
                <input type="search" name="q" value="{query}" placeholder="Pesquisar por título ou autor" style="max-width:420px;">
                <button type="submit" class="secondary">Pesquisar</button>
                <a class="button" href="/estudante/submissao">Novo TFC</a>
            </form>
            <nav class="tabs">{tabs}</nav>
            <div class="work-list">{list}</div>
        </section>"#,
        filter_key = filter.key(),
        query = escape_html(query),
    );

    render_page(
        PageLayout::new("Área do estudante", "Os meus TFCs", Some(user))
            .subtitle(format!("Bem-vindo, {}.", escape_html(&user.display_name)))
            .flash(flash_html)
            .body(body)
            .style(WORK_VIEW_STYLES),
    )
}

async fn work_detail(
    State(state): State<AppState>,
    jar: CookieJar,
    AxumPath(work_id): AxumPath<Uuid>,
    Query(params): Query<FlashQuery>,
) -> Result<Html<String>, Redirect> {
    let user = auth::require_student(&state, &jar).await?;
    let pool = state.pool_ref();

    let work = match fetch_student_work(pool, work_id, user.id).await {
        Ok(Some(work)) => work,
        Ok(None) => return Err(Redirect::to("/estudante?error=work_not_found")),
        Err(err) => {
            error!(?err, work = %work_id, "failed to load work detail");
            return Err(Redirect::to("/estudante?error=load_failed"));
        }
    };

    let history = fetch_validations(pool, work.id).await;
    let comments = fetch_comments(pool, work.id).await;
    let (validations, comments) = match (history, comments) {
        (Ok(validations), Ok(comments)) => (validations, comments),
        (Err(err), _) | (_, Err(err)) => {
            error!(?err, work = %work_id, "failed to load work history");
            return Err(Redirect::to("/estudante?error=load_failed"));
        }
    };

    let flash = compose_flash_message(params.status.as_deref(), params.error.as_deref());
    let body = format!(
        r#"        <p><a href="/estudante">← Voltar aos meus TFCs</a></p>
        {details}
        {history}
        {comments}"#,
        details = render_work_details(&work, &format!("/estudante/detalhes/{}/download", work.id)),
        history = render_validation_history(&validations),
        comments = render_comment_thread(&comments, ""),
    );

    Ok(Html(render_page(
        PageLayout::new(&work.title, "Detalhes do TFC", Some(&user))
            .flash(flash)
            .body(body)
            .style(WORK_VIEW_STYLES),
    )))
}

async fn download_work(
    State(state): State<AppState>,
    jar: CookieJar,
    AxumPath(work_id): AxumPath<Uuid>,
) -> Result<Response, Redirect> {
    let user = auth::require_student(&state, &jar).await?;

    let work = match fetch_student_work(state.pool_ref(), work_id, user.id).await {
        Ok(Some(work)) => work,
        Ok(None) => return Err(Redirect::to("/estudante?error=work_not_found")),
        Err(err) => {
            error!(?err, work = %work_id, "failed to load work for download");
            return Err(Redirect::to("/estudante?error=load_failed"));
        }
    };

    let fallback = format!("/estudante/detalhes/{}?error=file_unavailable", work.id);
    Ok(download_work_file(state.store(), &work, &fallback).await)
}
