use axum::response::{IntoResponse, Redirect, Response};
use tracing::warn;

use crate::{
    web::{
        escape_html,
        storage::{ObjectStore, file_response},
        templates::{format_date, format_datetime, render_multiline, status_badge},
    },
    works::{CommentRecord, ValidationRecord, Work},
};

/// Styles shared by the student detail page and the coordinator review page.
pub const WORK_VIEW_STYLES: &str = r#"
        .work-header { display: flex; justify-content: space-between; align-items: flex-start; gap: 1rem; flex-wrap: wrap; }
        .work-header h2 { margin: 0 0 0.4rem; }
        .prose { line-height: 1.7; }
        .work-list { display: flex; flex-direction: column; gap: 0.75rem; }
        .work-row { display: flex; justify-content: space-between; align-items: center; gap: 1rem; flex-wrap: wrap; }
        .work-row h3 { margin: 0 0 0.25rem; font-size: 1.05rem; }
        .work-row .meta { color: var(--muted); font-size: 0.85rem; }
"#;

pub fn render_keyword_chips(keywords: &[String]) -> String {
    if keywords.is_empty() {
        return r#"<span class="note">Sem palavras-chave</span>"#.to_string();
    }
    keywords
        .iter()
        .map(|keyword| format!(r#"<span class="chip">{}</span>"#, escape_html(keyword)))
        .collect()
}

/// Metadata grid, abstract and file actions for one work.
pub fn render_work_details(work: &Work, download_href: &str) -> String {
    format!(
        r#"<section class="panel">
            <div class="work-header">
                <div>
                    <h2>{title}</h2>
                    <p class="note">{author} · {work_type} · {year}</p>
                </div>
                {badge}
            </div>
            <dl class="detail-grid">
                <div><dt>Área de investigação</dt><dd>{area}</dd></div>
                <div><dt>Orientador</dt><dd>{advisor}</dd></div>
                <div><dt>Submetido em</dt><dd>{created}</dd></div>
                <div><dt>Última atualização</dt><dd>{updated}</dd></div>
            </dl>
            <h3>Palavras-chave</h3>
            <div>{keywords}</div>
            <h3>Resumo</h3>
            <p class="prose">{summary}</p>
            <h3>Justificação</h3>
            <p class="prose">{justification}</p>
            <h3>Ficheiro</h3>
            <div class="actions">
                <span>{file_name}</span>
                <a class="button secondary" href="{file_url}" target="_blank" rel="noopener">Abrir</a>
                <a class="button" href="{download_href}">Descarregar</a>
            </div>
        </section>"#,
        title = escape_html(&work.title),
        author = escape_html(&work.author),
        work_type = work.work_type.label_pt(),
        year = work.year,
        badge = status_badge(work.status),
        area = work.area_name().map(escape_html).unwrap_or_else(|| "—".to_string()),
        advisor = render_multiline(work.advisor.as_deref()),
        created = format_datetime(&work.created_at),
        updated = format_datetime(&work.updated_at),
        keywords = render_keyword_chips(&work.keywords),
        summary = render_multiline(work.summary.as_deref()),
        justification = render_multiline(work.justification.as_deref()),
        file_name = escape_html(&work.file_name),
        file_url = escape_html(&work.file_url),
        download_href = escape_html(download_href),
    )
}

pub fn render_validation_history(validations: &[ValidationRecord]) -> String {
    let items = if validations.is_empty() {
        r#"<p class="note">Ainda não existem decisões registadas.</p>"#.to_string()
    } else {
        let entries = validations
            .iter()
            .map(|validation| {
                format!(
                    r#"<li><div class="meta">{when} · {who}</div><strong>{decision}</strong><div>{comment}</div></li>"#,
                    when = format_datetime(&validation.created_at),
                    who = escape_html(&validation.coordinator_name),
                    decision = validation.decision.label_pt(),
                    comment = render_multiline(validation.comment.as_deref()),
                )
            })
            .collect::<String>();
        format!(r#"<ul class="timeline">{entries}</ul>"#)
    };

    format!(r#"<section class="panel"><h2>Histórico de validação</h2>{items}</section>"#)
}

pub fn render_comment_thread(comments: &[CommentRecord], form_html: &str) -> String {
    let items = if comments.is_empty() {
        r#"<p class="note">Sem comentários.</p>"#.to_string()
    } else {
        let entries = comments
            .iter()
            .map(|comment| {
                format!(
                    r#"<li><div class="meta">{when} · {who}</div><div>{body}</div></li>"#,
                    when = format_datetime(&comment.created_at),
                    who = escape_html(&comment.coordinator_name),
                    body = render_multiline(Some(&comment.body)),
                )
            })
            .collect::<String>();
        format!(r#"<ul class="timeline">{entries}</ul>"#)
    };

    format!(r#"<section class="panel"><h2>Comentários</h2>{items}{form_html}</section>"#)
}

/// One list row linking to a detail page.
pub fn render_work_row(work: &Work, href: &str) -> String {
    format!(
        r#"<div class="panel work-row">
            <div>
                <h3><a href="{href}">{title}</a></h3>
                <div class="meta">{author} · {work_type} · {area} · {date}</div>
            </div>
            {badge}
        </div>"#,
        href = escape_html(href),
        title = escape_html(&work.title),
        author = escape_html(&work.author),
        work_type = work.work_type.label_pt(),
        area = work.area_name().map(escape_html).unwrap_or_else(|| "Sem área".to_string()),
        date = format_date(&work.created_at),
        badge = status_badge(work.status),
    )
}

/// Sends the stored file as an attachment named after the original upload.
pub async fn download_work_file(store: &ObjectStore, work: &Work, fallback: &str) -> Response {
    let bytes = match store.open(&work.object_key).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(?err, work = %work.id, key = %work.object_key, "stored file unavailable");
            return Redirect::to(fallback).into_response();
        }
    };

    match file_response(bytes, "attachment", &work.file_name) {
        Ok(response) => response,
        Err(_) => Redirect::to(fallback).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::works::{Decision, WorkStatus, fixtures::work};
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn details_escape_user_content() {
        let mut tfc = work("<b>Título</b>", WorkStatus::Approved, Some("IA"), 2025);
        tfc.keywords = vec!["a&b".into()];
        tfc.summary = Some("linha 1\nlinha 2".into());
        let html = render_work_details(&tfc, "/estudante/detalhes/x/download");

        assert!(html.contains("&lt;b&gt;Título&lt;/b&gt;"));
        assert!(html.contains(r#"<span class="chip">a&amp;b</span>"#));
        assert!(html.contains("linha 1<br>linha 2"));
        assert!(html.contains("Aprovado"));
        assert!(html.contains("/estudante/detalhes/x/download"));
    }

    #[test]
    fn history_lists_decisions_with_labels() {
        let records = vec![ValidationRecord {
            id: Uuid::new_v4(),
            coordinator_name: "Prof. Costa".into(),
            decision: Decision::RequestJustification,
            comment: Some("Rever capítulo 2".into()),
            created_at: Utc::now(),
        }];
        let html = render_validation_history(&records);
        assert!(html.contains("Solicitar justificação"));
        assert!(html.contains("Rever capítulo 2"));

        assert!(render_validation_history(&[]).contains("Ainda não existem decisões"));
    }

    #[test]
    fn rows_fall_back_to_no_area_label() {
        let tfc = work("Compiladores", WorkStatus::Submitted, None, 2024);
        let html = render_work_row(&tfc, "/dashboard/tfcs/1");
        assert!(html.contains("Sem área"));
        assert!(html.contains("badge submitted"));
    }

    #[tokio::test]
    async fn download_sends_original_name_or_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::new(dir.path(), "");
        let mut tfc = work("Redes móveis", WorkStatus::Approved, None, 2024);
        tfc.file_name = "Relatorio Final.pdf".into();
        std::fs::write(dir.path().join(&tfc.object_key), b"%PDF-1.7").unwrap();

        let response = download_work_file(&store, &tfc, "/estudante").await;
        assert_eq!(response.status(), axum::http::StatusCode::OK);
        assert!(
            response.headers()[axum::http::header::CONTENT_DISPOSITION]
                .to_str()
                .unwrap()
                .starts_with("attachment; filename=\"Relatorio Final.pdf\"")
        );

        std::fs::remove_file(dir.path().join(&tfc.object_key)).unwrap();
        let missing = download_work_file(&store, &tfc, "/estudante?error=file_unavailable").await;
        assert_eq!(missing.status(), axum::http::StatusCode::SEE_OTHER);
        assert_eq!(
            missing.headers()[axum::http::header::LOCATION],
            "/estudante?error=file_unavailable"
        );
    }
}
