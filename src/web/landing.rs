use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::web::{
    AppState, auth,
    flash::{FlashQuery, compose_flash_message},
    templates::{PageLayout, render_page},
};

const LANDING_STYLES: &str = r#"
        .hero { text-align: center; padding: 2rem 1rem 1rem; }
        .hero p { max-width: 640px; margin: 0 auto 1.75rem; color: var(--muted); line-height: 1.7; }
        .hero .actions { justify-content: center; }
        .features { display: grid; gap: 1.25rem; grid-template-columns: repeat(auto-fit, minmax(220px, 1fr)); margin-top: 2.5rem; }
        .features h3 { margin: 0 0 0.5rem; }
"#;

pub async fn landing_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<FlashQuery>,
) -> Response {
    if let Some(user) = auth::current_user(&state, &jar).await {
        return Redirect::to(user.level().home_path()).into_response();
    }

    let flash = compose_flash_message(params.status.as_deref(), params.error.as_deref());
    Html(render_landing(&flash)).into_response()
}

fn render_landing(flash_html: &str) -> String {
    let features = [
        (
            "Submissão",
            "Envie o documento final (PDF, ZIP ou DOCX) com título, orientador, área de investigação e palavras-chave.",
        ),
        (
            "Acompanhamento",
            "Consulte o estado de cada trabalho e o histórico de decisões da coordenação.",
        ),
        (
            "Validação",
            "Os coordenadores aprovam, rejeitam ou pedem justificação, com comentários registados.",
        ),
    ];

    let cards = features
        .iter()
        .map(|(title, description)| {
            format!(r#"<div class="panel"><h3>{title}</h3><p class="note">{description}</p></div>"#)
        })
        .collect::<String>();

    let body = format!(
        r#"        <section class="hero">
            <p>Plataforma para submissão e validação de Trabalhos de Fim de Curso. Os estudantes submetem os seus trabalhos e a coordenação acompanha e decide cada submissão.</p>
            <div class="actions">
                <a class="button" href="/auth/login">Entrar</a>
                <a class="button secondary" href="/auth/sign-up">Criar conta</a>
            </div>
        </section>
        <section class="features">{cards}</section>"#
    );

    render_page(
        PageLayout::new("Início", "Trabalhos de Fim de Curso", None)
            .flash(flash_html)
            .body(body)
            .style(LANDING_STYLES),
    )
}
