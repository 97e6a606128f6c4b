use std::borrow::Cow;

use chrono::{DateTime, Datelike, Utc};

use crate::web::AuthUser;
use crate::works::WorkStatus;

const APP_NAME: &str = "Portal de TFCs";

const PAGE_BASE_STYLES: &str = r#"
        :root { color-scheme: light; --bg: #f8fafc; --card: #ffffff; --fg: #0f172a; --muted: #475569; --border: #e2e8f0; --primary: #2563eb; --primary-dark: #1d4ed8; --soft: #f1f5f9; }
        :root[data-theme="dark"] { color-scheme: dark; --bg: #0b1120; --card: #111827; --fg: #e2e8f0; --muted: #94a3b8; --border: #1f2937; --primary: #3b82f6; --primary-dark: #2563eb; --soft: #1e293b; }
        body { font-family: "Helvetica Neue", Arial, sans-serif; margin: 0; background: var(--bg); color: var(--fg); min-height: 100vh; display: flex; flex-direction: column; }
        nav.app-nav { background: var(--card); border-bottom: 1px solid var(--border); padding: 0.85rem 1.5rem; display: flex; justify-content: space-between; align-items: center; flex-wrap: wrap; gap: 1rem; }
        nav.app-nav .brand { font-weight: 700; font-size: 1.2rem; color: var(--primary); text-decoration: none; }
        nav.app-nav .links { display: flex; gap: 0.75rem; align-items: center; flex-wrap: wrap; }
        nav.app-nav .links a { color: var(--fg); text-decoration: none; font-weight: 600; padding: 0.4rem 0.85rem; border-radius: 999px; }
        nav.app-nav .links a:hover { background: var(--soft); }
        nav.app-nav .who { color: var(--muted); font-size: 0.9rem; }
        nav.app-nav form { margin: 0; }
        nav.app-nav button, .theme-toggle { padding: 0.45rem 1rem; border-radius: 999px; border: 1px solid var(--border); background: var(--soft); color: var(--fg); font-weight: 600; cursor: pointer; }
        header.page-header { padding: 2rem 1.5rem 0.5rem; max-width: 1100px; margin: 0 auto; width: 100%; box-sizing: border-box; }
        header.page-header h1 { margin: 0 0 0.35rem; font-size: 1.9rem; }
        header.page-header p { margin: 0; color: var(--muted); }
        main { flex: 1; padding: 1.5rem; max-width: 1100px; margin: 0 auto; width: 100%; box-sizing: border-box; }
        section { margin-bottom: 2rem; }
        .panel { background: var(--card); border-radius: 12px; border: 1px solid var(--border); padding: 1.5rem; box-shadow: 0 18px 40px rgba(15, 23, 42, 0.06); }
        .panel h2 { margin-top: 0; }
        label { display: block; margin: 1rem 0 0.45rem; font-weight: 600; }
        input[type="text"], input[type="email"], input[type="password"], input[type="search"], select, textarea { width: 100%; padding: 0.75rem; border-radius: 8px; border: 1px solid var(--border); background: var(--soft); color: var(--fg); box-sizing: border-box; font: inherit; }
        input[readonly] { opacity: 0.7; cursor: not-allowed; }
        textarea { resize: vertical; }
        button, .button { display: inline-flex; align-items: center; justify-content: center; gap: 0.4rem; padding: 0.75rem 1.2rem; border: none; border-radius: 8px; background: var(--primary); color: #ffffff; font-weight: 600; cursor: pointer; text-decoration: none; font-size: 0.95rem; }
        button:hover, .button:hover { background: var(--primary-dark); }
        .button.secondary, button.secondary { background: var(--soft); color: var(--fg); border: 1px solid var(--border); }
        button.danger { background: #dc2626; }
        button.warning { background: #d97706; }
        button.success { background: #16a34a; }
        .flash { padding: 1rem 1.25rem; border-radius: 10px; margin-bottom: 1.5rem; font-weight: 600; border: 1px solid transparent; }
        .flash.success { background: #ecfdf3; border-color: #bbf7d0; color: #166534; }
        .flash.error { background: #fef2f2; border-color: #fecaca; color: #b91c1c; }
        table { width: 100%; border-collapse: collapse; background: var(--card); }
        th, td { padding: 0.7rem 0.9rem; border-bottom: 1px solid var(--border); text-align: left; vertical-align: top; }
        th { background: var(--soft); font-weight: 600; }
        .note { color: var(--muted); font-size: 0.95rem; line-height: 1.6; }
        .badge { display: inline-flex; align-items: center; padding: 0.2rem 0.7rem; border-radius: 999px; font-size: 0.82rem; font-weight: 600; border: 1px solid transparent; white-space: nowrap; }
        .badge.submitted { background: #dbeafe; color: #1d4ed8; border-color: #bfdbfe; }
        .badge.under-review { background: #fef3c7; color: #92400e; border-color: #fde68a; }
        .badge.approved { background: #dcfce7; color: #166534; border-color: #bbf7d0; }
        .badge.rejected { background: #fee2e2; color: #b91c1c; border-color: #fecaca; }
        .chip { display: inline-block; padding: 0.15rem 0.6rem; margin: 0 0.3rem 0.3rem 0; border-radius: 999px; background: var(--soft); border: 1px solid var(--border); font-size: 0.8rem; }
        .stat-grid { display: grid; gap: 1rem; grid-template-columns: repeat(auto-fit, minmax(150px, 1fr)); margin-bottom: 2rem; }
        .stat-card { background: var(--card); border: 1px solid var(--border); border-left-width: 4px; border-radius: 10px; padding: 1.1rem; }
        .stat-card .value { font-size: 1.8rem; font-weight: 700; }
        .stat-card .label { color: var(--muted); font-size: 0.78rem; font-weight: 600; text-transform: uppercase; }
        .tabs { display: flex; gap: 0.5rem; flex-wrap: wrap; margin-bottom: 1.25rem; }
        .tabs a { padding: 0.5rem 1rem; border-radius: 999px; border: 1px solid var(--border); color: var(--fg); text-decoration: none; font-weight: 600; background: var(--card); }
        .tabs a.active { background: var(--primary); color: #ffffff; border-color: var(--primary); }
        .bars { display: flex; flex-direction: column; gap: 0.55rem; }
        .bar-row { display: grid; grid-template-columns: minmax(120px, 220px) 1fr 3rem; align-items: center; gap: 0.75rem; font-size: 0.9rem; }
        .bar-track { background: var(--soft); border-radius: 999px; height: 0.8rem; overflow: hidden; }
        .bar-fill { background: var(--primary); height: 100%; border-radius: 999px; }
        .detail-grid { display: grid; gap: 1rem; grid-template-columns: repeat(auto-fit, minmax(220px, 1fr)); }
        .detail-grid dt { color: var(--muted); font-size: 0.8rem; font-weight: 600; text-transform: uppercase; }
        .detail-grid dd { margin: 0.2rem 0 0; }
        .actions { display: flex; gap: 0.5rem; flex-wrap: wrap; align-items: center; }
        .inline-form { display: inline; margin: 0; }
        .timeline { list-style: none; padding: 0; margin: 0; display: flex; flex-direction: column; gap: 0.75rem; }
        .timeline li { border: 1px solid var(--border); border-radius: 10px; padding: 0.85rem 1rem; background: var(--soft); }
        .timeline .meta { color: var(--muted); font-size: 0.82rem; margin-bottom: 0.3rem; }
        .app-footer { margin: 3rem 0 1.5rem; text-align: center; font-size: 0.85rem; color: #94a3b8; }
        @media (max-width: 768px) {
            main { padding: 1rem; }
            header.page-header { padding: 1.5rem 1rem 0.5rem; }
            th, td { padding: 0.5rem; }
            .bar-row { grid-template-columns: 1fr 2fr 2.5rem; }
        }
"#;

const THEME_SCRIPT: &str = r#"<script>
(function() {
    const root = document.documentElement;
    const stored = localStorage.getItem('tfc-theme');
    if (stored) {
        root.dataset.theme = stored;
    }
    document.querySelectorAll('[data-theme-toggle]').forEach(btn => {
        btn.addEventListener('click', () => {
            const next = root.dataset.theme === 'dark' ? 'light' : 'dark';
            root.dataset.theme = next;
            localStorage.setItem('tfc-theme', next);
        });
    });
})();
</script>"#;

pub struct PageLayout<'a> {
    pub meta_title: &'a str,
    pub page_heading: &'a str,
    pub subtitle_html: Cow<'a, str>,
    pub user: Option<&'a AuthUser>,
    pub flash_html: Cow<'a, str>,
    pub body_html: Cow<'a, str>,
    pub extra_style_blocks: Vec<Cow<'a, str>>,
    pub body_scripts: Vec<Cow<'a, str>>,
}

impl<'a> PageLayout<'a> {
    pub fn new(meta_title: &'a str, page_heading: &'a str, user: Option<&'a AuthUser>) -> Self {
        Self {
            meta_title,
            page_heading,
            subtitle_html: Cow::Borrowed(""),
            user,
            flash_html: Cow::Borrowed(""),
            body_html: Cow::Borrowed(""),
            extra_style_blocks: Vec::new(),
            body_scripts: Vec::new(),
        }
    }

    pub fn subtitle(mut self, html: impl Into<Cow<'a, str>>) -> Self {
        self.subtitle_html = html.into();
        self
    }

    pub fn flash(mut self, html: impl Into<Cow<'a, str>>) -> Self {
        self.flash_html = html.into();
        self
    }

    pub fn body(mut self, html: impl Into<Cow<'a, str>>) -> Self {
        self.body_html = html.into();
        self
    }

    pub fn style(mut self, css: impl Into<Cow<'a, str>>) -> Self {
        self.extra_style_blocks.push(css.into());
        self
    }

    pub fn script(mut self, script: impl Into<Cow<'a, str>>) -> Self {
        self.body_scripts.push(script.into());
        self
    }
}

pub fn render_page(layout: PageLayout<'_>) -> String {
    let PageLayout {
        meta_title,
        page_heading,
        subtitle_html,
        user,
        flash_html,
        body_html,
        extra_style_blocks,
        body_scripts,
    } = layout;

    let styles = std::iter::once(Cow::Borrowed(PAGE_BASE_STYLES))
        .chain(extra_style_blocks)
        .map(|block| block.into_owned())
        .collect::<Vec<_>>()
        .join("\n");

    let scripts = std::iter::once(Cow::Borrowed(THEME_SCRIPT))
        .chain(body_scripts)
        .map(|script| script.into_owned())
        .collect::<Vec<_>>()
        .join("\n");

    let subtitle = if subtitle_html.is_empty() {
        String::new()
    } else {
        format!("<p>{subtitle_html}</p>")
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="pt-PT">
<head>
    <meta charset="UTF-8">
    <title>{meta_title} · {app}</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <style>
{styles}
    </style>
</head>
<body>
    {nav}
    <header class="page-header">
        <h1>{page_heading}</h1>
        {subtitle}
    </header>
    <main>
        {flash_html}
{body_html}
        {footer}
    </main>
{scripts}
</body>
</html>"#,
        meta_title = escape_html(meta_title),
        app = APP_NAME,
        styles = styles,
        nav = render_nav(user),
        page_heading = escape_html(page_heading),
        subtitle = subtitle,
        flash_html = flash_html,
        body_html = body_html,
        footer = render_footer(),
        scripts = scripts,
    )
}

fn render_nav(user: Option<&AuthUser>) -> String {
    let links = match user {
        Some(user) if user.is_admin() => format!(
            r#"<a href="/dashboard">Dashboard</a>
            <span class="who" title="{email}">{name} · Coordenador</span>
            <form method="post" action="/auth/logout"><button type="submit">Sair</button></form>"#,
            name = escape_html(&user.display_name),
            email = escape_html(&user.email),
        ),
        Some(user) => format!(
            r#"<a href="/estudante">Estudante</a>
            <a href="/estudante/submissao">Submeter TFC</a>
            <span class="who" title="{email}">{name}</span>
            <form method="post" action="/auth/logout"><button type="submit">Sair</button></form>"#,
            name = escape_html(&user.display_name),
            email = escape_html(&user.email),
        ),
        None => r#"<a href="/auth/login">Entrar</a>
            <a href="/auth/sign-up">Criar conta</a>"#
            .to_string(),
    };

    format!(
        r#"<nav class="app-nav">
        <a class="brand" href="/">{app}</a>
        <div class="links">
            {links}
            <button type="button" class="theme-toggle" data-theme-toggle>◐</button>
        </div>
    </nav>"#,
        app = APP_NAME,
        links = links,
    )
}

pub fn render_login_page(flash_html: &str, email: &str) -> String {
    let body = format!(
        r#"        <section class="panel auth-panel">
            <p class="note">Entre com o e-mail e a palavra-passe da sua conta.</p>
            <form method="post" action="/auth/login">
                <label for="email">E-mail</label>
                <input id="email" type="email" name="email" value="{email}" required>
                <label for="password">Palavra-passe</label>
                <input id="password" type="password" name="password" required>
                <div class="actions" style="margin-top:1.5rem;">
                    <button type="submit">Entrar</button>
                    <a class="button secondary" href="/auth/sign-up">Criar conta</a>
                </div>
            </form>
        </section>"#,
        email = escape_html(email),
    );

    render_page(
        PageLayout::new("Entrar", "Iniciar sessão", None)
            .flash(flash_html)
            .body(body)
            .style(AUTH_PAGE_STYLES),
    )
}

pub fn render_sign_up_page(flash_html: &str, name: &str, email: &str) -> String {
    let body = format!(
        r#"        <section class="panel auth-panel">
            <p class="note">As novas contas têm acesso à área do estudante.</p>
            <form method="post" action="/auth/sign-up">
                <label for="name">Nome completo</label>
                <input id="name" type="text" name="name" value="{name}">
                <label for="email">E-mail</label>
                <input id="email" type="email" name="email" value="{email}" required>
                <label for="password">Palavra-passe</label>
                <input id="password" type="password" name="password" minlength="6" required>
                <label for="repeat_password">Repetir palavra-passe</label>
                <input id="repeat_password" type="password" name="repeat_password" minlength="6" required>
                <div class="actions" style="margin-top:1.5rem;">
                    <button type="submit">Criar conta</button>
                    <a class="button secondary" href="/auth/login">Já tenho conta</a>
                </div>
            </form>
        </section>"#,
        name = escape_html(name),
        email = escape_html(email),
    );

    render_page(
        PageLayout::new("Criar conta", "Criar conta", None)
            .flash(flash_html)
            .body(body)
            .style(AUTH_PAGE_STYLES),
    )
}

const AUTH_PAGE_STYLES: &str = ".auth-panel { max-width: 460px; margin: 0 auto; }";

fn render_footer() -> String {
    let current_year = Utc::now().year();
    format!(
        r#"<footer class="app-footer">© {year} {app} · Submissão e validação de trabalhos de fim de curso</footer>"#,
        year = current_year,
        app = APP_NAME,
    )
}

pub fn status_badge(status: WorkStatus) -> String {
    format!(
        r#"<span class="badge {class}">{label}</span>"#,
        class = status.css_class(),
        label = status.label_pt(),
    )
}

pub fn format_date(value: &DateTime<Utc>) -> String {
    value.format("%d/%m/%Y").to_string()
}

pub fn format_datetime(value: &DateTime<Utc>) -> String {
    value.format("%d/%m/%Y %H:%M").to_string()
}

pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Percent-encodes every byte outside the RFC 3986 unreserved set.
pub fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

/// Renders optional free text with line breaks preserved, or a dash when empty.
pub fn render_multiline(value: Option<&str>) -> String {
    match value.map(str::trim).filter(|text| !text.is_empty()) {
        Some(text) => escape_html(text).replace('\n', "<br>"),
        None => "—".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn percent_encode_keeps_unreserved_bytes_only() {
        assert_eq!(percent_encode("redes-5g_v1.2~x"), "redes-5g_v1.2~x");
        assert_eq!(percent_encode("a b&c=d"), "a%20b%26c%3Dd");
        assert_eq!(percent_encode("visão"), "vis%C3%A3o");
    }

    #[test]
    fn escape_html_covers_markup_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn login_page_escapes_prefilled_email() {
        let html = render_login_page("", "\"><script>");
        assert!(html.contains("&quot;&gt;&lt;script&gt;"));
        assert!(!html.contains("\"><script>"));
    }

    #[test]
    fn nav_depends_on_role() {
        let student = AuthUser {
            id: uuid::Uuid::new_v4(),
            email: "ana@uni.pt".into(),
            display_name: "Ana".into(),
            access_level: "student".into(),
        };
        let html = render_page(PageLayout::new("t", "t", Some(&student)));
        assert!(html.contains("/estudante/submissao"));
        assert!(html.contains(r#"title="ana@uni.pt">Ana</span>"#));
        assert!(!html.contains(r#"href="/dashboard""#));

        let anonymous = render_page(PageLayout::new("t", "t", None));
        assert!(anonymous.contains("/auth/sign-up"));
    }

    #[test]
    fn status_badge_uses_label_and_class() {
        let html = status_badge(WorkStatus::UnderReview);
        assert!(html.contains("under-review"));
        assert!(html.contains("Em Validação"));
    }

    #[test]
    fn dates_use_portuguese_order() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        assert_eq!(format_date(&ts), "09/03/2024");
        assert_eq!(format_datetime(&ts), "09/03/2024 14:05");
    }

    #[test]
    fn multiline_text_keeps_breaks() {
        assert_eq!(render_multiline(Some("a<b\nc")), "a&lt;b<br>c");
        assert_eq!(render_multiline(Some("  ")), "—");
        assert_eq!(render_multiline(None), "—");
    }
}
