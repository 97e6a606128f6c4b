use uuid::Uuid;

use crate::web::{
    access::AccessLevel,
    escape_html,
    models::{ResearchAreaRow, UserRow},
    templates::format_date,
};

/// Settings tab of the coordinator dashboard: research areas and accounts.
pub fn render_settings_tab(areas: &[ResearchAreaRow], users: &[UserRow], current_admin: Uuid) -> String {
    let mut area_rows = String::new();
    if areas.is_empty() {
        area_rows.push_str(r#"<tr><td colspan="3">Ainda não existem áreas de investigação.</td></tr>"#);
    }
    for area in areas {
        let action = if area.work_count == 0 {
            format!(
                r#"<form class="inline-form" method="post" action="/dashboard/areas/delete" onsubmit="return confirm('Remover esta área?');">
                    <input type="hidden" name="id" value="{id}">
                    <button type="submit" class="danger">Remover</button>
                </form>"#,
                id = area.id,
            )
        } else {
            r#"<span class="note">Em uso</span>"#.to_string()
        };
        area_rows.push_str(&format!(
            "<tr><td>{name}</td><td>{count}</td><td>{action}</td></tr>",
            name = escape_html(&area.name),
            count = area.work_count,
            action = action,
        ));
    }

    let mut user_rows = String::new();
    for user in users {
        let level = user.level();
        let is_self = user.id == current_admin;
        let actions = if is_self {
            r#"<span class="note">Conta atual</span>"#.to_string()
        } else {
            let (next_level, level_label) = match level {
                AccessLevel::Admin => (AccessLevel::Student, "Tornar estudante"),
                AccessLevel::Student => (AccessLevel::Admin, "Tornar coordenador"),
            };
            let (next_active, active_label) = if user.active {
                ("false", "Desativar")
            } else {
                ("true", "Ativar")
            };
            format!(
                r#"<div class="actions">
                    <form class="inline-form" method="post" action="/dashboard/users/role">
                        <input type="hidden" name="user_id" value="{id}">
                        <input type="hidden" name="access_level" value="{next_level}">
                        <button type="submit" class="secondary">{level_label}</button>
                    </form>
                    <form class="inline-form" method="post" action="/dashboard/users/active">
                        <input type="hidden" name="user_id" value="{id}">
                        <input type="hidden" name="active" value="{next_active}">
                        <button type="submit" class="{active_class}">{active_label}</button>
                    </form>
                </div>"#,
                id = user.id,
                next_level = next_level.as_str(),
                level_label = level_label,
                next_active = next_active,
                active_class = if user.active { "warning" } else { "success" },
                active_label = active_label,
            )
        };
        user_rows.push_str(&format!(
            "<tr><td>{name}</td><td>{email}</td><td>{level}</td><td>{state}</td><td>{created}</td><td>{actions}</td></tr>",
            name = escape_html(&user.display_name),
            email = escape_html(&user.email),
            level = level.label_pt(),
            state = if user.active { "Ativa" } else { "Inativa" },
            created = format_date(&user.created_at),
            actions = actions,
        ));
    }

    format!(
        r#"<section class="panel">
            <h2>Áreas de investigação</h2>
            <form method="post" action="/dashboard/areas" class="actions">
                <input type="text" name="name" placeholder="Nova área" required style="max-width:320px;">
                <button type="submit">Adicionar</button>
            </form>
            <table style="margin-top:1rem;">
                <thead><tr><th>Nome</th><th>TFCs</th><th>Ações</th></tr></thead>
                <tbody>{area_rows}</tbody>
            </table>
        </section>
        <section class="panel">
            <h2>Contas</h2>
            <table>
                <thead><tr><th>Nome</th><th>E-mail</th><th>Acesso</th><th>Estado</th><th>Criada</th><th>Ações</th></tr></thead>
                <tbody>{user_rows}</tbody>
            </table>
        </section>"#
    )
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn user(name: &str, level: &str, active: bool) -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            email: format!("{name}@uni.pt"),
            display_name: name.to_string(),
            access_level: level.to_string(),
            active,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn areas_in_use_cannot_be_removed() {
        let areas = vec![
            ResearchAreaRow {
                id: Uuid::new_v4(),
                name: "IA".into(),
                work_count: 3,
            },
            ResearchAreaRow {
                id: Uuid::new_v4(),
                name: "Redes".into(),
                work_count: 0,
            },
        ];
        let html = render_settings_tab(&areas, &[], Uuid::new_v4());
        assert_eq!(html.matches("/dashboard/areas/delete").count(), 1);
        assert!(html.contains("Em uso"));
    }

    #[test]
    fn own_account_has_no_actions() {
        let me = user("coord", "admin", true);
        let other = user("ana", "student", false);
        let html = render_settings_tab(&[], &[me.clone(), other], me.id);
        assert!(html.contains("Conta atual"));
        assert_eq!(html.matches("/dashboard/users/role").count(), 1);
        assert!(html.contains("Tornar coordenador"));
        assert!(html.contains(">Ativar<"));
    }
}
