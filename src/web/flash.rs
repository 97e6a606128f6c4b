use serde::Deserialize;

use crate::web::escape_html;

#[derive(Default, Deserialize)]
pub struct FlashQuery {
    pub status: Option<String>,
    pub error: Option<String>,
}

pub fn status_message(code: &str) -> Option<&'static str> {
    let message = match code {
        "logged_out" => "Sessão terminada.",
        "registered" => "Conta criada com sucesso. Já pode iniciar sessão.",
        "submitted" => "TFC submetido com sucesso!",
        "approved" => "TFC aprovado com sucesso!",
        "rejected" => "TFC rejeitado.",
        "justification_requested" => "Justificação solicitada.",
        "comment_added" => "Comentário adicionado!",
        "area_created" => "Área de investigação criada.",
        "area_deleted" => "Área de investigação removida.",
        "role_updated" => "Nível de acesso atualizado.",
        "account_updated" => "Estado da conta atualizado.",
        _ => return None,
    };
    Some(message)
}

pub fn error_message(code: &str) -> &'static str {
    match code {
        "not_authorized" => "Esta área é reservada aos coordenadores.",
        "invalid_credentials" => "E-mail ou palavra-passe incorretos.",
        "account_inactive" => {
            "A sua conta está inativa. Entre em contacto com o administrador."
        }
        "email_invalid" => "Indique um endereço de e-mail válido.",
        "email_taken" => "Já existe uma conta com este e-mail.",
        "password_mismatch" => "As palavras-passe não coincidem.",
        "password_too_short" => "A palavra-passe deve ter pelo menos 6 caracteres.",
        "work_not_found" => "TFC não encontrado.",
        "load_failed" => "Erro ao carregar dados.",
        "comment_required" => "Por favor, adicione um comentário para esta ação.",
        "comment_empty" => "O comentário não pode estar vazio.",
        "invalid_decision" => "Ação de validação desconhecida.",
        "review_closed" => "Este TFC já não está pendente de validação.",
        "review_failed" => "Erro ao processar validação.",
        "comment_failed" => "Erro ao adicionar comentário.",
        "file_unavailable" => "O ficheiro deste TFC não está disponível.",
        "export_failed" => "Erro ao gerar a exportação.",
        "area_missing_name" => "Indique o nome da área de investigação.",
        "area_duplicate" => "Já existe uma área com esse nome.",
        "area_in_use" => "A área está associada a TFCs e não pode ser removida.",
        "area_not_found" => "Área de investigação não encontrada.",
        "user_missing" => "Utilizador não encontrado.",
        "self_update" => "Não pode alterar a sua própria conta.",
        "level_invalid" => "Nível de acesso inválido.",
        _ => "Ocorreu um erro inesperado. Tente novamente.",
    }
}

/// Compose a flash message HTML snippet for known status or error codes.
pub fn compose_flash_message(status: Option<&str>, error: Option<&str>) -> String {
    if let Some(message) = status.and_then(status_message) {
        return format!(r#"<div class="flash success">{message}</div>"#);
    }

    if let Some(error) = error {
        return render_error_flash(error_message(error));
    }

    String::new()
}

/// Renders a free-form error message, escaping it.
pub fn render_error_flash(message: &str) -> String {
    format!(
        r#"<div class="flash error">{}</div>"#,
        escape_html(message)
    )
}
