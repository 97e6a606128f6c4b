mod sniff;

use std::future::Future;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{Datelike, Utc};
use sqlx::PgPool;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    web::{
        AppState, AuthUser, auth, escape_html,
        data::fetch_research_areas,
        flash::{FlashQuery, compose_flash_message, render_error_flash},
        models::ResearchAreaRow,
        storage::{ObjectStore, random_object_key},
        templates::{PageLayout, render_page},
        upload_ui::{UPLOAD_WIDGET_SCRIPT, UPLOAD_WIDGET_STYLES, UploadWidgetConfig, render_upload_widget},
        uploads::{FileFieldConfig, StagedFile, UploadError, UploadOutcome, process_upload_form},
    },
    works::{
        WorkStatus, WorkType,
        keywords::{link_keywords, merge_keyword_inputs},
    },
};

pub use sniff::{SniffError, sniff_file};

pub const FILE_FIELD: &str = "file";
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "zip", "docx"];

// Room for the text fields and multipart framing around the file itself.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn router(max_upload_bytes: u64) -> Router<AppState> {
    let body_limit = usize::try_from(max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(FORM_OVERHEAD_BYTES);

    Router::new().route(
        "/estudante/submissao",
        get(submission_page)
            .post(submit_work)
            .layer(DefaultBodyLimit::max(body_limit)),
    )
}

/// Raw form values as typed by the student, kept for re-rendering after an error.
#[derive(Clone, Debug, Default)]
pub struct SubmissionDraft {
    pub title: String,
    pub author: String,
    pub work_type: String,
    pub research_area_id: String,
    pub advisor: String,
    pub justification: String,
    pub summary: String,
    pub keywords: String,
}

impl SubmissionDraft {
    /// Collects the text fields. The author always comes from the signed-in profile.
    pub fn from_outcome(outcome: &UploadOutcome, author: &str) -> Self {
        let text = |name: &str| outcome.first_text(name).unwrap_or_default().to_string();
        let keywords = outcome
            .text_values("keywords")
            .map(|values| merge_keyword_inputs(values.iter().map(String::as_str)).join(", "))
            .unwrap_or_default();

        Self {
            title: text("title"),
            author: author.to_string(),
            work_type: text("work_type"),
            research_area_id: text("research_area_id"),
            advisor: text("advisor"),
            justification: text("justification"),
            summary: text("abstract"),
            keywords,
        }
    }

    pub fn validate(&self, file: Option<&StagedFile>) -> Result<ValidSubmission, SubmissionError> {
        let title = required(&self.title, "Título")?;
        let author = required(&self.author, "Autor")?;
        let work_type = match self.work_type.trim() {
            "" => return Err(SubmissionError::MissingField("Tipo de trabalho")),
            value => WorkType::parse(value).ok_or(SubmissionError::InvalidType)?,
        };
        let research_area_id = match self.research_area_id.trim() {
            "" => return Err(SubmissionError::MissingField("Área de investigação")),
            value => Uuid::parse_str(value).map_err(|_| SubmissionError::InvalidArea)?,
        };
        if file.is_none() {
            return Err(SubmissionError::MissingFile);
        }

        Ok(ValidSubmission {
            title,
            author,
            work_type,
            research_area_id,
            advisor: optional(&self.advisor),
            justification: optional(&self.justification),
            summary: optional(&self.summary),
            keywords: merge_keyword_inputs([self.keywords.as_str()]),
        })
    }
}

fn required(value: &str, label: &'static str) -> Result<String, SubmissionError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(SubmissionError::MissingField(label))
    } else {
        Ok(trimmed.to_string())
    }
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidSubmission {
    pub title: String,
    pub author: String,
    pub work_type: WorkType,
    pub research_area_id: Uuid,
    pub advisor: Option<String>,
    pub justification: Option<String>,
    pub summary: Option<String>,
    pub keywords: Vec<String>,
}

#[derive(Debug)]
pub enum SubmissionError {
    MissingField(&'static str),
    MissingFile,
    InvalidType,
    InvalidArea,
    Upload(UploadError),
    Content(SniffError),
    Storage,
    Database,
}

impl SubmissionError {
    /// Problems with the submitted form, shown next to the form rather than as a flash.
    pub fn is_validation(&self) -> bool {
        match self {
            SubmissionError::Upload(err) => err.is_client_error(),
            SubmissionError::Storage | SubmissionError::Database => false,
            _ => true,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            SubmissionError::Upload(UploadError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            err if err.is_validation() => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for SubmissionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmissionError::MissingField(label) => write!(f, "O campo \"{label}\" é obrigatório."),
            SubmissionError::MissingFile => write!(f, "Selecione o ficheiro do TFC."),
            SubmissionError::InvalidType => write!(f, "Tipo de trabalho inválido."),
            SubmissionError::InvalidArea => write!(f, "Área de investigação inválida."),
            SubmissionError::Upload(err) => write!(f, "{err}"),
            SubmissionError::Content(err) => write!(f, "{err}"),
            SubmissionError::Storage => write!(f, "Erro ao enviar o ficheiro. Tente novamente."),
            SubmissionError::Database => write!(f, "Erro ao registar o TFC. Tente novamente."),
        }
    }
}

impl std::error::Error for SubmissionError {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
}

/// Everything needed to insert a work row and its keyword links.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewWork {
    pub id: Uuid,
    pub submission: ValidSubmission,
    pub status: WorkStatus,
    pub year: i32,
    pub file_url: String,
    pub file_name: String,
    pub object_key: String,
    pub student_id: Uuid,
}

#[derive(Debug)]
pub enum CreateWorkError {
    UnknownArea,
    Other(anyhow::Error),
}

/// Side effects of a submission: object storage and the database.
pub trait SubmissionBackend {
    fn store_file(&self, staged: &StagedFile) -> impl Future<Output = Result<StoredObject>> + Send;
    fn discard_file(&self, key: &str) -> impl Future<Output = Result<()>> + Send;
    fn create_work(&self, work: &NewWork) -> impl Future<Output = Result<(), CreateWorkError>> + Send;
}

/// Validates, sniffs, stores and records one submission.
///
/// Nothing reaches the backend until the form and file content pass validation. When the
/// database write fails, the stored object is removed again.
pub async fn submit<B>(
    backend: &B,
    draft: &SubmissionDraft,
    file: Option<&StagedFile>,
    student_id: Uuid,
    year: i32,
) -> Result<Uuid, SubmissionError>
where
    B: SubmissionBackend + Sync,
{
    let submission = draft.validate(file)?;
    let file = file.ok_or(SubmissionError::MissingFile)?;

    let path = file.staged_path.clone();
    let extension = file.extension.clone();
    tokio::task::spawn_blocking(move || sniff_file(&path, &extension))
        .await
        .map_err(|err| SubmissionError::Content(SniffError::Unreadable(err.to_string())))?
        .map_err(SubmissionError::Content)?;

    let stored = backend.store_file(file).await.map_err(|err| {
        error!(?err, "failed to store submitted file");
        SubmissionError::Storage
    })?;

    let work = NewWork {
        id: Uuid::new_v4(),
        submission,
        status: WorkStatus::Submitted,
        year,
        file_url: stored.url.clone(),
        file_name: file.original_name.clone(),
        object_key: stored.key.clone(),
        student_id,
    };

    if let Err(err) = backend.create_work(&work).await {
        if let Err(cleanup) = backend.discard_file(&stored.key).await {
            warn!(?cleanup, key = %stored.key, "failed to remove orphaned object");
        }
        return Err(match err {
            CreateWorkError::UnknownArea => SubmissionError::InvalidArea,
            CreateWorkError::Other(err) => {
                error!(?err, "failed to insert work");
                SubmissionError::Database
            }
        });
    }

    Ok(work.id)
}

pub struct PgSubmissionBackend<'a> {
    pool: &'a PgPool,
    store: &'a ObjectStore,
}

impl<'a> PgSubmissionBackend<'a> {
    pub fn new(pool: &'a PgPool, store: &'a ObjectStore) -> Self {
        Self { pool, store }
    }
}

impl SubmissionBackend for PgSubmissionBackend<'_> {
    async fn store_file(&self, staged: &StagedFile) -> Result<StoredObject> {
        let key = random_object_key(&staged.extension);
        self.store.put(&staged.staged_path, &key).await?;
        Ok(StoredObject {
            url: self.store.public_url(&key),
            key,
        })
    }

    async fn discard_file(&self, key: &str) -> Result<()> {
        self.store.delete(key).await
    }

    async fn create_work(&self, work: &NewWork) -> Result<(), CreateWorkError> {
        let result = insert_work(self.pool, work).await;
        match result {
            Ok(()) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23503") => {
                Err(CreateWorkError::UnknownArea)
            }
            Err(err) => Err(CreateWorkError::Other(
                anyhow::Error::new(err).context("failed to insert work"),
            )),
        }
    }
}

async fn insert_work(pool: &PgPool, work: &NewWork) -> sqlx::Result<()> {
    let submission = &work.submission;
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO tfcs (id, title, author, work_type, status, year, abstract, file_url, file_name,
                           object_key, research_area_id, advisor, justification, student_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
    )
    .bind(work.id)
    .bind(&submission.title)
    .bind(&submission.author)
    .bind(submission.work_type.as_str())
    .bind(work.status.as_str())
    .bind(work.year)
    .bind(submission.summary.as_deref())
    .bind(&work.file_url)
    .bind(&work.file_name)
    .bind(&work.object_key)
    .bind(submission.research_area_id)
    .bind(submission.advisor.as_deref())
    .bind(submission.justification.as_deref())
    .bind(work.student_id)
    .execute(&mut *tx)
    .await?;

    link_keywords(&mut *tx, work.id, &submission.keywords).await?;

    tx.commit().await
}

async fn submission_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<FlashQuery>,
) -> Result<Html<String>, Redirect> {
    let user = auth::require_student(&state, &jar).await?;
    let areas = load_areas(state.pool_ref()).await?;

    let draft = SubmissionDraft {
        author: user.display_name.clone(),
        ..SubmissionDraft::default()
    };
    let flash = compose_flash_message(params.status.as_deref(), params.error.as_deref());

    Ok(Html(render_submission_page(
        &user,
        &areas,
        &draft,
        None,
        &flash,
        state.config().max_upload_bytes,
    )))
}

async fn submit_work(
    State(state): State<AppState>,
    jar: CookieJar,
    multipart: Multipart,
) -> Result<Response, Redirect> {
    let user = auth::require_student(&state, &jar).await?;
    let store = state.store();
    let max_bytes = state.config().max_upload_bytes;
    let staging_dir = store.staging_dir();

    let upload = process_upload_form(
        multipart,
        &staging_dir,
        FileFieldConfig {
            field_name: FILE_FIELD,
            allowed_extensions: ALLOWED_EXTENSIONS,
            max_bytes,
        },
    )
    .await;

    let (draft, result) = match upload {
        Ok(outcome) => {
            let draft = SubmissionDraft::from_outcome(&outcome, &user.display_name);
            let backend = PgSubmissionBackend::new(state.pool_ref(), store);
            let result = submit(
                &backend,
                &draft,
                outcome.file.as_ref(),
                user.id,
                Utc::now().year(),
            )
            .await;
            (draft, result)
        }
        Err(failure) => {
            let draft = SubmissionDraft::from_outcome(&failure.partial, &user.display_name);
            (draft, Err(SubmissionError::Upload(failure.error)))
        }
    };

    store.clear_staging(&staging_dir).await;

    match result {
        Ok(work_id) => {
            info!(work = %work_id, student = %user.id, "work submitted");
            Ok(Redirect::to("/estudante?status=submitted").into_response())
        }
        Err(err) => {
            if !err.is_validation() {
                error!(student = %user.id, error = %err, "submission failed");
            }
            let areas = load_areas(state.pool_ref()).await?;
            let message = err.to_string();
            let (inline, flash) = if err.is_validation() {
                (Some(message.as_str()), String::new())
            } else {
                (None, render_error_flash(&message))
            };
            let html = render_submission_page(&user, &areas, &draft, inline, &flash, max_bytes);
            Ok((err.status_code(), Html(html)).into_response())
        }
    }
}

async fn load_areas(pool: &PgPool) -> Result<Vec<ResearchAreaRow>, Redirect> {
    fetch_research_areas(pool)
        .await
        .context("failed to load research areas")
        .map_err(|err| {
            error!(?err, "failed to load research areas for submission form");
            Redirect::to("/estudante?error=load_failed")
        })
}

const SUBMISSION_STYLES: &str = r#"
        .form-grid { display: grid; gap: 0 1.25rem; grid-template-columns: repeat(auto-fit, minmax(260px, 1fr)); }
        .inline-error { margin-top: 1rem; padding: 0.85rem 1rem; border-radius: 8px; background: #fef2f2; border: 1px solid #fecaca; color: #b91c1c; font-weight: 600; }
        .hint { color: var(--muted); font-size: 0.85rem; margin-top: 0.35rem; }
"#;

fn render_submission_page(
    user: &AuthUser,
    areas: &[ResearchAreaRow],
    draft: &SubmissionDraft,
    inline_error: Option<&str>,
    flash_html: &str,
    max_bytes: u64,
) -> String {
    let type_options = WorkType::ALL
        .iter()
        .map(|work_type| {
            let selected = if draft.work_type == work_type.as_str() { " selected" } else { "" };
            format!(
                r#"<option value="{value}"{selected}>{label}</option>"#,
                value = work_type.as_str(),
                label = work_type.label_pt(),
            )
        })
        .collect::<String>();

    let area_options = areas
        .iter()
        .map(|area| {
            let id = area.id.to_string();
            let selected = if draft.research_area_id == id { " selected" } else { "" };
            format!(
                r#"<option value="{id}"{selected}>{name}</option>"#,
                name = escape_html(&area.name),
            )
        })
        .collect::<String>();

    let max_mb = max_bytes / (1024 * 1024);
    let widget = render_upload_widget(&UploadWidgetConfig {
        widget_id: "tfc-file-widget",
        input_id: "tfc-file",
        field_name: FILE_FIELD,
        label: "Ficheiro do TFC *",
        note: Some("PDF, ZIP ou DOCX"),
        extensions: ALLOWED_EXTENSIONS,
        max_bytes,
        size_message: UploadError::TooLarge { max_bytes }.to_string(),
        type_message: UploadError::UnsupportedType.to_string(),
        required_message: "Selecione o ficheiro do TFC.",
    });

    let inline = inline_error
        .map(|message| format!(r#"<div class="inline-error">{}</div>"#, escape_html(message)))
        .unwrap_or_default();

    let body = format!(
        r#"        <section class="panel">
            <form method="post" action="/estudante/submissao" enctype="multipart/form-data">
                <div class="form-grid">
                    <div>
                        <label for="title">Título *</label>
                        <input id="title" type="text" name="title" value="{title}" required>
                    </div>
                    <div>
                        <label for="author">Autor *</label>
                        <input id="author" type="text" name="author" value="{author}" readonly>
                    </div>
                    <div>
                        <label for="work_type">Tipo de trabalho *</label>
                        <select id="work_type" name="work_type" required>
                            <option value="">Selecione</option>
                            {type_options}
                        </select>
                    </div>
                    <div>
                        <label for="research_area_id">Área de investigação *</label>
                        <select id="research_area_id" name="research_area_id" required>
                            <option value="">Selecione</option>
                            {area_options}
                        </select>
                    </div>
                    <div>
                        <label for="advisor">Orientador</label>
                        <input id="advisor" type="text" name="advisor" value="{advisor}">
                    </div>
                    <div>
                        <label for="keywords">Palavras-chave</label>
                        <input id="keywords" type="text" name="keywords" value="{keywords}" placeholder="ex.: redes, segurança">
                        <p class="hint">Separe as palavras-chave por vírgulas.</p>
                    </div>
                </div>
                <label for="abstract">Resumo</label>
                <textarea id="abstract" name="abstract" rows="6">{summary}</textarea>
                <label for="justification">Justificação</label>
                <textarea id="justification" name="justification" rows="3">{justification}</textarea>
                <div style="margin-top:1.25rem;">{widget}</div>
                <p class="hint">Tamanho máximo: {max_mb}MB.</p>
                {inline}
                <div class="actions" style="margin-top:1.5rem;">
                    <button type="submit">Submeter TFC</button>
                    <a class="button secondary" href="/estudante">Cancelar</a>
                </div>
            </form>
        </section>"#,
        title = escape_html(&draft.title),
        author = escape_html(&draft.author),
        type_options = type_options,
        area_options = area_options,
        advisor = escape_html(&draft.advisor),
        keywords = escape_html(&draft.keywords),
        summary = escape_html(&draft.summary),
        justification = escape_html(&draft.justification),
        widget = widget,
        max_mb = max_mb,
        inline = inline,
    );

    render_page(
        PageLayout::new("Submeter TFC", "Submeter TFC", Some(user))
            .subtitle("Preencha os dados do trabalho e anexe o documento final.")
            .flash(flash_html)
            .body(body)
            .style(SUBMISSION_STYLES)
            .style(UPLOAD_WIDGET_STYLES)
            .script(UPLOAD_WIDGET_SCRIPT),
    )
}
