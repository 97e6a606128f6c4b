use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use axum::extract::Multipart;
use tokio::{fs::File, io::AsyncWriteExt};

pub type UploadResult<T> = Result<T, UploadError>;

/// Error returned when validating or staging an uploaded file.
#[derive(Debug)]
pub enum UploadError {
    TooLarge { max_bytes: u64 },
    UnsupportedType,
    DuplicateFile { field_name: String },
    UnexpectedFile { field_name: String },
    Malformed(String),
    Io(String),
}

impl UploadError {
    /// Errors caused by the submitted content rather than by the server.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, UploadError::Io(_))
    }
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadError::TooLarge { max_bytes } => {
                write!(f, "Ficheiro muito grande. Máximo: {}MB", max_bytes / (1024 * 1024))
            }
            UploadError::UnsupportedType => {
                write!(f, "Apenas ficheiros PDF, ZIP ou DOCX são permitidos")
            }
            UploadError::DuplicateFile { field_name } => {
                write!(f, "Apenas um ficheiro é aceite no campo `{field_name}`")
            }
            UploadError::UnexpectedFile { field_name } => {
                write!(f, "Campo de ficheiro não suportado: `{field_name}`")
            }
            UploadError::Malformed(detail) => {
                write!(f, "Não foi possível ler o formulário enviado: {detail}")
            }
            UploadError::Io(detail) => write!(f, "Erro ao guardar o ficheiro: {detail}"),
        }
    }
}

impl std::error::Error for UploadError {}

/// Expectations for the single file field of a form.
#[derive(Debug, Clone, Copy)]
pub struct FileFieldConfig<'a> {
    pub field_name: &'a str,
    pub allowed_extensions: &'a [&'a str],
    pub max_bytes: u64,
}

/// An upload streamed to the staging directory, not yet committed to the object store.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub original_name: String,
    pub extension: String,
    pub staged_path: PathBuf,
    pub file_size: u64,
}

#[derive(Debug, Default)]
pub struct UploadOutcome {
    pub file: Option<StagedFile>,
    pub text_fields: HashMap<String, Vec<String>>,
}

impl UploadOutcome {
    pub fn text_values(&self, field_name: &str) -> Option<&[String]> {
        self.text_fields
            .get(field_name)
            .map(|values| values.as_slice())
    }

    pub fn first_text(&self, field_name: &str) -> Option<&str> {
        self.text_values(field_name)
            .and_then(|values| values.first().map(|s| s.as_str()))
    }

    /// Removes the staged file, if any. Used whenever the submission is abandoned.
    pub async fn discard(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = tokio::fs::remove_file(&file.staged_path).await;
        }
    }
}

/// A rejected upload together with the text fields read before the failure.
#[derive(Debug)]
pub struct UploadFailure {
    pub error: UploadError,
    pub partial: UploadOutcome,
}

pub async fn ensure_directory(path: &Path) -> UploadResult<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|err| UploadError::Io(format!("não foi possível criar a pasta temporária: {err}")))
}

/// Parses multipart form data, streaming the configured file field into `staging_dir`.
///
/// A file input left empty by the browser arrives with an empty filename and is ignored.
/// On any error the partially written file is removed and the text fields read so far
/// are handed back with the error.
pub async fn process_upload_form(
    mut multipart: Multipart,
    staging_dir: &Path,
    config: FileFieldConfig<'_>,
) -> Result<UploadOutcome, UploadFailure> {
    let mut outcome = UploadOutcome::default();
    match read_fields(&mut multipart, staging_dir, config, &mut outcome).await {
        Ok(()) => Ok(outcome),
        Err(error) => {
            outcome.discard().await;
            Err(UploadFailure {
                error,
                partial: outcome,
            })
        }
    }
}

async fn read_fields(
    multipart: &mut Multipart,
    staging_dir: &Path,
    config: FileFieldConfig<'_>,
    outcome: &mut UploadOutcome,
) -> UploadResult<()> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|err| UploadError::Malformed(err.to_string()))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        let Some(file_name) = field.file_name().map(str::to_string) else {
            let value = field
                .text()
                .await
                .map_err(|err| UploadError::Malformed(err.to_string()))?;
            outcome
                .text_fields
                .entry(field_name)
                .or_default()
                .push(value);
            continue;
        };

        if file_name.trim().is_empty() {
            continue;
        }
        if field_name != config.field_name {
            return Err(UploadError::UnexpectedFile { field_name });
        }
        if outcome.file.is_some() {
            return Err(UploadError::DuplicateFile { field_name });
        }

        let extension = extension_of(&file_name);
        if !config
            .allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&extension))
        {
            return Err(UploadError::UnsupportedType);
        }

        ensure_directory(staging_dir).await?;
        let staged_path = staging_dir.join(format!("upload.{extension}"));
        let mut file = File::create(&staged_path)
            .await
            .map_err(|err| UploadError::Io(err.to_string()))?;

        // Registered before streaming so that `discard` also removes partial writes.
        outcome.file = Some(StagedFile {
            original_name: display_name(&file_name, &extension),
            extension,
            staged_path,
            file_size: 0,
        });

        let mut total_bytes: u64 = 0;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|err| UploadError::Malformed(err.to_string()))?
        {
            total_bytes += chunk.len() as u64;
            if total_bytes > config.max_bytes {
                return Err(UploadError::TooLarge {
                    max_bytes: config.max_bytes,
                });
            }
            file.write_all(&chunk)
                .await
                .map_err(|err| UploadError::Io(err.to_string()))?;
        }
        file.flush()
            .await
            .map_err(|err| UploadError::Io(err.to_string()))?;

        if let Some(staged) = outcome.file.as_mut() {
            staged.file_size = total_bytes;
        }
    }

    Ok(())
}

/// Lowercased extension of the last path component, empty when there is none.
pub fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

fn display_name(file_name: &str, extension: &str) -> String {
    let sanitized = sanitize_filename::sanitize(file_name);
    if sanitized.trim().is_empty() {
        format!("ficheiro.{extension}")
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        extract::FromRequest,
        http::{Request, header},
    };

    use super::*;

    const BOUNDARY: &str = "X-TFC-BOUNDARY";
    const ALLOWED: &[&str] = &["pdf", "zip", "docx"];

    fn config(max_bytes: u64) -> FileFieldConfig<'static> {
        FileFieldConfig {
            field_name: "file",
            allowed_extensions: ALLOWED,
            max_bytes,
        }
    }

    fn text_part(name: &str, value: &str) -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        )
    }

    fn file_part(name: &str, file_name: &str, content: &str) -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n{content}\r\n"
        )
    }

    async fn multipart(parts: &[String]) -> Multipart {
        let mut body = parts.concat();
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        let request = Request::builder()
            .method("POST")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        Multipart::from_request(request, &()).await.unwrap()
    }

    #[tokio::test]
    async fn stages_file_and_collects_text_fields() {
        let dir = tempfile::tempdir().unwrap();
        let form = multipart(&[
            text_part("title", "Redes Neurais"),
            file_part("file", "Relatorio Final.pdf", "%PDF-1.7 body"),
            text_part("keywords", "ia, redes"),
        ])
        .await;

        let outcome = process_upload_form(form, dir.path(), config(1024))
            .await
            .unwrap();

        assert_eq!(outcome.first_text("title"), Some("Redes Neurais"));
        assert_eq!(outcome.first_text("keywords"), Some("ia, redes"));
        let file = outcome.file.expect("file staged");
        assert_eq!(file.original_name, "Relatorio Final.pdf");
        assert_eq!(file.extension, "pdf");
        assert_eq!(file.file_size, 13);
        assert_eq!(
            std::fs::read_to_string(&file.staged_path).unwrap(),
            "%PDF-1.7 body"
        );
    }

    #[tokio::test]
    async fn empty_file_input_is_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let form = multipart(&[text_part("title", "T"), file_part("file", "", "")]).await;

        let outcome = process_upload_form(form, dir.path(), config(1024))
            .await
            .unwrap();
        assert!(outcome.file.is_none());
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("job");
        let form = multipart(&[file_part("file", "big.pdf", &"a".repeat(64))]).await;

        let err = process_upload_form(form, &staging, config(16))
            .await
            .unwrap_err()
            .error;
        assert!(matches!(err, UploadError::TooLarge { max_bytes: 16 }));
        assert!(!staging.join("upload.pdf").exists());
    }

    #[tokio::test]
    async fn disallowed_extension_is_rejected_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("job");
        let form = multipart(&[file_part("file", "malware.exe", "MZ")]).await;

        let err = process_upload_form(form, &staging, config(1024))
            .await
            .unwrap_err()
            .error;
        assert!(matches!(err, UploadError::UnsupportedType));
        assert_eq!(
            err.to_string(),
            "Apenas ficheiros PDF, ZIP ou DOCX são permitidos"
        );
        assert!(!staging.exists());
    }

    #[tokio::test]
    async fn second_file_is_rejected_keeping_earlier_text() {
        let dir = tempfile::tempdir().unwrap();
        let form = multipart(&[
            text_part("title", "Segurança em IoT"),
            text_part("keywords", "iot, redes"),
            file_part("file", "a.pdf", "%PDF-"),
            file_part("file", "b.pdf", "%PDF-"),
        ])
        .await;

        let failure = process_upload_form(form, dir.path(), config(1024))
            .await
            .unwrap_err();
        assert!(matches!(failure.error, UploadError::DuplicateFile { .. }));
        assert!(failure.partial.file.is_none());
        assert_eq!(failure.partial.first_text("title"), Some("Segurança em IoT"));
        assert_eq!(failure.partial.first_text("keywords"), Some("iot, redes"));
        assert!(!dir.path().join("upload.pdf").exists());
    }

    #[test]
    fn size_message_is_in_megabytes() {
        let err = UploadError::TooLarge {
            max_bytes: 50 * 1024 * 1024,
        };
        assert_eq!(err.to_string(), "Ficheiro muito grande. Máximo: 50MB");
        assert!(err.is_client_error());
        assert!(!UploadError::Io("disk".into()).is_client_error());
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(extension_of("Tese.DOCX"), "docx");
        assert_eq!(extension_of("sem_extensao"), "");
        assert_eq!(extension_of("arquivo.tar.zip"), "zip");
    }
}
