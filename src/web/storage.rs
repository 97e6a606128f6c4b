use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use axum::{
    Json,
    extract::{Path as AxumPath, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::{error, warn};
use uuid::Uuid;

use crate::web::{ApiMessage, AppState, json_error, templates::percent_encode};

const STAGING_DIR: &str = ".staging";

/// Local-directory object store. Keys are flat file names under `root`.
#[derive(Clone, Debug)]
pub struct ObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl ObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub async fn ensure_root(&self) -> Result<()> {
        tokio::fs::create_dir_all(self.root.join(STAGING_DIR))
            .await
            .with_context(|| format!("failed to ensure storage root at {}", self.root.display()))
    }

    /// A fresh per-request directory for multipart staging.
    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_DIR).join(Uuid::new_v4().to_string())
    }

    /// Moves a staged file into the store under `key`.
    pub async fn put(&self, staged: &Path, key: &str) -> Result<()> {
        let target = self.object_path(key)?;
        if tokio::fs::rename(staged, &target).await.is_err() {
            tokio::fs::copy(staged, &target)
                .await
                .with_context(|| format!("failed to copy upload into object {key}"))?;
            let _ = tokio::fs::remove_file(staged).await;
        }
        Ok(())
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/files/{}", self.public_base_url, key)
    }

    fn object_path(&self, key: &str) -> Result<PathBuf> {
        if !is_valid_object_key(key) {
            return Err(anyhow!("invalid object key `{key}`"));
        }
        Ok(self.root.join(key))
    }

    /// Reads a stored object. A missing object surfaces as an `io::ErrorKind::NotFound` source.
    pub async fn open(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.object_path(key)?;
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read object {key}"))
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        let path = self.object_path(key)?;
        tokio::fs::remove_file(&path)
            .await
            .with_context(|| format!("failed to delete object {key}"))
    }

    /// Removes a staging directory left behind by a request.
    pub async fn clear_staging(&self, dir: &Path) {
        if let Err(err) = tokio::fs::remove_dir_all(dir).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(?err, dir = %dir.display(), "failed to clear staging directory");
            }
        }
    }
}

/// `{unix_millis}_{random}.{ext}`
pub fn random_object_key(extension: &str) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}.{}",
        Utc::now().timestamp_millis(),
        &random[..12],
        extension.to_ascii_lowercase()
    )
}

pub fn is_valid_object_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

pub fn content_type_for(file_name: &str) -> mime::Mime {
    match crate::web::uploads::extension_of(file_name).as_str() {
        "pdf" => mime::APPLICATION_PDF,
        "zip" => "application/zip".parse().unwrap_or(mime::APPLICATION_OCTET_STREAM),
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            .parse()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM),
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            .parse()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM),
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

/// Builds a `Content-Disposition` value with an ASCII fallback and an RFC 5987 UTF-8 name.
pub fn content_disposition(disposition: &str, file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let encoded = percent_encode(file_name);

    format!("{disposition}; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

pub fn is_missing_object(err: &anyhow::Error) -> bool {
    err.downcast_ref::<std::io::Error>()
        .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound)
}

/// Wraps object bytes with the content type and disposition for `filename`.
pub fn file_response(
    bytes: Vec<u8>,
    disposition: &str,
    filename: &str,
) -> Result<Response, (StatusCode, Json<ApiMessage>)> {
    let mut headers = HeaderMap::new();
    let content_type = HeaderValue::from_str(content_type_for(filename).as_ref())
        .map_err(|_| json_error(StatusCode::INTERNAL_SERVER_ERROR, "Tipo de ficheiro inválido."))?;
    headers.insert(header::CONTENT_TYPE, content_type);
    let disposition = HeaderValue::from_str(&content_disposition(disposition, filename))
        .map_err(|_| json_error(StatusCode::INTERNAL_SERVER_ERROR, "Nome de ficheiro inválido."))?;
    headers.insert(header::CONTENT_DISPOSITION, disposition);

    Ok((headers, bytes).into_response())
}

/// Public object URL: `GET /files/:key`.
pub async fn serve_object(State(state): State<AppState>, AxumPath(key): AxumPath<String>) -> Response {
    if !is_valid_object_key(&key) {
        return json_error(StatusCode::NOT_FOUND, "Ficheiro não encontrado.").into_response();
    }

    match state.store().open(&key).await {
        Ok(bytes) => file_response(bytes, "inline", &key).unwrap_or_else(IntoResponse::into_response),
        Err(err) if is_missing_object(&err) => {
            json_error(StatusCode::NOT_FOUND, "Ficheiro não encontrado.").into_response()
        }
        Err(err) => {
            error!(?err, %key, "failed to read stored object");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Erro ao ler o ficheiro.").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_keys_keep_extension_and_are_valid() {
        let key = random_object_key("PDF");
        assert!(key.ends_with(".pdf"));
        assert!(is_valid_object_key(&key));
        let (millis, rest) = key.split_once('_').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(rest.len(), 12 + ".pdf".len());
        assert_ne!(key, random_object_key("pdf"));
    }

    #[test]
    fn traversal_keys_are_rejected() {
        assert!(!is_valid_object_key("../secret"));
        assert!(!is_valid_object_key("a/b.pdf"));
        assert!(!is_valid_object_key(".staging"));
        assert!(!is_valid_object_key(""));
        assert!(is_valid_object_key("1700000000000_abcdef123456.docx"));
    }

    #[test]
    fn public_url_uses_base() {
        let store = ObjectStore::new("/tmp/x", "https://tfc.example.pt");
        assert_eq!(
            store.public_url("k.pdf"),
            "https://tfc.example.pt/files/k.pdf"
        );
        let relative = ObjectStore::new("/tmp/x", "");
        assert_eq!(relative.public_url("k.pdf"), "/files/k.pdf");
    }

    #[test]
    fn content_types_follow_extension() {
        assert_eq!(content_type_for("a.PDF"), mime::APPLICATION_PDF);
        assert_eq!(content_type_for("a.zip").as_ref(), "application/zip");
        assert!(content_type_for("a.docx").as_ref().contains("wordprocessingml"));
        assert_eq!(content_type_for("a.bin"), mime::APPLICATION_OCTET_STREAM);
    }

    #[test]
    fn disposition_encodes_non_ascii_names() {
        let value = content_disposition("attachment", "Relatório \"final\".pdf");
        assert_eq!(
            value,
            "attachment; filename=\"Relat_rio _final_.pdf\"; filename*=UTF-8''Relat%C3%B3rio%20%22final%22.pdf"
        );
        assert!(HeaderValue::from_str(&value).is_ok());
    }

    #[tokio::test]
    async fn put_open_and_delete_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::new(dir.path(), "");
        store.ensure_root().await.unwrap();

        let staging = store.staging_dir();
        tokio::fs::create_dir_all(&staging).await.unwrap();
        let staged = staging.join("upload.pdf");
        tokio::fs::write(&staged, b"%PDF-1.4").await.unwrap();

        store.put(&staged, "1_abc.pdf").await.unwrap();
        assert!(!staged.exists());
        assert_eq!(store.open("1_abc.pdf").await.unwrap(), b"%PDF-1.4");

        store.delete("1_abc.pdf").await.unwrap();
        assert!(store.open("1_abc.pdf").await.is_err());

        store.clear_staging(&staging).await;
        assert!(!staging.exists());
    }

    #[tokio::test]
    async fn missing_objects_are_recognised() {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::new(dir.path(), "");
        let err = store.open("1_missing.pdf").await.unwrap_err();
        assert!(is_missing_object(&err));

        let invalid = store.open("../escape.pdf").await.unwrap_err();
        assert!(!is_missing_object(&invalid));
    }

    #[test]
    fn file_response_sets_type_and_disposition() {
        let response = file_response(b"PK".to_vec(), "attachment", "Anexos TFC.zip").unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Anexos TFC.zip\"; filename*=UTF-8''Anexos%20TFC.zip"
        );
    }
}
