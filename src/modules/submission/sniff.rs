use std::{fs, io::Read, path::Path};

use zip::ZipArchive;

const PDF_MAGIC: &[u8] = b"%PDF-";
const DOCX_BODY: &str = "word/document.xml";

#[derive(Debug, PartialEq, Eq)]
pub enum SniffError {
    NotPdf,
    NotZip,
    NotDocx,
    Unreadable(String),
}

impl std::fmt::Display for SniffError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SniffError::NotPdf => write!(f, "O ficheiro não é um PDF válido."),
            SniffError::NotZip => write!(f, "O ficheiro não é um arquivo ZIP válido."),
            SniffError::NotDocx => write!(f, "O ficheiro não é um documento DOCX válido."),
            SniffError::Unreadable(detail) => {
                write!(f, "Não foi possível ler o ficheiro enviado: {detail}")
            }
        }
    }
}

impl std::error::Error for SniffError {}

/// Checks that the staged content matches its extension. Blocking; run on the blocking pool.
pub fn sniff_file(path: &Path, extension: &str) -> Result<(), SniffError> {
    match extension {
        "pdf" => {
            let file = fs::File::open(path).map_err(|err| SniffError::Unreadable(err.to_string()))?;
            let mut head = Vec::with_capacity(PDF_MAGIC.len());
            file.take(PDF_MAGIC.len() as u64)
                .read_to_end(&mut head)
                .map_err(|err| SniffError::Unreadable(err.to_string()))?;
            if head == PDF_MAGIC {
                Ok(())
            } else {
                Err(SniffError::NotPdf)
            }
        }
        "zip" => open_archive(path).map(|_| ()).ok_or(SniffError::NotZip),
        "docx" => {
            let mut archive = open_archive(path).ok_or(SniffError::NotDocx)?;
            if archive.by_name(DOCX_BODY).is_ok() {
                Ok(())
            } else {
                Err(SniffError::NotDocx)
            }
        }
        _ => Err(SniffError::Unreadable(format!("extensão `{extension}` não suportada"))),
    }
}

fn open_archive(path: &Path) -> Option<ZipArchive<fs::File>> {
    let file = fs::File::open(path).ok()?;
    ZipArchive::new(file).ok()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;

    use super::*;

    fn write_zip(path: &Path, entry: &str) {
        let file = fs::File::create(path).expect("create zip");
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file(entry, SimpleFileOptions::default())
            .expect("zip start file");
        zip.write_all(b"<w:document/>").expect("write entry");
        zip.finish().expect("finish zip");
    }

    #[test]
    fn pdf_needs_magic_header() {
        let dir = tempdir().expect("temp dir");
        let good = dir.path().join("good.pdf");
        fs::write(&good, b"%PDF-1.7\n...").unwrap();
        assert_eq!(sniff_file(&good, "pdf"), Ok(()));

        let bad = dir.path().join("bad.pdf");
        fs::write(&bad, b"<html>").unwrap();
        assert_eq!(sniff_file(&bad, "pdf"), Err(SniffError::NotPdf));

        let short = dir.path().join("short.pdf");
        fs::write(&short, b"%P").unwrap();
        assert_eq!(sniff_file(&short, "pdf"), Err(SniffError::NotPdf));
    }

    #[test]
    fn docx_must_contain_document_body() {
        let dir = tempdir().expect("temp dir");
        let docx = dir.path().join("tese.docx");
        write_zip(&docx, "word/document.xml");
        assert_eq!(sniff_file(&docx, "docx"), Ok(()));

        let plain_zip = dir.path().join("codigo.docx");
        write_zip(&plain_zip, "src/main.rs");
        assert_eq!(sniff_file(&plain_zip, "docx"), Err(SniffError::NotDocx));
        assert_eq!(sniff_file(&plain_zip, "zip"), Ok(()));
    }

    #[test]
    fn zip_must_be_an_archive() {
        let dir = tempdir().expect("temp dir");
        let fake = dir.path().join("fake.zip");
        fs::write(&fake, b"not a zip").unwrap();
        assert_eq!(sniff_file(&fake, "zip"), Err(SniffError::NotZip));
    }
}
