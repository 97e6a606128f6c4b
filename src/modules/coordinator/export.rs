use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook};

use crate::{web::templates::format_datetime, works::Work};

pub const EXPORT_FILE_NAME: &str = "tfcs.xlsx";

const HEADERS: [(&str, f64); 9] = [
    ("Título", 48.0),
    ("Autor", 28.0),
    ("Tipo", 14.0),
    ("Estado", 16.0),
    ("Área de investigação", 28.0),
    ("Ano", 8.0),
    ("Orientador", 28.0),
    ("Palavras-chave", 36.0),
    ("Submetido em", 18.0),
];

fn row_values(work: &Work) -> [String; 9] {
    [
        work.title.clone(),
        work.author.clone(),
        work.work_type.label_pt().to_string(),
        work.status.label_pt().to_string(),
        work.area_name().unwrap_or_default().to_string(),
        work.year.to_string(),
        work.advisor.clone().unwrap_or_default(),
        work.keywords.join(", "),
        format_datetime(&work.created_at),
    ]
}

/// One sheet, one row per work, in the order given.
pub fn works_workbook(works: &[Work]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("TFCs").context("failed to name worksheet")?;

    let header_format = Format::new().set_bold();
    for (col, (header, width)) in HEADERS.iter().enumerate() {
        let col = col as u16;
        worksheet
            .write_string_with_format(0, col, *header, &header_format)
            .context("failed to write header")?;
        worksheet
            .set_column_width(col, *width)
            .context("failed to size column")?;
    }

    for (idx, work) in works.iter().enumerate() {
        let row = (idx + 1) as u32;
        for (col, value) in row_values(work).iter().enumerate() {
            worksheet
                .write_string(row, col as u16, value)
                .context("failed to write work row")?;
        }
    }

    workbook
        .save_to_buffer()
        .context("failed to serialise workbook")
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use zip::ZipArchive;

    use super::*;
    use crate::works::{WorkStatus, fixtures::work};

    fn shared_strings(bytes: Vec<u8>) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("xlsx is a zip");
        let mut entry = archive
            .by_name("xl/sharedStrings.xml")
            .expect("shared strings part");
        let mut xml = String::new();
        entry.read_to_string(&mut xml).expect("read xml");
        xml
    }

    #[test]
    fn workbook_lists_headers_and_rows() {
        let mut tfc = work("Redes Mesh", WorkStatus::UnderReview, Some("Redes"), 2024);
        tfc.keywords = vec!["mesh".into(), "wifi".into()];
        tfc.advisor = Some("Prof. Rui Alves".into());

        let xml = shared_strings(works_workbook(&[tfc]).expect("workbook"));
        assert!(xml.contains("Palavras-chave"));
        assert!(xml.contains("Redes Mesh"));
        assert!(xml.contains("Em Validação"));
        assert!(xml.contains("mesh, wifi"));
        assert!(xml.contains("Prof. Rui Alves"));
    }

    #[test]
    fn empty_export_still_has_headers() {
        let bytes = works_workbook(&[]).expect("workbook");
        assert!(bytes.starts_with(b"PK"));
        assert!(shared_strings(bytes).contains("Título"));
    }
}
