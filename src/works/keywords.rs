use sqlx::PgConnection;
use uuid::Uuid;

/// Splits a comma separated keyword list, trimming entries and keeping the first
/// occurrence of each exact text.
pub fn parse_keywords(input: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for candidate in input.split(',').map(str::trim) {
        if candidate.is_empty() || keywords.iter().any(|existing| existing == candidate) {
            continue;
        }
        keywords.push(candidate.to_string());
    }
    keywords
}

/// Merges several keyword inputs (one per form field) into a single deduplicated list.
pub fn merge_keyword_inputs<'a>(inputs: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let joined = inputs.into_iter().collect::<Vec<_>>().join(",");
    parse_keywords(&joined)
}

/// Looks up a keyword by exact text, creating it when missing.
///
/// The unique constraint on `keywords.text` plus the upsert keeps a single row per text
/// even when two submissions race on the same new keyword.
pub async fn find_or_create_keyword(conn: &mut PgConnection, text: &str) -> sqlx::Result<Uuid> {
    sqlx::query_scalar(
        "INSERT INTO keywords (id, text) VALUES ($1, $2)
         ON CONFLICT ON CONSTRAINT keywords_text_key DO UPDATE SET text = EXCLUDED.text
         RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(text)
    .fetch_one(conn)
    .await
}

pub async fn link_keywords(
    conn: &mut PgConnection,
    work_id: Uuid,
    keywords: &[String],
) -> sqlx::Result<()> {
    for keyword in keywords {
        let keyword_id = find_or_create_keyword(&mut *conn, keyword).await?;
        sqlx::query(
            "INSERT INTO tfc_keywords (tfc_id, keyword_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(work_id)
        .bind(keyword_id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_trims_and_drops_empty_entries() {
        assert_eq!(
            parse_keywords(" IA, Machine Learning ,, ,Redes "),
            vec!["IA", "Machine Learning", "Redes"]
        );
    }

    #[test]
    fn deduplicates_exact_matches_only() {
        assert_eq!(parse_keywords("IA, IA,ia , IA"), vec!["IA", "ia"]);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(parse_keywords("").is_empty());
        assert!(parse_keywords(" , ,").is_empty());
    }

    #[test]
    fn merges_repeated_fields() {
        let merged = merge_keyword_inputs(["IA, Visão", "Visão,Robótica"]);
        assert_eq!(merged, vec!["IA", "Visão", "Robótica"]);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn same_text_resolves_to_one_row(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let first = find_or_create_keyword(&mut *conn, "Redes").await.unwrap();
        let again = find_or_create_keyword(&mut *conn, "Redes").await.unwrap();
        let other = find_or_create_keyword(&mut *conn, "redes").await.unwrap();

        assert_eq!(first, again);
        assert_ne!(first, other);
        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM keywords")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(rows, 2);
    }
}
