use crate::schema::DatasetRecord;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

pub fn open(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(db_path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    init(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init(&conn)?;
    Ok(conn)
}

fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS datasets (
          id TEXT PRIMARY KEY,
          title TEXT NOT NULL,
          organization TEXT NOT NULL,
          url TEXT NOT NULL,
          jurisdiction TEXT NOT NULL,
          province TEXT,
          city TEXT,
          last_updated TEXT,
          verification_source TEXT NOT NULL,
          tags_json TEXT NOT NULL,
          raw_json TEXT NOT NULL,
          first_seen TEXT NOT NULL,
          last_seen TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_datasets_first_seen ON datasets(first_seen);
        "#,
    )?;
    Ok(())
}

/// Inserts or refreshes `dataset`. Returns `true` when the id was not seen before.
pub fn upsert_dataset(conn: &Connection, dataset: &DatasetRecord) -> Result<bool> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM datasets WHERE id = ?1",
            params![dataset.id],
            |row| row.get(0),
        )
        .optional()?;

    let tags_json = serde_json::to_string(&dataset.tags)?;
    let raw_json = serde_json::to_string(dataset)?;

    conn.execute(
        r#"
        INSERT INTO datasets (
          id, title, organization, url, jurisdiction, province, city,
          last_updated, verification_source, tags_json, raw_json, first_seen, last_seen
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
        ON CONFLICT(id) DO UPDATE SET
          title=excluded.title,
          organization=excluded.organization,
          url=excluded.url,
          jurisdiction=excluded.jurisdiction,
          province=excluded.province,
          city=excluded.city,
          last_updated=excluded.last_updated,
          verification_source=excluded.verification_source,
          tags_json=excluded.tags_json,
          raw_json=excluded.raw_json,
          last_seen=excluded.last_seen
        "#,
        params![
            dataset.id,
            dataset.title,
            dataset.organization,
            dataset.url,
            dataset.jurisdiction.to_string(),
            dataset.province,
            dataset.city,
            dataset.last_updated,
            dataset.verification_source,
            tags_json,
            raw_json,
            dataset.fetched_at,
        ],
    )?;

    Ok(existing.is_none())
}

/// Archives every dataset in one transaction and returns how many were new.
pub fn archive_all<'a>(
    conn: &mut Connection,
    datasets: impl IntoIterator<Item = &'a DatasetRecord>,
) -> Result<usize> {
    let tx = conn.transaction()?;
    let mut new_count = 0;
    for dataset in datasets {
        if upsert_dataset(&tx, dataset)? {
            new_count += 1;
        }
    }
    tx.commit()?;
    Ok(new_count)
}

pub fn dataset_count(conn: &Connection) -> Result<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM datasets", [], |row| row.get(0))?;
    Ok(count as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Jurisdiction;

    fn dataset(id: &str, fetched_at: &str) -> DatasetRecord {
        DatasetRecord {
            id: id.to_string(),
            title: "WSIB Claims Data".to_string(),
            description: String::new(),
            organization: "Ontario".to_string(),
            url: format!("https://data.ontario.ca/dataset/{id}"),
            last_updated: None,
            tags: vec!["wsib".to_string()],
            verified: true,
            verification_source: "data.ontario.ca".to_string(),
            jurisdiction: Jurisdiction::Provincial,
            province: Some("ON".to_string()),
            city: None,
            fetched_at: fetched_at.to_string(),
        }
    }

    #[test]
    fn second_upsert_of_same_id_is_not_new() {
        let conn = open_in_memory().unwrap();
        assert!(upsert_dataset(&conn, &dataset("a", "2026-10-15T00:00:00Z")).unwrap());
        assert!(!upsert_dataset(&conn, &dataset("a", "2026-10-16T00:00:00Z")).unwrap());
        assert_eq!(dataset_count(&conn).unwrap(), 1);

        let (first, last): (String, String) = conn
            .query_row(
                "SELECT first_seen, last_seen FROM datasets WHERE id = 'a'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(first, "2026-10-15T00:00:00Z");
        assert_eq!(last, "2026-10-16T00:00:00Z");
    }

    #[test]
    fn archive_all_counts_only_new_ids() {
        let mut conn = open_in_memory().unwrap();
        let batch = vec![dataset("a", "t1"), dataset("b", "t1")];
        assert_eq!(archive_all(&mut conn, &batch).unwrap(), 2);
        let batch = vec![dataset("b", "t2"), dataset("c", "t2")];
        assert_eq!(archive_all(&mut conn, &batch).unwrap(), 1);
    }

    #[test]
    fn open_creates_file_backed_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.db");
        let conn = open(&path).unwrap();
        upsert_dataset(&conn, &dataset("a", "t1")).unwrap();
        drop(conn);
        let conn = open(&path).unwrap();
        assert_eq!(dataset_count(&conn).unwrap(), 1);
    }
}
