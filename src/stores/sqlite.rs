//! Persistent vector store backed by SQLite with the `sqlite-vec` extension.

use std::mem::transmute;
use std::os::raw::c_char;
use std::path::Path;
use std::sync::OnceLock;

use async_trait::async_trait;
use tokio_rusqlite::{Connection, ffi, rusqlite};

use super::VectorStore;
use crate::types::{PassageMetadata, PassageRecord, RagError, ScoredPassage};

/// SQLite-backed passage store. The `passages` table carries text and
/// metadata; embeddings live in a `vec0` virtual table created at the first
/// upsert, once the embedding width is known.
#[derive(Clone)]
pub struct SqlitePassageStore {
    conn: Connection,
}

impl SqlitePassageStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, RagError> {
        register_sqlite_vec()?;
        let conn = Connection::open(path)
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;

        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.query_row("select vec_version()", [], |row| row.get::<_, String>(0))?;
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS passages (
                     id TEXT PRIMARY KEY,
                     content TEXT NOT NULL,
                     section TEXT NOT NULL,
                     page_start INTEGER NOT NULL,
                     page_end INTEGER NOT NULL,
                     citation TEXT NOT NULL,
                     chunk_summary TEXT NOT NULL
                 )",
            )?;
            Ok(())
        })
        .await
        .map_err(|err| RagError::Storage(err.to_string()))?;

        Ok(Self { conn })
    }
}

/// Registers sqlite-vec as an auto extension for every new connection.
/// Process-wide, one-shot.
fn register_sqlite_vec() -> Result<(), RagError> {
    static REGISTERED: OnceLock<Result<(), String>> = OnceLock::new();
    REGISTERED
        .get_or_init(|| unsafe {
            type SqliteExtensionInit = unsafe extern "C" fn(
                *mut ffi::sqlite3,
                *mut *mut c_char,
                *const ffi::sqlite3_api_routines,
            ) -> i32;

            let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
            let init_fn: SqliteExtensionInit =
                transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
            let rc = ffi::sqlite3_auto_extension(Some(init_fn));
            if rc == 0 {
                Ok(())
            } else {
                Err(format!("failed to register sqlite-vec extension (code {rc})"))
            }
        })
        .clone()
        .map_err(RagError::Storage)
}

fn embeddings_table_exists(conn: &rusqlite::Connection) -> Result<bool, rusqlite::Error> {
    let found = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'passage_embeddings'",
            [],
            |_| Ok(()),
        )
        .map(|_| true);
    match found {
        Ok(value) => Ok(value),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(false),
        Err(err) => Err(err),
    }
}

#[async_trait]
impl VectorStore for SqlitePassageStore {
    async fn upsert(&self, passages: Vec<PassageRecord>) -> Result<(), RagError> {
        if passages.is_empty() {
            return Ok(());
        }
        let dims = passages[0].embedding.len();
        let encoded: Result<Vec<(PassageRecord, String)>, RagError> = passages
            .into_iter()
            .map(|passage| {
                if passage.embedding.len() != dims {
                    return Err(RagError::Storage(format!(
                        "embedding length mismatch within batch: {} vs {dims}",
                        passage.embedding.len()
                    )));
                }
                let json = serde_json::to_string(&passage.embedding)
                    .map_err(|err| RagError::Storage(err.to_string()))?;
                Ok((passage, json))
            })
            .collect();
        let encoded = encoded?;

        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch(&format!(
                    "CREATE VIRTUAL TABLE IF NOT EXISTS passage_embeddings \
                     USING vec0(id TEXT PRIMARY KEY, embedding float[{dims}])"
                ))?;

                let tx = conn.transaction()?;
                for (passage, embedding_json) in &encoded {
                    tx.execute(
                        "INSERT INTO passages \
                         (id, content, section, page_start, page_end, citation, chunk_summary) \
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                        (
                            &passage.id,
                            &passage.text,
                            &passage.metadata.section,
                            passage.metadata.page_start,
                            passage.metadata.page_end,
                            &passage.metadata.citation,
                            &passage.metadata.chunk_summary,
                        ),
                    )?;
                    tx.execute(
                        "INSERT INTO passage_embeddings (id, embedding) VALUES (?1, ?2)",
                        (&passage.id, embedding_json),
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPassage>, RagError> {
        let embedding_json = serde_json::to_string(embedding)
            .map_err(|err| RagError::Storage(err.to_string()))?;

        self.conn
            .call(move |conn| -> Result<Vec<ScoredPassage>, rusqlite::Error> {
                if !embeddings_table_exists(conn)? {
                    return Ok(Vec::new());
                }

                let mut stmt = conn.prepare(&format!(
                    "SELECT p.content, p.citation, \
                     vec_distance_cosine(e.embedding, vec_f32(?1)) AS distance \
                     FROM passages p \
                     JOIN passage_embeddings e ON p.id = e.id \
                     ORDER BY distance ASC \
                     LIMIT {top_k}"
                ))?;

                let rows = stmt.query_map([&embedding_json], |row| {
                    Ok(ScoredPassage {
                        text: row.get(0)?,
                        citation: row.get(1)?,
                        distance: row.get(2)?,
                    })
                })?;

                rows.collect()
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn get_all_metadata(&self) -> Result<Vec<PassageMetadata>, RagError> {
        self.conn
            .call(|conn| -> Result<Vec<PassageMetadata>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT section, page_start, page_end, citation, chunk_summary \
                     FROM passages ORDER BY rowid",
                )?;

                let rows = stmt.query_map([], |row| {
                    Ok(PassageMetadata {
                        section: row.get(0)?,
                        page_start: row.get(1)?,
                        page_end: row.get(2)?,
                        citation: row.get(3)?,
                        chunk_summary: row.get(4)?,
                    })
                })?;

                rows.collect()
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn clear(&self) -> Result<usize, RagError> {
        self.conn
            .call(|conn| -> Result<usize, rusqlite::Error> {
                let deleted = conn.execute("DELETE FROM passages", [])?;
                if embeddings_table_exists(conn)? {
                    conn.execute("DELETE FROM passage_embeddings", [])?;
                }
                Ok(deleted)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn is_empty(&self) -> Result<bool, RagError> {
        self.conn
            .call(|conn| -> Result<bool, rusqlite::Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM passages", [], |row| row.get(0))?;
                Ok(count == 0)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(id: &str, text: &str, embedding: Vec<f32>) -> PassageRecord {
        PassageRecord {
            id: id.to_string(),
            text: text.to_string(),
            embedding,
            metadata: PassageMetadata {
                section: "Overview".to_string(),
                page_start: 1,
                page_end: 2,
                citation: "Overview (pp. 1–2)".to_string(),
                chunk_summary: format!("summary {id}"),
            },
        }
    }

    #[tokio::test]
    async fn round_trips_passages_and_searches_by_distance() {
        let dir = tempdir().unwrap();
        let store = SqlitePassageStore::open(dir.path().join("passages.sqlite"))
            .await
            .unwrap();

        assert!(store.is_empty().await.unwrap());
        assert!(store.query(&[1.0, 0.0, 0.0], 3).await.unwrap().is_empty());

        store
            .upsert(vec![
                record("a", "alpha text", vec![1.0, 0.0, 0.0]),
                record("b", "beta text", vec![0.0, 1.0, 0.0]),
            ])
            .await
            .unwrap();

        assert!(!store.is_empty().await.unwrap());
        let metadata = store.get_all_metadata().await.unwrap();
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata[0].citation, "Overview (pp. 1–2)");

        let hits = store.query(&[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "alpha text");
        assert!(hits[0].distance < hits[1].distance);

        assert_eq!(store.clear().await.unwrap(), 2);
        assert!(store.is_empty().await.unwrap());
    }
}
