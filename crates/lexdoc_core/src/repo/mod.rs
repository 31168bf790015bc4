use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::domain::{Chunk, ChunkMetadata};
use crate::error::AppError;

/// Chunk row without its vector; used by substring search where vectors may be unreadable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkTextRow {
    pub document_id: String,
    pub chunk_index: u32,
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// Cached derived result (analysis, comparison) stored as a JSON payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredArtifact {
    pub kind: String,
    pub key: String,
    pub content_sha256: String,
    pub payload: String,
    pub computed_at: String,
}

/// Delete every chunk of `document_id` and insert `chunks` in one transaction.
///
/// Either the full new set is visible afterwards or the previous set is kept.
pub fn replace_document_chunks(
    conn: &mut Connection,
    document_id: &str,
    chunks: &[Chunk],
) -> Result<(), AppError> {
    if let Some(stray) = chunks.iter().find(|c| c.document_id != document_id) {
        return Err(AppError::new(
            "DB_CHUNK_INVALID",
            "Chunk belongs to a different document",
        )
        .with_details(format!(
            "expected={document_id}; got={}; chunk_index={}",
            stray.document_id, stray.chunk_index
        )));
    }

    let tx = conn.transaction().map_err(|e| {
        AppError::new("DB_TX_FAILED", "Failed to start chunk replace transaction")
            .with_details(e.to_string())
    })?;

    tx.execute(
        "DELETE FROM document_chunks WHERE document_id = ?1",
        [document_id],
    )
    .map_err(|e| {
        AppError::new("DB_DELETE_FAILED", "Failed to delete existing chunks")
            .with_details(format!("document_id={document_id}; err={e}"))
    })?;

    {
        let mut stmt = tx
            .prepare(
                r#"
          INSERT INTO document_chunks(document_id, chunk_index, content, embedding, metadata, created_at)
          VALUES (?1, ?2, ?3, ?4, ?5, strftime('%Y-%m-%dT%H:%M:%fZ','now'))
          "#,
            )
            .map_err(|e| {
                AppError::new("DB_INSERT_FAILED", "Failed to prepare chunk insert")
                    .with_details(e.to_string())
            })?;

        for c in chunks {
            let embedding = serde_json::to_string(&c.embedding).map_err(|e| {
                AppError::new("DB_INSERT_FAILED", "Failed to encode chunk embedding")
                    .with_details(e.to_string())
            })?;
            let metadata = serde_json::to_string(&c.metadata).map_err(|e| {
                AppError::new("DB_INSERT_FAILED", "Failed to encode chunk metadata")
                    .with_details(e.to_string())
            })?;
            stmt.execute(params![
                document_id,
                c.chunk_index,
                c.text,
                embedding,
                metadata
            ])
            .map_err(|e| {
                AppError::new("DB_INSERT_FAILED", "Failed to insert chunk")
                    .with_details(format!(
                        "document_id={document_id}; chunk_index={}; err={e}",
                        c.chunk_index
                    ))
            })?;
        }
    }

    tx.commit().map_err(|e| {
        AppError::new("DB_TX_FAILED", "Failed to commit chunk replace transaction")
            .with_details(e.to_string())
    })
}

pub fn delete_document_chunks(conn: &Connection, document_id: &str) -> Result<usize, AppError> {
    conn.execute(
        "DELETE FROM document_chunks WHERE document_id = ?1",
        [document_id],
    )
    .map_err(|e| {
        AppError::new("DB_DELETE_FAILED", "Failed to delete chunks")
            .with_details(format!("document_id={document_id}; err={e}"))
    })
}

pub fn count_document_chunks(conn: &Connection, document_id: &str) -> Result<i64, AppError> {
    conn.query_row(
        "SELECT COUNT(*) FROM document_chunks WHERE document_id = ?1",
        [document_id],
        |row| row.get(0),
    )
    .map_err(|e| {
        AppError::new("DB_QUERY_FAILED", "Failed to count chunks")
            .with_details(format!("document_id={document_id}; err={e}"))
    })
}

pub fn list_document_chunks(conn: &Connection, document_id: &str) -> Result<Vec<Chunk>, AppError> {
    list_chunks(conn, Some(&[document_id.to_string()]))
}

/// Load chunks with vectors, optionally restricted to `document_ids`.
///
/// Ordered by `document_id`, then `chunk_index`. An empty filter matches nothing.
pub fn list_chunks(
    conn: &Connection,
    document_ids: Option<&[String]>,
) -> Result<Vec<Chunk>, AppError> {
    let mut sql = String::from(
        "SELECT document_id, chunk_index, content, embedding, metadata FROM document_chunks",
    );
    let mut args: Vec<Value> = Vec::new();
    if let Some(ids) = document_ids {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sql.push_str(" WHERE document_id IN (");
        sql.push_str(&placeholders(1, ids.len()));
        sql.push(')');
        args.extend(ids.iter().map(|id| Value::Text(id.clone())));
    }
    sql.push_str(" ORDER BY document_id ASC, chunk_index ASC");

    let mut stmt = conn.prepare(&sql).map_err(|e| {
        AppError::new("DB_QUERY_FAILED", "Failed to prepare chunks query")
            .with_details(e.to_string())
    })?;
    let rows = stmt
        .query_map(params_from_iter(args), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })
        .map_err(|e| {
            AppError::new("DB_QUERY_FAILED", "Failed to query chunks").with_details(e.to_string())
        })?;

    let mut out = Vec::new();
    for r in rows {
        let (document_id, chunk_index, text, embedding_json, metadata_json) = r.map_err(|e| {
            AppError::new("DB_QUERY_FAILED", "Failed to read chunk row").with_details(e.to_string())
        })?;
        let embedding: Vec<f32> = serde_json::from_str(&embedding_json).map_err(|e| {
            AppError::new("DB_ROW_DECODE_FAILED", "Failed to decode chunk embedding")
                .with_details(format!(
                    "document_id={document_id}; chunk_index={chunk_index}; err={e}"
                ))
        })?;
        let metadata = decode_metadata(&document_id, chunk_index, &metadata_json)?;
        out.push(Chunk {
            document_id,
            chunk_index,
            text,
            embedding,
            metadata,
        });
    }
    Ok(out)
}

/// Case-insensitive substring match over chunk text. Never touches the vector column.
pub fn search_chunk_text(
    conn: &Connection,
    needle: &str,
    document_ids: Option<&[String]>,
    limit: usize,
) -> Result<Vec<ChunkTextRow>, AppError> {
    let mut sql = String::from(
        "SELECT document_id, chunk_index, content, metadata FROM document_chunks \
         WHERE instr(lower(content), lower(?1)) > 0",
    );
    let mut args: Vec<Value> = vec![Value::Text(needle.to_string())];
    if let Some(ids) = document_ids {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sql.push_str(" AND document_id IN (");
        sql.push_str(&placeholders(2, ids.len()));
        sql.push(')');
        args.extend(ids.iter().map(|id| Value::Text(id.clone())));
    }
    sql.push_str(&format!(
        " ORDER BY chunk_index ASC, document_id ASC LIMIT ?{}",
        args.len() + 1
    ));
    args.push(Value::Integer(limit.min(i64::MAX as usize) as i64));

    let mut stmt = conn.prepare(&sql).map_err(|e| {
        AppError::new("DB_QUERY_FAILED", "Failed to prepare chunk text search")
            .with_details(e.to_string())
    })?;
    let rows = stmt
        .query_map(params_from_iter(args), text_row)
        .map_err(|e| {
            AppError::new("DB_QUERY_FAILED", "Failed to search chunk text")
                .with_details(e.to_string())
        })?;

    let mut out = Vec::new();
    for r in rows {
        let (document_id, chunk_index, content, metadata_json) = r.map_err(|e| {
            AppError::new("DB_QUERY_FAILED", "Failed to read chunk row").with_details(e.to_string())
        })?;
        // Broken metadata must not hide a text match.
        let metadata = decode_metadata(&document_id, chunk_index, &metadata_json).unwrap_or_default();
        out.push(ChunkTextRow {
            document_id,
            chunk_index,
            content,
            metadata,
        });
    }
    Ok(out)
}

pub fn get_artifact(
    conn: &Connection,
    kind: &str,
    key: &str,
) -> Result<Option<StoredArtifact>, AppError> {
    conn.query_row(
        "SELECT kind, key, content_sha256, payload, computed_at FROM ai_artifacts WHERE kind = ?1 AND key = ?2",
        params![kind, key],
        |row| {
            Ok(StoredArtifact {
                kind: row.get(0)?,
                key: row.get(1)?,
                content_sha256: row.get(2)?,
                payload: row.get(3)?,
                computed_at: row.get(4)?,
            })
        },
    )
    .optional()
    .map_err(|e| {
        AppError::new("DB_QUERY_FAILED", "Failed to read cached artifact")
            .with_details(format!("kind={kind}; key={key}; err={e}"))
    })
}

pub fn put_artifact(conn: &Connection, artifact: &StoredArtifact) -> Result<(), AppError> {
    conn.execute(
        r#"
      INSERT INTO ai_artifacts(kind, key, content_sha256, payload, computed_at)
      VALUES (?1, ?2, ?3, ?4, ?5)
      ON CONFLICT(kind, key) DO UPDATE SET
        content_sha256 = excluded.content_sha256,
        payload = excluded.payload,
        computed_at = excluded.computed_at
      "#,
        params![
            artifact.kind,
            artifact.key,
            artifact.content_sha256,
            artifact.payload,
            artifact.computed_at
        ],
    )
    .map_err(|e| {
        AppError::new("DB_INSERT_FAILED", "Failed to write cached artifact")
            .with_details(format!("kind={}; key={}; err={e}", artifact.kind, artifact.key))
    })?;
    Ok(())
}

pub fn delete_artifact(conn: &Connection, kind: &str, key: &str) -> Result<bool, AppError> {
    let n = conn
        .execute(
            "DELETE FROM ai_artifacts WHERE kind = ?1 AND key = ?2",
            params![kind, key],
        )
        .map_err(|e| {
            AppError::new("DB_DELETE_FAILED", "Failed to delete cached artifact")
                .with_details(format!("kind={kind}; key={key}; err={e}"))
        })?;
    Ok(n > 0)
}

fn text_row(row: &Row<'_>) -> rusqlite::Result<(String, u32, String, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn decode_metadata(
    document_id: &str,
    chunk_index: u32,
    raw: &str,
) -> Result<ChunkMetadata, AppError> {
    serde_json::from_str(raw).map_err(|e| {
        AppError::new("DB_ROW_DECODE_FAILED", "Failed to decode chunk metadata")
            .with_details(format!(
                "document_id={document_id}; chunk_index={chunk_index}; err={e}"
            ))
    })
}

/// `?{start}, ?{start+1}, ...` for `n` positional parameters.
fn placeholders(start: usize, n: usize) -> String {
    (start..start + n)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_numbered_from_start() {
        assert_eq!(placeholders(2, 3), "?2, ?3, ?4");
        assert_eq!(placeholders(1, 1), "?1");
    }
}
