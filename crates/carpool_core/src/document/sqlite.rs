//! Document collection stored as JSON text in the SQLite `documents` table.

use super::collection::surrogate_key_of;
use super::{matches_filter, CollectionError, CollectionResult, Document, DocumentCollection};
use super::DocumentKey;
use rusqlite::{params, Connection};
use serde_json::Value;

/// One named collection inside a migrated database.
pub struct SqliteCollection<'conn> {
    conn: &'conn Connection,
    name: String,
}

impl<'conn> SqliteCollection<'conn> {
    /// `conn` must come from `db::open_db*` so the `documents` table exists.
    pub fn new(conn: &'conn Connection, name: impl Into<String>) -> Self {
        Self {
            conn,
            name: name.into(),
        }
    }
}

impl DocumentCollection for SqliteCollection<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn insert_one(&self, doc: &Document) -> CollectionResult<DocumentKey> {
        let key = surrogate_key_of(doc)?;
        let body = encode_body(doc)?;
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO documents (collection, doc_key, seq, body)
             VALUES (
                ?1,
                ?2,
                (SELECT COALESCE(MAX(seq), 0) + 1 FROM documents WHERE collection = ?1),
                ?3
             );",
            params![self.name.as_str(), key.to_hex(), body],
        )?;
        if inserted == 0 {
            return Err(CollectionError::DuplicateKey(key));
        }
        Ok(key)
    }

    fn find_one(&self, key: &DocumentKey) -> CollectionResult<Option<Document>> {
        let mut stmt = self.conn.prepare(
            "SELECT body FROM documents WHERE collection = ?1 AND doc_key = ?2;",
        )?;
        let mut rows = stmt.query(params![self.name.as_str(), key.to_hex()])?;
        match rows.next()? {
            Some(row) => Ok(Some(decode_body(&row.get::<_, String>(0)?)?)),
            None => Ok(None),
        }
    }

    fn find(&self, filter: &Document) -> CollectionResult<Vec<Document>> {
        let mut stmt = self
            .conn
            .prepare("SELECT body FROM documents WHERE collection = ?1 ORDER BY seq ASC;")?;
        let mut rows = stmt.query([self.name.as_str()])?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            let doc = decode_body(&row.get::<_, String>(0)?)?;
            if matches_filter(&doc, filter) {
                documents.push(doc);
            }
        }
        Ok(documents)
    }

    fn replace_one(&self, key: &DocumentKey, doc: &Document) -> CollectionResult<u64> {
        let body = encode_body(doc)?;
        let changed = self.conn.execute(
            "UPDATE documents SET body = ?3 WHERE collection = ?1 AND doc_key = ?2;",
            params![self.name.as_str(), key.to_hex(), body],
        )?;
        Ok(changed as u64)
    }

    fn delete_one(&self, key: &DocumentKey) -> CollectionResult<u64> {
        let changed = self.conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND doc_key = ?2;",
            params![self.name.as_str(), key.to_hex()],
        )?;
        Ok(changed as u64)
    }
}

fn encode_body(doc: &Document) -> CollectionResult<String> {
    serde_json::to_string(doc).map_err(|err| CollectionError::Corrupt(err.to_string()))
}

fn decode_body(body: &str) -> CollectionResult<Document> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(doc)) => Ok(doc),
        Ok(other) => Err(CollectionError::Corrupt(format!(
            "expected a JSON object, found `{other}`"
        ))),
        Err(err) => Err(CollectionError::Corrupt(err.to_string())),
    }
}
