//! Purchase guard: does any purchase or rental reference a node or one of its
//! descendants?
//!
//! The check is one statement over both ledgers, so it sees a single
//! snapshot. Callers run it inside the same `IMMEDIATE` transaction as the
//! delete it protects; SQLite admits one writer at a time, so no purchase can
//! commit between the check and the delete.

use quire_core::EntityKind;
use rusqlite::{Connection, params};
use uuid::Uuid;

use crate::{Result, encode::encode_uuid};

/// A node of the content hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
  Series(Uuid),
  Volume(Uuid),
  Chapter(Uuid),
}

impl Node {
  pub fn entity(self) -> EntityKind {
    match self {
      Self::Series(_) => EntityKind::Series,
      Self::Volume(_) => EntityKind::Volume,
      Self::Chapter(_) => EntityKind::Chapter,
    }
  }

  pub fn id(self) -> Uuid {
    match self {
      Self::Series(id) | Self::Volume(id) | Self::Chapter(id) => id,
    }
  }

  /// A CTE producing every `(content_type, content_id)` pair the node
  /// covers: itself plus all descendants, deleted or not.
  fn scope_sql(self) -> &'static str {
    match self {
      Self::Series(_) => {
        "WITH scope(content_type, content_id) AS (
           SELECT 'series', ?1
           UNION ALL
           SELECT 'volume', v.id FROM volumes v WHERE v.series_id = ?1
           UNION ALL
           SELECT 'chapter', c.id
             FROM chapters c JOIN volumes v ON v.id = c.volume_id
            WHERE v.series_id = ?1
         )"
      }
      Self::Volume(_) => {
        "WITH scope(content_type, content_id) AS (
           SELECT 'volume', ?1
           UNION ALL
           SELECT 'chapter', c.id FROM chapters c WHERE c.volume_id = ?1
         )"
      }
      Self::Chapter(_) => {
        "WITH scope(content_type, content_id) AS (SELECT 'chapter', ?1)"
      }
    }
  }
}

pub fn has_commercial_records(conn: &Connection, node: Node) -> Result<bool> {
  let sql = format!(
    "{}
     SELECT EXISTS (
       SELECT 1 FROM scope s
         JOIN purchases p
           ON p.content_type = s.content_type AND p.content_id = s.content_id
     ) OR EXISTS (
       SELECT 1 FROM scope s
         JOIN rentals r
           ON r.content_type = s.content_type AND r.content_id = s.content_id
     )",
    node.scope_sql(),
  );
  let found: bool =
    conn.query_row(&sql, params![encode_uuid(node.id())], |row| row.get(0))?;
  Ok(found)
}
