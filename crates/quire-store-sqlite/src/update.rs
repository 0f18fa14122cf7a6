//! Partial-update statement assembly.
//!
//! Column names are `&'static str` chosen by the store, never by callers; every
//! value travels as a numbered bind parameter. Assignments are emitted in the
//! order they were added, followed by `updated_at`, so a given patch always
//! yields the same SQL text and parameter list.

use chrono::{DateTime, Utc};
use quire_core::EntityKind;
use rusqlite::types::Value;
use uuid::Uuid;

use crate::{
  Result,
  encode::{encode_dt, encode_uuid},
};

enum Assignment {
  Bind(Value),
  /// A fixed SQL expression such as `version + 1`.
  Expr(&'static str),
}

pub struct UpdateBuilder {
  table:       &'static str,
  entity:      EntityKind,
  assignments: Vec<(&'static str, Assignment)>,
}

/// A ready-to-run `UPDATE` with its bind parameters in placeholder order.
#[derive(Debug)]
pub struct UpdateStatement {
  pub sql:    String,
  pub params: Vec<Value>,
}

impl UpdateBuilder {
  pub fn new(table: &'static str, entity: EntityKind) -> Self {
    Self { table, entity, assignments: Vec::new() }
  }

  pub fn set(&mut self, column: &'static str, value: impl Into<Value>) -> &mut Self {
    self.assignments.push((column, Assignment::Bind(value.into())));
    self
  }

  /// Assign `column` only when `value` is present.
  pub fn set_opt<V: Into<Value>>(
    &mut self,
    column: &'static str,
    value: Option<V>,
  ) -> &mut Self {
    if let Some(value) = value {
      self.set(column, value);
    }
    self
  }

  pub fn set_expr(&mut self, column: &'static str, expr: &'static str) -> &mut Self {
    self.assignments.push((column, Assignment::Expr(expr)));
    self
  }

  pub fn is_empty(&self) -> bool { self.assignments.is_empty() }

  /// Emit `UPDATE <table> SET ... , updated_at = ? WHERE id = ? AND
  /// is_deleted = 0`, or `NoFieldsProvided` if nothing was assigned.
  pub fn build(self, id: Uuid, now: DateTime<Utc>) -> Result<UpdateStatement> {
    if self.assignments.is_empty() {
      return Err(
        quire_core::Error::NoFieldsProvided { entity: self.entity }.into(),
      );
    }

    let mut clauses = Vec::with_capacity(self.assignments.len() + 1);
    let mut params = Vec::with_capacity(self.assignments.len() + 2);

    for (column, assignment) in self.assignments {
      match assignment {
        Assignment::Bind(value) => {
          params.push(value);
          clauses.push(format!("{column} = ?{}", params.len()));
        }
        Assignment::Expr(expr) => clauses.push(format!("{column} = {expr}")),
      }
    }

    params.push(Value::Text(encode_dt(now)));
    clauses.push(format!("updated_at = ?{}", params.len()));
    params.push(Value::Text(encode_uuid(id)));
    let id_slot = params.len();

    Ok(UpdateStatement {
      sql: format!(
        "UPDATE {} SET {} WHERE id = ?{id_slot} AND is_deleted = 0",
        self.table,
        clauses.join(", "),
      ),
      params,
    })
  }
}
