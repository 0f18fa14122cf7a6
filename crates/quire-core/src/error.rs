//! Error types for `quire-core`.
//!
//! Callers branch on [`ErrorKind`] (via [`Error::kind`]); the display text is
//! for humans only.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::association::AssociationKind;

/// The entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
  Series,
  Volume,
  Chapter,
  Genre,
  Creator,
  Character,
}

impl EntityKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Series => "series",
      Self::Volume => "volume",
      Self::Chapter => "chapter",
      Self::Genre => "genre",
      Self::Creator => "creator",
      Self::Character => "character",
    }
  }
}

impl fmt::Display for EntityKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Stable, fieldless classification of every error the catalog reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  NotFound,
  DuplicateSequenceNumber,
  AssociationNotFound,
  HasPurchases,
  NoFieldsProvided,
  InvalidIdentifier,
  Validation,
  Internal,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("{entity} not found: {id}")]
  NotFound { entity: EntityKind, id: Uuid },

  #[error("{entity} number {number} is already taken in {parent_id}")]
  DuplicateSequenceNumber {
    entity:    EntityKind,
    parent_id: Uuid,
    number:    i64,
  },

  #[error("unknown {kind} ids: {missing:?}")]
  AssociationNotFound {
    kind:    AssociationKind,
    missing: Vec<Uuid>,
  },

  #[error("{entity} {id} has purchase or rental records")]
  HasPurchases { entity: EntityKind, id: Uuid },

  #[error("no fields provided for {entity} update")]
  NoFieldsProvided { entity: EntityKind },

  #[error("invalid identifier: {0:?}")]
  InvalidIdentifier(String),

  #[error("invalid {field}: {reason}")]
  Validation {
    field:  &'static str,
    reason: String,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::NotFound { .. } => ErrorKind::NotFound,
      Self::DuplicateSequenceNumber { .. } => {
        ErrorKind::DuplicateSequenceNumber
      }
      Self::AssociationNotFound { .. } => ErrorKind::AssociationNotFound,
      Self::HasPurchases { .. } => ErrorKind::HasPurchases,
      Self::NoFieldsProvided { .. } => ErrorKind::NoFieldsProvided,
      Self::InvalidIdentifier(_) => ErrorKind::InvalidIdentifier,
      Self::Validation { .. } => ErrorKind::Validation,
      Self::Serialization(_) => ErrorKind::Internal,
    }
  }

  pub fn not_found(entity: EntityKind, id: Uuid) -> Self {
    Self::NotFound { entity, id }
  }

  pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
    Self::Validation { field, reason: reason.into() }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Parse a caller-supplied identifier.
pub fn parse_id(raw: &str) -> Result<Uuid> {
  Uuid::parse_str(raw.trim())
    .map_err(|_| Error::InvalidIdentifier(raw.to_owned()))
}
