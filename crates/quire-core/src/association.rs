//! Reference records (genres, creators, characters) and the join records that
//! attach them to a series.
//!
//! Associations have no lifecycle of their own: they are replaced wholesale
//! whenever a series update carries a new set, and they live and die with the
//! series they belong to.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The three association tables a series links into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssociationKind {
  Genre,
  Creator,
  Character,
}

impl fmt::Display for AssociationKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Genre => "genre",
      Self::Creator => "creator",
      Self::Character => "character",
    })
  }
}

// ─── Reference records ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genre {
  pub id:         Uuid,
  pub name:       String,
  pub slug:       String,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creator {
  pub id:         Uuid,
  pub name:       String,
  pub slug:       String,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
  pub id:          Uuid,
  pub name:        String,
  pub slug:        String,
  pub description: Option<String>,
  pub created_at:  DateTime<Utc>,
}

/// Derive the URL slug stored alongside a reference record's name.
pub fn slug_for(name: &str) -> String { slug::slugify(name) }

// ─── Creator credits ─────────────────────────────────────────────────────────

/// The part a creator played in a series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreatorRole {
  Author,
  Artist,
  Illustrator,
  Translator,
  Editor,
  Custom(String),
}

impl CreatorRole {
  /// The label stored in the `series_creators.role` column.
  pub fn label(&self) -> &str {
    match self {
      Self::Author => "author",
      Self::Artist => "artist",
      Self::Illustrator => "illustrator",
      Self::Translator => "translator",
      Self::Editor => "editor",
      Self::Custom(label) => label,
    }
  }

  pub fn from_label(label: &str) -> Self {
    match label {
      "author" => Self::Author,
      "artist" => Self::Artist,
      "illustrator" => Self::Illustrator,
      "translator" => Self::Translator,
      "editor" => Self::Editor,
      other => Self::Custom(other.to_owned()),
    }
  }
}

/// A creator attached to a series in a given role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorCredit {
  pub creator_id: Uuid,
  pub role:       CreatorRole,
}

impl CreatorCredit {
  pub fn new(creator_id: Uuid, role: CreatorRole) -> Self {
    Self { creator_id, role }
  }
}

/// The full association set for a series, as carried by create and update
/// requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociationSet {
  pub genre_ids:     Vec<Uuid>,
  pub creators:      Vec<CreatorCredit>,
  pub character_ids: Vec<Uuid>,
}

impl AssociationSet {
  /// Distinct creator ids in first-seen order.
  pub fn creator_ids(&self) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = Vec::with_capacity(self.creators.len());
    for credit in &self.creators {
      if !ids.contains(&credit.creator_id) {
        ids.push(credit.creator_id);
      }
    }
    ids
  }
}

// ─── Read-side projections ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreRef {
  pub id:   Uuid,
  pub name: String,
  pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorRef {
  pub id:   Uuid,
  pub name: String,
  pub role: CreatorRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterRef {
  pub id:   Uuid,
  pub name: String,
  pub slug: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn role_labels_round_trip() {
    for role in [
      CreatorRole::Author,
      CreatorRole::Artist,
      CreatorRole::Illustrator,
      CreatorRole::Translator,
      CreatorRole::Editor,
      CreatorRole::Custom("letterer".into()),
    ] {
      assert_eq!(CreatorRole::from_label(role.label()), role);
    }
  }

  #[test]
  fn creator_ids_are_deduplicated() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let set = AssociationSet {
      creators: vec![
        CreatorCredit::new(a, CreatorRole::Author),
        CreatorCredit::new(b, CreatorRole::Artist),
        CreatorCredit::new(a, CreatorRole::Illustrator),
      ],
      ..Default::default()
    };
    assert_eq!(set.creator_ids(), vec![a, b]);
  }

  #[test]
  fn slugs_are_lowercase_hyphenated() {
    assert_eq!(slug_for("Slice of Life"), "slice-of-life");
  }
}
