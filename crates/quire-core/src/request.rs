//! Create and partial-update requests accepted by
//! [`crate::store::CatalogStore`].
//!
//! Every field of a `*Patch` is independently optional: `Some` means "assign
//! this value", `None` means "leave the column alone". A patch with no `Some`
//! field is rejected with `NoFieldsProvided` before any write is issued.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  association::AssociationSet,
  content::{AgeRating, Monetization, Owner, SeriesStatus},
};

fn empty_object() -> serde_json::Value { serde_json::json!({}) }

fn yes() -> bool { true }

// ─── Series ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSeries {
  pub title:        String,
  /// Derived from the title when absent.
  #[serde(default)]
  pub slug:         Option<String>,
  #[serde(default)]
  pub cover_url:    Option<String>,
  #[serde(default = "empty_object")]
  pub summary:      serde_json::Value,
  #[serde(default)]
  pub age_rating:   AgeRating,
  #[serde(default)]
  pub is_mature:    bool,
  #[serde(default)]
  pub is_public:    bool,
  #[serde(default)]
  pub is_featured:  bool,
  #[serde(default)]
  pub keywords:     Vec<String>,
  #[serde(default)]
  pub tags:         Vec<String>,
  #[serde(default)]
  pub monetization: Monetization,
  pub owner:        Owner,
  /// The acting user; recorded as the immutable original creator.
  pub created_by:   Uuid,
  #[serde(default)]
  pub associations: AssociationSet,
}

impl NewSeries {
  /// A minimal request with every optional field at its default.
  pub fn new(title: impl Into<String>, owner: Owner, created_by: Uuid) -> Self {
    Self {
      title: title.into(),
      slug: None,
      cover_url: None,
      summary: empty_object(),
      age_rating: AgeRating::default(),
      is_mature: false,
      is_public: false,
      is_featured: false,
      keywords: Vec::new(),
      tags: Vec::new(),
      monetization: Monetization::default(),
      owner,
      created_by,
      associations: AssociationSet::default(),
    }
  }

  pub fn validate(&self) -> Result<()> { validate_title(&self.title) }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesPatch {
  pub title:                Option<String>,
  pub slug:                 Option<String>,
  pub cover_url:            Option<String>,
  pub summary:              Option<serde_json::Value>,
  pub status:               Option<SeriesStatus>,
  pub age_rating:           Option<AgeRating>,
  pub is_mature:            Option<bool>,
  pub is_public:            Option<bool>,
  pub is_featured:          Option<bool>,
  pub is_completed:         Option<bool>,
  pub keywords:             Option<Vec<String>>,
  pub tags:                 Option<Vec<String>>,
  pub purchase_price:       Option<i64>,
  pub rental_price:         Option<i64>,
  pub rental_duration_days: Option<i64>,
  pub is_premium:           Option<bool>,
  /// Replaces the whole association set when present.
  pub associations:         Option<AssociationSet>,
}

impl SeriesPatch {
  pub fn validate(&self) -> Result<()> {
    if let Some(title) = &self.title {
      validate_title(title)?;
    }
    Ok(())
  }
}

// ─── Volume ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVolume {
  pub volume_number: i64,
  #[serde(default)]
  pub title:         Option<String>,
  #[serde(default)]
  pub description:   Option<String>,
  #[serde(default)]
  pub cover_url:     Option<String>,
  #[serde(default = "yes")]
  pub is_available:  bool,
  #[serde(default)]
  pub price:         Option<i64>,
}

impl NewVolume {
  pub fn new(volume_number: i64) -> Self {
    Self {
      volume_number,
      title: None,
      description: None,
      cover_url: None,
      is_available: true,
      price: None,
    }
  }

  pub fn validate(&self) -> Result<()> {
    validate_sequence("volume_number", self.volume_number)
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumePatch {
  pub volume_number: Option<i64>,
  pub title:         Option<String>,
  pub description:   Option<String>,
  pub cover_url:     Option<String>,
  pub is_available:  Option<bool>,
  pub price:         Option<i64>,
}

impl VolumePatch {
  pub fn validate(&self) -> Result<()> {
    if let Some(number) = self.volume_number {
      validate_sequence("volume_number", number)?;
    }
    Ok(())
  }
}

// ─── Chapter ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChapter {
  pub chapter_number:   i64,
  #[serde(default)]
  pub title:            Option<String>,
  #[serde(default)]
  pub content:          Option<serde_json::Value>,
  #[serde(default = "yes")]
  pub is_draft:         bool,
  #[serde(default)]
  pub is_public:        bool,
  /// Only honoured when the chapter is created directly in the public state.
  #[serde(default)]
  pub published_at:     Option<DateTime<Utc>>,
  #[serde(default)]
  pub content_warnings: Vec<String>,
  #[serde(default)]
  pub is_mature:        bool,
}

impl NewChapter {
  pub fn new(chapter_number: i64) -> Self {
    Self {
      chapter_number,
      title: None,
      content: None,
      is_draft: true,
      is_public: false,
      published_at: None,
      content_warnings: Vec::new(),
      is_mature: false,
    }
  }

  pub fn with_content(mut self, content: serde_json::Value) -> Self {
    self.content = Some(content);
    self
  }

  pub fn validate(&self) -> Result<()> {
    validate_sequence("chapter_number", self.chapter_number)
  }
}

/// Content-affecting fields of a chapter. Visibility changes go through
/// publish/unpublish/schedule instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChapterPatch {
  pub chapter_number:   Option<i64>,
  pub title:            Option<String>,
  /// Recomputes metrics and bumps `version` when present.
  pub content:          Option<serde_json::Value>,
  pub content_warnings: Option<Vec<String>>,
  pub is_mature:        Option<bool>,
}

impl ChapterPatch {
  pub fn validate(&self) -> Result<()> {
    if let Some(number) = self.chapter_number {
      validate_sequence("chapter_number", number)?;
    }
    Ok(())
  }
}

// ─── Validation helpers ──────────────────────────────────────────────────────

fn validate_title(title: &str) -> Result<()> {
  if title.trim().is_empty() {
    return Err(Error::validation("title", "must not be empty"));
  }
  Ok(())
}

fn validate_sequence(field: &'static str, number: i64) -> Result<()> {
  if number < 1 {
    return Err(Error::validation(field, format!("{number} is not >= 1")));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{ErrorKind, content::OwnerKind};

  fn owner() -> Owner {
    Owner { kind: OwnerKind::Individual, id: Uuid::new_v4() }
  }

  #[test]
  fn blank_title_is_rejected() {
    let req = NewSeries::new("   ", owner(), Uuid::new_v4());
    assert_eq!(req.validate().unwrap_err().kind(), ErrorKind::Validation);

    let patch = SeriesPatch { title: Some(String::new()), ..Default::default() };
    assert_eq!(patch.validate().unwrap_err().kind(), ErrorKind::Validation);
  }

  #[test]
  fn sequence_numbers_start_at_one() {
    assert!(NewVolume::new(0).validate().is_err());
    assert!(NewVolume::new(1).validate().is_ok());
    assert!(NewChapter::new(-3).validate().is_err());
  }

  #[test]
  fn absent_fields_deserialize_as_none() {
    let patch: ChapterPatch =
      serde_json::from_str(r#"{ "title": "Prologue" }"#).unwrap();
    assert_eq!(patch.title.as_deref(), Some("Prologue"));
    assert!(patch.content.is_none());
    assert!(patch.chapter_number.is_none());
  }

  #[test]
  fn new_chapter_defaults_to_draft() {
    let req: NewChapter =
      serde_json::from_str(r#"{ "chapter_number": 1 }"#).unwrap();
    assert!(req.is_draft);
    assert!(!req.is_public);
  }
}
