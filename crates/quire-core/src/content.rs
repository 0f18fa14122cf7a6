//! The content hierarchy: series own volumes, volumes own chapters.
//!
//! These are the persisted shapes as read back from a store. They are never
//! mutated by callers directly; every change goes through
//! [`crate::store::CatalogStore`].

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metrics::ContentMetrics;

// ─── Enumerations ────────────────────────────────────────────────────────────

/// Lifecycle status of a series. New series start as `Draft`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SeriesStatus {
  #[default]
  Draft,
  Ongoing,
  Completed,
  Hiatus,
}

impl SeriesStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Draft => "draft",
      Self::Ongoing => "ongoing",
      Self::Completed => "completed",
      Self::Hiatus => "hiatus",
    }
  }
}

impl fmt::Display for SeriesStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for SeriesStatus {
  type Err = crate::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "draft" => Ok(Self::Draft),
      "ongoing" => Ok(Self::Ongoing),
      "completed" => Ok(Self::Completed),
      "hiatus" => Ok(Self::Hiatus),
      other => Err(crate::Error::validation(
        "status",
        format!("unknown series status {other:?}"),
      )),
    }
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AgeRating {
  #[default]
  Everyone,
  Teen,
  Mature,
  Adult,
}

impl AgeRating {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Everyone => "everyone",
      Self::Teen => "teen",
      Self::Mature => "mature",
      Self::Adult => "adult",
    }
  }
}

impl FromStr for AgeRating {
  type Err = crate::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "everyone" => Ok(Self::Everyone),
      "teen" => Ok(Self::Teen),
      "mature" => Ok(Self::Mature),
      "adult" => Ok(Self::Adult),
      other => Err(crate::Error::validation(
        "age_rating",
        format!("unknown age rating {other:?}"),
      )),
    }
  }
}

// ─── Ownership ───────────────────────────────────────────────────────────────

/// Whether a series is owned by a single person or by an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
  Individual,
  Organization,
}

impl OwnerKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Individual => "individual",
      Self::Organization => "organization",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Owner {
  pub kind: OwnerKind,
  pub id:   Uuid,
}

/// Soft-delete marker. Its presence is the `is_deleted` flag; a deletion
/// always carries its timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deletion {
  pub at: DateTime<Utc>,
  pub by: Option<Uuid>,
}

// ─── Series ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesCounters {
  pub view_count:     i64,
  pub like_count:     i64,
  pub bookmark_count: i64,
  pub comment_count:  i64,
  pub rating_average: f64,
  pub rating_count:   i64,
  pub total_volumes:  i64,
  pub total_chapters: i64,
  pub word_count:     i64,
}

/// Purchase and rental terms. Prices are in minor currency units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Monetization {
  pub purchase_price:       Option<i64>,
  pub rental_price:         Option<i64>,
  pub rental_duration_days: Option<i64>,
  pub is_premium:           bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
  pub id:                  Uuid,
  pub title:               String,
  pub slug:                String,
  pub cover_url:           Option<String>,
  /// Multilingual summary, e.g. `{"en": "...", "ja": "..."}`.
  pub summary:             serde_json::Value,
  pub status:              SeriesStatus,
  pub age_rating:          AgeRating,
  pub is_mature:           bool,
  pub is_public:           bool,
  pub is_featured:         bool,
  pub is_completed:        bool,
  pub owner:               Owner,
  /// Set at creation and never changed afterwards.
  pub original_creator_id: Uuid,
  pub keywords:            Vec<String>,
  pub tags:                Vec<String>,
  pub monetization:        Monetization,
  pub counters:            SeriesCounters,
  /// First time the series became public.
  pub published_at:        Option<DateTime<Utc>>,
  pub deleted:             Option<Deletion>,
  pub created_at:          DateTime<Utc>,
  pub updated_at:          DateTime<Utc>,
}

// ─── Volume ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Volume {
  pub id:            Uuid,
  pub series_id:     Uuid,
  /// Unique among the live volumes of the series.
  pub volume_number: i64,
  pub title:         Option<String>,
  pub description:   Option<String>,
  pub cover_url:     Option<String>,
  pub is_available:  bool,
  pub price:         Option<i64>,
  /// Always equal to the number of live chapters in this volume.
  pub chapter_count: i64,
  pub deleted:       Option<Deletion>,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

// ─── Chapter ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
  pub id:                   Uuid,
  pub volume_id:            Uuid,
  /// Unique among the live chapters of the volume.
  pub chapter_number:       i64,
  pub title:                Option<String>,
  pub content:              Option<serde_json::Value>,
  pub published_at:         Option<DateTime<Utc>>,
  pub scheduled_publish_at: Option<DateTime<Utc>>,
  pub is_draft:             bool,
  pub is_public:            bool,
  /// Starts at 1; bumped once per content-affecting update.
  pub version:              i64,
  pub metrics:              ContentMetrics,
  pub content_warnings:     Vec<String>,
  pub is_mature:            bool,
  pub view_count:           i64,
  pub like_count:           i64,
  pub comment_count:        i64,
  pub deleted:              Option<Deletion>,
  pub created_at:           DateTime<Utc>,
  pub updated_at:           DateTime<Utc>,
}

impl Chapter {
  /// Readers can see the chapter.
  pub fn is_published(&self) -> bool {
    !self.is_draft && self.is_public && self.published_at.is_some()
  }
}
