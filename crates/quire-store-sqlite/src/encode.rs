//! Encoding and decoding helpers between domain types and the plain
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 UTC strings with fixed microsecond precision, so
//! string comparison in SQL orders them chronologically. UUIDs are hyphenated
//! lowercase strings. Documents and string lists are compact JSON.

use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use quire_core::{
  content::{
    AgeRating, Chapter, Deletion, Monetization, Owner, OwnerKind, Series,
    SeriesCounters, SeriesStatus, Volume,
  },
  metrics::ContentMetrics,
};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

/// The current instant at storage precision, so values handed back to the
/// caller compare equal to what a later read returns.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

pub fn encode_list(items: &[String]) -> Result<String> {
  Ok(serde_json::to_string(items)?)
}

pub fn decode_list(s: &str) -> Result<Vec<String>> { Ok(serde_json::from_str(s)?) }

pub fn encode_doc(doc: &serde_json::Value) -> String { doc.to_string() }

pub fn decode_doc(s: &str) -> Result<serde_json::Value> {
  Ok(serde_json::from_str(s)?)
}

// ─── Enumerations ────────────────────────────────────────────────────────────

pub fn decode_status(s: &str) -> Result<SeriesStatus> {
  s.parse().map_err(|_| Error::Decode { column: "status", value: s.into() })
}

pub fn decode_age_rating(s: &str) -> Result<AgeRating> {
  s.parse()
    .map_err(|_| Error::Decode { column: "age_rating", value: s.into() })
}

pub fn decode_owner_kind(s: &str) -> Result<OwnerKind> {
  match s {
    "individual" => Ok(OwnerKind::Individual),
    "organization" => Ok(OwnerKind::Organization),
    other => Err(Error::Decode {
      column: "ownership_type",
      value:  other.into(),
    }),
  }
}

fn decode_deletion(
  is_deleted: bool,
  deleted_at: Option<String>,
  deleted_by: Option<String>,
) -> Result<Option<Deletion>> {
  if !is_deleted {
    return Ok(None);
  }
  let at = deleted_at.ok_or(Error::Decode {
    column: "deleted_at",
    value:  "NULL".into(),
  })?;
  Ok(Some(Deletion {
    at: decode_dt(&at)?,
    by: deleted_by.as_deref().map(decode_uuid).transpose()?,
  }))
}

// ─── Series ──────────────────────────────────────────────────────────────────

/// Column list for [`RawSeries::from_row`]; the table must be aliased `s`.
pub const SERIES_COLUMNS: &str = "
  s.id, s.title, s.slug, s.cover_url, s.summary, s.status, s.age_rating,
  s.is_mature, s.is_public, s.is_featured, s.is_completed,
  s.ownership_type, s.primary_owner_id, s.original_creator_id,
  s.keywords, s.tags,
  s.purchase_price, s.rental_price, s.rental_duration_days, s.is_premium,
  s.view_count, s.like_count, s.bookmark_count, s.comment_count,
  s.rating_average, s.rating_count,
  s.total_volumes, s.total_chapters, s.word_count,
  s.published_at, s.is_deleted, s.deleted_at, s.deleted_by,
  s.created_at, s.updated_at";

/// Number of columns in [`SERIES_COLUMNS`]; extra projections start here.
pub const SERIES_COLUMN_COUNT: usize = 35;

/// Raw values read directly from a `series` row.
pub struct RawSeries {
  pub id:                   String,
  pub title:                String,
  pub slug:                 String,
  pub cover_url:            Option<String>,
  pub summary:              String,
  pub status:               String,
  pub age_rating:           String,
  pub is_mature:            bool,
  pub is_public:            bool,
  pub is_featured:          bool,
  pub is_completed:         bool,
  pub ownership_type:       String,
  pub primary_owner_id:     String,
  pub original_creator_id:  String,
  pub keywords:             String,
  pub tags:                 String,
  pub purchase_price:       Option<i64>,
  pub rental_price:         Option<i64>,
  pub rental_duration_days: Option<i64>,
  pub is_premium:           bool,
  pub counters:             SeriesCounters,
  pub published_at:         Option<String>,
  pub is_deleted:           bool,
  pub deleted_at:           Option<String>,
  pub deleted_by:           Option<String>,
  pub created_at:           String,
  pub updated_at:           String,
}

impl RawSeries {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                   row.get(0)?,
      title:                row.get(1)?,
      slug:                 row.get(2)?,
      cover_url:            row.get(3)?,
      summary:              row.get(4)?,
      status:               row.get(5)?,
      age_rating:           row.get(6)?,
      is_mature:            row.get(7)?,
      is_public:            row.get(8)?,
      is_featured:          row.get(9)?,
      is_completed:         row.get(10)?,
      ownership_type:       row.get(11)?,
      primary_owner_id:     row.get(12)?,
      original_creator_id:  row.get(13)?,
      keywords:             row.get(14)?,
      tags:                 row.get(15)?,
      purchase_price:       row.get(16)?,
      rental_price:         row.get(17)?,
      rental_duration_days: row.get(18)?,
      is_premium:           row.get(19)?,
      counters:             SeriesCounters {
        view_count:     row.get(20)?,
        like_count:     row.get(21)?,
        bookmark_count: row.get(22)?,
        comment_count:  row.get(23)?,
        rating_average: row.get(24)?,
        rating_count:   row.get(25)?,
        total_volumes:  row.get(26)?,
        total_chapters: row.get(27)?,
        word_count:     row.get(28)?,
      },
      published_at:         row.get(29)?,
      is_deleted:           row.get(30)?,
      deleted_at:           row.get(31)?,
      deleted_by:           row.get(32)?,
      created_at:           row.get(33)?,
      updated_at:           row.get(34)?,
    })
  }

  pub fn into_series(self) -> Result<Series> {
    Ok(Series {
      id:                  decode_uuid(&self.id)?,
      title:               self.title,
      slug:                self.slug,
      cover_url:           self.cover_url,
      summary:             decode_doc(&self.summary)?,
      status:              decode_status(&self.status)?,
      age_rating:          decode_age_rating(&self.age_rating)?,
      is_mature:           self.is_mature,
      is_public:           self.is_public,
      is_featured:         self.is_featured,
      is_completed:        self.is_completed,
      owner:               Owner {
        kind: decode_owner_kind(&self.ownership_type)?,
        id:   decode_uuid(&self.primary_owner_id)?,
      },
      original_creator_id: decode_uuid(&self.original_creator_id)?,
      keywords:            decode_list(&self.keywords)?,
      tags:                decode_list(&self.tags)?,
      monetization:        Monetization {
        purchase_price:       self.purchase_price,
        rental_price:         self.rental_price,
        rental_duration_days: self.rental_duration_days,
        is_premium:           self.is_premium,
      },
      counters:            self.counters,
      published_at:        decode_opt_dt(self.published_at)?,
      deleted:             decode_deletion(
        self.is_deleted,
        self.deleted_at,
        self.deleted_by,
      )?,
      created_at:          decode_dt(&self.created_at)?,
      updated_at:          decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Volume ──────────────────────────────────────────────────────────────────

/// Column list for [`RawVolume::from_row`]; the table must be aliased `v`.
pub const VOLUME_COLUMNS: &str = "
  v.id, v.series_id, v.volume_number, v.title, v.description, v.cover_url,
  v.is_available, v.price, v.chapter_count,
  v.is_deleted, v.deleted_at, v.deleted_by, v.created_at, v.updated_at";

pub struct RawVolume {
  pub id:            String,
  pub series_id:     String,
  pub volume_number: i64,
  pub title:         Option<String>,
  pub description:   Option<String>,
  pub cover_url:     Option<String>,
  pub is_available:  bool,
  pub price:         Option<i64>,
  pub chapter_count: i64,
  pub is_deleted:    bool,
  pub deleted_at:    Option<String>,
  pub deleted_by:    Option<String>,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawVolume {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      series_id:     row.get(1)?,
      volume_number: row.get(2)?,
      title:         row.get(3)?,
      description:   row.get(4)?,
      cover_url:     row.get(5)?,
      is_available:  row.get(6)?,
      price:         row.get(7)?,
      chapter_count: row.get(8)?,
      is_deleted:    row.get(9)?,
      deleted_at:    row.get(10)?,
      deleted_by:    row.get(11)?,
      created_at:    row.get(12)?,
      updated_at:    row.get(13)?,
    })
  }

  pub fn into_volume(self) -> Result<Volume> {
    Ok(Volume {
      id:            decode_uuid(&self.id)?,
      series_id:     decode_uuid(&self.series_id)?,
      volume_number: self.volume_number,
      title:         self.title,
      description:   self.description,
      cover_url:     self.cover_url,
      is_available:  self.is_available,
      price:         self.price,
      chapter_count: self.chapter_count,
      deleted:       decode_deletion(
        self.is_deleted,
        self.deleted_at,
        self.deleted_by,
      )?,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Chapter ─────────────────────────────────────────────────────────────────

/// Column list for [`RawChapter::from_row`]; the table must be aliased `c`.
pub const CHAPTER_COLUMNS: &str = "
  c.id, c.volume_id, c.chapter_number, c.title, c.content,
  c.published_at, c.scheduled_publish_at, c.is_draft, c.is_public,
  c.version, c.word_count, c.character_count, c.reading_time_minutes,
  c.content_warnings, c.is_mature, c.view_count, c.like_count,
  c.comment_count, c.is_deleted, c.deleted_at, c.deleted_by,
  c.created_at, c.updated_at";

pub struct RawChapter {
  pub id:                   String,
  pub volume_id:            String,
  pub chapter_number:       i64,
  pub title:                Option<String>,
  pub content:              Option<String>,
  pub published_at:         Option<String>,
  pub scheduled_publish_at: Option<String>,
  pub is_draft:             bool,
  pub is_public:            bool,
  pub version:              i64,
  pub metrics:              ContentMetrics,
  pub content_warnings:     String,
  pub is_mature:            bool,
  pub view_count:           i64,
  pub like_count:           i64,
  pub comment_count:        i64,
  pub is_deleted:           bool,
  pub deleted_at:           Option<String>,
  pub deleted_by:           Option<String>,
  pub created_at:           String,
  pub updated_at:           String,
}

impl RawChapter {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                   row.get(0)?,
      volume_id:            row.get(1)?,
      chapter_number:       row.get(2)?,
      title:                row.get(3)?,
      content:              row.get(4)?,
      published_at:         row.get(5)?,
      scheduled_publish_at: row.get(6)?,
      is_draft:             row.get(7)?,
      is_public:            row.get(8)?,
      version:              row.get(9)?,
      metrics:              ContentMetrics {
        word_count:           row.get(10)?,
        character_count:      row.get(11)?,
        reading_time_minutes: row.get(12)?,
      },
      content_warnings:     row.get(13)?,
      is_mature:            row.get(14)?,
      view_count:           row.get(15)?,
      like_count:           row.get(16)?,
      comment_count:        row.get(17)?,
      is_deleted:           row.get(18)?,
      deleted_at:           row.get(19)?,
      deleted_by:           row.get(20)?,
      created_at:           row.get(21)?,
      updated_at:           row.get(22)?,
    })
  }

  pub fn into_chapter(self) -> Result<Chapter> {
    Ok(Chapter {
      id:                   decode_uuid(&self.id)?,
      volume_id:            decode_uuid(&self.volume_id)?,
      chapter_number:       self.chapter_number,
      title:                self.title,
      content:              self.content.as_deref().map(decode_doc).transpose()?,
      published_at:         decode_opt_dt(self.published_at)?,
      scheduled_publish_at: decode_opt_dt(self.scheduled_publish_at)?,
      is_draft:             self.is_draft,
      is_public:            self.is_public,
      version:              self.version,
      metrics:              self.metrics,
      content_warnings:     decode_list(&self.content_warnings)?,
      is_mature:            self.is_mature,
      view_count:           self.view_count,
      like_count:           self.like_count,
      comment_count:        self.comment_count,
      deleted:              decode_deletion(
        self.is_deleted,
        self.deleted_at,
        self.deleted_by,
      )?,
      created_at:           decode_dt(&self.created_at)?,
      updated_at:           decode_dt(&self.updated_at)?,
    })
  }
}
