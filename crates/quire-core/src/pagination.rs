//! List query parameters and page arithmetic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::{AgeRating, SeriesStatus};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

// ─── Sorting ─────────────────────────────────────────────────────────────────

/// The only columns a listing may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
  #[default]
  CreatedAt,
  UpdatedAt,
  PublishedAt,
  Title,
  ViewCount,
  LikeCount,
  RatingAverage,
  LatestChapterAt,
}

impl SortField {
  /// Parse a user-supplied sort key. Anything outside the allow-list is
  /// `None`.
  pub fn parse(key: &str) -> Option<Self> {
    Some(match key {
      "created_at" => Self::CreatedAt,
      "updated_at" => Self::UpdatedAt,
      "published_at" => Self::PublishedAt,
      "title" => Self::Title,
      "view_count" => Self::ViewCount,
      "like_count" => Self::LikeCount,
      "rating_average" => Self::RatingAverage,
      "latest_chapter_at" => Self::LatestChapterAt,
      _ => return None,
    })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
  Asc,
  #[default]
  Desc,
}

// ─── Query ───────────────────────────────────────────────────────────────────

/// Optional predicates for a series listing. Every `Some` narrows the result;
/// all predicates are ANDed together. Soft-deleted series are always
/// excluded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesFilter {
  pub status:                 Option<SeriesStatus>,
  pub age_rating:             Option<AgeRating>,
  pub is_mature:              Option<bool>,
  pub is_public:              Option<bool>,
  pub is_featured:            Option<bool>,
  pub is_completed:           Option<bool>,
  pub owner_id:               Option<Uuid>,
  /// Substring match over the title and the summary's text values. Case is
  /// ignored for ASCII letters only.
  pub search:                 Option<String>,
  /// Series linked to at least one of these genres.
  pub genre_ids:              Vec<Uuid>,
  pub created_after:          Option<DateTime<Utc>>,
  pub created_before:         Option<DateTime<Utc>>,
  pub published_after:        Option<DateTime<Utc>>,
  pub published_before:       Option<DateTime<Utc>>,
  /// Bounds on the most recent `updated_at` among the series' live chapters.
  pub chapter_updated_after:  Option<DateTime<Utc>>,
  pub chapter_updated_before: Option<DateTime<Utc>>,
  pub min_views:              Option<i64>,
  pub max_views:              Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesQuery {
  /// 1-based; values below 1 are treated as 1.
  pub page:      Option<u32>,
  /// Clamped to `1..=100`; defaults to 20.
  pub page_size: Option<u32>,
  pub sort:      SortField,
  pub order:     SortOrder,
  #[serde(flatten)]
  pub filter:    SeriesFilter,
}

impl SeriesQuery {
  pub fn page(&self) -> u32 { self.page.unwrap_or(1).max(1) }

  pub fn page_size(&self) -> u32 {
    self
      .page_size
      .unwrap_or(DEFAULT_PAGE_SIZE)
      .clamp(1, MAX_PAGE_SIZE)
  }

  pub fn offset(&self) -> u64 {
    u64::from(self.page() - 1) * u64::from(self.page_size())
  }
}

// ─── Results ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
  pub page:         u32,
  pub page_size:    u32,
  pub total:        u64,
  pub total_pages:  u64,
  pub has_next:     bool,
  pub has_previous: bool,
}

impl PageInfo {
  pub fn new(page: u32, page_size: u32, total: u64) -> Self {
    let total_pages = total.div_ceil(u64::from(page_size.max(1)));
    Self {
      page,
      page_size,
      total,
      total_pages,
      has_next: u64::from(page) < total_pages,
      has_previous: page > 1,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
  pub items:      Vec<T>,
  pub pagination: PageInfo,
}
