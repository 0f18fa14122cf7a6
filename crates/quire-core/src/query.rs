//! The read side: paged listings and the aggregated detail view.
//!
//! Implementations run on their own connection and never mutate state. They
//! may trail the write side by ordinary read-after-write lag.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  association::{CharacterRef, CreatorRef, GenreRef},
  content::{AgeRating, Owner, Series, SeriesStatus},
  identity::IdentitySummary,
  pagination::{Page, SeriesQuery},
};

/// One row of a series listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesSummary {
  pub id:                Uuid,
  pub title:             String,
  pub slug:              String,
  pub cover_url:         Option<String>,
  pub status:            SeriesStatus,
  pub age_rating:        AgeRating,
  pub is_mature:         bool,
  pub is_public:         bool,
  pub is_featured:       bool,
  pub is_completed:      bool,
  pub owner:             Owner,
  pub view_count:        i64,
  pub like_count:        i64,
  pub rating_average:    f64,
  pub total_volumes:     i64,
  pub total_chapters:    i64,
  /// Most recent `updated_at` among live chapters, if any.
  pub latest_chapter_at: Option<DateTime<Utc>>,
  pub published_at:      Option<DateTime<Utc>>,
  pub created_at:        DateTime<Utc>,
  pub updated_at:        DateTime<Utc>,
}

impl SeriesSummary {
  pub fn from_series(
    series: Series,
    latest_chapter_at: Option<DateTime<Utc>>,
  ) -> Self {
    Self {
      id: series.id,
      title: series.title,
      slug: series.slug,
      cover_url: series.cover_url,
      status: series.status,
      age_rating: series.age_rating,
      is_mature: series.is_mature,
      is_public: series.is_public,
      is_featured: series.is_featured,
      is_completed: series.is_completed,
      owner: series.owner,
      view_count: series.counters.view_count,
      like_count: series.counters.like_count,
      rating_average: series.counters.rating_average,
      total_volumes: series.counters.total_volumes,
      total_chapters: series.counters.total_chapters,
      latest_chapter_at,
      published_at: series.published_at,
      created_at: series.created_at,
      updated_at: series.updated_at,
    }
  }
}

/// The fully nested view of one series. Association lists are empty, never
/// missing, when nothing is attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesDetail {
  pub series:             Series,
  pub live_volume_count:  i64,
  pub live_chapter_count: i64,
  pub genres:             Vec<GenreRef>,
  pub creators:           Vec<CreatorRef>,
  pub characters:         Vec<CharacterRef>,
  /// Display data for `series.owner`, when the identity service knows it.
  pub owner:              Option<IdentitySummary>,
  /// Display data for `series.original_creator_id`.
  pub original_creator:   Option<IdentitySummary>,
}

pub trait CatalogQuery: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// One page of live series matching `query`, plus page metadata computed
  /// from a count over the same predicates.
  fn list_series<'a>(
    &'a self,
    query: &'a SeriesQuery,
  ) -> impl Future<Output = Result<Page<SeriesSummary>, Self::Error>> + Send + 'a;

  /// The aggregated view of a live series, assembled in a single statement.
  /// Fails with `NotFound` for a missing or soft-deleted series.
  fn get_full_detail(
    &self,
    series_id: Uuid,
  ) -> impl Future<Output = Result<SeriesDetail, Self::Error>> + Send + '_;
}
