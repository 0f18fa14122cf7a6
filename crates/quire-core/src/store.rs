//! The `CatalogStore` trait: the transactional write side of the catalog.
//!
//! The trait is implemented by storage backends (e.g. `quire-store-sqlite`).
//! Every multi-statement operation runs in a single transaction that is rolled
//! back on any failure. Reads here return live rows only; listings and the
//! aggregated detail view live on [`crate::query::CatalogQuery`].
//!
//! All methods return `Send` futures so the trait can be used from
//! multi-threaded async runtimes.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  association::{Character, Creator, Genre},
  content::{Chapter, Series, Volume},
  request::{
    ChapterPatch, NewChapter, NewSeries, NewVolume, SeriesPatch, VolumePatch,
  },
};

pub trait CatalogStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Reference data ────────────────────────────────────────────────────

  fn add_genre(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Genre, Self::Error>> + Send + '_;

  fn add_creator(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Creator, Self::Error>> + Send + '_;

  fn add_character(
    &self,
    name: String,
    description: Option<String>,
  ) -> impl Future<Output = Result<Character, Self::Error>> + Send + '_;

  // ── Series ────────────────────────────────────────────────────────────

  /// Insert a draft series with its associations. Fails with
  /// `AssociationNotFound` if any referenced genre, creator or character is
  /// unknown; nothing is written in that case.
  fn create_series(
    &self,
    input: NewSeries,
  ) -> impl Future<Output = Result<Series, Self::Error>> + Send + '_;

  fn get_series(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Series, Self::Error>> + Send + '_;

  /// Apply a partial update. A present association set replaces the existing
  /// one in the same transaction.
  fn update_series(
    &self,
    id: Uuid,
    patch: SeriesPatch,
  ) -> impl Future<Output = Result<Series, Self::Error>> + Send + '_;

  /// Soft-delete the series with all its volumes and chapters, unless any of
  /// them carries a purchase or rental record (`HasPurchases`).
  fn delete_series(
    &self,
    id: Uuid,
    actor: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Volumes ───────────────────────────────────────────────────────────

  fn create_volume(
    &self,
    series_id: Uuid,
    input: NewVolume,
  ) -> impl Future<Output = Result<Volume, Self::Error>> + Send + '_;

  fn get_volume(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Volume, Self::Error>> + Send + '_;

  /// Live volumes of a live series, by volume number.
  fn list_volumes(
    &self,
    series_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Volume>, Self::Error>> + Send + '_;

  fn update_volume(
    &self,
    id: Uuid,
    patch: VolumePatch,
  ) -> impl Future<Output = Result<Volume, Self::Error>> + Send + '_;

  fn delete_volume(
    &self,
    id: Uuid,
    actor: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Chapters ──────────────────────────────────────────────────────────

  fn create_chapter(
    &self,
    volume_id: Uuid,
    input: NewChapter,
  ) -> impl Future<Output = Result<Chapter, Self::Error>> + Send + '_;

  fn get_chapter(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Chapter, Self::Error>> + Send + '_;

  /// Live chapters of a live volume, by chapter number.
  fn list_chapters(
    &self,
    volume_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Chapter>, Self::Error>> + Send + '_;

  /// Apply a partial update. A present content document recomputes metrics
  /// and bumps `version` by exactly one.
  fn update_chapter(
    &self,
    id: Uuid,
    patch: ChapterPatch,
  ) -> impl Future<Output = Result<Chapter, Self::Error>> + Send + '_;

  fn delete_chapter(
    &self,
    id: Uuid,
    actor: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Publishing ────────────────────────────────────────────────────────

  /// Make the chapter public as of `at` (default: now). Idempotent apart
  /// from overwriting `published_at`. Never touches `version`.
  fn publish_chapter(
    &self,
    id: Uuid,
    at: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<Chapter, Self::Error>> + Send + '_;

  /// Hide the chapter and clear `published_at`; `is_draft` is unchanged.
  fn unpublish_chapter(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Chapter, Self::Error>> + Send + '_;

  /// Hide the chapter until `at`, which must be in the future.
  fn schedule_chapter(
    &self,
    id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Chapter, Self::Error>> + Send + '_;

  /// Publish every scheduled chapter whose time is at or before `now`.
  /// Returns the ids that were published.
  fn publish_due_chapters(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;
}
