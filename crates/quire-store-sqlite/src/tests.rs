//! Integration tests for `SqliteStore` and `SqliteReader` against in-memory
//! databases.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use quire_core::{
  EntityKind, ErrorKind,
  association::{AssociationKind, AssociationSet, CreatorCredit, CreatorRole},
  content::{Chapter, Owner, OwnerKind, Series, SeriesStatus, Volume},
  identity::{
    IdentityLookup, IdentityRef, IdentitySummary, NoIdentities,
    StaticIdentities,
  },
  pagination::{SeriesFilter, SeriesQuery, SortField, SortOrder},
  publishing::PublishState,
  query::CatalogQuery,
  request::{
    ChapterPatch, NewChapter, NewSeries, NewVolume, SeriesPatch, VolumePatch,
  },
  store::CatalogStore,
};
use serde_json::json;
use uuid::Uuid;

use crate::{Error, SqliteReader, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn owner() -> Owner { Owner { kind: OwnerKind::Individual, id: Uuid::new_v4() } }

fn kind_of<T: std::fmt::Debug>(result: Result<T, Error>) -> ErrorKind {
  result.expect_err("operation should fail").kind()
}

async fn add_series(s: &SqliteStore, title: &str) -> Series {
  s.create_series(NewSeries::new(title, owner(), Uuid::new_v4()))
    .await
    .unwrap()
}

/// A series with one volume holding one chapter.
async fn tree(s: &SqliteStore) -> (Series, Volume, Chapter) {
  let series = add_series(s, "Tree").await;
  let volume = s.create_volume(series.id, NewVolume::new(1)).await.unwrap();
  let chapter = s
    .create_chapter(
      volume.id,
      NewChapter::new(1).with_content(json!("once upon a time")),
    )
    .await
    .unwrap();
  (series, volume, chapter)
}

// ─── Series & associations ───────────────────────────────────────────────────

#[tokio::test]
async fn new_series_is_a_draft_owned_by_its_creator() {
  let s = store().await;
  let creator = Uuid::new_v4();
  let owner = Owner { kind: OwnerKind::Organization, id: Uuid::new_v4() };

  let series = s
    .create_series(NewSeries::new("The Salt Road", owner, creator))
    .await
    .unwrap();
  assert_eq!(series.status, SeriesStatus::Draft);
  assert_eq!(series.slug, "the-salt-road");
  assert_eq!(series.original_creator_id, creator);
  assert!(series.published_at.is_none());

  let fetched = s.get_series(series.id).await.unwrap();
  assert_eq!(fetched.owner, owner);
  assert_eq!(fetched.created_at, series.created_at);
  // The returned series is the stored row.
  assert_eq!(
    serde_json::to_value(&series).unwrap(),
    serde_json::to_value(&fetched).unwrap()
  );
}

#[tokio::test]
async fn unknown_genre_rejects_the_whole_series() {
  let s = store().await;
  let known = s.add_genre("Fantasy".into()).await.unwrap();
  let ghost = Uuid::new_v4();

  let mut req = NewSeries::new("Orphan", owner(), Uuid::new_v4());
  req.associations.genre_ids = vec![known.id, ghost];
  let err = s.create_series(req).await.unwrap_err();

  assert_eq!(err.kind(), ErrorKind::AssociationNotFound);
  match err {
    Error::Core(quire_core::Error::AssociationNotFound { kind, missing }) => {
      assert_eq!(kind, AssociationKind::Genre);
      assert_eq!(missing, vec![ghost]);
    }
    other => panic!("unexpected error: {other:?}"),
  }

  let page = s
    .reader(NoIdentities)
    .list_series(&SeriesQuery::default())
    .await
    .unwrap();
  assert_eq!(page.pagination.total, 0);
}

#[tokio::test]
async fn unknown_character_is_reported_by_kind() {
  let s = store().await;
  let mut req = NewSeries::new("Cast", owner(), Uuid::new_v4());
  req.associations.character_ids = vec![Uuid::new_v4()];

  match s.create_series(req).await.unwrap_err() {
    Error::Core(quire_core::Error::AssociationNotFound { kind, .. }) => {
      assert_eq!(kind, AssociationKind::Character);
    }
    other => panic!("unexpected error: {other:?}"),
  }
}

#[tokio::test]
async fn duplicate_genre_names_are_rejected() {
  let s = store().await;
  s.add_genre("Slice of Life".into()).await.unwrap();
  let err = s.add_genre("slice of life".into()).await;
  assert_eq!(kind_of(err), ErrorKind::Validation);
  let blank = s.add_creator("   ".into()).await;
  assert_eq!(kind_of(blank), ErrorKind::Validation);
}

#[tokio::test]
async fn update_replaces_the_association_set() {
  let s = store().await;
  let fantasy = s.add_genre("Fantasy".into()).await.unwrap();
  let horror = s.add_genre("Horror".into()).await.unwrap();
  let ana = s.add_creator("Ana Ruiz".into()).await.unwrap();

  let mut req = NewSeries::new("Shift", owner(), Uuid::new_v4());
  req.associations = AssociationSet {
    genre_ids: vec![fantasy.id],
    creators: vec![CreatorCredit::new(ana.id, CreatorRole::Author)],
    character_ids: vec![],
  };
  let series = s.create_series(req).await.unwrap();

  let patch = SeriesPatch {
    associations: Some(AssociationSet {
      genre_ids: vec![horror.id, horror.id],
      ..Default::default()
    }),
    ..Default::default()
  };
  let updated = s.update_series(series.id, patch).await.unwrap();
  assert!(updated.updated_at >= series.updated_at);

  let detail =
    s.reader(NoIdentities).get_full_detail(series.id).await.unwrap();
  assert_eq!(detail.genres.len(), 1);
  assert_eq!(detail.genres[0].id, horror.id);
  assert!(detail.creators.is_empty());
}

#[tokio::test]
async fn failed_replacement_keeps_old_associations() {
  let s = store().await;
  let fantasy = s.add_genre("Fantasy".into()).await.unwrap();
  let mut req = NewSeries::new("Stable", owner(), Uuid::new_v4());
  req.associations.genre_ids = vec![fantasy.id];
  let series = s.create_series(req).await.unwrap();

  let patch = SeriesPatch {
    title: Some("Unstable".into()),
    associations: Some(AssociationSet {
      genre_ids: vec![Uuid::new_v4()],
      ..Default::default()
    }),
    ..Default::default()
  };
  let err = s.update_series(series.id, patch).await;
  assert_eq!(kind_of(err), ErrorKind::AssociationNotFound);

  let detail =
    s.reader(NoIdentities).get_full_detail(series.id).await.unwrap();
  assert_eq!(detail.series.title, "Stable");
  assert_eq!(detail.genres.len(), 1);
}

#[tokio::test]
async fn series_published_at_is_set_once() {
  let s = store().await;
  let series = add_series(&s, "Quiet").await;

  let public = SeriesPatch { is_public: Some(true), ..Default::default() };
  let first = s.update_series(series.id, public.clone()).await.unwrap();
  let stamped = first.published_at.expect("published_at set");

  let hidden = SeriesPatch { is_public: Some(false), ..Default::default() };
  s.update_series(series.id, hidden).await.unwrap();
  let again = s.update_series(series.id, public).await.unwrap();
  assert_eq!(again.published_at, Some(stamped));
}

// ─── Sequence numbers ────────────────────────────────────────────────────────

#[tokio::test]
async fn volume_numbers_are_unique_among_live_volumes() {
  let s = store().await;
  let series = add_series(&s, "Numbers").await;
  let first = s.create_volume(series.id, NewVolume::new(1)).await.unwrap();
  assert_eq!(first.chapter_count, 0);

  let err = s.create_volume(series.id, NewVolume::new(1)).await.unwrap_err();
  match err {
    Error::Core(quire_core::Error::DuplicateSequenceNumber {
      entity,
      parent_id,
      number,
    }) => {
      assert_eq!(entity, EntityKind::Volume);
      assert_eq!(parent_id, series.id);
      assert_eq!(number, 1);
    }
    other => panic!("unexpected error: {other:?}"),
  }

  // A deleted volume frees its number.
  s.delete_volume(first.id, Uuid::new_v4()).await.unwrap();
  let reused = s.create_volume(series.id, NewVolume::new(1)).await.unwrap();
  assert_ne!(reused.id, first.id);
}

#[tokio::test]
async fn renumbering_onto_a_taken_number_fails() {
  let s = store().await;
  let (_, volume, _) = tree(&s).await;
  let second = s.create_chapter(volume.id, NewChapter::new(2)).await.unwrap();

  let patch = ChapterPatch { chapter_number: Some(1), ..Default::default() };
  let err = s.update_chapter(second.id, patch).await;
  assert_eq!(kind_of(err), ErrorKind::DuplicateSequenceNumber);
  assert_eq!(s.get_chapter(second.id).await.unwrap().chapter_number, 2);
}

#[tokio::test]
async fn volume_in_missing_series_is_not_found() {
  let s = store().await;
  let err = s.create_volume(Uuid::new_v4(), NewVolume::new(1)).await;
  assert_eq!(kind_of(err), ErrorKind::NotFound);
  assert_eq!(
    kind_of(s.create_volume(Uuid::new_v4(), NewVolume::new(0)).await),
    ErrorKind::Validation
  );
}

#[tokio::test]
async fn example_scenario() {
  let s = store().await;
  let series = add_series(&s, "Example").await;
  let volume = s.create_volume(series.id, NewVolume::new(1)).await.unwrap();

  let chapter = s
    .create_chapter(volume.id, NewChapter::new(1).with_content(json!("a b c")))
    .await
    .unwrap();
  assert_eq!(chapter.metrics.word_count, 3);
  assert_eq!(chapter.metrics.reading_time_minutes, 1);
  assert_eq!(chapter.version, 1);
  assert_eq!(chapter.publish_state(), PublishState::Draft);

  let err = s.create_chapter(volume.id, NewChapter::new(1)).await;
  assert_eq!(kind_of(err), ErrorKind::DuplicateSequenceNumber);
}

// ─── Aggregates ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn chapter_count_tracks_live_chapters() {
  let s = store().await;
  let series = add_series(&s, "Counting").await;
  let volume = s.create_volume(series.id, NewVolume::new(1)).await.unwrap();

  let mut ids = Vec::new();
  for n in 1..=3 {
    let c = s
      .create_chapter(
        volume.id,
        NewChapter::new(n).with_content(json!("one two")),
      )
      .await
      .unwrap();
    ids.push(c.id);
  }
  s.delete_chapter(ids[1], Uuid::new_v4()).await.unwrap();

  assert_eq!(s.get_volume(volume.id).await.unwrap().chapter_count, 2);
  assert_eq!(s.list_chapters(volume.id).await.unwrap().len(), 2);

  let totals = s.get_series(series.id).await.unwrap().counters;
  assert_eq!(totals.total_volumes, 1);
  assert_eq!(totals.total_chapters, 2);
  assert_eq!(totals.word_count, 4);
}

// ─── Purchase guard ──────────────────────────────────────────────────────────

#[tokio::test]
async fn purchased_chapter_blocks_series_delete() {
  let s = store().await;
  let (series, volume, chapter) = tree(&s).await;
  s.record_purchase(EntityKind::Chapter, chapter.id).await.unwrap();

  let err = s.delete_series(series.id, Uuid::new_v4()).await.unwrap_err();
  match err {
    Error::Core(quire_core::Error::HasPurchases { entity, id }) => {
      assert_eq!(entity, EntityKind::Series);
      assert_eq!(id, series.id);
    }
    other => panic!("unexpected error: {other:?}"),
  }

  let after = s.get_series(series.id).await.unwrap();
  assert_eq!(after.updated_at, series.updated_at);
  assert!(after.deleted.is_none());
  assert_eq!(s.list_volumes(series.id).await.unwrap().len(), 1);
  assert_eq!(s.get_volume(volume.id).await.unwrap().chapter_count, 1);
  assert!(s.get_chapter(chapter.id).await.unwrap().deleted.is_none());
}

#[tokio::test]
async fn rented_volume_blocks_volume_and_series_delete() {
  let s = store().await;
  let (series, volume, chapter) = tree(&s).await;
  s.record_rental(EntityKind::Volume, volume.id).await.unwrap();

  assert_eq!(
    kind_of(s.delete_volume(volume.id, Uuid::new_v4()).await),
    ErrorKind::HasPurchases
  );
  assert_eq!(
    kind_of(s.delete_series(series.id, Uuid::new_v4()).await),
    ErrorKind::HasPurchases
  );
  // The chapter itself carries no record.
  s.delete_chapter(chapter.id, Uuid::new_v4()).await.unwrap();
}

#[tokio::test]
async fn records_on_deleted_descendants_still_block() {
  let s = store().await;
  let (series, volume, chapter) = tree(&s).await;
  let spare = s.create_chapter(volume.id, NewChapter::new(2)).await.unwrap();
  s.delete_chapter(spare.id, Uuid::new_v4()).await.unwrap();
  s.record_purchase(EntityKind::Chapter, spare.id).await.unwrap();

  assert_eq!(
    kind_of(s.delete_series(series.id, Uuid::new_v4()).await),
    ErrorKind::HasPurchases
  );
  s.get_chapter(chapter.id).await.unwrap();
}

// ─── Soft delete ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn series_delete_cascades() {
  let s = store().await;
  let (series, volume, chapter) = tree(&s).await;
  let actor = Uuid::new_v4();

  s.delete_series(series.id, actor).await.unwrap();

  assert_eq!(kind_of(s.get_series(series.id).await), ErrorKind::NotFound);
  assert_eq!(kind_of(s.get_volume(volume.id).await), ErrorKind::NotFound);
  assert_eq!(kind_of(s.get_chapter(chapter.id).await), ErrorKind::NotFound);
  assert_eq!(kind_of(s.list_volumes(series.id).await), ErrorKind::NotFound);

  for (table, id) in [
    ("series", series.id),
    ("volumes", volume.id),
    ("chapters", chapter.id),
  ] {
    let (at, by) = s.deletion_marker(table, id).await.unwrap();
    assert!(at.is_some(), "{table} row has no deleted_at");
    assert_eq!(by, Some(actor.to_string()));
  }

  let reader = s.reader(NoIdentities);
  let err = reader.get_full_detail(series.id).await;
  assert_eq!(kind_of(err), ErrorKind::NotFound);
  let page = reader.list_series(&SeriesQuery::default()).await.unwrap();
  assert!(page.items.is_empty());

  // Deleting twice reports the row as gone.
  assert_eq!(
    kind_of(s.delete_series(series.id, actor).await),
    ErrorKind::NotFound
  );
}

#[tokio::test]
async fn volume_delete_cascades_to_chapters_only() {
  let s = store().await;
  let (series, volume, chapter) = tree(&s).await;
  s.delete_volume(volume.id, Uuid::new_v4()).await.unwrap();

  assert_eq!(kind_of(s.get_chapter(chapter.id).await), ErrorKind::NotFound);
  let after = s.get_series(series.id).await.unwrap();
  assert_eq!(after.counters.total_volumes, 0);
  assert_eq!(after.counters.total_chapters, 0);
}

// ─── Partial updates ─────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_patches_write_nothing() {
  let s = store().await;
  let (series, volume, chapter) = tree(&s).await;

  assert_eq!(
    kind_of(s.update_series(series.id, SeriesPatch::default()).await),
    ErrorKind::NoFieldsProvided
  );
  assert_eq!(
    kind_of(s.update_volume(volume.id, VolumePatch::default()).await),
    ErrorKind::NoFieldsProvided
  );
  assert_eq!(
    kind_of(s.update_chapter(chapter.id, ChapterPatch::default()).await),
    ErrorKind::NoFieldsProvided
  );

  let series_after = s.get_series(series.id).await.unwrap();
  assert_eq!(series_after.updated_at, series.updated_at);
  let volume_after = s.get_volume(volume.id).await.unwrap();
  assert_eq!(volume_after.updated_at, volume.updated_at);
  let unchanged = s.get_chapter(chapter.id).await.unwrap();
  assert_eq!(unchanged.updated_at, chapter.updated_at);
  assert_eq!(unchanged.version, 1);
}

#[tokio::test]
async fn patching_a_missing_row_is_not_found() {
  let s = store().await;
  let patch = VolumePatch { title: Some("Lost".into()), ..Default::default() };
  assert_eq!(
    kind_of(s.update_volume(Uuid::new_v4(), patch).await),
    ErrorKind::NotFound
  );
}

#[tokio::test]
async fn content_updates_bump_version_and_metrics() {
  let s = store().await;
  let (series, _, chapter) = tree(&s).await;

  let long = vec!["word"; 450].join(" ");
  let patch = ChapterPatch { content: Some(json!(long)), ..Default::default() };
  let updated = s.update_chapter(chapter.id, patch).await.unwrap();
  assert_eq!(updated.version, 2);
  assert_eq!(updated.metrics.word_count, 450);
  assert_eq!(updated.metrics.character_count, 450 * 5 - 1);
  assert_eq!(updated.metrics.reading_time_minutes, 3);
  assert_eq!(s.get_series(series.id).await.unwrap().counters.word_count, 450);

  let rename =
    ChapterPatch { title: Some("Interlude".into()), ..Default::default() };
  let renamed = s.update_chapter(chapter.id, rename).await.unwrap();
  assert_eq!(renamed.version, 2);
  assert_eq!(renamed.title.as_deref(), Some("Interlude"));
  assert_eq!(renamed.metrics, updated.metrics);
}

#[tokio::test]
async fn series_fields_update_independently() {
  let s = store().await;
  let series = add_series(&s, "Draft Title").await;

  let patch = SeriesPatch {
    title: Some("Final Title".into()),
    status: Some(SeriesStatus::Ongoing),
    tags: Some(vec!["slow-burn".into()]),
    purchase_price: Some(1299),
    ..Default::default()
  };
  let updated = s.update_series(series.id, patch).await.unwrap();
  assert_eq!(updated.title, "Final Title");
  assert_eq!(updated.slug, series.slug);
  assert_eq!(updated.status, SeriesStatus::Ongoing);
  assert_eq!(updated.tags, vec!["slow-burn".to_string()]);
  assert_eq!(updated.monetization.purchase_price, Some(1299));
  assert_eq!(updated.original_creator_id, series.original_creator_id);
}

// ─── Publishing ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn publish_cycle_leaves_version_alone() {
  let s = store().await;
  let (_, _, chapter) = tree(&s).await;
  let earlier = Utc::now() - Duration::hours(1);

  let published = s.publish_chapter(chapter.id, Some(earlier)).await.unwrap();
  assert!(published.is_published());
  assert_eq!(published.publish_state(), PublishState::Public);

  let hidden = s.unpublish_chapter(chapter.id).await.unwrap();
  assert_eq!(hidden.publish_state(), PublishState::Unpublished);
  assert!(hidden.published_at.is_none());

  let again = s.publish_chapter(chapter.id, None).await.unwrap();
  assert!(again.is_public);
  assert!(again.published_at.is_some_and(|at| at > earlier));
  assert_eq!(again.version, 1);
}

#[tokio::test]
async fn unpublishing_a_draft_keeps_it_a_draft() {
  let s = store().await;
  let (_, _, chapter) = tree(&s).await;
  let after = s.unpublish_chapter(chapter.id).await.unwrap();
  assert!(after.is_draft);
  assert_eq!(after.publish_state(), PublishState::Draft);
}

#[tokio::test]
async fn chapters_can_be_created_public() {
  let s = store().await;
  let (_, volume, _) = tree(&s).await;
  let mut req = NewChapter::new(2);
  req.is_draft = false;
  req.is_public = true;

  let chapter = s.create_chapter(volume.id, req).await.unwrap();
  assert!(chapter.is_published());
  assert_eq!(chapter.published_at, Some(chapter.created_at));
}

#[tokio::test]
async fn scheduled_chapters_publish_when_due() {
  let s = store().await;
  let (_, _, chapter) = tree(&s).await;
  let at = Utc::now() + Duration::hours(1);

  let scheduled = s.schedule_chapter(chapter.id, at).await.unwrap();
  assert_eq!(scheduled.publish_state(), PublishState::Scheduled);

  assert!(s.publish_due_chapters(Utc::now()).await.unwrap().is_empty());

  let ids = s.publish_due_chapters(at + Duration::minutes(1)).await.unwrap();
  assert_eq!(ids, vec![chapter.id]);

  let live = s.get_chapter(chapter.id).await.unwrap();
  assert!(live.is_published());
  assert!(live.scheduled_publish_at.is_none());
  assert_eq!(
    live.published_at.map(|t| t.timestamp_micros()),
    Some(at.timestamp_micros())
  );

  // A second sweep finds nothing left to do.
  let later = at + Duration::hours(1);
  assert!(s.publish_due_chapters(later).await.unwrap().is_empty());
}

#[tokio::test]
async fn schedules_must_be_in_the_future() {
  let s = store().await;
  let (_, _, chapter) = tree(&s).await;
  let past = Utc::now() - Duration::minutes(5);
  assert_eq!(
    kind_of(s.schedule_chapter(chapter.id, past).await),
    ErrorKind::Validation
  );
}

#[tokio::test]
async fn publishing_clears_a_pending_schedule() {
  let s = store().await;
  let (_, _, chapter) = tree(&s).await;
  s.schedule_chapter(chapter.id, Utc::now() + Duration::days(1))
    .await
    .unwrap();
  let published = s.publish_chapter(chapter.id, None).await.unwrap();
  assert!(published.scheduled_publish_at.is_none());
}

#[tokio::test]
async fn deleted_chapters_cannot_be_published() {
  let s = store().await;
  let (_, _, chapter) = tree(&s).await;
  s.delete_chapter(chapter.id, Uuid::new_v4()).await.unwrap();
  assert_eq!(
    kind_of(s.publish_chapter(chapter.id, None).await),
    ErrorKind::NotFound
  );
}

// ─── Listing ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn middle_page_of_twenty_five() {
  let s = store().await;
  for n in 0..25 {
    add_series(&s, &format!("Series {n:02}")).await;
  }

  let query =
    SeriesQuery { page: Some(2), page_size: Some(10), ..Default::default() };
  let page = s.reader(NoIdentities).list_series(&query).await.unwrap();
  assert_eq!(page.items.len(), 10);
  assert_eq!(page.pagination.total, 25);
  assert_eq!(page.pagination.total_pages, 3);
  assert!(page.pagination.has_next);
  assert!(page.pagination.has_previous);
}

#[tokio::test]
async fn filters_narrow_the_listing() {
  let s = store().await;
  let horror = s.add_genre("Horror".into()).await.unwrap();

  let mut req = NewSeries::new("Midnight Lantern", owner(), Uuid::new_v4());
  req.associations.genre_ids = vec![horror.id];
  req.is_public = true;
  let lantern = s.create_series(req).await.unwrap();
  add_series(&s, "Morning Glory").await;
  add_series(&s, "Afternoon Tea").await;

  let reader = s.reader(NoIdentities);
  let list = |filter: SeriesFilter| SeriesQuery { filter, ..Default::default() };

  let genre = SeriesFilter { genre_ids: vec![horror.id], ..Default::default() };
  let by_genre = reader.list_series(&list(genre)).await.unwrap();
  assert_eq!(by_genre.items.len(), 1);
  assert_eq!(by_genre.items[0].id, lantern.id);

  let text = SeriesFilter { search: Some("glory".into()), ..Default::default() };
  let by_text = reader.list_series(&list(text)).await.unwrap();
  assert_eq!(by_text.pagination.total, 1);

  let visible = SeriesFilter { is_public: Some(true), ..Default::default() };
  let public = reader.list_series(&list(visible)).await.unwrap();
  assert_eq!(public.pagination.total, 1);

  let literal = SeriesFilter { search: Some("%".into()), ..Default::default() };
  let wildcard = reader.list_series(&list(literal)).await.unwrap();
  assert_eq!(wildcard.pagination.total, 0);
}

#[tokio::test]
async fn search_reads_summary_text_not_its_keys() {
  let s = store().await;
  let mut req = NewSeries::new("Zzz", owner(), Uuid::new_v4());
  req.summary = json!({ "en": "A quiet lighthouse", "ja": "静かな灯台" });
  s.create_series(req).await.unwrap();

  let reader = s.reader(NoIdentities);
  assert_eq!(search_total(&reader, "lighthouse").await, 1);
  assert_eq!(search_total(&reader, "LIGHTHOUSE").await, 1);
  assert_eq!(search_total(&reader, "灯台").await, 1);
  // Language keys and JSON punctuation are not text.
  assert_eq!(search_total(&reader, "en").await, 0);
  assert_eq!(search_total(&reader, "ja").await, 0);
  assert_eq!(search_total(&reader, "\":\"").await, 0);
}

async fn search_total(reader: &SqliteReader<NoIdentities>, needle: &str) -> u64 {
  let filter = SeriesFilter { search: Some(needle.into()), ..Default::default() };
  let query = SeriesQuery { filter, ..Default::default() };
  reader.list_series(&query).await.unwrap().pagination.total
}

#[tokio::test]
async fn listing_sorts_by_allow_listed_fields() {
  let s = store().await;
  for title in ["banana", "Apple", "cherry"] {
    add_series(&s, title).await;
  }
  let query = SeriesQuery {
    sort: SortField::Title,
    order: SortOrder::Asc,
    ..Default::default()
  };
  let page = s.reader(NoIdentities).list_series(&query).await.unwrap();
  let titles: Vec<_> = page.items.iter().map(|i| i.title.as_str()).collect();
  assert_eq!(titles, ["Apple", "banana", "cherry"]);
}

#[tokio::test]
async fn latest_chapter_update_is_derived() {
  let s = store().await;
  let (series, _, chapter) = tree(&s).await;
  add_series(&s, "No chapters").await;

  let query = SeriesQuery {
    filter: SeriesFilter {
      chapter_updated_after: Some(chapter.updated_at - Duration::seconds(1)),
      ..Default::default()
    },
    ..Default::default()
  };
  let page = s.reader(NoIdentities).list_series(&query).await.unwrap();
  assert_eq!(page.items.len(), 1);
  assert_eq!(page.items[0].id, series.id);
  assert_eq!(page.items[0].latest_chapter_at, Some(chapter.updated_at));
  assert_eq!(page.items[0].total_chapters, 1);
}

// ─── Aggregated detail ───────────────────────────────────────────────────────

#[tokio::test]
async fn detail_without_associations_has_empty_lists() {
  let s = store().await;
  let series = add_series(&s, "Bare").await;

  let detail =
    s.reader(NoIdentities).get_full_detail(series.id).await.unwrap();
  assert!(detail.genres.is_empty());
  assert!(detail.creators.is_empty());
  assert!(detail.characters.is_empty());
  assert_eq!(detail.live_volume_count, 0);
  assert_eq!(detail.live_chapter_count, 0);
  assert!(detail.owner.is_none());
}

#[tokio::test]
async fn detail_nests_associations_and_people() {
  let s = store().await;
  let fantasy = s.add_genre("Fantasy".into()).await.unwrap();
  let ana = s.add_creator("Ana Ruiz".into()).await.unwrap();
  let wren = s
    .add_character("Wren".into(), Some("A cartographer".into()))
    .await
    .unwrap();

  let owner = owner();
  let creator = Uuid::new_v4();
  let mut req = NewSeries::new("Maps", owner, creator);
  req.associations = AssociationSet {
    genre_ids: vec![fantasy.id],
    creators: vec![
      CreatorCredit::new(ana.id, CreatorRole::Author),
      CreatorCredit::new(ana.id, CreatorRole::Custom("letterer".into())),
    ],
    character_ids: vec![wren.id],
  };
  let series = s.create_series(req).await.unwrap();
  let volume = s.create_volume(series.id, NewVolume::new(1)).await.unwrap();
  s.create_chapter(volume.id, NewChapter::new(1)).await.unwrap();

  let people = StaticIdentities::new()
    .with(owner.id, "Ana")
    .with(creator, "Bo");
  let detail = s.reader(people).get_full_detail(series.id).await.unwrap();

  assert_eq!(detail.genres[0].slug, "fantasy");
  assert_eq!(detail.creators.len(), 2);
  assert!(
    detail
      .creators
      .iter()
      .any(|c| c.role == CreatorRole::Custom("letterer".into()))
  );
  assert_eq!(detail.characters[0].name, "Wren");
  assert_eq!(detail.live_volume_count, 1);
  assert_eq!(detail.live_chapter_count, 1);
  assert_eq!(detail.owner.map(|o| o.display_name).as_deref(), Some("Ana"));
  assert_eq!(
    detail.original_creator.map(|o| o.display_name).as_deref(),
    Some("Bo")
  );
}

struct BrokenDirectory;

impl IdentityLookup for BrokenDirectory {
  type Error = std::io::Error;

  async fn lookup(
    &self,
    _refs: &[IdentityRef],
  ) -> Result<HashMap<Uuid, IdentitySummary>, std::io::Error> {
    Err(std::io::Error::other("directory offline"))
  }
}

#[tokio::test]
async fn identity_failures_degrade_the_detail() {
  let s = store().await;
  let series = add_series(&s, "Resilient").await;

  let detail =
    s.reader(BrokenDirectory).get_full_detail(series.id).await.unwrap();
  assert_eq!(detail.series.id, series.id);
  assert!(detail.owner.is_none());
  assert!(detail.original_creator.is_none());
}

// ─── Concurrency ─────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_volume_inserts_keep_one_winner() {
  let s = store().await;
  let series_id = add_series(&s, "Race").await.id;

  let tasks: Vec<_> = (0..8)
    .map(|_| {
      let s = s.clone();
      tokio::spawn(async move {
        s.create_volume(series_id, NewVolume::new(1)).await
      })
    })
    .collect();

  let (mut won, mut lost) = (0, 0);
  for task in tasks {
    match task.await.unwrap() {
      Ok(_) => won += 1,
      Err(e) => {
        assert_eq!(e.kind(), ErrorKind::DuplicateSequenceNumber);
        lost += 1;
      }
    }
  }
  assert_eq!((won, lost), (1, 7));
  assert_eq!(s.list_volumes(series_id).await.unwrap().len(), 1);
  let totals = s.get_series(series_id).await.unwrap().counters;
  assert_eq!(totals.total_volumes, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_renumbering_keeps_one_winner() {
  let s = store().await;
  let (_, volume, first) = tree(&s).await;
  let mut ids = vec![first.id];
  for n in 2..=4 {
    ids.push(s.create_chapter(volume.id, NewChapter::new(n)).await.unwrap().id);
  }

  let tasks: Vec<_> = ids
    .into_iter()
    .map(|id| {
      let s = s.clone();
      tokio::spawn(async move {
        let patch = ChapterPatch { chapter_number: Some(9), ..Default::default() };
        s.update_chapter(id, patch).await
      })
    })
    .collect();

  let mut won = 0;
  for task in tasks {
    match task.await.unwrap() {
      Ok(chapter) => {
        assert_eq!(chapter.chapter_number, 9);
        won += 1;
      }
      Err(e) => assert_eq!(e.kind(), ErrorKind::DuplicateSequenceNumber),
    }
  }
  assert_eq!(won, 1);

  let numbers: Vec<_> = s
    .list_chapters(volume.id)
    .await
    .unwrap()
    .iter()
    .map(|c| c.chapter_number)
    .collect();
  assert_eq!(numbers.len(), 4);
  assert_eq!(numbers.iter().filter(|n| **n == 9).count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn purchase_racing_a_delete_is_never_half_applied() {
  for _ in 0..10 {
    let s = store().await;
    let (series, volume, chapter) = tree(&s).await;

    let (series_id, chapter_id) = (series.id, chapter.id);
    let buyer = {
      let s = s.clone();
      tokio::spawn(async move {
        s.record_purchase(EntityKind::Chapter, chapter_id).await
      })
    };
    let deleter = {
      let s = s.clone();
      tokio::spawn(async move { s.delete_series(series_id, Uuid::new_v4()).await })
    };
    buyer.await.unwrap().unwrap();

    match deleter.await.unwrap() {
      // The purchase landed after the delete committed.
      Ok(()) => {
        assert_eq!(kind_of(s.get_series(series.id).await), ErrorKind::NotFound);
        assert_eq!(kind_of(s.get_volume(volume.id).await), ErrorKind::NotFound);
        assert_eq!(
          kind_of(s.get_chapter(chapter.id).await),
          ErrorKind::NotFound
        );
      }
      // The purchase committed first and blocked the delete.
      Err(e) => {
        assert_eq!(e.kind(), ErrorKind::HasPurchases);
        assert!(s.get_series(series.id).await.unwrap().deleted.is_none());
        s.get_volume(volume.id).await.unwrap();
        s.get_chapter(chapter.id).await.unwrap();
      }
    }
  }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn listings_do_not_block_writers() {
  let s = store().await;
  let writer = {
    let s = s.clone();
    tokio::spawn(async move {
      for n in 0..100 {
        let req = NewSeries::new(format!("Busy {n}"), owner(), Uuid::new_v4());
        s.create_series(req).await?;
      }
      Ok::<_, Error>(())
    })
  };

  let reader = s.reader(NoIdentities);
  for _ in 0..100 {
    reader.list_series(&SeriesQuery::default()).await.unwrap();
  }
  writer.await.unwrap().unwrap();

  let page = reader.list_series(&SeriesQuery::default()).await.unwrap();
  assert_eq!(page.pagination.total, 100);
}

#[tokio::test]
async fn file_store_reopens_with_data() {
  let dir =
    std::env::temp_dir().join(format!("quire-test-{}", Uuid::new_v4()));
  std::fs::create_dir_all(&dir).unwrap();
  let path = dir.join("catalog.db");

  let id = {
    let s = SqliteStore::open(&path).await.unwrap();
    add_series(&s, "Persistent").await.id
  };
  let s = SqliteStore::open(&path).await.unwrap();
  assert_eq!(s.get_series(id).await.unwrap().title, "Persistent");
  let page = s
    .reader(NoIdentities)
    .list_series(&SeriesQuery::default())
    .await
    .unwrap();
  assert_eq!(page.pagination.total, 1);

  std::fs::remove_dir_all(&dir).ok();
}
