//! [`SqliteStore`]: the SQLite implementation of [`CatalogStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{
  Connection, OpenFlags, OptionalExtension as _, TransactionBehavior, params,
  params_from_iter,
};
use uuid::Uuid;

use quire_core::{
  EntityKind,
  association::{Character, Creator, Genre, slug_for},
  content::{Chapter, Series, SeriesCounters, SeriesStatus, Volume},
  identity::IdentityLookup,
  metrics::ContentMetrics,
  publishing::PublishFields,
  request::{
    ChapterPatch, NewChapter, NewSeries, NewVolume, SeriesPatch, VolumePatch,
  },
  store::CatalogStore,
};

use crate::{
  Error, Result, association,
  encode::{
    CHAPTER_COLUMNS, RawChapter, RawSeries, RawVolume, SERIES_COLUMNS,
    VOLUME_COLUMNS, decode_uuid, encode_doc, encode_dt, encode_list,
    encode_uuid, now,
  },
  guard::{self, Node},
  reader::SqliteReader,
  schema::{CONNECTION_PRAGMAS, SCHEMA},
  update::UpdateBuilder,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Quire catalog backed by SQLite.
///
/// Holds two connections to the same database: a writer that runs every
/// mutation in a `BEGIN IMMEDIATE` transaction, and a reader handed to
/// [`SqliteReader`]. Cloning is cheap; both connections are
/// reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  writer: tokio_rusqlite::Connection,
  reader: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_path_buf();
    let writer = tokio_rusqlite::Connection::open(&path).await?;
    init_connection(&writer, true).await?;
    let reader = tokio_rusqlite::Connection::open(&path).await?;
    init_connection(&reader, false).await?;
    tracing::debug!(path = %path.display(), "opened catalog store");
    Ok(Self { writer, reader })
  }

  /// Open a private in-memory store, useful for testing. Both connections
  /// share one database through a uniquely named shared-cache URI.
  ///
  /// The reader runs in `read_uncommitted` mode: a shared-cache reader
  /// otherwise holds table read locks that fail concurrent writes with
  /// `SQLITE_LOCKED_SHAREDCACHE`, which `busy_timeout` does not retry.
  pub async fn open_in_memory() -> Result<Self> {
    let uri = format!(
      "file:quire-{}?mode=memory&cache=shared",
      Uuid::new_v4().simple()
    );
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
      | OpenFlags::SQLITE_OPEN_CREATE
      | OpenFlags::SQLITE_OPEN_URI
      | OpenFlags::SQLITE_OPEN_SHARED_CACHE
      | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let writer =
      tokio_rusqlite::Connection::open_with_flags(&uri, flags).await?;
    init_connection(&writer, true).await?;
    let reader =
      tokio_rusqlite::Connection::open_with_flags(&uri, flags).await?;
    init_connection(&reader, false).await?;
    reader
      .call(|conn| {
        conn.execute_batch("PRAGMA read_uncommitted = 1;")?;
        Ok(())
      })
      .await?;
    Ok(Self { writer, reader })
  }

  /// The read side of this store, resolving owner display data through
  /// `identities`.
  pub fn reader<L: IdentityLookup>(&self, identities: L) -> SqliteReader<L> {
    SqliteReader::new(self.reader.clone(), identities)
  }

  /// Run `op` in one `IMMEDIATE` transaction on the writer. The transaction
  /// commits only if `op` succeeds; otherwise it is rolled back on drop.
  async fn write<T, F>(&self, op: F) -> Result<T>
  where
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self
      .writer
      .call(move |conn| {
        let tx =
          conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = op(&*tx);
        if outcome.is_ok() {
          tx.commit()?;
        }
        Ok(outcome)
      })
      .await?
  }

  /// Run a read-only `op` on the writer, so callers see their own writes.
  async fn read<T, F>(&self, op: F) -> Result<T>
  where
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self.writer.call(move |conn| Ok(op(&*conn))).await?
  }
}

async fn init_connection(
  conn: &tokio_rusqlite::Connection,
  with_schema: bool,
) -> Result<()> {
  conn
    .call(move |conn| {
      conn.execute_batch(CONNECTION_PRAGMAS)?;
      if with_schema {
        conn.execute_batch(SCHEMA)?;
      }
      Ok(())
    })
    .await?;
  Ok(())
}

// ─── Row access ──────────────────────────────────────────────────────────────

fn not_found(entity: EntityKind, id: Uuid) -> Error {
  quire_core::Error::not_found(entity, id).into()
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _)
      if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

/// Translate a hit on a live-sequence index into `DuplicateSequenceNumber`.
fn sequence_conflict(
  err: rusqlite::Error,
  entity: EntityKind,
  parent_id: Uuid,
  number: i64,
) -> Error {
  if is_unique_violation(&err) {
    quire_core::Error::DuplicateSequenceNumber { entity, parent_id, number }
      .into()
  } else {
    err.into()
  }
}

fn load_series(conn: &Connection, id: Uuid) -> Result<Series> {
  let raw = conn
    .query_row(
      &format!(
        "SELECT {SERIES_COLUMNS} FROM series s
          WHERE s.id = ?1 AND s.is_deleted = 0"
      ),
      params![encode_uuid(id)],
      RawSeries::from_row,
    )
    .optional()?;
  raw.ok_or_else(|| not_found(EntityKind::Series, id))?.into_series()
}

fn load_volume(conn: &Connection, id: Uuid) -> Result<Volume> {
  let raw = conn
    .query_row(
      &format!(
        "SELECT {VOLUME_COLUMNS} FROM volumes v
          WHERE v.id = ?1 AND v.is_deleted = 0"
      ),
      params![encode_uuid(id)],
      RawVolume::from_row,
    )
    .optional()?;
  raw.ok_or_else(|| not_found(EntityKind::Volume, id))?.into_volume()
}

fn load_chapter(conn: &Connection, id: Uuid) -> Result<Chapter> {
  let raw = conn
    .query_row(
      &format!(
        "SELECT {CHAPTER_COLUMNS} FROM chapters c
          WHERE c.id = ?1 AND c.is_deleted = 0"
      ),
      params![encode_uuid(id)],
      RawChapter::from_row,
    )
    .optional()?;
  raw.ok_or_else(|| not_found(EntityKind::Chapter, id))?.into_chapter()
}

fn series_of_volume(conn: &Connection, volume_id: Uuid) -> Result<Uuid> {
  let id: String = conn.query_row(
    "SELECT series_id FROM volumes WHERE id = ?1",
    params![encode_uuid(volume_id)],
    |row| row.get(0),
  )?;
  decode_uuid(&id)
}

// ─── Aggregates ──────────────────────────────────────────────────────────────

/// Recount the live chapters of a volume.
fn refresh_chapter_count(conn: &Connection, volume_id: Uuid) -> Result<()> {
  conn.execute(
    "UPDATE volumes
        SET chapter_count = (
          SELECT COUNT(*) FROM chapters
           WHERE volume_id = ?1 AND is_deleted = 0
        )
      WHERE id = ?1",
    params![encode_uuid(volume_id)],
  )?;
  Ok(())
}

/// Recompute `total_volumes`, `total_chapters` and `word_count` from the
/// live rows beneath a series.
fn refresh_series_totals(conn: &Connection, series_id: Uuid) -> Result<()> {
  conn.execute(
    "UPDATE series
        SET total_volumes = (
              SELECT COUNT(*) FROM volumes
               WHERE series_id = ?1 AND is_deleted = 0
            ),
            total_chapters = (
              SELECT COUNT(*)
                FROM chapters c JOIN volumes v ON v.id = c.volume_id
               WHERE v.series_id = ?1 AND v.is_deleted = 0 AND c.is_deleted = 0
            ),
            word_count = (
              SELECT COALESCE(SUM(c.word_count), 0)
                FROM chapters c JOIN volumes v ON v.id = c.volume_id
               WHERE v.series_id = ?1 AND v.is_deleted = 0 AND c.is_deleted = 0
            )
      WHERE id = ?1",
    params![encode_uuid(series_id)],
  )?;
  Ok(())
}

// ─── Inserts ─────────────────────────────────────────────────────────────────

fn insert_series(conn: &Connection, s: &Series) -> Result<()> {
  conn.execute(
    "INSERT INTO series (
       id, title, slug, cover_url, summary, status, age_rating,
       is_mature, is_public, is_featured, is_completed,
       ownership_type, primary_owner_id, original_creator_id,
       keywords, tags,
       purchase_price, rental_price, rental_duration_days, is_premium,
       published_at, created_at, updated_at
     ) VALUES (
       ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
       ?17, ?18, ?19, ?20, ?21, ?22, ?23
     )",
    params![
      encode_uuid(s.id),
      s.title,
      s.slug,
      s.cover_url,
      encode_doc(&s.summary),
      s.status.as_str(),
      s.age_rating.as_str(),
      s.is_mature,
      s.is_public,
      s.is_featured,
      s.is_completed,
      s.owner.kind.as_str(),
      encode_uuid(s.owner.id),
      encode_uuid(s.original_creator_id),
      encode_list(&s.keywords)?,
      encode_list(&s.tags)?,
      s.monetization.purchase_price,
      s.monetization.rental_price,
      s.monetization.rental_duration_days,
      s.monetization.is_premium,
      s.published_at.map(encode_dt),
      encode_dt(s.created_at),
      encode_dt(s.updated_at),
    ],
  )?;
  Ok(())
}

fn insert_volume(conn: &Connection, v: &Volume) -> Result<()> {
  conn
    .execute(
      "INSERT INTO volumes (
         id, series_id, volume_number, title, description, cover_url,
         is_available, price, chapter_count, created_at, updated_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, ?9)",
      params![
        encode_uuid(v.id),
        encode_uuid(v.series_id),
        v.volume_number,
        v.title,
        v.description,
        v.cover_url,
        v.is_available,
        v.price,
        encode_dt(v.created_at),
      ],
    )
    .map_err(|e| {
      sequence_conflict(e, EntityKind::Volume, v.series_id, v.volume_number)
    })?;
  Ok(())
}

fn insert_chapter(conn: &Connection, c: &Chapter) -> Result<()> {
  conn
    .execute(
      "INSERT INTO chapters (
         id, volume_id, chapter_number, title, content,
         published_at, scheduled_publish_at, is_draft, is_public, version,
         word_count, character_count, reading_time_minutes,
         content_warnings, is_mature, created_at, updated_at
       ) VALUES (
         ?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7, ?8, 1, ?9, ?10, ?11, ?12, ?13, ?14, ?14
       )",
      params![
        encode_uuid(c.id),
        encode_uuid(c.volume_id),
        c.chapter_number,
        c.title,
        c.content.as_ref().map(encode_doc),
        c.published_at.map(encode_dt),
        c.is_draft,
        c.is_public,
        c.metrics.word_count,
        c.metrics.character_count,
        c.metrics.reading_time_minutes,
        encode_list(&c.content_warnings)?,
        c.is_mature,
        encode_dt(c.created_at),
      ],
    )
    .map_err(|e| {
      sequence_conflict(e, EntityKind::Chapter, c.volume_id, c.chapter_number)
    })?;
  Ok(())
}

// ─── Soft delete ─────────────────────────────────────────────────────────────

/// Refuse to delete `node` while any purchase or rental covers it.
fn guard_delete(conn: &Connection, node: Node) -> Result<()> {
  if guard::has_commercial_records(conn, node)? {
    tracing::info!(
      entity = %node.entity(),
      id = %node.id(),
      "delete refused: commercial records exist"
    );
    return Err(
      quire_core::Error::HasPurchases { entity: node.entity(), id: node.id() }
        .into(),
    );
  }
  Ok(())
}

/// Mark live rows of `table` matching `predicate` (which binds `?1`) as
/// deleted. `?2` is the timestamp and `?3` the actor.
fn mark_deleted(
  conn: &Connection,
  table: &'static str,
  predicate: &'static str,
  key: Uuid,
  at: DateTime<Utc>,
  actor: Uuid,
) -> Result<usize> {
  let changed = conn.execute(
    &format!(
      "UPDATE {table}
          SET is_deleted = 1, deleted_at = ?2, deleted_by = ?3, updated_at = ?2
        WHERE is_deleted = 0 AND {predicate}"
    ),
    params![encode_uuid(key), encode_dt(at), encode_uuid(actor)],
  )?;
  Ok(changed)
}

const CHAPTERS_OF_SERIES: &str =
  "volume_id IN (SELECT id FROM volumes WHERE series_id = ?1)";

// ─── Publishing ──────────────────────────────────────────────────────────────

fn write_publish_fields(
  conn: &Connection,
  id: Uuid,
  fields: PublishFields,
  now: DateTime<Utc>,
) -> Result<()> {
  conn.execute(
    "UPDATE chapters
        SET is_draft = ?1, is_public = ?2, published_at = ?3,
            scheduled_publish_at = ?4, updated_at = ?5
      WHERE id = ?6 AND is_deleted = 0",
    params![
      fields.is_draft,
      fields.is_public,
      fields.published_at.map(encode_dt),
      fields.scheduled_publish_at.map(encode_dt),
      encode_dt(now),
      encode_uuid(id),
    ],
  )?;
  Ok(())
}

/// Load a live chapter, apply `transition` to its publishing columns and
/// persist the result.
async fn transition_chapter<F>(
  store: &SqliteStore,
  id: Uuid,
  transition: F,
) -> Result<Chapter>
where
  F: FnOnce(PublishFields, DateTime<Utc>) -> Result<PublishFields>
    + Send
    + 'static,
{
  let now = now();
  store
    .write(move |tx| {
      let chapter = load_chapter(tx, id)?;
      let next = transition(PublishFields::of(&chapter), now)?;
      write_publish_fields(tx, id, next, now)?;
      load_chapter(tx, id)
    })
    .await
}

// ─── CatalogStore impl ───────────────────────────────────────────────────────

impl CatalogStore for SqliteStore {
  type Error = Error;

  // ── Reference data ────────────────────────────────────────────────────────

  async fn add_genre(&self, name: String) -> Result<Genre> {
    let now = now();
    let genre = self
      .write(move |tx| association::insert_genre(tx, name, now))
      .await?;
    tracing::info!(genre_id = %genre.id, slug = %genre.slug, "genre added");
    Ok(genre)
  }

  async fn add_creator(&self, name: String) -> Result<Creator> {
    let now = now();
    let creator = self
      .write(move |tx| association::insert_creator(tx, name, now))
      .await?;
    tracing::info!(creator_id = %creator.id, "creator added");
    Ok(creator)
  }

  async fn add_character(
    &self,
    name: String,
    description: Option<String>,
  ) -> Result<Character> {
    let now = now();
    let character = self
      .write(move |tx| {
        association::insert_character(tx, name, description, now)
      })
      .await?;
    tracing::info!(character_id = %character.id, "character added");
    Ok(character)
  }

  // ── Series ────────────────────────────────────────────────────────────────

  async fn create_series(&self, input: NewSeries) -> Result<Series> {
    input.validate()?;
    let now = now();
    let slug = input
      .slug
      .filter(|s| !s.trim().is_empty())
      .unwrap_or_else(|| slug_for(&input.title));

    let series = Series {
      id: Uuid::new_v4(),
      title: input.title,
      slug,
      cover_url: input.cover_url,
      summary: input.summary,
      status: SeriesStatus::Draft,
      age_rating: input.age_rating,
      is_mature: input.is_mature,
      is_public: input.is_public,
      is_featured: input.is_featured,
      is_completed: false,
      owner: input.owner,
      original_creator_id: input.created_by,
      keywords: input.keywords,
      tags: input.tags,
      monetization: input.monetization,
      counters: SeriesCounters::default(),
      published_at: input.is_public.then_some(now),
      deleted: None,
      created_at: now,
      updated_at: now,
    };

    let associations = input.associations;
    let series = self
      .write(move |tx| {
        insert_series(tx, &series)?;
        association::attach(tx, series.id, &associations)?;
        load_series(tx, series.id)
      })
      .await?;

    tracing::info!(
      series_id = %series.id,
      owner = %series.owner.id,
      "series created"
    );
    Ok(series)
  }

  async fn get_series(&self, id: Uuid) -> Result<Series> {
    self.read(move |conn| load_series(conn, id)).await
  }

  async fn update_series(&self, id: Uuid, patch: SeriesPatch) -> Result<Series> {
    patch.validate()?;
    let now = now();

    let series = self
      .write(move |tx| {
        let current = load_series(tx, id)?;

        let mut b = UpdateBuilder::new("series", EntityKind::Series);
        b.set_opt("title", patch.title)
          .set_opt("slug", patch.slug)
          .set_opt("cover_url", patch.cover_url)
          .set_opt("summary", patch.summary.as_ref().map(encode_doc))
          .set_opt("status", patch.status.map(|s| s.as_str().to_owned()))
          .set_opt(
            "age_rating",
            patch.age_rating.map(|r| r.as_str().to_owned()),
          )
          .set_opt("is_mature", patch.is_mature)
          .set_opt("is_public", patch.is_public)
          .set_opt("is_featured", patch.is_featured)
          .set_opt("is_completed", patch.is_completed)
          .set_opt(
            "keywords",
            patch.keywords.as_deref().map(encode_list).transpose()?,
          )
          .set_opt("tags", patch.tags.as_deref().map(encode_list).transpose()?)
          .set_opt("purchase_price", patch.purchase_price)
          .set_opt("rental_price", patch.rental_price)
          .set_opt("rental_duration_days", patch.rental_duration_days)
          .set_opt("is_premium", patch.is_premium);
        if patch.is_public == Some(true) && current.published_at.is_none() {
          b.set("published_at", encode_dt(now));
        }

        match (b.is_empty(), &patch.associations) {
          (true, Some(_)) => {
            tx.execute(
              "UPDATE series SET updated_at = ?1 WHERE id = ?2",
              params![encode_dt(now), encode_uuid(id)],
            )?;
          }
          _ => {
            let stmt = b.build(id, now)?;
            tracing::debug!(sql = %stmt.sql, "series update");
            tx.execute(&stmt.sql, params_from_iter(stmt.params.iter()))?;
          }
        }

        if let Some(set) = &patch.associations {
          association::replace(tx, id, set)?;
        }
        load_series(tx, id)
      })
      .await?;

    tracing::info!(series_id = %id, "series updated");
    Ok(series)
  }

  async fn delete_series(&self, id: Uuid, actor: Uuid) -> Result<()> {
    let now = now();
    let (volumes, chapters) = self
      .write(move |tx| {
        load_series(tx, id)?;
        guard_delete(tx, Node::Series(id))?;
        let chapters =
          mark_deleted(tx, "chapters", CHAPTERS_OF_SERIES, id, now, actor)?;
        let volumes =
          mark_deleted(tx, "volumes", "series_id = ?1", id, now, actor)?;
        mark_deleted(tx, "series", "id = ?1", id, now, actor)?;
        Ok((volumes, chapters))
      })
      .await?;

    tracing::info!(series_id = %id, volumes, chapters, "series deleted");
    Ok(())
  }

  // ── Volumes ───────────────────────────────────────────────────────────────

  async fn create_volume(
    &self,
    series_id: Uuid,
    input: NewVolume,
  ) -> Result<Volume> {
    input.validate()?;
    let now = now();
    let volume = Volume {
      id: Uuid::new_v4(),
      series_id,
      volume_number: input.volume_number,
      title: input.title,
      description: input.description,
      cover_url: input.cover_url,
      is_available: input.is_available,
      price: input.price,
      chapter_count: 0,
      deleted: None,
      created_at: now,
      updated_at: now,
    };

    let row = volume.clone();
    self
      .write(move |tx| {
        load_series(tx, series_id)?;
        insert_volume(tx, &row)?;
        refresh_series_totals(tx, series_id)
      })
      .await?;

    tracing::info!(
      series_id = %series_id,
      volume_id = %volume.id,
      number = volume.volume_number,
      "volume created"
    );
    Ok(volume)
  }

  async fn get_volume(&self, id: Uuid) -> Result<Volume> {
    self.read(move |conn| load_volume(conn, id)).await
  }

  async fn list_volumes(&self, series_id: Uuid) -> Result<Vec<Volume>> {
    let raws = self
      .read(move |conn| {
        load_series(conn, series_id)?;
        let mut stmt = conn.prepare(&format!(
          "SELECT {VOLUME_COLUMNS} FROM volumes v
            WHERE v.series_id = ?1 AND v.is_deleted = 0
            ORDER BY v.volume_number"
        ))?;
        let rows = stmt
          .query_map(params![encode_uuid(series_id)], RawVolume::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawVolume::into_volume).collect()
  }

  async fn update_volume(&self, id: Uuid, patch: VolumePatch) -> Result<Volume> {
    patch.validate()?;
    let now = now();

    let volume = self
      .write(move |tx| {
        let current = load_volume(tx, id)?;
        let number = patch.volume_number.unwrap_or(current.volume_number);

        let mut b = UpdateBuilder::new("volumes", EntityKind::Volume);
        b.set_opt("volume_number", patch.volume_number)
          .set_opt("title", patch.title)
          .set_opt("description", patch.description)
          .set_opt("cover_url", patch.cover_url)
          .set_opt("is_available", patch.is_available)
          .set_opt("price", patch.price);
        let stmt = b.build(id, now)?;
        tx.execute(&stmt.sql, params_from_iter(stmt.params.iter()))
          .map_err(|e| {
            sequence_conflict(e, EntityKind::Volume, current.series_id, number)
          })?;
        load_volume(tx, id)
      })
      .await?;

    tracing::info!(volume_id = %id, "volume updated");
    Ok(volume)
  }

  async fn delete_volume(&self, id: Uuid, actor: Uuid) -> Result<()> {
    let now = now();
    let chapters = self
      .write(move |tx| {
        let volume = load_volume(tx, id)?;
        guard_delete(tx, Node::Volume(id))?;
        let chapters =
          mark_deleted(tx, "chapters", "volume_id = ?1", id, now, actor)?;
        mark_deleted(tx, "volumes", "id = ?1", id, now, actor)?;
        refresh_series_totals(tx, volume.series_id)?;
        Ok(chapters)
      })
      .await?;

    tracing::info!(volume_id = %id, chapters, "volume deleted");
    Ok(())
  }

  // ── Chapters ──────────────────────────────────────────────────────────────

  async fn create_chapter(
    &self,
    volume_id: Uuid,
    input: NewChapter,
  ) -> Result<Chapter> {
    input.validate()?;
    let now = now();
    let fields = PublishFields::on_create(
      input.is_draft,
      input.is_public,
      input.published_at,
      now,
    );
    let chapter = Chapter {
      id: Uuid::new_v4(),
      volume_id,
      chapter_number: input.chapter_number,
      title: input.title,
      metrics: ContentMetrics::measure(input.content.as_ref()),
      content: input.content,
      published_at: fields.published_at,
      scheduled_publish_at: fields.scheduled_publish_at,
      is_draft: fields.is_draft,
      is_public: fields.is_public,
      version: 1,
      content_warnings: input.content_warnings,
      is_mature: input.is_mature,
      view_count: 0,
      like_count: 0,
      comment_count: 0,
      deleted: None,
      created_at: now,
      updated_at: now,
    };

    let row = chapter.clone();
    self
      .write(move |tx| {
        let volume = load_volume(tx, volume_id)?;
        insert_chapter(tx, &row)?;
        refresh_chapter_count(tx, volume_id)?;
        refresh_series_totals(tx, volume.series_id)
      })
      .await?;

    tracing::info!(
      volume_id = %volume_id,
      chapter_id = %chapter.id,
      number = chapter.chapter_number,
      words = chapter.metrics.word_count,
      "chapter created"
    );
    Ok(chapter)
  }

  async fn get_chapter(&self, id: Uuid) -> Result<Chapter> {
    self.read(move |conn| load_chapter(conn, id)).await
  }

  async fn list_chapters(&self, volume_id: Uuid) -> Result<Vec<Chapter>> {
    let raws = self
      .read(move |conn| {
        load_volume(conn, volume_id)?;
        let mut stmt = conn.prepare(&format!(
          "SELECT {CHAPTER_COLUMNS} FROM chapters c
            WHERE c.volume_id = ?1 AND c.is_deleted = 0
            ORDER BY c.chapter_number"
        ))?;
        let rows = stmt
          .query_map(params![encode_uuid(volume_id)], RawChapter::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawChapter::into_chapter).collect()
  }

  async fn update_chapter(
    &self,
    id: Uuid,
    patch: ChapterPatch,
  ) -> Result<Chapter> {
    patch.validate()?;
    let now = now();

    let chapter = self
      .write(move |tx| {
        let current = load_chapter(tx, id)?;
        let number = patch.chapter_number.unwrap_or(current.chapter_number);

        let mut b = UpdateBuilder::new("chapters", EntityKind::Chapter);
        b.set_opt("chapter_number", patch.chapter_number)
          .set_opt("title", patch.title);
        if let Some(content) = &patch.content {
          let metrics = ContentMetrics::measure(Some(content));
          b.set("content", encode_doc(content))
            .set("word_count", metrics.word_count)
            .set("character_count", metrics.character_count)
            .set("reading_time_minutes", metrics.reading_time_minutes)
            .set_expr("version", "version + 1");
        }
        b.set_opt(
          "content_warnings",
          patch.content_warnings.as_deref().map(encode_list).transpose()?,
        )
        .set_opt("is_mature", patch.is_mature);

        let stmt = b.build(id, now)?;
        tracing::debug!(sql = %stmt.sql, "chapter update");
        tx.execute(&stmt.sql, params_from_iter(stmt.params.iter()))
          .map_err(|e| {
            sequence_conflict(e, EntityKind::Chapter, current.volume_id, number)
          })?;

        if patch.content.is_some() {
          let series_id = series_of_volume(tx, current.volume_id)?;
          refresh_series_totals(tx, series_id)?;
        }
        load_chapter(tx, id)
      })
      .await?;

    tracing::info!(
      chapter_id = %id,
      version = chapter.version,
      "chapter updated"
    );
    Ok(chapter)
  }

  async fn delete_chapter(&self, id: Uuid, actor: Uuid) -> Result<()> {
    let now = now();
    self
      .write(move |tx| {
        let chapter = load_chapter(tx, id)?;
        guard_delete(tx, Node::Chapter(id))?;
        mark_deleted(tx, "chapters", "id = ?1", id, now, actor)?;
        refresh_chapter_count(tx, chapter.volume_id)?;
        let series_id = series_of_volume(tx, chapter.volume_id)?;
        refresh_series_totals(tx, series_id)
      })
      .await?;

    tracing::info!(chapter_id = %id, "chapter deleted");
    Ok(())
  }

  // ── Publishing ────────────────────────────────────────────────────────────

  async fn publish_chapter(
    &self,
    id: Uuid,
    at: Option<DateTime<Utc>>,
  ) -> Result<Chapter> {
    let chapter =
      transition_chapter(self, id, move |f, now| Ok(f.publish(at, now)))
        .await?;
    tracing::info!(chapter_id = %id, "chapter published");
    Ok(chapter)
  }

  async fn unpublish_chapter(&self, id: Uuid) -> Result<Chapter> {
    let chapter =
      transition_chapter(self, id, |f, _| Ok(f.unpublish())).await?;
    tracing::info!(chapter_id = %id, "chapter unpublished");
    Ok(chapter)
  }

  async fn schedule_chapter(
    &self,
    id: Uuid,
    at: DateTime<Utc>,
  ) -> Result<Chapter> {
    let chapter =
      transition_chapter(self, id, move |f, now| Ok(f.schedule(at, now)?))
        .await?;
    tracing::info!(chapter_id = %id, at = %at, "chapter scheduled");
    Ok(chapter)
  }

  async fn publish_due_chapters(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
    let published = self
      .write(move |tx| {
        let mut stmt = tx.prepare(&format!(
          "SELECT {CHAPTER_COLUMNS} FROM chapters c
            WHERE c.is_deleted = 0 AND c.is_draft = 0 AND c.is_public = 0
              AND c.scheduled_publish_at IS NOT NULL
              AND c.scheduled_publish_at <= ?1
            ORDER BY c.scheduled_publish_at, c.id"
        ))?;
        let due = stmt
          .query_map(params![encode_dt(now)], RawChapter::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?
          .into_iter()
          .map(RawChapter::into_chapter)
          .collect::<Result<Vec<_>>>()?;

        let mut published = Vec::with_capacity(due.len());
        for chapter in due {
          let fields = PublishFields::of(&chapter);
          if !fields.is_due(now) {
            continue;
          }
          let next = fields.publish(fields.scheduled_publish_at, now);
          write_publish_fields(tx, chapter.id, next, now)?;
          published.push(chapter.id);
        }
        Ok(published)
      })
      .await?;

    tracing::info!(count = published.len(), "published due chapters");
    Ok(published)
  }
}

// ─── Test support ────────────────────────────────────────────────────────────

#[cfg(test)]
impl SqliteStore {
  /// Insert a purchase row. The catalog never writes these itself.
  pub(crate) async fn record_purchase(
    &self,
    entity: EntityKind,
    content_id: Uuid,
  ) -> Result<()> {
    self
      .write(move |tx| {
        tx.execute(
          "INSERT INTO purchases (id, user_id, content_type, content_id, amount, purchased_at)
           VALUES (?1, ?2, ?3, ?4, 500, ?5)",
          params![
            encode_uuid(Uuid::new_v4()),
            encode_uuid(Uuid::new_v4()),
            entity.as_str(),
            encode_uuid(content_id),
            encode_dt(now()),
          ],
        )?;
        Ok(())
      })
      .await
  }

  pub(crate) async fn record_rental(
    &self,
    entity: EntityKind,
    content_id: Uuid,
  ) -> Result<()> {
    self
      .write(move |tx| {
        tx.execute(
          "INSERT INTO rentals (id, user_id, content_type, content_id, rented_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          params![
            encode_uuid(Uuid::new_v4()),
            encode_uuid(Uuid::new_v4()),
            entity.as_str(),
            encode_uuid(content_id),
            encode_dt(now()),
          ],
        )?;
        Ok(())
      })
      .await
  }

  /// `(deleted_at, deleted_by)` for a row, whether or not it is live.
  pub(crate) async fn deletion_marker(
    &self,
    table: &'static str,
    id: Uuid,
  ) -> Result<(Option<String>, Option<String>)> {
    self
      .read(move |conn| {
        Ok(conn.query_row(
          &format!("SELECT deleted_at, deleted_by FROM {table} WHERE id = ?1"),
          params![encode_uuid(id)],
          |row| Ok((row.get(0)?, row.get(1)?)),
        )?)
      })
      .await
  }
}
