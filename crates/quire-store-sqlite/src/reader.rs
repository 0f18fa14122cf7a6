//! [`SqliteReader`]: the SQLite implementation of [`CatalogQuery`].
//!
//! Runs on its own connection and only ever issues `SELECT`s.

use std::collections::HashMap;

use rusqlite::{OptionalExtension as _, params, params_from_iter};
use serde::Deserialize;
use uuid::Uuid;

use quire_core::{
  EntityKind,
  association::{CharacterRef, CreatorRef, CreatorRole, GenreRef},
  content::OwnerKind,
  identity::{IdentityLookup, IdentityRef, IdentitySummary},
  pagination::{Page, PageInfo, SeriesQuery},
  query::{CatalogQuery, SeriesDetail, SeriesSummary},
};

use crate::{
  Error, Result,
  encode::{
    RawSeries, SERIES_COLUMN_COUNT, SERIES_COLUMNS, decode_dt, encode_uuid,
  },
  filter,
};

/// The read side of a [`crate::SqliteStore`]. Obtain one with
/// [`crate::SqliteStore::reader`].
#[derive(Clone)]
pub struct SqliteReader<L> {
  conn:       tokio_rusqlite::Connection,
  identities: L,
}

impl<L: IdentityLookup> SqliteReader<L> {
  pub(crate) fn new(conn: tokio_rusqlite::Connection, identities: L) -> Self {
    Self { conn, identities }
  }

  /// Display summaries for the owner and the original creator. A failing
  /// lookup leaves both empty.
  async fn resolve_people(
    &self,
    owner: IdentityRef,
    creator: IdentityRef,
  ) -> HashMap<Uuid, IdentitySummary> {
    let refs: Vec<IdentityRef> = if owner.id == creator.id {
      vec![owner]
    } else {
      vec![owner, creator]
    };
    match self.identities.lookup(&refs).await {
      Ok(found) => found,
      Err(e) => {
        tracing::warn!(error = %e, "identity lookup failed");
        HashMap::new()
      }
    }
  }
}

// ─── Aggregated detail ───────────────────────────────────────────────────────

/// `SERIES_COLUMNS`, then live volume and chapter counts, then the three
/// association lists as JSON arrays.
const DETAIL_SQL_TAIL: &str = "
  (SELECT COUNT(*) FROM volumes v
    WHERE v.series_id = s.id AND v.is_deleted = 0),
  (SELECT COUNT(*) FROM chapters c JOIN volumes v ON v.id = c.volume_id
    WHERE v.series_id = s.id AND v.is_deleted = 0 AND c.is_deleted = 0),
  (SELECT json_group_array(json_object('id', g.id, 'name', g.name, 'slug', g.slug))
     FROM series_genres sg JOIN genres g ON g.id = sg.genre_id
    WHERE sg.series_id = s.id),
  (SELECT json_group_array(json_object('id', cr.id, 'name', cr.name, 'role', sc.role))
     FROM series_creators sc JOIN creators cr ON cr.id = sc.creator_id
    WHERE sc.series_id = s.id),
  (SELECT json_group_array(json_object('id', ch.id, 'name', ch.name, 'slug', ch.slug))
     FROM series_characters sx JOIN characters ch ON ch.id = sx.character_id
    WHERE sx.series_id = s.id)";

struct RawDetail {
  series:          RawSeries,
  live_volumes:    i64,
  live_chapters:   i64,
  genres_json:     String,
  creators_json:   String,
  characters_json: String,
}

impl RawDetail {
  fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    let n = SERIES_COLUMN_COUNT;
    Ok(Self {
      series:          RawSeries::from_row(row)?,
      live_volumes:    row.get(n)?,
      live_chapters:   row.get(n + 1)?,
      genres_json:     row.get(n + 2)?,
      creators_json:   row.get(n + 3)?,
      characters_json: row.get(n + 4)?,
    })
  }
}

#[derive(Deserialize)]
struct CreatorRow {
  id:   Uuid,
  name: String,
  role: String,
}

// ─── CatalogQuery impl ───────────────────────────────────────────────────────

impl<L: IdentityLookup> CatalogQuery for SqliteReader<L> {
  type Error = Error;

  async fn list_series(
    &self,
    query: &SeriesQuery,
  ) -> Result<Page<SeriesSummary>> {
    let listing = filter::listing(query);
    let (page, page_size) = (query.page(), query.page_size());

    let (total, rows): (i64, Vec<(RawSeries, Option<String>)>) = self
      .conn
      .call(move |conn| {
        // One read transaction so the count and the page see one snapshot.
        let tx = conn.transaction()?;
        let total: i64 = tx.query_row(
          &listing.count_sql,
          params_from_iter(listing.count_params.iter()),
          |row| row.get(0),
        )?;
        let rows = {
          let mut stmt = tx.prepare(&listing.data_sql)?;
          stmt
            .query_map(params_from_iter(listing.data_params.iter()), |row| {
              Ok((RawSeries::from_row(row)?, row.get(SERIES_COLUMN_COUNT)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        tx.commit()?;
        Ok((total, rows))
      })
      .await?;

    let items = rows
      .into_iter()
      .map(|(raw, latest)| {
        let latest = latest.as_deref().map(decode_dt).transpose()?;
        Ok(SeriesSummary::from_series(raw.into_series()?, latest))
      })
      .collect::<Result<Vec<_>>>()?;

    tracing::debug!(total, returned = items.len(), page, "listed series");
    let total = u64::try_from(total).unwrap_or(0);
    Ok(Page { items, pagination: PageInfo::new(page, page_size, total) })
  }

  async fn get_full_detail(&self, series_id: Uuid) -> Result<SeriesDetail> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {SERIES_COLUMNS}, {DETAIL_SQL_TAIL}
                   FROM series s
                  WHERE s.id = ?1 AND s.is_deleted = 0"
              ),
              params![encode_uuid(series_id)],
              RawDetail::from_row,
            )
            .optional()?,
        )
      })
      .await?
      .ok_or(quire_core::Error::not_found(EntityKind::Series, series_id))?;

    let series = raw.series.into_series()?;

    let mut genres: Vec<GenreRef> = serde_json::from_str(&raw.genres_json)?;
    genres.sort_by(|a, b| a.name.cmp(&b.name));

    let mut creators: Vec<CreatorRef> =
      serde_json::from_str::<Vec<CreatorRow>>(&raw.creators_json)?
        .into_iter()
        .map(|c| CreatorRef {
          id:   c.id,
          name: c.name,
          role: CreatorRole::from_label(&c.role),
        })
        .collect();
    creators.sort_by(|a, b| {
      (a.name.as_str(), a.role.label()).cmp(&(b.name.as_str(), b.role.label()))
    });

    let mut characters: Vec<CharacterRef> =
      serde_json::from_str(&raw.characters_json)?;
    characters.sort_by(|a, b| a.name.cmp(&b.name));

    let owner_ref = IdentityRef::from(series.owner);
    let creator_ref = IdentityRef {
      kind: OwnerKind::Individual,
      id:   series.original_creator_id,
    };
    let mut people = self.resolve_people(owner_ref, creator_ref).await;

    tracing::debug!(series_id = %series_id, "assembled series detail");
    Ok(SeriesDetail {
      owner: people.get(&series.owner.id).cloned(),
      original_creator: people.remove(&series.original_creator_id),
      live_volume_count: raw.live_volumes,
      live_chapter_count: raw.live_chapters,
      genres,
      creators,
      characters,
      series,
    })
  }
}
