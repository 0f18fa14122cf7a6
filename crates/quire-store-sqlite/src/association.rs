//! Reference records and the series join tables.
//!
//! Existence is checked with one batch `IN (...)` lookup per association
//! kind. Join rows are written with `INSERT OR IGNORE`, so a set naming the
//! same id twice links it once.

use chrono::{DateTime, Utc};
use quire_core::association::{
  AssociationKind, AssociationSet, Character, Creator, Genre, slug_for,
};
use rusqlite::{Connection, params, params_from_iter};
use uuid::Uuid;

use crate::{
  Result,
  encode::{decode_uuid, encode_dt, encode_uuid},
};

fn table_of(kind: AssociationKind) -> &'static str {
  match kind {
    AssociationKind::Genre => "genres",
    AssociationKind::Creator => "creators",
    AssociationKind::Character => "characters",
  }
}

// ─── Reference records ───────────────────────────────────────────────────────

fn validate_name(name: &str) -> Result<String> {
  let slug = slug_for(name);
  if name.trim().is_empty() || slug.is_empty() {
    return Err(quire_core::Error::validation("name", "must not be empty").into());
  }
  Ok(slug)
}

pub fn insert_genre(
  conn: &Connection,
  name: String,
  now: DateTime<Utc>,
) -> Result<Genre> {
  let slug = validate_name(&name)?;
  let genre = Genre { id: Uuid::new_v4(), name, slug, created_at: now };
  let inserted = conn.execute(
    "INSERT OR IGNORE INTO genres (id, name, slug, created_at)
     VALUES (?1, ?2, ?3, ?4)",
    params![
      encode_uuid(genre.id),
      genre.name,
      genre.slug,
      encode_dt(genre.created_at)
    ],
  )?;
  if inserted == 0 {
    return Err(
      quire_core::Error::validation(
        "name",
        format!("genre {:?} already exists", genre.slug),
      )
      .into(),
    );
  }
  Ok(genre)
}

pub fn insert_creator(
  conn: &Connection,
  name: String,
  now: DateTime<Utc>,
) -> Result<Creator> {
  let slug = validate_name(&name)?;
  let creator = Creator { id: Uuid::new_v4(), name, slug, created_at: now };
  conn.execute(
    "INSERT INTO creators (id, name, slug, created_at) VALUES (?1, ?2, ?3, ?4)",
    params![
      encode_uuid(creator.id),
      creator.name,
      creator.slug,
      encode_dt(creator.created_at)
    ],
  )?;
  Ok(creator)
}

pub fn insert_character(
  conn: &Connection,
  name: String,
  description: Option<String>,
  now: DateTime<Utc>,
) -> Result<Character> {
  let slug = validate_name(&name)?;
  let character = Character {
    id: Uuid::new_v4(),
    name,
    slug,
    description,
    created_at: now,
  };
  conn.execute(
    "INSERT INTO characters (id, name, slug, description, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    params![
      encode_uuid(character.id),
      character.name,
      character.slug,
      character.description,
      encode_dt(character.created_at)
    ],
  )?;
  Ok(character)
}

// ─── Existence checks ────────────────────────────────────────────────────────

/// Ids from `requested` with no row in the reference table for `kind`, in
/// request order and without repeats.
fn missing_ids(
  conn: &Connection,
  kind: AssociationKind,
  requested: &[Uuid],
) -> Result<Vec<Uuid>> {
  let mut distinct: Vec<Uuid> = Vec::with_capacity(requested.len());
  for id in requested {
    if !distinct.contains(id) {
      distinct.push(*id);
    }
  }
  if distinct.is_empty() {
    return Ok(Vec::new());
  }

  let placeholders = vec!["?"; distinct.len()].join(", ");
  let sql = format!(
    "SELECT id FROM {} WHERE id IN ({placeholders})",
    table_of(kind)
  );
  let mut stmt = conn.prepare(&sql)?;
  let found = stmt
    .query_map(
      params_from_iter(distinct.iter().map(|id| encode_uuid(*id))),
      |row| row.get::<_, String>(0),
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?
    .iter()
    .map(|s| decode_uuid(s))
    .collect::<Result<Vec<_>>>()?;

  if found.len() == distinct.len() {
    return Ok(Vec::new());
  }
  Ok(distinct.into_iter().filter(|id| !found.contains(id)).collect())
}

/// Fail with `AssociationNotFound` naming the first kind that has unknown
/// ids.
pub fn ensure_exist(conn: &Connection, set: &AssociationSet) -> Result<()> {
  let checks = [
    (AssociationKind::Genre, set.genre_ids.clone()),
    (AssociationKind::Creator, set.creator_ids()),
    (AssociationKind::Character, set.character_ids.clone()),
  ];
  for (kind, ids) in checks {
    let missing = missing_ids(conn, kind, &ids)?;
    if !missing.is_empty() {
      tracing::debug!(%kind, ?missing, "association check failed");
      return Err(quire_core::Error::AssociationNotFound { kind, missing }.into());
    }
  }
  Ok(())
}

// ─── Linking ─────────────────────────────────────────────────────────────────

/// Validate `set` and link every member to the series.
pub fn attach(
  conn: &Connection,
  series_id: Uuid,
  set: &AssociationSet,
) -> Result<()> {
  ensure_exist(conn, set)?;
  let series = encode_uuid(series_id);

  let mut genre = conn.prepare(
    "INSERT OR IGNORE INTO series_genres (series_id, genre_id) VALUES (?1, ?2)",
  )?;
  for id in &set.genre_ids {
    genre.execute(params![series, encode_uuid(*id)])?;
  }

  let mut creator = conn.prepare(
    "INSERT OR IGNORE INTO series_creators (series_id, creator_id, role)
     VALUES (?1, ?2, ?3)",
  )?;
  for credit in &set.creators {
    creator.execute(params![
      series,
      encode_uuid(credit.creator_id),
      credit.role.label()
    ])?;
  }

  let mut character = conn.prepare(
    "INSERT OR IGNORE INTO series_characters (series_id, character_id)
     VALUES (?1, ?2)",
  )?;
  for id in &set.character_ids {
    character.execute(params![series, encode_uuid(*id)])?;
  }
  Ok(())
}

/// Drop every link the series has, then attach `set`.
pub fn replace(
  conn: &Connection,
  series_id: Uuid,
  set: &AssociationSet,
) -> Result<()> {
  let series = encode_uuid(series_id);
  for table in ["series_genres", "series_creators", "series_characters"] {
    conn.execute(
      &format!("DELETE FROM {table} WHERE series_id = ?1"),
      params![series],
    )?;
  }
  attach(conn, series_id, set)
}
