//! Series listing: predicate assembly shared by the page query and its count.
//!
//! Every predicate is a fixed SQL fragment with `?` placeholders; user input
//! only ever reaches SQLite as a bound parameter. The sort column comes from
//! the [`SortField`] allow-list.

use chrono::{DateTime, Utc};
use quire_core::pagination::{SeriesFilter, SeriesQuery, SortField, SortOrder};
use rusqlite::types::Value;

use crate::encode::{SERIES_COLUMNS, encode_dt, encode_uuid};

/// Most recent `updated_at` among the live chapters of live volumes of `s`.
pub const LATEST_CHAPTER_AT: &str = "(
  SELECT MAX(lc.updated_at)
    FROM chapters lc JOIN volumes lv ON lv.id = lc.volume_id
   WHERE lv.series_id = s.id AND lv.is_deleted = 0 AND lc.is_deleted = 0
)";

fn sort_expr(field: SortField) -> &'static str {
  match field {
    SortField::CreatedAt => "s.created_at",
    SortField::UpdatedAt => "s.updated_at",
    SortField::PublishedAt => "s.published_at",
    SortField::Title => "s.title COLLATE NOCASE",
    SortField::ViewCount => "s.view_count",
    SortField::LikeCount => "s.like_count",
    SortField::RatingAverage => "s.rating_average",
    SortField::LatestChapterAt => "latest_chapter_at",
  }
}

fn direction(order: SortOrder) -> &'static str {
  match order {
    SortOrder::Asc => "ASC",
    SortOrder::Desc => "DESC",
  }
}

/// Escape `LIKE` metacharacters so search text matches literally.
fn like_pattern(text: &str) -> String {
  let mut out = String::with_capacity(text.len() + 2);
  out.push('%');
  for ch in text.chars() {
    if matches!(ch, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(ch);
  }
  out.push('%');
  out
}

#[derive(Default)]
struct Predicates {
  clauses: Vec<String>,
  params:  Vec<Value>,
}

impl Predicates {
  fn push(
    &mut self,
    clause: impl Into<String>,
    params: impl IntoIterator<Item = Value>,
  ) {
    self.clauses.push(clause.into());
    self.params.extend(params);
  }

  fn push_opt<T>(
    &mut self,
    clause: &str,
    value: Option<T>,
    into: impl FnOnce(T) -> Value,
  ) {
    if let Some(value) = value {
      self.push(clause, [into(value)]);
    }
  }
}

fn text(s: impl Into<String>) -> Value { Value::Text(s.into()) }

fn predicates(filter: &SeriesFilter) -> Predicates {
  let mut p = Predicates::default();
  p.clauses.push("s.is_deleted = 0".into());

  p.push_opt("s.status = ?", filter.status, |v| text(v.as_str()));
  p.push_opt("s.age_rating = ?", filter.age_rating, |v| text(v.as_str()));
  p.push_opt("s.is_mature = ?", filter.is_mature, Value::from);
  p.push_opt("s.is_public = ?", filter.is_public, Value::from);
  p.push_opt("s.is_featured = ?", filter.is_featured, Value::from);
  p.push_opt("s.is_completed = ?", filter.is_completed, Value::from);
  p.push_opt("s.primary_owner_id = ?", filter.owner_id, |v| {
    text(encode_uuid(v))
  });

  let search = filter.search.as_deref().map(str::trim);
  if let Some(search) = search.filter(|s| !s.is_empty()) {
    let pattern = like_pattern(search);
    // Summary is a JSON document; only its string values are searchable.
    p.push(
      "(s.title LIKE ? ESCAPE '\\'
        OR EXISTS (SELECT 1 FROM json_tree(s.summary) st
                    WHERE st.type = 'text' AND st.value LIKE ? ESCAPE '\\'))",
      [text(pattern.clone()), text(pattern)],
    );
  }

  if !filter.genre_ids.is_empty() {
    let placeholders = vec!["?"; filter.genre_ids.len()].join(", ");
    p.push(
      format!(
        "EXISTS (SELECT 1 FROM series_genres sg
                  WHERE sg.series_id = s.id AND sg.genre_id IN ({placeholders}))"
      ),
      filter.genre_ids.iter().map(|id| text(encode_uuid(*id))),
    );
  }

  let dt = |v: DateTime<Utc>| text(encode_dt(v));
  p.push_opt("s.created_at >= ?", filter.created_after, dt);
  p.push_opt("s.created_at <= ?", filter.created_before, dt);
  p.push_opt("s.published_at >= ?", filter.published_after, dt);
  p.push_opt("s.published_at <= ?", filter.published_before, dt);
  p.push_opt(
    &format!("{LATEST_CHAPTER_AT} >= ?"),
    filter.chapter_updated_after,
    dt,
  );
  p.push_opt(
    &format!("{LATEST_CHAPTER_AT} <= ?"),
    filter.chapter_updated_before,
    dt,
  );
  p.push_opt("s.view_count >= ?", filter.min_views, Value::from);
  p.push_opt("s.view_count <= ?", filter.max_views, Value::from);
  p
}

/// The statements for one page of a listing.
#[derive(Debug)]
pub struct Listing {
  /// Selects [`SERIES_COLUMNS`] followed by `latest_chapter_at`.
  pub data_sql:     String,
  pub data_params:  Vec<Value>,
  /// Same predicates, no ordering or paging.
  pub count_sql:    String,
  pub count_params: Vec<Value>,
}

pub fn listing(query: &SeriesQuery) -> Listing {
  let Predicates { clauses, params } = predicates(&query.filter);
  let where_clause = clauses.join(" AND ");
  let dir = direction(query.order);

  let data_sql = format!(
    "SELECT {SERIES_COLUMNS}, {LATEST_CHAPTER_AT} AS latest_chapter_at
       FROM series s
      WHERE {where_clause}
      ORDER BY {} {dir}, s.id {dir}
      LIMIT ? OFFSET ?",
    sort_expr(query.sort),
  );
  let count_sql = format!("SELECT COUNT(*) FROM series s WHERE {where_clause}");

  let mut data_params = params.clone();
  data_params.push(Value::Integer(i64::from(query.page_size())));
  data_params.push(Value::Integer(
    i64::try_from(query.offset()).unwrap_or(i64::MAX),
  ));

  Listing { data_sql, data_params, count_sql, count_params: params }
}
