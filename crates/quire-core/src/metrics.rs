//! Derived metrics for a chapter's content document.
//!
//! The calculator works on the serialised text of the document rather than
//! walking structured blocks: a JSON string is measured as its raw text, any
//! other JSON value as its compact serialisation.

use serde::{Deserialize, Serialize};

/// Words per minute assumed when estimating reading time.
pub const WORDS_PER_MINUTE: i64 = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMetrics {
  pub word_count:           i64,
  pub character_count:      i64,
  pub reading_time_minutes: i64,
}

impl ContentMetrics {
  /// Measure `content`; an absent document measures as all zeroes.
  pub fn measure(content: Option<&serde_json::Value>) -> Self {
    match content {
      None | Some(serde_json::Value::Null) => Self::default(),
      Some(serde_json::Value::String(text)) => Self::of_text(text),
      Some(other) => Self::of_text(&other.to_string()),
    }
  }

  pub fn of_text(text: &str) -> Self {
    let word_count = text.split_whitespace().count() as i64;
    Self {
      word_count,
      character_count: text.chars().count() as i64,
      reading_time_minutes: reading_time_minutes(word_count),
    }
  }
}

/// `ceil(words / 200)`, zero for an empty document.
pub fn reading_time_minutes(word_count: i64) -> i64 {
  if word_count <= 0 {
    0
  } else {
    (word_count + WORDS_PER_MINUTE - 1) / WORDS_PER_MINUTE
  }
}
