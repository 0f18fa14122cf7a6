//! Chapter visibility state machine.
//!
//! A chapter's state is not stored; it is derived from four columns
//! (`is_draft`, `is_public`, `published_at`, `scheduled_publish_at`). The
//! transitions below compute the next value of those columns, and the store
//! writes them back verbatim.
//!
//! | From \ op   | publish | unpublish   | schedule  |
//! |-------------|---------|-------------|-----------|
//! | Draft       | Public  | Draft*      | Scheduled |
//! | Scheduled   | Public  | Unpublished | Scheduled |
//! | Public      | Public  | Unpublished | Scheduled |
//! | Unpublished | Public  | Unpublished | Scheduled |
//!
//! \* unpublish leaves `is_draft` untouched, so a draft stays a draft.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, content::Chapter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishState {
  Draft,
  Scheduled,
  Public,
  Unpublished,
}

/// The four publishing columns of a chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishFields {
  pub is_draft:             bool,
  pub is_public:            bool,
  pub published_at:         Option<DateTime<Utc>>,
  pub scheduled_publish_at: Option<DateTime<Utc>>,
}

impl PublishFields {
  pub fn of(chapter: &Chapter) -> Self {
    Self {
      is_draft:             chapter.is_draft,
      is_public:            chapter.is_public,
      published_at:         chapter.published_at,
      scheduled_publish_at: chapter.scheduled_publish_at,
    }
  }

  /// Classify these columns.
  ///
  /// A pending schedule whose time has already passed still reads as
  /// `Scheduled` until a sweep publishes it.
  pub fn state(&self) -> PublishState {
    if self.is_draft {
      PublishState::Draft
    } else if self.is_public && self.published_at.is_some() {
      PublishState::Public
    } else if !self.is_public && self.scheduled_publish_at.is_some() {
      PublishState::Scheduled
    } else {
      PublishState::Unpublished
    }
  }

  /// Columns for a newly created chapter.
  ///
  /// The chapter goes straight to `Public` only when the request is both
  /// non-draft and public; `published_at` then defaults to `now`.
  pub fn on_create(
    is_draft: bool,
    is_public: bool,
    published_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
  ) -> Self {
    let published_at = if !is_draft && is_public {
      Some(published_at.unwrap_or(now))
    } else {
      None
    };
    Self {
      is_draft,
      is_public,
      published_at,
      scheduled_publish_at: None,
    }
  }

  /// `publish(at?)`: always lands in `Public`. Re-publishing overwrites
  /// `published_at`.
  pub fn publish(self, at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
    Self {
      is_draft:             false,
      is_public:            true,
      published_at:         Some(at.unwrap_or(now)),
      scheduled_publish_at: None,
    }
  }

  /// `unpublish`: hides the chapter and clears `published_at`; `is_draft` is
  /// kept as it was.
  pub fn unpublish(self) -> Self {
    Self {
      is_draft:             self.is_draft,
      is_public:            false,
      published_at:         None,
      scheduled_publish_at: None,
    }
  }

  /// `schedule(at)`: hides the chapter until `at`. `at` must lie after `now`.
  pub fn schedule(self, at: DateTime<Utc>, now: DateTime<Utc>) -> Result<Self> {
    if at <= now {
      return Err(Error::validation(
        "scheduled_publish_at",
        "must be in the future",
      ));
    }
    Ok(Self {
      is_draft:             false,
      is_public:            false,
      published_at:         None,
      scheduled_publish_at: Some(at),
    })
  }

  /// Whether a sweep at `now` should publish this chapter.
  pub fn is_due(&self, now: DateTime<Utc>) -> bool {
    self.state() == PublishState::Scheduled
      && self.scheduled_publish_at.is_some_and(|at| at <= now)
  }
}

impl Chapter {
  pub fn publish_state(&self) -> PublishState { PublishFields::of(self).state() }
}
