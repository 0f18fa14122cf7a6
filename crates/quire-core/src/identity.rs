//! The batch identity-lookup collaborator.
//!
//! Owner and creator display data lives in another service. The read side
//! asks for it once per aggregated view, keyed by the distinct ids present in
//! the result. Unknown ids are simply missing from the returned map.

use std::{collections::HashMap, convert::Infallible, future::Future};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::{Owner, OwnerKind};

/// An id tagged with the kind of account it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityRef {
  pub kind: OwnerKind,
  pub id:   Uuid,
}

impl From<Owner> for IdentityRef {
  fn from(owner: Owner) -> Self { Self { kind: owner.kind, id: owner.id } }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySummary {
  pub id:           Uuid,
  pub display_name: String,
}

pub trait IdentityLookup: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Resolve display summaries for `refs`. Ids the collaborator does not know
  /// are absent from the map; that is not an error.
  fn lookup<'a>(
    &'a self,
    refs: &'a [IdentityRef],
  ) -> impl Future<Output = Result<HashMap<Uuid, IdentitySummary>, Self::Error>>
  + Send
  + 'a;
}

/// A lookup that knows nobody. Useful where no identity service is wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIdentities;

impl IdentityLookup for NoIdentities {
  type Error = Infallible;

  async fn lookup(
    &self,
    _refs: &[IdentityRef],
  ) -> Result<HashMap<Uuid, IdentitySummary>, Infallible> {
    Ok(HashMap::new())
  }
}

/// A fixed in-memory directory.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentities {
  entries: HashMap<Uuid, IdentitySummary>,
}

impl StaticIdentities {
  pub fn new() -> Self { Self::default() }

  pub fn with(mut self, id: Uuid, display_name: impl Into<String>) -> Self {
    self.entries.insert(id, IdentitySummary {
      id,
      display_name: display_name.into(),
    });
    self
  }
}

impl IdentityLookup for StaticIdentities {
  type Error = Infallible;

  async fn lookup(
    &self,
    refs: &[IdentityRef],
  ) -> Result<HashMap<Uuid, IdentitySummary>, Infallible> {
    Ok(
      refs
        .iter()
        .filter_map(|r| self.entries.get(&r.id).map(|s| (r.id, s.clone())))
        .collect(),
    )
  }
}
