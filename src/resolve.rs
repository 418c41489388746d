//! Following references between entities.
//!
//! An entity that refers to another holds a [`Key`] instead of embedding it.
//! Resolving a key whose target is gone is a referential-integrity problem,
//! reported as [`MefmError::DanglingReference`] rather than as a plain miss.
use tracing::warn;

use crate::entity::{Entity, Key};
use crate::error::{MefmError, Result};
use crate::store::Database;

impl Database {
    pub fn resolve<E: Entity>(&self, key: &Key<E>) -> Result<E> {
        self.get(key.id()).map_err(|e| match e {
            MefmError::NotFound { kind, id } => {
                warn!(kind, id, "dangling reference");
                MefmError::DanglingReference { kind, id }
            }
            other => other,
        })
    }

    /// Resolves every key in order, failing on the first dangling one.
    pub fn resolve_all<E: Entity>(&self, keys: &[Key<E>]) -> Result<Vec<E>> {
        keys.iter().map(|key| self.resolve(key)).collect()
    }
}
