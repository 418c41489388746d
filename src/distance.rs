//! Distance lookup: practitioners resolved from the store, distances from an
//! external service.
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::entity::{Id, Key};
use crate::error::{MefmError, Result};
use crate::schema::Practitioner;
use crate::store::Database;

/// One distance as reported by the distance service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Distance {
    pub human_readable: String,
    pub meters: Option<u64>,
}

impl Distance {
    pub const NOT_FOUND: &'static str = "Not found";

    pub fn not_found() -> Self {
        Self {
            human_readable: Self::NOT_FOUND.to_string(),
            meters: None,
        }
    }
}

/// Computes distances from one origin to an ordered list of destinations.
///
/// Implementations either return exactly one result per destination, in
/// destination order, or fail for the whole call.
pub trait DistanceService: Send + Sync {
    fn distances(&self, origin: &str, destinations: &[String]) -> Result<Vec<Distance>>;
}

/// Parses a `|`-separated list of practitioner identifiers such as `"12|7|9"`.
pub fn parse_targets(targets: &str) -> Result<Vec<Id>> {
    if targets.trim().is_empty() {
        return Ok(Vec::new());
    }
    targets
        .split('|')
        .map(|id| {
            id.trim()
                .parse::<Id>()
                .map_err(|_| MefmError::parse(format!("`{id}` is not a practitioner identifier")))
        })
        .collect()
}

pub struct DistanceLookup<'a> {
    database: &'a Database,
    service: &'a dyn DistanceService,
    default_country: &'a str,
}

impl<'a> DistanceLookup<'a> {
    pub fn new(database: &'a Database, service: &'a dyn DistanceService, default_country: &'a str) -> Self {
        Self {
            database,
            service,
            default_country,
        }
    }

    /// Distances from `origin` to each practitioner, aligned with `practitioners`.
    ///
    /// Every practitioner is resolved before the service is called; a single
    /// missing one fails the lookup with a dangling reference.
    pub fn find(&self, origin: &str, practitioners: &[Id]) -> Result<Vec<Distance>> {
        if practitioners.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<Key<Practitioner>> = practitioners.iter().map(|id| Key::new(*id)).collect();
        let destinations: Vec<String> = self
            .database
            .resolve_all(&keys)?
            .iter()
            .map(|practitioner| practitioner.location(self.default_country))
            .collect();
        debug!(origin, destinations = destinations.len(), "distance lookup");
        let distances = self.service.distances(origin, &destinations)?;
        if distances.len() != destinations.len() {
            return Err(MefmError::ExternalService(format!(
                "expected {} distances, got {}",
                destinations.len(),
                distances.len()
            )));
        }
        info!(origin, results = distances.len(), "distance lookup complete");
        Ok(distances)
    }
}
