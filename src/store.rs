//! The entity store: typed put/get/delete and filter queries over the
//! document table, behind one shared handle.
//!
//! A [`Database`] is created once per process with the list of entity kinds it
//! may operate on. It is `Send + Sync`: the SQLite connection sits behind a
//! mutex, so every operation is serialized and a read observes every write
//! made earlier through the same handle. Nothing is promised about writers in
//! other processes sharing the same file.
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde_json::Value;
use tracing::debug;

use crate::entity::{Entity, Id, IdentityGenerator, KindHasher};
use crate::error::{MefmError, Result};
use crate::filter::Filter;
use crate::persist::{PersistenceMode, Persistor};
use crate::query::{ID_PROPERTY, Query, StoreQuery, translate};

// ------------- Database -------------
pub struct Database {
    // owns an identity generator
    pub identity_generator: Arc<Mutex<IdentityGenerator>>,
    // the kinds this database was initialized with
    registered: HashSet<String, KindHasher>,
    // responsible for the persistence layer
    pub persistor: Arc<Mutex<Persistor>>,
}

impl Database {
    /// Opens the store and registers `kinds`. Operations on any other kind fail
    /// with a configuration error.
    pub fn new<K: AsRef<str>>(mode: PersistenceMode, kinds: &[K]) -> Result<Self> {
        let mut persistor = Persistor::new(&mode)?;
        let mut registered = HashSet::default();
        for kind in kinds {
            let kind = kind.as_ref();
            if kind.trim().is_empty() {
                return Err(MefmError::Config("entity kind names cannot be empty".into()));
            }
            persistor.persist_kind(kind)?;
            registered.insert(kind.to_owned());
        }
        // Restore the identity bounds so identifiers are never handed out twice
        let mut identity_generator = IdentityGenerator::new();
        for (kind, id) in persistor.restore_identities()? {
            identity_generator.retain(&kind, id)?;
        }
        debug!(kinds = registered.len(), "database opened");
        Ok(Self {
            identity_generator: Arc::new(Mutex::new(identity_generator)),
            registered,
            persistor: Arc::new(Mutex::new(persistor)),
        })
    }
    pub fn is_registered(&self, kind: &str) -> bool {
        self.registered.contains(kind)
    }
    pub fn registered_kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.registered.iter().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
    fn ensure_registered<E: Entity>(&self) -> Result<()> {
        if self.is_registered(E::KIND) {
            Ok(())
        } else {
            Err(MefmError::Config(format!(
                "entity kind `{}` is not registered with the store",
                E::KIND
            )))
        }
    }

    /// Persists `entity`, assigning an identifier when it has none, and
    /// returns the effective identifier. An entity that already carries an
    /// identifier overwrites whatever is stored under it.
    pub fn put<E: Entity>(&self, entity: &mut E) -> Result<Id> {
        self.ensure_registered::<E>()?;
        let id = match entity.id() {
            Some(id) => {
                self.identity_generator.lock()?.retain(E::KIND, id)?;
                id
            }
            None => self.identity_generator.lock()?.generate(E::KIND)?,
        };
        let attributes = encode(entity, id)?;
        self.persistor.lock()?.upsert_entity(E::KIND, id, &attributes)?;
        entity.set_id(id);
        debug!(kind = E::KIND, id, "entity put");
        Ok(id)
    }

    /// Puts every element in order. A failing element stops the batch; the
    /// elements before it stay committed and are listed in the error.
    pub fn put_batch<E: Entity>(&self, entities: &mut [E]) -> Result<Vec<Id>> {
        let mut committed = Vec::with_capacity(entities.len());
        for (index, entity) in entities.iter_mut().enumerate() {
            match self.put(entity) {
                Ok(id) => committed.push(id),
                Err(source) => {
                    return Err(MefmError::Batch {
                        index,
                        committed,
                        source: Box::new(source),
                    });
                }
            }
        }
        Ok(committed)
    }

    pub fn get<E: Entity>(&self, id: Id) -> Result<E> {
        self.ensure_registered::<E>()?;
        let attributes = self.persistor.lock()?.fetch_entity(E::KIND, id)?;
        match attributes {
            Some(attributes) => decode(id, &attributes),
            None => Err(MefmError::NotFound { kind: E::KIND, id }),
        }
    }

    /// Removing an identifier that was never persisted is not an error.
    pub fn delete<E: Entity>(&self, id: Id) -> Result<()> {
        self.ensure_registered::<E>()?;
        let removed = self.persistor.lock()?.remove_entity(E::KIND, id)?;
        debug!(kind = E::KIND, id, removed, "entity delete");
        Ok(())
    }

    /// Entities matching every filter, in store order. No match is an empty vector.
    pub fn query_by_filters<E: Entity>(&self, filters: &[Filter]) -> Result<Vec<E>> {
        self.ensure_registered::<E>()?;
        self.execute(translate(E::KIND, filters))
    }

    pub fn query<E: Entity>(&self, query: &Query) -> Result<Vec<E>> {
        self.ensure_registered::<E>()?;
        self.execute(query.translate(E::KIND))
    }

    pub fn all<E: Entity>(&self) -> Result<Vec<E>> {
        self.query_by_filters(&[])
    }

    fn execute<E: Entity>(&self, query: StoreQuery) -> Result<Vec<E>> {
        let started = Instant::now();
        let rows = self.persistor.lock()?.select_entities(&query)?;
        let entities = rows
            .iter()
            .map(|(id, attributes)| decode(*id, attributes))
            .collect::<Result<Vec<E>>>()?;
        debug!(
            kind = E::KIND,
            sql = %query.sql,
            rows = entities.len(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "query complete"
        );
        Ok(entities)
    }
}

fn encode<E: Entity>(entity: &E, id: Id) -> Result<String> {
    let mut value = serde_json::to_value(entity).map_err(|e| {
        MefmError::corruption(format!("{} could not be encoded: {e}", E::KIND))
    })?;
    let Value::Object(attributes) = &mut value else {
        return Err(MefmError::corruption(format!(
            "{} does not encode to an attribute map",
            E::KIND
        )));
    };
    attributes.insert(ID_PROPERTY.to_owned(), Value::from(id));
    Ok(value.to_string())
}

fn decode<E: Entity>(id: Id, attributes: &str) -> Result<E> {
    let mut entity: E = serde_json::from_str(attributes).map_err(|e| {
        MefmError::corruption(format!("stored {} {id} does not decode: {e}", E::KIND))
    })?;
    // the identity column is authoritative over the copy in the attribute map
    entity.set_id(id);
    Ok(entity)
}
