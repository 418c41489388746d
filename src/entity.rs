use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasherDefault, Hash, Hasher};
use std::marker::PhantomData;

use seahash::SeaHasher;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{MefmError, Result};

// ------------- Identity -------------
pub type Id = u64;

pub type KindHasher = BuildHasherDefault<SeaHasher>;

pub const GENESIS: Id = 0;

/// The largest identifier the store can hold (SQLite integers are signed).
pub const MAX_ID: Id = i64::MAX as Id;

/// Rejects identifiers the store cannot represent.
pub fn check_id(id: Id) -> Result<Id> {
    if id > MAX_ID {
        Err(MefmError::parse(format!("identifier {id} is out of range")))
    } else {
        Ok(id)
    }
}

/// Hands out identifiers per entity kind.
///
/// Identifiers only ever grow. A deleted identifier is never handed out again,
/// otherwise a reference to the deleted entity would silently resolve to a new one.
#[derive(Debug, Default)]
pub struct IdentityGenerator {
    lower_bounds: HashMap<String, Id, KindHasher>,
}

impl IdentityGenerator {
    pub fn new() -> Self {
        Self::default()
    }
    // Identifiers given as input (restored from the store or chosen by a
    // caller doing an upsert) must move the bound so they are never generated.
    pub fn retain(&mut self, kind: &str, id: Id) -> Result<()> {
        check_id(id)?;
        let bound = self.lower_bounds.entry(kind.to_owned()).or_insert(GENESIS);
        if id > *bound {
            *bound = id;
        }
        Ok(())
    }
    // The bound only moves once the next identifier is known to be valid.
    pub fn generate(&mut self, kind: &str) -> Result<Id> {
        let bound = self.lower_bounds.entry(kind.to_owned()).or_insert(GENESIS);
        let id = bound
            .checked_add(1)
            .filter(|id| *id <= MAX_ID)
            .ok_or_else(|| MefmError::StoreUnavailable(format!("identifiers of {kind} are exhausted")))?;
        *bound = id;
        Ok(id)
    }
    pub fn lower_bound(&self, kind: &str) -> Id {
        self.lower_bounds.get(kind).copied().unwrap_or(GENESIS)
    }
}

// ------------- Entity -------------
/// A record of some kind that the store keeps as a flat attribute map.
///
/// Implementors serialize to a JSON object. The store owns the `id` attribute:
/// it is written into the attribute map on every put.
pub trait Entity: Serialize + DeserializeOwned + Send + 'static {
    const KIND: &'static str;
    fn id(&self) -> Option<Id>;
    fn set_id(&mut self, id: Id);
    fn key(&self) -> Option<Key<Self>>
    where
        Self: Sized,
    {
        self.id().map(Key::new)
    }
}

// ------------- Key -------------
/// A reference to an entity of kind `E` by identifier, without embedding it.
///
/// Serialized as the bare identifier so a stored reference can be filtered on
/// like any other numeric attribute. Following it goes through
/// [`crate::store::Database::resolve`].
pub struct Key<E> {
    id: Id,
    kind: PhantomData<fn() -> E>,
}

impl<E: Entity> Key<E> {
    pub fn new(id: Id) -> Self {
        Self { id, kind: PhantomData }
    }
    pub fn id(&self) -> Id {
        self.id
    }
    pub fn kind(&self) -> &'static str {
        E::KIND
    }
}

// Manual impls so that no bounds are placed on `E` itself.
impl<E> Clone for Key<E> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<E> Copy for Key<E> {}
impl<E> PartialEq for Key<E> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<E> Eq for Key<E> {}
impl<E> Hash for Key<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
impl<E: Entity> fmt::Debug for Key<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({}, {})", E::KIND, self.id)
    }
}
impl<E: Entity> fmt::Display for Key<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", E::KIND, self.id)
    }
}
impl<E> Serialize for Key<E> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.id)
    }
}
impl<'de, E> Deserialize<'de> for Key<E> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let id = Id::deserialize(deserializer)?;
        Ok(Self { id, kind: PhantomData })
    }
}
