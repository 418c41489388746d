// used for persistence
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use tracing::debug;

use crate::entity::Id;
use crate::error::{MefmError, Result};
use crate::query::StoreQuery;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceMode {
    InMemory,
    File(String),
}

impl PersistenceMode {
    /// `":memory:"` selects the in-memory mode, anything else is a file path.
    pub fn from_path(path: &str) -> Self {
        if path == ":memory:" {
            PersistenceMode::InMemory
        } else {
            PersistenceMode::File(path.to_owned())
        }
    }
}

// ------------- Persistence -------------
pub struct Persistor {
    connection: Connection,
}

impl Persistor {
    pub fn new(mode: &PersistenceMode) -> Result<Self> {
        let connection = match mode {
            PersistenceMode::InMemory => Connection::open_in_memory()?,
            PersistenceMode::File(path) => Connection::open(path)?,
        };
        // The "STRICT" keyword is left out so the file stays readable by
        // older external tools.
        connection.execute_batch(
            "
            create table if not exists Kind (
                Kind text not null,
                Bound integer not null default 0,
                constraint referenceable_Kind primary key (
                    Kind
                )
            );
            create table if not exists Entity (
                Kind text not null,
                Identity integer not null,
                Attributes text not null,
                constraint Entity_is_of_Kind foreign key (
                    Kind
                ) references Kind(Kind),
                constraint unique_and_referenceable_Entity primary key (
                    Kind,
                    Identity
                )
            );
            ",
        )?;
        debug!(?mode, "persistor ready");
        Ok(Self { connection })
    }
    /// Returns true when the kind was already known.
    pub fn persist_kind(&mut self, kind: &str) -> Result<bool> {
        let added = self
            .connection
            .prepare_cached("insert or ignore into Kind (Kind) values (?)")?
            .execute(params![kind])?;
        Ok(added == 0)
    }
    /// Writes the attribute map under `(kind, id)` and records that identifiers
    /// up to `id` have been handed out. Both happen or neither does.
    pub fn upsert_entity(&mut self, kind: &str, id: Id, attributes: &str) -> Result<()> {
        let id = to_sql_id(id)?;
        let transaction = self.connection.transaction()?;
        transaction
            .prepare_cached(
                "
                insert into Entity (
                    Kind,
                    Identity,
                    Attributes
                ) values (?, ?, ?)
                on conflict (Kind, Identity) do update
                    set Attributes = excluded.Attributes
            ",
            )?
            .execute(params![kind, id, attributes])?;
        transaction
            .prepare_cached("update Kind set Bound = max(Bound, ?) where Kind = ?")?
            .execute(params![id, kind])?;
        transaction.commit()?;
        Ok(())
    }
    pub fn fetch_entity(&mut self, kind: &str, id: Id) -> Result<Option<String>> {
        let attributes = self
            .connection
            .prepare_cached(
                "
                select Attributes
                    from Entity
                    where Kind = ?
                    and Identity = ?
            ",
            )?
            .query_row(params![kind, to_sql_id(id)?], |row| row.get(0))
            .optional()?;
        Ok(attributes)
    }
    /// Returns true when something was actually removed.
    pub fn remove_entity(&mut self, kind: &str, id: Id) -> Result<bool> {
        let removed = self
            .connection
            .prepare_cached("delete from Entity where Kind = ? and Identity = ?")?
            .execute(params![kind, to_sql_id(id)?])?;
        Ok(removed > 0)
    }
    pub fn select_entities(&mut self, query: &StoreQuery) -> Result<Vec<(Id, String)>> {
        let mut statement = self.connection.prepare_cached(&query.sql)?;
        let rows = statement.query_map(params_from_iter(query.params.iter()), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut entities = Vec::new();
        for row in rows {
            let (id, attributes) = row?;
            entities.push((from_sql_id(id)?, attributes));
        }
        Ok(entities)
    }
    /// The largest identifier ever handed out for every known kind.
    pub fn restore_identities(&mut self) -> Result<Vec<(String, Id)>> {
        let mut statement = self.connection.prepare_cached(
            "
            select k.Kind, max(k.Bound, coalesce(e.Identity, 0))
                from Kind k
                left join (
                    select Kind, max(Identity) as Identity
                        from Entity
                        group by Kind
                ) e on e.Kind = k.Kind
        ",
        )?;
        let rows = statement.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut bounds = Vec::new();
        for row in rows {
            let (kind, id) = row?;
            bounds.push((kind, from_sql_id(id)?));
        }
        Ok(bounds)
    }
}

// SQLite integers are signed 64-bit.
fn to_sql_id(id: Id) -> Result<i64> {
    i64::try_from(id).map_err(|_| MefmError::parse(format!("identifier {id} is out of range")))
}

fn from_sql_id(id: i64) -> Result<Id> {
    Id::try_from(id).map_err(|_| MefmError::corruption(format!("negative identity {id} in store")))
}
