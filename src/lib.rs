//! Mefm – the backend of a practitioner directory with user feedback.
//!
//! Every record is an *entity*: a serde-serializable struct of a named kind
//! (`Comment`, `Practitioner`, `User`, ...) identified by a per-kind `u64`.
//! Entities are stored as JSON attribute maps in a single SQLite table and
//! found again through typed filters:
//! * A [`filter::Filter`] is a property, a comparison operator and a scalar
//!   value, parsed from tokens such as `"status"` or `"practitionerId =="`.
//! * A [`query::Query`] conjoins filters and optionally orders and limits.
//! * A [`entity::Key`] is a typed reference from one entity to another,
//!   resolved through the [`store::Database`].
//!
//! ## Modules
//! * [`entity`] – The [`entity::Entity`] trait, keys and identity generation.
//! * [`filter`] / [`query`] – Filter grammar and its translation to SQL.
//! * [`persist`] – SQLite schema and statements.
//! * [`store`] – The [`store::Database`] handle: put, get, delete, query.
//! * [`resolve`] – Reference resolution on top of the store.
//! * [`schema`] – The entity kinds of the application.
//! * [`distance`] / [`maps`] – Distances from an origin to practitioners.
//! * [`settings`] – Layered configuration.
//! * [`server`] – The HTTP resource layer.
//!
//! ## Quick Start
//! ```
//! use mefm::{Database, Filter, PersistenceMode};
//! use mefm::entity::Key;
//! use mefm::schema::{Comment, CommentStatus, ALL_KINDS};
//!
//! let db = Database::new(PersistenceMode::InMemory, ALL_KINDS).unwrap();
//! let mut comment = Comment::new(Key::new(1), Key::new(2), "Very kind", CommentStatus::Open);
//! let id = db.put(&mut comment).unwrap();
//! let open: Vec<Comment> = db
//!     .query_by_filters(&[Filter::parse("status", "OPEN").unwrap()])
//!     .unwrap();
//! assert_eq!(open[0].id, Some(id));
//! ```
pub mod distance;
pub mod entity;
pub mod error;
pub mod filter;
pub mod maps;
pub mod persist;
pub mod query;
pub mod resolve;
pub mod schema;
pub mod server;
pub mod settings;
pub mod store;

pub use entity::{Entity, Id, Key};
pub use error::{MefmError, Result};
pub use filter::{Filter, Operator, parse_filter};
pub use persist::PersistenceMode;
pub use query::{Direction, Query};
pub use store::Database;
