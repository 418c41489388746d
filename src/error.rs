use thiserror::Error;

use crate::entity::Id;

#[derive(Error, Debug)]
pub enum MefmError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Parse error: {message}")]
    Parse { message: String },
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: Id },
    #[error("Dangling reference: {kind} {id} does not exist")]
    DanglingReference { kind: &'static str, id: Id },
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("External service error: {0}")]
    ExternalService(String),
    #[error("Data corruption: {message}")]
    DataCorruption { message: String },
    #[error("Batch put failed at element {index}: {source}")]
    Batch {
        index: usize,
        committed: Vec<Id>,
        #[source]
        source: Box<MefmError>,
    },
    #[error("Lock poisoned: {0}")]
    Lock(String),
}

impl MefmError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse { message: message.into() }
    }
    pub fn corruption(message: impl Into<String>) -> Self {
        Self::DataCorruption { message: message.into() }
    }
    /// A dangling reference is a missing entity too, only reached through another entity.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::DanglingReference { .. })
    }
}

pub type Result<T> = std::result::Result<T, MefmError>;

impl From<rusqlite::Error> for MefmError {
    fn from(e: rusqlite::Error) -> Self {
        Self::StoreUnavailable(e.to_string())
    }
}

impl From<config::ConfigError> for MefmError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for MefmError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Self::Lock(e.to_string())
    }
}
