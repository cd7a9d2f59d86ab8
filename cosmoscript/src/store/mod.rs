//! # Document store
//!
//! Abstraction over the remote document database. The [`DocumentStore`] trait
//! exposes the raw resource operations of the service (read/create database,
//! read/create container, write/read/query documents) and is implemented by:
//!
//! * [`CosmosStore`], speaking the Cosmos DB REST protocol over HTTPS
//! * [`MemoryStore`], an in-process substitute with the same observable behavior
//!
//! Higher level semantics (create-if-absent, partition key extraction, paging)
//! are implemented once on top of this trait by the session facades.

use async_trait::async_trait;
use serde_json::Value;

use crate::{query, types};

mod cosmos;
pub use cosmos::*;

mod memory;
pub use memory::*;

pub const STATUS_UNAUTHORIZED: u16 = 401;
pub const STATUS_FORBIDDEN: u16 = 403;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_CONFLICT: u16 = 409;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("resource already exists: {0}")]
    Conflict(String),
    #[error("authorization failed ({status}): {message}")]
    Unauthorized { status: u16, message: String },
    #[error("unable to reach the service :: {0}")]
    Connectivity(String),
    #[error("service error ({status}): {message}")]
    Service { status: u16, message: String },
    #[error("bad response from service :: {0}")]
    BadResponse(String),
    #[error("bad endpoint `{0}`")]
    BadEndpoint(String),
    #[error("invalid master key :: {0}")]
    InvalidKey(String),
    #[error("query error :: {0}")]
    QueryError(#[from] query::Error),
}

impl Error {
    /// Maps a non-successful status code replied by the service to an error.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            STATUS_UNAUTHORIZED | STATUS_FORBIDDEN => Self::Unauthorized { status, message },
            STATUS_NOT_FOUND => Self::NotFound(message),
            STATUS_CONFLICT => Self::Conflict(message),
            _ => Self::Service { status, message },
        }
    }

    /// Status code replied by the service, if the error originated from a reply.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::NotFound(_) => Some(STATUS_NOT_FOUND),
            Self::Conflict(_) => Some(STATUS_CONFLICT),
            Self::Unauthorized { status, .. } | Self::Service { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Identifies a container inside a database.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerLink {
    pub database: String,
    pub container: String,
}

impl ContainerLink {
    pub fn new(database: &str, container: &str) -> Self {
        Self {
            database: database.to_owned(),
            container: container.to_owned(),
        }
    }
}

impl std::fmt::Display for ContainerLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dbs/{}/colls/{}", self.database, self.container)
    }
}

/// How a document write behaves when a document with the same id already
/// exists in the same logical partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Fails with [`Error::Conflict`]
    Create,
    /// Replaces the existing document
    Upsert,
}

/// Raw operations of a remote document database.
///
/// Every call is a single request/response exchange: implementations must not
/// retry on their own.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short name of the backend, used in logs
    fn name(&self) -> &'static str;

    async fn read_database(&self, id: &str)
    -> Result<types::Response<types::DatabaseProperties>, Error>;

    async fn create_database(
        &self,
        props: &types::DatabaseProperties,
    ) -> Result<types::Response<types::DatabaseProperties>, Error>;

    async fn read_container(
        &self,
        database: &str,
        id: &str,
    ) -> Result<types::Response<types::ContainerProperties>, Error>;

    async fn create_container(
        &self,
        database: &str,
        props: &types::ContainerProperties,
    ) -> Result<types::Response<types::ContainerProperties>, Error>;

    async fn write_document(
        &self,
        link: &ContainerLink,
        document: &Value,
        partition_key: &types::PartitionKeyValue,
        mode: WriteMode,
    ) -> Result<types::Response<Value>, Error>;

    async fn read_document(
        &self,
        link: &ContainerLink,
        id: &str,
        partition_key: &types::PartitionKeyValue,
    ) -> Result<types::Response<Value>, Error>;

    /// Fetches a single page of the documents matching `filter`, starting from
    /// `continuation` ([`None`] for the first page).
    async fn query_documents(
        &self,
        link: &ContainerLink,
        filter: &query::Filter,
        continuation: Option<&str>,
        max_item_count: usize,
    ) -> Result<types::Page<Value>, Error>;

    /// Releases any resource held by the backend.
    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(Error::from_status(404, "gone".into()).is_not_found());
        assert!(Error::from_status(409, "dup".into()).is_conflict());
        assert!(matches!(
            Error::from_status(401, "bad key".into()),
            Error::Unauthorized { status: 401, .. }
        ));
        assert!(matches!(
            Error::from_status(403, "forbidden".into()),
            Error::Unauthorized { status: 403, .. }
        ));

        let throttled = Error::from_status(429, "too many requests".into());
        assert!(matches!(throttled, Error::Service { status: 429, .. }));
        assert_eq!(throttled.status_code(), Some(429));

        assert_eq!(Error::Connectivity("refused".into()).status_code(), None);
    }

    #[test]
    fn container_link_display() {
        assert_eq!(
            ContainerLink::new("db", "items").to_string(),
            "dbs/db/colls/items"
        );
    }
}
