//! In-process document store.
//!
//! Mirrors the observable behavior of the remote service: resources are
//! identified by name, documents are unique per `(partition key, id)`, queries
//! are paginated through continuation tokens and every call reports a
//! (synthetic) request charge.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use log::trace;
use serde_json::Value;

use super::{ContainerLink, DocumentStore, Error, WriteMode};
use crate::{query, types};

const CHARGE_METADATA: f64 = 1.0;
const CHARGE_POINT_READ: f64 = 1.0;
const CHARGE_WRITE: f64 = 5.0;
const CHARGE_QUERY_PAGE: f64 = 2.5;
const CHARGE_QUERY_DOCUMENT: f64 = 0.1;

/// Documents are keyed by (canonical partition key, id), which also gives
/// a stable iteration order for paging.
type DocumentKey = (String, String);

struct Container {
    props: types::ContainerProperties,
    documents: BTreeMap<DocumentKey, Value>,
}

#[derive(Default)]
struct Database {
    containers: HashMap<String, Container>,
}

#[derive(Default)]
pub struct MemoryStore {
    databases: Mutex<HashMap<String, Database>>,
    page_size: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the page size of every query, regardless of the requested
    /// `max_item_count`.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size.max(1));
        self
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Database>> {
        // a poisoned map is still consistent, every mutation is a single insert
        self.databases
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn charge(value: f64) -> types::RequestCharge {
    types::RequestCharge::new(value)
}

fn container_mut<'a>(
    dbs: &'a mut HashMap<String, Database>,
    link: &ContainerLink,
) -> Result<&'a mut Container, Error> {
    dbs.get_mut(&link.database)
        .ok_or_else(|| Error::NotFound(format!("database `{}`", link.database)))?
        .containers
        .get_mut(&link.container)
        .ok_or_else(|| Error::NotFound(format!("container `{link}`")))
}

fn document_id(document: &Value) -> Result<String, Error> {
    match document.get("id") {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        _ => Err(Error::Service {
            status: 400,
            message: "the input content is invalid because the required property `id` is missing"
                .to_owned(),
        }),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn read_database(
        &self,
        id: &str,
    ) -> Result<types::Response<types::DatabaseProperties>, Error> {
        if self.lock().contains_key(id) {
            Ok(types::Response::new(
                types::DatabaseProperties::new(id),
                charge(CHARGE_METADATA),
            ))
        } else {
            Err(Error::NotFound(format!("database `{id}`")))
        }
    }

    async fn create_database(
        &self,
        props: &types::DatabaseProperties,
    ) -> Result<types::Response<types::DatabaseProperties>, Error> {
        let mut dbs = self.lock();
        if dbs.contains_key(&props.id) {
            return Err(Error::Conflict(format!("database `{}`", props.id)));
        }

        dbs.insert(props.id.clone(), Database::default());
        Ok(types::Response::new(props.clone(), charge(CHARGE_METADATA)))
    }

    async fn read_container(
        &self,
        database: &str,
        id: &str,
    ) -> Result<types::Response<types::ContainerProperties>, Error> {
        let mut dbs = self.lock();
        let container = container_mut(&mut dbs, &ContainerLink::new(database, id))?;
        Ok(types::Response::new(
            container.props.clone(),
            charge(CHARGE_METADATA),
        ))
    }

    async fn create_container(
        &self,
        database: &str,
        props: &types::ContainerProperties,
    ) -> Result<types::Response<types::ContainerProperties>, Error> {
        let mut dbs = self.lock();
        let db = dbs
            .get_mut(database)
            .ok_or_else(|| Error::NotFound(format!("database `{database}`")))?;

        if db.containers.contains_key(&props.id) {
            return Err(Error::Conflict(format!("container `{}`", props.id)));
        }

        db.containers.insert(
            props.id.clone(),
            Container {
                props: props.clone(),
                documents: BTreeMap::new(),
            },
        );
        Ok(types::Response::new(props.clone(), charge(CHARGE_METADATA)))
    }

    async fn write_document(
        &self,
        link: &ContainerLink,
        document: &Value,
        partition_key: &types::PartitionKeyValue,
        mode: WriteMode,
    ) -> Result<types::Response<Value>, Error> {
        let id = document_id(document)?;

        let mut dbs = self.lock();
        let container = container_mut(&mut dbs, link)?;
        let key = (partition_key.canonical(), id);

        if mode == WriteMode::Create && container.documents.contains_key(&key) {
            return Err(Error::Conflict(format!(
                "document `{}` in partition {}",
                key.1, key.0
            )));
        }

        trace!("writing document `{}` in partition {}", key.1, key.0);
        container.documents.insert(key, document.clone());

        Ok(types::Response::new(document.clone(), charge(CHARGE_WRITE)))
    }

    async fn read_document(
        &self,
        link: &ContainerLink,
        id: &str,
        partition_key: &types::PartitionKeyValue,
    ) -> Result<types::Response<Value>, Error> {
        let mut dbs = self.lock();
        let container = container_mut(&mut dbs, link)?;

        container
            .documents
            .get(&(partition_key.canonical(), id.to_owned()))
            .map(|doc| types::Response::new(doc.clone(), charge(CHARGE_POINT_READ)))
            .ok_or_else(|| Error::NotFound(format!("document `{id}` in partition {partition_key}")))
    }

    async fn query_documents(
        &self,
        link: &ContainerLink,
        filter: &query::Filter,
        continuation: Option<&str>,
        max_item_count: usize,
    ) -> Result<types::Page<Value>, Error> {
        let offset = match continuation {
            Some(token) => token.parse::<usize>().map_err(|_| Error::Service {
                status: 400,
                message: format!("invalid continuation token `{token}`"),
            })?,
            None => 0,
        };

        let page_size = self
            .page_size
            .map_or(max_item_count, |cap| cap.min(max_item_count))
            .max(1);

        let mut dbs = self.lock();
        let container = container_mut(&mut dbs, link)?;

        let mut matching = container
            .documents
            .values()
            .filter(|doc| filter.matches(doc))
            .skip(offset);

        let documents: Vec<Value> = matching.by_ref().take(page_size).cloned().collect();
        let has_more = matching.next().is_some();

        let continuation = has_more.then(|| (offset + documents.len()).to_string());
        let request_charge =
            charge(CHARGE_QUERY_PAGE + CHARGE_QUERY_DOCUMENT * documents.len() as f64);

        trace!(
            "query page at offset {} returned {} documents (more: {})",
            offset,
            documents.len(),
            has_more
        );

        Ok(types::Page {
            documents,
            continuation,
            request_charge,
        })
    }
}
