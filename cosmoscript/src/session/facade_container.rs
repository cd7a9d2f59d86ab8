use std::sync::Arc;

use log::{debug, trace};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{FacadeError, FeedIterator};
use crate::{params, query, store, types};

/// Non-owning reference to a remote container, bound to its partition key path.
#[derive(Clone)]
pub struct FacadeContainer {
    link: store::ContainerLink,
    pk_path: types::PartitionKeyPath,
    store: Arc<dyn store::DocumentStore>,
}

impl FacadeContainer {
    pub(super) fn new(
        link: store::ContainerLink,
        pk_path: types::PartitionKeyPath,
        store: Arc<dyn store::DocumentStore>,
    ) -> Self {
        Self {
            link,
            pk_path,
            store,
        }
    }

    pub fn id(&self) -> &str {
        &self.link.container
    }

    pub fn partition_key_path(&self) -> &types::PartitionKeyPath {
        &self.pk_path
    }

    /// Extracts the partition key value from a serialized document.
    ///
    /// The document must have a non-empty string `id` and a valid
    /// [`types::PartitionKeyValue`] at the partition key path.
    pub fn partition_key_of(&self, doc: &Value) -> Result<types::PartitionKeyValue, FacadeError> {
        match doc.get("id") {
            Some(Value::String(id)) if !id.is_empty() => {}
            _ => {
                return Err(FacadeError::Validation(
                    "document requires a non-empty string `id`".to_owned(),
                ));
            }
        }

        let value = self.pk_path.extract(doc).ok_or_else(|| {
            FacadeError::Validation(format!(
                "document is missing partition key field `{}`",
                self.pk_path
            ))
        })?;

        types::PartitionKeyValue::try_from_value(value.clone()).map_err(|e| {
            FacadeError::Validation(format!("field `{}`: {}", self.pk_path, e))
        })
    }

    /// Writes a document, replacing any document with the same id in the same
    /// logical partition.
    pub async fn upsert<T>(&self, doc: &T) -> Result<types::Response<T>, FacadeError>
    where
        T: Serialize + DeserializeOwned,
    {
        self.write(doc, store::WriteMode::Upsert).await
    }

    /// Writes a new document, failing with a conflict if the id is already
    /// used in the same logical partition.
    pub async fn create<T>(&self, doc: &T) -> Result<types::Response<T>, FacadeError>
    where
        T: Serialize + DeserializeOwned,
    {
        self.write(doc, store::WriteMode::Create).await
    }

    async fn write<T>(
        &self,
        doc: &T,
        mode: store::WriteMode,
    ) -> Result<types::Response<T>, FacadeError>
    where
        T: Serialize + DeserializeOwned,
    {
        let raw = serde_json::to_value(doc)?;
        let pk = self.partition_key_of(&raw)?;

        trace!("{:?} document in `{}` (partition {})", mode, self.link, pk);

        let response = self
            .store
            .write_document(&self.link, &raw, &pk, mode)
            .await?;

        debug!(
            "document written in `{}` ({} RU)",
            self.link, response.request_charge
        );

        Ok(types::Response::new(
            serde_json::from_value(response.resource)?,
            response.request_charge,
        ))
    }

    /// Point lookup by id and partition key.
    ///
    /// A missing document is not an error: [`None`] is returned instead.
    pub async fn read<T>(
        &self,
        id: &str,
        pk: &types::PartitionKeyValue,
    ) -> Result<Option<types::Response<T>>, FacadeError>
    where
        T: DeserializeOwned,
    {
        if id.is_empty() {
            return Err(FacadeError::Validation("document id is empty".to_owned()));
        }

        match self.store.read_document(&self.link, id, pk).await {
            Ok(response) => Ok(Some(types::Response::new(
                serde_json::from_value(response.resource)?,
                response.request_charge,
            ))),
            Err(e) if e.is_not_found() => {
                debug!("document `{}` not found in partition {}", id, pk);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Lazily queries the documents matching `filter`, using the configured
    /// page size.
    pub fn query<T>(&self, filter: query::Filter) -> FeedIterator<T>
    where
        T: DeserializeOwned,
    {
        self.query_with_max_items(filter, params::configurables().max_item_count)
    }

    pub fn query_with_max_items<T>(
        &self,
        filter: query::Filter,
        max_item_count: usize,
    ) -> FeedIterator<T>
    where
        T: DeserializeOwned,
    {
        FeedIterator::new(
            self.store.clone(),
            self.link.clone(),
            filter,
            max_item_count.max(1),
        )
    }
}
