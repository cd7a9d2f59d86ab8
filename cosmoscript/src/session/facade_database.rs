use std::sync::Arc;

use log::debug;

use super::{Ensured, FacadeContainer, FacadeError};
use crate::{store, types};

/// Non-owning reference to a remote database.
#[derive(Clone)]
pub struct FacadeDatabase {
    id: String,
    store: Arc<dyn store::DocumentStore>,
}

impl FacadeDatabase {
    pub(super) fn new(id: &str, store: Arc<dyn store::DocumentStore>) -> Self {
        Self {
            id: id.to_owned(),
            store,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Creates the container if it does not exist yet.
    ///
    /// The partition key path is fixed at creation: ensuring an existing
    /// container with a different path is a configuration error.
    pub async fn ensure_container(
        &self,
        id: &str,
        pk_path: &types::PartitionKeyPath,
    ) -> Result<Ensured<FacadeContainer>, FacadeError> {
        if id.is_empty() {
            return Err(FacadeError::Validation("container id is empty".to_owned()));
        }

        let (props, outcome) = match self.store.read_container(&self.id, id).await {
            Ok(props) => (props, types::EnsureOutcome::Existing),
            Err(e) if e.is_not_found() => {
                debug!("container `{}` not found, creating it", id);
                let request = types::ContainerProperties::new(id, pk_path);
                match self.store.create_container(&self.id, &request).await {
                    Ok(props) => (props, types::EnsureOutcome::Created),
                    // created by someone else in the meantime
                    Err(e) if e.is_conflict() => (
                        self.store.read_container(&self.id, id).await?,
                        types::EnsureOutcome::Existing,
                    ),
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        };

        let existing_path = props.resource.partition_key_path();
        if existing_path != Some(pk_path.as_str()) {
            return Err(FacadeError::Configuration(format!(
                "container `{}` is partitioned by `{}`, requested `{}`",
                id,
                existing_path.unwrap_or("<none>"),
                pk_path
            )));
        }

        debug!("container `{}` ready ({})", props.resource.id, outcome);

        Ok(Ensured {
            handle: FacadeContainer::new(
                store::ContainerLink::new(&self.id, &props.resource.id),
                pk_path.clone(),
                self.store.clone(),
            ),
            outcome,
            request_charge: props.request_charge,
        })
    }
}
