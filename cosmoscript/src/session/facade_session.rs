use std::sync::Arc;

use log::{debug, info};
use url::Url;

use super::{Ensured, FacadeDatabase, FacadeError};
use crate::{store, types};

/// Long-lived handle to the remote service.
///
/// Acquired once at startup and released with [`FacadeSession::close`], which
/// consumes the session.
pub struct FacadeSession {
    store: Arc<dyn store::DocumentStore>,
}

impl FacadeSession {
    pub fn new(store: Arc<dyn store::DocumentStore>) -> Self {
        Self { store }
    }

    /// Opens a session against a Cosmos DB account.
    pub fn connect(endpoint: Url, master_key: &str) -> Result<Self, FacadeError> {
        info!("opening session on {}", endpoint);
        let store = store::CosmosStore::try_new(endpoint, master_key)?;
        Ok(Self::new(Arc::new(store)))
    }

    /// Opens a session on a fresh in-process store.
    pub fn in_memory() -> Self {
        info!("opening in-memory session");
        Self::new(Arc::new(store::MemoryStore::new()))
    }

    pub fn backend(&self) -> &'static str {
        self.store.name()
    }

    /// Returns a handle to a database without contacting the service.
    pub fn database(&self, id: &str) -> FacadeDatabase {
        FacadeDatabase::new(id, self.store.clone())
    }

    /// Creates the database if it does not exist yet.
    ///
    /// Succeeds whether or not the database already existed.
    pub async fn ensure_database(&self, id: &str) -> Result<Ensured<FacadeDatabase>, FacadeError> {
        if id.is_empty() {
            return Err(FacadeError::Validation("database id is empty".to_owned()));
        }

        let (props, outcome) = match self.store.read_database(id).await {
            Ok(props) => (props, types::EnsureOutcome::Existing),
            Err(e) if e.is_not_found() => {
                debug!("database `{}` not found, creating it", id);
                match self
                    .store
                    .create_database(&types::DatabaseProperties::new(id))
                    .await
                {
                    Ok(props) => (props, types::EnsureOutcome::Created),
                    // created by someone else in the meantime
                    Err(e) if e.is_conflict() => (
                        self.store.read_database(id).await?,
                        types::EnsureOutcome::Existing,
                    ),
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        };

        debug!("database `{}` ready ({})", props.resource.id, outcome);

        Ok(Ensured {
            handle: self.database(&props.resource.id),
            outcome,
            request_charge: props.request_charge,
        })
    }

    pub async fn close(self) {
        debug!("closing {} session", self.store.name());
        self.store.close().await;
    }
}
