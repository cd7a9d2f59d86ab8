//! The demonstration sequence: provision a database and a container, write a
//! document, read it back and query it, printing the cost of every step.
//!
//! Steps run strictly one after the other, the first failure aborts the whole
//! sequence.

use colored::Colorize;
use log::info;
use url::Url;

use crate::{
    params, query,
    session::{FacadeError, FacadeSession},
    store, types,
};

#[derive(thiserror::Error, Debug)]
pub enum DemoError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("remote service error ({status}): {message}")]
    RemoteService { status: u16, message: String },
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl From<FacadeError> for DemoError {
    fn from(e: FacadeError) -> Self {
        match e {
            // documents and ids all come from the command line
            FacadeError::Configuration(msg) | FacadeError::Validation(msg) => {
                Self::Configuration(msg)
            }
            FacadeError::StoreError(
                e @ (store::Error::BadEndpoint(_) | store::Error::InvalidKey(_)),
            ) => Self::Configuration(e.to_string()),
            FacadeError::StoreError(e) => match e.status_code() {
                Some(status) => Self::RemoteService {
                    status,
                    message: e.to_string(),
                },
                None => Self::Unexpected(e.to_string()),
            },
            other => Self::Unexpected(other.to_string()),
        }
    }
}

impl From<types::PartitionKeyError> for DemoError {
    fn from(e: types::PartitionKeyError) -> Self {
        Self::Configuration(e.to_string())
    }
}

impl From<query::Error> for DemoError {
    fn from(e: query::Error) -> Self {
        Self::Unexpected(e.to_string())
    }
}

/// Endpoint and master key of the account.
pub struct Credentials {
    pub endpoint: Url,
    pub primary_key: String,
}

impl Credentials {
    /// Reads the credentials through `lookup`, both values must be present
    /// and non-empty.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DemoError> {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let (Some(endpoint), Some(primary_key)) =
            (read(params::ENV_ENDPOINT_URI), read(params::ENV_PRIMARY_KEY))
        else {
            return Err(DemoError::Configuration(format!(
                "{} and {} environment variables must be set",
                params::ENV_ENDPOINT_URI,
                params::ENV_PRIMARY_KEY
            )));
        };

        let endpoint = Url::parse(endpoint.trim()).map_err(|e| {
            DemoError::Configuration(format!(
                "invalid {} `{}`: {}",
                params::ENV_ENDPOINT_URI,
                endpoint,
                e
            ))
        })?;

        Ok(Self {
            endpoint,
            primary_key,
        })
    }
}

pub struct DemoConfig {
    pub database: String,
    pub container: String,
    pub partition_key_path: types::PartitionKeyPath,
    /// Document written by the demonstration
    pub item: types::Item,
    /// Id looked up with a point read, in the partition of `item`
    pub read_id: String,
    /// Category used to filter the query
    pub category: String,
}

impl DemoConfig {
    /// Default demonstration on a container partitioned by `partition_key_path`.
    pub fn with_partition_key_path(partition_key_path: &str) -> Result<Self, DemoError> {
        Ok(Self {
            database: params::DEFAULT_DATABASE_ID.to_owned(),
            container: params::DEFAULT_CONTAINER_ID.to_owned(),
            partition_key_path: types::PartitionKeyPath::try_new(partition_key_path)?,
            item: types::Item::new("item1", "Laptop", "Electronics", 50),
            read_id: "item1".to_owned(),
            category: "Electronics".to_owned(),
        })
    }
}

/// What the demonstration observed, returned for inspection.
#[derive(Debug)]
pub struct DemoReport {
    pub database_outcome: types::EnsureOutcome,
    pub container_outcome: types::EnsureOutcome,
    pub read: Option<types::Item>,
    pub queried: Vec<types::Item>,
    pub total_request_charge: types::RequestCharge,
}

pub async fn run(session: &FacadeSession, config: &DemoConfig) -> Result<DemoReport, DemoError> {
    info!("running demonstration on {} backend", session.backend());

    let mut total = types::RequestCharge::zero();

    let database = session.ensure_database(&config.database).await?;
    total += database.request_charge;
    println!(
        "Database '{}' {} ({}).",
        database.handle.id(),
        "ready".green(),
        database.outcome
    );

    let container = database
        .handle
        .ensure_container(&config.container, &config.partition_key_path)
        .await?;
    total += container.request_charge;
    println!(
        "Container '{}' {} ({}, partition key {}).",
        container.handle.id(),
        "ready".green(),
        container.outcome,
        container.handle.partition_key_path()
    );
    let container_outcome = container.outcome;
    let container = container.handle;

    // write
    let written = container.upsert(&config.item).await?;
    total += written.request_charge;
    println!(
        "Upserted item: {} (RU: {})",
        written.resource.id, written.request_charge
    );

    // point read, in the partition of the written item
    let raw = serde_json::to_value(&config.item).map_err(FacadeError::from)?;
    let pk = container.partition_key_of(&raw)?;
    let read = match container.read::<types::Item>(&config.read_id, &pk).await? {
        Some(response) => {
            total += response.request_charge;
            println!(
                "Read item: {}, Name: {} (RU: {})",
                response.resource.id, response.resource.name, response.request_charge
            );
            Some(response.resource)
        }
        None => {
            println!("Item with ID '{}' {}.", config.read_id, "not found".yellow());
            None
        }
    };

    // query
    let filter = query::Filter::eq("category", config.category.as_str())?;
    let result = container.query::<types::Item>(filter).drain().await?;
    total += result.request_charge;
    println!(
        "Query for category '{}' returned {} items (Total RU: {}):",
        config.category,
        result.documents.len(),
        result.request_charge
    );
    for item in &result.documents {
        println!("- {}: {}", item.id, item.name);
    }

    info!("demonstration completed ({} RU overall)", total);

    Ok(DemoReport {
        database_outcome: database.outcome,
        container_outcome,
        read,
        queried: result.documents,
        total_request_charge: total,
    })
}

/// Opens a session, runs the demonstration and closes the session, whatever
/// the outcome.
///
/// Unless `in_memory` is set, credentials are read through `lookup` and
/// validated before the service is contacted.
pub async fn launch(
    config: &DemoConfig,
    in_memory: bool,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<DemoReport, DemoError> {
    let session = if in_memory {
        FacadeSession::in_memory()
    } else {
        let credentials = Credentials::from_lookup(lookup)?;
        FacadeSession::connect(credentials.endpoint, &credentials.primary_key)?
    };

    let result = run(&session, config).await;
    session.close().await;
    result
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config() -> DemoConfig {
        DemoConfig::with_partition_key_path(params::DEFAULT_PARTITION_KEY_PATH).unwrap()
    }

    #[test]
    fn credentials_require_both_variables() {
        let mut env = HashMap::new();
        env.insert(params::ENV_ENDPOINT_URI, "https://acct.documents.azure.com:443/");

        let result = Credentials::from_lookup(|name| env.get(name).map(|v| v.to_string()));
        assert!(matches!(result, Err(DemoError::Configuration(_))));

        env.insert(params::ENV_PRIMARY_KEY, "   ");
        let result = Credentials::from_lookup(|name| env.get(name).map(|v| v.to_string()));
        assert!(matches!(result, Err(DemoError::Configuration(_))));

        env.insert(params::ENV_PRIMARY_KEY, "a2V5");
        let creds = Credentials::from_lookup(|name| env.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(creds.endpoint.host_str(), Some("acct.documents.azure.com"));
        assert_eq!(creds.primary_key, "a2V5");
    }

    #[test]
    fn credentials_reject_malformed_endpoint() {
        let result = Credentials::from_lookup(|name| match name {
            params::ENV_ENDPOINT_URI => Some("not a url".to_owned()),
            _ => Some("a2V5".to_owned()),
        });
        assert!(matches!(result, Err(DemoError::Configuration(_))));
    }

    #[test]
    fn invalid_partition_key_path_is_a_configuration_error() {
        let result = DemoConfig::with_partition_key_path("category");
        assert!(matches!(result, Err(DemoError::Configuration(_))));
    }

    #[test]
    fn error_taxonomy() {
        let err: DemoError = FacadeError::StoreError(store::Error::from_status(
            429,
            "request rate is large".to_owned(),
        ))
        .into();
        assert!(matches!(err, DemoError::RemoteService { status: 429, .. }));

        let err: DemoError =
            FacadeError::StoreError(store::Error::from_status(401, "bad signature".to_owned()))
                .into();
        assert!(matches!(err, DemoError::RemoteService { status: 401, .. }));

        let err: DemoError =
            FacadeError::StoreError(store::Error::Connectivity("refused".to_owned())).into();
        assert!(matches!(err, DemoError::Unexpected(_)));

        let err: DemoError =
            FacadeError::StoreError(store::Error::InvalidKey("not base64".to_owned())).into();
        assert!(matches!(err, DemoError::Configuration(_)));

        let err: DemoError = FacadeError::Configuration("pk mismatch".to_owned()).into();
        assert!(matches!(err, DemoError::Configuration(_)));

        let err: DemoError = FacadeError::Validation("missing `/brand`".to_owned()).into();
        assert!(matches!(err, DemoError::Configuration(_)));
    }

    #[tokio::test]
    async fn item_without_partition_key_field_is_a_configuration_error() {
        let session = FacadeSession::in_memory();
        let config = DemoConfig::with_partition_key_path("/brand").unwrap();

        let result = run(&session, &config).await;
        assert!(matches!(result, Err(DemoError::Configuration(_))));
    }

    #[tokio::test]
    async fn launch_requires_credentials() {
        let result = launch(&config(), false, |_| None).await;
        assert!(matches!(result, Err(DemoError::Configuration(_))));

        let result = launch(&config(), false, |name| match name {
            params::ENV_ENDPOINT_URI => Some("https://localhost:8081/".to_owned()),
            _ => Some("%%% not base64 %%%".to_owned()),
        })
        .await;
        assert!(matches!(result, Err(DemoError::Configuration(_))));

        let result = launch(&config(), false, |name| match name {
            params::ENV_ENDPOINT_URI => Some("ftp://localhost/".to_owned()),
            _ => Some("a2V5".to_owned()),
        })
        .await;
        assert!(matches!(result, Err(DemoError::Configuration(_))));
    }

    #[tokio::test]
    async fn launch_in_memory_ignores_credentials() {
        let report = launch(&config(), true, |_| None).await.unwrap();
        assert_eq!(report.database_outcome, types::EnsureOutcome::Created);
        assert_eq!(report.queried.len(), 1);
    }

    #[tokio::test]
    async fn first_run_creates_then_reuses() {
        let session = FacadeSession::in_memory();
        let config = config();

        let first = run(&session, &config).await.unwrap();
        assert_eq!(first.database_outcome, types::EnsureOutcome::Created);
        assert_eq!(first.container_outcome, types::EnsureOutcome::Created);
        assert_eq!(first.read, Some(config.item.clone()));
        assert_eq!(first.queried, vec![config.item.clone()]);
        assert!(first.total_request_charge.value() > 0.0);

        let second = run(&session, &config).await.unwrap();
        assert_eq!(second.database_outcome, types::EnsureOutcome::Existing);
        assert_eq!(second.container_outcome, types::EnsureOutcome::Existing);
        // upsert never duplicates
        assert_eq!(second.queried.len(), 1);
    }

    #[tokio::test]
    async fn missing_read_does_not_abort() {
        let session = FacadeSession::in_memory();
        let mut config = config();
        config.read_id = "item2".to_owned();

        let report = run(&session, &config).await.unwrap();
        assert!(report.read.is_none());
        assert_eq!(report.queried.len(), 1);
    }

    #[tokio::test]
    async fn partition_key_mismatch_aborts() {
        let session = FacadeSession::in_memory();
        run(&session, &config()).await.unwrap();

        let other = DemoConfig::with_partition_key_path("/name").unwrap();
        let result = run(&session, &other).await;
        assert!(matches!(result, Err(DemoError::Configuration(_))));
    }
}
