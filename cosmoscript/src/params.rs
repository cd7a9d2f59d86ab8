//! Constants and runtime configurables.
//!
//! Configurables are read once from the environment (after the optional `.env`
//! file has been loaded) and cached for the whole process lifetime.

use std::sync::OnceLock;
use std::time::Duration;

/// Environment variable holding the account endpoint, e.g. `https://acct.documents.azure.com:443/`
pub const ENV_ENDPOINT_URI: &str = "COSMOS_DB_ENDPOINT_URI";
/// Environment variable holding the base64 encoded account master key
pub const ENV_PRIMARY_KEY: &str = "COSMOS_DB_PRIMARY_KEY";

pub const ENV_MAX_ITEM_COUNT: &str = "COSMOS_MAX_ITEM_COUNT";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "COSMOS_REQUEST_TIMEOUT_SECS";

pub const DEFAULT_DATABASE_ID: &str = "YourDatabaseName";
pub const DEFAULT_CONTAINER_ID: &str = "YourContainerName";
pub const DEFAULT_PARTITION_KEY_PATH: &str = "/category";

/// REST API version sent with every request
pub const API_VERSION: &str = "2018-12-31";

pub mod header {
    pub const DATE: &str = "x-ms-date";
    pub const VERSION: &str = "x-ms-version";
    pub const ACTIVITY_ID: &str = "x-ms-activity-id";
    pub const REQUEST_CHARGE: &str = "x-ms-request-charge";
    pub const CONTINUATION: &str = "x-ms-continuation";
    pub const MAX_ITEM_COUNT: &str = "x-ms-max-item-count";
    pub const PARTITION_KEY: &str = "x-ms-documentdb-partitionkey";
    pub const IS_UPSERT: &str = "x-ms-documentdb-is-upsert";
    pub const IS_QUERY: &str = "x-ms-documentdb-isquery";
    pub const ENABLE_CROSS_PARTITION: &str = "x-ms-documentdb-query-enablecrosspartition";
    pub const QUERY_CONTENT_TYPE: &str = "application/query+json";
}

pub struct Configurables {
    /// Maximum number of documents returned by a single query page
    pub max_item_count: usize,
    /// Timeout applied to each HTTP request issued to the service
    pub request_timeout: Duration,
}

impl Default for Configurables {
    fn default() -> Self {
        Self {
            max_item_count: 100,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Configurables {
    fn from_env() -> Self {
        let mut conf = Self::default();

        if let Some(v) = env_parse::<usize>(ENV_MAX_ITEM_COUNT).filter(|v| *v > 0) {
            conf.max_item_count = v;
        }
        if let Some(v) = env_parse::<u64>(ENV_REQUEST_TIMEOUT_SECS).filter(|v| *v > 0) {
            conf.request_timeout = Duration::from_secs(v);
        }

        conf
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("ignoring invalid value `{}` for {}", raw, name);
            None
        }
    }
}

static CONFIGURABLES: OnceLock<Configurables> = OnceLock::new();

pub fn configurables() -> &'static Configurables {
    CONFIGURABLES.get_or_init(Configurables::from_env)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let conf = Configurables::default();
        assert_eq!(conf.max_item_count, 100);
        assert_eq!(conf.request_timeout, Duration::from_secs(30));
    }
}
