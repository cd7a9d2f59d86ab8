use serde::{Deserialize, Serialize};

use super::PartitionKeyPath;

/// Partition key kind used for every container created by this crate
pub const PARTITION_KIND_HASH: &str = "Hash";

/// Properties of a database resource as exchanged with the service.
/// System fields (`_rid`, `_etag`, ...) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseProperties {
    pub id: String,
}

impl DatabaseProperties {
    pub fn new(id: &str) -> Self {
        Self { id: id.to_owned() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionKeyDefinition {
    pub paths: Vec<String>,
    pub kind: String,
}

/// Properties of a container (collection) resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerProperties {
    pub id: String,
    pub partition_key: PartitionKeyDefinition,
}

impl ContainerProperties {
    pub fn new(id: &str, pk_path: &PartitionKeyPath) -> Self {
        Self {
            id: id.to_owned(),
            partition_key: PartitionKeyDefinition {
                paths: vec![pk_path.as_str().to_owned()],
                kind: PARTITION_KIND_HASH.to_owned(),
            },
        }
    }

    /// Returns the partition key path of the container, containers
    /// managed by this crate always have exactly one.
    pub fn partition_key_path(&self) -> Option<&str> {
        self.partition_key.paths.first().map(String::as_str)
    }
}
