use serde::{Deserialize, Serialize};

/// The document written, read and queried by the demonstration.
///
/// Partitioned by `/category`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub category: String,
    pub quantity: i64,
}

impl Item {
    pub fn new(id: &str, name: &str, category: &str, quantity: i64) -> Self {
        Self {
            id: id.to_owned(),
            name: name.to_owned(),
            category: category.to_owned(),
            quantity,
        }
    }
}
