use serde_json::Value;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum PartitionKeyError {
    #[error("partition key path `{0}` must start with `/`")]
    MissingLeadingSlash(String),
    #[error("partition key path `{0}` contains an empty segment")]
    EmptySegment(String),
    #[error("partition key value must be a scalar, found `{0}`")]
    NotScalar(String),
    #[error("partition key value must not be null")]
    Null,
}

/// Path of the field used by the service to partition a container
/// (e.g. `/category` or `/address/zip`).
///
/// Fixed at container creation time and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionKeyPath {
    path: String,
}

impl PartitionKeyPath {
    pub fn try_new(path: impl Into<String>) -> Result<Self, PartitionKeyError> {
        let path = path.into();

        let Some(rest) = path.strip_prefix('/') else {
            return Err(PartitionKeyError::MissingLeadingSlash(path));
        };
        if rest.split('/').any(str::is_empty) {
            return Err(PartitionKeyError::EmptySegment(path));
        }

        Ok(Self { path })
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        // leading slash is guaranteed by construction
        self.path[1..].split('/')
    }

    /// Walks `doc` following the path segments and returns the value found
    /// at the end of the path, if any.
    pub fn extract<'a>(&self, doc: &'a Value) -> Option<&'a Value> {
        self.segments().try_fold(doc, |node, segment| node.get(segment))
    }
}

impl std::fmt::Display for PartitionKeyPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path)
    }
}

/// Value of the partition key for a single document.
///
/// Only non-null JSON scalars (string, number, boolean) are valid partition key values.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionKeyValue(Value);

impl PartitionKeyValue {
    pub fn try_from_value(value: Value) -> Result<Self, PartitionKeyError> {
        match value {
            Value::Null => Err(PartitionKeyError::Null),
            Value::Array(_) | Value::Object(_) => Err(PartitionKeyError::NotScalar(value.to_string())),
            scalar => Ok(Self(scalar)),
        }
    }

    /// Encoding used by the service in the partition key request header,
    /// a single element JSON array (`["Electronics"]`).
    pub fn to_header(&self) -> String {
        Value::Array(vec![self.0.clone()]).to_string()
    }

    /// Stable textual form, usable as a lookup key.
    pub fn canonical(&self) -> String {
        self.0.to_string()
    }
}

impl std::fmt::Display for PartitionKeyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Value::String(s) => write!(f, "{s}"),
            other => write!(f, "{other}"),
        }
    }
}

impl From<&str> for PartitionKeyValue {
    fn from(s: &str) -> Self {
        Self(Value::String(s.to_owned()))
    }
}

impl From<String> for PartitionKeyValue {
    fn from(s: String) -> Self {
        Self(Value::String(s))
    }
}

impl From<i64> for PartitionKeyValue {
    fn from(n: i64) -> Self {
        Self(Value::from(n))
    }
}

impl From<bool> for PartitionKeyValue {
    fn from(b: bool) -> Self {
        Self(Value::Bool(b))
    }
}
