use crate::{query, store};

#[derive(thiserror::Error, Debug)]
pub enum FacadeError {
    #[error("configuration error :: {0}")]
    Configuration(String),
    #[error("validation error :: {0}")]
    Validation(String),
    #[error("store error :: {0}")]
    StoreError(#[from] store::Error),
    #[error("data serialization error :: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("query error :: {0}")]
    QueryError(#[from] query::Error),
}

impl FacadeError {
    /// Status code replied by the remote service, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::StoreError(e) => e.status_code(),
            _ => None,
        }
    }
}
