use super::RequestCharge;

/// Whether a create-if-absent operation found or created its resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    Created,
    Existing,
}

impl std::fmt::Display for EnsureOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Existing => write!(f, "existing"),
        }
    }
}

/// A resource returned by the service together with the cost of the call.
#[derive(Debug, Clone)]
pub struct Response<T> {
    pub resource: T,
    pub request_charge: RequestCharge,
}

impl<T> Response<T> {
    pub fn new(resource: T, request_charge: RequestCharge) -> Self {
        Self {
            resource,
            request_charge,
        }
    }
}

/// A single page of query results.
///
/// A `continuation` set to [`None`] means that the server has no more results.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub documents: Vec<T>,
    pub continuation: Option<String>,
    pub request_charge: RequestCharge,
}

impl<T> Page<T> {
    pub fn is_last(&self) -> bool {
        self.continuation.is_none()
    }
}
