//! Cosmos DB (SQL API) backend speaking the REST protocol over HTTPS.

use async_trait::async_trait;
use log::{debug, trace};
use reqwest::{Method, StatusCode, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use super::{ContainerLink, DocumentStore, Error, WriteMode};
use crate::{params, query, types};

mod auth;
pub use auth::*;

const RESOURCE_DBS: &str = "dbs";
const RESOURCE_COLLS: &str = "colls";
const RESOURCE_DOCS: &str = "docs";

/// Error payload returned by the service, e.g. `{"code": "NotFound", "message": "..."}`
#[derive(Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct QueryBody {
    #[serde(rename = "Documents")]
    documents: Vec<Value>,
}

/// Description of a single REST call.
struct Call<'a> {
    method: Method,
    resource_type: &'static str,
    /// Link used to sign the request (unencoded)
    resource_link: String,
    /// Url path segments, encoded when building the url
    path: Vec<&'a str>,
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Error::BadResponse(e.to_string())
        } else {
            Error::Connectivity(e.to_string())
        }
    }
}

pub struct CosmosStore {
    http: reqwest::Client,
    endpoint: Url,
    key: MasterKey,
}

impl CosmosStore {
    pub fn try_new(endpoint: Url, master_key: &str) -> Result<Self, Error> {
        if endpoint.cannot_be_a_base() || !matches!(endpoint.scheme(), "http" | "https") {
            return Err(Error::BadEndpoint(endpoint.to_string()));
        }

        let key = MasterKey::try_new(master_key)?;

        let http = reqwest::Client::builder()
            .timeout(params::configurables().request_timeout)
            .build()?;

        Ok(Self {
            http,
            endpoint,
            key,
        })
    }

    fn url(&self, path: &[&str]) -> Result<Url, Error> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| Error::BadEndpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .extend(path);
        Ok(url)
    }

    /// Prepares a signed request, extra headers and body are added by the caller.
    fn request(&self, call: &Call) -> Result<reqwest::RequestBuilder, Error> {
        let date = http_date_now();
        let authorization = self.key.authorization(
            call.method.as_str(),
            call.resource_type,
            &call.resource_link,
            &date,
        )?;

        let url = self.url(&call.path)?;
        trace!("{} {}", call.method, url);

        Ok(self
            .http
            .request(call.method.clone(), url)
            .header(header::AUTHORIZATION, authorization)
            .header(params::header::DATE, date)
            .header(params::header::VERSION, params::API_VERSION)
            .header(params::header::ACTIVITY_ID, uuid::Uuid::new_v4().to_string())
            .header(header::ACCEPT, "application/json"))
    }

    /// Sends a request and returns the response if the service replied with a
    /// success status code, otherwise the reply is converted into an [`Error`].
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, Error> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let charge = request_charge(&response);
        let text = response.text().await.unwrap_or_default();
        let error = reply_error(status, &text);

        debug!(
            "request failed with status {} ({} RU): {}",
            status.as_u16(),
            charge,
            error
        );

        Err(error)
    }

    fn write_request(
        &self,
        link: &ContainerLink,
        document: &Value,
        partition_key: &types::PartitionKeyValue,
        mode: WriteMode,
    ) -> Result<reqwest::RequestBuilder, Error> {
        let mut path = container_path(link);
        path.push(RESOURCE_DOCS);

        let call = Call {
            method: Method::POST,
            resource_type: RESOURCE_DOCS,
            resource_link: link.to_string(),
            path,
        };

        let mut request = self
            .request(&call)?
            .header(params::header::PARTITION_KEY, partition_key.to_header())
            .json(document);

        if mode == WriteMode::Upsert {
            request = request.header(params::header::IS_UPSERT, "True");
        }

        Ok(request)
    }

    fn query_request(
        &self,
        link: &ContainerLink,
        compiled: &query::CompiledQuery,
        continuation_token: Option<&str>,
        max_item_count: usize,
    ) -> Result<reqwest::RequestBuilder, Error> {
        let mut path = container_path(link);
        path.push(RESOURCE_DOCS);

        let call = Call {
            method: Method::POST,
            resource_type: RESOURCE_DOCS,
            resource_link: link.to_string(),
            path,
        };

        // content type must be set before the body, `json` keeps an existing one
        let mut request = self
            .request(&call)?
            .header(header::CONTENT_TYPE, params::header::QUERY_CONTENT_TYPE)
            .header(params::header::IS_QUERY, "True")
            .header(params::header::ENABLE_CROSS_PARTITION, "True")
            .header(params::header::MAX_ITEM_COUNT, max_item_count.to_string())
            .json(compiled);

        if let Some(token) = continuation_token {
            request = request.header(params::header::CONTINUATION, token);
        }

        Ok(request)
    }

    async fn fetch<T>(&self, request: reqwest::RequestBuilder) -> Result<types::Response<T>, Error>
    where
        T: DeserializeOwned,
    {
        let response = self.send(request).await?;
        let charge = request_charge(&response);
        let resource = response.json::<T>().await?;
        Ok(types::Response::new(resource, charge))
    }
}

/// Human readable message of an error reply. The service usually answers
/// with `{"code": .., "message": ..}`, anything else is passed through.
fn error_message(status: StatusCode, text: &str) -> String {
    match serde_json::from_str::<ErrorBody>(text) {
        Ok(ErrorBody {
            code,
            message: Some(message),
        }) => match code {
            Some(code) => format!("{code}: {message}"),
            None => message,
        },
        _ if text.trim().is_empty() => status.canonical_reason().unwrap_or_default().to_owned(),
        _ => text.to_owned(),
    }
}

fn reply_error(status: StatusCode, text: &str) -> Error {
    Error::from_status(status.as_u16(), error_message(status, text))
}

fn request_charge(response: &reqwest::Response) -> types::RequestCharge {
    types::RequestCharge::from_header(
        response
            .headers()
            .get(params::header::REQUEST_CHARGE)
            .and_then(|v| v.to_str().ok()),
    )
}

fn continuation(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(params::header::CONTINUATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

fn container_path<'a>(link: &'a ContainerLink) -> Vec<&'a str> {
    vec![
        RESOURCE_DBS,
        link.database.as_str(),
        RESOURCE_COLLS,
        link.container.as_str(),
    ]
}

#[async_trait]
impl DocumentStore for CosmosStore {
    fn name(&self) -> &'static str {
        "cosmos"
    }

    async fn read_database(
        &self,
        id: &str,
    ) -> Result<types::Response<types::DatabaseProperties>, Error> {
        let call = Call {
            method: Method::GET,
            resource_type: RESOURCE_DBS,
            resource_link: format!("dbs/{id}"),
            path: vec![RESOURCE_DBS, id],
        };
        self.fetch(self.request(&call)?).await
    }

    async fn create_database(
        &self,
        props: &types::DatabaseProperties,
    ) -> Result<types::Response<types::DatabaseProperties>, Error> {
        let call = Call {
            method: Method::POST,
            resource_type: RESOURCE_DBS,
            resource_link: String::new(),
            path: vec![RESOURCE_DBS],
        };
        self.fetch(self.request(&call)?.json(props)).await
    }

    async fn read_container(
        &self,
        database: &str,
        id: &str,
    ) -> Result<types::Response<types::ContainerProperties>, Error> {
        let call = Call {
            method: Method::GET,
            resource_type: RESOURCE_COLLS,
            resource_link: format!("dbs/{database}/colls/{id}"),
            path: vec![RESOURCE_DBS, database, RESOURCE_COLLS, id],
        };
        self.fetch(self.request(&call)?).await
    }

    async fn create_container(
        &self,
        database: &str,
        props: &types::ContainerProperties,
    ) -> Result<types::Response<types::ContainerProperties>, Error> {
        let call = Call {
            method: Method::POST,
            resource_type: RESOURCE_COLLS,
            resource_link: format!("dbs/{database}"),
            path: vec![RESOURCE_DBS, database, RESOURCE_COLLS],
        };
        self.fetch(self.request(&call)?.json(props)).await
    }

    async fn write_document(
        &self,
        link: &ContainerLink,
        document: &Value,
        partition_key: &types::PartitionKeyValue,
        mode: WriteMode,
    ) -> Result<types::Response<Value>, Error> {
        let request = self.write_request(link, document, partition_key, mode)?;
        self.fetch(request).await
    }

    async fn read_document(
        &self,
        link: &ContainerLink,
        id: &str,
        partition_key: &types::PartitionKeyValue,
    ) -> Result<types::Response<Value>, Error> {
        let mut path = container_path(link);
        path.extend([RESOURCE_DOCS, id]);

        let call = Call {
            method: Method::GET,
            resource_type: RESOURCE_DOCS,
            resource_link: format!("{link}/docs/{id}"),
            path,
        };

        let request = self
            .request(&call)?
            .header(params::header::PARTITION_KEY, partition_key.to_header());

        self.fetch(request).await
    }

    async fn query_documents(
        &self,
        link: &ContainerLink,
        filter: &query::Filter,
        continuation_token: Option<&str>,
        max_item_count: usize,
    ) -> Result<types::Page<Value>, Error> {
        let compiled = query::ClausesCompiler::new()
            .filter(filter.clone())
            .compile()?;
        trace!("query: {}", compiled.query);

        let request = self.query_request(link, &compiled, continuation_token, max_item_count)?;
        let response = self.send(request).await?;
        let request_charge = request_charge(&response);
        let continuation = continuation(&response);
        let body = response.json::<QueryBody>().await?;

        Ok(types::Page {
            documents: body.documents,
            continuation,
            request_charge,
        })
    }
}
