use std::marker::PhantomData;
use std::sync::Arc;

use futures::Stream;
use log::trace;
use serde::de::DeserializeOwned;

use super::FacadeError;
use crate::{query, store, types};

enum FeedState {
    Start,
    Continue(String),
    Done,
}

/// All the documents of a drained query.
#[derive(Debug)]
pub struct QueryResult<T> {
    pub documents: Vec<T>,
    pub request_charge: types::RequestCharge,
    pub pages: usize,
}

/// Lazy, server paginated sequence of query results.
///
/// Pages are fetched on demand with [`FeedIterator::next_page`] until
/// [`FeedIterator::has_more_results`] returns false. The iterator keeps a
/// running total of the request charge of every page fetched so far and can
/// be restarted from the first page.
pub struct FeedIterator<T> {
    store: Arc<dyn store::DocumentStore>,
    link: store::ContainerLink,
    filter: query::Filter,
    max_item_count: usize,
    state: FeedState,
    request_charge: types::RequestCharge,
    pages: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FeedIterator<T>
where
    T: DeserializeOwned,
{
    pub(super) fn new(
        store: Arc<dyn store::DocumentStore>,
        link: store::ContainerLink,
        filter: query::Filter,
        max_item_count: usize,
    ) -> Self {
        Self {
            store,
            link,
            filter,
            max_item_count,
            state: FeedState::Start,
            request_charge: types::RequestCharge::zero(),
            pages: 0,
            _marker: PhantomData,
        }
    }

    pub fn has_more_results(&self) -> bool {
        !matches!(self.state, FeedState::Done)
    }

    /// Total request charge of the pages fetched since the last (re)start
    pub fn total_request_charge(&self) -> types::RequestCharge {
        self.request_charge
    }

    /// Rewinds the iterator, the next call to [`FeedIterator::next_page`]
    /// fetches the first page again.
    pub fn restart(&mut self) {
        self.state = FeedState::Start;
        self.request_charge = types::RequestCharge::zero();
        self.pages = 0;
    }

    /// Fetches the next page, returns [`None`] once the server signaled that
    /// no more results are available.
    ///
    /// On error the iterator is left untouched, so the same page can be
    /// requested again.
    pub async fn next_page(&mut self) -> Result<Option<types::Page<T>>, FacadeError> {
        let continuation = match &self.state {
            FeedState::Done => return Ok(None),
            FeedState::Start => None,
            FeedState::Continue(token) => Some(token.as_str()),
        };

        let page = self
            .store
            .query_documents(&self.link, &self.filter, continuation, self.max_item_count)
            .await?;

        let documents = page
            .documents
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()?;

        self.pages += 1;
        self.request_charge += page.request_charge;
        self.state = match &page.continuation {
            Some(token) => FeedState::Continue(token.clone()),
            None => FeedState::Done,
        };

        trace!(
            "page #{} of `{}`: {} documents ({} RU)",
            self.pages,
            self.link,
            documents.len(),
            page.request_charge
        );

        Ok(Some(types::Page {
            documents,
            continuation: page.continuation,
            request_charge: page.request_charge,
        }))
    }

    /// Fetches every remaining page and collects their documents.
    ///
    /// Pages already returned by [`FeedIterator::next_page`] are not fetched
    /// again: the result only accounts for the pages fetched by this call.
    /// Call [`FeedIterator::restart`] first to get the whole result set.
    pub async fn drain(&mut self) -> Result<QueryResult<T>, FacadeError> {
        let mut documents = Vec::new();
        let mut request_charge = types::RequestCharge::zero();
        let mut pages = 0;

        while let Some(page) = self.next_page().await? {
            documents.extend(page.documents);
            request_charge += page.request_charge;
            pages += 1;
        }

        Ok(QueryResult {
            documents,
            request_charge,
            pages,
        })
    }

    /// Converts the iterator into a stream of pages.
    pub fn into_pages(self) -> impl Stream<Item = Result<types::Page<T>, FacadeError>> {
        futures::stream::try_unfold(self, |mut feed| async move {
            let page = feed.next_page().await?;
            Ok::<_, FacadeError>(page.map(|page| (page, feed)))
        })
    }
}
