//! # Session Facades
//!
//! High level access to the document database, layered on top of a
//! [`crate::store::DocumentStore`] backend.
//!
//! * [`FacadeSession`] holds the connection to the remote service and
//!   provisions databases.
//! * [`FacadeDatabase`] provisions containers.
//! * [`FacadeContainer`] writes, reads and queries documents.
//! * [`FeedIterator`] walks the pages of a query.
//!
//! Database and container handles are cheap, non-owning references to remote
//! resources identified by name. No operation is retried: every remote failure
//! is returned to the caller as a [`FacadeError`].

mod facade_container;
pub use facade_container::*;

mod facade_database;
pub use facade_database::*;

mod facade_error;
pub use facade_error::*;

mod facade_session;
pub use facade_session::*;

mod feed;
pub use feed::*;

use crate::types;

/// Result of a create-if-absent operation.
pub struct Ensured<T> {
    pub handle: T,
    pub outcome: types::EnsureOutcome,
    pub request_charge: types::RequestCharge,
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use futures::TryStreamExt;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use super::*;
    use crate::{query, store, types::Item};

    const DB: &str = "test_db";
    const CONTAINER: &str = "test_container";

    fn category_path() -> types::PartitionKeyPath {
        types::PartitionKeyPath::try_new("/category").unwrap()
    }

    async fn container_on(session: &FacadeSession) -> FacadeContainer {
        session
            .ensure_database(DB)
            .await
            .unwrap()
            .handle
            .ensure_container(CONTAINER, &category_path())
            .await
            .unwrap()
            .handle
    }

    fn paged_session(page_size: usize) -> FacadeSession {
        FacadeSession::new(Arc::new(store::MemoryStore::new().with_page_size(page_size)))
    }

    #[tokio::test]
    async fn ensure_database_is_idempotent() {
        let session = FacadeSession::in_memory();

        let first = session.ensure_database(DB).await.unwrap();
        assert_eq!(first.outcome, types::EnsureOutcome::Created);
        assert_eq!(first.handle.id(), DB);

        let second = session.ensure_database(DB).await.unwrap();
        assert_eq!(second.outcome, types::EnsureOutcome::Existing);
        assert_eq!(second.handle.id(), DB);
    }

    #[tokio::test]
    async fn ensure_container_keeps_documents() {
        let session = FacadeSession::in_memory();
        let container = container_on(&session).await;

        container
            .upsert(&Item::new("item1", "Laptop", "Electronics", 50))
            .await
            .unwrap();

        // ensuring everything again must not touch the data
        let db = session.ensure_database(DB).await.unwrap().handle;
        let again = db.ensure_container(CONTAINER, &category_path()).await.unwrap();
        assert_eq!(again.outcome, types::EnsureOutcome::Existing);

        let read = again
            .handle
            .read::<Item>("item1", &"Electronics".into())
            .await
            .unwrap();
        assert!(read.is_some());
    }

    #[tokio::test]
    async fn ensure_container_with_other_partition_key_fails() {
        let session = FacadeSession::in_memory();
        let _ = container_on(&session).await;

        let db = session.database(DB);
        let other = types::PartitionKeyPath::try_new("/name").unwrap();

        let result = db.ensure_container(CONTAINER, &other).await;
        assert!(matches!(result, Err(FacadeError::Configuration(_))));
    }

    #[tokio::test]
    async fn ensure_container_requires_database() {
        let session = FacadeSession::in_memory();

        let result = session
            .database("missing")
            .ensure_container(CONTAINER, &category_path())
            .await;

        match result {
            Err(err) => assert_eq!(err.status_code(), Some(store::STATUS_NOT_FOUND)),
            Ok(_) => panic!("container creation should have failed"),
        }
    }

    #[tokio::test]
    async fn upsert_then_read() {
        let session = FacadeSession::in_memory();
        let container = container_on(&session).await;

        let items = [
            Item::new("item1", "Laptop", "Electronics", 50),
            Item::new("item1", "Dune", "Books", 3),
            Item::new("item2", "Phone", "Electronics", 12),
        ];

        for item in &items {
            let written = container.upsert(item).await.unwrap();
            assert_eq!(&written.resource, item);
            assert!(written.request_charge.value() > 0.0);
        }

        for item in &items {
            let read = container
                .read::<Item>(&item.id, &item.category.as_str().into())
                .await
                .unwrap()
                .expect("document should exist");
            assert_eq!(&read.resource, item);
        }
    }

    #[tokio::test]
    async fn upsert_replaces() {
        let session = FacadeSession::in_memory();
        let container = container_on(&session).await;

        let mut item = Item::new("item1", "Laptop", "Electronics", 50);
        container.upsert(&item).await.unwrap();

        item.quantity = 49;
        container.upsert(&item).await.unwrap();

        let read = container
            .read::<Item>("item1", &"Electronics".into())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(read.resource.quantity, 49);
    }

    #[tokio::test]
    async fn create_conflicts_on_existing_id() {
        let session = FacadeSession::in_memory();
        let container = container_on(&session).await;

        let item = Item::new("item1", "Laptop", "Electronics", 50);
        container.create(&item).await.unwrap();

        let err = container.create(&item).await.unwrap_err();
        assert_eq!(err.status_code(), Some(store::STATUS_CONFLICT));
    }

    #[tokio::test]
    async fn read_missing_is_not_an_error() {
        let session = FacadeSession::in_memory();
        let container = container_on(&session).await;

        container
            .upsert(&Item::new("item1", "Laptop", "Electronics", 50))
            .await
            .unwrap();

        let missing = container
            .read::<Item>("item2", &"Electronics".into())
            .await
            .unwrap();
        assert!(missing.is_none());

        // right id, wrong partition
        let wrong_partition = container
            .read::<Item>("item1", &"Books".into())
            .await
            .unwrap();
        assert!(wrong_partition.is_none());
    }

    #[tokio::test]
    async fn upsert_requires_partition_key() {
        #[derive(Serialize, Deserialize)]
        struct Untagged {
            id: String,
            name: String,
        }

        let session = FacadeSession::in_memory();
        let container = container_on(&session).await;

        let doc = Untagged {
            id: "x".to_owned(),
            name: "no category".to_owned(),
        };
        let result = container.upsert(&doc).await;
        assert!(matches!(result, Err(FacadeError::Validation(_))));
    }

    #[test]
    fn partition_key_extraction() {
        let container = FacadeContainer::new(
            store::ContainerLink::new(DB, CONTAINER),
            category_path(),
            Arc::new(store::MemoryStore::new()),
        );

        let pk = container
            .partition_key_of(&json!({ "id": "1", "category": "Books" }))
            .unwrap();
        assert_eq!(pk, types::PartitionKeyValue::from("Books"));

        for invalid in [
            json!({ "id": "1" }),
            json!({ "id": "1", "category": null }),
            json!({ "id": "1", "category": ["Books"] }),
            json!({ "id": "", "category": "Books" }),
            json!({ "category": "Books" }),
        ] {
            assert!(
                matches!(
                    container.partition_key_of(&invalid),
                    Err(FacadeError::Validation(_))
                ),
                "{invalid} should be rejected"
            );
        }
    }

    async fn seed(container: &FacadeContainer) -> HashSet<String> {
        let mut electronics = HashSet::new();
        for i in 0..23 {
            let category = if i % 3 == 0 { "Books" } else { "Electronics" };
            let item = Item::new(&format!("item{i}"), "thing", category, i);
            container.upsert(&item).await.unwrap();
            if category == "Electronics" {
                electronics.insert(item.id);
            }
        }
        electronics
    }

    #[tokio::test]
    async fn query_is_exact_regardless_of_paging() {
        for page_size in [1, 2, 5, 100] {
            let session = paged_session(page_size);
            let container = container_on(&session).await;
            let expected = seed(&container).await;

            let mut feed =
                container.query::<Item>(query::Filter::eq("category", "Electronics").unwrap());
            let result = feed.drain().await.unwrap();

            let ids: Vec<String> = result.documents.iter().map(|d| d.id.clone()).collect();
            let unique: HashSet<String> = ids.iter().cloned().collect();

            assert_eq!(ids.len(), unique.len(), "duplicates with page size {page_size}");
            assert_eq!(unique, expected, "wrong set with page size {page_size}");
            assert!(result.documents.iter().all(|d| d.category == "Electronics"));
            assert_eq!(result.pages, expected.len().div_ceil(page_size).max(1));
        }
    }

    #[tokio::test]
    async fn feed_accumulates_and_restarts() {
        let session = paged_session(4);
        let container = container_on(&session).await;
        let expected = seed(&container).await;

        let mut feed = container.query::<Item>(query::Filter::eq("category", "Electronics").unwrap());

        let mut count = 0;
        let mut charges = types::RequestCharge::zero();
        while feed.has_more_results() {
            let page = feed.next_page().await.unwrap().unwrap();
            count += page.documents.len();
            charges += page.request_charge;
        }
        assert_eq!(count, expected.len());
        assert_eq!(feed.total_request_charge(), charges);
        assert!(feed.next_page().await.unwrap().is_none());

        feed.restart();
        assert!(feed.has_more_results());
        assert_eq!(feed.total_request_charge(), types::RequestCharge::zero());

        let again = feed.drain().await.unwrap();
        assert_eq!(again.documents.len(), expected.len());
        assert_eq!(again.request_charge, charges);
    }

    #[tokio::test]
    async fn drain_after_partial_read() {
        let session = paged_session(2);
        let container = container_on(&session).await;
        for i in 0..4i64 {
            container
                .upsert(&Item::new(&format!("item{i}"), "thing", "Electronics", i))
                .await
                .unwrap();
        }

        let mut feed = container.query::<Item>(query::Filter::eq("category", "Electronics").unwrap());

        let first = feed.next_page().await.unwrap().unwrap();
        assert_eq!(first.documents.len(), 2);

        let rest = feed.drain().await.unwrap();
        assert_eq!(rest.documents.len(), 2);
        assert_eq!(rest.pages, 1);
        assert_eq!(
            first.request_charge + rest.request_charge,
            feed.total_request_charge()
        );

        let seen: HashSet<String> = first
            .documents
            .iter()
            .chain(&rest.documents)
            .map(|d| d.id.clone())
            .collect();
        assert_eq!(seen.len(), 4);

        // nothing left to drain
        let empty = feed.drain().await.unwrap();
        assert!(empty.documents.is_empty());
        assert_eq!(empty.pages, 0);
        assert_eq!(empty.request_charge, types::RequestCharge::zero());
    }

    #[tokio::test]
    async fn feed_as_stream() {
        let session = paged_session(3);
        let container = container_on(&session).await;
        let expected = seed(&container).await;

        let pages: Vec<types::Page<Item>> = container
            .query::<Item>(query::Filter::eq("category", "Electronics").unwrap())
            .into_pages()
            .try_collect()
            .await
            .unwrap();

        let total: usize = pages.iter().map(|p| p.documents.len()).sum();
        assert_eq!(total, expected.len());
        assert!(pages.last().unwrap().is_last());
    }

    #[tokio::test]
    async fn empty_query() {
        let session = FacadeSession::in_memory();
        let container = container_on(&session).await;

        let result = container
            .query::<Item>(query::Filter::eq("category", "Garden").unwrap())
            .drain()
            .await
            .unwrap();

        assert!(result.documents.is_empty());
        assert_eq!(result.pages, 1);
    }
}
