use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::DateTime;
use sales_dashboard::api::{create_app, AppState};
use sales_dashboard::{Dataset, MemoryStore, SeedSource, SqliteStore, Transaction, TransactionStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub fn tx(id: i64, price: f64, sold: bool, category: &str, date: &str) -> Transaction {
    Transaction {
        id,
        title: format!("Product {id}"),
        description: format!("Description of product {id}"),
        price,
        category: category.to_string(),
        image: None,
        is_sold: sold,
        date_of_sale: DateTime::parse_from_rfc3339(date).unwrap(),
    }
}

/// The three-record scenario: two March sales in different years, one July sale
pub fn scenario() -> Vec<Transaction> {
    vec![
        tx(1, 50.0, true, "A", "2021-03-05T10:00:00+05:30"),
        tx(2, 150.0, false, "B", "2022-03-20T10:00:00+05:30"),
        tx(3, 950.0, true, "A", "2021-07-01T10:00:00+05:30"),
    ]
}

/// Test harness around the full router
pub struct TestHarness {
    pub app: Router,
    pub dataset: Dataset,
}

impl TestHarness {
    pub fn with_store(store: Arc<dyn TransactionStore>) -> Self {
        Self::with_store_and_seed(store, SeedSource::File(PathBuf::from("/nonexistent/seed.json")))
    }

    pub fn with_store_and_seed(store: Arc<dyn TransactionStore>, seed: SeedSource) -> Self {
        let dataset = Dataset::new(store);
        let state = AppState::new(dataset.clone(), seed, Duration::from_secs(1));

        Self {
            app: create_app(state),
            dataset,
        }
    }

    pub fn memory(records: &[Transaction]) -> Self {
        Self::with_store(Arc::new(MemoryStore::with_records(records).unwrap()))
    }

    pub fn sqlite(records: &[Transaction]) -> Self {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_many(records).unwrap();
        Self::with_store(Arc::new(store))
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    pub async fn get_json(&self, uri: &str) -> serde_json::Value {
        let (status, body) = self.get(uri).await;
        assert_eq!(status, StatusCode::OK, "GET {uri}: {}", String::from_utf8_lossy(&body));
        serde_json::from_slice(&body).unwrap()
    }

    pub async fn get_text(&self, uri: &str) -> (StatusCode, String) {
        let (status, body) = self.get(uri).await;
        (status, String::from_utf8(body).unwrap())
    }
}
