// Seed import - load the product transaction dataset and validate it
//
// The seed is a JSON array of records, fetched over HTTP or read from a
// local file. CSV exports of the same records are accepted too.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::dataset::{Dataset, QueryError};
use crate::db::Transaction;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Failed to fetch seed data from {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to decode JSON seed data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to decode CSV seed data: {0}")]
    Csv(#[from] csv::Error),
    #[error("Invalid record at index {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },
    #[error(transparent)]
    Store(#[from] QueryError),
}

/// Where the seed dataset comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedSource {
    Url(String),
    File(PathBuf),
}

impl fmt::Display for SeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeedSource::Url(url) => f.write_str(url),
            SeedSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Load and validate every record from the source
pub async fn load_seed(source: &SeedSource, timeout: Duration) -> Result<Vec<Transaction>, ImportError> {
    let records = match source {
        SeedSource::Url(url) => fetch_json(url, timeout).await?,
        SeedSource::File(path) => load_file(path)?,
    };
    validate_records(&records)?;

    info!(source = %source, records = records.len(), "Seed data loaded");
    Ok(records)
}

async fn fetch_json(url: &str, timeout: Duration) -> Result<Vec<Transaction>, ImportError> {
    let fetch_err = |source: reqwest::Error| ImportError::Fetch {
        url: url.to_string(),
        source,
    };

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(fetch_err)?;

    let body = client
        .get(url)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(fetch_err)?
        .bytes()
        .await
        .map_err(fetch_err)?;

    Ok(serde_json::from_slice(&body)?)
}

pub fn load_file(path: &Path) -> Result<Vec<Transaction>, ImportError> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    if is_csv {
        return load_csv(path);
    }

    let contents = std::fs::read(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_slice(&contents)?)
}

pub fn load_csv(csv_path: &Path) -> Result<Vec<Transaction>, ImportError> {
    let mut rdr = csv::Reader::from_path(csv_path)?;

    let mut transactions = Vec::new();
    for result in rdr.deserialize() {
        let transaction: Transaction = result?;
        transactions.push(transaction);
    }

    Ok(transactions)
}

/// Reject the batch if any record breaks the dataset invariants
pub fn validate_records(records: &[Transaction]) -> Result<(), ImportError> {
    for (index, record) in records.iter().enumerate() {
        if !record.price.is_finite() || record.price < 0.0 {
            return Err(ImportError::InvalidRecord {
                index,
                reason: format!("price must be a non-negative number, got {}", record.price),
            });
        }
        if record.id < 0 {
            return Err(ImportError::InvalidRecord {
                index,
                reason: format!("id must not be negative, got {}", record.id),
            });
        }
    }

    Ok(())
}

/// Load, validate and insert the seed. Returns the number of new records.
pub async fn import_seed(
    dataset: &Dataset,
    source: &SeedSource,
    timeout: Duration,
) -> Result<usize, ImportError> {
    let records = load_seed(source, timeout).await?;
    let inserted = dataset.import(records, &source.to_string()).await?;
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    const SEED_JSON: &str = r#"[
        {"id": 1, "title": "Backpack", "price": 109.95, "description": "Fits 15 inch laptops",
         "category": "men's clothing", "image": "https://example.com/1.jpg", "sold": false,
         "dateOfSale": "2021-11-27T20:29:54+05:30"},
        {"id": 2, "title": "Mens Casual T-Shirt", "price": 22.3, "description": "Slim-fitting style",
         "category": "men's clothing", "image": "https://example.com/2.jpg", "sold": true,
         "dateOfSale": "2021-10-27T20:29:54+05:30"}
    ]"#;

    fn temp_file(suffix: &str, contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::with_suffix(suffix).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_json_file() {
        let file = temp_file(".json", SEED_JSON);
        let records = load_file(file.path()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "Backpack");
        assert!(records[1].is_sold);
        assert_eq!(records[1].sale_month(), 10);
    }

    #[test]
    fn test_load_csv_file() {
        let csv = "id,title,description,price,category,image,sold,dateOfSale\n\
                   7,Ring,Gold ring,950,jewelery,,true,2021-07-01T10:00:00+05:30\n\
                   8,Shirt,Cotton,15.5,men's clothing,https://example.com/8.jpg,false,2022-03-20T10:00:00Z\n";
        let file = temp_file(".csv", csv);
        let records = load_file(file.path()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 7);
        assert_eq!(records[0].image, None);
        assert_eq!(records[1].price, 15.5);
        assert_eq!(records[1].sale_month(), 3);
    }

    #[test]
    fn test_validate_rejects_negative_price() {
        let mut records: Vec<Transaction> = serde_json::from_str(SEED_JSON).unwrap();
        records[1].price = -3.0;

        let err = validate_records(&records).unwrap_err();
        assert!(matches!(err, ImportError::InvalidRecord { index: 1, .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_file(Path::new("/nonexistent/seed.json")).unwrap_err();
        assert!(matches!(err, ImportError::Io { .. }));
    }

    #[tokio::test]
    async fn test_import_seed_from_file_is_idempotent() {
        let file = temp_file(".json", SEED_JSON);
        let source = SeedSource::File(file.path().to_path_buf());
        let dataset = Dataset::new(Arc::new(MemoryStore::new()));

        let first = import_seed(&dataset, &source, Duration::from_secs(1)).await.unwrap();
        let second = import_seed(&dataset, &source, Duration::from_secs(1)).await.unwrap();

        assert_eq!(first, 2);
        assert_eq!(second, 0);
        assert_eq!(dataset.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_invalid_seed_inserts_nothing() {
        let bad = SEED_JSON.replace("22.3", "-22.3");
        let file = temp_file(".json", &bad);
        let dataset = Dataset::new(Arc::new(MemoryStore::new()));

        let result = import_seed(
            &dataset,
            &SeedSource::File(file.path().to_path_buf()),
            Duration::from_secs(1),
        )
        .await;

        assert!(matches!(result, Err(ImportError::InvalidRecord { .. })));
        assert_eq!(dataset.count().await.unwrap(), 0);
    }
}
