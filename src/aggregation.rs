// Aggregation Engine - monthly statistics, price histogram, category groups
//
// All views filter by calendar month in any year. Each public operation
// takes one snapshot of the dataset and fans its independent reads out
// concurrently before merging.

use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use tracing::debug;

use crate::dataset::{Dataset, QueryError, QueryResult};
use crate::db::Transaction;
use crate::month::MonthSelector;
use crate::price_range::PRICE_RANGES;

/// Sales summary for one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    #[serde(rename = "totalSales", serialize_with = "serialize_total")]
    pub total_sales: f64,
    #[serde(rename = "soldItems")]
    pub sold_count: u64,
    #[serde(rename = "unsoldItems")]
    pub unsold_count: u64,
}

impl Statistics {
    /// Summarize an already month-filtered set
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let total_sales = transactions.iter().fold(0.0, |sum, t| sum + t.price);
        let sold_count = transactions.iter().filter(|t| t.is_sold).count() as u64;
        let unsold_count = transactions.len() as u64 - sold_count;

        Self {
            total_sales,
            sold_count,
            unsold_count,
        }
    }

    pub fn item_count(&self) -> u64 {
        self.sold_count + self.unsold_count
    }
}

/// Whole totals go out as integers: `200`, not `200.0`
fn serialize_total<S: Serializer>(total: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;

    if total.fract() == 0.0 && total.abs() <= MAX_EXACT {
        serializer.serialize_i64(*total as i64)
    } else {
        serializer.serialize_f64(*total)
    }
}

/// One bar of the price histogram
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBucketCount {
    pub range: String,
    pub count: u64,
}

/// Category counts, ordered by category name
pub type CategoryGroups = BTreeMap<String, u64>;

/// Pie chart slice, `{"_id": category, "count": n}` on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    #[serde(rename = "_id")]
    pub category: String,
    pub count: u64,
}

pub fn category_counts(groups: &CategoryGroups) -> Vec<CategoryCount> {
    groups
        .iter()
        .map(|(category, &count)| CategoryCount {
            category: category.clone(),
            count,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct CombinedView {
    pub statistics: Statistics,
    pub histogram: Vec<PriceBucketCount>,
    pub category_groups: CategoryGroups,
}

/// Wire shape of the combined view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedPayload {
    pub statistics: Statistics,
    pub bar_chart_data: Vec<PriceBucketCount>,
    pub pie_chart_data: Vec<CategoryCount>,
}

impl From<CombinedView> for CombinedPayload {
    fn from(view: CombinedView) -> Self {
        Self {
            pie_chart_data: category_counts(&view.category_groups),
            statistics: view.statistics,
            bar_chart_data: view.histogram,
        }
    }
}

#[derive(Clone)]
pub struct AggregationEngine {
    dataset: Dataset,
}

impl AggregationEngine {
    pub fn new(dataset: Dataset) -> Self {
        Self { dataset }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub async fn compute_statistics(&self, month: MonthSelector) -> QueryResult<Statistics> {
        let _snapshot = self.dataset.snapshot().await;
        self.statistics(month).await
    }

    pub async fn compute_histogram(&self, month: MonthSelector) -> QueryResult<Vec<PriceBucketCount>> {
        let _snapshot = self.dataset.snapshot().await;
        self.histogram(month).await
    }

    pub async fn compute_category_groups(&self, month: MonthSelector) -> QueryResult<CategoryGroups> {
        let _snapshot = self.dataset.snapshot().await;
        self.category_groups(month).await
    }

    /// All three views under one snapshot; fails if any of them fails
    pub async fn compute_combined(&self, month: MonthSelector) -> QueryResult<CombinedView> {
        let _snapshot = self.dataset.snapshot().await;
        let (statistics, histogram, category_groups) = tokio::try_join!(
            self.statistics(month),
            self.histogram(month),
            self.category_groups(month),
        )?;

        Ok(CombinedView {
            statistics,
            histogram,
            category_groups,
        })
    }

    // The helpers below assume the caller holds a snapshot.

    async fn statistics(&self, month: MonthSelector) -> QueryResult<Statistics> {
        let transactions = self
            .dataset
            .run(move |store| store.find_by_month(month))
            .await?;
        let statistics = Statistics::from_transactions(&transactions);
        debug!(%month, items = statistics.item_count(), "Statistics computed");
        Ok(statistics)
    }

    async fn histogram(&self, month: MonthSelector) -> QueryResult<Vec<PriceBucketCount>> {
        let reads = PRICE_RANGES.iter().map(|range| async move {
            let count = self
                .dataset
                .run(move |store| store.count_by_month_and_price_range(month, range))
                .await?;
            Ok::<_, QueryError>(PriceBucketCount {
                range: range.label.to_string(),
                count,
            })
        });

        // try_join_all keeps input order, so buckets stay in declared order
        try_join_all(reads).await
    }

    async fn category_groups(&self, month: MonthSelector) -> QueryResult<CategoryGroups> {
        self.dataset
            .run(move |store| store.count_by_month_grouped_by_category(month))
            .await
    }
}
