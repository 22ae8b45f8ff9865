use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ApiError, AppState};
use crate::aggregation::{
    category_counts, CategoryCount, CombinedPayload, PriceBucketCount, Statistics,
};
use crate::db::{ListQuery, Transaction};
use crate::import::import_seed;
use crate::month::MonthSelector;

/// `?search=&page=&perPage=`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ListParams {
    pub fn into_query(self) -> Result<ListQuery, ApiError> {
        let page = self.page.unwrap_or(1);
        let per_page = self.per_page.unwrap_or(ListQuery::DEFAULT_PER_PAGE);

        if page == 0 {
            return Err(ApiError::BadRequest("page must be at least 1".to_string()));
        }
        if per_page == 0 {
            return Err(ApiError::BadRequest("perPage must be at least 1".to_string()));
        }

        Ok(ListQuery {
            search: self.search,
            page,
            per_page: per_page.min(ListQuery::MAX_PER_PAGE),
        })
    }
}

/// `?month=`
#[derive(Debug, Default, Deserialize)]
pub struct MonthParams {
    pub month: Option<String>,
}

impl MonthParams {
    pub fn selector(&self) -> Result<MonthSelector, ApiError> {
        Ok(self.month.as_deref().unwrap_or_default().parse::<MonthSelector>()?)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub transactions: u64,
}

/// GET /api/health
pub(super) async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, ApiError> {
    let transactions = state
        .dataset()
        .count()
        .await
        .map_err(ApiError::internal("Store unavailable"))?;

    Ok(Json(HealthResponse {
        status: "OK".to_string(),
        transactions,
    }))
}

/// GET /api/transactions/init - Import the seed dataset
pub(super) async fn initialize_database(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let inserted = import_seed(state.dataset(), &state.seed, state.seed_timeout)
        .await
        .map_err(ApiError::internal("Error initializing database"))?;

    info!(inserted, "Database initialized");
    Ok("Database initialized successfully")
}

/// GET /api/transactions - Search and paginate
pub(super) async fn list_transactions(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    let query = params.into_query()?;
    let transactions = state
        .dataset()
        .list(query)
        .await
        .map_err(ApiError::internal("Error fetching transactions"))?;

    Ok(Json(transactions))
}

/// GET /api/transactions/statistics?month=
pub(super) async fn get_statistics(
    State(state): State<AppState>,
    Query(params): Query<MonthParams>,
) -> Result<Json<Statistics>, ApiError> {
    let month = params.selector()?;
    let statistics = state
        .engine
        .compute_statistics(month)
        .await
        .map_err(ApiError::internal("Error fetching statistics"))?;

    Ok(Json(statistics))
}

/// GET /api/transactions/barchart?month=
pub(super) async fn get_bar_chart(
    State(state): State<AppState>,
    Query(params): Query<MonthParams>,
) -> Result<Json<Vec<PriceBucketCount>>, ApiError> {
    let month = params.selector()?;
    let histogram = state
        .engine
        .compute_histogram(month)
        .await
        .map_err(ApiError::internal("Error fetching bar chart data"))?;

    Ok(Json(histogram))
}

/// GET /api/transactions/piechart?month=
pub(super) async fn get_pie_chart(
    State(state): State<AppState>,
    Query(params): Query<MonthParams>,
) -> Result<Json<Vec<CategoryCount>>, ApiError> {
    let month = params.selector()?;
    let groups = state
        .engine
        .compute_category_groups(month)
        .await
        .map_err(ApiError::internal("Error fetching pie chart data"))?;

    Ok(Json(category_counts(&groups)))
}

/// GET /api/transactions/combined?month=
pub(super) async fn get_combined(
    State(state): State<AppState>,
    Query(params): Query<MonthParams>,
) -> Result<Json<CombinedPayload>, ApiError> {
    let month = params.selector()?;
    let combined = state
        .engine
        .compute_combined(month)
        .await
        .map_err(ApiError::internal("Error fetching combined data"))?;

    Ok(Json(CombinedPayload::from(combined)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_params_defaults() {
        let query = ListParams::default().into_query().unwrap();
        assert_eq!(query, ListQuery::default());
    }

    #[test]
    fn test_list_params_validation() {
        let zero_page = ListParams {
            page: Some(0),
            ..ListParams::default()
        };
        assert!(matches!(zero_page.into_query(), Err(ApiError::BadRequest(_))));

        let huge = ListParams {
            per_page: Some(10_000),
            ..ListParams::default()
        };
        assert_eq!(huge.into_query().unwrap().per_page, ListQuery::MAX_PER_PAGE);
    }

    #[test]
    fn test_month_params() {
        let missing = MonthParams::default();
        assert!(matches!(missing.selector(), Err(ApiError::BadRequest(_))));

        let march = MonthParams {
            month: Some("March".to_string()),
        };
        assert_eq!(march.selector().unwrap().number(), 3);
    }
}
