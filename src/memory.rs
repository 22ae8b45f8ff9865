use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard};

use crate::db::{ListQuery, StoreError, StoreResult, Transaction, TransactionStore};
use crate::month::MonthSelector;
use crate::price_range::PriceRange;

/// In-memory transaction store, kept ordered by id
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<i64, Transaction>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: &[Transaction]) -> StoreResult<Self> {
        let store = Self::new();
        store.insert_many(records)?;
        Ok(store)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, BTreeMap<i64, Transaction>>> {
        self.records.read().map_err(|_| StoreError::Poisoned)
    }

    fn in_month(&self, month: MonthSelector) -> StoreResult<Vec<Transaction>> {
        Ok(self
            .read()?
            .values()
            .filter(|t| month.matches(&t.date_of_sale))
            .cloned()
            .collect())
    }
}

impl TransactionStore for MemoryStore {
    fn insert_many(&self, records: &[Transaction]) -> StoreResult<usize> {
        // same constraint the SQLite schema enforces, checked before touching the map
        if let Some(bad) = records.iter().find(|t| t.price < 0.0 || t.price.is_nan()) {
            return Err(StoreError::InvalidData(format!(
                "transaction {} has negative price {}",
                bad.id, bad.price
            )));
        }

        let mut map = self.records.write().map_err(|_| StoreError::Poisoned)?;
        let mut inserted = 0;

        for record in records {
            let id = if record.id == 0 {
                map.keys().next_back().map_or(1, |last| last + 1)
            } else {
                record.id
            };

            if map.contains_key(&id) {
                continue;
            }

            let mut stored = record.clone();
            stored.id = id;
            map.insert(id, stored);
            inserted += 1;
        }

        Ok(inserted)
    }

    fn list(&self, query: &ListQuery) -> StoreResult<Vec<Transaction>> {
        let map = self.read()?;
        let skip = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let term = query.search_term();

        Ok(map
            .values()
            .filter(|t| term.map_or(true, |term| t.matches_search(term)))
            .skip(skip)
            .take(query.per_page as usize)
            .cloned()
            .collect())
    }

    fn find_by_month(&self, month: MonthSelector) -> StoreResult<Vec<Transaction>> {
        self.in_month(month)
    }

    fn count_by_month_and_price_range(
        &self,
        month: MonthSelector,
        range: &PriceRange,
    ) -> StoreResult<u64> {
        Ok(self
            .read()?
            .values()
            .filter(|t| month.matches(&t.date_of_sale) && range.contains(t.price))
            .count() as u64)
    }

    fn count_by_month_grouped_by_category(
        &self,
        month: MonthSelector,
    ) -> StoreResult<BTreeMap<String, u64>> {
        let mut groups = BTreeMap::new();
        for t in self.in_month(month)? {
            *groups.entry(t.category).or_insert(0) += 1;
        }
        Ok(groups)
    }

    fn count(&self) -> StoreResult<u64> {
        Ok(self.read()?.len() as u64)
    }
}
