//! # In-Memory Collaborator
//!
//! `InMemoryTransactionSource` implements both collaborator traits over
//! plain in-process data. It backs the demo binary and the test suites, and
//! exposes switches the network-backed collaborators would exhibit on their
//! own: failing endpoints, slow fetches, and fetches held open until
//! released.

use async_trait::async_trait;
use chrono::NaiveDate;
use shared::{CategoryOrderEntry, EmptyCategoryEntry, MonthlyGoalEntry, TransactionRecord};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Semaphore;
use tracing::debug;

use crate::backend::domain::models::{MonthKey, ScopeKey};
use crate::backend::io::TransactionMapper;
use crate::backend::storage::traits::{
    CategoryConfigProvider, ConfigError, FetchError, TransactionFetcher,
};

/// A fetch request as seen by the source
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRange {
    pub scope: ScopeKey,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Default)]
pub struct InMemoryTransactionSource {
    records: Mutex<HashMap<ScopeKey, Vec<TransactionRecord>>>,
    category_orders: Mutex<Vec<CategoryOrderEntry>>,
    empty_categories: Mutex<Vec<EmptyCategoryEntry>>,
    monthly_goals: Mutex<Vec<MonthlyGoalEntry>>,
    fetch_calls: AtomicUsize,
    fetch_ranges: Mutex<Vec<FetchRange>>,
    fetch_failure: Mutex<Option<FetchError>>,
    config_failure: AtomicBool,
    yield_on_fetch: AtomicBool,
    held_scopes: Mutex<HashMap<ScopeKey, Arc<Semaphore>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl InMemoryTransactionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(self, scope: ScopeKey, records: Vec<TransactionRecord>) -> Self {
        self.insert_records(&scope, records);
        self
    }

    pub fn with_category_orders(self, orders: Vec<CategoryOrderEntry>) -> Self {
        self.set_category_orders(orders);
        self
    }

    pub fn with_empty_categories(self, categories: Vec<EmptyCategoryEntry>) -> Self {
        *lock(&self.empty_categories) = categories;
        self
    }

    pub fn with_monthly_goals(self, goals: Vec<MonthlyGoalEntry>) -> Self {
        *lock(&self.monthly_goals) = goals;
        self
    }

    /// Add records to the scope, replacing any with the same id
    pub fn insert_records(&self, scope: &ScopeKey, records: Vec<TransactionRecord>) {
        let mut all = lock(&self.records);
        let stored = all.entry(scope.clone()).or_default();
        for record in records {
            stored.retain(|existing| existing.id != record.id);
            stored.push(record);
        }
    }

    pub fn set_category_orders(&self, orders: Vec<CategoryOrderEntry>) {
        *lock(&self.category_orders) = orders;
    }

    /// Make every following fetch fail with `error`, or succeed again with `None`
    pub fn fail_fetches(&self, error: Option<FetchError>) {
        *lock(&self.fetch_failure) = error;
    }

    /// Make every config endpoint fail until switched back
    pub fn fail_config(&self, failing: bool) {
        self.config_failure.store(failing, Ordering::SeqCst);
    }

    /// Yield to the scheduler before answering a fetch
    pub fn yield_on_fetch(&self, enabled: bool) {
        self.yield_on_fetch.store(enabled, Ordering::SeqCst);
    }

    /// Hold fetches for the scope open until `release_fetches` is called
    pub fn hold_fetches(&self, scope: &ScopeKey) {
        lock(&self.held_scopes).insert(scope.clone(), Arc::new(Semaphore::new(0)));
    }

    pub fn release_fetches(&self, scope: &ScopeKey) {
        if let Some(gate) = lock(&self.held_scopes).remove(scope) {
            gate.add_permits(Semaphore::MAX_PERMITS);
        }
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_ranges(&self) -> Vec<FetchRange> {
        lock(&self.fetch_ranges).clone()
    }

    fn in_range(record: &TransactionRecord, start: NaiveDate, end: NaiveDate) -> bool {
        let paid_in_range = record
            .payment_date
            .as_deref()
            .and_then(TransactionMapper::parse_payment_date)
            .map(|date| start <= date && date <= end)
            .unwrap_or(false);
        let attributed_in_range = record
            .flow_month
            .as_deref()
            .and_then(|value| value.parse::<MonthKey>().ok())
            .map(|month| MonthKey::from_date(start) <= month && month <= MonthKey::from_date(end))
            .unwrap_or(false);
        paid_in_range || attributed_in_range
    }

    fn check_config(&self) -> Result<(), ConfigError> {
        if self.config_failure.load(Ordering::SeqCst) {
            return Err(ConfigError::Unavailable("config endpoint is down".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TransactionFetcher for InMemoryTransactionSource {
    async fn fetch(
        &self,
        scope: &ScopeKey,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TransactionRecord>, FetchError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.fetch_ranges).push(FetchRange {
            scope: scope.clone(),
            start,
            end,
        });
        debug!("In-memory fetch for scope {} from {} to {}", scope, start, end);

        if self.yield_on_fetch.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        let gate = lock(&self.held_scopes).get(scope).cloned();
        if let Some(gate) = gate {
            // a closed semaphore also lets the fetch through
            let _ = gate.acquire().await;
        }

        if let Some(error) = lock(&self.fetch_failure).clone() {
            return Err(error);
        }

        let records = lock(&self.records)
            .get(scope)
            .map(|records| {
                records
                    .iter()
                    .filter(|record| Self::in_range(record, start, end))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(records)
    }
}

#[async_trait]
impl CategoryConfigProvider for InMemoryTransactionSource {
    async fn get_category_orders(&self) -> Result<Vec<CategoryOrderEntry>, ConfigError> {
        self.check_config()?;
        Ok(lock(&self.category_orders).clone())
    }

    async fn get_empty_categories(
        &self,
        _scope: &ScopeKey,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Vec<EmptyCategoryEntry>, ConfigError> {
        self.check_config()?;
        Ok(lock(&self.empty_categories).clone())
    }

    async fn get_monthly_goals(
        &self,
        _scope: &ScopeKey,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MonthlyGoalEntry>, ConfigError> {
        self.check_config()?;
        let (first, last) = (MonthKey::from_date(start), MonthKey::from_date(end));
        Ok(lock(&self.monthly_goals)
            .iter()
            .filter(|goal| match goal.month_key.parse::<MonthKey>() {
                Ok(month) => first <= month && month <= last,
                // malformed keys are passed through for the caller to reject
                Err(_) => true,
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> ScopeKey {
        ScopeKey::new("cf-1", "bank")
    }

    fn record(id: &str, date: &str, flow_month: Option<&str>) -> TransactionRecord {
        TransactionRecord {
            id: id.to_string(),
            category_name: "Food".to_string(),
            effective_category_name: None,
            is_income: false,
            normalized_amount: -10.0,
            payment_date: Some(date.to_string()),
            flow_month: flow_month.map(str::to_string),
            excluded_from_flow: false,
            business_name: None,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_filters_by_date_and_flow_month() {
        let source = InMemoryTransactionSource::new().with_records(
            scope(),
            vec![
                record("1", "2025-06-05", None),
                record("2", "2025-05-31T22:00:00Z", None),
                record("3", "2025-05-30", Some("2025-06")),
                record("4", "2025-07-01", None),
            ],
        );

        let fetched = source.fetch(&scope(), day(2025, 6, 1), day(2025, 6, 30)).await.unwrap();
        let mut ids: Vec<String> = fetched.into_iter().map(|r| r.id).collect();
        ids.sort();
        assert_eq!(ids, vec!["1".to_string(), "3".to_string()]);
        assert_eq!(source.fetch_calls(), 1);
        assert_eq!(source.fetch_ranges()[0].start, day(2025, 6, 1));

        let other = source
            .fetch(&ScopeKey::new("cf-2", "bank"), day(2025, 6, 1), day(2025, 6, 30))
            .await
            .unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_failure_switches() {
        let source = InMemoryTransactionSource::new();
        source.fail_fetches(Some(FetchError::Network("offline".to_string())));
        let result = source.fetch(&scope(), day(2025, 6, 1), day(2025, 6, 30)).await;
        assert_eq!(result, Err(FetchError::Network("offline".to_string())));

        source.fail_config(true);
        assert!(source.get_category_orders().await.is_err());
        source.fail_config(false);
        assert!(source.get_category_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_goals_are_filtered_to_the_period() {
        let source = InMemoryTransactionSource::new().with_monthly_goals(vec![
            MonthlyGoalEntry { month_key: "2025-04".to_string(), target_amount: 1.0 },
            MonthlyGoalEntry { month_key: "2025-06".to_string(), target_amount: 2.0 },
        ]);
        let goals = source
            .get_monthly_goals(&scope(), day(2025, 5, 1), day(2025, 6, 30))
            .await
            .unwrap();
        assert_eq!(goals.len(), 1);
        assert_eq!(goals[0].target_amount, 2.0);
    }

    #[test]
    fn test_insert_records_replaces_by_id() {
        let source = InMemoryTransactionSource::new();
        source.insert_records(&scope(), vec![record("1", "2025-06-05", None)]);
        let mut moved = record("1", "2025-06-09", None);
        moved.normalized_amount = -99.0;
        source.insert_records(&scope(), vec![moved]);
        let stored = lock(&source.records);
        assert_eq!(stored[&scope()].len(), 1);
        assert_eq!(stored[&scope()][0].normalized_amount, -99.0);
    }
}
