//! # Transaction Cache
//!
//! In-memory store of transactions partitioned by `(scope, month)`.
//!
//! Each month partition carries a "loaded" marker that is independent of the
//! partition's contents: a month with no transactions still counts as loaded
//! once marked, and a partition that only received upserts is never treated
//! as a cache hit. Every operation is total; absent keys simply produce
//! empty results.
//!
//! A transaction id lives in at most one partition per scope. Writing an id
//! under a new month key moves it out of its previous partition.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

use crate::backend::domain::models::{MonthKey, ScopeKey, Transaction};

#[derive(Debug, Default)]
struct MonthPartition {
    transactions: HashMap<String, Transaction>,
    loaded: bool,
}

#[derive(Debug, Default)]
struct ScopeCache {
    partitions: BTreeMap<MonthKey, MonthPartition>,
    /// Partition currently holding each id
    locations: HashMap<String, MonthKey>,
}

impl ScopeCache {
    fn is_loaded(&self, month: &MonthKey) -> bool {
        self.partitions
            .get(month)
            .map(|partition| partition.loaded)
            .unwrap_or(false)
    }

    fn take(&mut self, id: &str, month: MonthKey) -> Option<Transaction> {
        let partition = self.partitions.get_mut(&month)?;
        let removed = partition.transactions.remove(id);
        if partition.transactions.is_empty() && !partition.loaded {
            self.partitions.remove(&month);
        }
        if removed.is_some() && self.locations.get(id) == Some(&month) {
            self.locations.remove(id);
        }
        removed
    }
}

#[derive(Debug, Default)]
pub struct TransactionCache {
    scopes: HashMap<ScopeKey, ScopeCache>,
}

impl TransactionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// True only when every requested month is marked loaded for the scope
    pub fn has_months(&self, scope: &ScopeKey, months: &[MonthKey]) -> bool {
        match self.scopes.get(scope) {
            Some(cache) => months.iter().all(|month| cache.is_loaded(month)),
            None => months.is_empty(),
        }
    }

    /// Requested months that are not loaded yet, sorted and deduplicated
    pub fn missing_months(&self, scope: &ScopeKey, months: &[MonthKey]) -> Vec<MonthKey> {
        let cache = self.scopes.get(scope);
        months
            .iter()
            .filter(|month| !cache.map(|c| c.is_loaded(month)).unwrap_or(false))
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Merge transactions into their month partitions, last write wins by id.
    /// Returns how many were stored; transactions without a month key are skipped.
    pub fn cache(
        &mut self,
        transactions: impl IntoIterator<Item = Transaction>,
        scope: &ScopeKey,
    ) -> usize {
        let mut stored = 0;
        let mut skipped = 0;
        for transaction in transactions {
            if self.upsert(transaction, scope).is_some() {
                stored += 1;
            } else {
                skipped += 1;
            }
        }
        debug!("Cached {} transactions for scope {} ({} without a month)", stored, scope, skipped);
        stored
    }

    /// Mark months loaded, whether or not `cache` stored anything for them
    pub fn mark(&mut self, scope: &ScopeKey, months: &[MonthKey]) {
        let cache = self.scopes.entry(scope.clone()).or_default();
        for month in months {
            cache.partitions.entry(*month).or_default().loaded = true;
        }
    }

    /// Union of the requested loaded partitions, in no particular order.
    /// Unloaded months contribute nothing.
    pub fn collect(&self, scope: &ScopeKey, months: &[MonthKey]) -> Vec<Transaction> {
        let Some(cache) = self.scopes.get(scope) else {
            return Vec::new();
        };
        let requested: BTreeSet<&MonthKey> = months.iter().collect();
        requested
            .into_iter()
            .filter_map(|month| cache.partitions.get(month))
            .filter(|partition| partition.loaded)
            .flat_map(|partition| partition.transactions.values().cloned())
            .collect()
    }

    /// Insert or replace a transaction in the partition implied by its month key.
    /// Returns that month, or `None` when the transaction has no month key.
    pub fn upsert(&mut self, transaction: Transaction, scope: &ScopeKey) -> Option<MonthKey> {
        let month = transaction.flow_month_key()?;
        let cache = self.scopes.entry(scope.clone()).or_default();

        if let Some(previous) = cache.locations.get(&transaction.id).copied() {
            if previous != month {
                debug!("Moving transaction {} from {} to {}", transaction.id, previous, month);
                cache.take(&transaction.id, previous);
            }
        }

        cache.locations.insert(transaction.id.clone(), month);
        cache
            .partitions
            .entry(month)
            .or_default()
            .transactions
            .insert(transaction.id.clone(), transaction);
        Some(month)
    }

    /// Delete by id from the partition implied by the transaction's month key.
    /// Returns whether anything was removed.
    pub fn remove(&mut self, transaction: &Transaction, scope: &ScopeKey) -> bool {
        let Some(month) = transaction.flow_month_key() else {
            return false;
        };
        self.scopes
            .get_mut(scope)
            .and_then(|cache| cache.take(&transaction.id, month))
            .is_some()
    }

    /// Drop every partition and loaded marker of the scope
    pub fn reset(&mut self, scope: &ScopeKey) {
        if self.scopes.remove(scope).is_some() {
            debug!("Reset transaction cache for scope {}", scope);
        }
    }

    pub fn loaded_months(&self, scope: &ScopeKey) -> Vec<MonthKey> {
        self.scopes
            .get(scope)
            .map(|cache| {
                cache
                    .partitions
                    .iter()
                    .filter(|(_, partition)| partition.loaded)
                    .map(|(month, _)| *month)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of cached transactions in the scope, loaded or not
    pub fn len(&self, scope: &ScopeKey) -> usize {
        self.scopes
            .get(scope)
            .map(|cache| cache.locations.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, scope: &ScopeKey) -> bool {
        self.len(scope) == 0
    }
}
