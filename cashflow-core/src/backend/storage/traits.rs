//! # Collaborator Traits
//!
//! Contracts for the external collaborators the dashboard reads through.
//! Implementations live outside the core (HTTP/Supabase transport); the core
//! only depends on these traits so any backend can be plugged in.

use async_trait::async_trait;
use chrono::NaiveDate;
use shared::{CategoryOrderEntry, EmptyCategoryEntry, MonthlyGoalEntry, TransactionRecord};

use crate::backend::domain::models::ScopeKey;

/// Failure of the primary transaction fetch. A failed call never carries a
/// partial result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Decoding error: {0}")]
    Decoding(String),
}

/// Failure of a non-critical config endpoint
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Config endpoint unavailable: {0}")]
    Unavailable(String),
}

/// Trait defining the transaction fetch contract
#[async_trait]
pub trait TransactionFetcher: Send + Sync {
    /// Fetch every transaction of the scope paid between `start` and `end`
    /// (inclusive), plus every transaction whose flow-month override falls
    /// in a month of that period.
    ///
    /// The cache files a transaction under its flow month and only keeps
    /// what a fetch returns for the months it requested, so a record
    /// attributed to a month must come back when that month is fetched,
    /// whatever its payment date.
    async fn fetch(
        &self,
        scope: &ScopeKey,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TransactionRecord>, FetchError>;
}

/// Trait defining the category configuration contract.
/// Each endpoint may fail independently.
#[async_trait]
pub trait CategoryConfigProvider: Send + Sync {
    async fn get_category_orders(&self) -> Result<Vec<CategoryOrderEntry>, ConfigError>;

    /// Categories known to exist for the scope in the period, with or without activity
    async fn get_empty_categories(
        &self,
        scope: &ScopeKey,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<EmptyCategoryEntry>, ConfigError>;

    async fn get_monthly_goals(
        &self,
        scope: &ScopeKey,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MonthlyGoalEntry>, ConfigError>;
}
