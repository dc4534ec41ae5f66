//! Immutable state published to the presentation layer.
use serde::{Deserialize, Serialize};
use shared::{ChartSeries, PathStatus, TimeRange};

use super::month_key::MonthKey;
use super::scope::ScopeKey;
use super::summary::DashboardItem;
use super::transaction::Transaction;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketTotals {
    pub income: f64,
    pub expenses: f64,
    pub savings: f64,
    pub non_cashflow: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub scope: Option<ScopeKey>,
    pub focus_month: Option<MonthKey>,
    pub time_range: TimeRange,
    /// Groups and standalone categories for the focus month, ordered for display
    pub ordered_items: Vec<DashboardItem>,
    pub bucket_totals: BucketTotals,
    pub charts: ChartSeries,
    /// Union of the cards and charts month sets, ascending by date
    pub combined_transactions: Vec<Transaction>,
    pub cards_status: PathStatus,
    pub charts_status: PathStatus,
}

impl DashboardSnapshot {
    /// Blank state shown right after a scope switch
    pub fn cleared(scope: ScopeKey, focus_month: MonthKey, time_range: TimeRange) -> Self {
        Self {
            scope: Some(scope),
            focus_month: Some(focus_month),
            time_range,
            ..Self::default()
        }
    }
}
