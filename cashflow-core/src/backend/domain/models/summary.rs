//! Derived summaries produced by aggregation. Never persisted.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::bucket::Bucket;
use super::transaction::Transaction;

/// Where a category's monthly target came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetSource {
    Explicit,
    Shared,
    Suggested,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResolvedTarget {
    pub amount: Option<f64>,
    pub source: Option<TargetSource>,
}

impl ResolvedTarget {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(amount: f64, source: TargetSource) -> Self {
        Self {
            amount: Some(amount),
            source: Some(source),
        }
    }

    pub fn is_suggested(&self) -> bool {
        self.source == Some(TargetSource::Suggested)
    }

    /// Weekly equivalent of the monthly target
    pub fn weekly_amount(&self, weeks_in_month: u32) -> Option<f64> {
        self.amount.map(|amount| amount / weeks_in_month.max(1) as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub name: String,
    pub bucket: Bucket,
    pub display_order: Option<i64>,
    pub weekly_display: bool,
    pub target: Option<f64>,
    pub target_source: Option<TargetSource>,
    pub is_target_suggested: bool,
    pub total_spent: f64,
    /// Week of month (1-based) to partial sum
    pub weekly: BTreeMap<u32, f64>,
    pub weeks_in_month: u32,
    /// Contributing transactions, ascending by date
    pub transactions: Vec<Transaction>,
}

impl CategorySummary {
    pub fn weekly_target(&self) -> Option<f64> {
        self.resolved_target().weekly_amount(self.weeks_in_month)
    }

    pub fn resolved_target(&self) -> ResolvedTarget {
        ResolvedTarget {
            amount: self.target,
            source: self.target_source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub title: String,
    /// Bucket every member belongs to
    pub bucket: Bucket,
    pub target: f64,
    pub total_spent: f64,
    pub weekly: BTreeMap<u32, f64>,
    pub weeks_in_month: u32,
    /// Lowest display order among the members
    pub display_rank: Option<i64>,
    pub members: Vec<CategorySummary>,
    /// Every member's transactions, ascending by date
    pub transactions: Vec<Transaction>,
}

impl GroupSummary {
    pub fn weekly_target(&self) -> f64 {
        self.target / self.weeks_in_month.max(1) as f64
    }
}

/// One row of the month view: a shared-category group or a standalone
/// category, always within a single bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "summary", rename_all = "snake_case")]
pub enum DashboardItem {
    Group(GroupSummary),
    Category(CategorySummary),
}

impl DashboardItem {
    pub fn title(&self) -> &str {
        match self {
            DashboardItem::Group(group) => &group.title,
            DashboardItem::Category(category) => &category.name,
        }
    }

    pub fn bucket(&self) -> Bucket {
        match self {
            DashboardItem::Group(group) => group.bucket,
            DashboardItem::Category(category) => category.bucket,
        }
    }

    pub fn rank(&self) -> Option<i64> {
        match self {
            DashboardItem::Group(group) => group.display_rank,
            DashboardItem::Category(category) => category.display_order,
        }
    }

    pub fn total_spent(&self) -> f64 {
        match self {
            DashboardItem::Group(group) => group.total_spent,
            DashboardItem::Category(category) => category.total_spent,
        }
    }
}
