use serde::{Deserialize, Serialize};
use std::fmt;

/// Transaction as delivered by the transaction fetcher.
///
/// Field values are kept as raw as the backend sends them; the core maps
/// them into its own domain type (dates parsed, effective category resolved).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: String,
    /// Category assigned by the bank import
    #[serde(default)]
    pub category_name: String,
    /// Category after user overrides; empty or missing falls back to `category_name`
    #[serde(default)]
    pub effective_category_name: Option<String>,
    #[serde(default)]
    pub is_income: bool,
    /// Signed amount (positive for money in, negative for money out)
    pub normalized_amount: f64,
    /// Payment date, either "YYYY-MM-DD" or RFC 3339
    #[serde(default)]
    pub payment_date: Option<String>,
    /// Explicit flow-month override ("YYYY-MM")
    #[serde(default)]
    pub flow_month: Option<String>,
    #[serde(default)]
    pub excluded_from_flow: bool,
    #[serde(default)]
    pub business_name: Option<String>,
}

/// Per-category display and budgeting metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryOrderEntry {
    pub category_name: String,
    #[serde(default)]
    pub display_order: Option<i64>,
    #[serde(default)]
    pub weekly_display: bool,
    /// Stored as text upstream
    #[serde(default)]
    pub monthly_target: Option<String>,
    #[serde(default)]
    pub shared_category: Option<String>,
    #[serde(default)]
    pub use_shared_target: bool,
}

/// A category known to exist for a cash flow even when it has no activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmptyCategoryEntry {
    pub category_name: String,
    #[serde(default)]
    pub shared_category: Option<String>,
}

/// Savings goal configured for a single month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyGoalEntry {
    /// "YYYY-MM"
    pub month_key: String,
    pub target_amount: f64,
}

/// Chart time-range selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
    ThreeMonths,
    SixMonths,
    TwelveMonths,
}

impl TimeRange {
    /// Number of months covered by the chart window
    pub fn months(&self) -> u32 {
        match self {
            TimeRange::ThreeMonths => 3,
            TimeRange::SixMonths => 6,
            TimeRange::TwelveMonths => 12,
        }
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        TimeRange::SixMonths
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} months", self.months())
    }
}

/// Monthly chart series, all aligned to `monthly_labels`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub month_keys: Vec<String>,
    pub monthly_labels: Vec<String>,
    pub income_series: Vec<f64>,
    pub expenses_series: Vec<f64>,
    pub net_series: Vec<f64>,
    pub cumulative_series: Vec<f64>,
    /// Goal for each month, `None` when the month has no goal
    pub goal_series: Vec<Option<f64>>,
}

/// Loading/error flags for one read path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathStatus {
    pub is_loading: bool,
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range_months() {
        assert_eq!(TimeRange::ThreeMonths.months(), 3);
        assert_eq!(TimeRange::SixMonths.months(), 6);
        assert_eq!(TimeRange::TwelveMonths.months(), 12);
        assert_eq!(TimeRange::default(), TimeRange::SixMonths);
    }

    #[test]
    fn test_transaction_record_defaults() {
        let json = r#"{"id": "1", "normalized_amount": -50.0, "category_name": "Food"}"#;
        let record: TransactionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, "1");
        assert_eq!(record.category_name, "Food");
        assert!(!record.is_income);
        assert!(record.payment_date.is_none());
        assert!(record.effective_category_name.is_none());
    }

    #[test]
    fn test_time_range_serde_names() {
        let range: TimeRange = serde_json::from_str("\"twelve_months\"").unwrap();
        assert_eq!(range, TimeRange::TwelveMonths);
        assert_eq!(serde_json::to_string(&TimeRange::ThreeMonths).unwrap(), "\"three_months\"");
    }
}
