//! Dashboard configuration, loadable from YAML. Every key is optional.

use serde::{Deserialize, Serialize};
use shared::TimeRange;
use std::fs;
use std::path::Path;

use crate::backend::domain::models::Bucket;

#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub default_time_range: TimeRange,
    /// Months preceding the focus month averaged into a suggested target
    pub suggestion_lookback_months: u32,
    pub buckets: BucketRules,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            default_time_range: TimeRange::SixMonths,
            suggestion_lookback_months: 3,
            buckets: BucketRules::default(),
        }
    }
}

impl DashboardConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigFileError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigFileError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }
}

/// How categories are attributed to buckets.
///
/// A category's shared-category tag is matched against the labels first;
/// the name markers are only consulted for categories without a tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketRules {
    pub income_label: String,
    pub savings_label: String,
    pub non_cashflow_label: String,
    pub income_markers: Vec<String>,
    pub savings_markers: Vec<String>,
    pub non_cashflow_markers: Vec<String>,
}

impl Default for BucketRules {
    fn default() -> Self {
        Self {
            income_label: "Income".to_string(),
            savings_label: "Savings".to_string(),
            non_cashflow_label: "Non-cashflow".to_string(),
            income_markers: vec!["Income".to_string(), "Salary".to_string(), "הכנסות".to_string()],
            savings_markers: vec!["Savings".to_string(), "Deposit".to_string(), "חיסכון".to_string()],
            non_cashflow_markers: vec!["Transfer".to_string(), "העברה".to_string()],
        }
    }
}

impl BucketRules {
    /// Bucket a shared-category tag stands for; unknown tags are expense groups
    pub fn bucket_for_tag(&self, tag: &str) -> Bucket {
        let tag = tag.trim();
        if tag == self.income_label {
            Bucket::Income
        } else if tag == self.savings_label {
            Bucket::Savings
        } else if tag == self.non_cashflow_label {
            Bucket::NonCashflow
        } else {
            Bucket::Expense
        }
    }

    /// Substring heuristic on the category name, `None` when nothing matches
    pub fn bucket_for_name(&self, name: &str) -> Option<Bucket> {
        let matches = |markers: &[String]| {
            markers
                .iter()
                .any(|marker| !marker.is_empty() && name.contains(marker.as_str()))
        };
        if matches(&self.income_markers) {
            Some(Bucket::Income)
        } else if matches(&self.savings_markers) {
            Some(Bucket::Savings)
        } else if matches(&self.non_cashflow_markers) {
            Some(Bucket::NonCashflow)
        } else {
            None
        }
    }

    /// Tag first, then name markers, defaulting to expense
    pub fn bucket_for_category(&self, name: &str, tag: Option<&str>) -> Bucket {
        match tag.filter(|tag| !tag.trim().is_empty()) {
            Some(tag) => self.bucket_for_tag(tag),
            None => self.bucket_for_name(name).unwrap_or(Bucket::Expense),
        }
    }
}
