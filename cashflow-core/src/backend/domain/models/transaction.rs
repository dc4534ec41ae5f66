//! Domain model for a transaction.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use super::month_key::MonthKey;

/// Immutable transaction record. Identity and equality are keyed on `id`;
/// updates replace the whole record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    /// Category as imported
    pub category_name: String,
    /// Category after user overrides, never empty when `category_name` is set
    pub effective_category_name: String,
    pub is_income: bool,
    /// Signed amount (positive for money in, negative for money out)
    pub normalized_amount: f64,
    pub parsed_date: Option<NaiveDate>,
    /// Explicit flow-month override
    pub flow_month: Option<MonthKey>,
    pub excluded_from_flow: bool,
    pub business_name: Option<String>,
}

impl Transaction {
    pub fn new(
        id: impl Into<String>,
        category_name: impl Into<String>,
        normalized_amount: f64,
        parsed_date: Option<NaiveDate>,
    ) -> Self {
        let category_name = category_name.into();
        Self {
            id: id.into(),
            effective_category_name: category_name.clone(),
            category_name,
            is_income: false,
            normalized_amount,
            parsed_date,
            flow_month: None,
            excluded_from_flow: false,
            business_name: None,
        }
    }

    pub fn income(mut self) -> Self {
        self.is_income = true;
        self
    }

    pub fn with_flow_month(mut self, flow_month: MonthKey) -> Self {
        self.flow_month = Some(flow_month);
        self
    }

    pub fn with_effective_category(mut self, category: impl Into<String>) -> Self {
        let category = category.into();
        if !category.trim().is_empty() {
            self.effective_category_name = category;
        }
        self
    }

    pub fn excluded_from_flow(mut self) -> Self {
        self.excluded_from_flow = true;
        self
    }

    /// Month this transaction is attributed to: the flow-month override, else
    /// the month of its payment date. `None` when neither is known.
    pub fn flow_month_key(&self) -> Option<MonthKey> {
        self.flow_month
            .or_else(|| self.parsed_date.map(MonthKey::from_date))
    }

    /// Ascending by date with undated transactions last, then by id
    pub fn chronological(a: &Transaction, b: &Transaction) -> Ordering {
        match (a.parsed_date, b.parsed_date) {
            (Some(left), Some(right)) => left.cmp(&right),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
        .then_with(|| a.id.cmp(&b.id))
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Transaction {}

impl Hash for Transaction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
