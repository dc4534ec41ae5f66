//! Semantic buckets a month's transactions are split into before aggregation.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Bucket {
    Income,
    Expense,
    Savings,
    /// Transactions excluded from the cash flow
    NonCashflow,
}

impl Bucket {
    pub const ALL: [Bucket; 4] = [
        Bucket::Income,
        Bucket::Expense,
        Bucket::Savings,
        Bucket::NonCashflow,
    ];

    /// Amount a transaction contributes under this bucket's sign convention:
    /// income counts money in, every other bucket counts money out.
    pub fn relevant_amount(&self, normalized_amount: f64) -> f64 {
        match self {
            Bucket::Income => normalized_amount.max(0.0),
            _ if normalized_amount < 0.0 => -normalized_amount,
            _ => 0.0,
        }
    }
}
