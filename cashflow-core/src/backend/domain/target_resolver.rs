//! Monthly target resolution for a single category.
//!
//! Resolution order:
//! 1. the category's own explicit target
//! 2. the shared target of its group, when the category opted into it
//! 3. a suggestion: the mean of the category's relevant spend over the
//!    preceding months, counting only months with a positive sum
//!
//! Nothing is memoized here. The aggregator resolves each category once per
//! pass; callers resolving repeatedly should keep results per
//! `(category, month)`.

use std::collections::BTreeMap;

use crate::backend::domain::models::{
    Bucket, CategoryOrderBook, MonthKey, ResolvedTarget, TargetSource, Transaction,
};

pub struct TargetResolver<'a> {
    orders: &'a CategoryOrderBook,
    lookback_months: u32,
}

impl<'a> TargetResolver<'a> {
    pub fn new(orders: &'a CategoryOrderBook, lookback_months: u32) -> Self {
        Self {
            orders,
            lookback_months,
        }
    }

    pub fn resolve(
        &self,
        category: &str,
        bucket: Bucket,
        reference: MonthKey,
        history: &[Transaction],
    ) -> ResolvedTarget {
        if let Some(target) = self.orders.explicit_target(category) {
            return ResolvedTarget::new(target, TargetSource::Explicit);
        }
        if let Some(target) = self.orders.shared_target(category) {
            return ResolvedTarget::new(target, TargetSource::Shared);
        }
        match self.suggest(category, bucket, reference, history) {
            Some(target) => ResolvedTarget::new(target, TargetSource::Suggested),
            None => ResolvedTarget::none(),
        }
    }

    /// Trailing average of the category's monthly sums before `reference`
    pub fn suggest(
        &self,
        category: &str,
        bucket: Bucket,
        reference: MonthKey,
        history: &[Transaction],
    ) -> Option<f64> {
        let mut sums: BTreeMap<MonthKey, f64> = reference
            .preceding(self.lookback_months)
            .into_iter()
            .map(|month| (month, 0.0))
            .collect();

        for transaction in history
            .iter()
            .filter(|transaction| transaction.effective_category_name == category)
        {
            let Some(month) = transaction.flow_month_key() else {
                continue;
            };
            if let Some(sum) = sums.get_mut(&month) {
                *sum += bucket.relevant_amount(transaction.normalized_amount);
            }
        }

        let counted: Vec<f64> = sums.into_values().filter(|sum| *sum > 0.0).collect();
        if counted.is_empty() {
            None
        } else {
            Some(counted.iter().sum::<f64>() / counted.len() as f64)
        }
    }
}
