//! Category aggregation for a single month.
//!
//! A month's transactions are split into buckets (income, expense, savings,
//! non-cashflow) and each bucket is grouped by effective category into a
//! `CategorySummary`: total under the bucket's sign convention, week-of-month
//! partial sums, resolved target, and the contributing transactions.
//! Categories known to exist but without activity are added as zero rows
//! when they belong to the bucket being aggregated and had no activity in
//! any other bucket that month.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use shared::EmptyCategoryEntry;
use tracing::debug;

use crate::backend::domain::calendar::CalendarService;
use crate::backend::domain::models::{
    Bucket, BucketTotals, CategoryOrderBook, CategorySummary, MonthKey, Transaction,
};
use crate::backend::domain::target_resolver::TargetResolver;
use crate::config::BucketRules;

/// Group items by key. Each list keeps the input order of its items.
pub fn group_by<T, K, F>(items: impl IntoIterator<Item = T>, mut key: F) -> BTreeMap<K, Vec<T>>
where
    K: Ord,
    F: FnMut(&T) -> K,
{
    let mut groups: BTreeMap<K, Vec<T>> = BTreeMap::new();
    for item in items {
        groups.entry(key(&item)).or_default().push(item);
    }
    groups
}

/// Display ordering where a missing order sorts after every present one
pub fn compare_rank(a: Option<i64>, b: Option<i64>) -> Ordering {
    match (a, b) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub struct CategoryAggregator<'a> {
    orders: &'a CategoryOrderBook,
    rules: &'a BucketRules,
    calendar: &'a CalendarService,
    lookback_months: u32,
}

impl<'a> CategoryAggregator<'a> {
    pub fn new(
        orders: &'a CategoryOrderBook,
        rules: &'a BucketRules,
        calendar: &'a CalendarService,
        lookback_months: u32,
    ) -> Self {
        Self {
            orders,
            rules,
            calendar,
            lookback_months,
        }
    }

    /// Bucket of a single transaction
    pub fn classify(&self, transaction: &Transaction) -> Bucket {
        if transaction.excluded_from_flow {
            return Bucket::NonCashflow;
        }
        if transaction.is_income {
            return Bucket::Income;
        }
        let category = &transaction.effective_category_name;
        match self
            .rules
            .bucket_for_category(category, self.orders.shared_category(category))
        {
            Bucket::Savings => Bucket::Savings,
            Bucket::NonCashflow => Bucket::NonCashflow,
            Bucket::Income | Bucket::Expense => Bucket::Expense,
        }
    }

    pub fn partition(
        &self,
        transactions: impl IntoIterator<Item = Transaction>,
    ) -> BTreeMap<Bucket, Vec<Transaction>> {
        group_by(transactions, |transaction| self.classify(transaction))
    }

    /// Whether a known-but-inactive category belongs in the bucket
    pub fn is_relevant(&self, entry: &EmptyCategoryEntry, bucket: Bucket) -> bool {
        let tag = self
            .orders
            .shared_category(&entry.category_name)
            .or(entry.shared_category.as_deref());
        self.rules.bucket_for_category(&entry.category_name, tag) == bucket
    }

    /// Summaries for every bucket of the month, each bucket sorted for display
    pub fn aggregate_month(
        &self,
        month: MonthKey,
        transactions: Vec<Transaction>,
        history: &[Transaction],
        empty_categories: &[EmptyCategoryEntry],
    ) -> Vec<CategorySummary> {
        // a category active in any bucket gets no zero row in another
        let active: HashSet<String> = transactions
            .iter()
            .map(|transaction| transaction.effective_category_name.clone())
            .collect();
        let mut by_bucket = self.partition(transactions);
        Bucket::ALL
            .iter()
            .flat_map(|bucket| {
                let transactions = by_bucket.remove(bucket).unwrap_or_default();
                self.aggregate_with_active(
                    *bucket,
                    month,
                    transactions,
                    history,
                    empty_categories,
                    &active,
                )
            })
            .collect()
    }

    /// Summaries for one bucket's transactions, sorted by display order then name
    pub fn aggregate(
        &self,
        bucket: Bucket,
        month: MonthKey,
        transactions: Vec<Transaction>,
        history: &[Transaction],
        empty_categories: &[EmptyCategoryEntry],
    ) -> Vec<CategorySummary> {
        self.aggregate_with_active(
            bucket,
            month,
            transactions,
            history,
            empty_categories,
            &HashSet::new(),
        )
    }

    /// `active` holds categories with activity elsewhere in the month; they
    /// are never synthesized as zero rows here.
    fn aggregate_with_active(
        &self,
        bucket: Bucket,
        month: MonthKey,
        transactions: Vec<Transaction>,
        history: &[Transaction],
        empty_categories: &[EmptyCategoryEntry],
        active: &HashSet<String>,
    ) -> Vec<CategorySummary> {
        let resolver = TargetResolver::new(self.orders, self.lookback_months);
        let by_category = group_by(transactions, |transaction| {
            transaction.effective_category_name.clone()
        });

        let mut seen: HashSet<String> = active.clone();
        seen.extend(by_category.keys().cloned());
        let mut summaries: Vec<CategorySummary> = by_category
            .into_iter()
            .map(|(name, transactions)| {
                self.summarize(&resolver, name, bucket, month, transactions, history)
            })
            .collect();

        for entry in empty_categories {
            if seen.contains(&entry.category_name) || !self.is_relevant(entry, bucket) {
                continue;
            }
            seen.insert(entry.category_name.clone());
            summaries.push(self.summarize(
                &resolver,
                entry.category_name.clone(),
                bucket,
                month,
                Vec::new(),
                history,
            ));
        }

        debug!("Aggregated {} categories for {:?} in {}", summaries.len(), bucket, month);
        Self::sort_summaries(&mut summaries);
        summaries
    }

    pub fn sort_summaries(summaries: &mut [CategorySummary]) {
        summaries.sort_by(|a, b| {
            compare_rank(a.display_order, b.display_order).then_with(|| a.name.cmp(&b.name))
        });
    }

    pub fn bucket_totals(summaries: &[CategorySummary]) -> BucketTotals {
        let mut totals = BucketTotals::default();
        for summary in summaries {
            match summary.bucket {
                Bucket::Income => totals.income += summary.total_spent,
                Bucket::Expense => totals.expenses += summary.total_spent,
                Bucket::Savings => totals.savings += summary.total_spent,
                Bucket::NonCashflow => totals.non_cashflow += summary.total_spent,
            }
        }
        totals
    }

    fn summarize(
        &self,
        resolver: &TargetResolver<'_>,
        name: String,
        bucket: Bucket,
        month: MonthKey,
        mut transactions: Vec<Transaction>,
        history: &[Transaction],
    ) -> CategorySummary {
        let mut total_spent = 0.0;
        let mut weekly: BTreeMap<u32, f64> = BTreeMap::new();
        for transaction in &transactions {
            let amount = bucket.relevant_amount(transaction.normalized_amount);
            total_spent += amount;
            // undated transactions, and ones paid outside the month, only count toward the total
            if let Some(date) = transaction.parsed_date.filter(|date| month.contains(*date)) {
                *weekly.entry(self.calendar.week_of_month(date)).or_insert(0.0) += amount;
            }
        }
        transactions.sort_by(Transaction::chronological);

        let target = resolver.resolve(&name, bucket, month, history);
        CategorySummary {
            display_order: self.orders.display_order(&name),
            weekly_display: self.orders.weekly_display(&name),
            target: target.amount,
            target_source: target.source,
            is_target_suggested: target.is_suggested(),
            total_spent,
            weekly,
            weeks_in_month: self.calendar.weeks_in_month(month),
            transactions,
            bucket,
            name,
        }
    }
}
