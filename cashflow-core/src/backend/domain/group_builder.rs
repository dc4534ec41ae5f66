//! Rolls category summaries up into shared-category groups.
//!
//! Categories whose order entry carries a non-empty shared category are
//! merged into one `GroupSummary` per bucket and label; everything else
//! stays a standalone row. A label used in two buckets yields two groups,
//! so non-cashflow or income money never lands in an expense group. Group
//! totals are the sums of their members, so the roll-up never changes the
//! month's overall numbers.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::backend::domain::category_aggregator::compare_rank;
use crate::backend::domain::models::{
    Bucket, CategoryOrderBook, CategorySummary, DashboardItem, GroupSummary, TargetSource,
    Transaction,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedSummaries {
    pub groups: Vec<GroupSummary>,
    pub standalone: Vec<CategorySummary>,
}

impl GroupedSummaries {
    /// Groups and standalone categories in one list, by bucket, then rank,
    /// then title
    pub fn into_ordered_items(self) -> Vec<DashboardItem> {
        let mut items: Vec<DashboardItem> = self
            .groups
            .into_iter()
            .map(DashboardItem::Group)
            .chain(self.standalone.into_iter().map(DashboardItem::Category))
            .collect();
        items.sort_by(|a, b| {
            a.bucket()
                .cmp(&b.bucket())
                .then_with(|| compare_rank(a.rank(), b.rank()))
                .then_with(|| a.title().cmp(b.title()))
        });
        items
    }
}

pub struct GroupBuilder<'a> {
    orders: &'a CategoryOrderBook,
}

impl<'a> GroupBuilder<'a> {
    pub fn new(orders: &'a CategoryOrderBook) -> Self {
        Self { orders }
    }

    pub fn build(&self, summaries: Vec<CategorySummary>) -> GroupedSummaries {
        let mut members_by_group: BTreeMap<(Bucket, String), Vec<CategorySummary>> =
            BTreeMap::new();
        let mut standalone = Vec::new();

        for summary in summaries {
            match self.orders.shared_category(&summary.name) {
                Some(group) => members_by_group
                    .entry((summary.bucket, group.to_string()))
                    .or_default()
                    .push(summary),
                None => standalone.push(summary),
            }
        }

        let groups: Vec<GroupSummary> = members_by_group
            .into_iter()
            .filter(|(_, members)| !members.is_empty())
            .map(|((bucket, title), members)| Self::roll_up(title, bucket, members))
            .collect();

        debug!("Built {} groups and {} standalone categories", groups.len(), standalone.len());
        GroupedSummaries { groups, standalone }
    }

    pub fn ordered_items(&self, summaries: Vec<CategorySummary>) -> Vec<DashboardItem> {
        self.build(summaries).into_ordered_items()
    }

    /// Combine one bucket's members of a shared category.
    ///
    /// The group target is the sum of the members' own targets, with an
    /// absent target counting as zero. Members resolving to the group's
    /// shared target all report that same amount, so it is counted once
    /// rather than once per member.
    fn roll_up(title: String, bucket: Bucket, members: Vec<CategorySummary>) -> GroupSummary {
        let mut target = 0.0;
        let mut shared_target: Option<f64> = None;
        let mut total_spent = 0.0;
        let mut weekly: BTreeMap<u32, f64> = BTreeMap::new();
        let mut weeks_in_month = 0;
        let mut display_rank: Option<i64> = None;
        let mut seen: HashSet<&str> = HashSet::new();
        let mut transactions: Vec<Transaction> = Vec::new();

        for member in &members {
            match (member.target_source, member.target) {
                (Some(TargetSource::Shared), Some(amount)) => {
                    shared_target.get_or_insert(amount);
                }
                (_, amount) => target += amount.unwrap_or(0.0),
            }
            total_spent += member.total_spent;
            for (week, amount) in &member.weekly {
                *weekly.entry(*week).or_insert(0.0) += amount;
            }
            weeks_in_month = weeks_in_month.max(member.weeks_in_month);
            display_rank = match (display_rank, member.display_order) {
                (Some(current), Some(order)) => Some(current.min(order)),
                (current, order) => current.or(order),
            };
            for transaction in &member.transactions {
                if seen.insert(transaction.id.as_str()) {
                    transactions.push(transaction.clone());
                }
            }
        }
        transactions.sort_by(Transaction::chronological);

        GroupSummary {
            title,
            bucket,
            target: target + shared_target.unwrap_or(0.0),
            total_spent,
            weekly,
            weeks_in_month,
            display_rank,
            members,
            transactions,
        }
    }
}
