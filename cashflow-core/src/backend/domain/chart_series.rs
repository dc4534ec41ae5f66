//! Monthly income/expense series for the charts view.

use std::collections::{BTreeMap, HashMap};

use shared::ChartSeries;

use crate::backend::domain::calendar::CalendarService;
use crate::backend::domain::models::{MonthKey, Transaction};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct MonthFlow {
    income: f64,
    expenses: f64,
}

pub struct ChartSeriesBuilder<'a> {
    calendar: &'a CalendarService,
}

impl<'a> ChartSeriesBuilder<'a> {
    pub fn new(calendar: &'a CalendarService) -> Self {
        Self { calendar }
    }

    /// One point per window month, oldest first. Transactions outside the
    /// window or excluded from the flow are ignored.
    pub fn build(
        &self,
        window: &[MonthKey],
        transactions: &[Transaction],
        goals: &HashMap<MonthKey, f64>,
    ) -> ChartSeries {
        let mut flows: BTreeMap<MonthKey, MonthFlow> =
            window.iter().map(|month| (*month, MonthFlow::default())).collect();

        for transaction in transactions.iter().filter(|t| !t.excluded_from_flow) {
            let Some(flow) = transaction
                .flow_month_key()
                .and_then(|month| flows.get_mut(&month))
            else {
                continue;
            };
            let amount = transaction.normalized_amount;
            if transaction.is_income && amount > 0.0 {
                flow.income += amount;
            } else if !transaction.is_income && amount < 0.0 {
                flow.expenses += -amount;
            }
        }

        let mut series = ChartSeries::default();
        let mut cumulative = 0.0;
        for (month, flow) in flows {
            let net = flow.income - flow.expenses;
            cumulative += net;
            series.month_keys.push(month.to_string());
            series.monthly_labels.push(self.calendar.short_label(month));
            series.income_series.push(flow.income);
            series.expenses_series.push(flow.expenses);
            series.net_series.push(net);
            series.cumulative_series.push(cumulative);
            series.goal_series.push(goals.get(&month).copied());
        }
        series
    }
}
