use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use cashflow_core::backend::domain::CalendarService;
use cashflow_core::backend::storage::InMemoryTransactionSource;
use cashflow_core::{DashboardConfig, DashboardService, ScopeKey, TransactionChange};
use chrono::NaiveDate;
use serde::Deserialize;
use shared::{
    CategoryOrderEntry, EmptyCategoryEntry, MonthlyGoalEntry, TimeRange, TransactionRecord,
};
use tracing::{info, warn};

/// Everything the collaborators would serve for one replay
#[derive(Debug, Deserialize)]
struct Fixture {
    scope: ScopeKey,
    /// Anchor for the calendar; the local date when absent
    today: Option<NaiveDate>,
    time_range: Option<TimeRange>,
    #[serde(default)]
    transactions: Vec<TransactionRecord>,
    #[serde(default)]
    category_orders: Vec<CategoryOrderEntry>,
    #[serde(default)]
    empty_categories: Vec<EmptyCategoryEntry>,
    #[serde(default)]
    monthly_goals: Vec<MonthlyGoalEntry>,
    /// Applied after the initial load
    #[serde(default)]
    changes: Vec<TransactionChange>,
}

fn load_fixture(path: &Path) -> Result<Fixture> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixture {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse fixture {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    cashflow_core::init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let (fixture_path, config_path) = match args.as_slice() {
        [fixture] => (fixture, None),
        [fixture, config] => (fixture, Some(config)),
        _ => bail!("usage: cashflow-dashboard <fixture.json> [config.yaml]"),
    };

    let config = match config_path {
        Some(path) => DashboardConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path))?,
        None => DashboardConfig::default(),
    };
    let fixture = load_fixture(Path::new(fixture_path))?;
    info!(
        "Replaying {} transactions for scope {}",
        fixture.transactions.len(),
        fixture.scope
    );

    let source = Arc::new(
        InMemoryTransactionSource::new()
            .with_records(fixture.scope.clone(), fixture.transactions)
            .with_category_orders(fixture.category_orders)
            .with_empty_categories(fixture.empty_categories)
            .with_monthly_goals(fixture.monthly_goals),
    );
    let calendar = match fixture.today {
        Some(today) => CalendarService::starting_at(today),
        None => CalendarService::new(),
    };
    let service = DashboardService::new(Arc::clone(&source), source, config, calendar);

    if let Some(range) = fixture.time_range {
        service.set_time_range(range).await?;
    }
    service.select_scope(fixture.scope).await?;

    if !fixture.changes.is_empty() {
        let outcome = service.apply_diff(&fixture.changes)?;
        if outcome.skipped > 0 {
            warn!("{} changes could not be applied", outcome.skipped);
        }
    }

    println!("{}", serde_json::to_string_pretty(&service.snapshot())?);
    Ok(())
}
