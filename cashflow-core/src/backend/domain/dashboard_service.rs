//! # Dashboard Service
//!
//! Coordinates the two read paths of the dashboard over one shared
//! transaction cache and publishes the result as an immutable
//! `DashboardSnapshot`.
//!
//! - **Cards** cover the focus month: bucketed category summaries, rolled
//!   up into shared-category groups, plus bucket totals.
//! - **Charts** cover a window of months ending at the current month, sized
//!   by the selected `TimeRange`.
//!
//! Each path works out its own month keys, fetches only the months the
//! cache has not marked loaded, writes the results to the cache and
//! rebuilds its own slice of the snapshot. The cards path also makes sure
//! the lookback months before the focus month are loaded, since suggested
//! targets average them; they stay out of the combined month set. Missing
//! months are fetched as runs of consecutive months, so a loaded month is
//! never fetched again and never overwritten. When both paths are done the
//! combined transaction list (union of both month sets) is republished and
//! the cards slice is recomputed from the cache, without fetching.
//!
//! ## Scopes
//!
//! Selecting a different cash flow or data source resets the cache for the
//! scope being left, clears every derived value and bumps a generation
//! counter. Loads started under an older generation are dropped when they
//! come back instead of being merged.
//!
//! ## Locking
//!
//! Cache and state sit behind `std::sync::Mutex`. Locks are only taken in
//! synchronous sections (never across an `.await`), always state first, and
//! cache-then-mark happens under a single cache lock so a half-written month
//! is never observable.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use shared::{EmptyCategoryEntry, PathStatus, TimeRange};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::backend::domain::calendar::CalendarService;
use crate::backend::domain::category_aggregator::CategoryAggregator;
use crate::backend::domain::chart_series::ChartSeriesBuilder;
use crate::backend::domain::diff_applier::{DiffApplier, DiffOutcome, TransactionChange};
use crate::backend::domain::group_builder::GroupBuilder;
use crate::backend::domain::models::{
    CategoryOrderBook, DashboardSnapshot, MonthKey, ScopeKey, Transaction,
};
use crate::backend::io::{CategoryMapper, TransactionMapper};
use crate::backend::storage::{
    CategoryConfigProvider, ConfigError, FetchError, TransactionCache, TransactionFetcher,
};
use crate::config::DashboardConfig;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DashboardError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("Category configuration unavailable: {0}")]
    ConfigUnavailable(String),
    #[error("Result for scope {found} arrived after switching to {expected}")]
    ScopeMismatch { expected: String, found: String },
    #[error("No cash flow selected")]
    NoScope,
}

impl From<ConfigError> for DashboardError {
    fn from(error: ConfigError) -> Self {
        DashboardError::ConfigUnavailable(error.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPath {
    Cards,
    Charts,
}

impl std::fmt::Display for ReadPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadPath::Cards => write!(f, "cards"),
            ReadPath::Charts => write!(f, "charts"),
        }
    }
}

/// Scope and generation a load was started under
#[derive(Debug, Clone)]
struct LoadTicket {
    scope: ScopeKey,
    generation: u64,
}

#[derive(Debug, Default)]
struct DashboardState {
    scope: Option<ScopeKey>,
    generation: u64,
    time_range: TimeRange,
    orders: CategoryOrderBook,
    empty_categories: Vec<EmptyCategoryEntry>,
    monthly_goals: HashMap<MonthKey, f64>,
    /// Month the cards slice was last built for
    cards_month: Option<MonthKey>,
    /// Window the charts slice was last built for
    chart_window: Vec<MonthKey>,
}

impl DashboardState {
    fn clear_derived(&mut self) {
        self.orders = CategoryOrderBook::new();
        self.empty_categories.clear();
        self.monthly_goals.clear();
        self.cards_month = None;
        self.chart_window.clear();
    }

    fn combined_months(&self) -> Vec<MonthKey> {
        self.cards_month
            .iter()
            .chain(self.chart_window.iter())
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

pub struct DashboardService<F: TransactionFetcher, P: CategoryConfigProvider> {
    fetcher: Arc<F>,
    config_provider: Arc<P>,
    config: DashboardConfig,
    calendar: CalendarService,
    cache: Arc<Mutex<TransactionCache>>,
    state: Arc<Mutex<DashboardState>>,
    publisher: Arc<watch::Sender<DashboardSnapshot>>,
}

impl<F: TransactionFetcher, P: CategoryConfigProvider> Clone for DashboardService<F, P> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            config_provider: Arc::clone(&self.config_provider),
            config: self.config.clone(),
            calendar: self.calendar.clone(),
            cache: Arc::clone(&self.cache),
            state: Arc::clone(&self.state),
            publisher: Arc::clone(&self.publisher),
        }
    }
}

impl<F: TransactionFetcher, P: CategoryConfigProvider> DashboardService<F, P> {
    pub fn new(
        fetcher: Arc<F>,
        config_provider: Arc<P>,
        config: DashboardConfig,
        calendar: CalendarService,
    ) -> Self {
        let time_range = config.default_time_range;
        let (publisher, _) = watch::channel(DashboardSnapshot {
            focus_month: Some(calendar.focus_month()),
            time_range,
            ..DashboardSnapshot::default()
        });
        let state = DashboardState {
            time_range,
            ..DashboardState::default()
        };
        Self {
            fetcher,
            config_provider,
            config,
            calendar,
            cache: Arc::new(Mutex::new(TransactionCache::new())),
            state: Arc::new(Mutex::new(state)),
            publisher: Arc::new(publisher),
        }
    }

    /// Receiver that observes every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.publisher.subscribe()
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.publisher.borrow().clone()
    }

    pub fn calendar(&self) -> &CalendarService {
        &self.calendar
    }

    pub fn scope(&self) -> Option<ScopeKey> {
        self.lock_state().scope.clone()
    }

    pub fn time_range(&self) -> TimeRange {
        self.lock_state().time_range
    }

    /// Months currently marked loaded for the scope
    pub fn cached_months(&self, scope: &ScopeKey) -> Vec<MonthKey> {
        self.lock_cache().loaded_months(scope)
    }

    /// Switch to a cash flow / data source and load both paths.
    ///
    /// Selecting a different scope resets the cache of the scope being left
    /// and publishes a cleared snapshot before anything is fetched.
    pub async fn select_scope(&self, scope: ScopeKey) -> Result<(), DashboardError> {
        {
            let mut state = self.lock_state();
            if state.scope.as_ref() != Some(&scope) {
                if let Some(previous) = state.scope.take() {
                    info!("Leaving scope {}", previous);
                    self.lock_cache().reset(&previous);
                }
                state.scope = Some(scope.clone());
                state.generation += 1;
                state.clear_derived();
                info!("Selected scope {} (generation {})", scope, state.generation);
                self.publisher.send_replace(DashboardSnapshot::cleared(
                    scope,
                    self.calendar.focus_month(),
                    state.time_range,
                ));
            }
        }
        self.refresh().await
    }

    /// Reload category orders, then run both read paths concurrently
    pub async fn refresh(&self) -> Result<(), DashboardError> {
        let ticket = self.ticket()?;
        self.load_category_orders(&ticket).await;

        let (cards, charts) = tokio::join!(self.load_cards(&ticket), self.load_charts(&ticket));
        self.publish_consolidated(&ticket);

        Self::settle(cards)?;
        Self::settle(charts)
    }

    pub async fn previous_month(&self) -> Result<(), DashboardError> {
        let focus = self.calendar.navigate_previous_month();
        self.after_navigation(focus).await
    }

    pub async fn next_month(&self) -> Result<(), DashboardError> {
        let focus = self.calendar.navigate_next_month();
        self.after_navigation(focus).await
    }

    /// Change the chart window; only the charts path reloads
    pub async fn set_time_range(&self, range: TimeRange) -> Result<(), DashboardError> {
        self.lock_state().time_range = range;
        self.publisher.send_modify(|snapshot| snapshot.time_range = range);
        info!("Chart time range set to {}", range);

        let Some(ticket) = self.current_ticket() else {
            return Ok(());
        };
        let result = self.load_charts(&ticket).await;
        self.publish_consolidated(&ticket);
        Self::settle(result)
    }

    /// Apply transaction changes observed elsewhere and rebuild both slices
    /// from the cache. Nothing is fetched.
    pub fn apply_diff(&self, changes: &[TransactionChange]) -> Result<DiffOutcome, DashboardError> {
        let mut state = self.lock_state();
        let scope = state.scope.clone().ok_or(DashboardError::NoScope)?;
        let mut cache = self.lock_cache();

        let outcome = DiffApplier::apply(&mut cache, &scope, changes);
        info!(
            "Applied {} of {} changes to scope {}",
            outcome.applied,
            changes.len(),
            scope
        );

        if let Some(month) = state.cards_month {
            self.rebuild_cards(&mut state, &cache, &scope, month);
        }
        if !state.chart_window.is_empty() {
            let window = state.chart_window.clone();
            self.rebuild_charts(&mut state, &cache, &scope, window);
        }
        self.rebuild_combined(&state, &cache, &scope);
        Ok(outcome)
    }

    async fn after_navigation(&self, focus: MonthKey) -> Result<(), DashboardError> {
        debug!("Focus month is now {}", focus);
        self.publisher.send_modify(|snapshot| snapshot.focus_month = Some(focus));
        let Some(ticket) = self.current_ticket() else {
            return Ok(());
        };
        let result = self.load_cards(&ticket).await;
        self.publish_consolidated(&ticket);
        Self::settle(result)
    }

    async fn load_category_orders(&self, ticket: &LoadTicket) {
        match self.config_provider.get_category_orders().await {
            Ok(entries) => {
                let _ = self.with_state(ticket, |state| {
                    state
                        .orders
                        .refresh(entries.into_iter().map(CategoryMapper::to_domain));
                    debug!("Loaded {} category orders", state.orders.len());
                });
            }
            Err(e) => warn!("Keeping stale category orders: {}", DashboardError::from(e)),
        }
    }

    async fn load_cards(&self, ticket: &LoadTicket) -> Result<(), DashboardError> {
        let focus = self.calendar.focus_month();
        let empty_categories = match self
            .config_provider
            .get_empty_categories(&ticket.scope, focus.first_day(), focus.last_day())
            .await
        {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Continuing without empty categories: {}", DashboardError::from(e));
                Vec::new()
            }
        };
        self.with_state(ticket, |state| state.empty_categories = empty_categories)?;

        // suggested targets need the lookback months loaded, not just cached ones
        let history = focus.preceding(self.config.suggestion_lookback_months);
        self.load_path(ticket, ReadPath::Cards, vec![focus], &history).await
    }

    async fn load_charts(&self, ticket: &LoadTicket) -> Result<(), DashboardError> {
        let range = self.lock_state().time_range;
        let window = self.calendar.chart_window(range);
        let (Some(first), Some(last)) = (window.first().copied(), window.last().copied()) else {
            return Ok(());
        };

        let goals = match self
            .config_provider
            .get_monthly_goals(&ticket.scope, first.first_day(), last.last_day())
            .await
        {
            Ok(entries) => CategoryMapper::goals_by_month(entries),
            Err(e) => {
                warn!("Continuing without monthly goals: {}", DashboardError::from(e));
                HashMap::new()
            }
        };
        self.with_state(ticket, |state| state.monthly_goals = goals)?;

        self.load_path(ticket, ReadPath::Charts, window, &[]).await
    }

    /// Fetch what the cache is missing for `months` and `history`, then
    /// rebuild the path's slice over `months` only. A failure keeps the
    /// previous slice and records the error on the path.
    async fn load_path(
        &self,
        ticket: &LoadTicket,
        path: ReadPath,
        months: Vec<MonthKey>,
        history: &[MonthKey],
    ) -> Result<(), DashboardError> {
        self.update_status(ticket, path, |status| status.is_loading = true);

        let wanted: Vec<MonthKey> = history.iter().chain(months.iter()).copied().collect();
        match self.fetch_missing(ticket, path, &wanted).await {
            Ok(()) => {
                self.rebuild_path(ticket, path, months)?;
                self.update_status(ticket, path, |status| *status = PathStatus::default());
                Ok(())
            }
            Err(e @ DashboardError::ScopeMismatch { .. }) => Err(e),
            Err(e) => {
                error!("Failed to load {} for scope {}: {}", path, ticket.scope, e);
                let message = e.to_string();
                self.update_status(ticket, path, |status| {
                    status.is_loading = false;
                    status.error_message = Some(message);
                });
                Err(e)
            }
        }
    }

    async fn fetch_missing(
        &self,
        ticket: &LoadTicket,
        path: ReadPath,
        months: &[MonthKey],
    ) -> Result<(), DashboardError> {
        let missing = self.lock_cache().missing_months(&ticket.scope, months);
        if missing.is_empty() {
            debug!("{} cache hit for {} months", path, months.len());
            return Ok(());
        }

        for run in contiguous_runs(&missing) {
            let (Some(first), Some(last)) = (run.first().copied(), run.last().copied()) else {
                continue;
            };
            info!("{} fetching {}..{} for scope {}", path, first, last, ticket.scope);
            let records = self
                .fetcher
                .fetch(&ticket.scope, first.first_day(), last.last_day())
                .await?;
            // a record paid in the run but attributed elsewhere belongs to a
            // month that is either already loaded or fetched on its own
            let transactions: Vec<Transaction> = TransactionMapper::records_to_domain(records)?
                .into_iter()
                .filter(|transaction| {
                    transaction
                        .flow_month_key()
                        .map(|month| run.contains(&month))
                        .unwrap_or(false)
                })
                .collect();

            self.with_state(ticket, |_| {
                let mut cache = self.lock_cache();
                let stored = cache.cache(transactions, &ticket.scope);
                cache.mark(&ticket.scope, &run);
                debug!("{} stored {} transactions for {}..{}", path, stored, first, last);
            })?;
        }
        Ok(())
    }

    fn rebuild_path(
        &self,
        ticket: &LoadTicket,
        path: ReadPath,
        months: Vec<MonthKey>,
    ) -> Result<(), DashboardError> {
        let mut state = self.current_state(ticket)?;
        let cache = self.lock_cache();
        match path {
            ReadPath::Cards => {
                let Some(month) = months.first().copied() else {
                    return Ok(());
                };
                if month != self.calendar.focus_month() {
                    debug!("Focus moved past {}, not publishing its cards", month);
                    return Ok(());
                }
                self.rebuild_cards(&mut state, &cache, &ticket.scope, month);
            }
            ReadPath::Charts => {
                if months != self.calendar.chart_window(state.time_range) {
                    debug!("Time range changed during load, not publishing its charts");
                    return Ok(());
                }
                self.rebuild_charts(&mut state, &cache, &ticket.scope, months);
            }
        }
        Ok(())
    }

    fn rebuild_cards(
        &self,
        state: &mut DashboardState,
        cache: &TransactionCache,
        scope: &ScopeKey,
        month: MonthKey,
    ) {
        let lookback = self.config.suggestion_lookback_months;
        let current = cache.collect(scope, &[month]);
        let history = cache.collect(scope, &month.preceding(lookback));

        let aggregator =
            CategoryAggregator::new(&state.orders, &self.config.buckets, &self.calendar, lookback);
        let summaries =
            aggregator.aggregate_month(month, current, &history, &state.empty_categories);
        let bucket_totals = CategoryAggregator::bucket_totals(&summaries);
        let ordered_items = GroupBuilder::new(&state.orders).ordered_items(summaries);

        debug!("Cards for {}: {} items", month, ordered_items.len());
        state.cards_month = Some(month);
        self.publisher.send_modify(|snapshot| {
            snapshot.focus_month = Some(month);
            snapshot.ordered_items = ordered_items;
            snapshot.bucket_totals = bucket_totals;
        });
    }

    fn rebuild_charts(
        &self,
        state: &mut DashboardState,
        cache: &TransactionCache,
        scope: &ScopeKey,
        window: Vec<MonthKey>,
    ) {
        let transactions = cache.collect(scope, &window);
        let charts =
            ChartSeriesBuilder::new(&self.calendar).build(&window, &transactions, &state.monthly_goals);

        debug!("Charts for {} months", window.len());
        state.chart_window = window;
        self.publisher.send_modify(|snapshot| {
            snapshot.time_range = state.time_range;
            snapshot.charts = charts;
        });
    }

    /// Republish what depends on both paths once they are done: the combined
    /// transactions, and the cards slice so suggested targets see history the
    /// charts path just loaded.
    fn publish_consolidated(&self, ticket: &LoadTicket) {
        let Ok(mut state) = self.current_state(ticket) else {
            return;
        };
        let cache = self.lock_cache();
        let focus = self.calendar.focus_month();
        if state.cards_month == Some(focus) {
            self.rebuild_cards(&mut state, &cache, &ticket.scope, focus);
        }
        self.rebuild_combined(&state, &cache, &ticket.scope);
    }

    fn rebuild_combined(&self, state: &DashboardState, cache: &TransactionCache, scope: &ScopeKey) {
        let mut combined: Vec<Transaction> = cache.collect(scope, &state.combined_months());
        combined.sort_by(Transaction::chronological);
        self.publisher
            .send_modify(|snapshot| snapshot.combined_transactions = combined);
    }

    fn update_status(&self, ticket: &LoadTicket, path: ReadPath, update: impl FnOnce(&mut PathStatus)) {
        let Ok(_state) = self.current_state(ticket) else {
            return;
        };
        self.publisher.send_modify(|snapshot| match path {
            ReadPath::Cards => update(&mut snapshot.cards_status),
            ReadPath::Charts => update(&mut snapshot.charts_status),
        });
    }

    /// Drop a stale-scope result, keep every other outcome
    fn settle(result: Result<(), DashboardError>) -> Result<(), DashboardError> {
        match result {
            Err(DashboardError::ScopeMismatch { expected, found }) => {
                debug!("Discarded result for scope {} (active: {})", found, expected);
                Ok(())
            }
            other => other,
        }
    }

    fn ticket(&self) -> Result<LoadTicket, DashboardError> {
        self.current_ticket().ok_or(DashboardError::NoScope)
    }

    fn current_ticket(&self) -> Option<LoadTicket> {
        let state = self.lock_state();
        state.scope.clone().map(|scope| LoadTicket {
            scope,
            generation: state.generation,
        })
    }

    /// Lock the state, failing when the ticket's generation is no longer current
    fn current_state(&self, ticket: &LoadTicket) -> Result<MutexGuard<'_, DashboardState>, DashboardError> {
        let state = self.lock_state();
        if state.generation != ticket.generation {
            return Err(DashboardError::ScopeMismatch {
                expected: state
                    .scope
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "none".to_string()),
                found: ticket.scope.to_string(),
            });
        }
        Ok(state)
    }

    fn with_state<R>(
        &self,
        ticket: &LoadTicket,
        update: impl FnOnce(&mut DashboardState) -> R,
    ) -> Result<R, DashboardError> {
        let mut state = self.current_state(ticket)?;
        Ok(update(&mut state))
    }

    fn lock_state(&self) -> MutexGuard<'_, DashboardState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_cache(&self) -> MutexGuard<'_, TransactionCache> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Split sorted months into runs of consecutive months
fn contiguous_runs(months: &[MonthKey]) -> Vec<Vec<MonthKey>> {
    let mut runs: Vec<Vec<MonthKey>> = Vec::new();
    for month in months {
        match runs.last_mut() {
            Some(run) if run.last().map(MonthKey::next) == Some(*month) => run.push(*month),
            _ => runs.push(vec![*month]),
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::models::DashboardItem;
    use crate::backend::storage::InMemoryTransactionSource;
    use chrono::NaiveDate;
    use shared::{CategoryOrderEntry, TransactionRecord};

    type TestService = DashboardService<InMemoryTransactionSource, InMemoryTransactionSource>;

    fn s1() -> ScopeKey {
        ScopeKey::new("cf-1", "https://api.example.test")
    }

    fn s2() -> ScopeKey {
        ScopeKey::new("cf-2", "https://api.example.test")
    }

    fn month(value: &str) -> MonthKey {
        value.parse().unwrap()
    }

    fn record(id: &str, category: &str, amount: f64, date: &str) -> TransactionRecord {
        TransactionRecord {
            id: id.to_string(),
            category_name: category.to_string(),
            effective_category_name: None,
            is_income: false,
            normalized_amount: amount,
            payment_date: Some(date.to_string()),
            flow_month: None,
            excluded_from_flow: false,
            business_name: None,
        }
    }

    fn income(id: &str, category: &str, amount: f64, date: &str) -> TransactionRecord {
        TransactionRecord {
            is_income: true,
            ..record(id, category, amount, date)
        }
    }

    fn order(name: &str, display_order: i64, shared: Option<&str>) -> CategoryOrderEntry {
        CategoryOrderEntry {
            category_name: name.to_string(),
            display_order: Some(display_order),
            weekly_display: false,
            monthly_target: None,
            shared_category: shared.map(str::to_string),
            use_shared_target: false,
        }
    }

    fn june_records() -> Vec<TransactionRecord> {
        vec![
            record("1", "Food", -50.0, "2025-06-05"),
            income("2", "Salary", 200.0, "2025-06-01"),
        ]
    }

    fn create_service(source: &Arc<InMemoryTransactionSource>) -> TestService {
        create_service_with(source, DashboardConfig::default())
    }

    fn create_service_with(source: &Arc<InMemoryTransactionSource>, config: DashboardConfig) -> TestService {
        let calendar = CalendarService::starting_at(NaiveDate::from_ymd_opt(2025, 6, 15).unwrap());
        DashboardService::new(Arc::clone(source), Arc::clone(source), config, calendar)
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn item<'a>(snapshot: &'a DashboardSnapshot, title: &str) -> Option<&'a DashboardItem> {
        snapshot.ordered_items.iter().find(|item| item.title() == title)
    }

    #[tokio::test]
    async fn test_select_scope_loads_both_paths() {
        let source = Arc::new(InMemoryTransactionSource::new().with_records(s1(), june_records()));
        let service = create_service(&source);

        service.select_scope(s1()).await.unwrap();

        let snapshot = service.snapshot();
        assert_eq!(snapshot.scope, Some(s1()));
        assert_eq!(snapshot.focus_month, Some(month("2025-06")));
        assert_eq!(item(&snapshot, "Food").unwrap().total_spent(), 50.0);
        assert_eq!(item(&snapshot, "Salary").unwrap().total_spent(), 200.0);
        assert_eq!(snapshot.bucket_totals.expenses, 50.0);
        assert_eq!(snapshot.bucket_totals.income, 200.0);
        assert_eq!(snapshot.charts.month_keys.len(), 6);
        assert_eq!(snapshot.charts.income_series.last(), Some(&200.0));
        assert_eq!(snapshot.charts.expenses_series.last(), Some(&50.0));
        let ids: Vec<&str> = snapshot.combined_transactions.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1"]);
        assert_eq!(snapshot.cards_status, PathStatus::default());
        assert_eq!(snapshot.charts_status, PathStatus::default());
        assert_eq!(service.cached_months(&s1()), month("2025-06").trailing(6));
    }

    #[tokio::test]
    async fn test_cached_months_are_not_fetched_again() {
        let source = Arc::new(InMemoryTransactionSource::new().with_records(s1(), june_records()));
        let service = create_service(&source);

        service.select_scope(s1()).await.unwrap();
        let after_first_load = source.fetch_calls();
        assert!(after_first_load >= 1);

        service.refresh().await.unwrap();
        service.select_scope(s1()).await.unwrap();
        // May is part of the chart window, so it is already loaded
        service.previous_month().await.unwrap();
        assert_eq!(source.fetch_calls(), after_first_load);
        assert_eq!(service.snapshot().focus_month, Some(month("2025-05")));
    }

    #[tokio::test]
    async fn test_navigation_only_reloads_cards() {
        let source = Arc::new(
            InMemoryTransactionSource::new()
                .with_records(s1(), june_records())
                .with_records(s1(), vec![record("3", "Rent", -900.0, "2025-07-01")]),
        );
        let service = create_service(&source);
        service.select_scope(s1()).await.unwrap();
        let charts_before = service.snapshot().charts;
        let calls = source.fetch_calls();

        service.next_month().await.unwrap();

        assert_eq!(source.fetch_calls(), calls + 1);
        let fetched = source.fetch_ranges().pop().unwrap();
        assert_eq!(fetched.start, NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());
        assert_eq!(fetched.end, NaiveDate::from_ymd_opt(2025, 7, 31).unwrap());

        let snapshot = service.snapshot();
        assert_eq!(snapshot.focus_month, Some(month("2025-07")));
        assert_eq!(snapshot.ordered_items.len(), 1);
        assert_eq!(item(&snapshot, "Rent").unwrap().total_spent(), 900.0);
        assert_eq!(snapshot.charts, charts_before);
        assert_eq!(snapshot.combined_transactions.len(), 3);
    }

    #[tokio::test]
    async fn test_time_range_only_reloads_charts() {
        let source = Arc::new(
            InMemoryTransactionSource::new()
                .with_records(s1(), june_records())
                .with_records(s1(), vec![record("3", "Fuel", -70.0, "2024-09-14")]),
        );
        let service = create_service(&source);
        service.select_scope(s1()).await.unwrap();
        let items_before = service.snapshot().ordered_items;
        let calls = source.fetch_calls();

        service.set_time_range(TimeRange::TwelveMonths).await.unwrap();

        assert_eq!(source.fetch_calls(), calls + 1);
        let fetched = source.fetch_ranges().pop().unwrap();
        assert_eq!(fetched.start, NaiveDate::from_ymd_opt(2024, 7, 1).unwrap());
        assert_eq!(fetched.end, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());

        let snapshot = service.snapshot();
        assert_eq!(snapshot.time_range, TimeRange::TwelveMonths);
        assert_eq!(service.time_range(), TimeRange::TwelveMonths);
        assert_eq!(snapshot.charts.month_keys.len(), 12);
        assert_eq!(snapshot.charts.expenses_series[2], 70.0);
        assert_eq!(snapshot.ordered_items, items_before);
        assert_eq!(snapshot.combined_transactions.len(), 3);

        // shrinking the window is served from the cache
        service.set_time_range(TimeRange::ThreeMonths).await.unwrap();
        assert_eq!(source.fetch_calls(), calls + 1);
        assert_eq!(service.snapshot().charts.month_keys, vec!["2025-04", "2025-05", "2025-06"]);
        assert_eq!(service.snapshot().combined_transactions.len(), 2);
    }

    #[tokio::test]
    async fn test_switching_scope_resets_previous_scope() {
        let source = Arc::new(
            InMemoryTransactionSource::new()
                .with_records(s1(), june_records())
                .with_records(s2(), vec![record("9", "Rent", -900.0, "2025-06-01")]),
        );
        let service = create_service(&source);
        service.select_scope(s1()).await.unwrap();
        assert!(!service.cached_months(&s1()).is_empty());

        service.select_scope(s2()).await.unwrap();

        assert!(service.cached_months(&s1()).is_empty());
        let snapshot = service.snapshot();
        assert_eq!(snapshot.scope, Some(s2()));
        let titles: Vec<&str> = snapshot.ordered_items.iter().map(|item| item.title()).collect();
        assert_eq!(titles, vec!["Rent"]);
        assert!(snapshot.combined_transactions.iter().all(|t| t.id == "9"));
    }

    #[tokio::test]
    async fn test_scope_switch_clears_even_when_new_load_fails() {
        let source = Arc::new(InMemoryTransactionSource::new().with_records(s1(), june_records()));
        let service = create_service(&source);
        service.select_scope(s1()).await.unwrap();

        source.fail_fetches(Some(FetchError::Network("offline".to_string())));
        let result = service.select_scope(s2()).await;

        assert_eq!(result, Err(DashboardError::Fetch(FetchError::Network("offline".to_string()))));
        let snapshot = service.snapshot();
        assert_eq!(snapshot.scope, Some(s2()));
        assert!(snapshot.ordered_items.is_empty());
        assert!(snapshot.combined_transactions.is_empty());
        assert!(snapshot.cards_status.error_message.is_some());
        assert!(!snapshot.cards_status.is_loading);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_stale_data() {
        let source = Arc::new(InMemoryTransactionSource::new().with_records(s1(), june_records()));
        let service = create_service(&source);
        service.select_scope(s1()).await.unwrap();

        source.fail_fetches(Some(FetchError::Decoding("unexpected payload".to_string())));
        let result = service.next_month().await;

        assert!(matches!(result, Err(DashboardError::Fetch(FetchError::Decoding(_)))));
        let snapshot = service.snapshot();
        assert_eq!(
            snapshot.cards_status.error_message.as_deref(),
            Some("Decoding error: unexpected payload")
        );
        assert!(!snapshot.cards_status.is_loading);
        assert!(item(&snapshot, "Food").is_some());
        assert_eq!(snapshot.charts_status, PathStatus::default());
        assert!(!service.cached_months(&s1()).contains(&month("2025-07")));

        // the error clears once the path loads again
        source.fail_fetches(None);
        service.previous_month().await.unwrap();
        service.next_month().await.unwrap();
        assert_eq!(service.snapshot().cards_status, PathStatus::default());
    }

    #[tokio::test]
    async fn test_undecodable_record_fails_the_whole_fetch() {
        let mut records = june_records();
        records.push(record("", "Food", -1.0, "2025-06-02"));
        let source = Arc::new(InMemoryTransactionSource::new().with_records(s1(), records));
        let service = create_service(&source);

        let result = service.select_scope(s1()).await;

        assert!(matches!(result, Err(DashboardError::Fetch(FetchError::Decoding(_)))));
        assert!(service.cached_months(&s1()).is_empty());
        assert!(service.snapshot().ordered_items.is_empty());
    }

    #[tokio::test]
    async fn test_config_failure_degrades_gracefully() {
        let source = Arc::new(
            InMemoryTransactionSource::new()
                .with_records(s1(), june_records())
                .with_category_orders(vec![order("Food", 1, Some("Household"))]),
        );
        let service = create_service(&source);

        source.fail_config(true);
        service.select_scope(s1()).await.unwrap();
        let snapshot = service.snapshot();
        assert!(item(&snapshot, "Food").is_some());
        assert!(item(&snapshot, "Household").is_none());

        source.fail_config(false);
        service.refresh().await.unwrap();
        assert!(item(&service.snapshot(), "Household").is_some());

        // stale orders survive a later outage
        source.fail_config(true);
        service.refresh().await.unwrap();
        assert!(item(&service.snapshot(), "Household").is_some());
    }

    #[tokio::test]
    async fn test_stale_scope_results_are_discarded() {
        let source = Arc::new(
            InMemoryTransactionSource::new()
                .with_records(s1(), june_records())
                .with_records(s2(), vec![record("9", "Rent", -900.0, "2025-06-01")]),
        );
        let service = create_service(&source);
        source.hold_fetches(&s1());

        let slow = tokio::spawn({
            let service = service.clone();
            async move { service.select_scope(s1()).await }
        });
        while source.fetch_calls() < 2 {
            tokio::task::yield_now().await;
        }

        service.select_scope(s2()).await.unwrap();
        source.release_fetches(&s1());
        slow.await.unwrap().unwrap();

        assert!(service.cached_months(&s1()).is_empty());
        let snapshot = service.snapshot();
        assert_eq!(snapshot.scope, Some(s2()));
        let titles: Vec<&str> = snapshot.ordered_items.iter().map(|item| item.title()).collect();
        assert_eq!(titles, vec!["Rent"]);
        assert!(snapshot.combined_transactions.iter().all(|t| t.id == "9"));
    }

    #[tokio::test]
    async fn test_interleaved_paths_stay_consistent() {
        let records = vec![
            record("1", "Food", -10.0, "2025-01-10"),
            record("2", "Food", -20.0, "2025-03-10"),
            record("3", "Food", -30.0, "2025-05-10"),
            record("4", "Food", -40.0, "2025-06-10"),
            income("5", "Salary", 100.0, "2025-06-01"),
        ];
        let source = Arc::new(InMemoryTransactionSource::new().with_records(s1(), records));
        source.yield_on_fetch(true);
        let service = create_service(&source);

        service.select_scope(s1()).await.unwrap();

        let snapshot = service.snapshot();
        assert_eq!(snapshot.charts.expenses_series, vec![10.0, 0.0, 20.0, 0.0, 30.0, 40.0]);
        assert_eq!(snapshot.charts.cumulative_series.last(), Some(&0.0));
        assert_eq!(snapshot.combined_transactions.len(), 5);
        assert_eq!(item(&snapshot, "Food").unwrap().total_spent(), 40.0);
        assert_eq!(service.cached_months(&s1()), month("2025-06").trailing(6));
    }

    #[tokio::test]
    async fn test_suggested_target_uses_chart_history() {
        let records = vec![
            record("1", "Food", -200.0, "2025-03-10"),
            record("2", "Food", -100.0, "2025-05-10"),
            record("3", "Food", -40.0, "2025-06-10"),
        ];
        let source = Arc::new(InMemoryTransactionSource::new().with_records(s1(), records));
        let service = create_service(&source);

        service.select_scope(s1()).await.unwrap();

        let snapshot = service.snapshot();
        let Some(DashboardItem::Category(food)) = item(&snapshot, "Food") else {
            panic!("Food should be a standalone category");
        };
        assert_eq!(food.target, Some(150.0));
        assert!(food.is_target_suggested);
    }

    #[tokio::test]
    async fn test_apply_diff_rebuilds_without_fetching() {
        let source = Arc::new(InMemoryTransactionSource::new().with_records(s1(), june_records()));
        let service = create_service(&source);
        service.select_scope(s1()).await.unwrap();
        let calls = source.fetch_calls();

        let food = Transaction::new("1", "Food", -50.0, NaiveDate::from_ymd_opt(2025, 6, 5));
        let outcome = service
            .apply_diff(&[
                TransactionChange::Insertion(Transaction::new(
                    "7",
                    "Food",
                    -25.0,
                    NaiveDate::from_ymd_opt(2025, 6, 10),
                )),
                TransactionChange::Update {
                    old: food.clone(),
                    new: food.with_flow_month(month("2025-05")),
                },
            ])
            .unwrap();

        assert_eq!(outcome.applied, 2);
        assert_eq!(outcome.affected_months, BTreeSet::from([month("2025-05"), month("2025-06")]));
        assert_eq!(source.fetch_calls(), calls);

        let snapshot = service.snapshot();
        assert_eq!(item(&snapshot, "Food").unwrap().total_spent(), 25.0);
        assert_eq!(snapshot.charts.expenses_series[4], 50.0);
        assert_eq!(snapshot.charts.expenses_series[5], 25.0);
        assert_eq!(snapshot.combined_transactions.len(), 3);
    }

    #[tokio::test]
    async fn test_operations_without_scope() {
        let source = Arc::new(InMemoryTransactionSource::new());
        let service = create_service(&source);

        assert_eq!(service.apply_diff(&[]), Err(DashboardError::NoScope));
        assert_eq!(service.refresh().await, Err(DashboardError::NoScope));
        service.next_month().await.unwrap();
        assert_eq!(service.snapshot().focus_month, Some(month("2025-07")));
        assert_eq!(source.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn test_subscribers_see_published_snapshots() {
        let source = Arc::new(InMemoryTransactionSource::new().with_records(s1(), june_records()));
        let service = create_service(&source);
        let mut receiver = service.subscribe();

        service.select_scope(s1()).await.unwrap();

        assert!(receiver.has_changed().unwrap());
        let snapshot = receiver.borrow_and_update().clone();
        assert_eq!(snapshot.scope, Some(s1()));
        assert_eq!(snapshot.ordered_items.len(), 2);
    }

    #[tokio::test]
    async fn test_cards_load_lookback_months_for_cold_focus() {
        let records = vec![
            record("1", "Food", -200.0, "2024-09-10"),
            record("2", "Food", -100.0, "2024-10-10"),
            record("3", "Food", -15.0, "2024-12-03"),
        ];
        let source = Arc::new(InMemoryTransactionSource::new().with_records(s1(), records));
        let service = create_service(&source);
        service.select_scope(s1()).await.unwrap();

        service.calendar().set_focus_month(month("2024-12"));
        service.refresh().await.unwrap();

        let fetched = source.fetch_ranges().pop().unwrap();
        assert_eq!((fetched.start, fetched.end), (day(2024, 9, 1), day(2024, 12, 31)));
        let snapshot = service.snapshot();
        let Some(DashboardItem::Category(food)) = item(&snapshot, "Food") else {
            panic!("Food should be a standalone category");
        };
        assert_eq!(food.total_spent, 15.0);
        assert_eq!(food.target, Some(150.0));
        assert!(food.is_target_suggested);
        // lookback months feed targets but are not part of the combined set
        assert!(snapshot.combined_transactions.iter().all(|t| t.id != "1" && t.id != "2"));
        assert!(service.cached_months(&s1()).contains(&month("2024-09")));

        // later navigation within loaded history fetches nothing
        let calls = source.fetch_calls();
        service.previous_month().await.unwrap();
        assert_eq!(source.fetch_calls(), calls + 1);
        let fetched = source.fetch_ranges().pop().unwrap();
        assert_eq!((fetched.start, fetched.end), (day(2024, 8, 1), day(2024, 8, 31)));
    }

    #[tokio::test]
    async fn test_loaded_months_inside_a_window_are_not_fetched_again() {
        let records = vec![
            record("s", "Food", -30.0, "2024-08-10"),
            record("o", "Food", -100.0, "2024-10-05"),
            record("n", "Food", -20.0, "2024-12-03"),
        ];
        let source = Arc::new(
            InMemoryTransactionSource::new()
                .with_records(s1(), june_records())
                .with_records(s1(), records),
        );
        let config = DashboardConfig {
            suggestion_lookback_months: 1,
            ..DashboardConfig::default()
        };
        let service = create_service_with(&source, config);
        service.select_scope(s1()).await.unwrap();
        service.calendar().set_focus_month(month("2024-10"));
        service.refresh().await.unwrap();

        let october = Transaction::new("o", "Food", -100.0, NaiveDate::from_ymd_opt(2024, 10, 5));
        let edited = Transaction::new("o", "Food", -300.0, NaiveDate::from_ymd_opt(2024, 10, 5));
        service
            .apply_diff(&[TransactionChange::Update { old: october, new: edited }])
            .unwrap();
        let loaded = service.cached_months(&s1());
        let seen = source.fetch_ranges().len();

        service.set_time_range(TimeRange::TwelveMonths).await.unwrap();

        let ranges: Vec<(NaiveDate, NaiveDate)> = source.fetch_ranges()[seen..]
            .iter()
            .map(|range| (range.start, range.end))
            .collect();
        assert_eq!(
            ranges,
            vec![
                (day(2024, 7, 1), day(2024, 8, 31)),
                (day(2024, 11, 1), day(2024, 12, 31)),
            ]
        );
        for (start, end) in ranges {
            assert!(loaded
                .iter()
                .all(|month| month.last_day() < start || month.first_day() > end));
        }

        let snapshot = service.snapshot();
        assert_eq!(item(&snapshot, "Food").unwrap().total_spent(), 300.0);
        assert_eq!(
            &snapshot.charts.expenses_series[1..6],
            &[30.0, 0.0, 300.0, 0.0, 20.0]
        );
    }
}
