//! # Domain Module
//!
//! Business logic of the cash flow dashboard.
//!
//! ## Module Organization
//!
//! - **models**: month keys, scopes, transactions, category orders, summaries
//!   and the published snapshot
//! - **calendar**: month arithmetic, week-of-month bucketing, focus month
//! - **target_resolver**: explicit, shared or suggested monthly targets
//! - **category_aggregator**: bucket classification and per-category summaries
//! - **group_builder**: shared-category roll-ups and display ordering
//! - **chart_series**: monthly income/expense series for the charts view
//! - **diff_applier**: incremental cache updates without refetching
//! - **dashboard_service**: the two read paths and the published state
//!
//! ## Rules
//!
//! - Income counts money in; every other bucket counts money out
//! - A category without a display order sorts after every ordered one
//! - Totals of a group always equal the sum of its members
//! - Nothing in aggregation fails; missing data yields empty results

pub mod calendar;
pub mod category_aggregator;
pub mod chart_series;
pub mod dashboard_service;
pub mod diff_applier;
pub mod group_builder;
pub mod models;
pub mod target_resolver;

pub use calendar::CalendarService;
pub use category_aggregator::{group_by, CategoryAggregator};
pub use chart_series::ChartSeriesBuilder;
pub use dashboard_service::{DashboardError, DashboardService, ReadPath};
pub use diff_applier::{DiffApplier, DiffOutcome, TransactionChange};
pub use group_builder::{GroupBuilder, GroupedSummaries};
pub use target_resolver::TargetResolver;
