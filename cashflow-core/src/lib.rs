//! Month-partitioned transaction cache and aggregation engine behind the
//! cash flow dashboard.
//!
//! The entry point is [`DashboardService`]: select a scope, then observe the
//! published [`DashboardSnapshot`] through [`DashboardService::subscribe`].

pub mod backend;
pub mod config;

use std::sync::Once;

pub use backend::domain::models::{DashboardSnapshot, MonthKey, ScopeKey, Transaction};
pub use backend::domain::{DashboardError, DashboardService, TransactionChange};
pub use config::DashboardConfig;

static INIT_TRACING: Once = Once::new();

/// Install the global tracing subscriber. `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt().with_env_filter(filter).init();
        tracing::debug!("Tracing initialized");
    });
}
