pub mod bucket;
pub mod category_order;
pub mod month_key;
pub mod scope;
pub mod snapshot;
pub mod summary;
pub mod transaction;

pub use bucket::Bucket;
pub use category_order::{CategoryOrder, CategoryOrderBook};
pub use month_key::{MonthKey, MonthKeyParseError};
pub use scope::ScopeKey;
pub use snapshot::{BucketTotals, DashboardSnapshot};
pub use summary::{CategorySummary, DashboardItem, GroupSummary, ResolvedTarget, TargetSource};
pub use transaction::Transaction;
