//! # Backend Module
//!
//! All non-UI logic of the cash flow dashboard core.
//!
//! ## Architecture
//!
//! ```text
//! Presentation (subscribes to DashboardSnapshot)
//!     ↓
//! Domain (dashboard service, aggregation, grouping, targets)
//!     ↓
//! IO (collaborator DTOs ↔ domain types)
//!     ↓
//! Storage (month-partitioned cache, collaborator contracts)
//! ```
//!
//! Transport, authentication and persistence of category configuration
//! live outside this crate; they are reached through the storage traits.

pub mod domain;
pub mod io;
pub mod storage;

pub use domain::*;
pub use io::*;
pub use storage::*;
