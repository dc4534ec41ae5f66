//! # Storage Module
//!
//! Where transactions live between fetches, and the contracts of the
//! collaborators they are fetched from.
//!
//! ## Contents
//!
//! - **transaction_cache**: month-partitioned, scope-isolated transaction
//!   store with loaded markers
//! - **traits**: `TransactionFetcher` and `CategoryConfigProvider`, the two
//!   consumed contracts, with their error types
//! - **memory**: in-process implementation of both contracts
//!
//! Nothing here persists across process restarts.

pub mod memory;
pub mod traits;
pub mod transaction_cache;

pub use memory::{FetchRange, InMemoryTransactionSource};
pub use traits::{CategoryConfigProvider, ConfigError, FetchError, TransactionFetcher};
pub use transaction_cache::TransactionCache;
