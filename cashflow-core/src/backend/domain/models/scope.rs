//! Domain model for a cache isolation scope.
use serde::{Deserialize, Serialize};
use std::fmt;

/// One cash-flow account read through one backing data source.
/// Two scopes never share cached data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeKey {
    pub cash_flow_id: String,
    pub data_source: String,
}

impl ScopeKey {
    pub fn new(cash_flow_id: impl Into<String>, data_source: impl Into<String>) -> Self {
        Self {
            cash_flow_id: cash_flow_id.into(),
            data_source: data_source.into(),
        }
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.cash_flow_id, self.data_source)
    }
}
