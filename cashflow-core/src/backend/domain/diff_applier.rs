//! Applies externally observed transaction changes to the cache.
//!
//! Changes are applied in order, each one completely before the next.
//! Nothing here fetches; the loaded markers of the touched months are left
//! as they are.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backend::domain::models::{MonthKey, ScopeKey, Transaction};
use crate::backend::storage::TransactionCache;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionChange {
    Removal(Transaction),
    Insertion(Transaction),
    Update { old: Transaction, new: Transaction },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffOutcome {
    pub applied: usize,
    pub skipped: usize,
    /// Months whose partitions were touched, old and new side of updates included
    pub affected_months: BTreeSet<MonthKey>,
}

pub struct DiffApplier;

impl DiffApplier {
    pub fn apply(
        cache: &mut TransactionCache,
        scope: &ScopeKey,
        changes: &[TransactionChange],
    ) -> DiffOutcome {
        let mut outcome = DiffOutcome::default();
        for change in changes {
            let applied = match change {
                TransactionChange::Removal(transaction) => {
                    Self::remove(cache, scope, transaction, &mut outcome)
                }
                TransactionChange::Insertion(transaction) => {
                    Self::insert(cache, scope, transaction, &mut outcome)
                }
                TransactionChange::Update { old, new } => {
                    // a missing old side is not an error; the new side still lands
                    Self::remove(cache, scope, old, &mut outcome);
                    Self::insert(cache, scope, new, &mut outcome)
                }
            };
            if applied {
                outcome.applied += 1;
            } else {
                outcome.skipped += 1;
            }
        }
        debug!(
            "Applied {} changes ({} skipped) for scope {}",
            outcome.applied, outcome.skipped, scope
        );
        outcome
    }

    fn remove(
        cache: &mut TransactionCache,
        scope: &ScopeKey,
        transaction: &Transaction,
        outcome: &mut DiffOutcome,
    ) -> bool {
        let Some(month) = transaction.flow_month_key() else {
            warn!("Ignoring removal of transaction {} without a month", transaction.id);
            return false;
        };
        cache.remove(transaction, scope);
        outcome.affected_months.insert(month);
        true
    }

    fn insert(
        cache: &mut TransactionCache,
        scope: &ScopeKey,
        transaction: &Transaction,
        outcome: &mut DiffOutcome,
    ) -> bool {
        match cache.upsert(transaction.clone(), scope) {
            Some(month) => {
                outcome.affected_months.insert(month);
                true
            }
            None => {
                warn!("Ignoring transaction {} without a month", transaction.id);
                false
            }
        }
    }
}
