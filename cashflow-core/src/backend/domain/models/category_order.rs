//! Domain model for per-category display and budgeting metadata.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryOrder {
    pub category_name: String,
    /// `None` sorts after every category that has an order
    pub display_order: Option<i64>,
    pub weekly_display: bool,
    /// Explicit monthly target, only kept when it parsed as a positive number
    pub monthly_target: Option<f64>,
    /// Group label, only kept when non-empty
    pub shared_category: Option<String>,
    pub use_shared_target: bool,
}

impl CategoryOrder {
    /// Parse a target stored as text upstream ("1500", "1,500.50", " 200 ")
    pub fn parse_target(raw: &str) -> Option<f64> {
        let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
        match cleaned.parse::<f64>() {
            Ok(value) if value.is_finite() && value > 0.0 => Some(value),
            _ => None,
        }
    }
}

/// Category orders keyed by category name. Refreshes replace the whole book.
#[derive(Debug, Clone, Default)]
pub struct CategoryOrderBook {
    orders: HashMap<String, CategoryOrder>,
}

impl CategoryOrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_orders(orders: impl IntoIterator<Item = CategoryOrder>) -> Self {
        let mut book = Self::new();
        book.refresh(orders);
        book
    }

    /// Replace every entry; a name repeated within one refresh keeps the last entry
    pub fn refresh(&mut self, orders: impl IntoIterator<Item = CategoryOrder>) {
        self.orders = orders
            .into_iter()
            .map(|order| (order.category_name.clone(), order))
            .collect();
    }

    pub fn get(&self, category: &str) -> Option<&CategoryOrder> {
        self.orders.get(category)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn display_order(&self, category: &str) -> Option<i64> {
        self.get(category).and_then(|order| order.display_order)
    }

    pub fn weekly_display(&self, category: &str) -> bool {
        self.get(category).map(|order| order.weekly_display).unwrap_or(false)
    }

    pub fn explicit_target(&self, category: &str) -> Option<f64> {
        self.get(category).and_then(|order| order.monthly_target)
    }

    pub fn shared_category(&self, category: &str) -> Option<&str> {
        self.get(category)
            .and_then(|order| order.shared_category.as_deref())
            .filter(|group| !group.trim().is_empty())
    }

    /// Target configured on the group's own entry, for categories that opted
    /// into the shared target
    pub fn shared_target(&self, category: &str) -> Option<f64> {
        let order = self.get(category)?;
        if !order.use_shared_target {
            return None;
        }
        let group = self.shared_category(category)?;
        self.explicit_target(group)
    }
}
