use shared::{CategoryOrderEntry, MonthlyGoalEntry};
use std::collections::HashMap;
use tracing::warn;

use crate::backend::domain::models::{CategoryOrder, MonthKey};

pub struct CategoryMapper;

impl CategoryMapper {
    pub fn to_domain(dto: CategoryOrderEntry) -> CategoryOrder {
        CategoryOrder {
            monthly_target: dto.monthly_target.as_deref().and_then(CategoryOrder::parse_target),
            shared_category: dto
                .shared_category
                .map(|group| group.trim().to_string())
                .filter(|group| !group.is_empty()),
            category_name: dto.category_name,
            display_order: dto.display_order,
            weekly_display: dto.weekly_display,
            use_shared_target: dto.use_shared_target,
        }
    }

    /// Goals keyed by month; entries with a malformed month key are dropped
    pub fn goals_by_month(entries: Vec<MonthlyGoalEntry>) -> HashMap<MonthKey, f64> {
        entries
            .into_iter()
            .filter_map(|entry| match entry.month_key.parse::<MonthKey>() {
                Ok(month) => Some((month, entry.target_amount)),
                Err(e) => {
                    warn!("Skipping monthly goal: {}", e);
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_domain_parses_text_target() {
        let dto = CategoryOrderEntry {
            category_name: "Food".to_string(),
            display_order: Some(2),
            weekly_display: true,
            monthly_target: Some("1,200".to_string()),
            shared_category: Some(" ".to_string()),
            use_shared_target: false,
        };
        let order = CategoryMapper::to_domain(dto);
        assert_eq!(order.monthly_target, Some(1200.0));
        assert_eq!(order.shared_category, None);
        assert!(order.weekly_display);
    }

    #[test]
    fn test_goals_by_month_drops_bad_keys() {
        let goals = CategoryMapper::goals_by_month(vec![
            MonthlyGoalEntry { month_key: "2025-06".to_string(), target_amount: 500.0 },
            MonthlyGoalEntry { month_key: "June".to_string(), target_amount: 100.0 },
        ]);
        assert_eq!(goals.len(), 1);
        assert_eq!(goals.get(&"2025-06".parse().unwrap()), Some(&500.0));
    }
}
