//! Calendar domain logic for the cash flow dashboard.
//!
//! Month arithmetic, week-of-month bucketing and the focus month the
//! cards view is showing. The focus month is kept in memory only.

use chrono::{Datelike, Local, NaiveDate};
use shared::TimeRange;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::backend::domain::models::MonthKey;

/// Calendar service that handles month navigation and week calculations
#[derive(Clone)]
pub struct CalendarService {
    today: NaiveDate,
    /// Month shown by the cards view
    focus_month: Arc<Mutex<MonthKey>>,
}

impl CalendarService {
    /// Create a calendar anchored at the local current date
    pub fn new() -> Self {
        Self::starting_at(Local::now().date_naive())
    }

    /// Create a calendar anchored at a fixed date, focused on that date's month
    pub fn starting_at(today: NaiveDate) -> Self {
        Self {
            today,
            focus_month: Arc::new(Mutex::new(MonthKey::from_date(today))),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn current_month(&self) -> MonthKey {
        MonthKey::from_date(self.today)
    }

    /// Get the number of days in a given month
    pub fn days_in_month(&self, month: MonthKey) -> u32 {
        match month.month() {
            2 => {
                if self.is_leap_year(month.year()) {
                    29
                } else {
                    28
                }
            }
            4 | 6 | 9 | 11 => 30,
            _ => 31,
        }
    }

    pub fn is_leap_year(&self, year: i32) -> bool {
        year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
    }

    /// Weekday of the 1st (0 = Sunday, 1 = Monday, etc.)
    pub fn first_day_of_month(&self, month: MonthKey) -> u32 {
        month.first_day().weekday().num_days_from_sunday()
    }

    /// Calendar row (1-based, weeks start on Sunday) the date falls in within its month
    pub fn week_of_month(&self, date: NaiveDate) -> u32 {
        let offset = self.first_day_of_month(MonthKey::from_date(date));
        (date.day() + offset - 1) / 7 + 1
    }

    /// Number of calendar rows the month spans (4 to 6)
    pub fn weeks_in_month(&self, month: MonthKey) -> u32 {
        self.week_of_month(month.last_day())
    }

    pub fn month_name(&self, month: u32) -> &'static str {
        match month {
            1 => "January", 2 => "February", 3 => "March", 4 => "April",
            5 => "May", 6 => "June", 7 => "July", 8 => "August",
            9 => "September", 10 => "October", 11 => "November", 12 => "December",
            _ => "Invalid Month",
        }
    }

    /// Compact chart label, e.g. "Jun 25"
    pub fn short_label(&self, month: MonthKey) -> String {
        let name: String = self.month_name(month.month()).chars().take(3).collect();
        format!("{} {:02}", name, month.year().rem_euclid(100))
    }

    /// Months covered by the chart window, oldest first, ending at the current month
    pub fn chart_window(&self, range: TimeRange) -> Vec<MonthKey> {
        self.current_month().trailing(range.months())
    }

    pub fn focus_month(&self) -> MonthKey {
        *self.lock_focus()
    }

    pub fn set_focus_month(&self, month: MonthKey) -> MonthKey {
        *self.lock_focus() = month;
        month
    }

    pub fn navigate_previous_month(&self) -> MonthKey {
        let mut focus = self.lock_focus();
        *focus = focus.previous();
        *focus
    }

    pub fn navigate_next_month(&self) -> MonthKey {
        let mut focus = self.lock_focus();
        *focus = focus.next();
        *focus
    }

    fn lock_focus(&self) -> MutexGuard<'_, MonthKey> {
        self.focus_month
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for CalendarService {
    fn default() -> Self {
        Self::new()
    }
}
