use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::model::MicroGoal;
use crate::recurrence::{is_due_on, weekday_short_name};

pub const DAYS_BEFORE_TODAY: i64 = 2;
pub const DAYS_AFTER_TODAY: i64 = 4;

/// One cell of the habit timeline strip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayView {
    pub date: NaiveDate,
    pub weekday: String,
    pub day_of_month: u32,
    pub is_past: bool,
    pub is_today: bool,
    pub is_due: bool,
    pub is_completed: bool,
    pub is_selectable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaySelection {
    /// Flip today's completion through the streak engine.
    ToggleToday,
    /// Past days only show their recorded state.
    ViewOnly,
    Disabled,
}

impl DayView {
    pub fn selection(&self) -> DaySelection {
        if self.is_today {
            DaySelection::ToggleToday
        } else if self.is_past {
            DaySelection::ViewOnly
        } else {
            DaySelection::Disabled
        }
    }

    pub fn label(&self) -> &str {
        if self.is_today {
            "Today"
        } else {
            &self.weekday
        }
    }
}

/// What selecting `date` does when the current day is `today`.
pub fn selection_for(date: NaiveDate, today: NaiveDate) -> DaySelection {
    match date.cmp(&today) {
        std::cmp::Ordering::Equal => DaySelection::ToggleToday,
        std::cmp::Ordering::Less => DaySelection::ViewOnly,
        std::cmp::Ordering::Greater => DaySelection::Disabled,
    }
}

/// Seven days centred near `today`: two back, today, four forward.
pub fn build_window(goal: &MicroGoal, today: NaiveDate) -> Vec<DayView> {
    (-DAYS_BEFORE_TODAY..=DAYS_AFTER_TODAY)
        .filter_map(|offset| today.checked_add_signed(Duration::days(offset)))
        .map(|date| day_view(goal, date, today))
        .collect()
}

fn day_view(goal: &MicroGoal, date: NaiveDate, today: NaiveDate) -> DayView {
    let is_past = date < today;
    let is_today = date == today;
    let is_selectable = is_past || is_today;
    DayView {
        date,
        weekday: weekday_short_name(date.weekday()).to_string(),
        day_of_month: date.day(),
        is_past,
        is_today,
        is_due: is_due_on(goal, date),
        is_completed: is_selectable && goal.completion_history.contains(date),
        is_selectable,
    }
}

/// Compact strip for terminal output: `X` done, `.` missed, `_` not due, `·` upcoming.
pub fn render_strip(days: &[DayView]) -> String {
    days.iter()
        .map(|day| match (day.is_selectable, day.is_completed, day.is_due) {
            (_, true, _) => 'X',
            (true, false, true) => '.',
            (false, _, true) => '·',
            _ => '_',
        })
        .collect()
}
