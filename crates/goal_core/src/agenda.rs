use chrono::NaiveDate;

use crate::model::MicroGoal;
use crate::recurrence::is_due_on;

/// Habits due on `today`, in input order.
pub fn select_due(goals: &[MicroGoal], today: NaiveDate) -> Vec<&MicroGoal> {
    goals.iter().filter(|goal| is_due_on(goal, today)).collect()
}

/// Owned variant of [`select_due`] for snapshot building.
pub fn into_due(goals: impl IntoIterator<Item = MicroGoal>, today: NaiveDate) -> Vec<MicroGoal> {
    goals
        .into_iter()
        .filter(|goal| is_due_on(goal, today))
        .collect()
}
