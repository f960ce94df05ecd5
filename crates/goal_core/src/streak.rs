use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::XpConfig;
use crate::model::MicroGoal;

/// What happens to `last_completed` when today's completion is undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UndoPolicy {
    /// Leave the stored value untouched, even though it may now name a day
    /// that is no longer in the history.
    #[default]
    KeepLastCompleted,
    /// Point at the latest day still in the history, if any.
    RecomputeFromHistory,
}

impl FromStr for UndoPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" | "keep-last-completed" => Ok(UndoPolicy::KeepLastCompleted),
            "recompute" | "recompute-from-history" => Ok(UndoPolicy::RecomputeFromHistory),
            other => Err(format!("unknown undo policy `{other}`")),
        }
    }
}

/// Applies completion toggles to a habit record.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreakEngine {
    undo_policy: UndoPolicy,
}

impl StreakEngine {
    pub fn new(undo_policy: UndoPolicy) -> Self {
        Self { undo_policy }
    }

    pub fn undo_policy(&self) -> UndoPolicy {
        self.undo_policy
    }

    /// Builds the next full record for a completion toggle on `today`.
    ///
    /// `streak`, `last_completed`, `completion_history` and `completed` are
    /// produced together; callers persist the returned record in one write.
    pub fn toggle(&self, goal: &MicroGoal, today: NaiveDate, mark_completed: bool) -> MicroGoal {
        let mut next = goal.clone();
        if mark_completed {
            next.streak = streak_after_completion(goal.last_completed, goal.streak, today);
            next.last_completed = Some(today);
            next.completion_history.add(today);
        } else {
            if goal.last_completed == Some(today) && goal.streak > 0 {
                next.streak = goal.streak - 1;
            }
            next.completion_history.remove(today);
            if self.undo_policy == UndoPolicy::RecomputeFromHistory
                && goal.last_completed == Some(today)
            {
                next.last_completed = next.completion_history.latest_before(today);
            }
        }
        next.completed = next.completion_history.contains(today);
        next
    }
}

/// [`StreakEngine::toggle`] under the default undo policy.
pub fn toggle_completion(goal: &MicroGoal, today: NaiveDate, mark_completed: bool) -> MicroGoal {
    StreakEngine::default().toggle(goal, today, mark_completed)
}

/// Streak counts consecutive calendar days, not consecutive due occurrences.
pub fn streak_after_completion(last: Option<NaiveDate>, streak: u32, today: NaiveDate) -> u32 {
    match last {
        None => 1,
        Some(last) if last == today => streak,
        Some(last) if Some(last) == today.pred_opt() => streak.saturating_add(1),
        Some(_) => 1,
    }
}

/// XP earned for completing `goal` with its current streak.
pub fn completion_xp(goal: &MicroGoal, xp: &XpConfig) -> u32 {
    let scaled = f64::from(goal.xp_value) * xp.multiplier(goal.streak);
    scaled.floor() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn goal_with(streak: u32, last: Option<NaiveDate>, history: &[NaiveDate]) -> MicroGoal {
        let mut goal = MicroGoal::new("g1", "Meditate");
        goal.streak = streak;
        goal.last_completed = last;
        goal.completion_history = history.iter().copied().collect();
        goal
    }

    #[test]
    fn first_completion_starts_streak() {
        let today = day(2024, 5, 11);
        let next = toggle_completion(&MicroGoal::new("g", "Run"), today, true);
        assert_eq!(next.streak, 1);
        assert_eq!(next.last_completed, Some(today));
        assert!(next.completed);
        assert!(next.completion_history.contains(today));
    }

    #[test]
    fn consecutive_day_extends_streak() {
        let friday = day(2024, 5, 10);
        let saturday = day(2024, 5, 11);
        let goal = goal_with(3, Some(friday), &[friday]);
        let next = toggle_completion(&goal, saturday, true);
        assert_eq!(next.streak, 4);
        assert_eq!(next.last_completed, Some(saturday));
        assert!(next.completion_history.contains_key("2024-05-11"));
        assert!(next.completion_history.contains(friday));
    }

    #[test]
    fn gap_resets_streak() {
        let today = day(2024, 5, 11);
        let goal = goal_with(9, Some(today - Duration::days(5)), &[]);
        assert_eq!(toggle_completion(&goal, today, true).streak, 1);
    }

    #[test]
    fn future_last_completed_resets_streak() {
        let today = day(2024, 5, 11);
        let goal = goal_with(4, Some(today + Duration::days(2)), &[]);
        let next = toggle_completion(&goal, today, true);
        assert_eq!(next.streak, 1);
        assert_eq!(next.last_completed, Some(today));
    }

    #[test]
    fn remarking_same_day_is_idempotent() {
        let today = day(2024, 5, 11);
        let goal = goal_with(2, Some(today - Duration::days(1)), &[]);
        let once = toggle_completion(&goal, today, true);
        let twice = toggle_completion(&once, today, true);
        assert_eq!(once.streak, 3);
        assert_eq!(twice, once);
    }

    #[test]
    fn complete_then_undo_restores_history_and_streak() {
        let yesterday = day(2024, 5, 10);
        let today = day(2024, 5, 11);
        let goal = goal_with(5, Some(yesterday), &[yesterday]);
        let done = toggle_completion(&goal, today, true);
        let undone = toggle_completion(&done, today, false);
        assert_eq!(done.streak, 6);
        assert_eq!(undone.streak, 5);
        assert_eq!(undone.completion_history, goal.completion_history);
        assert!(!undone.completed);
    }

    #[test]
    fn undo_keeps_stale_last_completed_by_default() {
        let yesterday = day(2024, 5, 10);
        let today = day(2024, 5, 11);
        let goal = goal_with(1, Some(yesterday), &[yesterday]);
        let undone = toggle_completion(&toggle_completion(&goal, today, true), today, false);
        assert_eq!(undone.last_completed, Some(today));
        assert!(!undone.completion_history.contains(today));

        // With the stale value in place, completing again counts as a re-mark.
        let redone = toggle_completion(&undone, today, true);
        assert_eq!(redone.streak, 1);
    }

    #[test]
    fn undo_can_recompute_last_completed_from_history() {
        let engine = StreakEngine::new(UndoPolicy::RecomputeFromHistory);
        let yesterday = day(2024, 5, 10);
        let today = day(2024, 5, 11);
        let goal = goal_with(1, Some(yesterday), &[yesterday]);
        let undone = engine.toggle(&engine.toggle(&goal, today, true), today, false);
        assert_eq!(undone.last_completed, Some(yesterday));
        assert_eq!(undone.streak, 1);

        let redone = engine.toggle(&undone, today, true);
        assert_eq!(redone.streak, 2);

        let fresh = engine.toggle(&MicroGoal::new("g", "x"), today, true);
        assert_eq!(engine.toggle(&fresh, today, false).last_completed, None);
    }

    #[test]
    fn undo_without_completion_today_leaves_streak() {
        let today = day(2024, 5, 11);
        let goal = goal_with(4, Some(today - Duration::days(1)), &[]);
        let next = toggle_completion(&goal, today, false);
        assert_eq!(next.streak, 4);
        assert!(!next.completed);

        let zero = goal_with(0, Some(today), &[today]);
        assert_eq!(toggle_completion(&zero, today, false).streak, 0);
    }

    #[test]
    fn completed_flag_tracks_ledger_not_input() {
        let today = day(2024, 5, 11);
        let mut goal = goal_with(0, None, &[]);
        goal.completed = true;
        let next = toggle_completion(&goal, today, false);
        assert!(!next.completed);
        assert!(next.completed_flag_consistent(today));
    }

    #[test]
    fn streak_bonus_scales_xp() {
        let mut goal = MicroGoal::new("g", "Run");
        goal.xp_value = 10;
        let xp = XpConfig::default();
        assert_eq!(completion_xp(&goal, &xp), 10);
        goal.streak = 5;
        assert_eq!(completion_xp(&goal, &xp), 15);
        goal.streak = 50;
        assert_eq!(completion_xp(&goal, &xp), 20);
    }

    #[test]
    fn undo_policy_parses_short_and_long_names() {
        assert_eq!("keep".parse::<UndoPolicy>(), Ok(UndoPolicy::KeepLastCompleted));
        assert_eq!(
            "Recompute-From-History".parse::<UndoPolicy>(),
            Ok(UndoPolicy::RecomputeFromHistory)
        );
        assert!("sometimes".parse::<UndoPolicy>().is_err());
    }
}
