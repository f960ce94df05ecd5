use serde::{Deserialize, Serialize};

use crate::streak::UndoPolicy;

/// Caps on how many goals a user may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalLimits {
    pub max_macro_goals: usize,
    pub max_anti_goals: usize,
    pub max_micro_goals_per_macro: usize,
}

impl Default for GoalLimits {
    fn default() -> Self {
        Self {
            max_macro_goals: 3,
            max_anti_goals: 3,
            max_micro_goals_per_macro: 10,
        }
    }
}

/// Streak bonus applied on top of a habit's base XP.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XpConfig {
    /// Bonus fraction added per day of streak.
    pub streak_bonus_per_day: f64,
    /// Upper bound on the total multiplier.
    pub max_multiplier: f64,
}

impl Default for XpConfig {
    fn default() -> Self {
        Self {
            streak_bonus_per_day: 0.1,
            max_multiplier: 2.0,
        }
    }
}

impl XpConfig {
    pub fn multiplier(&self, streak: u32) -> f64 {
        let raw = 1.0 + f64::from(streak) * self.streak_bonus_per_day;
        raw.clamp(1.0, self.max_multiplier.max(1.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub limits: GoalLimits,
    pub xp: XpConfig,
    pub undo_policy: UndoPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplier_grows_with_streak_and_caps() {
        let xp = XpConfig::default();
        assert_eq!(xp.multiplier(0), 1.0);
        assert!((xp.multiplier(5) - 1.5).abs() < f64::EPSILON);
        assert_eq!(xp.multiplier(10), 2.0);
        assert_eq!(xp.multiplier(400), 2.0);
    }

    #[test]
    fn default_limits_match_product_caps() {
        let limits = GoalLimits::default();
        assert_eq!(limits.max_macro_goals, 3);
        assert_eq!(limits.max_anti_goals, 3);
        assert_eq!(limits.max_micro_goals_per_macro, 10);
    }
}
