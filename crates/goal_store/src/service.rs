use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use goal_core::{
    agenda,
    clock::{Clock, LocalClock},
    config::EngineConfig,
    error::{GoalError, GoalResult},
    model::{Frequency, MacroGoal, MicroGoal, DEFAULT_TARGET_XP, DEFAULT_XP_VALUE},
    recurrence::RecurrenceRule,
    streak::{completion_xp, StreakEngine},
    timeline::{self, DaySelection, DayView},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    json::JsonFileGoalStore,
    listener::GoalChangeListener,
    store::{GoalStore, InMemoryGoalStore},
};

/// Everything a goal screen needs for one user, computed by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSnapshot {
    pub today: NaiveDate,
    pub macro_goals: Vec<MacroGoal>,
    pub anti_goals: Vec<MacroGoal>,
    pub micro_goals: Vec<MicroGoal>,
    pub todays_goals: Vec<MicroGoal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroGoalDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub is_anti_goal: bool,
    #[serde(default)]
    pub target_xp: Option<u32>,
}

impl MacroGoalDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn anti(mut self) -> Self {
        self.is_anti_goal = true;
        self
    }
}

/// User-editable fields of a habit. Streak and history are owned by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MicroGoalDraft {
    pub macro_goal_id: String,
    pub title: String,
    pub xp_value: u32,
    pub frequency: Frequency,
    #[serde(default)]
    pub custom_days: Vec<String>,
}

impl MicroGoalDraft {
    pub fn new(macro_goal_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            macro_goal_id: macro_goal_id.into(),
            title: title.into(),
            xp_value: DEFAULT_XP_VALUE,
            frequency: Frequency::Daily,
            custom_days: Vec::new(),
        }
    }

    pub fn with_frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_custom_days<I, S>(mut self, days: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.frequency = Frequency::Custom;
        self.custom_days = days.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_xp(mut self, xp_value: u32) -> Self {
        self.xp_value = xp_value;
        self
    }

    fn apply_to(&self, goal: &mut MicroGoal) {
        goal.macro_goal_id = self.macro_goal_id.clone();
        goal.title = self.title.trim().to_string();
        goal.xp_value = self.xp_value;
        goal.frequency = self.frequency.clone();
        goal.custom_days = if self.frequency == Frequency::Custom {
            self.custom_days.clone()
        } else {
            Vec::new()
        };
    }
}

pub struct GoalService {
    store: Box<dyn GoalStore>,
    clock: Box<dyn Clock>,
    config: EngineConfig,
    engine: StreakEngine,
    listeners: Vec<Box<dyn GoalChangeListener>>,
}

pub struct GoalServiceBuilder {
    store: Option<Box<dyn GoalStore>>,
    store_path: Option<PathBuf>,
    clock: Option<Box<dyn Clock>>,
    config: EngineConfig,
    listeners: Vec<Box<dyn GoalChangeListener>>,
}

impl Default for GoalServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GoalServiceBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            store_path: None,
            clock: None,
            config: EngineConfig::default(),
            listeners: Vec::new(),
        }
    }

    pub fn with_store(mut self, store: impl GoalStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// Opens a JSON file store at `path` during [`build`](Self::build).
    pub fn with_json_store(mut self, path: impl AsRef<Path>) -> Self {
        self.store_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn add_listener(mut self, listener: impl GoalChangeListener + 'static) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }

    pub fn build(self) -> Result<GoalService> {
        let store: Box<dyn GoalStore> = match (self.store, self.store_path) {
            (Some(store), _) => store,
            (None, Some(path)) => Box::new(JsonFileGoalStore::open(path)?),
            (None, None) => Box::new(InMemoryGoalStore::new()),
        };
        Ok(GoalService {
            store,
            clock: self.clock.unwrap_or_else(|| Box::new(LocalClock)),
            engine: StreakEngine::new(self.config.undo_policy),
            config: self.config,
            listeners: self.listeners,
        })
    }
}

impl GoalService {
    pub fn builder() -> GoalServiceBuilder {
        GoalServiceBuilder::new()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Marks today's occurrence done or undone.
    ///
    /// One read, one whole-record write. A missing goal fails with
    /// `NotFound` before anything is written.
    #[instrument(skip(self))]
    pub fn toggle_completion(&self, goal_id: &str, mark_completed: bool) -> GoalResult<MicroGoal> {
        let current = self.require_goal(goal_id)?;
        self.apply_toggle(current, self.clock.today(), mark_completed)
    }

    /// Flips today's state, whatever it currently is.
    #[instrument(skip(self))]
    pub fn toggle_today(&self, goal_id: &str) -> GoalResult<MicroGoal> {
        let current = self.require_goal(goal_id)?;
        let today = self.clock.today();
        let mark = !current.was_completed_on(today);
        self.apply_toggle(current, today, mark)
    }

    /// Handles a tap on a timeline day. Only today mutates anything.
    #[instrument(skip(self))]
    pub fn select_day(&self, goal_id: &str, date: NaiveDate) -> GoalResult<DaySelection> {
        let current = self.require_goal(goal_id)?;
        let today = self.clock.today();
        let selection = timeline::selection_for(date, today);
        if selection == DaySelection::ToggleToday {
            let mark = !current.was_completed_on(today);
            self.apply_toggle(current, today, mark)?;
        }
        Ok(selection)
    }

    pub fn timeline(&self, goal_id: &str) -> GoalResult<Vec<DayView>> {
        let goal = self.require_goal(goal_id)?;
        Ok(timeline::build_window(&goal, self.clock.today()))
    }

    pub fn was_completed_on(&self, goal_id: &str, date: NaiveDate) -> GoalResult<bool> {
        Ok(self.require_goal(goal_id)?.was_completed_on(date))
    }

    /// Read paths return records as of today; see [`MicroGoal::as_of`].
    pub fn micro_goal(&self, goal_id: &str) -> GoalResult<MicroGoal> {
        Ok(self.require_goal(goal_id)?.as_of(self.clock.today()))
    }

    pub fn list_micro_goals(&self, user_id: &str) -> GoalResult<Vec<MicroGoal>> {
        let goals = self.store.list_goals_for_user(user_id)?;
        Ok(self.as_of_today(goals))
    }

    pub fn micro_goals_for_macro(&self, macro_goal_id: &str) -> GoalResult<Vec<MicroGoal>> {
        let goals = self.store.list_goals_for_macro(macro_goal_id)?;
        Ok(self.as_of_today(goals))
    }

    /// Habits due today, in store order.
    pub fn todays_goals(&self, user_id: &str) -> GoalResult<Vec<MicroGoal>> {
        let goals = self.store.list_goals_for_user(user_id)?;
        Ok(agenda::into_due(self.as_of_today(goals), self.clock.today()))
    }

    pub fn list_macro_goals(&self, user_id: &str, include_anti_goals: bool) -> GoalResult<Vec<MacroGoal>> {
        let goals = self.store.list_macro_goals_for_user(user_id)?;
        if include_anti_goals {
            return Ok(goals);
        }
        Ok(goals.into_iter().filter(|goal| !goal.is_anti_goal).collect())
    }

    pub fn snapshot(&self, user_id: &str) -> GoalResult<GoalSnapshot> {
        let today = self.clock.today();
        let (anti_goals, macro_goals): (Vec<MacroGoal>, Vec<MacroGoal>) = self
            .store
            .list_macro_goals_for_user(user_id)?
            .into_iter()
            .partition(|goal| goal.is_anti_goal);
        let micro_goals = self.as_of_today(self.store.list_goals_for_user(user_id)?);
        let todays_goals = agenda::into_due(micro_goals.iter().cloned(), today);
        Ok(GoalSnapshot {
            today,
            macro_goals,
            anti_goals,
            micro_goals,
            todays_goals,
        })
    }

    #[instrument(skip(self))]
    pub fn create_macro_goal(&self, user_id: &str, draft: MacroGoalDraft) -> GoalResult<MacroGoal> {
        let title = require_title(&draft.title)?;
        let existing = self
            .store
            .list_macro_goals_for_user(user_id)?
            .into_iter()
            .filter(|goal| goal.is_anti_goal == draft.is_anti_goal)
            .count();
        let (limit, what) = if draft.is_anti_goal {
            (self.config.limits.max_anti_goals, "anti-goals")
        } else {
            (self.config.limits.max_macro_goals, "macro goals")
        };
        if existing >= limit {
            return Err(GoalError::LimitReached { what, limit });
        }

        let now = Utc::now();
        let goal = MacroGoal {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title,
            description: draft.description,
            color: draft.color,
            is_anti_goal: draft.is_anti_goal,
            total_xp: 0,
            target_xp: draft.target_xp.unwrap_or(DEFAULT_TARGET_XP),
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.store.save_macro_goal(&goal.id, &goal)?;
        info!(goal_id = %goal.id, anti = goal.is_anti_goal, "macro goal created");
        self.notify(user_id);
        Ok(goal)
    }

    /// Updates the descriptive fields. XP totals and the anti-goal flag stay as stored.
    #[instrument(skip(self))]
    pub fn update_macro_goal(&self, goal_id: &str, draft: MacroGoalDraft) -> GoalResult<MacroGoal> {
        let mut goal = self
            .store
            .fetch_macro_goal(goal_id)?
            .ok_or_else(|| GoalError::macro_not_found(goal_id))?;
        goal.title = require_title(&draft.title)?;
        goal.description = draft.description;
        goal.color = draft.color;
        if let Some(target) = draft.target_xp {
            goal.target_xp = target;
        }
        goal.updated_at = Some(Utc::now());
        self.store.save_macro_goal(goal_id, &goal)?;
        self.notify(&goal.user_id);
        Ok(goal)
    }

    /// Removes a macro goal and every habit under it. Returns how many habits went with it.
    #[instrument(skip(self))]
    pub fn delete_macro_goal(&self, goal_id: &str) -> GoalResult<usize> {
        let goal = self
            .store
            .fetch_macro_goal(goal_id)?
            .ok_or_else(|| GoalError::macro_not_found(goal_id))?;
        let removed = self
            .store
            .delete_macro_goal(goal_id)?
            .ok_or_else(|| GoalError::macro_not_found(goal_id))?;
        info!(goal_id, removed, "macro goal deleted");
        self.notify(&goal.user_id);
        Ok(removed)
    }

    #[instrument(skip(self))]
    pub fn create_micro_goal(&self, user_id: &str, draft: MicroGoalDraft) -> GoalResult<MicroGoal> {
        let mut goal = MicroGoal::new(Uuid::new_v4().to_string(), String::new());
        goal.user_id = user_id.to_string();
        draft.apply_to(&mut goal);
        validate_micro_goal(&goal)?;
        self.ensure_room_under(&goal.macro_goal_id)?;

        let now = Utc::now();
        goal.created_at = Some(now);
        goal.updated_at = Some(now);
        self.store.save_goal(&goal.id, &goal)?;
        info!(goal_id = %goal.id, frequency = goal.frequency.as_str(), "micro goal created");
        self.notify(user_id);
        Ok(goal)
    }

    /// Rewrites the editable fields; streak, history and completion are kept.
    #[instrument(skip(self))]
    pub fn update_micro_goal(&self, goal_id: &str, draft: MicroGoalDraft) -> GoalResult<MicroGoal> {
        let mut goal = self.require_goal(goal_id)?;
        let previous_macro = goal.macro_goal_id.clone();
        draft.apply_to(&mut goal);
        validate_micro_goal(&goal)?;
        if goal.macro_goal_id != previous_macro {
            self.ensure_room_under(&goal.macro_goal_id)?;
        }
        goal.updated_at = Some(Utc::now());
        self.store.save_goal(goal_id, &goal)?;
        self.notify(&goal.user_id);
        Ok(goal)
    }

    #[instrument(skip(self))]
    pub fn set_archived(&self, goal_id: &str, archived: bool) -> GoalResult<MicroGoal> {
        let mut goal = self.require_goal(goal_id)?;
        goal.is_archived = archived;
        goal.updated_at = Some(Utc::now());
        self.store.save_goal(goal_id, &goal)?;
        self.notify(&goal.user_id);
        Ok(goal)
    }

    #[instrument(skip(self))]
    pub fn delete_micro_goal(&self, goal_id: &str) -> GoalResult<()> {
        let goal = self.require_goal(goal_id)?;
        self.store.delete_goal(goal_id)?;
        self.notify(&goal.user_id);
        Ok(())
    }
}

impl GoalService {
    fn as_of_today(&self, goals: Vec<MicroGoal>) -> Vec<MicroGoal> {
        let today = self.clock.today();
        goals.into_iter().map(|goal| goal.as_of(today)).collect()
    }

    fn require_goal(&self, goal_id: &str) -> GoalResult<MicroGoal> {
        self.store
            .fetch_goal(goal_id)?
            .ok_or_else(|| GoalError::micro_not_found(goal_id))
    }

    fn apply_toggle(&self, current: MicroGoal, today: NaiveDate, mark_completed: bool) -> GoalResult<MicroGoal> {
        let mut next = self.engine.toggle(&current, today, mark_completed);
        next.updated_at = Some(Utc::now());
        self.store.save_goal(&next.id, &next)?;
        debug!(
            goal_id = %next.id,
            streak = next.streak,
            completed = next.completed,
            "completion toggled"
        );

        let gained = !current.was_completed_on(today) && next.was_completed_on(today);
        let lost = current.was_completed_on(today) && !next.was_completed_on(today);
        if gained || lost {
            // The habit record is already saved; a failed XP write is reported but not fatal.
            let earned = if gained { &next } else { &current };
            let amount = completion_xp(earned, &self.config.xp);
            if let Err(err) = self.adjust_xp(&next.macro_goal_id, amount, gained) {
                warn!(goal_id = %next.id, %err, "failed to update macro goal xp");
            }
        }

        self.notify(&next.user_id);
        Ok(next)
    }

    fn adjust_xp(&self, macro_goal_id: &str, amount: u32, add: bool) -> GoalResult<()> {
        let Some(mut goal) = self.store.fetch_macro_goal(macro_goal_id)? else {
            debug!(macro_goal_id, "no owning macro goal; xp not recorded");
            return Ok(());
        };
        goal.total_xp = if add {
            goal.total_xp.saturating_add(amount)
        } else {
            goal.total_xp.saturating_sub(amount)
        };
        goal.updated_at = Some(Utc::now());
        self.store.save_macro_goal(macro_goal_id, &goal)?;
        Ok(())
    }

    fn ensure_room_under(&self, macro_goal_id: &str) -> GoalResult<()> {
        if self.store.fetch_macro_goal(macro_goal_id)?.is_none() {
            return Err(GoalError::macro_not_found(macro_goal_id));
        }
        let limit = self.config.limits.max_micro_goals_per_macro;
        if self.store.list_goals_for_macro(macro_goal_id)?.len() >= limit {
            return Err(GoalError::LimitReached {
                what: "micro goals per macro goal",
                limit,
            });
        }
        Ok(())
    }

    fn notify(&self, user_id: &str) {
        if self.listeners.is_empty() {
            return;
        }
        match self.snapshot(user_id) {
            Ok(snapshot) => {
                for listener in &self.listeners {
                    listener.goals_changed(&snapshot);
                }
            }
            Err(err) => warn!(user_id, %err, "unable to build goal snapshot for listeners"),
        }
    }
}

fn require_title(raw: &str) -> GoalResult<String> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(GoalError::Validation("title must not be empty".into()));
    }
    Ok(title.to_string())
}

fn validate_micro_goal(goal: &MicroGoal) -> GoalResult<()> {
    require_title(&goal.title)?;
    if goal.xp_value == 0 {
        return Err(GoalError::Validation("xp value must be positive".into()));
    }
    if goal.macro_goal_id.trim().is_empty() {
        return Err(GoalError::Validation("a macro goal must be selected".into()));
    }
    RecurrenceRule::validate(goal)
}
