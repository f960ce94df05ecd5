use std::cmp::Ordering;
use std::collections::HashMap;

use anyhow::Result;
use goal_core::{MacroGoal, MicroGoal};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Persistence collaborator for goal records.
///
/// Saves overwrite the whole record. Nothing here coordinates concurrent
/// writers; the last save wins.
pub trait GoalStore: Send + Sync {
    fn fetch_goal(&self, id: &str) -> Result<Option<MicroGoal>>;
    fn save_goal(&self, id: &str, goal: &MicroGoal) -> Result<()>;
    /// Newest first.
    fn list_goals_for_user(&self, user_id: &str) -> Result<Vec<MicroGoal>>;
    fn list_goals_for_macro(&self, macro_goal_id: &str) -> Result<Vec<MicroGoal>>;
    /// Returns whether a record was removed.
    fn delete_goal(&self, id: &str) -> Result<bool>;

    fn fetch_macro_goal(&self, id: &str) -> Result<Option<MacroGoal>>;
    fn save_macro_goal(&self, id: &str, goal: &MacroGoal) -> Result<()>;
    /// Newest first.
    fn list_macro_goals_for_user(&self, user_id: &str) -> Result<Vec<MacroGoal>>;
    /// Removes the macro goal and every micro goal under it as one change.
    /// Returns how many micro goals went with it, or `None` if the macro goal
    /// did not exist.
    fn delete_macro_goal(&self, id: &str) -> Result<Option<usize>>;
}

/// Plain record tables shared by the bundled stores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalTables {
    #[serde(default, with = "record_list")]
    pub macro_goals: HashMap<String, MacroGoal>,
    #[serde(default, with = "record_list")]
    pub micro_goals: HashMap<String, MicroGoal>,
}

impl GoalTables {
    pub(crate) fn goals_for_user(&self, user_id: &str) -> Vec<MicroGoal> {
        let mut goals: Vec<MicroGoal> = self
            .micro_goals
            .values()
            .filter(|goal| goal.user_id == user_id)
            .cloned()
            .collect();
        goals.sort_by(|a, b| newest_first(a.created_at, b.created_at).then_with(|| a.id.cmp(&b.id)));
        goals
    }

    pub(crate) fn goals_for_macro(&self, macro_goal_id: &str) -> Vec<MicroGoal> {
        let mut goals: Vec<MicroGoal> = self
            .micro_goals
            .values()
            .filter(|goal| goal.macro_goal_id == macro_goal_id)
            .cloned()
            .collect();
        goals.sort_by(|a, b| newest_first(a.created_at, b.created_at).then_with(|| a.id.cmp(&b.id)));
        goals
    }

    pub(crate) fn macro_goals_for_user(&self, user_id: &str) -> Vec<MacroGoal> {
        let mut goals: Vec<MacroGoal> = self
            .macro_goals
            .values()
            .filter(|goal| goal.user_id == user_id)
            .cloned()
            .collect();
        goals.sort_by(|a, b| newest_first(a.created_at, b.created_at).then_with(|| a.id.cmp(&b.id)));
        goals
    }

    pub(crate) fn remove_macro_goal(&mut self, id: &str) -> Option<usize> {
        self.macro_goals.remove(id)?;
        let before = self.micro_goals.len();
        self.micro_goals.retain(|_, goal| goal.macro_goal_id != id);
        Some(before - self.micro_goals.len())
    }
}

/// Records without a creation time sort last.
fn newest_first<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Tables keyed by id in memory, stored as arrays of records.
mod record_list {
    use std::collections::HashMap;

    use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize, Serializer};

    pub trait Keyed {
        fn key(&self) -> &str;
    }

    impl Keyed for goal_core::MicroGoal {
        fn key(&self) -> &str {
            &self.id
        }
    }

    impl Keyed for goal_core::MacroGoal {
        fn key(&self) -> &str {
            &self.id
        }
    }

    pub fn serialize<S, T>(map: &HashMap<String, T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        let mut keys: Vec<&String> = map.keys().collect();
        keys.sort();
        serializer.collect_seq(keys.into_iter().map(|key| &map[key]))
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<HashMap<String, T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + Keyed,
    {
        let records: Vec<T> = Vec::deserialize(deserializer)?;
        Ok(records
            .into_iter()
            .map(|record| (record.key().to_string(), record))
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryGoalStore {
    tables: RwLock<GoalTables>,
}

impl InMemoryGoalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tables(tables: GoalTables) -> Self {
        Self {
            tables: RwLock::new(tables),
        }
    }

    pub fn with_goals(goals: impl IntoIterator<Item = MicroGoal>) -> Self {
        let tables = GoalTables {
            micro_goals: goals
                .into_iter()
                .map(|goal| (goal.id.clone(), goal))
                .collect(),
            ..GoalTables::default()
        };
        Self::from_tables(tables)
    }
}

impl GoalStore for InMemoryGoalStore {
    fn fetch_goal(&self, id: &str) -> Result<Option<MicroGoal>> {
        Ok(self.tables.read().micro_goals.get(id).cloned())
    }

    fn save_goal(&self, id: &str, goal: &MicroGoal) -> Result<()> {
        self.tables
            .write()
            .micro_goals
            .insert(id.to_string(), goal.clone());
        Ok(())
    }

    fn list_goals_for_user(&self, user_id: &str) -> Result<Vec<MicroGoal>> {
        Ok(self.tables.read().goals_for_user(user_id))
    }

    fn list_goals_for_macro(&self, macro_goal_id: &str) -> Result<Vec<MicroGoal>> {
        Ok(self.tables.read().goals_for_macro(macro_goal_id))
    }

    fn delete_goal(&self, id: &str) -> Result<bool> {
        Ok(self.tables.write().micro_goals.remove(id).is_some())
    }

    fn fetch_macro_goal(&self, id: &str) -> Result<Option<MacroGoal>> {
        Ok(self.tables.read().macro_goals.get(id).cloned())
    }

    fn save_macro_goal(&self, id: &str, goal: &MacroGoal) -> Result<()> {
        self.tables
            .write()
            .macro_goals
            .insert(id.to_string(), goal.clone());
        Ok(())
    }

    fn list_macro_goals_for_user(&self, user_id: &str) -> Result<Vec<MacroGoal>> {
        Ok(self.tables.read().macro_goals_for_user(user_id))
    }

    fn delete_macro_goal(&self, id: &str) -> Result<Option<usize>> {
        Ok(self.tables.write().remove_macro_goal(id))
    }
}
