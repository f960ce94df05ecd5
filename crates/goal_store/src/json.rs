use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use goal_core::{MacroGoal, MicroGoal};
use parking_lot::{RwLock, RwLockWriteGuard};

use crate::store::{GoalStore, GoalTables};

/// Stores every record in a single JSON document.
///
/// Each call reloads the document under the lock, so several handles on the
/// same file only overwrite the records they actually save.
#[derive(Debug)]
pub struct JsonFileGoalStore {
    path: PathBuf,
    tables: RwLock<GoalTables>,
}

impl JsonFileGoalStore {
    /// Opens `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let tables = read_tables(&path)?;
        tracing::debug!(
            path = %path.display(),
            macro_goals = tables.macro_goals.len(),
            micro_goals = tables.micro_goals.len(),
            "opened goal store"
        );
        Ok(Self {
            path,
            tables: RwLock::new(tables),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn reload(&self) -> Result<RwLockWriteGuard<'_, GoalTables>> {
        let mut tables = self.tables.write();
        *tables = read_tables(&self.path)?;
        Ok(tables)
    }

    fn read<T>(&self, query: impl FnOnce(&GoalTables) -> T) -> Result<T> {
        let tables = self.reload()?;
        Ok(query(&tables))
    }

    /// Applies `change` to the current file contents and persists the result.
    /// On write failure the in-memory tables keep the last state read from disk.
    fn mutate<T>(&self, change: impl FnOnce(&mut GoalTables) -> T) -> Result<T> {
        let mut tables = self.reload()?;
        let mut next = tables.clone();
        let outcome = change(&mut next);
        self.write_file(&next)?;
        *tables = next;
        Ok(outcome)
    }

    fn write_file(&self, tables: &GoalTables) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let payload = serde_json::to_string_pretty(tables)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, payload)
            .with_context(|| format!("failed to write {}", staging.display()))?;
        fs::rename(&staging, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

fn read_tables(path: &Path) -> Result<GoalTables> {
    if !path.exists() {
        return Ok(GoalTables::default());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read goal store {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(GoalTables::default());
    }
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse goal store {}", path.display()))
}

impl GoalStore for JsonFileGoalStore {
    fn fetch_goal(&self, id: &str) -> Result<Option<MicroGoal>> {
        self.read(|tables| tables.micro_goals.get(id).cloned())
    }

    fn save_goal(&self, id: &str, goal: &MicroGoal) -> Result<()> {
        self.mutate(|tables| {
            tables.micro_goals.insert(id.to_string(), goal.clone());
        })
    }

    fn list_goals_for_user(&self, user_id: &str) -> Result<Vec<MicroGoal>> {
        self.read(|tables| tables.goals_for_user(user_id))
    }

    fn list_goals_for_macro(&self, macro_goal_id: &str) -> Result<Vec<MicroGoal>> {
        self.read(|tables| tables.goals_for_macro(macro_goal_id))
    }

    fn delete_goal(&self, id: &str) -> Result<bool> {
        self.mutate(|tables| tables.micro_goals.remove(id).is_some())
    }

    fn fetch_macro_goal(&self, id: &str) -> Result<Option<MacroGoal>> {
        self.read(|tables| tables.macro_goals.get(id).cloned())
    }

    fn save_macro_goal(&self, id: &str, goal: &MacroGoal) -> Result<()> {
        self.mutate(|tables| {
            tables.macro_goals.insert(id.to_string(), goal.clone());
        })
    }

    fn list_macro_goals_for_user(&self, user_id: &str) -> Result<Vec<MacroGoal>> {
        self.read(|tables| tables.macro_goals_for_user(user_id))
    }

    fn delete_macro_goal(&self, id: &str) -> Result<Option<usize>> {
        self.mutate(|tables| tables.remove_macro_goal(id))
    }
}
