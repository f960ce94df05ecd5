use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ledger::CompletionLedger;

pub const DEFAULT_XP_VALUE: u32 = 10;
pub const DEFAULT_TARGET_XP: u32 = 1000;

/// How often a habit recurs.
///
/// Stored as its lowercase name. Values this build does not know survive a
/// round trip as `Unrecognized` and are never due.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum Frequency {
    #[default]
    Daily,
    Weekdays,
    Weekends,
    Custom,
    Unrecognized(String),
}

impl Frequency {
    pub fn as_str(&self) -> &str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekdays => "weekdays",
            Frequency::Weekends => "weekends",
            Frequency::Custom => "custom",
            Frequency::Unrecognized(raw) => raw,
        }
    }
}

impl From<String> for Frequency {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "daily" => Frequency::Daily,
            "weekdays" => Frequency::Weekdays,
            "weekends" => Frequency::Weekends,
            "custom" => Frequency::Custom,
            _ => Frequency::Unrecognized(raw),
        }
    }
}

impl From<Frequency> for String {
    fn from(frequency: Frequency) -> Self {
        match frequency {
            Frequency::Unrecognized(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

/// A recurring habit owned by a macro goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MicroGoal {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub macro_goal_id: String,
    pub title: String,
    #[serde(default = "default_xp_value")]
    pub xp_value: u32,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub custom_days: Vec<String>,
    #[serde(default)]
    pub streak: u32,
    #[serde(default)]
    pub last_completed: Option<NaiveDate>,
    #[serde(default)]
    pub completion_history: CompletionLedger,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl MicroGoal {
    /// A fresh habit: no streak, no history.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_id: String::new(),
            macro_goal_id: String::new(),
            title: title.into(),
            xp_value: DEFAULT_XP_VALUE,
            frequency: Frequency::Daily,
            custom_days: Vec::new(),
            streak: 0,
            last_completed: None,
            completion_history: CompletionLedger::new(),
            completed: false,
            is_archived: false,
            created_at: None,
            updated_at: None,
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

    pub fn with_owner(mut self, user_id: impl Into<String>, macro_goal_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self.macro_goal_id = macro_goal_id.into();
        self
    }

    pub fn was_completed_on(&self, date: NaiveDate) -> bool {
        self.completion_history.contains(date)
    }

    /// The record as it reads on `today`: `completed` comes from the ledger,
    /// not from whatever day the record was last written.
    pub fn as_of(mut self, today: NaiveDate) -> Self {
        self.completed = self.was_completed_on(today);
        self
    }

    /// Whether the cached `completed` flag agrees with the ledger for `today`.
    pub fn completed_flag_consistent(&self, today: NaiveDate) -> bool {
        self.completed == self.completion_history.contains(today)
    }
}

/// Outcome-level container for habits. Anti-goals share the shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroGoal {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub is_anti_goal: bool,
    #[serde(default, rename = "totalXP")]
    pub total_xp: u32,
    #[serde(default = "default_target_xp", rename = "targetXP")]
    pub target_xp: u32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl MacroGoal {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_id: String::new(),
            title: title.into(),
            description: String::new(),
            color: String::new(),
            is_anti_goal: false,
            total_xp: 0,
            target_xp: DEFAULT_TARGET_XP,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn anti(mut self) -> Self {
        self.is_anti_goal = true;
        self
    }
}

fn default_xp_value() -> u32 {
    DEFAULT_XP_VALUE
}

fn default_target_xp() -> u32 {
    DEFAULT_TARGET_XP
}

fn nullable_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_stored_document_shape() {
        let raw = r#"{
            "id": "g1",
            "userId": "u1",
            "macroGoalId": "m1",
            "title": "Stretch",
            "xpValue": 15,
            "frequency": "custom",
            "customDays": ["monday", "friday"],
            "streak": 3,
            "lastCompleted": "2024-05-10",
            "completionHistory": ["2024-05-08", "2024-05-09", "2024-05-10"],
            "completed": false,
            "isArchived": false
        }"#;
        let goal: MicroGoal = serde_json::from_str(raw).unwrap();
        assert_eq!(goal.frequency, Frequency::Custom);
        assert_eq!(goal.custom_days, vec!["monday", "friday"]);
        assert_eq!(goal.streak, 3);
        assert_eq!(goal.last_completed, NaiveDate::from_ymd_opt(2024, 5, 10));
        assert_eq!(goal.completion_history.len(), 3);
    }

    #[test]
    fn missing_and_null_fields_fall_back_to_creation_defaults() {
        let goal: MicroGoal =
            serde_json::from_str(r#"{"id": "g2", "title": "Read", "customDays": null}"#).unwrap();
        assert_eq!(goal.xp_value, DEFAULT_XP_VALUE);
        assert_eq!(goal.frequency, Frequency::Daily);
        assert!(goal.custom_days.is_empty());
        assert_eq!(goal.streak, 0);
        assert!(goal.last_completed.is_none());
        assert!(goal.completion_history.is_empty());
    }

    #[test]
    fn unknown_frequency_round_trips_verbatim() {
        let goal: MicroGoal =
            serde_json::from_str(r#"{"id": "g3", "title": "Odd", "frequency": "fortnightly"}"#)
                .unwrap();
        assert_eq!(
            goal.frequency,
            Frequency::Unrecognized("fortnightly".into())
        );
        let value = serde_json::to_value(&goal).unwrap();
        assert_eq!(value["frequency"], "fortnightly");
    }

    #[test]
    fn completed_flag_is_rederived_for_the_reading_day() {
        let friday = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let saturday = NaiveDate::from_ymd_opt(2024, 5, 11).unwrap();
        let mut goal = MicroGoal::new("g", "Run");
        goal.completion_history.add(friday);
        goal.completed = true;

        assert!(!goal.completed_flag_consistent(saturday));
        let read = goal.clone().as_of(saturday);
        assert!(!read.completed);
        assert!(read.completed_flag_consistent(saturday));
        assert!(goal.as_of(friday).completed);
    }

    #[test]
    fn macro_goal_uses_xp_field_names() {
        let goal = MacroGoal::new("m1", "Get fit").anti();
        let value = serde_json::to_value(&goal).unwrap();
        assert_eq!(value["isAntiGoal"], true);
        assert_eq!(value["targetXP"], DEFAULT_TARGET_XP);
        assert_eq!(value["totalXP"], 0);
    }
}
