use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Set of calendar days on which a habit was marked done.
///
/// Persisted as a plain array of `YYYY-MM-DD` strings. Storage order carries no
/// meaning; iteration is always chronological. Stored entries that are not
/// dates are ignored by every query but written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionLedger {
    days: BTreeSet<NaiveDate>,
    unparsed: Vec<String>,
}

impl CompletionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.days.contains(&date)
    }

    /// Returns `true` when the day was not already recorded.
    pub fn add(&mut self, date: NaiveDate) -> bool {
        self.days.insert(date)
    }

    /// Returns `true` when the day was present.
    pub fn remove(&mut self, date: NaiveDate) -> bool {
        self.days.remove(&date)
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = NaiveDate> + '_ {
        self.days.iter().copied()
    }

    pub fn latest(&self) -> Option<NaiveDate> {
        self.days.last().copied()
    }

    pub fn latest_before(&self, date: NaiveDate) -> Option<NaiveDate> {
        self.days.range(..date).next_back().copied()
    }

    /// Looks up a raw `YYYY-MM-DD` key the way stored documents compare days.
    pub fn contains_key(&self, key: &str) -> bool {
        parse_day(key).is_some_and(|date| self.contains(date))
    }

    pub fn to_keys(&self) -> Vec<String> {
        self.iter().map(day_key).collect()
    }

    /// Stored entries that could not be read as dates.
    pub fn unparsed(&self) -> &[String] {
        &self.unparsed
    }
}

impl FromIterator<NaiveDate> for CompletionLedger {
    fn from_iter<I: IntoIterator<Item = NaiveDate>>(iter: I) -> Self {
        Self {
            days: iter.into_iter().collect(),
            unparsed: Vec::new(),
        }
    }
}

pub fn day_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_day(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key.trim(), DATE_FORMAT).ok()
}

impl Serialize for CompletionLedger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(
            self.days
                .iter()
                .map(|date| day_key(*date))
                .chain(self.unparsed.iter().cloned()),
        )
    }
}

impl<'de> Deserialize<'de> for CompletionLedger {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: Option<Vec<String>> = Option::deserialize(deserializer)?;
        let mut ledger = CompletionLedger::new();
        for key in raw.unwrap_or_default() {
            match parse_day(&key) {
                Some(date) => {
                    ledger.add(date);
                }
                None => {
                    tracing::warn!(%key, "keeping unreadable completion date as-is");
                    if !ledger.unparsed.contains(&key) {
                        ledger.unparsed.push(key);
                    }
                }
            }
        }
        Ok(ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn add_and_remove_are_idempotent() {
        let mut ledger = CompletionLedger::new();
        assert!(ledger.add(day(2024, 5, 10)));
        let once = ledger.clone();
        assert!(!ledger.add(day(2024, 5, 10)));
        assert_eq!(ledger, once);

        assert!(!ledger.remove(day(2024, 5, 11)));
        assert_eq!(ledger, once);
        assert!(ledger.remove(day(2024, 5, 10)));
        assert!(ledger.is_empty());
    }

    #[test]
    fn iterates_chronologically_regardless_of_insert_order() {
        let ledger: CompletionLedger = [day(2024, 5, 12), day(2024, 5, 1), day(2024, 5, 7)]
            .into_iter()
            .collect();
        assert_eq!(
            ledger.to_keys(),
            vec!["2024-05-01", "2024-05-07", "2024-05-12"]
        );
        assert_eq!(ledger.latest(), Some(day(2024, 5, 12)));
        assert_eq!(ledger.latest_before(day(2024, 5, 12)), Some(day(2024, 5, 7)));
        assert_eq!(ledger.latest_before(day(2024, 5, 1)), None);
    }

    #[test]
    fn deserializes_string_array_dropping_duplicates_and_keeping_garbage() {
        let ledger: CompletionLedger =
            serde_json::from_str(r#"["2024-05-11", "2024-05-10", "2024-05-11", "yesterday"]"#)
                .unwrap();
        assert_eq!(ledger.len(), 2);
        assert!(ledger.contains_key("2024-05-11"));
        assert!(!ledger.contains_key("2024-05-12"));
        assert!(!ledger.contains_key("yesterday"));
        assert_eq!(ledger.unparsed(), ["yesterday".to_string()]);

        let encoded = serde_json::to_string(&ledger).unwrap();
        assert_eq!(encoded, r#"["2024-05-10","2024-05-11","yesterday"]"#);
    }

    #[test]
    fn null_history_is_empty() {
        let ledger: CompletionLedger = serde_json::from_str("null").unwrap();
        assert!(ledger.is_empty());
    }
}
