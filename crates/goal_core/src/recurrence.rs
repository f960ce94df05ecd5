use chrono::{Datelike, NaiveDate, Weekday};

use crate::error::{GoalError, GoalResult};
use crate::model::{Frequency, MicroGoal};

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Typed view of a habit's frequency settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceRule {
    Daily,
    Weekdays,
    Weekends,
    Days(Vec<Weekday>),
    Never,
}

impl RecurrenceRule {
    /// Resolves the stored settings. Malformed settings become `Never`.
    pub fn from_goal(goal: &MicroGoal) -> Self {
        match &goal.frequency {
            Frequency::Daily => RecurrenceRule::Daily,
            Frequency::Weekdays => RecurrenceRule::Weekdays,
            Frequency::Weekends => RecurrenceRule::Weekends,
            Frequency::Custom => {
                let days: Vec<Weekday> = WEEK
                    .into_iter()
                    .filter(|day| goal.custom_days.iter().any(|name| name == weekday_name(*day)))
                    .collect();
                if days.is_empty() {
                    RecurrenceRule::Never
                } else {
                    RecurrenceRule::Days(days)
                }
            }
            Frequency::Unrecognized(_) => RecurrenceRule::Never,
        }
    }

    pub fn matches(&self, date: NaiveDate) -> bool {
        let weekday = date.weekday();
        match self {
            RecurrenceRule::Daily => true,
            RecurrenceRule::Weekdays => !is_weekend(weekday),
            RecurrenceRule::Weekends => is_weekend(weekday),
            RecurrenceRule::Days(days) => days.contains(&weekday),
            RecurrenceRule::Never => false,
        }
    }

    /// Rejects settings that would leave a habit permanently off the agenda.
    pub fn validate(goal: &MicroGoal) -> GoalResult<()> {
        match &goal.frequency {
            Frequency::Unrecognized(raw) => Err(GoalError::InvalidRule(format!(
                "unknown frequency `{raw}`"
            ))),
            Frequency::Custom => {
                if let Some(bad) = goal
                    .custom_days
                    .iter()
                    .find(|name| parse_weekday_name(name).is_none())
                {
                    return Err(GoalError::InvalidRule(format!(
                        "`{bad}` is not a weekday name"
                    )));
                }
                if goal.custom_days.is_empty() {
                    return Err(GoalError::InvalidRule(
                        "custom schedule needs at least one day".into(),
                    ));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Whether `goal` should be acted on during `date`.
pub fn is_due_on(goal: &MicroGoal, date: NaiveDate) -> bool {
    RecurrenceRule::from_goal(goal).matches(date)
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

pub fn weekday_short_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

pub fn parse_weekday_name(name: &str) -> Option<Weekday> {
    WEEK.into_iter().find(|day| weekday_name(*day) == name)
}

fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fortnight() -> impl Iterator<Item = NaiveDate> {
        let start = day(2024, 5, 6);
        (0..14).map(move |offset| start + Duration::days(offset))
    }

    #[test]
    fn daily_is_due_every_day() {
        let goal = MicroGoal::new("g", "Water");
        assert!(fortnight().all(|date| is_due_on(&goal, date)));
    }

    #[test]
    fn weekdays_and_weekends_split_the_week() {
        let weekdays = MicroGoal::new("a", "Work").with_frequency(Frequency::Weekdays);
        let weekends = MicroGoal::new("b", "Hike").with_frequency(Frequency::Weekends);
        for date in fortnight() {
            let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
            assert_eq!(is_due_on(&weekdays, date), !weekend, "{date}");
            assert_eq!(is_due_on(&weekends, date), weekend, "{date}");
        }
    }

    #[test]
    fn custom_days_match_lowercase_names() {
        let goal = MicroGoal::new("g", "Gym").with_custom_days(["monday", "wednesday", "friday"]);
        // 2024-05-14 is a Tuesday.
        assert!(!is_due_on(&goal, day(2024, 5, 14)));
        assert!(is_due_on(&goal, day(2024, 5, 13)));
        assert!(is_due_on(&goal, day(2024, 5, 15)));
        assert!(is_due_on(&goal, day(2024, 5, 17)));
        assert!(!is_due_on(&goal, day(2024, 5, 18)));
    }

    #[test]
    fn custom_without_days_is_never_due() {
        let goal = MicroGoal::new("g", "Nothing").with_custom_days(Vec::<String>::new());
        assert!(fortnight().all(|date| !is_due_on(&goal, date)));

        let capitalized = MicroGoal::new("g", "Caps").with_custom_days(["Monday"]);
        assert!(!is_due_on(&capitalized, day(2024, 5, 13)));
    }

    #[test]
    fn unrecognized_frequency_is_never_due() {
        let goal = MicroGoal::new("g", "Odd").with_frequency(Frequency::Unrecognized("hourly".into()));
        assert_eq!(RecurrenceRule::from_goal(&goal), RecurrenceRule::Never);
        assert!(fortnight().all(|date| !is_due_on(&goal, date)));
    }

    #[test]
    fn validate_flags_rules_that_can_never_fire() {
        let empty = MicroGoal::new("g", "x").with_custom_days(Vec::<String>::new());
        assert!(matches!(
            RecurrenceRule::validate(&empty),
            Err(GoalError::InvalidRule(_))
        ));
        let typo = MicroGoal::new("g", "x").with_custom_days(["mondai"]);
        assert!(RecurrenceRule::validate(&typo).is_err());
        let unknown = MicroGoal::new("g", "x").with_frequency(Frequency::Unrecognized("?".into()));
        assert!(RecurrenceRule::validate(&unknown).is_err());
        let fine = MicroGoal::new("g", "x").with_custom_days(["sunday"]);
        assert!(RecurrenceRule::validate(&fine).is_ok());
        // Days are ignored unless the frequency is custom.
        let daily = MicroGoal::new("g", "x");
        assert!(RecurrenceRule::validate(&daily).is_ok());
    }

    #[test]
    fn weekday_names_round_trip() {
        for day in WEEK {
            assert_eq!(parse_weekday_name(weekday_name(day)), Some(day));
        }
        assert_eq!(weekday_short_name(Weekday::Sat), "Sat");
    }
}
