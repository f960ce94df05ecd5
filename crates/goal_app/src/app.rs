use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use goal_core::{
    clock::{FixedClock, LocalClock},
    config::EngineConfig,
    streak::UndoPolicy,
    timeline::{render_strip, DayView},
    Frequency, MicroGoal,
};
use goal_store::{
    service::{MacroGoalDraft, MicroGoalDraft},
    GoalService, GoalServiceBuilder,
};
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[command(name = "goals")]
#[command(about = "Track habits, streaks and today's agenda")]
pub struct Cli {
    /// JSON file holding every goal record
    #[arg(long, env = "GOAL_STORE_PATH", default_value = "goals.json")]
    pub store: PathBuf,

    /// Owner of the goals being listed or created
    #[arg(long, env = "GOAL_USER_ID", default_value = "local")]
    pub user: String,

    /// What undo does to the last-completed day: `keep` or `recompute`
    #[arg(long, env = "GOAL_UNDO_POLICY", default_value = "keep")]
    pub undo_policy: UndoPolicy,

    /// Pretend today is this day (YYYY-MM-DD)
    #[arg(long, env = "GOAL_TODAY")]
    pub today: Option<NaiveDate>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    pub fn config(&self) -> AppConfig {
        AppConfig {
            store_path: self.store.clone(),
            user_id: self.user.trim().to_string(),
            undo_policy: self.undo_policy,
            today: self.today,
        }
    }

    pub fn subcommand(&self) -> Command {
        self.command.clone().unwrap_or(Command::Agenda)
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub(crate) store_path: PathBuf,
    pub(crate) user_id: String,
    pub(crate) undo_policy: UndoPolicy,
    pub(crate) today: Option<NaiveDate>,
}

impl AppConfig {
    fn service(&self) -> Result<GoalService> {
        let builder = GoalServiceBuilder::new()
            .with_json_store(&self.store_path)
            .with_config(EngineConfig {
                undo_policy: self.undo_policy,
                ..EngineConfig::default()
            });
        let builder = match self.today {
            Some(date) => builder.with_clock(FixedClock(date)),
            None => builder.with_clock(LocalClock),
        };
        builder
            .build()
            .with_context(|| format!("failed to open {}", self.store_path.display()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Habits due today (the default)
    Agenda,
    /// Macro goals and anti-goals with their XP
    Goals,
    /// Seven-day view of one habit
    Timeline { id: String },
    /// Mark a habit done for today
    Toggle { id: String },
    /// Undo today's completion
    Undo { id: String },
    /// Create a macro goal
    AddGoal {
        /// Something to avoid rather than achieve
        #[arg(long)]
        anti: bool,
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },
    /// Create a habit under a macro goal
    AddHabit {
        macro_goal_id: String,
        title: String,
        /// daily, weekdays, weekends, or a day list such as mon,wed,fri
        schedule: Option<String>,
    },
}

pub fn run(config: AppConfig, command: Command) -> Result<()> {
    info!(path = %config.store_path.display(), user = %config.user_id, ?command, "starting");
    let service = config.service()?;
    let today = service.today();
    let user = config.user_id.as_str();

    match command {
        Command::Agenda => {
            let due = service.todays_goals(user)?;
            println!("{}", format_day_heading(today));
            if due.is_empty() {
                println!("  nothing due today");
            }
            for goal in &due {
                let days = service.timeline(&goal.id)?;
                println!("{}", describe_goal(goal, &days, today));
            }
        }
        Command::Goals => {
            for goal in service.list_macro_goals(user, true)? {
                let kind = if goal.is_anti_goal { "anti" } else { "goal" };
                let habits = service.micro_goals_for_macro(&goal.id)?;
                println!(
                    "[{kind}] {} {}  {}/{} XP  {} habit(s)",
                    goal.id,
                    goal.title,
                    goal.total_xp,
                    goal.target_xp,
                    habits.len()
                );
            }
        }
        Command::Timeline { id } => {
            let goal = service.micro_goal(&id)?;
            println!("{}", goal.title);
            for day in service.timeline(&id)? {
                println!("  {}", describe_day(&day));
            }
        }
        Command::Toggle { id } => {
            let goal = service.toggle_completion(&id, true)?;
            let days = service.timeline(&id)?;
            println!("{}", describe_goal(&goal, &days, today));
        }
        Command::Undo { id } => {
            let goal = service.toggle_completion(&id, false)?;
            let days = service.timeline(&id)?;
            println!("{}", describe_goal(&goal, &days, today));
        }
        Command::AddGoal { title, anti } => {
            let mut draft = MacroGoalDraft::new(title.join(" "));
            if anti {
                draft = draft.anti();
            }
            let goal = service.create_macro_goal(user, draft)?;
            println!("created {} {}", goal.id, goal.title);
        }
        Command::AddHabit {
            macro_goal_id,
            title,
            schedule,
        } => {
            let draft = apply_schedule(MicroGoalDraft::new(macro_goal_id, title), schedule.as_deref());
            let goal = service.create_micro_goal(user, draft)?;
            println!("created {} {} ({})", goal.id, goal.title, goal.frequency.as_str());
        }
    }
    debug!("done");
    Ok(())
}

fn apply_schedule(draft: MicroGoalDraft, schedule: Option<&str>) -> MicroGoalDraft {
    let Some(schedule) = schedule else {
        return draft;
    };
    match Frequency::from(schedule.trim().to_ascii_lowercase()) {
        Frequency::Unrecognized(_) => draft.with_custom_days(
            schedule
                .split(',')
                .map(|day| expand_day_name(day.trim()))
                .filter(|day| !day.is_empty()),
        ),
        frequency => draft.with_frequency(frequency),
    }
}

/// Accepts `mon`, `Mon` or `monday`.
fn expand_day_name(raw: &str) -> String {
    let lower = raw.to_ascii_lowercase();
    let full = match lower.as_str() {
        "mon" => "monday",
        "tue" | "tues" => "tuesday",
        "wed" => "wednesday",
        "thu" | "thur" | "thurs" => "thursday",
        "fri" => "friday",
        "sat" => "saturday",
        "sun" => "sunday",
        _ => return lower,
    };
    full.to_string()
}

fn format_day_heading(today: NaiveDate) -> String {
    today.format("%A, %B %d, %Y").to_string()
}

/// Lowercase distance from `today`, for use mid-sentence.
fn relative_day(date: NaiveDate, today: NaiveDate) -> String {
    match (date - today).num_days() {
        0 => "today".into(),
        -1 => "yesterday".into(),
        1 => "tomorrow".into(),
        ago @ ..=-2 => format!("{} days ago", -ago),
        ahead => format!("in {ahead} days"),
    }
}

fn describe_goal(goal: &MicroGoal, days: &[DayView], today: NaiveDate) -> String {
    let mark = if goal.was_completed_on(today) { "[x]" } else { "[ ]" };
    let last = goal
        .last_completed
        .map(|date| format!(", last {}", relative_day(date, today)))
        .unwrap_or_default();
    format!(
        "  {mark} {:<24} {}  streak {}{}  ({})",
        goal.title,
        render_strip(days),
        goal.streak,
        last,
        goal.id
    )
}

fn describe_day(day: &DayView) -> String {
    let state = match (day.is_completed, day.is_due) {
        (true, _) => "done",
        (false, false) => "not due",
        _ if day.is_today => "open",
        _ if day.is_past => "missed",
        _ => "upcoming",
    };
    format!("{:<5} {:>2}  {}", day.label(), day.day_of_month, state)
}
