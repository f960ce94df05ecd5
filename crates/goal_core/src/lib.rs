pub mod agenda;
pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;
pub mod model;
pub mod recurrence;
pub mod streak;
pub mod timeline;

pub use crate::error::{GoalError, GoalResult};
pub use crate::ledger::CompletionLedger;
pub use crate::model::{Frequency, MacroGoal, MicroGoal};
