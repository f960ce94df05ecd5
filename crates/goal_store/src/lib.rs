pub mod json;
pub mod listener;
pub mod service;
pub mod store;

pub use crate::json::JsonFileGoalStore;
pub use crate::listener::GoalChangeListener;
pub use crate::service::{GoalService, GoalServiceBuilder, GoalSnapshot};
pub use crate::store::{GoalStore, InMemoryGoalStore};
