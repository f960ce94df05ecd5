use crate::service::GoalSnapshot;

/// Receives the user's refreshed goal state after every successful mutation.
pub trait GoalChangeListener: Send + Sync {
    fn goals_changed(&self, snapshot: &GoalSnapshot);
}

impl<F> GoalChangeListener for F
where
    F: Fn(&GoalSnapshot) + Send + Sync,
{
    fn goals_changed(&self, snapshot: &GoalSnapshot) {
        self(snapshot)
    }
}
