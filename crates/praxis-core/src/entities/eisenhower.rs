use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::Quadrant;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EisenhowerTask {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub notes: Option<String>,
    pub urgent: bool,
    pub important: bool,
    /// Derived from `urgent` and `important`; never stored.
    pub quadrant: Quadrant,
    pub done: bool,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Tasks grouped by quadrant.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EisenhowerMatrix {
    #[serde(rename = "do")]
    pub do_now: Vec<EisenhowerTask>,
    pub schedule: Vec<EisenhowerTask>,
    pub delegate: Vec<EisenhowerTask>,
    pub eliminate: Vec<EisenhowerTask>,
}

impl EisenhowerMatrix {
    #[must_use]
    pub fn from_tasks(tasks: Vec<EisenhowerTask>) -> Self {
        let mut matrix = Self::default();
        for task in tasks {
            match task.quadrant {
                Quadrant::Do => matrix.do_now.push(task),
                Quadrant::Schedule => matrix.schedule.push(task),
                Quadrant::Delegate => matrix.delegate.push(task),
                Quadrant::Eliminate => matrix.eliminate.push(task),
            }
        }
        matrix
    }
}
