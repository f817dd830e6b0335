use std::fmt::{Display, Formatter};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{FlowshopError, Result};

const SECONDS_PER_HOUR: f64 = 3600.0;
const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// One scheduled block of time. `priority` is a weight per hour and
/// `completed` the finished fraction in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    pub priority: f64,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    #[serde(default)]
    pub completed: f64,
}

/// A single field assignment applied by `Session::edit_task`.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskUpdate {
    Name(String),
    Priority(f64),
    StartTime(NaiveDateTime),
    EndTime(NaiveDateTime),
    Completed(f64),
}

impl Task {
    pub fn new(
        name: impl Into<String>,
        priority: f64,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
    ) -> Self {
        Self {
            name: name.into(),
            priority,
            start_time,
            end_time,
            completed: 0.0,
        }
    }

    pub fn with_completed(mut self, completed: f64) -> Self {
        self.completed = completed;
        self
    }

    pub fn date(&self) -> NaiveDate {
        self.start_time.date()
    }

    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    pub fn has_valid_duration(&self) -> bool {
        self.end_time > self.start_time
    }

    pub fn duration_hours(&self) -> Result<f64> {
        if !self.has_valid_duration() {
            return Err(FlowshopError::InvalidDuration(self.to_string()));
        }

        let seconds = self.duration().num_milliseconds() as f64 / 1000.0;
        Ok(seconds / SECONDS_PER_HOUR)
    }

    /// Maximum points available for this task: `priority * hours`.
    pub fn points(&self) -> Result<f64> {
        Ok(self.priority * self.duration_hours()?)
    }

    pub fn earned_points(&self) -> Result<f64> {
        Ok(self.points()? * self.completed)
    }

    pub fn apply(&mut self, update: TaskUpdate) {
        match update {
            TaskUpdate::Name(name) => self.name = name,
            TaskUpdate::Priority(priority) => self.priority = priority,
            TaskUpdate::StartTime(start_time) => self.start_time = start_time,
            TaskUpdate::EndTime(end_time) => self.end_time = end_time,
            TaskUpdate::Completed(completed) => self.completed = completed,
        }
    }

    /// The same task moved by `delta`, or `InvalidDuration` when either end
    /// would leave the representable calendar.
    pub fn shifted(&self, delta: Duration) -> Result<Self> {
        let out_of_range = || FlowshopError::InvalidDuration(format!("{self} shifted by {delta}"));
        Ok(Self {
            start_time: self.start_time.checked_add_signed(delta).ok_or_else(out_of_range)?,
            end_time: self.end_time.checked_add_signed(delta).ok_or_else(out_of_range)?,
            ..self.clone()
        })
    }
}

impl Display for Task {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "'{}' ({} - {})",
            self.name,
            self.start_time.format("%Y-%m-%d %H:%M"),
            self.end_time.format("%Y-%m-%d %H:%M")
        )
    }
}

/// Converts a fractional hour count into a chrono duration, rounded to the millisecond.
pub fn hours_to_duration(hours: f64) -> Result<Duration> {
    let millis = (hours * MILLIS_PER_HOUR).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return Err(FlowshopError::InvalidDuration(format!("{hours} hours")));
    }
    Duration::try_milliseconds(millis as i64)
        .ok_or_else(|| FlowshopError::InvalidDuration(format!("{hours} hours")))
}
