use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{FlowshopError, Result};
use crate::task::Task;

/// An ordered, overlap-free set of tasks for one plan variant.
///
/// Tasks are kept sorted by start time. Adjacent tasks may share a boundary
/// instant but never overlap, and every task ends after it starts. The only
/// way to obtain a `Schedule` is through a constructor or mutator that has
/// checked both rules, so a value in hand is always valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScheduleRecord")]
pub struct Schedule {
    name: String,
    tasks: Vec<Task>,
}

#[derive(Deserialize)]
struct ScheduleRecord {
    name: String,
    #[serde(default)]
    tasks: Vec<Task>,
}

impl TryFrom<ScheduleRecord> for Schedule {
    type Error = FlowshopError;

    fn try_from(record: ScheduleRecord) -> Result<Self> {
        Schedule::with_tasks(record.name, record.tasks)
    }
}

impl Schedule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tasks: Vec::new(),
        }
    }

    pub fn with_tasks(name: impl Into<String>, mut tasks: Vec<Task>) -> Result<Self> {
        sort_tasks(&mut tasks);
        check_tasks(&tasks)?;
        Ok(Self {
            name: name.into(),
            tasks,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Inserts `task` at its sorted position. On failure the schedule is left untouched.
    pub fn add_task(&mut self, task: Task) -> Result<()> {
        let mut tasks = self.tasks.clone();
        tasks.push(task);
        sort_tasks(&mut tasks);
        check_tasks(&tasks)?;
        self.tasks = tasks;
        Ok(())
    }

    pub fn remove_task(&mut self, index: usize) -> Result<Task> {
        if index >= self.tasks.len() {
            return Err(FlowshopError::Index(format!(
                "task {index} of schedule '{}' with {} tasks",
                self.name,
                self.tasks.len()
            )));
        }
        Ok(self.tasks.remove(index))
    }

    /// Maps the `daily_index`-th task on `day` to its position in `tasks()`.
    ///
    /// Tasks sorted by start time are also sorted by date, so a binary search
    /// lands on some task of `day`; walking back from there finds the first one.
    pub fn get_task_index(&self, day: NaiveDate, daily_index: usize) -> Result<usize> {
        let found = self
            .tasks
            .binary_search_by(|task| task.date().cmp(&day))
            .map_err(|_| FlowshopError::NotFound(format!("no tasks on {day}")))?;

        let mut first = found;
        while first > 0 && self.tasks[first - 1].date() == day {
            first -= 1;
        }

        match first.checked_add(daily_index) {
            Some(position)
                if position < self.tasks.len() && self.tasks[position].date() == day =>
            {
                Ok(position)
            }
            _ => Err(FlowshopError::Index(format!(
                "task {daily_index} on {day}"
            ))),
        }
    }

    pub fn tasks_on(&self, day: NaiveDate) -> &[Task] {
        let start = self.tasks.partition_point(|task| task.date() < day);
        let end = self.tasks.partition_point(|task| task.date() <= day);
        &self.tasks[start..end]
    }

    /// Tasks that start inside, end inside, or fully surround `[start, end)`.
    pub fn tasks_in_interval(&self, start: NaiveDateTime, end: NaiveDateTime) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|task| {
                let starts_inside = start <= task.start_time && task.start_time < end;
                let ends_inside = start < task.end_time && task.end_time <= end;
                let surrounds = task.start_time <= start && task.end_time >= end;
                starts_inside || ends_inside || surrounds
            })
            .collect()
    }

    pub fn points(&self) -> Result<f64> {
        sum_points(self.tasks.iter(), Task::points)
    }

    pub fn earned_points(&self) -> Result<f64> {
        sum_points(self.tasks.iter(), Task::earned_points)
    }

    pub fn interval_points(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<f64> {
        sum_points(self.tasks_in_interval(start, end).into_iter(), Task::points)
    }

    pub fn earned_interval_points(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<f64> {
        sum_points(
            self.tasks_in_interval(start, end).into_iter(),
            Task::earned_points,
        )
    }
}

fn sum_points<'a>(
    tasks: impl Iterator<Item = &'a Task>,
    points: fn(&Task) -> Result<f64>,
) -> Result<f64> {
    tasks.map(points).sum()
}

fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by_key(|task| task.start_time);
}

fn check_tasks(tasks: &[Task]) -> Result<()> {
    if let Some(task) = tasks.iter().find(|task| !task.has_valid_duration()) {
        return Err(FlowshopError::InvalidDuration(task.to_string()));
    }

    for pair in tasks.windows(2) {
        if pair[0].end_time > pair[1].start_time {
            return Err(FlowshopError::Overlap {
                first: pair[0].to_string(),
                second: pair[1].to_string(),
            });
        }
    }

    Ok(())
}
