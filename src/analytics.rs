use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{FlowshopError, Result};
use crate::schedule::Schedule;
use crate::task::Task;

pub const DAYS_IN_WEEK: i64 = 7;
const PERFECT_SCORE: f64 = 100.0;

/// `base_date + day`, or an `Index` error when that date does not exist.
pub fn day_date(base_date: NaiveDate, day: i64) -> Result<NaiveDate> {
    Duration::try_days(day)
        .and_then(|offset| base_date.checked_add_signed(offset))
        .ok_or_else(|| FlowshopError::Index(format!("day {day} from {base_date}")))
}

/// The Monday of the week containing `date`. Fails when that week does not fit
/// in the calendar, including the following Monday.
pub fn week_start(date: NaiveDate) -> Result<NaiveDate> {
    let days_from_monday = i64::from(date.weekday().num_days_from_monday());
    let monday = day_date(date, -days_from_monday)?;
    day_date(monday, DAYS_IN_WEEK)?;
    Ok(monday)
}

/// Midnight of `base_date` and midnight seven days later.
pub fn week_bounds(base_date: NaiveDate) -> Result<(NaiveDateTime, NaiveDateTime)> {
    let end = day_date(base_date, DAYS_IN_WEEK)?;
    Ok((base_date.and_time(NaiveTime::MIN), end.and_time(NaiveTime::MIN)))
}

pub fn num_daily_tasks(schedule: &Schedule, base_date: NaiveDate, day: i64) -> Result<usize> {
    Ok(schedule.tasks_on(day_date(base_date, day)?).len())
}

/// Points of the tasks on `base_date + day`, or, when `cumulative`, of every task
/// dated from `base_date` through `base_date + day`.
pub fn daily_points(
    schedule: &Schedule,
    base_date: NaiveDate,
    day: i64,
    cumulative: bool,
) -> Result<f64> {
    let target = day_date(base_date, day)?;
    let first = if cumulative { base_date } else { target };
    schedule
        .tasks()
        .iter()
        .filter(|task| (first..=target).contains(&task.date()))
        .map(Task::points)
        .sum()
}

/// Actual points as a percentage of planned points. Nothing planned scores 100.
pub fn daily_score(
    planned: &Schedule,
    actual: &Schedule,
    base_date: NaiveDate,
    day: i64,
    cumulative: bool,
) -> Result<f64> {
    let planned_points = daily_points(planned, base_date, day, cumulative)?;
    if planned_points == 0.0 {
        return Ok(PERFECT_SCORE);
    }

    let actual_points = daily_points(actual, base_date, day, cumulative)?;
    Ok(PERFECT_SCORE * actual_points / planned_points)
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayStats {
    pub date: NaiveDate,
    pub planned_points: f64,
    pub actual_points: f64,
    pub score: f64,
    pub cumulative_score: f64,
}

/// One row per day of the week starting at `base_date`.
pub fn week_stats(planned: &Schedule, actual: &Schedule, base_date: NaiveDate) -> Result<Vec<DayStats>> {
    (0..DAYS_IN_WEEK)
        .map(|day| {
            Ok(DayStats {
                date: day_date(base_date, day)?,
                planned_points: daily_points(planned, base_date, day, false)?,
                actual_points: daily_points(actual, base_date, day, false)?,
                score: daily_score(planned, actual, base_date, day, false)?,
                cumulative_score: daily_score(planned, actual, base_date, day, true)?,
            })
        })
        .collect()
}
