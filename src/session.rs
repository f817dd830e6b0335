use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::analytics::{self, DAYS_IN_WEEK, day_date, week_start};
use crate::error::{FlowshopError, Result};
use crate::schedule::Schedule;
use crate::storage::SessionStore;
use crate::task::{Task, TaskUpdate, hours_to_duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    Planned,
    Actual,
}

impl Plan {
    pub fn toggle(self) -> Self {
        match self {
            Plan::Planned => Plan::Actual,
            Plan::Actual => Plan::Planned,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Plan::Planned => "Planned",
            Plan::Actual => "Actual",
        }
    }
}

/// One point in edit history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulePair {
    pub planned: Schedule,
    pub actual: Schedule,
}

impl SchedulePair {
    pub fn get(&self, plan: Plan) -> &Schedule {
        match plan {
            Plan::Planned => &self.planned,
            Plan::Actual => &self.actual,
        }
    }

    fn get_mut(&mut self, plan: Plan) -> &mut Schedule {
        match plan {
            Plan::Planned => &mut self.planned,
            Plan::Actual => &mut self.actual,
        }
    }

    fn is_pristine(&self) -> bool {
        self.planned.is_empty() && self.actual.is_empty()
    }
}

/// Everything a persistence backend needs to restore a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub name: String,
    pub edit_history: Vec<SchedulePair>,
    pub history_pos: usize,
    pub base_date: NaiveDate,
}

/// A planned/actual schedule pair edited through a branching undo history.
///
/// Every edit clones the active pair, applies the change to the clone and only
/// then hands it to `set_new_schedules`, so a failed edit never touches history.
#[derive(Debug, Clone)]
pub struct Session {
    name: String,
    base_date: NaiveDate,
    edit_history: Vec<SchedulePair>,
    history_pos: usize,
}

impl Session {
    /// A session with one empty snapshot, showing the week that contains `today`.
    pub fn fresh(name: impl Into<String>, today: NaiveDate) -> Result<Self> {
        let name = name.into();
        let pristine = SchedulePair {
            planned: Schedule::new(format!("{name}_planned")),
            actual: Schedule::new(format!("{name}_actual")),
        };
        Ok(Self {
            name,
            base_date: week_start(today)?,
            edit_history: vec![pristine],
            history_pos: 0,
        })
    }

    pub fn create(name: &str, store: &dyn SessionStore) -> Result<Self> {
        store.check_name(name)?;
        if store.exists(name) {
            return Err(FlowshopError::AlreadyExists(name.to_string()));
        }
        info!("creating session {name}");
        Self::fresh(name, Local::now().date_naive())
    }

    pub fn load(name: &str, store: &dyn SessionStore) -> Result<Self> {
        store.check_name(name)?;
        if !store.exists(name) {
            return Err(FlowshopError::NotFound(format!("no saved session with name {name}")));
        }
        let session = Self::from_state(store.load(name)?)?;
        if session.name != name {
            return Err(FlowshopError::InvalidState(format!(
                "file for session {name} holds session {}",
                session.name
            )));
        }
        info!(
            "loaded session {name} ({} snapshots, position {})",
            session.edit_history.len(),
            session.history_pos
        );
        Ok(session)
    }

    pub fn save(&self, store: &dyn SessionStore) -> Result<()> {
        store.save(&self.name, &self.to_state())?;
        info!("saved session {}", self.name);
        Ok(())
    }

    pub fn from_state(state: SessionState) -> Result<Self> {
        let Some(first) = state.edit_history.first() else {
            return Err(FlowshopError::InvalidState("edit history is empty".to_string()));
        };
        if !first.is_pristine() {
            return Err(FlowshopError::InvalidState(
                "first snapshot must hold empty schedules".to_string(),
            ));
        }
        if state.history_pos >= state.edit_history.len() {
            return Err(FlowshopError::InvalidState(format!(
                "history position {} outside {} snapshots",
                state.history_pos,
                state.edit_history.len()
            )));
        }
        if day_date(state.base_date, DAYS_IN_WEEK).is_err() {
            return Err(FlowshopError::InvalidState(format!(
                "week of {} is outside the calendar",
                state.base_date
            )));
        }

        Ok(Self {
            name: state.name,
            base_date: state.base_date,
            edit_history: state.edit_history,
            history_pos: state.history_pos,
        })
    }

    pub fn to_state(&self) -> SessionState {
        SessionState {
            name: self.name.clone(),
            edit_history: self.edit_history.clone(),
            history_pos: self.history_pos,
            base_date: self.base_date,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_date(&self) -> NaiveDate {
        self.base_date
    }

    pub fn edit_history(&self) -> &[SchedulePair] {
        &self.edit_history
    }

    pub fn history_pos(&self) -> usize {
        self.history_pos
    }

    pub fn current_schedules(&self) -> &SchedulePair {
        &self.edit_history[self.history_pos]
    }

    pub fn schedule(&self, plan: Plan) -> &Schedule {
        self.current_schedules().get(plan)
    }

    pub fn date_for_day(&self, day: i64) -> Result<NaiveDate> {
        day_date(self.base_date, day)
    }

    /// Records a validated pair as the next point in history.
    ///
    /// At the head of history the pair is appended. Otherwise the redo branch is
    /// dropped and replaced, unless the next stored pair already equals the new
    /// one, in which case this is a plain redo.
    pub fn set_new_schedules(&mut self, planned: Schedule, actual: Schedule) {
        let pair = SchedulePair { planned, actual };
        if self.history_pos + 1 == self.edit_history.len() {
            self.edit_history.push(pair);
            self.history_pos = self.edit_history.len() - 1;
            debug!("appended snapshot {}", self.history_pos);
        } else if self.edit_history[self.history_pos + 1] != pair {
            self.edit_history.truncate(self.history_pos + 1);
            self.edit_history.push(pair);
            self.history_pos += 1;
            debug!("replaced redo branch at snapshot {}", self.history_pos);
        } else {
            self.history_pos += 1;
            debug!("edit matches snapshot {}, advancing", self.history_pos);
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history_pos > 0
    }

    pub fn can_redo(&self) -> bool {
        self.history_pos + 1 < self.edit_history.len()
    }

    pub fn undo(&mut self) {
        if self.can_undo() {
            self.history_pos -= 1;
        }
    }

    pub fn redo(&mut self) {
        if self.can_redo() {
            self.history_pos += 1;
        }
    }

    /// Shows the next or previous week. At the edge of the calendar this fails and the view stays put.
    pub fn move_week(&mut self, forward: bool) -> Result<()> {
        let days = if forward { DAYS_IN_WEEK } else { -DAYS_IN_WEEK };
        self.base_date = week_start(day_date(self.base_date, days)?)?;
        Ok(())
    }

    pub fn jump_to_week(&mut self, date: NaiveDate) -> Result<()> {
        self.base_date = week_start(date)?;
        Ok(())
    }

    pub fn get_task(&self, plan: Plan, day: i64, task_index: usize) -> Result<&Task> {
        let schedule = self.schedule(plan);
        let index = schedule.get_task_index(self.date_for_day(day)?, task_index)?;
        Ok(&schedule.tasks()[index])
    }

    pub fn add_task(&mut self, plan: Plan, task: Task) -> Result<()> {
        self.commit(plan, |schedule| schedule.add_task(task))
    }

    pub fn insert_task(
        &mut self,
        plan: Plan,
        day: i64,
        name: impl Into<String>,
        priority: f64,
        start: NaiveTime,
        hours: f64,
    ) -> Result<()> {
        let start_time = NaiveDateTime::new(self.date_for_day(day)?, start);
        let end_time = start_time
            .checked_add_signed(hours_to_duration(hours)?)
            .ok_or_else(|| FlowshopError::InvalidDuration(format!("{hours} hours from {start_time}")))?;
        self.add_task(plan, Task::new(name, priority, start_time, end_time))
    }

    pub fn edit_task(
        &mut self,
        plan: Plan,
        day: i64,
        task_index: usize,
        updates: impl IntoIterator<Item = TaskUpdate>,
    ) -> Result<()> {
        let date = self.date_for_day(day)?;
        self.commit(plan, |schedule| {
            let index = schedule.get_task_index(date, task_index)?;
            let mut tasks = schedule.tasks().to_vec();
            for update in updates {
                tasks[index].apply(update);
            }
            *schedule = Schedule::with_tasks(schedule.name(), tasks)?;
            Ok(())
        })
    }

    pub fn delete_task(&mut self, plan: Plan, day: i64, task_index: usize) -> Result<Task> {
        let date = self.date_for_day(day)?;
        self.commit(plan, |schedule| {
            let index = schedule.get_task_index(date, task_index)?;
            schedule.remove_task(index)
        })
    }

    /// Deletes a task and pulls the rest of that day's later tasks back by its duration.
    pub fn delete_task_and_close_gap(
        &mut self,
        plan: Plan,
        day: i64,
        task_index: usize,
    ) -> Result<Task> {
        let date = self.date_for_day(day)?;
        self.commit(plan, |schedule| {
            let index = schedule.get_task_index(date, task_index)?;
            let mut tasks = schedule.tasks().to_vec();
            let removed = tasks.remove(index);
            let gap = removed.duration();
            for task in tasks[index..].iter_mut().take_while(|task| task.date() == date) {
                *task = task.shifted(-gap)?;
            }
            *schedule = Schedule::with_tasks(schedule.name(), tasks)?;
            Ok(removed)
        })
    }

    /// Shifts the day's tasks `start_index..end_index` by `delta`.
    pub fn move_tasks(
        &mut self,
        plan: Plan,
        day: i64,
        start_index: usize,
        end_index: usize,
        delta: Duration,
    ) -> Result<()> {
        if start_index >= end_index {
            return Err(FlowshopError::Index(format!(
                "empty task range {start_index}..{end_index}"
            )));
        }

        let date = self.date_for_day(day)?;
        self.commit(plan, |schedule| {
            let indices = (start_index..end_index)
                .map(|daily_index| schedule.get_task_index(date, daily_index))
                .collect::<Result<Vec<_>>>()?;
            let mut tasks = schedule.tasks().to_vec();
            for index in indices {
                tasks[index] = tasks[index].shifted(delta)?;
            }
            *schedule = Schedule::with_tasks(schedule.name(), tasks)?;
            Ok(())
        })
    }

    pub fn num_daily_tasks(&self, plan: Plan, day: i64) -> Result<usize> {
        analytics::num_daily_tasks(self.schedule(plan), self.base_date, day)
    }

    pub fn daily_points(&self, day: i64, plan: Plan, cumulative: bool) -> Result<f64> {
        analytics::daily_points(self.schedule(plan), self.base_date, day, cumulative)
    }

    pub fn daily_score(&self, day: i64, cumulative: bool) -> Result<f64> {
        let pair = self.current_schedules();
        analytics::daily_score(&pair.planned, &pair.actual, self.base_date, day, cumulative)
    }

    pub fn week_stats(&self) -> Result<Vec<analytics::DayStats>> {
        let pair = self.current_schedules();
        analytics::week_stats(&pair.planned, &pair.actual, self.base_date)
    }

    fn commit<T>(
        &mut self,
        plan: Plan,
        edit: impl FnOnce(&mut Schedule) -> Result<T>,
    ) -> Result<T> {
        let mut next = self.current_schedules().clone();
        let output = edit(next.get_mut(plan))?;
        self.set_new_schedules(next.planned, next.actual);
        Ok(output)
    }
}

/// The sample data set: six planned and six actual tasks spread over the
/// first days of May 2020, inserted one at a time.
pub fn example_session(name: &str, store: &dyn SessionStore) -> Result<Session> {
    let mut session = Session::create(name, store)?;
    let (planned, actual) = example_tasks();
    for task in planned {
        session.add_task(Plan::Planned, task)?;
    }
    for task in actual {
        session.add_task(Plan::Actual, task)?;
    }
    session.jump_to_week(example_day(5, 1))?;
    Ok(session)
}

fn example_tasks() -> (Vec<Task>, Vec<Task>) {
    let at = |month: u32, day: u32, hour: u32, minute: u32| {
        example_day(month, day)
            .and_hms_opt(hour, minute, 0)
            .unwrap_or_default()
    };
    let planned = vec![
        Task::new("task1", 1.0, at(5, 1, 12, 0), at(5, 1, 13, 30)),
        Task::new("task2", 1.0, at(5, 1, 13, 30), at(5, 1, 14, 30)),
        Task::new("task3", 2.0, at(5, 2, 12, 0), at(5, 2, 13, 30)),
        Task::new("task4", 2.0, at(5, 2, 23, 0), at(5, 2, 23, 30)),
        Task::new("task5", 1.0, at(5, 3, 1, 30), at(5, 3, 1, 59)),
        Task::new("task6", 1.0, at(6, 3, 1, 30), at(6, 3, 1, 59)),
    ];
    let actual = vec![
        Task::new("task1", 1.0, at(5, 1, 12, 0), at(5, 1, 13, 30)),
        Task::new("task2", 1.0, at(5, 1, 14, 0), at(5, 1, 15, 0)),
        Task::new("task3", 2.0, at(5, 2, 11, 0), at(5, 2, 12, 30)),
        Task::new("task4", 2.0, at(5, 2, 13, 0), at(5, 2, 13, 30)),
        Task::new("task5", 1.0, at(5, 3, 1, 30), at(5, 3, 1, 59)),
        Task::new("task6", 1.0, at(6, 3, 2, 30), at(6, 3, 2, 59)),
    ];
    (planned, actual)
}

fn example_day(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, month, day).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

    use crate::error::FlowshopError;
    use crate::schedule::Schedule;
    use crate::storage::{SessionStore, StorageError};
    use crate::task::{Task, TaskUpdate};

    use super::{Plan, Session, SessionState, example_session};

    #[derive(Default)]
    struct MemoryStore {
        sessions: RefCell<HashMap<String, SessionState>>,
    }

    impl SessionStore for MemoryStore {
        fn exists(&self, name: &str) -> bool {
            self.sessions.borrow().contains_key(name)
        }

        fn save(&self, name: &str, state: &SessionState) -> Result<(), StorageError> {
            self.sessions
                .borrow_mut()
                .insert(name.to_string(), state.clone());
            Ok(())
        }

        fn load(&self, name: &str) -> Result<SessionState, StorageError> {
            self.sessions
                .borrow()
                .get(name)
                .cloned()
                .ok_or_else(|| StorageError::NotFound(name.to_string()))
        }
    }

    fn at(month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, month, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn time(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    /// The example session with the first planned task on day 4 (Friday 2020-05-01).
    fn example() -> Session {
        let store = MemoryStore::default();
        example_session("example", &store).expect("example session")
    }

    fn fresh() -> Session {
        Session::fresh("test", NaiveDate::from_ymd_opt(2020, 4, 29).unwrap()).expect("fresh session")
    }

    fn assert_sorted_and_disjoint(schedule: &Schedule) {
        for pair in schedule.tasks().windows(2) {
            assert!(pair[0].start_time <= pair[1].start_time);
            assert!(pair[0].end_time <= pair[1].start_time);
        }
    }

    #[test]
    fn fresh_session_starts_on_monday_with_empty_pair() {
        let session = fresh();
        assert_eq!(session.base_date(), NaiveDate::from_ymd_opt(2020, 4, 27).unwrap());
        assert_eq!(session.history_pos(), 0);
        assert_eq!(session.edit_history().len(), 1);
        assert!(session.current_schedules().planned.is_empty());
        assert_eq!(session.current_schedules().actual.name(), "test_actual");
    }

    #[test]
    fn jumps_to_monday_of_any_day() {
        let mut session = fresh();
        let monday = NaiveDate::from_ymd_opt(2020, 4, 27).unwrap();
        session.jump_to_week(monday).expect("jump");
        assert_eq!(session.base_date(), monday);
        session
            .jump_to_week(NaiveDate::from_ymd_opt(2020, 5, 3).unwrap())
            .expect("jump");
        assert_eq!(session.base_date(), monday);

        assert!(matches!(
            session.jump_to_week(NaiveDate::MAX),
            Err(FlowshopError::Index(_))
        ));
        assert_eq!(session.base_date(), monday);
    }

    #[test]
    fn example_session_records_every_insert() {
        let session = example();
        assert_eq!(session.history_pos(), 12);
        assert_eq!(session.edit_history().len(), 13);
        assert!(session.edit_history()[0].planned.is_empty());
        assert_eq!(session.edit_history()[6].planned.len(), 6);
        assert!(session.edit_history()[6].actual.is_empty());
        assert_eq!(session.edit_history()[12].actual.len(), 6);
        assert_eq!(session.base_date(), NaiveDate::from_ymd_opt(2020, 4, 27).unwrap());
    }

    #[test]
    fn set_new_schedules_appends_at_head() {
        let mut session = fresh();
        let planned = Schedule::with_tasks(
            "planned",
            vec![Task::new("planned_task", 1.0, at(5, 1, 12, 0), at(5, 1, 13, 30))],
        )
        .unwrap();
        let actual = Schedule::with_tasks(
            "actual",
            vec![Task::new("actual_task", 1.0, at(5, 1, 13, 0), at(5, 1, 14, 30))],
        )
        .unwrap();
        session.set_new_schedules(planned.clone(), actual.clone());

        assert_eq!(session.history_pos(), 1);
        assert_eq!(session.edit_history().len(), 2);
        assert_eq!(session.current_schedules().planned, planned);
        assert_eq!(session.current_schedules().actual, actual);
    }

    #[test]
    fn set_new_schedules_replaces_redo_branch() {
        let mut session = fresh();
        let first = Schedule::with_tasks(
            "planned_1",
            vec![Task::new("planned_task_1", 1.0, at(5, 1, 12, 0), at(5, 1, 13, 30))],
        )
        .unwrap();
        let second = Schedule::with_tasks(
            "planned_2",
            vec![Task::new("planned_task_2", 1.0, at(5, 1, 12, 30), at(5, 1, 14, 0))],
        )
        .unwrap();

        session.set_new_schedules(first.clone(), Schedule::new("actual"));
        session.set_new_schedules(first, Schedule::new("actual_2"));
        session.undo();
        session.undo();
        session.set_new_schedules(second.clone(), Schedule::new("actual"));

        assert_eq!(session.history_pos(), 1);
        assert_eq!(session.edit_history().len(), 2);
        assert_eq!(session.current_schedules().planned, second);
        assert!(!session.can_redo());
    }

    #[test]
    fn set_new_schedules_collapses_identical_edit_into_redo() {
        let mut session = fresh();
        let planned = Schedule::with_tasks(
            "planned",
            vec![Task::new("planned_task", 1.0, at(5, 1, 12, 0), at(5, 1, 13, 30))],
        )
        .unwrap();
        let dummy = Schedule::with_tasks(
            "planned",
            vec![
                Task::new("planned_task", 1.0, at(5, 1, 12, 0), at(5, 1, 13, 30)),
                Task::new("planned_dummy", 1.0, at(5, 2, 12, 0), at(5, 2, 13, 30)),
            ],
        )
        .unwrap();

        session.set_new_schedules(planned.clone(), Schedule::new("actual"));
        session.set_new_schedules(dummy.clone(), Schedule::new("actual"));
        session.undo();
        session.undo();
        session.set_new_schedules(planned.clone(), Schedule::new("actual"));

        assert_eq!(session.history_pos(), 1);
        assert_eq!(session.edit_history().len(), 3);
        assert_eq!(session.edit_history()[2].planned, dummy);
        assert!(session.can_redo());
    }

    #[test]
    fn undo_and_redo_stop_at_the_ends() {
        let mut session = fresh();
        session.undo();
        assert_eq!(session.history_pos(), 0);

        session
            .insert_task(Plan::Planned, 0, "a", 1.0, time(9, 0), 1.0)
            .expect("insert");
        session.redo();
        assert_eq!(session.history_pos(), 1);

        session.undo();
        assert_eq!(session.history_pos(), 0);
        assert!(session.current_schedules().planned.is_empty());
        session.redo();
        assert_eq!(session.history_pos(), 1);
        assert_eq!(session.current_schedules().planned.len(), 1);
    }

    #[test]
    fn undo_then_redo_restores_post_edit_state() {
        let mut session = example();
        session
            .edit_task(Plan::Actual, 5, 1, [TaskUpdate::Completed(1.0)])
            .expect("edit");
        let after_edit = session.current_schedules().clone();
        let position = session.history_pos();

        session.undo();
        assert_ne!(session.current_schedules(), &after_edit);
        session.redo();
        assert_eq!(session.current_schedules(), &after_edit);
        assert_eq!(session.history_pos(), position);
    }

    #[test]
    fn repeating_an_undone_edit_advances_without_growing() {
        let mut session = example();
        session.delete_task(Plan::Planned, 4, 0).expect("delete");
        let length = session.edit_history().len();
        session.undo();
        let position = session.history_pos();

        session.delete_task(Plan::Planned, 4, 0).expect("delete again");
        assert_eq!(session.history_pos(), position + 1);
        assert_eq!(session.edit_history().len(), length);
    }

    #[test]
    fn inserts_from_day_offset_and_time_of_day() {
        let mut session = fresh();
        session
            .insert_task(Plan::Actual, 2, "focus", 2.0, time(9, 15), 1.5)
            .expect("insert");

        assert_eq!(session.history_pos(), 1);
        assert!(session.current_schedules().planned.is_empty());
        let task = session.get_task(Plan::Actual, 2, 0).expect("task");
        assert_eq!(task.start_time, at(4, 29, 9, 15));
        assert_eq!(task.end_time, at(4, 29, 10, 45));
        assert_eq!(task.completed, 0.0);
        assert_eq!(session.num_daily_tasks(Plan::Actual, 2).unwrap(), 1);
        assert_eq!(session.num_daily_tasks(Plan::Planned, 2).unwrap(), 0);
    }

    #[test]
    fn rejected_insert_leaves_history_untouched() {
        let mut session = example();
        let history = session.edit_history().to_vec();
        let position = session.history_pos();

        let err = session
            .add_task(
                Plan::Planned,
                Task::new("clash", 1.0, at(5, 1, 13, 0), at(5, 1, 14, 0)),
            )
            .expect_err("overlaps task1");
        assert!(matches!(err, FlowshopError::Overlap { .. }));
        assert_eq!(session.edit_history(), history.as_slice());
        assert_eq!(session.history_pos(), position);
    }

    #[test]
    fn get_task_reports_missing_days_and_indices() {
        let session = example();
        assert_eq!(session.get_task(Plan::Planned, 5, 1).unwrap().name, "task4");
        assert!(matches!(
            session.get_task(Plan::Planned, 0, 0),
            Err(FlowshopError::NotFound(_))
        ));
        assert!(matches!(
            session.get_task(Plan::Planned, 4, 2),
            Err(FlowshopError::Index(_))
        ));
    }

    #[test]
    fn edits_task_name() {
        let mut session = example();
        let before = session.edit_history().to_vec();
        session
            .edit_task(Plan::Planned, 4, 0, [TaskUpdate::Name("new_name".to_string())])
            .expect("edit");

        assert_eq!(session.history_pos(), 13);
        assert_eq!(&session.edit_history()[..13], before.as_slice());
        let edited = &session.current_schedules().planned.tasks()[0];
        assert_eq!(edited.name, "new_name");
        assert_eq!(edited.start_time, at(5, 1, 12, 0));
        assert_eq!(session.current_schedules().actual, before[12].actual);
    }

    #[test]
    fn edit_that_reorders_tasks_resorts() {
        let mut session = example();
        session
            .edit_task(
                Plan::Planned,
                4,
                0,
                [
                    TaskUpdate::StartTime(at(5, 1, 16, 0)),
                    TaskUpdate::EndTime(at(5, 1, 17, 0)),
                ],
            )
            .expect("edit");

        let planned = &session.current_schedules().planned;
        assert_eq!(planned.tasks()[0].name, "task2");
        assert_eq!(planned.tasks()[1].name, "task1");
        assert_sorted_and_disjoint(planned);
    }

    #[test]
    fn edit_that_overlaps_fails_atomically() {
        let mut session = example();
        let history = session.edit_history().to_vec();
        let err = session
            .edit_task(Plan::Planned, 4, 0, [TaskUpdate::EndTime(at(5, 1, 14, 0))])
            .expect_err("runs into task2");
        assert!(matches!(err, FlowshopError::Overlap { .. }));
        assert_eq!(session.edit_history(), history.as_slice());
        assert_eq!(session.history_pos(), 12);

        let err = session
            .edit_task(Plan::Planned, 4, 0, [TaskUpdate::EndTime(at(5, 1, 11, 0))])
            .expect_err("ends before start");
        assert!(matches!(err, FlowshopError::InvalidDuration(_)));
        assert_eq!(session.edit_history(), history.as_slice());
    }

    #[test]
    fn deletes_task() {
        let mut session = example();
        let removed = session.delete_task(Plan::Actual, 5, 0).expect("delete");
        assert_eq!(removed.name, "task3");
        assert_eq!(session.history_pos(), 13);
        assert_eq!(session.current_schedules().actual.len(), 5);
        assert_eq!(session.get_task(Plan::Actual, 5, 0).unwrap().name, "task4");
        assert!(matches!(
            session.delete_task(Plan::Actual, 1, 0),
            Err(FlowshopError::NotFound(_))
        ));
        assert_eq!(session.history_pos(), 13);
    }

    #[test]
    fn delete_and_close_gap_pulls_later_tasks_back() {
        let mut session = example();
        session
            .delete_task_and_close_gap(Plan::Planned, 4, 0)
            .expect("delete");
        let task2 = session.get_task(Plan::Planned, 4, 0).expect("task2");
        assert_eq!(task2.name, "task2");
        assert_eq!(task2.start_time, at(5, 1, 12, 0));
        assert_eq!(task2.end_time, at(5, 1, 13, 0));

        let task3 = session.get_task(Plan::Planned, 5, 0).expect("task3");
        assert_eq!(task3.start_time, at(5, 2, 12, 0));
    }

    #[test]
    fn moves_single_task() {
        let mut session = fresh();
        session
            .jump_to_week(NaiveDate::from_ymd_opt(2020, 5, 1).unwrap())
            .expect("jump");
        session
            .add_task(
                Plan::Planned,
                Task::new("test", 1.0, at(5, 1, 12, 0), at(5, 1, 13, 30)),
            )
            .expect("insert");
        session
            .move_tasks(Plan::Planned, 4, 0, 1, Duration::hours(2))
            .expect("move");

        assert_eq!(session.history_pos(), 2);
        assert_eq!(session.edit_history().len(), 3);
        assert_eq!(session.edit_history()[1].planned.tasks()[0].start_time, at(5, 1, 12, 0));
        let moved = &session.current_schedules().planned.tasks()[0];
        assert_eq!(moved.start_time, at(5, 1, 14, 0));
        assert_eq!(moved.end_time, at(5, 1, 15, 30));
        assert!(session.current_schedules().actual.is_empty());
    }

    #[test]
    fn moves_contiguous_range() {
        let mut session = example();
        let before = session.current_schedules().clone();
        session
            .move_tasks(Plan::Planned, 4, 0, 2, Duration::hours(2))
            .expect("move");

        let planned = &session.current_schedules().planned;
        assert_eq!(planned.tasks()[0].start_time, at(5, 1, 14, 0));
        assert_eq!(planned.tasks()[0].end_time, at(5, 1, 15, 30));
        assert_eq!(planned.tasks()[1].start_time, at(5, 1, 15, 30));
        assert_eq!(planned.tasks()[1].end_time, at(5, 1, 16, 30));
        assert_eq!(&planned.tasks()[2..], &before.planned.tasks()[2..]);
        assert_eq!(session.current_schedules().actual, before.actual);
        assert_sorted_and_disjoint(planned);
    }

    #[test]
    fn move_into_neighbour_is_rejected() {
        let mut session = example();
        let history = session.edit_history().to_vec();
        let err = session
            .move_tasks(Plan::Planned, 4, 0, 1, Duration::hours(2))
            .expect_err("collides with task2");
        assert!(matches!(err, FlowshopError::Overlap { .. }));
        assert_eq!(session.edit_history(), history.as_slice());
        assert_eq!(session.history_pos(), 12);

        assert!(matches!(
            session.move_tasks(Plan::Planned, 4, 1, 1, Duration::hours(1)),
            Err(FlowshopError::Index(_))
        ));
        assert!(matches!(
            session.move_tasks(Plan::Planned, 4, 1, 3, Duration::hours(1)),
            Err(FlowshopError::Index(_))
        ));
    }

    #[test]
    fn successful_edits_keep_schedules_valid() {
        let mut session = fresh();
        for (day, hour) in [(0, 9), (0, 11), (1, 8), (0, 13), (2, 7)] {
            session
                .insert_task(Plan::Planned, day, format!("t{day}{hour}"), 1.0, time(hour, 0), 1.5)
                .expect("insert");
        }
        session
            .move_tasks(Plan::Planned, 0, 1, 3, Duration::minutes(30))
            .expect("move");
        session
            .edit_task(Plan::Planned, 1, 0, [TaskUpdate::StartTime(at(4, 27, 15, 0)), TaskUpdate::EndTime(at(4, 27, 16, 0))])
            .expect("move to monday");
        session.delete_task(Plan::Planned, 2, 0).expect("delete");
        assert!(session.insert_task(Plan::Planned, 0, "clash", 1.0, time(10, 0), 1.0).is_err());

        let planned = &session.current_schedules().planned;
        assert_eq!(planned.len(), 4);
        assert_eq!(session.num_daily_tasks(Plan::Planned, 0).unwrap(), 4);
        assert_sorted_and_disjoint(planned);
        for snapshot in session.edit_history() {
            assert_sorted_and_disjoint(&snapshot.planned);
        }
    }

    #[test]
    fn moves_week_without_touching_history() {
        let mut session = example();
        session.move_week(true).expect("next week");
        assert_eq!(session.base_date(), NaiveDate::from_ymd_opt(2020, 5, 4).unwrap());
        session.move_week(false).expect("previous week");
        session.move_week(false).expect("previous week");
        assert_eq!(session.base_date(), NaiveDate::from_ymd_opt(2020, 4, 20).unwrap());
        assert_eq!(session.history_pos(), 12);
        assert_eq!(session.edit_history().len(), 13);
    }

    #[test]
    fn daily_points_through_session() {
        let mut session = fresh();
        let inserts = [
            (Plan::Planned, 1, 1.0, time(12, 0), 1.5),
            (Plan::Planned, 1, 2.0, time(13, 30), 2.0),
            (Plan::Planned, 3, 1.0, time(13, 30), 2.0),
            (Plan::Planned, 10, 1.0, time(13, 30), 2.0),
            (Plan::Actual, 1, 2.0, time(14, 30), 1.0),
            (Plan::Actual, 3, 1.0, time(19, 30), 2.0),
            (Plan::Actual, -10, 1.0, time(19, 30), 2.0),
        ];
        for (plan, day, priority, start, hours) in inserts {
            session
                .insert_task(plan, day, "block", priority, start, hours)
                .expect("insert");
        }

        assert_eq!(session.daily_points(1, Plan::Planned, false).unwrap(), 5.5);
        assert_eq!(session.daily_points(6, Plan::Planned, true).unwrap(), 7.5);
        assert_eq!(session.daily_points(6, Plan::Actual, true).unwrap(), 4.0);
        assert_eq!(session.daily_score(0, false).unwrap(), 100.0);
        assert_eq!(session.daily_score(1, false).unwrap(), 100.0 * 2.0 / 5.5);
        assert_eq!(session.daily_score(3, true).unwrap(), 100.0 * 4.0 / 7.5);
        assert_eq!(session.week_stats().unwrap().len(), 7);
    }

    #[test]
    fn create_and_load_go_through_the_store() {
        let store = MemoryStore::default();
        let mut session = Session::create("mine", &store).expect("create");
        session
            .insert_task(Plan::Planned, 0, "a", 1.0, time(9, 0), 1.0)
            .expect("insert");
        session.save(&store).expect("save");

        assert!(matches!(
            Session::create("mine", &store),
            Err(FlowshopError::AlreadyExists(_))
        ));
        assert!(matches!(
            Session::load("other", &store),
            Err(FlowshopError::NotFound(_))
        ));

        let loaded = Session::load("mine", &store).expect("load");
        assert_eq!(loaded.to_state(), session.to_state());
    }

    #[test]
    fn rejects_inconsistent_state() {
        let mut state = fresh().to_state();
        state.history_pos = 1;
        assert!(matches!(
            Session::from_state(state),
            Err(FlowshopError::InvalidState(_))
        ));

        let mut state = fresh().to_state();
        state.edit_history.clear();
        state.history_pos = 0;
        assert!(matches!(
            Session::from_state(state),
            Err(FlowshopError::InvalidState(_))
        ));

        let mut state = example().to_state();
        state.edit_history.remove(0);
        assert!(matches!(
            Session::from_state(state),
            Err(FlowshopError::InvalidState(_))
        ));
    }

    #[test]
    fn time_arithmetic_overflow_is_an_error() {
        let mut session = fresh();
        session
            .insert_task(Plan::Planned, 0, "a", 1.0, time(9, 0), 1.0)
            .expect("insert");
        let before = session.to_state();

        for hours in [1e12, -1e20, f64::INFINITY] {
            assert!(matches!(
                session.insert_task(Plan::Planned, 1, "huge", 1.0, time(9, 0), hours),
                Err(FlowshopError::InvalidDuration(_))
            ));
        }
        assert!(matches!(
            session.insert_task(Plan::Planned, 1, "backwards", 1.0, time(9, 0), -1.0),
            Err(FlowshopError::InvalidDuration(_))
        ));
        assert!(matches!(
            session.move_tasks(Plan::Planned, 0, 0, 1, Duration::days(200_000_000)),
            Err(FlowshopError::InvalidDuration(_))
        ));
        for day in [i64::MAX, i64::MIN, 200_000_000] {
            assert!(matches!(
                session.insert_task(Plan::Planned, day, "far", 1.0, time(9, 0), 1.0),
                Err(FlowshopError::Index(_))
            ));
            assert!(matches!(session.get_task(Plan::Planned, day, 0), Err(FlowshopError::Index(_))));
            assert!(matches!(session.delete_task(Plan::Planned, day, 0), Err(FlowshopError::Index(_))));
        }

        assert_eq!(session.to_state(), before);
    }

    #[test]
    fn load_rejects_file_of_another_session() {
        let store = MemoryStore::default();
        let other = Session::create("b", &store).expect("create");
        store.save("a", &other.to_state()).expect("save under wrong name");

        assert!(matches!(
            Session::load("a", &store),
            Err(FlowshopError::InvalidState(_))
        ));
    }

    #[test]
    fn rejects_state_with_week_outside_calendar() {
        let mut state = fresh().to_state();
        state.base_date = NaiveDate::MAX;
        assert!(matches!(
            Session::from_state(state),
            Err(FlowshopError::InvalidState(_))
        ));
    }
}
