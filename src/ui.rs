use std::error::Error;
use std::io;
use std::time::Duration as StdDuration;

use chrono::{Datelike, Duration, Local, NaiveDateTime, NaiveTime};
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEventKind};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use crossterm::{ExecutableCommand, execute};
use log::{info, warn};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};
use ratatui::{Frame, Terminal};

use crate::analytics::{DAYS_IN_WEEK, DayStats, week_bounds};
use crate::config::Config;
use crate::session::{Plan, Session};
use crate::storage::SessionStore;
use crate::task::{Task, TaskUpdate};

const FOCUSED_PANEL_BORDER_COLOR: Color = Color::Yellow;
const INACTIVE_PANEL_BORDER_COLOR: Color = Color::DarkGray;
const HIGHLIGHT_BACKGROUND_COLOR: Color = Color::Rgb(42, 45, 52);
const TIME_FORMAT: &str = "%H:%M";

pub fn run_dashboard(
	session: &mut Session,
	store: &dyn SessionStore,
	config: &Config,
) -> Result<(), Box<dyn Error>> {
	enable_raw_mode()?;
	let mut stdout = io::stdout();
	stdout.execute(EnterAlternateScreen)?;
	let backend = CrosstermBackend::new(stdout);
	let mut terminal = Terminal::new(backend)?;

	let result = run_event_loop(&mut terminal, session, store, config);

	disable_raw_mode()?;
	execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
	terminal.show_cursor()?;

	result
}

fn run_event_loop(
	terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
	session: &mut Session,
	store: &dyn SessionStore,
	config: &Config,
) -> Result<(), Box<dyn Error>> {
	let mut app = App::new(config);

	loop {
		let view = build_view(&app, session);
		app.clamp_selection(&view);
		terminal.draw(|frame| draw_dashboard(frame, &app, session, &view))?;

		if event::poll(StdDuration::from_millis(250))? {
			if let CEvent::Key(key) = event::read()? {
				if key.kind != KeyEventKind::Press {
					continue;
				}

				let should_quit = match &app.mode {
					InputMode::Prompt(_) => handle_prompt_key(&mut app, key.code, session),
					InputMode::Select(_) => handle_select_key(&mut app, key.code, session),
					InputMode::Normal => handle_normal_key(&mut app, key.code, session, store, &view),
				};

				if should_quit {
					break;
				}
			}
		}
	}

	Ok(())
}

fn draw_dashboard(frame: &mut Frame, app: &App, session: &Session, view: &ViewModel) {
	let layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([Constraint::Min(12), Constraint::Length(5)])
		.split(frame.area());

	let body = Layout::default()
		.direction(Direction::Horizontal)
		.constraints([
			Constraint::Percentage(35),
			Constraint::Percentage(35),
			Constraint::Percentage(30),
		])
		.split(layout[0]);

	render_plan_panel(frame, body[0], app, view, Plan::Planned);
	render_plan_panel(frame, body[1], app, view, Plan::Actual);
	render_week_panel(frame, body[2], app, session, view);
	render_footer(frame, layout[1], app);

	if let InputMode::Select(select) = &app.mode {
		render_select_popup(frame, select);
	}
}

fn render_plan_panel(frame: &mut Frame, area: Rect, app: &App, view: &ViewModel, plan: Plan) {
	let focused = app.plan == plan;
	let column = view.column(plan);
	let range = app.selected_range();

	let mut items = column
		.tasks
		.iter()
		.enumerate()
		.map(|(index, task)| {
			ListItem::new(render_task_line(
				task,
				focused && range.contains(&index),
				focused && index == app.task_index,
			))
		})
		.collect::<Vec<_>>();
	if items.is_empty() {
		items.push(ListItem::new("(no tasks)"));
	}

	let mut state = ListState::default();
	if focused && !column.tasks.is_empty() {
		state.select(Some(app.task_index.min(column.tasks.len() - 1)));
	}

	let title = format!(
		"{} | {} | {}",
		plan.label(),
		view.date_label,
		points_label(&column.points)
	);
	let list = List::new(items)
		.block(
			Block::default()
				.borders(Borders::ALL)
				.title(title)
				.border_style(border_style(focused)),
		)
		.highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR).add_modifier(Modifier::BOLD));

	frame.render_stateful_widget(list, area, &mut state);
}

fn render_task_line(task: &Task, in_range: bool, is_cursor: bool) -> Line<'static> {
	let marker = if in_range && !is_cursor { "* " } else { "  " };
	let time_style = if is_cursor {
		Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
	} else {
		Style::default()
	};
	let completion_style = if task.completed >= 1.0 {
		Style::default().fg(Color::Green)
	} else {
		Style::default().fg(Color::DarkGray)
	};

	Line::from(vec![
		Span::raw(marker),
		Span::styled(
			format!(
				"{}-{}",
				task.start_time.format(TIME_FORMAT),
				task.end_time.format(TIME_FORMAT)
			),
			time_style,
		),
		Span::raw(format!(" {} ", task.name)),
		Span::styled(format!("p{:.1}", task.priority), Style::default().fg(Color::Cyan)),
		Span::styled(format!(" {:>3.0}%", task.completed * 100.0), completion_style),
	])
}

fn render_week_panel(frame: &mut Frame, area: Rect, app: &App, session: &Session, view: &ViewModel) {
	let base_date = session.base_date();
	let last_day = session
		.date_for_day(DAYS_IN_WEEK - 1)
		.map(|date| date.format("%d %b %Y").to_string())
		.unwrap_or_else(|err| format!("error: {err}"));
	let mut lines = vec![
		Line::from(format!("Week {} - {}", base_date.format("%d %b"), last_day)),
		Line::from(format!(
			"Edit {}/{}",
			session.history_pos(),
			session.edit_history().len() - 1
		)),
		Line::from(""),
		Line::from("Day  planned  actual  score   cum"),
	];

	match &view.week {
		Ok(rows) => {
			for (index, row) in rows.iter().enumerate() {
				let style = if index as i64 == app.day {
					Style::default().fg(Color::Black).bg(Color::Yellow).add_modifier(Modifier::BOLD)
				} else {
					score_style(row.score)
				};
				lines.push(Line::from(Span::styled(week_row_text(row), style)));
			}
		}
		Err(err) => lines.push(Line::from(format!("error: {err}"))),
	}

	lines.push(Line::from(""));
	lines.push(Line::from(format!("Week planned: {}", points_label(&view.week_planned))));
	lines.push(Line::from(format!("Week earned:  {}", points_label(&view.week_earned))));

	let panel = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Week"));
	frame.render_widget(panel, area);
}

fn week_row_text(row: &DayStats) -> String {
	format!(
		"{} {:>8.2} {:>7.2} {:>5.0}% {:>4.0}%",
		row.date.format("%a"),
		row.planned_points,
		row.actual_points,
		row.score,
		row.cumulative_score
	)
}

fn score_style(score: f64) -> Style {
	if score >= 100.0 {
		Style::default().fg(Color::Green)
	} else if score >= 50.0 {
		Style::default().fg(Color::LightYellow)
	} else {
		Style::default().fg(Color::LightRed)
	}
}

fn points_label(points: &Result<f64, String>) -> String {
	match points {
		Ok(points) => format!("{points:.2} pts"),
		Err(err) => format!("error: {err}"),
	}
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
	let footer_lines = match &app.mode {
		InputMode::Normal => vec![
			Line::from("h/l day | j/k task | Tab planned/actual | [ ] week | t this week | q save+quit"),
			Line::from(
				"i insert | e edit | c toggle done | d delete | D delete+close gap | v range | J/K move | u undo | r redo | s save",
			),
			Line::from(app.status.clone()),
		],
		InputMode::Prompt(prompt) => vec![
			Line::from(prompt.title.clone()),
			Line::from(format!("> {}", prompt.input)),
			Line::from(format!("Enter submit | Esc cancel | {}", app.status)),
		],
		InputMode::Select(select) => vec![
			Line::from(select.title.clone()),
			Line::from(format!(
				"Selected: {}",
				select.selected_option().map(|option| option.label).unwrap_or("(none)")
			)),
			Line::from("j/k or arrows move | Enter choose | Esc cancel"),
		],
	};

	let footer = Paragraph::new(footer_lines).block(Block::default().borders(Borders::ALL).title("Shortcuts"));
	frame.render_widget(footer, area);
}

fn render_select_popup(frame: &mut Frame, select: &SelectState) {
	let area = centered_rect(40, 40, frame.area());
	frame.render_widget(Clear, area);

	let items = select
		.options
		.iter()
		.map(|option| ListItem::new(option.label))
		.collect::<Vec<_>>();
	let list = List::new(items)
		.block(Block::default().borders(Borders::ALL).title(select.title.clone()))
		.highlight_symbol(">> ")
		.highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR));

	let mut state = ListState::default();
	state.select(Some(select.selected));
	frame.render_stateful_widget(list, area, &mut state);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
	let popup_layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([
			Constraint::Percentage((100 - percent_y) / 2),
			Constraint::Percentage(percent_y),
			Constraint::Percentage((100 - percent_y) / 2),
		])
		.split(area);
	Layout::default()
		.direction(Direction::Horizontal)
		.constraints([
			Constraint::Percentage((100 - percent_x) / 2),
			Constraint::Percentage(percent_x),
			Constraint::Percentage((100 - percent_x) / 2),
		])
		.split(popup_layout[1])[1]
}

fn handle_normal_key(
	app: &mut App,
	code: KeyCode,
	session: &mut Session,
	store: &dyn SessionStore,
	view: &ViewModel,
) -> bool {
	match code {
		KeyCode::Char('q') => match session.save(store) {
			Ok(()) => return true,
			Err(err) => app.status = format!("error: {err} (Esc quits without saving)"),
		},
		KeyCode::Esc => {
			if app.status.ends_with("(Esc quits without saving)") {
				warn!("quitting session {} without saving", session.name());
				return true;
			}
			app.anchor = None;
			app.status = "Ready".to_string();
		}
		KeyCode::Left | KeyCode::Char('h') => app.shift_day(-1),
		KeyCode::Right | KeyCode::Char('l') => app.shift_day(1),
		KeyCode::Up | KeyCode::Char('k') => app.move_task_selection(-1, view),
		KeyCode::Down | KeyCode::Char('j') => app.move_task_selection(1, view),
		KeyCode::Tab | KeyCode::BackTab => {
			app.plan = app.plan.toggle();
			app.task_index = 0;
			app.anchor = None;
		}
		KeyCode::Char('[') => {
			let result = session
				.move_week(false)
				.map(|()| format!("Week of {}", session.base_date().format("%d %b %Y")));
			app.report(result);
		}
		KeyCode::Char(']') => {
			let result = session
				.move_week(true)
				.map(|()| format!("Week of {}", session.base_date().format("%d %b %Y")));
			app.report(result);
		}
		KeyCode::Char('t') => {
			let today = Local::now().date_naive();
			let result = session.jump_to_week(today).map(|()| "This week".to_string());
			if result.is_ok() {
				app.day = i64::from(today.weekday().num_days_from_monday());
				app.task_index = 0;
				app.anchor = None;
			}
			app.report(result);
		}
		KeyCode::Char('i') => {
			app.mode = InputMode::Prompt(PromptState::new(
				format!("New {} task on {}: name", app.plan.label().to_lowercase(), view.date_label),
				PromptKind::InsertName,
			));
		}
		KeyCode::Char('e') => {
			if view.column(app.plan).tasks.is_empty() {
				app.status = "No task selected".to_string();
			} else {
				app.mode = InputMode::Select(SelectState::edit_field(TaskRef::selected(app)));
			}
		}
		KeyCode::Char('c') => {
			let target = TaskRef::selected(app);
			let completed = match session.get_task(target.plan, target.day, target.task_index) {
				Ok(task) if task.completed >= 1.0 => 0.0,
				Ok(_) => 1.0,
				Err(err) => {
					app.status = format!("error: {err}");
					return false;
				}
			};
			let result = session
				.edit_task(target.plan, target.day, target.task_index, [TaskUpdate::Completed(completed)])
				.map(|()| "Toggled completion".to_string());
			app.report(result);
		}
		KeyCode::Char('d') => {
			let result = session
				.delete_task(app.plan, app.day, app.task_index)
				.map(|task| format!("Deleted {}", task.name));
			app.report(result);
			app.anchor = None;
		}
		KeyCode::Char('D') => {
			let result = session
				.delete_task_and_close_gap(app.plan, app.day, app.task_index)
				.map(|task| format!("Deleted {} and closed the gap", task.name));
			app.report(result);
			app.anchor = None;
		}
		KeyCode::Char('v') => {
			if app.anchor.is_some() {
				app.anchor = None;
				app.status = "Range cleared".to_string();
			} else {
				app.anchor = Some(app.task_index);
				app.status = "Range anchored: move with j/k, shift with J/K".to_string();
			}
		}
		KeyCode::Char('J') => move_selected_tasks(app, session, app.move_step),
		KeyCode::Char('K') => move_selected_tasks(app, session, -app.move_step),
		KeyCode::Char('u') => {
			if session.can_undo() {
				session.undo();
				app.status = format!("Undo ({}/{})", session.history_pos(), session.edit_history().len() - 1);
			} else {
				app.status = "Nothing to undo".to_string();
			}
		}
		KeyCode::Char('r') => {
			if session.can_redo() {
				session.redo();
				app.status = format!("Redo ({}/{})", session.history_pos(), session.edit_history().len() - 1);
			} else {
				app.status = "Nothing to redo".to_string();
			}
		}
		KeyCode::Char('s') => {
			let result = session
				.save(store)
				.map(|()| format!("Saved session {}", session.name()));
			app.report(result);
		}
		_ => {}
	}

	false
}

fn move_selected_tasks(app: &mut App, session: &mut Session, delta: Duration) {
	let range = app.selected_range();
	let result = session
		.move_tasks(app.plan, app.day, range.start, range.end, delta)
		.map(|()| format!("Moved {} task(s) by {} min", range.len(), delta.num_minutes()));
	app.report(result);
}

fn handle_prompt_key(app: &mut App, code: KeyCode, session: &mut Session) -> bool {
	match code {
		KeyCode::Esc => {
			app.mode = InputMode::Normal;
			app.status = "Input cancelled".to_string();
		}
		KeyCode::Backspace => {
			if let InputMode::Prompt(prompt) = &mut app.mode {
				prompt.input.pop();
			}
		}
		KeyCode::Char(value) => {
			if let InputMode::Prompt(prompt) = &mut app.mode {
				prompt.input.push(value);
			}
		}
		KeyCode::Enter => {
			let prompt = match std::mem::replace(&mut app.mode, InputMode::Normal) {
				InputMode::Prompt(prompt) => prompt,
				InputMode::Normal | InputMode::Select(_) => return false,
			};

			match submit_prompt(prompt.clone(), app, session) {
				Ok(PromptOutcome::NextPrompt(next_prompt)) => {
					app.mode = InputMode::Prompt(next_prompt);
					app.status.clear();
				}
				Ok(PromptOutcome::Done(message)) => {
					app.mode = InputMode::Normal;
					app.status = message;
				}
				Err(err) => {
					app.mode = InputMode::Prompt(prompt);
					app.status = format!("error: {err}");
				}
			}
		}
		_ => {}
	}

	false
}

fn handle_select_key(app: &mut App, code: KeyCode, session: &Session) -> bool {
	match code {
		KeyCode::Esc => {
			app.mode = InputMode::Normal;
			app.status = "Selection cancelled".to_string();
		}
		KeyCode::Up | KeyCode::Char('k') => {
			if let InputMode::Select(select) = &mut app.mode {
				select.move_selection(-1);
			}
		}
		KeyCode::Down | KeyCode::Char('j') => {
			if let InputMode::Select(select) = &mut app.mode {
				select.move_selection(1);
			}
		}
		KeyCode::Enter => {
			let select = match std::mem::replace(&mut app.mode, InputMode::Normal) {
				InputMode::Select(select) => select,
				_ => return false,
			};

			match submit_select(&select, session) {
				Ok(prompt) => app.mode = InputMode::Prompt(prompt),
				Err(err) => {
					app.mode = InputMode::Select(select);
					app.status = format!("error: {err}");
				}
			}
		}
		_ => {}
	}

	false
}

fn submit_prompt(prompt: PromptState, app: &App, session: &mut Session) -> Result<PromptOutcome, String> {
	match prompt.kind {
		PromptKind::InsertName => {
			let name = required_text(&prompt.input, "task name")?;
			Ok(PromptOutcome::NextPrompt(PromptState::new(
				format!("Priority (points per hour, default {})", app.default_priority),
				PromptKind::InsertPriority { name },
			)))
		}
		PromptKind::InsertPriority { name } => {
			let priority = optional_number(&prompt.input, "priority")?.unwrap_or(app.default_priority);
			if priority < 0.0 {
				return Err("priority must not be negative".to_string());
			}
			Ok(PromptOutcome::NextPrompt(PromptState::new(
				"Start time (HH:MM)",
				PromptKind::InsertStart { name, priority },
			)))
		}
		PromptKind::InsertStart { name, priority } => {
			let start = parse_time(&prompt.input)?;
			Ok(PromptOutcome::NextPrompt(PromptState::new(
				format!("Length in hours (default {})", app.default_hours),
				PromptKind::InsertHours { name, priority, start },
			)))
		}
		PromptKind::InsertHours { name, priority, start } => {
			let hours = optional_number(&prompt.input, "hours")?.unwrap_or(app.default_hours);
			session
				.insert_task(app.plan, app.day, name.clone(), priority, start, hours)
				.map_err(|err| err.to_string())?;
			info!("inserted task {name}");
			Ok(PromptOutcome::Done(format!("Inserted {name}")))
		}
		PromptKind::EditValue { field, target } => {
			let current = session
				.get_task(target.plan, target.day, target.task_index)
				.map_err(|err| err.to_string())?;
			let update = parse_field_update(field, &prompt.input, current.start_time)?;
			session
				.edit_task(target.plan, target.day, target.task_index, [update])
				.map_err(|err| err.to_string())?;
			Ok(PromptOutcome::Done(format!("Updated {}", field.label())))
		}
	}
}

fn submit_select(select: &SelectState, session: &Session) -> Result<PromptState, String> {
	let field = select
		.selected_option()
		.map(|option| option.field)
		.ok_or_else(|| "no option selected".to_string())?;
	let target = select.target;
	let task = session
		.get_task(target.plan, target.day, target.task_index)
		.map_err(|err| err.to_string())?;

	Ok(PromptState::with_input(
		format!("{} of {}", field.label(), task.name),
		PromptKind::EditValue { field, target },
		field.current_value(task),
	))
}

fn parse_field_update(field: EditField, input: &str, start_time: NaiveDateTime) -> Result<TaskUpdate, String> {
	match field {
		EditField::Name => Ok(TaskUpdate::Name(required_text(input, "name")?)),
		EditField::Priority => {
			let priority = required_number(input, "priority")?;
			if priority < 0.0 {
				return Err("priority must not be negative".to_string());
			}
			Ok(TaskUpdate::Priority(priority))
		}
		EditField::Start => Ok(TaskUpdate::StartTime(start_time.date().and_time(parse_time(input)?))),
		EditField::End => Ok(TaskUpdate::EndTime(start_time.date().and_time(parse_time(input)?))),
		EditField::Completed => {
			let completed = required_number(input, "completion")?;
			if !(0.0..=1.0).contains(&completed) {
				return Err("completion must be between 0 and 1".to_string());
			}
			Ok(TaskUpdate::Completed(completed))
		}
	}
}

fn required_text(input: &str, field_name: &str) -> Result<String, String> {
	let value = input.trim();
	if value.is_empty() {
		Err(format!("{field_name} is required"))
	} else {
		Ok(value.to_string())
	}
}

fn required_number(input: &str, field_name: &str) -> Result<f64, String> {
	optional_number(input, field_name)?.ok_or_else(|| format!("{field_name} is required"))
}

fn optional_number(input: &str, field_name: &str) -> Result<Option<f64>, String> {
	let value = input.trim();
	if value.is_empty() {
		return Ok(None);
	}
	match value.parse::<f64>() {
		Ok(number) if number.is_finite() => Ok(Some(number)),
		_ => Err(format!("{field_name} must be a number")),
	}
}

fn parse_time(input: &str) -> Result<NaiveTime, String> {
	NaiveTime::parse_from_str(input.trim(), TIME_FORMAT).map_err(|_| "expected a time like 09:30".to_string())
}

fn border_style(focused: bool) -> Style {
	if focused {
		Style::default()
			.fg(FOCUSED_PANEL_BORDER_COLOR)
			.add_modifier(Modifier::BOLD)
	} else {
		Style::default().fg(INACTIVE_PANEL_BORDER_COLOR)
	}
}

fn build_view(app: &App, session: &Session) -> ViewModel {
	let date = session.date_for_day(app.day);
	let column = |plan: Plan| PlanColumn {
		tasks: match &date {
			Ok(date) => session.schedule(plan).tasks_on(*date).to_vec(),
			Err(_) => Vec::new(),
		},
		points: session
			.daily_points(app.day, plan, false)
			.map_err(|err| err.to_string()),
	};

	let pair = session.current_schedules();
	let (week_planned, week_earned) = match week_bounds(session.base_date()) {
		Ok((start, end)) => (
			pair.planned.interval_points(start, end).map_err(|err| err.to_string()),
			pair.actual
				.earned_interval_points(start, end)
				.map_err(|err| err.to_string()),
		),
		Err(err) => (Err(err.to_string()), Err(err.to_string())),
	};

	ViewModel {
		date_label: match &date {
			Ok(date) => date.format("%a %d %b %Y").to_string(),
			Err(err) => format!("error: {err}"),
		},
		planned: column(Plan::Planned),
		actual: column(Plan::Actual),
		week: session.week_stats().map_err(|err| err.to_string()),
		week_planned,
		week_earned,
	}
}

#[derive(Debug, Clone)]
enum PromptOutcome {
	NextPrompt(PromptState),
	Done(String),
}

#[derive(Debug, Clone)]
struct PromptState {
	title: String,
	input: String,
	kind: PromptKind,
}

impl PromptState {
	fn new(title: impl Into<String>, kind: PromptKind) -> Self {
		Self::with_input(title, kind, String::new())
	}

	fn with_input(title: impl Into<String>, kind: PromptKind, input: String) -> Self {
		Self {
			title: title.into(),
			input,
			kind,
		}
	}
}

#[derive(Debug, Clone)]
enum PromptKind {
	InsertName,
	InsertPriority {
		name: String,
	},
	InsertStart {
		name: String,
		priority: f64,
	},
	InsertHours {
		name: String,
		priority: f64,
		start: NaiveTime,
	},
	EditValue {
		field: EditField,
		target: TaskRef,
	},
}

/// Addresses one task the way the session does: plan, day offset, daily index.
#[derive(Debug, Clone, Copy)]
struct TaskRef {
	plan: Plan,
	day: i64,
	task_index: usize,
}

impl TaskRef {
	fn selected(app: &App) -> Self {
		Self {
			plan: app.plan,
			day: app.day,
			task_index: app.task_index,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditField {
	Name,
	Priority,
	Start,
	End,
	Completed,
}

impl EditField {
	const ALL: [EditField; 5] = [
		EditField::Name,
		EditField::Priority,
		EditField::Start,
		EditField::End,
		EditField::Completed,
	];

	fn label(self) -> &'static str {
		match self {
			EditField::Name => "name",
			EditField::Priority => "priority",
			EditField::Start => "start (HH:MM)",
			EditField::End => "end (HH:MM)",
			EditField::Completed => "completion (0-1)",
		}
	}

	fn current_value(self, task: &Task) -> String {
		match self {
			EditField::Name => task.name.clone(),
			EditField::Priority => task.priority.to_string(),
			EditField::Start => task.start_time.format(TIME_FORMAT).to_string(),
			EditField::End => task.end_time.format(TIME_FORMAT).to_string(),
			EditField::Completed => task.completed.to_string(),
		}
	}
}

#[derive(Debug, Clone)]
struct SelectState {
	title: String,
	options: Vec<SelectOption>,
	selected: usize,
	target: TaskRef,
}

impl SelectState {
	fn edit_field(target: TaskRef) -> Self {
		Self {
			title: "Edit field".to_string(),
			options: EditField::ALL
				.iter()
				.map(|&field| SelectOption {
					label: field.label(),
					field,
				})
				.collect(),
			selected: 0,
			target,
		}
	}

	fn move_selection(&mut self, delta: i32) {
		if delta > 0 {
			self.selected = (self.selected + delta as usize).min(self.options.len().saturating_sub(1));
		} else {
			self.selected = self.selected.saturating_sub(delta.unsigned_abs() as usize);
		}
	}

	fn selected_option(&self) -> Option<&SelectOption> {
		self.options.get(self.selected)
	}
}

#[derive(Debug, Clone)]
struct SelectOption {
	label: &'static str,
	field: EditField,
}

#[derive(Debug, Clone)]
enum InputMode {
	Normal,
	Prompt(PromptState),
	Select(SelectState),
}

#[derive(Debug, Clone)]
struct App {
	plan: Plan,
	day: i64,
	task_index: usize,
	anchor: Option<usize>,
	mode: InputMode,
	status: String,
	default_priority: f64,
	default_hours: f64,
	move_step: Duration,
}

impl App {
	fn new(config: &Config) -> Self {
		let today = Local::now().date_naive();
		Self {
			plan: Plan::Planned,
			day: i64::from(today.weekday().num_days_from_monday()),
			task_index: 0,
			anchor: None,
			mode: InputMode::Normal,
			status: "Ready".to_string(),
			default_priority: config.default_priority,
			default_hours: config.default_hours,
			move_step: config.move_step(),
		}
	}

	fn clamp_selection(&mut self, view: &ViewModel) {
		let count = view.column(self.plan).tasks.len();
		if count == 0 {
			self.task_index = 0;
			self.anchor = None;
		} else {
			self.task_index = self.task_index.min(count - 1);
			self.anchor = self.anchor.map(|anchor| anchor.min(count - 1));
		}
	}

	fn shift_day(&mut self, delta: i64) {
		self.day = (self.day + delta).clamp(0, DAYS_IN_WEEK - 1);
		self.task_index = 0;
		self.anchor = None;
	}

	fn move_task_selection(&mut self, delta: i32, view: &ViewModel) {
		let count = view.column(self.plan).tasks.len();
		if count == 0 {
			self.task_index = 0;
			return;
		}

		if delta > 0 {
			self.task_index = (self.task_index + delta as usize).min(count - 1);
		} else {
			self.task_index = self.task_index.saturating_sub(delta.unsigned_abs() as usize);
		}
	}

	/// Daily indices covered by the anchor and the cursor, end exclusive.
	fn selected_range(&self) -> std::ops::Range<usize> {
		match self.anchor {
			Some(anchor) => anchor.min(self.task_index)..anchor.max(self.task_index) + 1,
			None => self.task_index..self.task_index + 1,
		}
	}

	fn report<E: std::fmt::Display>(&mut self, result: Result<String, E>) {
		self.status = match result {
			Ok(message) => message,
			Err(err) => format!("error: {err}"),
		};
	}
}

struct ViewModel {
	date_label: String,
	planned: PlanColumn,
	actual: PlanColumn,
	week: Result<Vec<DayStats>, String>,
	week_planned: Result<f64, String>,
	week_earned: Result<f64, String>,
}

impl ViewModel {
	fn column(&self, plan: Plan) -> &PlanColumn {
		match plan {
			Plan::Planned => &self.planned,
			Plan::Actual => &self.actual,
		}
	}
}

struct PlanColumn {
	tasks: Vec<Task>,
	points: Result<f64, String>,
}
