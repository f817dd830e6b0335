mod analytics;
mod config;
mod error;
mod schedule;
mod session;
mod sessions;
mod storage;
mod task;
mod ui;

use std::error::Error;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::info;

use crate::analytics::{DAYS_IN_WEEK, week_bounds};
use crate::config::Config;
use crate::session::{Plan, Session, example_session};
use crate::sessions::{recent_sessions, remember_session, resolve_session_name, state_dir};
use crate::storage::{FileStore, SessionStore};
use crate::ui::run_dashboard;

const EXAMPLE_SESSION: &str = "example";
const LOG_FILE: &str = "flowshop.log";

#[derive(Debug, Parser)]
#[command(name = "flowshop", about = "Weekly planned-versus-actual time-block scheduler")]
struct Cli {
	#[arg(long)]
	storage_dir: Option<PathBuf>,
	#[arg(long)]
	config: Option<PathBuf>,
	#[arg(long)]
	session: Option<String>,
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
	Dashboard,
	New,
	Summary {
		#[arg(long)]
		week: Option<String>,
	},
	Sessions {
		#[arg(long, default_value_t = 20)]
		limit: usize,
	},
	Example,
}

fn main() {
	setup_logging();
	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

/// Log records go to `flowshop.log` in the state directory so they never
/// draw over the dashboard. `RUST_LOG` overrides the `warn` default.
fn setup_logging() {
	let dir = state_dir();
	let file = fs::create_dir_all(&dir).and_then(|()| {
		OpenOptions::new()
			.create(true)
			.append(true)
			.open(dir.join(LOG_FILE))
	});

	match file {
		Ok(file) => {
			env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
				.target(env_logger::Target::Pipe(Box::new(file)))
				.init();
		}
		Err(err) => {
			eprintln!("warning: failed to open log file in {}: {err}", dir.display());
		}
	}
}

fn run() -> Result<(), Box<dyn Error>> {
	let cli = Cli::parse();
	let config_path = cli.config.as_deref();

	match cli.command.unwrap_or(Command::Dashboard) {
		Command::Dashboard => {
			let (config, store) = open_store(config_path, cli.storage_dir)?;
			let name = resolve_session_name(cli.session)?;
			let mut session = if store.exists(&name) {
				Session::load(&name, &store)?
			} else {
				Session::create(&name, &store)?
			};
			note_recent(&name);
			run_dashboard(&mut session, &store, &config)?;
		}
		Command::New => {
			let (_, store) = open_store(config_path, cli.storage_dir)?;
			let name = cli.session.ok_or("--session is required to create a session")?;
			let session = Session::create(&name, &store)?;
			session.save(&store)?;
			note_recent(&name);
			println!("created session {name}");
		}
		Command::Summary { week } => {
			let (_, store) = open_store(config_path, cli.storage_dir)?;
			let name = resolve_session_name(cli.session)?;
			let mut session = Session::load(&name, &store)?;
			if let Some(raw) = week {
				session.jump_to_week(NaiveDate::parse_from_str(&raw, "%Y-%m-%d")?)?;
			}
			print_summary(&session)?;
		}
		Command::Example => {
			let (_, store) = open_store(config_path, cli.storage_dir)?;
			let name = cli.session.unwrap_or_else(|| EXAMPLE_SESSION.to_string());
			let session = example_session(&name, &store)?;
			session.save(&store)?;
			note_recent(&name);
			println!(
				"created session {name} with {} edits, showing the week of {}",
				session.history_pos(),
				session.base_date().format("%Y-%m-%d")
			);
		}
		Command::Sessions { limit } => print_recent_sessions(limit)?,
	}

	Ok(())
}

fn open_store(config_path: Option<&Path>, cli_dir: Option<PathBuf>) -> Result<(Config, FileStore), Box<dyn Error>> {
	let config = Config::load(config_path)?;
	let store = FileStore::new(config.storage_dir(cli_dir));
	info!("session storage at {}", store.root().display());
	Ok((config, store))
}

fn note_recent(name: &str) {
	if let Err(err) = remember_session(name) {
		eprintln!("warning: failed to store recent session: {err}");
	}
}

fn print_recent_sessions(limit: usize) -> Result<(), Box<dyn Error>> {
	let rows = recent_sessions(limit)?;
	if rows.is_empty() {
		println!("no recent sessions");
		return Ok(());
	}

	for (index, name) in rows.iter().enumerate() {
		println!("{:>2}. {}", index + 1, name);
	}

	Ok(())
}

fn print_summary(session: &Session) -> Result<(), Box<dyn Error>> {
	let base_date = session.base_date();
	println!(
		"{} | week of {}",
		session.name(),
		base_date.format("%Y-%m-%d")
	);
	println!("\nday        | tasks | planned | actual | score | cumulative");

	for (day, row) in (0..DAYS_IN_WEEK).zip(session.week_stats()?) {
		println!(
			"{} | {:>2}/{:<2} | {:>7.2} | {:>6.2} | {:>4.0}% | {:>9.0}%",
			row.date.format("%a %m-%d"),
			session.num_daily_tasks(Plan::Planned, day)?,
			session.num_daily_tasks(Plan::Actual, day)?,
			row.planned_points,
			row.actual_points,
			row.score,
			row.cumulative_score
		);
	}

	let (week_start, week_end) = week_bounds(base_date)?;
	let pair = session.current_schedules();
	println!(
		"\nweek planned: {:.2} pts | week earned: {:.2} pts",
		pair.planned.interval_points(week_start, week_end)?,
		pair.actual.earned_interval_points(week_start, week_end)?
	);
	println!(
		"week score: {:.0}% | all-time planned: {:.2} pts | all-time earned: {:.2} pts",
		session.daily_score(DAYS_IN_WEEK - 1, true)?,
		pair.planned.points()?,
		pair.actual.earned_points()?
	);

	Ok(())
}
