use std::env;
use std::fs;
use std::io::{Error, ErrorKind, Write};
use std::path::PathBuf;

const RECENT_SESSIONS_FILE: &str = "recent_sessions.txt";
const MAX_RECENT_SESSIONS: usize = 50;
const APP_DIR: &str = "flowshop";

pub fn resolve_session_name(cli_name: Option<String>) -> Result<String, Error> {
	if let Some(name) = cli_name {
		return Ok(name);
	}

	if let Ok(name) = env::var("FLOWSHOP_SESSION") {
		if !name.trim().is_empty() {
			return Ok(name);
		}
	}

	if let Ok(mut recent) = recent_sessions(MAX_RECENT_SESSIONS) {
		if let Some(name) = recent.drain(..).next() {
			return Ok(name);
		}
	}

	Err(Error::new(
		ErrorKind::NotFound,
		"no session selected: pass --session <name>, set FLOWSHOP_SESSION, or pick one from `sessions`",
	))
}

pub fn remember_session(name: &str) -> Result<(), Error> {
	let mut entries = recent_sessions(MAX_RECENT_SESSIONS)?;
	entries.retain(|entry| entry != name);
	entries.insert(0, name.to_string());
	entries.truncate(MAX_RECENT_SESSIONS);
	save_recent_sessions(&entries)
}

pub fn recent_sessions(limit: usize) -> Result<Vec<String>, Error> {
	let raw = match fs::read_to_string(recent_sessions_path()) {
		Ok(raw) => raw,
		Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
		Err(err) => return Err(err),
	};

	Ok(raw
		.lines()
		.map(str::trim)
		.filter(|line| !line.is_empty())
		.take(limit)
		.map(str::to_string)
		.collect())
}

fn save_recent_sessions(entries: &[String]) -> Result<(), Error> {
	fs::create_dir_all(state_dir())?;

	let mut file = fs::File::create(recent_sessions_path())?;
	for name in entries {
		writeln!(file, "{name}")?;
	}

	Ok(())
}

fn recent_sessions_path() -> PathBuf {
	state_dir().join(RECENT_SESSIONS_FILE)
}

pub fn default_storage_dir() -> PathBuf {
	state_dir().join("sessions")
}

pub fn state_dir() -> PathBuf {
	if let Some(path) = env::var_os("FLOWSHOP_STATE_DIR") {
		return PathBuf::from(path);
	}

	#[cfg(target_os = "windows")]
	{
		if let Some(path) = env::var_os("LOCALAPPDATA") {
			return PathBuf::from(path).join(APP_DIR);
		}
	}

	if let Some(path) = env::var_os("XDG_STATE_HOME") {
		return PathBuf::from(path).join(APP_DIR);
	}

	if let Some(path) = env::var_os("HOME") {
		return PathBuf::from(path).join(".local").join("state").join(APP_DIR);
	}

	PathBuf::from(format!(".{APP_DIR}"))
}
