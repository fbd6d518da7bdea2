use std::io::{self, Write};
use std::sync::mpsc::{Receiver, RecvError, TryRecvError};
use std::time::Duration;

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Print, Stylize};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};

use crate::constants::DISPLAY_POLL_INTERVAL_MS;
use crate::cpu_info::CpuInfo;
use crate::power::Snapshot;

const TITLE: &str = "Wattch - CPU Power Monitor";
const SPINNER_FRAMES: [char; 8] = ['⣾', '⣽', '⣻', '⢿', '⡿', '⣟', '⣯', '⣷'];

/// Messages delivered to the display
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayEvent {
	PowerUpdate(Snapshot),
	FatalError(String),
	/// Quit requested outside the display's own input, e.g. SIGINT
	Quit,
}

/// Why the display stopped
#[derive(Debug, Clone, PartialEq)]
pub enum Termination {
	Quit,
	Fatal(String),
}

/// UI state: waiting for data, showing the latest snapshot, or finished
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DisplayState {
	#[default]
	WaitingForFirstSample,
	ShowingData(Snapshot),
	Terminated(Termination),
}

impl DisplayState {
	/// Applies an inbound message
	///
	/// A snapshot replaces whatever was shown before. Once terminated the
	/// state never changes again.
	pub fn apply(self, event: DisplayEvent) -> Self {
		match (self, event) {
			(DisplayState::Terminated(t), _) => DisplayState::Terminated(t),
			(_, DisplayEvent::PowerUpdate(snapshot)) => DisplayState::ShowingData(snapshot),
			(_, DisplayEvent::FatalError(message)) => DisplayState::Terminated(Termination::Fatal(message)),
			(_, DisplayEvent::Quit) => DisplayState::Terminated(Termination::Quit),
		}
	}

	/// Applies a user quit request
	pub fn quit(self) -> Self {
		match self {
			DisplayState::Terminated(t) => DisplayState::Terminated(t),
			_ => DisplayState::Terminated(Termination::Quit),
		}
	}

	pub fn is_terminated(&self) -> bool {
		matches!(self, DisplayState::Terminated(_))
	}
}

/// Returns true for the keys that quit the dashboard: `q`, `Esc` and `Ctrl+C`
pub fn is_quit_key(key: KeyEvent) -> bool {
	if key.kind != KeyEventKind::Press {
		return false;
	}
	match key.code {
		KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => true,
		KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
		_ => false,
	}
}

/// A single rendered row of the dashboard
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
	pub text: String,
	pub bold: bool,
}

impl Line {
	fn plain(text: impl Into<String>) -> Self {
		Self {
			text: text.into(),
			bold: false,
		}
	}

	fn bold(text: impl Into<String>) -> Self {
		Self {
			text: text.into(),
			bold: true,
		}
	}
}

/// Full-screen view of the current power readings
#[derive(Debug)]
pub struct Dashboard<'a> {
	cpu: &'a CpuInfo,
	domain_order: &'a [&'static str],
	spinner_frame: usize,
}

impl<'a> Dashboard<'a> {
	pub fn new(cpu: &'a CpuInfo, domain_order: &'a [&'static str]) -> Self {
		Self {
			cpu,
			domain_order,
			spinner_frame: 0,
		}
	}

	/// Advances the waiting spinner by one frame
	pub fn tick(&mut self) {
		self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAMES.len();
	}

	/// Builds the rows to draw for `state`
	pub fn lines(&self, state: &DisplayState) -> Vec<Line> {
		if let DisplayState::Terminated(Termination::Fatal(message)) = state {
			return vec![Line::plain(""), Line::bold(format!("Error: {}", message))];
		}

		let mut lines = vec![
			Line::bold(format!(" {} ", TITLE)),
			Line::plain(""),
			Line::plain(format!(" {:<8} {}", "Vendor:", self.cpu.vendor)),
			Line::plain(format!(" {:<8} {}", "Model:", self.cpu.brand)),
			Line::plain(format!(
				" {:<8} {} physical, {} logical",
				"Cores:", self.cpu.physical_cores, self.cpu.logical_cpus
			)),
			Line::plain(""),
		];

		match state {
			DisplayState::ShowingData(snapshot) => {
				lines.push(Line::bold(" Current Power Consumption"));
				// Domains missing from the snapshot are skipped rather than shown stale
				for name in self.domain_order {
					if let Some(watts) = snapshot.get(name) {
						lines.push(Line::plain(format!("  {:<15}: {:.2} W", name, watts)));
					}
				}
			},
			_ => lines.push(Line::plain(format!(
				" {} Waiting for first power reading...",
				SPINNER_FRAMES[self.spinner_frame]
			))),
		}

		lines.push(Line::plain(""));
		lines.push(Line::plain(""));
		lines.push(Line::plain(" Press 'q' to quit."));
		lines
	}

	/// Redraws the whole screen
	pub fn render<W: Write>(&self, out: &mut W, state: &DisplayState) -> io::Result<()> {
		queue!(out, Clear(ClearType::All))?;
		for (row, line) in self.lines(state).iter().enumerate() {
			queue!(out, MoveTo(0, row as u16))?;
			if line.bold {
				queue!(out, Print(line.text.as_str().bold()))?;
			} else {
				queue!(out, Print(&line.text))?;
			}
		}
		out.flush()
	}
}

/// Puts the terminal in raw mode on the alternate screen until dropped
struct TerminalGuard;

impl TerminalGuard {
	fn enter() -> io::Result<Self> {
		terminal::enable_raw_mode()?;
		if let Err(e) = execute!(io::stdout(), EnterAlternateScreen, Hide) {
			let _ = terminal::disable_raw_mode();
			return Err(e);
		}
		Ok(Self)
	}
}

impl Drop for TerminalGuard {
	fn drop(&mut self) {
		let _ = execute!(io::stdout(), Show, LeaveAlternateScreen);
		let _ = terminal::disable_raw_mode();
	}
}

/// Runs the interactive dashboard until the user quits or sampling fails
///
/// Waits on keyboard input and sampler messages; the terminal is restored
/// before this returns.
pub fn run_dashboard(rx: &Receiver<DisplayEvent>, mut dashboard: Dashboard<'_>) -> io::Result<Termination> {
	let _guard = TerminalGuard::enter()?;
	let mut stdout = io::stdout();
	let mut state = DisplayState::default();
	let poll_interval = Duration::from_millis(DISPLAY_POLL_INTERVAL_MS);

	loop {
		// Apply every pending message in the order it was sent
		loop {
			match rx.try_recv() {
				Ok(msg) => state = state.apply(msg),
				Err(TryRecvError::Empty) => break,
				Err(TryRecvError::Disconnected) => {
					state = state.apply(DisplayEvent::FatalError("power sampler stopped unexpectedly".into()));
					break;
				},
			}
		}

		state = match state {
			DisplayState::Terminated(t) => return Ok(t),
			other => other,
		};

		dashboard.render(&mut stdout, &state)?;

		if event::poll(poll_interval)? {
			if let Event::Key(key) = event::read()? {
				if is_quit_key(key) {
					state = state.quit();
				}
			}
		}
		dashboard.tick();
	}
}

/// Formats a snapshot as a single line, e.g. `Package: 12.34 W | DRAM: 1.20 W`
pub fn format_plain(snapshot: &Snapshot) -> String {
	snapshot
		.iter()
		.map(|(name, watts)| format!("{}: {:.2} W", name, watts))
		.collect::<Vec<_>>()
		.join(" | ")
}

/// Prints one line per snapshot to `out`
///
/// Stops after `max_samples` snapshots (0 = no limit), on a quit request or
/// on a fatal message.
pub fn run_plain<W: Write>(rx: &Receiver<DisplayEvent>, out: &mut W, max_samples: u64) -> io::Result<Termination> {
	let mut printed = 0u64;

	loop {
		match rx.recv() {
			Ok(DisplayEvent::PowerUpdate(snapshot)) => {
				writeln!(out, "{}", format_plain(&snapshot))?;
				out.flush()?;
				printed += 1;
				if max_samples > 0 && printed >= max_samples {
					return Ok(Termination::Quit);
				}
			},
			Ok(DisplayEvent::FatalError(message)) => return Ok(Termination::Fatal(message)),
			Ok(DisplayEvent::Quit) => return Ok(Termination::Quit),
			Err(RecvError) => return Ok(Termination::Fatal("power sampler stopped unexpectedly".into())),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::mpsc;

	use super::*;

	fn snapshot(readings: &[(&'static str, f64)]) -> Snapshot {
		let mut snapshot = Snapshot::new();
		for &(name, watts) in readings {
			snapshot.insert(name, watts);
		}
		snapshot
	}

	fn cpu() -> CpuInfo {
		CpuInfo {
			vendor: "GenuineIntel".into(),
			brand: "Intel(R) Core(TM) i7-8650U CPU @ 1.90GHz".into(),
			logical_cpus: 8,
			physical_cores: 4,
		}
	}

	fn texts(lines: &[Line]) -> Vec<&str> {
		lines.iter().map(|l| l.text.as_str()).collect()
	}

	#[test]
	fn first_snapshot_leaves_waiting_state() {
		let state = DisplayState::default();
		assert_eq!(state, DisplayState::WaitingForFirstSample);

		let update = snapshot(&[("Package", 12.5)]);
		let state = state.apply(DisplayEvent::PowerUpdate(update.clone()));
		assert_eq!(state, DisplayState::ShowingData(update));
	}

	#[test]
	fn latest_snapshot_wins() {
		let state = DisplayState::default()
			.apply(DisplayEvent::PowerUpdate(snapshot(&[("Package", 1.0)])))
			.apply(DisplayEvent::PowerUpdate(snapshot(&[("Package", 2.0)])));
		assert_eq!(state, DisplayState::ShowingData(snapshot(&[("Package", 2.0)])));
	}

	#[test]
	fn fatal_error_terminates_from_any_state() {
		let waiting = DisplayState::default().apply(DisplayEvent::FatalError("boom".into()));
		assert_eq!(waiting, DisplayState::Terminated(Termination::Fatal("boom".into())));

		let showing = DisplayState::default()
			.apply(DisplayEvent::PowerUpdate(snapshot(&[("Package", 1.0)])))
			.apply(DisplayEvent::FatalError("boom".into()));
		assert_eq!(showing, DisplayState::Terminated(Termination::Fatal("boom".into())));
	}

	#[test]
	fn terminated_is_final() {
		let state = DisplayState::default().quit();
		assert_eq!(state, DisplayState::Terminated(Termination::Quit));

		let state = state
			.apply(DisplayEvent::PowerUpdate(snapshot(&[("Package", 1.0)])))
			.apply(DisplayEvent::FatalError("late".into()))
			.quit();
		assert_eq!(state, DisplayState::Terminated(Termination::Quit));
		assert!(state.is_terminated());
	}

	#[test]
	fn quit_event_terminates_cleanly() {
		let state = DisplayState::default()
			.apply(DisplayEvent::PowerUpdate(snapshot(&[("Package", 1.0)])))
			.apply(DisplayEvent::Quit);
		assert_eq!(state, DisplayState::Terminated(Termination::Quit));
	}

	#[test]
	fn quit_keys() {
		assert!(is_quit_key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE)));
		assert!(is_quit_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)));
		assert!(is_quit_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
		assert!(!is_quit_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE)));
		assert!(!is_quit_key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE)));
	}

	#[test]
	fn waiting_view_shows_spinner() {
		let cpu = cpu();
		let order = ["Package"];
		let dashboard = Dashboard::new(&cpu, &order);
		let lines = dashboard.lines(&DisplayState::default());
		let texts = texts(&lines);

		assert_eq!(texts[0], format!(" {} ", TITLE));
		assert!(texts.contains(&" Vendor:  GenuineIntel"));
		assert!(texts.iter().any(|t| t.contains("Waiting for first power reading")));
		assert_eq!(*texts.last().unwrap(), " Press 'q' to quit.");
	}

	#[test]
	fn data_view_follows_domain_order() {
		let cpu = cpu();
		let order = ["Package", "Cores (PP0)", "DRAM"];
		let dashboard = Dashboard::new(&cpu, &order);
		let state = DisplayState::ShowingData(snapshot(&[("DRAM", 1.5), ("Package", 20.0), ("Cores (PP0)", 12.25)]));
		let lines = dashboard.lines(&state);

		let rows: Vec<_> = texts(&lines).into_iter().filter(|t| t.ends_with(" W")).collect();
		assert_eq!(
			rows,
			[
				"  Package        : 20.00 W",
				"  Cores (PP0)    : 12.25 W",
				"  DRAM           : 1.50 W"
			]
		);
	}

	#[test]
	fn fatal_view_shows_error() {
		let cpu = cpu();
		let dashboard = Dashboard::new(&cpu, &[]);
		let state = DisplayState::Terminated(Termination::Fatal("failed to read MSR for DRAM".into()));
		let lines = dashboard.lines(&state);
		assert_eq!(lines.last().unwrap().text, "Error: failed to read MSR for DRAM");
	}

	#[test]
	fn plain_line_format() {
		let line = format_plain(&snapshot(&[("Package", 12.345), ("DRAM", 1.2)]));
		assert_eq!(line, "Package: 12.35 W | DRAM: 1.20 W");
	}

	#[test]
	fn plain_output_stops_after_requested_samples() {
		let (tx, rx) = mpsc::channel();
		for watts in [1.0, 2.0, 3.0] {
			tx.send(DisplayEvent::PowerUpdate(snapshot(&[("Package", watts)]))).unwrap();
		}

		let mut out = Vec::new();
		let termination = run_plain(&rx, &mut out, 2).unwrap();
		assert_eq!(termination, Termination::Quit);
		assert_eq!(String::from_utf8(out).unwrap(), "Package: 1.00 W\nPackage: 2.00 W\n");
	}

	#[test]
	fn plain_output_surfaces_fatal_error() {
		let (tx, rx) = mpsc::channel();
		tx.send(DisplayEvent::PowerUpdate(snapshot(&[("DRAM", 1.0)]))).unwrap();
		tx.send(DisplayEvent::FatalError("failed to read MSR for DRAM".into())).unwrap();

		let mut out = Vec::new();
		let termination = run_plain(&rx, &mut out, 0).unwrap();
		assert_eq!(termination, Termination::Fatal("failed to read MSR for DRAM".into()));
	}

	#[test]
	fn plain_output_stops_on_interrupt() {
		let (tx, rx) = mpsc::channel();
		tx.send(DisplayEvent::PowerUpdate(snapshot(&[("Package", 4.0)]))).unwrap();
		tx.send(DisplayEvent::Quit).unwrap();
		tx.send(DisplayEvent::PowerUpdate(snapshot(&[("Package", 5.0)]))).unwrap();

		let mut out = Vec::new();
		let termination = run_plain(&rx, &mut out, 0).unwrap();
		assert_eq!(termination, Termination::Quit);
		assert_eq!(String::from_utf8(out).unwrap(), "Package: 4.00 W\n");
	}

	#[test]
	fn plain_output_reports_vanished_sampler() {
		let (tx, rx) = mpsc::channel::<DisplayEvent>();
		drop(tx);
		let mut out = Vec::new();
		assert!(matches!(run_plain(&rx, &mut out, 0).unwrap(), Termination::Fatal(_)));
	}
}
