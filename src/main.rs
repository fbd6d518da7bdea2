use std::process::ExitCode;

use clap::{ArgAction, Parser};
use wattch::display::Termination;
use wattch::error::AppError;
use wattch::{Options, OutputMode, monitor_cpu_power};

/// Real-time CPU power draw per RAPL domain, read from the energy MSRs
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
	/// CPU whose /dev/cpu/N/msr device is read
	#[arg(short, long, default_value_t = 0)]
	cpu: usize,

	/// Print one line per sample instead of the interactive dashboard
	#[arg(long)]
	plain: bool,

	/// Number of samples to print in plain mode (default: until interrupted)
	#[arg(short = 'n', long, requires = "plain")]
	samples: Option<u64>,

	/// Increase log verbosity (-v info, -vv debug)
	#[arg(short, long, action = ArgAction::Count)]
	verbose: u8,
}

fn init_logging(verbose: u8) {
	let level = match verbose {
		0 => "warn",
		1 => "info",
		_ => "debug",
	};
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> ExitCode {
	let cli = Cli::parse();
	init_logging(cli.verbose);

	let options = Options {
		cpu_id: cli.cpu,
		mode: if cli.plain {
			OutputMode::Plain
		} else {
			OutputMode::Dashboard
		},
		samples: cli.samples.unwrap_or(0),
	};

	match outcome(monitor_cpu_power(&options)) {
		Ok(()) => ExitCode::SUCCESS,
		Err(message) => {
			eprintln!("{}", message);
			ExitCode::FAILURE
		},
	}
}

/// Maps how monitoring ended to success, or to the message to print before
/// exiting with a failure status
fn outcome(result: Result<Termination, AppError>) -> Result<(), String> {
	match result {
		Ok(Termination::Quit) => Ok(()),
		Ok(Termination::Fatal(message)) => Err(format!("Error: {}", message)),
		Err(e) => Err(format!("Error: {}", e)),
	}
}
