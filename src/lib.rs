pub mod constants;
pub mod cpu_info;
pub mod display;
pub mod domain;
pub mod energy;
pub mod error;
pub mod monitor;
pub mod power;
pub mod util;

use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crate::cpu_info::CpuInfo;
use crate::display::{Dashboard, DisplayEvent, Termination, run_dashboard, run_plain};
use crate::domain::{DomainRegistry, RAPL_DOMAINS};
use crate::energy::resolve_energy_unit;
use crate::error::{AppError, StartupError};
use crate::monitor::{FaultPolicy, PowerSampler, spawn_sampler};
use crate::util::msr::{MsrDevice, running_as_root};

/// How readings are presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
	/// Full-screen interactive dashboard
	Dashboard,
	/// One line per sample on stdout
	Plain,
}

/// Runtime options for [`monitor_cpu_power`]
#[derive(Debug, Clone)]
pub struct Options {
	/// CPU whose MSR device is read
	pub cpu_id: usize,
	pub mode: OutputMode,
	/// Plain mode only: stop after this many samples (0 = no limit)
	pub samples: u64,
}

impl Default for Options {
	fn default() -> Self {
		Self {
			cpu_id: 0,
			mode: OutputMode::Dashboard,
			samples: 0,
		}
	}
}

impl OutputMode {
	/// Dashboard stops on the first failed read, plain output skips the domain for that tick
	pub fn fault_policy(self) -> FaultPolicy {
		match self {
			OutputMode::Dashboard => FaultPolicy::Abort,
			OutputMode::Plain => FaultPolicy::Skip,
		}
	}
}

/// Opens the MSR device, resolves the energy unit and probes every domain
pub fn start_sampler(cpu_id: usize, policy: FaultPolicy) -> Result<PowerSampler<MsrDevice>, StartupError> {
	if !running_as_root() {
		log::warn!("Not running as root; reading MSRs will most likely fail");
	}

	let device = MsrDevice::open(cpu_id)?;
	log::info!("Opened {}", MsrDevice::device_path(device.cpu_id()).display());

	let energy_unit = resolve_energy_unit(&device)?;
	let registry = DomainRegistry::probe(&device, &RAPL_DOMAINS)?;
	let started = Instant::now();

	if registry.is_empty() {
		return Err(StartupError::NoDomains);
	}

	Ok(PowerSampler::new(device, registry, energy_unit, started, policy))
}

/// Starts monitoring CPU power and displays the results
///
/// This is the main entry point: it sets up the sampler, runs it on its own
/// thread and drives the chosen display until the user quits or sampling fails.
pub fn monitor_cpu_power(options: &Options) -> Result<Termination, AppError> {
	let cpu = CpuInfo::detect();
	if !cpu.is_intel() {
		log::warn!("{} CPU detected; energy MSRs follow the Intel RAPL layout", cpu.vendor);
	}

	let sampler = start_sampler(options.cpu_id, options.mode.fault_policy())?;
	let domain_order = sampler.registry().order().to_vec();

	// Create a channel to send power readings from the sampling thread to the display
	let (tx, rx) = mpsc::channel::<DisplayEvent>();

	if options.mode == OutputMode::Plain {
		// Turn Ctrl+C into a clean quit; the dashboard reads it as a key in raw mode
		let quit_tx = tx.clone();
		ctrlc::set_handler(move || {
			log::info!("Received interrupt, exiting...");
			let _ = quit_tx.send(DisplayEvent::Quit);
		})?;
	}

	// The sampling thread is not joined: it ends with the process
	spawn_sampler(sampler, tx, Duration::from_millis(constants::SAMPLE_INTERVAL_MS))?;

	let termination = match options.mode {
		OutputMode::Dashboard => run_dashboard(&rx, Dashboard::new(&cpu, &domain_order))?,
		OutputMode::Plain => {
			println!("{} ({})", cpu.brand, cpu.vendor);
			println!(
				"Sampling {} every {} ms",
				domain_order.join(", "),
				constants::SAMPLE_INTERVAL_MS
			);
			run_plain(&rx, &mut io::stdout().lock(), options.samples)?
		},
	};

	Ok(termination)
}
