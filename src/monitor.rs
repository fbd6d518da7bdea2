use std::io;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::display::DisplayEvent;
use crate::domain::{DomainRegistry, energy_counter};
use crate::energy::EnergyUnit;
use crate::error::SampleError;
use crate::power::Snapshot;
use crate::util::msr::RegisterAccess;
use crate::util::{consumed_ticks, power_watts};

/// What the sampler does when a steady-state register read fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPolicy {
	/// Stop sampling and report the failure
	Abort,
	/// Log the failure, leave the domain out of this snapshot and re-baseline it
	Skip,
}

/// Turns successive energy counter readings into per-domain power
///
/// Owns the domain registry exclusively; consumers only ever see the
/// [`Snapshot`] copies it produces.
#[derive(Debug)]
pub struct PowerSampler<R> {
	registers: R,
	registry: DomainRegistry,
	energy_unit: EnergyUnit,
	last_sample_time: Instant,
	policy: FaultPolicy,
}

impl<R: RegisterAccess> PowerSampler<R> {
	/// Creates a sampler whose first interval starts at `started`
	///
	/// `started` should be the moment the registry recorded its initial counters.
	pub fn new(
		registers: R,
		registry: DomainRegistry,
		energy_unit: EnergyUnit,
		started: Instant,
		policy: FaultPolicy,
	) -> Self {
		Self {
			registers,
			registry,
			energy_unit,
			last_sample_time: started,
			policy,
		}
	}

	pub fn registry(&self) -> &DomainRegistry {
		&self.registry
	}

	/// Samples every present domain at `now`
	///
	/// Returns `Ok(None)` when no time has elapsed since the previous sample;
	/// nothing is read and no state changes in that case.
	pub fn sample(&mut self, now: Instant) -> Result<Option<Snapshot>, SampleError> {
		let elapsed = now.saturating_duration_since(self.last_sample_time);
		if elapsed.is_zero() {
			log::debug!("Skipping tick: no time elapsed since the last sample");
			return Ok(None);
		}

		let elapsed_secs = elapsed.as_secs_f64();
		let joules_per_tick = self.energy_unit.joules_per_tick();

		// Read every domain before touching any state, so a failed tick leaves
		// all baselines at the previous successful sample
		let mut readings = Vec::with_capacity(self.registry.order().len());
		for (index, domain) in self.registry.domains().iter().enumerate().filter(|(_, d)| d.exists) {
			match self.registers.read(domain.offset) {
				Ok(raw) => readings.push((index, Some(energy_counter(raw)))),
				Err(source) => {
					let err = SampleError::Read {
						domain: domain.name,
						offset: domain.offset,
						source,
					};
					match self.policy {
						FaultPolicy::Abort => return Err(err),
						FaultPolicy::Skip => {
							log::error!("{}", err);
							readings.push((index, None));
						},
					}
				},
			}
		}

		let mut snapshot = Snapshot::new();
		let domains = self.registry.domains_mut();
		for (index, current) in readings {
			let domain = &mut domains[index];
			match (domain.last_raw_energy, current) {
				(Some(last), Some(current)) => {
					let ticks = consumed_ticks(last, current);
					let watts = power_watts(ticks, joules_per_tick, elapsed_secs);
					log::debug!(
						"{}: {} -> {} ({} ticks over {:.3}s) = {:.3} W",
						domain.name,
						last,
						current,
						ticks,
						elapsed_secs,
						watts
					);
					snapshot.insert(domain.name, watts);
				},
				(None, Some(_)) => log::info!("Re-established {} counter baseline", domain.name),
				(_, None) => {},
			}
			domain.last_raw_energy = current;
		}

		self.last_sample_time = now;
		Ok(Some(snapshot))
	}
}

/// Samples once at `now` and forwards the outcome to the display
///
/// Returns false once the sampler should stop: after a sampling failure,
/// which is forwarded as [`DisplayEvent::FatalError`], or when the display
/// has gone away. A skipped tick sends nothing.
pub fn forward_sample<R: RegisterAccess>(sampler: &mut PowerSampler<R>, now: Instant, tx: &Sender<DisplayEvent>) -> bool {
	match sampler.sample(now) {
		Ok(Some(snapshot)) => {
			if tx.send(DisplayEvent::PowerUpdate(snapshot)).is_err() {
				log::debug!("Display closed, stopping sampler");
				return false;
			}
			true
		},
		Ok(None) => true,
		Err(e) => {
			log::error!("Sampling stopped: {}", e);
			let _ = tx.send(DisplayEvent::FatalError(e.to_string()));
			false
		},
	}
}

/// Runs the sampler on its own thread, one sample per `interval`
///
/// Snapshots are sent in tick order; see [`forward_sample`] for when the
/// thread ends.
pub fn spawn_sampler<R>(
	mut sampler: PowerSampler<R>,
	tx: Sender<DisplayEvent>,
	interval: Duration,
) -> io::Result<JoinHandle<()>>
where
	R: RegisterAccess + 'static,
{
	thread::Builder::new().name("power-sampler".into()).spawn(move || {
		let mut next_tick = Instant::now() + interval;

		loop {
			thread::sleep(next_tick.saturating_duration_since(Instant::now()));
			next_tick += interval;

			if !forward_sample(&mut sampler, Instant::now(), &tx) {
				break;
			}
		}
	})
}
