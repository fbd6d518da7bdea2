use crate::constants::{
	ENERGY_COUNTER_MASK, INTEL_DRAM_ENERGY_MSR, INTEL_PKG_ENERGY_MSR, INTEL_PP0_ENERGY_MSR, INTEL_PP1_ENERGY_MSR,
};
use crate::error::StartupError;
use crate::util::msr::RegisterAccess;

/// A known RAPL energy domain and the MSR holding its energy status counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainSpec {
	pub name: &'static str,
	pub offset: u64,
}

/// The RAPL domains this monitor knows about, in display order
pub const RAPL_DOMAINS: [DomainSpec; 4] = [
	DomainSpec {
		name: "Package",
		offset: INTEL_PKG_ENERGY_MSR,
	},
	DomainSpec {
		name: "Cores (PP0)",
		offset: INTEL_PP0_ENERGY_MSR,
	},
	DomainSpec {
		name: "GPU (PP1)",
		offset: INTEL_PP1_ENERGY_MSR,
	},
	DomainSpec {
		name: "DRAM",
		offset: INTEL_DRAM_ENERGY_MSR,
	},
];

/// Keeps the 32 implemented bits of an energy status MSR
pub const fn energy_counter(raw: u64) -> u64 {
	raw & ENERGY_COUNTER_MASK
}

/// One energy accounting domain and its sampling state
#[derive(Debug, Clone, PartialEq)]
pub struct PowerDomain {
	pub name: &'static str,
	pub offset: u64,

	/// Whether the CPU implements this domain; fixed at startup
	pub exists: bool,

	/// Counter value from the most recent successful read
	///
	/// `None` for absent domains, or after a failed read until the next
	/// successful one re-establishes the baseline.
	pub last_raw_energy: Option<u64>,
}

/// The probed set of domains
#[derive(Debug, Clone)]
pub struct DomainRegistry {
	domains: Vec<PowerDomain>,
	order: Vec<&'static str>,
}

impl DomainRegistry {
	/// Probes every domain once and records its initial counter value
	///
	/// A domain whose register is not implemented is recorded as absent.
	/// Any other read failure aborts startup.
	pub fn probe<R: RegisterAccess + ?Sized>(registers: &R, specs: &[DomainSpec]) -> Result<Self, StartupError> {
		let mut domains = Vec::with_capacity(specs.len());
		let mut order = Vec::new();

		for spec in specs {
			let domain = match registers.read(spec.offset) {
				Ok(raw) => {
					log::info!("Found {} domain (0x{:x})", spec.name, spec.offset);
					order.push(spec.name);
					PowerDomain {
						name: spec.name,
						offset: spec.offset,
						exists: true,
						last_raw_energy: Some(energy_counter(raw)),
					}
				},
				Err(e) if e.is_unsupported() => {
					log::info!("{} domain not present on this CPU", spec.name);
					PowerDomain {
						name: spec.name,
						offset: spec.offset,
						exists: false,
						last_raw_energy: None,
					}
				},
				Err(source) => {
					return Err(StartupError::Probe {
						domain: spec.name,
						offset: spec.offset,
						source,
					});
				},
			};
			domains.push(domain);
		}

		Ok(Self { domains, order })
	}

	/// Names of the present domains in registration order
	pub fn order(&self) -> &[&'static str] {
		&self.order
	}

	pub fn domains(&self) -> &[PowerDomain] {
		&self.domains
	}

	pub(crate) fn domains_mut(&mut self) -> &mut [PowerDomain] {
		&mut self.domains
	}

	pub fn get(&self, name: &str) -> Option<&PowerDomain> {
		self.domains.iter().find(|d| d.name == name)
	}

	pub fn is_empty(&self) -> bool {
		self.order.is_empty()
	}
}
