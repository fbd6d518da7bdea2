use std::fs;

const UNKNOWN: &str = "Unknown";

/// Identity of the host CPU, shown in the display header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuInfo {
	/// Vendor string, e.g. `GenuineIntel`
	pub vendor: String,
	/// Marketing name of the processor
	pub brand: String,
	pub logical_cpus: usize,
	pub physical_cores: usize,
}

impl CpuInfo {
	/// Detects the CPU by reading /proc/cpuinfo
	pub fn detect() -> Self {
		let cpuinfo = fs::read_to_string("/proc/cpuinfo").unwrap_or_default();
		let (vendor, brand) = parse_cpuinfo(&cpuinfo);

		Self {
			vendor,
			brand,
			logical_cpus: num_cpus::get(),
			physical_cores: num_cpus::get_physical(),
		}
	}

	pub fn is_intel(&self) -> bool {
		self.vendor == "GenuineIntel"
	}
}

/// Extracts the vendor and brand strings of the first processor entry
fn parse_cpuinfo(cpuinfo: &str) -> (String, String) {
	let mut vendor = None;
	let mut brand = None;

	for line in cpuinfo.lines() {
		// Only the first processor block is needed
		if line.trim().is_empty() && (vendor.is_some() || brand.is_some()) {
			break;
		}
		let Some((key, value)) = line.split_once(':') else {
			continue;
		};
		match key.trim() {
			"vendor_id" => vendor = Some(value.trim().to_string()),
			"model name" => brand = Some(value.trim().to_string()),
			_ => {},
		}
	}

	(
		vendor.filter(|v| !v.is_empty()).unwrap_or_else(|| UNKNOWN.to_string()),
		brand.filter(|b| !b.is_empty()).unwrap_or_else(|| UNKNOWN.to_string()),
	)
}
