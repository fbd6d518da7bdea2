/// Power draw of every present domain for one sampling interval
///
/// Entries keep the registration order of the domains (Package, Cores, GPU,
/// DRAM), independent of the order they were sampled in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
	readings: Vec<(&'static str, f64)>,
}

impl Snapshot {
	pub fn new() -> Self {
		Self::default()
	}

	pub(crate) fn insert(&mut self, domain: &'static str, watts: f64) {
		match self.readings.iter_mut().find(|(name, _)| *name == domain) {
			Some(entry) => entry.1 = watts,
			None => self.readings.push((domain, watts)),
		}
	}

	/// Power in watts for the named domain
	pub fn get(&self, domain: &str) -> Option<f64> {
		self.readings
			.iter()
			.find(|(name, _)| *name == domain)
			.map(|&(_, watts)| watts)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
		self.readings.iter().copied()
	}

	pub fn len(&self) -> usize {
		self.readings.len()
	}

	pub fn is_empty(&self) -> bool {
		self.readings.is_empty()
	}
}
