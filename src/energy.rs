use crate::constants::{ENERGY_UNIT_MASK, ENERGY_UNIT_SHIFT, INTEL_POWER_UNIT_MSR};
use crate::error::StartupError;
use crate::util::msr::RegisterAccess;

/// Joules represented by one tick of an energy status counter
///
/// Derived once at startup from the power unit MSR and fixed afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyUnit {
	exponent: u8,
	joules_per_tick: f64,
}

impl EnergyUnit {
	/// Builds the unit from the 5-bit energy status exponent, as `2^-exponent` J
	pub fn from_exponent(exponent: u8) -> Self {
		let exponent = exponent & ENERGY_UNIT_MASK as u8;
		Self {
			exponent,
			joules_per_tick: 0.5f64.powi(i32::from(exponent)),
		}
	}

	/// Extracts bits 12:8 of a raw power unit MSR value
	pub fn from_register(raw: u64) -> Self {
		Self::from_exponent(((raw >> ENERGY_UNIT_SHIFT) & ENERGY_UNIT_MASK) as u8)
	}

	pub fn exponent(&self) -> u8 {
		self.exponent
	}

	pub fn joules_per_tick(&self) -> f64 {
		self.joules_per_tick
	}
}

/// Reads the power unit MSR and resolves the energy unit
///
/// Failure is fatal: without the unit no counter value can be turned into watts.
pub fn resolve_energy_unit<R: RegisterAccess + ?Sized>(registers: &R) -> Result<EnergyUnit, StartupError> {
	let raw = registers
		.read(INTEL_POWER_UNIT_MSR)
		.map_err(|source| StartupError::EnergyUnit {
			offset: INTEL_POWER_UNIT_MSR,
			source,
		})?;

	let unit = EnergyUnit::from_register(raw);
	log::info!(
		"Energy unit: 2^-{} J ({:.9} J per tick)",
		unit.exponent(),
		unit.joules_per_tick()
	);
	Ok(unit)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::RegisterError;
	use std::io;

	struct UnitRegister(Option<u64>);

	impl RegisterAccess for UnitRegister {
		fn read(&self, offset: u64) -> Result<u64, RegisterError> {
			assert_eq!(offset, INTEL_POWER_UNIT_MSR);
			self.0.ok_or_else(|| RegisterError::Read {
				offset,
				source: io::Error::from_raw_os_error(libc::EACCES),
			})
		}
	}

	#[test]
	fn unit_is_negative_power_of_two() {
		let mut previous = f64::INFINITY;
		for e in 0..=31u8 {
			let unit = EnergyUnit::from_exponent(e).joules_per_tick();
			assert_eq!(unit, 2f64.powi(-i32::from(e)));
			assert!(unit > 0.0 && unit <= 1.0);
			assert!(unit < previous);
			previous = unit;
		}
	}

	#[test]
	fn exponent_taken_from_bits_8_to_12() {
		// Typical client value: power unit 3, energy unit 14, time unit 10
		let unit = EnergyUnit::from_register(0x000A_0E03);
		assert_eq!(unit.exponent(), 14);

		// Bits outside 12:8 are ignored
		let unit = EnergyUnit::from_register(0xFFFF_E0FF | (3 << 8));
		assert_eq!(unit.exponent(), 3);
		assert_eq!(unit.joules_per_tick(), 0.125);
	}

	#[test]
	fn resolve_reads_unit_register() {
		let unit = resolve_energy_unit(&UnitRegister(Some(3 << 8))).unwrap();
		assert_eq!(unit.joules_per_tick(), 0.125);
	}

	#[test]
	fn unreadable_unit_register_is_fatal() {
		let err = resolve_energy_unit(&UnitRegister(None)).unwrap_err();
		assert!(matches!(err, StartupError::EnergyUnit { offset: INTEL_POWER_UNIT_MSR, .. }));
	}
}
