pub mod msr;

use crate::constants::ENERGY_COUNTER_MASK;

/// Counts the energy ticks consumed between two counter readings
///
/// The energy status counters are 32-bit and free-running. A current reading
/// below the previous one is taken to mean the counter wrapped exactly once
/// during the interval; more than one wrap per interval cannot be detected.
/// Only the low 32 bits of either reading are considered.
///
/// # Arguments
///
/// * `last` - Previous raw counter value
/// * `current` - Current raw counter value
pub const fn consumed_ticks(last: u64, current: u64) -> u64 {
	let last = last & ENERGY_COUNTER_MASK;
	let current = current & ENERGY_COUNTER_MASK;
	if current < last {
		// Handle counter wrap-around
		(ENERGY_COUNTER_MASK - last) + current
	} else {
		current - last
	}
}

/// Converts consumed energy ticks to average power in watts
///
/// `elapsed_secs` must be strictly positive; callers skip zero-length intervals.
pub fn power_watts(ticks: u64, joules_per_tick: f64, elapsed_secs: f64) -> f64 {
	ticks as f64 * joules_per_tick / elapsed_secs
}
