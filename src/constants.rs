// Intel RAPL MSR addresses
pub const INTEL_POWER_UNIT_MSR: u64 = 0x606;
pub const INTEL_PKG_ENERGY_MSR: u64 = 0x611;
pub const INTEL_DRAM_ENERGY_MSR: u64 = 0x619;
pub const INTEL_PP0_ENERGY_MSR: u64 = 0x639;
pub const INTEL_PP1_ENERGY_MSR: u64 = 0x641;

// Energy status counters are 32 bits wide; the upper half of the MSR is reserved
pub const ENERGY_COUNTER_MASK: u64 = 0xFFFF_FFFF;

// Bits 12:8 of the power unit MSR hold the energy status unit exponent
pub const ENERGY_UNIT_SHIFT: u64 = 8;
pub const ENERGY_UNIT_MASK: u64 = 0x1F;

// Monitoring and display settings
pub const SAMPLE_INTERVAL_MS: u64 = 2000;
pub const DISPLAY_POLL_INTERVAL_MS: u64 = 100;
