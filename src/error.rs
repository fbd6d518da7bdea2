use std::io;
use std::path::PathBuf;

/// Errors raised by the register access layer
#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
	#[error("failed to open {}: permission denied. Please run as root", path.display())]
	PermissionDenied { path: PathBuf },

	#[error("failed to open {}: {source}. Is the msr kernel module loaded?", path.display())]
	Open {
		path: PathBuf,
		#[source]
		source: io::Error,
	},

	/// The msr driver answers EIO for registers the CPU does not implement
	#[error("register 0x{offset:x} is not implemented by this CPU")]
	Unsupported { offset: u64 },

	#[error("failed to read register 0x{offset:x}: {source}")]
	Read {
		offset: u64,
		#[source]
		source: io::Error,
	},
}

impl RegisterError {
	/// Whether this error means the register simply does not exist on this CPU
	pub fn is_unsupported(&self) -> bool {
		matches!(self, RegisterError::Unsupported { .. })
	}
}

/// Errors that prevent the monitor from starting
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
	#[error(transparent)]
	Register(#[from] RegisterError),

	#[error("failed to read the energy unit register (0x{offset:x}): {source}")]
	EnergyUnit {
		offset: u64,
		#[source]
		source: RegisterError,
	},

	#[error("could not probe the {domain} domain (0x{offset:x}): {source}")]
	Probe {
		domain: &'static str,
		offset: u64,
		#[source]
		source: RegisterError,
	},

	#[error("no RAPL energy domain is readable on this CPU")]
	NoDomains,
}

/// Errors raised while sampling in steady state
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
	#[error("failed to read MSR for {domain} (0x{offset:x}): {source}")]
	Read {
		domain: &'static str,
		offset: u64,
		#[source]
		source: RegisterError,
	},
}

// A unified error type for the entire application
#[derive(Debug, thiserror::Error)]
pub enum AppError {
	#[error("{0}")]
	Startup(#[from] StartupError),

	#[error("I/O error: {0}")]
	Io(#[from] io::Error),

	#[error("failed to install the interrupt handler: {0}")]
	Signal(#[from] ctrlc::Error),
}
