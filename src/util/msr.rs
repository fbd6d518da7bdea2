use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

use msru::{Accessor, Msr, MsrError};

use crate::constants::INTEL_POWER_UNIT_MSR;
use crate::error::RegisterError;

/// Read access to a CPU's model-specific register space
pub trait RegisterAccess: Send {
	/// Reads the 64-bit value of the register at `offset`
	fn read(&self, offset: u64) -> Result<u64, RegisterError>;

	/// Checks whether the register at `offset` exists on this CPU
	///
	/// Returns `Ok(false)` when the register is not implemented, and
	/// propagates any other failure.
	fn probe(&self, offset: u64) -> Result<bool, RegisterError> {
		match self.read(offset) {
			Ok(_) => Ok(true),
			Err(e) if e.is_unsupported() => Ok(false),
			Err(e) => Err(e),
		}
	}
}

/// The MSR space of one CPU, backed by `/dev/cpu/<id>/msr`
///
/// One [`Msr`] handle is opened per register on its first read and kept for
/// the lifetime of the device; the handles are closed on drop.
pub struct MsrDevice {
	cpu_id: usize,
	handles: RefCell<HashMap<u64, Msr>>,
}

impl MsrDevice {
	/// Opens the MSR device of the given CPU
	///
	/// The power unit register is opened right away so that a missing
	/// kernel module or insufficient privileges surface here.
	/// Requires root privileges and the `msr` kernel module.
	pub fn open(cpu_id: usize) -> Result<Self, RegisterError> {
		let path = Self::device_path(cpu_id);
		let cpu = u16::try_from(cpu_id).map_err(|_| RegisterError::Open {
			path: path.clone(),
			source: io::Error::new(io::ErrorKind::InvalidInput, "CPU id out of range"),
		})?;

		let unit = Msr::new(INTEL_POWER_UNIT_MSR as u32, cpu).map_err(|e| open_error(path, e))?;

		let mut handles = HashMap::new();
		handles.insert(INTEL_POWER_UNIT_MSR, unit);
		Ok(Self {
			cpu_id,
			handles: RefCell::new(handles),
		})
	}

	pub fn device_path(cpu_id: usize) -> PathBuf {
		PathBuf::from(format!("/dev/cpu/{}/msr", cpu_id))
	}

	pub fn cpu_id(&self) -> usize {
		self.cpu_id
	}
}

impl std::fmt::Debug for MsrDevice {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut offsets: Vec<_> = self.handles.borrow().keys().copied().collect();
		offsets.sort_unstable();
		f.debug_struct("MsrDevice")
			.field("cpu_id", &self.cpu_id)
			.field("open_registers", &offsets)
			.finish()
	}
}

impl RegisterAccess for MsrDevice {
	fn read(&self, offset: u64) -> Result<u64, RegisterError> {
		let reg = u32::try_from(offset).map_err(|_| RegisterError::Read {
			offset,
			source: io::Error::new(io::ErrorKind::InvalidInput, "register offset out of range"),
		})?;

		let mut handles = self.handles.borrow_mut();
		if !handles.contains_key(&offset) {
			// cpu_id was range checked in open()
			let msr = Msr::new(reg, self.cpu_id as u16).map_err(|e| read_error(offset, e))?;
			handles.insert(offset, msr);
		}

		match handles.get_mut(&offset) {
			Some(msr) => msr.read().map_err(|e| read_error(offset, e)),
			None => Err(RegisterError::Read {
				offset,
				source: io::Error::new(io::ErrorKind::NotFound, "register handle missing"),
			}),
		}
	}
}

/// Classifies a failure to open the device
fn open_error(path: PathBuf, err: MsrError) -> RegisterError {
	match err {
		MsrError::IoError(e) if e.kind() == io::ErrorKind::PermissionDenied => RegisterError::PermissionDenied { path },
		MsrError::IoError(source) => RegisterError::Open { path, source },
		MsrError::MissingKernelModule => RegisterError::Open {
			path,
			source: io::Error::new(io::ErrorKind::NotFound, "msr kernel module not loaded"),
		},
		other => RegisterError::Open {
			path,
			source: io::Error::other(other),
		},
	}
}

/// Classifies a failed register read; the msr driver answers EIO for
/// registers the CPU does not implement
fn read_error(offset: u64, err: MsrError) -> RegisterError {
	match err {
		MsrError::IoError(e) if e.raw_os_error() == Some(libc::EIO) => RegisterError::Unsupported { offset },
		MsrError::IoError(source) => RegisterError::Read { offset, source },
		other => RegisterError::Read {
			offset,
			source: io::Error::other(other),
		},
	}
}

/// Returns true when the process runs with an effective uid of root
pub fn running_as_root() -> bool {
	// SAFETY: geteuid has no preconditions and cannot fail
	unsafe { libc::geteuid() == 0 }
}
