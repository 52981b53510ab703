use std::fmt;
use std::io;

use failure::Fail;

use super::port::PortPair;

#[derive(Debug, Fail)]
pub enum EcError {
	#[fail(display = "invalid bank {} (valid banks: 0-7)", _0)]
	InvalidBank(u8),

	#[fail(display = "port pair selection only applies to port I/O access")]
	NotPortAccess,

	#[fail(display = "EC timeout: {}", _0)]
	Timeout(WaitTimeout),

	#[fail(display = "verify failed at bank {} offset 0x{:02x}: wrote 0x{:02x}, read back 0x{:02x}", bank, offset, expected, actual)]
	Mismatch {
		bank: u8,
		offset: u8,
		expected: u8,
		actual: u8,
	},

	#[fail(display = "port access failed: {}", _0)]
	Hardware(#[fail(cause)] io::Error),
}

impl From<io::Error> for EcError {
	fn from(e: io::Error) -> Self {
		EcError::Hardware(e)
	}
}

/// What the hardware looked like when a bounded wait gave up. No cleanup
/// is attempted on timeout, so this snapshot is all the caller gets for
/// diagnosing the stuck state.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum WaitTimeout {
	/// status register poll on a port pair (OBF/IBF handshake)
	Status {
		pair: PortPair,
		mask: u8,
		target: u8,
		last: u8,
	},
	/// indirect poll of the EC RAM control byte
	Control {
		base: u16,
		off_index_high: u8,
		off_index_low: u8,
		off_data: u8,
		control: u16,
		last: u8,
		mask: u8,
		target: u8,
	},
}

impl fmt::Display for WaitTimeout {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			WaitTimeout::Status { pair, mask, target, last } => write!(f,
				"status at port pair {} stuck at 0x{:02x} (mask 0x{:02x}, target 0x{:02x})",
				pair, last, mask, target,
			),
			WaitTimeout::Control {
				base,
				off_index_high,
				off_index_low,
				off_data,
				control,
				last,
				mask,
				target,
			} => write!(f,
				"control byte at EC RAM 0x{:04x} stuck at 0x{:02x} (mask 0x{:02x}, target 0x{:02x}; index base 0x{:04x}, offsets H/L/D 0x{:02x}/0x{:02x}/0x{:02x})",
				control, last, mask, target, base, off_index_high, off_index_low, off_data,
			),
		}
	}
}
