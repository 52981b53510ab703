//! Port I/O transport: data/command port pair with an OBF/IBF handshake.
//!
//! The status register shares the command port address. Every write waits
//! for IBF to clear before and after (the second wait lets the EC consume
//! the byte); a read waits for OBF, reads the data port, then waits for
//! OBF to drop again as the consume acknowledgement.

use std::fmt;

use crate::bus::PortBus;

use super::error::{
	EcError,
	WaitTimeout,
};
use super::wait::{
	wait_until,
	Wait,
	POLL_SLICE_US,
};

pub const STS_OBF: u8 = 1 << 0; // Output Buffer Full
pub const STS_IBF: u8 = 1 << 1; // Input Buffer Full

const DATA_PORT_8042: u16 = 0x60;
const CMD_PORT_8042: u16 = 0x64;
const DATA_PORT_ACPI: u16 = 0x62;
const CMD_PORT_ACPI: u16 = 0x66;

const HANDSHAKE_BUDGET_US: u32 = 200_000;

/// Which fixed port pair talks to the EC; independent of the chip family.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum PortPair {
	Legacy8042,
	Acpi,
}

impl PortPair {
	pub fn data_port(self) -> u16 {
		match self {
			PortPair::Legacy8042 => DATA_PORT_8042,
			PortPair::Acpi => DATA_PORT_ACPI,
		}
	}

	pub fn command_port(self) -> u16 {
		match self {
			PortPair::Legacy8042 => CMD_PORT_8042,
			PortPair::Acpi => CMD_PORT_ACPI,
		}
	}
}

impl fmt::Display for PortPair {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			PortPair::Legacy8042 => write!(f, "60/64"),
			PortPair::Acpi => write!(f, "62/66"),
		}
	}
}

fn wait_status<B>(bus: &mut B, pair: PortPair, mask: u8, target: u8) -> Result<(), EcError>
where
	B: PortBus + ?Sized,
{
	let mut last = 0u8;
	let r = wait_until(bus, POLL_SLICE_US, HANDSHAKE_BUDGET_US, |bus| {
		let status = bus.read_byte(pair.command_port())?;
		last = status;
		Ok(status & mask == target)
	})?;
	match r {
		Wait::Ready => Ok(()),
		Wait::Expired => Err(EcError::Timeout(WaitTimeout::Status {
			pair,
			mask,
			target,
			last,
		})),
	}
}

pub(crate) fn write_command<B>(bus: &mut B, pair: PortPair, cmd: u8) -> Result<(), EcError>
where
	B: PortBus + ?Sized,
{
	wait_status(bus, pair, STS_IBF, 0)?;
	bus.write_byte(pair.command_port(), cmd)?;
	// wait until the EC consumed the opcode
	wait_status(bus, pair, STS_IBF, 0)
}

pub(crate) fn write_data<B>(bus: &mut B, pair: PortPair, data: u8) -> Result<(), EcError>
where
	B: PortBus + ?Sized,
{
	wait_status(bus, pair, STS_IBF, 0)?;
	bus.write_byte(pair.data_port(), data)?;
	wait_status(bus, pair, STS_IBF, 0)
}

pub(crate) fn read_data<B>(bus: &mut B, pair: PortPair) -> Result<u8, EcError>
where
	B: PortBus + ?Sized,
{
	wait_status(bus, pair, STS_OBF, STS_OBF)?;
	let data = bus.read_byte(pair.data_port())?;
	// acknowledge consumption
	wait_status(bus, pair, STS_OBF, 0)?;
	Ok(data)
}
