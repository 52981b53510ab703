//! Index I/O transport: indirect access to EC RAM plus the command
//! channel state machine driven through it.
//!
//! Every EC RAM access goes through the index registers: write the high
//! address byte, the low address byte, then touch the data register.
//! That includes the control byte. Its address is an EC RAM location,
//! not a CPU port, and reading it directly off the port bus only returns
//! bus float, which then shows up as a spurious wait timeout.

use std::fmt;

use crate::bus::PortBus;

use super::error::{
	EcError,
	WaitTimeout,
};
use super::profile::IndexMap;
use super::wait::{
	wait_until,
	Wait,
	POLL_SLICE_US,
};
use super::Command;

pub(crate) const CONTROL_PROCESSING: u8 = 1 << 0;
pub(crate) const CONTROL_START: u8 = 1 << 1;

/// channel arbitration only
const LOCK_BUDGET_US: u32 = 200_000;
/// covers the physical EEPROM access, so noticeably longer than the lock
const COMPLETE_BUDGET_US: u32 = 500_000;

/// The EC RAM control byte: Processing marks the channel locked, Start
/// marks a command handed over to the EC.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Control(pub u8);

impl Control {
	pub fn idle() -> Self {
		Control(0)
	}

	pub fn locked() -> Self {
		Control(CONTROL_PROCESSING)
	}

	pub fn triggered() -> Self {
		Control(CONTROL_PROCESSING | CONTROL_START)
	}

	pub fn is_processing(&self) -> bool {
		0 != self.0 & CONTROL_PROCESSING
	}

	pub fn is_start(&self) -> bool {
		0 != self.0 & CONTROL_START
	}
}

impl fmt::Debug for Control {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:02x}", self.0)?;
		if self.is_processing() { write!(f, " [PROCESSING]")?; }
		if self.is_start() { write!(f, " [START]")?; }
		Ok(())
	}
}

pub(crate) trait IndexIoExt: PortBus {
	fn index_select(&mut self, map: &IndexMap, addr: u16) -> Result<(), EcError> {
		self.write_byte(map.index_high_port(), (addr >> 8) as u8)?;
		self.write_byte(map.index_low_port(), addr as u8)?;
		Ok(())
	}

	fn index_read8(&mut self, map: &IndexMap, addr: u16) -> Result<u8, EcError> {
		self.index_select(map, addr)?;
		Ok(self.read_byte(map.data_port())?)
	}

	fn index_write8(&mut self, map: &IndexMap, addr: u16, data: u8) -> Result<(), EcError> {
		self.index_select(map, addr)?;
		Ok(self.write_byte(map.data_port(), data)?)
	}

	fn wait_control(&mut self, map: &IndexMap, mask: u8, target: u8, budget_us: u32) -> Result<(), EcError> {
		let mut last = 0u8;
		let r = wait_until(self, POLL_SLICE_US, budget_us, |bus| {
			// indirect read, always
			let cur = bus.index_read8(map, map.control)?;
			last = cur;
			Ok(cur & mask == target)
		})?;
		match r {
			Wait::Ready => Ok(()),
			Wait::Expired => {
				let snapshot = WaitTimeout::Control {
					base: map.base,
					off_index_high: map.off_index_high,
					off_index_low: map.off_index_low,
					off_data: map.off_data,
					control: map.control,
					last,
					mask,
					target,
				};
				warn!("index wait timeout: {}", snapshot);
				Err(EcError::Timeout(snapshot))
			}
		}
	}

	/// Runs one command through the channel:
	/// wait idle, lock, fill all buffers, raise Start, wait for Start to
	/// drop, release. The buffer fills must complete before Start goes
	/// up; the EC reads them the moment it sees the bit.
	///
	/// A timeout aborts as-is: the control byte keeps whatever the last
	/// write left there, the error carries the observed state.
	fn exec_command(&mut self, map: &IndexMap, cmd: Command) -> Result<(), EcError> {
		self.wait_control(map, CONTROL_PROCESSING, 0, LOCK_BUDGET_US)?;
		self.index_write8(map, map.control, Control::locked().0)?;

		self.index_write8(map, map.opcode_buffer, cmd.opcode())?;
		match cmd {
			Command::SetBank(bank) => {
				self.index_write8(map, map.bank_buffer, bank)?;
			}
			Command::Read(offset) => {
				self.index_write8(map, map.read_addr_buffer, offset)?;
			}
			Command::Write { offset, data } => {
				self.index_write8(map, map.write_addr_buffer, offset)?;
				self.index_write8(map, map.write_data_buffer, data)?;
			}
		}

		self.index_write8(map, map.control, Control::triggered().0)?;
		self.wait_control(map, CONTROL_START, 0, COMPLETE_BUDGET_US)?;

		// release the channel
		self.index_write8(map, map.control, Control::idle().0)
	}
}

impl<B: PortBus + ?Sized> IndexIoExt for B {}
