//! Simulated EC for the test suite: 8 banks of 256 bytes behind both
//! transports at once (both port pairs plus one index window), with a
//! port-level and an EC-RAM-level access log and a virtual clock.
//!
//! Reads of ports the device doesn't decode return 0xff bus float,
//! writes there are dropped, like a real bus.

use std::collections::HashMap;
use std::io;

use crate::bus::PortBus;

use super::consts::*;
use super::index::{
	CONTROL_START,
	Control,
};
use super::profile::IndexMap;
use super::port::{
	PortPair,
	STS_IBF,
	STS_OBF,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Op {
	In(u16),
	Out(u16, u8),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RamOp {
	Read(u16),
	Write(u16, u8),
}

// port transport command decode
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum PortState {
	Idle,
	WaitBank,
	WaitReadAddr,
	WaitWriteAddr,
	WaitWriteData(u8),
}

pub struct SimEc {
	map: IndexMap,
	banks: [[u8; 256]; 8],
	bank: u8,

	ec_ram: HashMap<u16, u8>,
	latched: u16,

	port_state: PortState,
	output: Option<u8>,

	pub log: Vec<Op>,
	pub ram_log: Vec<RamOp>,
	pub waited_us: u64,

	/// status/control always reads busy; nothing ever completes
	pub stuck_busy: bool,
	/// commands are accepted but the Start bit never drops
	pub hang_on_start: bool,
	/// EEPROM cells flip a bit on store, so readback verify must fail
	pub corrupt_writes: bool,
}

impl SimEc {
	pub fn new(map: IndexMap) -> SimEc {
		SimEc {
			map,
			banks: [[0u8; 256]; 8],
			bank: 0,
			ec_ram: HashMap::new(),
			latched: 0,
			port_state: PortState::Idle,
			output: None,
			log: Vec::new(),
			ram_log: Vec::new(),
			waited_us: 0,
			stuck_busy: false,
			hang_on_start: false,
			corrupt_writes: false,
		}
	}

	pub fn peek(&self, bank: u8, offset: u8) -> u8 {
		self.banks[bank as usize][offset as usize]
	}

	pub fn poke(&mut self, bank: u8, offset: u8, data: u8) {
		self.banks[bank as usize][offset as usize] = data;
	}

	pub fn ec_ram_value(&self, addr: u16) -> u8 {
		self.ec_ram.get(&addr).copied().unwrap_or(0)
	}

	fn store(&mut self, offset: u8, data: u8) {
		let data = if self.corrupt_writes { data ^ 0x01 } else { data };
		self.banks[(self.bank & 7) as usize][offset as usize] = data;
	}

	fn load(&self, offset: u8) -> u8 {
		self.banks[(self.bank & 7) as usize][offset as usize]
	}

	fn pair_of_data_port(port: u16) -> Option<PortPair> {
		match port {
			0x60 => Some(PortPair::Legacy8042),
			0x62 => Some(PortPair::Acpi),
			_ => None,
		}
	}

	fn pair_of_command_port(port: u16) -> Option<PortPair> {
		match port {
			0x64 => Some(PortPair::Legacy8042),
			0x66 => Some(PortPair::Acpi),
			_ => None,
		}
	}

	fn port_command(&mut self, cmd: u8) {
		self.port_state = match cmd {
			CMD_EEPROM_BANK => PortState::WaitBank,
			CMD_EEPROM_READ => PortState::WaitReadAddr,
			CMD_EEPROM_WRITE => PortState::WaitWriteAddr,
			_ => PortState::Idle,
		};
	}

	fn port_data(&mut self, data: u8) {
		match self.port_state {
			PortState::Idle => {}
			PortState::WaitBank => {
				self.bank = data & 7;
				self.port_state = PortState::Idle;
			}
			PortState::WaitReadAddr => {
				self.output = Some(self.load(data));
				self.port_state = PortState::Idle;
			}
			PortState::WaitWriteAddr => {
				self.port_state = PortState::WaitWriteData(data);
			}
			PortState::WaitWriteData(offset) => {
				self.store(offset, data);
				self.port_state = PortState::Idle;
			}
		}
	}

	fn port_status(&self) -> u8 {
		if self.stuck_busy {
			return STS_IBF;
		}
		if self.output.is_some() { STS_OBF } else { 0 }
	}

	// the EC firmware side of the command channel: on Start, consume the
	// buffers and complete
	fn run_channel(&mut self, control: u8) {
		if !Control(control).is_start() || self.hang_on_start {
			self.ec_ram.insert(self.map.control, control);
			return;
		}

		match self.ec_ram_value(self.map.opcode_buffer) {
			CMD_EEPROM_BANK => {
				self.bank = self.ec_ram_value(self.map.bank_buffer) & 7;
			}
			CMD_EEPROM_READ => {
				let offset = self.ec_ram_value(self.map.read_addr_buffer);
				let data = self.load(offset);
				self.ec_ram.insert(self.map.return_data, data);
			}
			CMD_EEPROM_WRITE => {
				let offset = self.ec_ram_value(self.map.write_addr_buffer);
				let data = self.ec_ram_value(self.map.write_data_buffer);
				self.store(offset, data);
			}
			_ => {}
		}

		self.ec_ram.insert(self.map.control, control & !CONTROL_START);
	}

	fn ram_read(&mut self) -> u8 {
		let addr = self.latched;
		self.ram_log.push(RamOp::Read(addr));
		if self.stuck_busy && addr == self.map.control {
			return Control::locked().0;
		}
		self.ec_ram_value(addr)
	}

	fn ram_write(&mut self, data: u8) {
		let addr = self.latched;
		self.ram_log.push(RamOp::Write(addr, data));
		if addr == self.map.control {
			self.run_channel(data);
		} else {
			self.ec_ram.insert(addr, data);
		}
	}
}

impl PortBus for SimEc {
	fn read_byte(&mut self, port: u16) -> io::Result<u8> {
		self.log.push(Op::In(port));

		if Self::pair_of_command_port(port).is_some() {
			return Ok(self.port_status());
		}
		if Self::pair_of_data_port(port).is_some() {
			return Ok(self.output.take().unwrap_or(0xff));
		}
		if port == self.map.data_port() {
			return Ok(self.ram_read());
		}
		// nothing decodes this port
		Ok(0xff)
	}

	fn write_byte(&mut self, port: u16, data: u8) -> io::Result<()> {
		self.log.push(Op::Out(port, data));

		if Self::pair_of_command_port(port).is_some() {
			self.port_command(data);
		} else if Self::pair_of_data_port(port).is_some() {
			self.port_data(data);
		} else if port == self.map.index_high_port() {
			self.latched = (self.latched & 0x00ff) | ((data as u16) << 8);
		} else if port == self.map.index_low_port() {
			self.latched = (self.latched & 0xff00) | data as u16;
		} else if port == self.map.data_port() {
			self.ram_write(data);
		}
		Ok(())
	}

	fn delay_us(&mut self, us: u32) {
		self.waited_us += us as u64;
	}
}
