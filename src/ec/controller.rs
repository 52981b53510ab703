use crate::bus::PortBus;

use super::error::EcError;
use super::index::IndexIoExt;
use super::port::{
	self,
	PortPair,
};
use super::profile::Profile;
use super::{
	Command,
	EEPROM_BANK_MAX,
};

/// Unified EEPROM operations over whichever transport the active profile
/// selects. Owns the bus; at most one transaction runs at a time and
/// profile swaps only happen between transactions.
pub struct Controller<B: PortBus> {
	bus: B,
	profile: Profile,
	// last bank successfully selected; the hardware keeps the real state,
	// this copy is only reported in errors and never re-selected behind
	// the caller's back
	bank: u8,
}

impl<B: PortBus> Controller<B> {
	pub fn new(bus: B, profile: Profile) -> Controller<B> {
		Controller {
			bus,
			profile,
			bank: 0,
		}
	}

	pub fn profile(&self) -> Profile {
		self.profile
	}

	pub fn bank(&self) -> u8 {
		self.bank
	}

	/// Replaces the whole address mapping in one step.
	pub fn select_profile(&mut self, profile: Profile) {
		debug!("switching access profile: {} -> {}", self.profile, profile);
		self.profile = profile;
	}

	/// Only meaningful for port I/O access; index profiles carry their
	/// own window and don't use the pairs.
	pub fn select_port_pair(&mut self, pair: PortPair) -> Result<(), EcError> {
		match self.profile {
			Profile::Port(_) => {
				self.profile = Profile::Port(pair);
				Ok(())
			}
			Profile::Index(_) => Err(EcError::NotPortAccess),
		}
	}

	fn run(&mut self, cmd: Command) -> Result<(), EcError> {
		match self.profile {
			Profile::Port(pair) => {
				port::write_command(&mut self.bus, pair, cmd.opcode())?;
				match cmd {
					Command::SetBank(bank) => port::write_data(&mut self.bus, pair, bank),
					Command::Read(offset) => port::write_data(&mut self.bus, pair, offset),
					Command::Write { offset, data } => {
						port::write_data(&mut self.bus, pair, offset)?;
						port::write_data(&mut self.bus, pair, data)
					}
				}
			}
			Profile::Index(map) => self.bus.exec_command(&map, cmd),
		}
	}

	/// Banks are sticky hardware state: selecting one stays in effect
	/// until the next call, and nothing here selects one implicitly.
	pub fn set_bank(&mut self, bank: u8) -> Result<(), EcError> {
		if bank > EEPROM_BANK_MAX {
			return Err(EcError::InvalidBank(bank));
		}
		self.run(Command::SetBank(bank))?;
		self.bank = bank;
		Ok(())
	}

	pub fn read_byte(&mut self, offset: u8) -> Result<u8, EcError> {
		self.run(Command::Read(offset))?;
		match self.profile {
			Profile::Port(pair) => port::read_data(&mut self.bus, pair),
			Profile::Index(map) => self.bus.index_read8(&map, map.return_data),
		}
	}

	pub fn write_byte(&mut self, offset: u8, data: u8) -> Result<(), EcError> {
		self.run(Command::Write { offset, data })
	}

	/// Write plus readback; a differing readback is an error, not a
	/// success with a caveat.
	pub fn write_verified(&mut self, offset: u8, data: u8) -> Result<(), EcError> {
		self.write_byte(offset, data)?;
		let actual = self.read_byte(offset)?;
		if actual != data {
			return Err(EcError::Mismatch {
				bank: self.bank,
				offset,
				expected: data,
				actual,
			});
		}
		Ok(())
	}

	/// Select `bank` and read all of it; the first failing read aborts.
	pub fn dump_bank(&mut self, bank: u8) -> Result<[u8; 256], EcError> {
		self.set_bank(bank)?;
		let mut dump = [0u8; 256];
		for (offset, slot) in dump.iter_mut().enumerate() {
			*slot = self.read_byte(offset as u8)?;
		}
		Ok(dump)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::ec::profile::IndexMap;
	use crate::ec::sim::{
		Op,
		SimEc,
	};

	fn index_controller(sim: &mut SimEc, map: IndexMap) -> Controller<&mut SimEc> {
		Controller::new(sim, Profile::Index(map))
	}

	#[test]
	fn round_trip_index_transport() {
		let mut sim = SimEc::new(IndexMap::ENE);
		{
			let mut ec = index_controller(&mut sim, IndexMap::ENE);
			ec.set_bank(0).unwrap();
			for &(offset, data) in &[(0x00u8, 0x00u8), (0x10, 0xab), (0x7f, 0x55), (0xff, 0xfe)] {
				ec.write_byte(offset, data).unwrap();
				assert_eq!(ec.read_byte(offset).unwrap(), data);
			}
		}
	}

	#[test]
	fn round_trip_port_transport_both_pairs() {
		for &pair in &[PortPair::Legacy8042, PortPair::Acpi] {
			let mut sim = SimEc::new(IndexMap::ENE);
			let mut ec = Controller::new(&mut sim, Profile::Port(pair));
			ec.set_bank(4).unwrap();
			ec.write_byte(0x33, 0x99).unwrap();
			assert_eq!(ec.read_byte(0x33).unwrap(), 0x99);
		}
	}

	#[test]
	fn banks_are_isolated() {
		let mut sim = SimEc::new(IndexMap::ITE);
		let mut ec = index_controller(&mut sim, IndexMap::ITE);
		for bank in 0..=EEPROM_BANK_MAX {
			ec.set_bank(bank).unwrap();
			ec.write_byte(0x40, 0xa0 | bank).unwrap();
		}
		for bank in 0..=EEPROM_BANK_MAX {
			ec.set_bank(bank).unwrap();
			assert_eq!(ec.read_byte(0x40).unwrap(), 0xa0 | bank);
			// other offsets stay untouched
			assert_eq!(ec.read_byte(0x41).unwrap(), 0x00);
		}
	}

	#[test]
	fn invalid_bank_rejected_before_any_io() {
		let mut sim = SimEc::new(IndexMap::ENE);
		{
			let mut ec = index_controller(&mut sim, IndexMap::ENE);
			match ec.set_bank(8) {
				Err(EcError::InvalidBank(8)) => {}
				r => panic!("expected InvalidBank, got {:?}", r),
			}
			assert_eq!(ec.bank(), 0);
		}
		assert!(sim.log.is_empty(), "bank validation must not touch the bus");
	}

	#[test]
	fn ite_scenario() {
		let mut sim = SimEc::new(IndexMap::ITE);
		{
			let mut ec = Controller::new(&mut sim, Profile::Index(IndexMap::ITE));
			ec.set_bank(2).unwrap();
			ec.write_byte(0x10, 0xab).unwrap();
			assert_eq!(ec.read_byte(0x10).unwrap(), 0xab);

			match ec.set_bank(9) {
				Err(EcError::InvalidBank(9)) => {}
				r => panic!("expected InvalidBank, got {:?}", r),
			}
		}
		assert_eq!(sim.peek(2, 0x10), 0xab);
	}

	#[test]
	fn invalid_bank_after_traffic_adds_none() {
		let mut sim = SimEc::new(IndexMap::ITE);
		{
			let mut ec = index_controller(&mut sim, IndexMap::ITE);
			ec.set_bank(2).unwrap();
		}
		let len_before = sim.log.len();
		{
			let mut ec = index_controller(&mut sim, IndexMap::ITE);
			assert!(ec.set_bank(9).is_err());
		}
		assert_eq!(sim.log.len(), len_before);
	}

	#[test]
	fn profile_swap_is_atomic() {
		// sim decodes the ITE window; start on ENE, swap, then check that
		// everything after the swap stays inside the ITE window
		let mut sim = SimEc::new(IndexMap::ITE);
		{
			let mut ec = index_controller(&mut sim, IndexMap::ENE);
			// ENE window isn't decoded here: reads float, the wait expires
			assert!(ec.read_byte(0).is_err());
		}
		let swap_point = sim.log.len();
		{
			let mut ec = index_controller(&mut sim, IndexMap::ENE);
			ec.select_profile(Profile::Index(IndexMap::ITE));
			ec.set_bank(1).unwrap();
			ec.write_byte(0x08, 0x42).unwrap();
			assert_eq!(ec.read_byte(0x08).unwrap(), 0x42);
		}
		let ite = IndexMap::ITE;
		for op in &sim.log[swap_point..] {
			let port = match *op {
				Op::In(port) => port,
				Op::Out(port, _) => port,
			};
			assert!(port >= ite.base && port <= ite.data_port(),
				"port 0x{:04x} outside the selected profile's window", port);
		}
	}

	#[test]
	fn port_pair_swap_moves_all_traffic() {
		let mut sim = SimEc::new(IndexMap::ENE);
		{
			let mut ec = Controller::new(&mut sim, Profile::Port(PortPair::Acpi));
			ec.set_bank(0).unwrap();
			ec.select_port_pair(PortPair::Legacy8042).unwrap();
			ec.write_byte(0x01, 0x11).unwrap();
		}
		let mut seen_legacy = false;
		let mut after_swap = false;
		for op in &sim.log {
			let port = match *op {
				Op::In(port) => port,
				Op::Out(port, _) => port,
			};
			if port == 0x60 || port == 0x64 {
				after_swap = true;
				seen_legacy = true;
			}
			if after_swap {
				assert!(port == 0x60 || port == 0x64, "ACPI pair used after swap");
			}
		}
		assert!(seen_legacy);
	}

	#[test]
	fn port_pair_needs_port_profile() {
		let mut sim = SimEc::new(IndexMap::ENE);
		let mut ec = index_controller(&mut sim, IndexMap::ENE);
		match ec.select_port_pair(PortPair::Acpi) {
			Err(EcError::NotPortAccess) => {}
			r => panic!("expected NotPortAccess, got {:?}", r),
		}
	}

	#[test]
	fn verify_reports_mismatch() {
		let mut sim = SimEc::new(IndexMap::ENE);
		sim.corrupt_writes = true;
		let mut ec = index_controller(&mut sim, IndexMap::ENE);
		ec.set_bank(3).unwrap();
		match ec.write_verified(0x21, 0xaa) {
			Err(EcError::Mismatch { bank, offset, expected, actual }) => {
				assert_eq!(bank, 3);
				assert_eq!(offset, 0x21);
				assert_eq!(expected, 0xaa);
				assert_eq!(actual, 0xab);
			}
			r => panic!("expected Mismatch, got {:?}", r),
		}
	}

	#[test]
	fn verify_passes_on_clean_write() {
		let mut sim = SimEc::new(IndexMap::NUVOTON);
		let mut ec = index_controller(&mut sim, IndexMap::NUVOTON);
		ec.set_bank(1).unwrap();
		ec.write_verified(0x80, 0x5c).unwrap();
	}

	#[test]
	fn dump_bank_selects_then_reads_everything() {
		let mut sim = SimEc::new(IndexMap::ENE);
		sim.poke(5, 0x00, 0x11);
		sim.poke(5, 0x80, 0x22);
		sim.poke(5, 0xff, 0x33);
		let mut ec = index_controller(&mut sim, IndexMap::ENE);
		let dump = ec.dump_bank(5).unwrap();
		assert_eq!(dump[0x00], 0x11);
		assert_eq!(dump[0x80], 0x22);
		assert_eq!(dump[0xff], 0x33);
		assert_eq!(dump[0x01], 0x00);
		assert_eq!(ec.bank(), 5);
	}

	#[test]
	fn dump_bank_validates_bank_first() {
		let mut sim = SimEc::new(IndexMap::ENE);
		{
			let mut ec = index_controller(&mut sim, IndexMap::ENE);
			assert!(ec.dump_bank(8).is_err());
		}
		assert!(sim.log.is_empty());
	}
}
