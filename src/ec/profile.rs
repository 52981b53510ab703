use std::fmt;
use std::str;

use super::port::PortPair;

/// Index/data window and EC RAM mapping for one chip family.
///
/// Different EC/SIO designs expose the command channel at completely
/// different EC RAM addresses; these mappings are board specific and
/// come from the platform documentation, they are never probed.
///
/// The shipped families alias the write-address, read-address and bank
/// parameter buffers to one location (write data at the next byte). The
/// aliasing is a property of each record, not of the command sequencing:
/// the per-role fields stay separate so a family without it fits too.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct IndexMap {
	pub name: &'static str,

	/// index I/O window in CPU port space
	pub base: u16,
	pub off_index_high: u8,
	pub off_index_low: u8,
	pub off_data: u8,

	/// EC RAM addresses of the command channel
	pub cmd_buffer: u16,
	pub opcode_buffer: u16,
	pub control: u16,
	pub return_data: u16,

	/// EC RAM addresses of the parameter buffers
	pub write_addr_buffer: u16,
	pub write_data_buffer: u16,
	pub read_addr_buffer: u16,
	pub bank_buffer: u16,
}

impl IndexMap {
	pub const ENE: IndexMap = IndexMap {
		name: "ENE",
		base: 0xFD60,
		off_index_high: 0x01,
		off_index_low: 0x02,
		off_data: 0x03,
		cmd_buffer: 0xF98B,
		opcode_buffer: 0xF98C,
		control: 0xF982,
		return_data: 0xF983,
		write_addr_buffer: 0xF98D,
		write_data_buffer: 0xF98E,
		read_addr_buffer: 0xF98D,
		bank_buffer: 0xF98D,
	};

	pub const NUVOTON: IndexMap = IndexMap {
		name: "Nuvoton",
		base: 0x0A00,
		off_index_high: 0x00,
		off_index_low: 0x01,
		off_data: 0x02,
		cmd_buffer: 0x128B,
		opcode_buffer: 0x128C,
		control: 0x1282,
		return_data: 0x1283,
		write_addr_buffer: 0x128D,
		write_data_buffer: 0x128E,
		read_addr_buffer: 0x128D,
		bank_buffer: 0x128D,
	};

	pub const ITE: IndexMap = IndexMap {
		name: "ITE",
		base: 0x0D00,
		off_index_high: 0x01,
		off_index_low: 0x02,
		off_data: 0x03,
		cmd_buffer: 0xC62B,
		opcode_buffer: 0xC62C,
		control: 0xC622,
		return_data: 0xC623,
		write_addr_buffer: 0xC62D,
		write_data_buffer: 0xC62E,
		read_addr_buffer: 0xC62D,
		bank_buffer: 0xC62D,
	};

	pub fn index_high_port(&self) -> u16 {
		self.base + self.off_index_high as u16
	}

	pub fn index_low_port(&self) -> u16 {
		self.base + self.off_index_low as u16
	}

	pub fn data_port(&self) -> u16 {
		self.base + self.off_data as u16
	}
}

/// Active access profile. Swapped as one value; nothing in it is mutated
/// field by field, so an operation always sees a single family's map.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Profile {
	Port(PortPair),
	Index(IndexMap),
}

impl Profile {
	pub fn is_port(&self) -> bool {
		match *self {
			Profile::Port(_) => true,
			Profile::Index(_) => false,
		}
	}
}

impl fmt::Display for Profile {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			Profile::Port(pair) => write!(f, "PortIO {}", pair),
			Profile::Index(map) => write!(f, "IndexIO-{}", map.name),
		}
	}
}

impl str::FromStr for Profile {
	type Err = ::failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"port" | "port:62/66" | "62/66" => Ok(Profile::Port(PortPair::Acpi)),
			"port:60/64" | "60/64" => Ok(Profile::Port(PortPair::Legacy8042)),
			"ene" => Ok(Profile::Index(IndexMap::ENE)),
			"nuvoton" => Ok(Profile::Index(IndexMap::NUVOTON)),
			"ite" => Ok(Profile::Index(IndexMap::ITE)),
			_ => bail!("unknown profile {:?} (known: port, port:60/64, port:62/66, ene, nuvoton, ite)", s),
		}
	}
}
