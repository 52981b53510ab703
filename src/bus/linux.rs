use std::ffi::CString;
use std::fs;
use std::io;
use std::os::unix::fs::FileExt;
use std::os::unix::io::FromRawFd;

use libc::{
	O_CLOEXEC,
	O_RDWR,
	O_SYNC,
	open,
};

use super::PortBus;

/// CPU port I/O through `/dev/port` (offset = port number).
///
/// Needs CAP_SYS_RAWIO; O_SYNC keeps accesses from being buffered, which
/// would break the handshake ordering.
pub struct DevPort {
	file: fs::File,
}

impl DevPort {
	pub fn open() -> io::Result<DevPort> {
		let path = CString::new("/dev/port")?;

		let fd = unsafe { open(path.as_ptr(), O_RDWR | O_SYNC | O_CLOEXEC) };
		if -1 == fd {
			return Err(io::Error::last_os_error());
		}
		// now get fd managed to prevent resource leak
		let file = unsafe { fs::File::from_raw_fd(fd) };

		Ok(DevPort { file })
	}
}

impl PortBus for DevPort {
	fn read_byte(&mut self, port: u16) -> io::Result<u8> {
		let mut buf = [0u8];
		let l = self.file.read_at(&mut buf, port as u64)?;
		if l != 1 {
			return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "short port read"));
		}
		Ok(buf[0])
	}

	fn write_byte(&mut self, port: u16, data: u8) -> io::Result<()> {
		let l = self.file.write_at(&[data], port as u64)?;
		if l != 1 {
			return Err(io::Error::new(io::ErrorKind::Other, "short port write"));
		}
		Ok(())
	}
}

pub fn open_port_io() -> crate::AResult<DevPort> {
	with_context!("couldn't open /dev/port", {
		Ok(DevPort::open()?)
	})
}
