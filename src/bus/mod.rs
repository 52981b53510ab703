//! Raw platform primitives the EC protocol layer is built on: byte-wide
//! CPU port I/O and a coarse delay. Physical bus access is the platform's
//! job; everything above this boundary is portable (and testable against
//! a simulated device).

use std::io;
use std::thread;
use std::time::{
	Duration,
	Instant,
};

mod linux;

pub use self::linux::{
	DevPort,
	open_port_io,
};

pub fn reliable_sleep(mut duration: Duration) {
	loop {
		let now = Instant::now();
		thread::sleep(duration);
		let elapsed = now.elapsed();
		if elapsed >= duration {
			return;
		}
		duration -= elapsed;
	}
}

pub trait PortBus {
	fn read_byte(&mut self, port: u16) -> io::Result<u8>;
	fn write_byte(&mut self, port: u16, data: u8) -> io::Result<()>;

	// delay for (at least) `us` microseconds
	fn delay_us(&mut self, us: u32) {
		reliable_sleep(Duration::from_micros(us as u64));
	}
}

impl<'a, B: ?Sized + PortBus> PortBus for &'a mut B {
	fn read_byte(&mut self, port: u16) -> io::Result<u8> {
		B::read_byte(*self, port)
	}

	fn write_byte(&mut self, port: u16, data: u8) -> io::Result<()> {
		B::write_byte(*self, port, data)
	}

	fn delay_us(&mut self, us: u32) {
		B::delay_us(*self, us)
	}
}
