#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate ec_eeprom_tool;
use ec_eeprom_tool::*;

use std::process::exit;

use ec_eeprom_tool::ec::{
	Controller,
	Profile,
};

fn get_param<T>(matches: &clap::ArgMatches, name: &str) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => bail!("missing parameter {}", name),
	};
	param.parse::<T>().map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid parameter {}: {}", name, e);
		e.context(msg).into()
	})
}

fn get_hex_param(matches: &clap::ArgMatches, name: &str) -> AResult<u32> {
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => bail!("missing parameter {}", name),
	};
	let digits = param.trim_start_matches("0x");
	match u32::from_str_radix(digits, 16) {
		Ok(v) => Ok(v),
		Err(e) => bail!("invalid parameter {} ({:?}): {}", name, param, e),
	}
}

fn open_controller(matches: &clap::ArgMatches) -> AResult<Controller<bus::DevPort>> {
	let profile: Profile = get_param(matches, "PROFILE")?;
	info!("access: {}", profile);
	let io = bus::open_port_io()?;
	Ok(Controller::new(io, profile))
}

fn is_printable_ascii(b: u8) -> bool {
	b >= 0x20 && b <= 0x7e
}

fn print_dump(bank: u8, dump: &[u8; 256]) {
	println!("Bank {}", bank);
	print!("      ");
	for col in 0..16 {
		print!("{:02x} ", col);
	}
	println!("  ASCII");
	for row in 0..16 {
		let base = row * 16;
		print!("{:02x} | ", base);
		for col in 0..16 {
			print!("{:02x} ", dump[base + col]);
		}
		print!("  ");
		for col in 0..16 {
			let b = dump[base + col];
			print!("{}", if is_printable_ascii(b) { b as char } else { '.' });
		}
		println!();
	}
}

fn dump(sub_m: &clap::ArgMatches) -> AResult<()> {
	let bank: u8 = get_param(sub_m, "BANK")?;
	let mut ec = open_controller(sub_m)?;

	let dump = ec.dump_bank(bank)?;
	print_dump(bank, &dump);

	Ok(())
}

fn read(sub_m: &clap::ArgMatches) -> AResult<()> {
	let bank: u8 = get_param(sub_m, "BANK")?;
	let offset = get_hex_param(sub_m, "OFFSET")?;
	ensure!(offset <= 0xff, "offset 0x{:x} out of range (00-ff)", offset);
	let mut ec = open_controller(sub_m)?;

	ec.set_bank(bank)?;
	let data = ec.read_byte(offset as u8)?;
	println!("bank {} offset 0x{:02x}: 0x{:02x}", bank, offset, data);

	Ok(())
}

fn write(sub_m: &clap::ArgMatches) -> AResult<()> {
	let bank: u8 = get_param(sub_m, "BANK")?;
	let offset = get_hex_param(sub_m, "OFFSET")?;
	ensure!(offset <= 0xff, "offset 0x{:x} out of range (00-ff)", offset);
	let value = get_hex_param(sub_m, "VALUE")?;
	let width: u32 = match sub_m.value_of("width") {
		None => 1,
		Some(_) => get_param(sub_m, "width")?,
	};
	ensure!(width == 1 || width == 2 || width == 4, "width must be 1, 2 or 4");
	ensure!(offset + width - 1 <= 0xff,
		"write overflows the bank: offset 0x{:02x} width {}", offset, width);
	if width < 4 {
		ensure!(value >> (8 * width) == 0,
			"value 0x{:x} doesn't fit into {} byte(s)", value, width);
	}

	let mut ec = open_controller(sub_m)?;
	ec.set_bank(bank)?;

	// little endian, each byte verified right after it is written
	for i in 0..width {
		let b = (value >> (8 * i)) as u8;
		ec.write_verified((offset + i) as u8, b)?;
	}
	println!("wrote 0x{:0width$x} at bank {} offset 0x{:02x}", value, bank, offset,
		width = 2 * width as usize);

	Ok(())
}

fn main_app() -> AResult<()> {
	let matches = clap_app!(@app (app_from_crate!())
		(@setting SubcommandRequiredElseHelp)
		(global_setting: clap::AppSettings::VersionlessSubcommands)
		(@subcommand dump =>
			(about: "dump one 256 byte EEPROM bank as a hex listing")
			(@arg PROFILE: +required "access profile (port, port:60/64, port:62/66, ene, nuvoton, ite)")
			(@arg BANK: +required "bank to dump (0-7)")
		)
		(@subcommand read =>
			(about: "read one byte")
			(@arg PROFILE: +required "access profile (port, port:60/64, port:62/66, ene, nuvoton, ite)")
			(@arg BANK: +required "bank to select (0-7)")
			(@arg OFFSET: +required "offset within the bank (hex, 00-ff)")
		)
		(@subcommand write =>
			(about: "write with readback verify (little endian for multi byte values)")
			(@arg width: -w --width +takes_value "value width in bytes (1, 2 or 4; default 1)")
			(@arg PROFILE: +required "access profile (port, port:60/64, port:62/66, ene, nuvoton, ite)")
			(@arg BANK: +required "bank to select (0-7)")
			(@arg OFFSET: +required "offset within the bank (hex, 00-ff)")
			(@arg VALUE: +required "value to write (hex)")
		)
	).get_matches();

	match matches.subcommand() {
		("dump", Some(sub_m)) => {
			dump(sub_m)
		}
		("read", Some(sub_m)) => {
			read(sub_m)
		}
		("write", Some(sub_m)) => {
			write(sub_m)
		}
		("", _) => bail!("no subcommand"),
		(cmd, _) => bail!("not implemented subcommand {:?}", cmd),
	}
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = main_app() {
		error!("Error: {}", e);
		exit(1);
	}
}
