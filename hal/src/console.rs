/*
 * Console Logger
 *
 * Backend for the `log` facade. Formatted records are forwarded to a
 * single registered sink (a UART, a host log buffer, a test capture).
 */

use alloc::boxed::Box;
use core::fmt::{self, Write};
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::{Mutex, Once};

/*
 * trait ConsoleSink - Destination for formatted log lines
 */
pub trait ConsoleSink: Send {
	fn write_str(&mut self, s: &str);
}

//Global console sink (set once)
static CONSOLE: Once<Mutex<Box<dyn ConsoleSink>>> = Once::new();
static LOGGER: ConsoleLogger = ConsoleLogger;

struct ConsoleLogger;

struct SinkWriter<'a>(&'a mut dyn ConsoleSink);

impl Write for SinkWriter<'_> {
	fn write_str(&mut self, s: &str) -> fmt::Result {
		self.0.write_str(s);
		Ok(())
	}
}

impl Log for ConsoleLogger {
	fn enabled(&self, metadata: &Metadata) -> bool {
		metadata.level() <= log::max_level()
	}

	fn log(&self, record: &Record) {
		if !self.enabled(record.metadata()) {
			return;
		}
		if let Some(console) = CONSOLE.get() {
			let mut sink = console.lock();
			let mut w = SinkWriter(&mut **sink);
			writeln!(w, "[{}] {}: {}", record.level(), record.target(), record.args()).ok();
		}
	}

	fn flush(&self) {}
}

/*
 * init_console - Install the console as the global logger
 * @sink: destination for formatted lines
 * @level: maximum level forwarded to the sink
 *
 * Fails if any logger (this one included) is already installed.
 */
pub fn init_console(sink: Box<dyn ConsoleSink>, level: LevelFilter) -> Result<(), SetLoggerError> {
	log::set_logger(&LOGGER)?;
	CONSOLE.call_once(|| Mutex::new(sink));
	log::set_max_level(level);
	Ok(())
}
