/*
 * Firmware Error Ring
 *
 * The firmware appends pointers to static error descriptors into a
 * 64-slot ring in DMEM and bumps a free-running write index. The
 * descriptors and their strings live in `.errors`, which the host
 * keeps a copy of from load time.
 *
 * DMEM record (firmware byte order):
 *   u32 write_index
 *   u32 slots[ERROR_RING_CAPACITY]
 * Descriptor in `.errors`:
 *   u32 message, u32 file, u32 line
 */

use crate::FwError;
use crate::config::ERROR_RING_CAPACITY;
use crate::mmap::PeMmap;
use crate::pe::{CapturedSection, Pe};
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use hal::RegisterIo;
use hal::endian::Endian;

const DESCRIPTOR_SIZE: u64 = 12;

/* Bytes up to (not including) the first NUL */
pub(crate) fn nul_terminated(bytes: &[u8]) -> &[u8] {
	let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
	&bytes[..end]
}

/*
 * struct ErrorEntry - One decoded firmware error
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEntry {
	pub pe_id: u8,
	pub message: String,
	pub file: String,
	pub line: u32,
}

impl fmt::Display for ErrorEntry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: {} line {}: {}", self.pe_id, self.file, self.line, self.message)
	}
}

impl CapturedSection {
	fn bytes_at(&self, addr: u64, len: u64) -> Option<&[u8]> {
		let start = addr.checked_sub(self.addr)?;
		let end = start.checked_add(len)?;
		self.data.get(start as usize..end as usize)
	}

	fn string_at(&self, addr: u64) -> Option<String> {
		let start = addr.checked_sub(self.addr)?;
		let tail = self.data.get(start as usize..)?;
		let s = core::str::from_utf8(nul_terminated(tail)).ok()?;
		Some(s.to_string())
	}

	/*
	 * decode - Resolve a ring slot into an entry
	 *
	 * Pointers that do not resolve inside the captured section give
	 * placeholder text instead of failing the batch.
	 */
	fn decode(&self, pe_id: u8, ptr: u32, fw: Endian) -> ErrorEntry {
		let Some(desc) = self.bytes_at(ptr as u64, DESCRIPTOR_SIZE) else {
			return ErrorEntry {
				pe_id,
				message: format!("unresolved error descriptor 0x{:x}", ptr),
				file: "?".to_string(),
				line: 0,
			};
		};
		let message = fw.read_u32(&desc[0..4]);
		let file = fw.read_u32(&desc[4..8]);
		let line = fw.read_u32(&desc[8..12]);
		ErrorEntry {
			pe_id,
			message: self
				.string_at(message as u64)
				.unwrap_or_else(|| format!("unresolved message 0x{:x}", message)),
			file: self.string_at(file as u64).unwrap_or_else(|| "?".to_string()),
			line,
		}
	}
}

impl<R: RegisterIo> Pe<R> {
	/*
	 * read_errors - Collect entries appended since the previous call
	 *
	 * Needs both a memory map and a captured `.errors` section,
	 * otherwise NotAvailable. A gap larger than the ring is clamped to
	 * the ring size, starting at the oldest surviving slot. The read
	 * cursor always moves to the observed write index.
	 */
	pub fn read_errors(&mut self) -> Result<Vec<ErrorEntry>, FwError> {
		if self.mmap_addr.is_none() || self.errors_section.is_none() {
			return Err(FwError::NotAvailable);
		}
		let mmap = self.get_memory_map()?;
		let record = PeMmap::word(mmap.fw_errors, self.fw_endian) as u64;
		if record == 0 {
			return Err(FwError::NotAvailable);
		}

		let write_index = self.read_dmem_u32(record)?;
		let mut count = write_index.wrapping_sub(self.last_error_index);
		let mut start = self.last_error_index;
		self.last_error_index = write_index;

		if count > ERROR_RING_CAPACITY {
			log::warn!(
				"pe{}: error ring overflow, {} entries lost",
				self.config.id,
				count - ERROR_RING_CAPACITY
			);
			count = ERROR_RING_CAPACITY;
			start = write_index;
		}

		let mut slots = Vec::with_capacity(count as usize);
		for i in 0..count {
			let slot = start.wrapping_add(i) % ERROR_RING_CAPACITY;
			slots.push(self.read_dmem_u32(record + 4 + slot as u64 * 4)?);
		}

		let (id, fw) = (self.config.id, self.fw_endian);
		let Some(errors) = self.errors_section.as_ref() else {
			return Err(FwError::NotAvailable);
		};
		Ok(slots.into_iter().map(|ptr| errors.decode(id, ptr, fw)).collect())
	}

	/*
	 * log_errors - Drain new firmware errors to the log
	 *
	 * Returns the number of entries logged. Unavailability is silent.
	 */
	pub fn log_errors(&mut self) -> usize {
		match self.read_errors() {
			Ok(entries) => {
				for e in &entries {
					log::error!("{}", e);
				}
				entries.len()
			}
			Err(FwError::NotAvailable) => 0,
			Err(e) => {
				log::warn!("pe{}: error ring unreadable: {}", self.config.id, e);
				0
			}
		}
	}
}
