/*
 * Firmware Memory Map
 *
 * Firmware built with introspection support places a fixed-layout
 * record in DMEM (section `.pfe_pe_mmap`) describing its version and
 * where its runtime structures live. Every word is in firmware byte
 * order; the record is handed out raw.
 */

use crate::FwError;
use crate::config::MMAP_SECTION;
use crate::diag::nul_terminated;
use crate::pe::Pe;
use hal::RegisterIo;
use hal::endian::Endian;
use loader::ElfImage;

/* Size the firmware must report in PeMmap::size */
pub const PE_MMAP_SIZE: usize = 100;

/*
 * struct PeVersion - Firmware build identification
 * @id: numeric firmware id (firmware byte order)
 * @build_date/@build_time/@vctrl: NUL-padded strings
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct PeVersion {
	pub id: u32,
	pub major: u8,
	pub minor: u8,
	pub patch: u8,
	pub reserved: u8,
	pub build_date: [u8; 16],
	pub build_time: [u8; 16],
	pub vctrl: [u8; 16],
}

/*
 * struct PeMmap - Memory-map record as stored in DMEM
 * @size: record size as seen by the firmware
 * @dmem_heap_base/@dmem_heap_size: firmware heap
 * @dmem_phy_if_base/@dmem_phy_if_size: physical interface table
 * @dmem_log_if_base/@dmem_log_if_size: logical interface table
 * @pe_stats/@classify_stats: statistics blocks
 * @fw_errors: error ring record
 * @misc_control: miscellaneous control block
 *
 * u32 fields hold the raw firmware-order words.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct PeMmap {
	pub size: u32,
	pub version: PeVersion,
	pub dmem_heap_base: u32,
	pub dmem_heap_size: u32,
	pub dmem_phy_if_base: u32,
	pub dmem_phy_if_size: u32,
	pub dmem_log_if_base: u32,
	pub dmem_log_if_size: u32,
	pub pe_stats: u32,
	pub classify_stats: u32,
	pub fw_errors: u32,
	pub misc_control: u32,
}

const _: () = assert!(core::mem::size_of::<PeMmap>() == PE_MMAP_SIZE);

fn raw_word(b: &[u8], off: usize) -> u32 {
	u32::from_ne_bytes([b[off], b[off + 1], b[off + 2], b[off + 3]])
}

fn array16(b: &[u8], off: usize) -> [u8; 16] {
	let mut out = [0u8; 16];
	out.copy_from_slice(&b[off..off + 16]);
	out
}

fn text(bytes: &[u8]) -> &str {
	core::str::from_utf8(nul_terminated(bytes)).unwrap_or("?")
}

impl PeVersion {
	pub fn build_date(&self) -> &str {
		text(&self.build_date)
	}

	pub fn build_time(&self) -> &str {
		text(&self.build_time)
	}

	pub fn vctrl(&self) -> &str {
		text(&self.vctrl)
	}
}

impl PeMmap {
	/* Lay the DMEM bytes over the record, words kept in memory order */
	pub fn from_raw(b: &[u8; PE_MMAP_SIZE]) -> Self {
		PeMmap {
			size: raw_word(b, 0),
			version: PeVersion {
				id: raw_word(b, 4),
				major: b[8],
				minor: b[9],
				patch: b[10],
				reserved: b[11],
				build_date: array16(b, 12),
				build_time: array16(b, 28),
				vctrl: array16(b, 44),
			},
			dmem_heap_base: raw_word(b, 60),
			dmem_heap_size: raw_word(b, 64),
			dmem_phy_if_base: raw_word(b, 68),
			dmem_phy_if_size: raw_word(b, 72),
			dmem_log_if_base: raw_word(b, 76),
			dmem_log_if_size: raw_word(b, 80),
			pe_stats: raw_word(b, 84),
			classify_stats: raw_word(b, 88),
			fw_errors: raw_word(b, 92),
			misc_control: raw_word(b, 96),
		}
	}

	/* Host-order value of one raw field */
	pub fn word(raw: u32, fw: Endian) -> u32 {
		fw.u32_to_native(raw)
	}
}

impl<R: RegisterIo> Pe<R> {
	/*
	 * discover_memory_map - Locate the memory-map record
	 *
	 * Returns false when the firmware carries no record. A record
	 * outside DMEM fails the call.
	 */
	pub fn discover_memory_map(&mut self, image: &ElfImage) -> Result<bool, FwError> {
		self.mmap_addr = None;
		let Some(found) = image.find_section_by_name(MMAP_SECTION) else {
			log::debug!("pe{}: no {} section", self.config.id, MMAP_SECTION);
			return Ok(false);
		};
		if !self.config.dmem.contains(found.addr, found.size) {
			return Err(FwError::UnsupportedMemoryRange {
				addr: found.addr,
				size: found.size,
			});
		}
		self.mmap_addr = Some(found.addr);
		Ok(true)
	}

	/*
	 * get_memory_map - Read the memory-map record from DMEM
	 *
	 * The record's own size field must equal PE_MMAP_SIZE; no other
	 * field is looked at before that holds.
	 */
	pub fn get_memory_map(&mut self) -> Result<PeMmap, FwError> {
		let addr = self.mmap_addr.ok_or(FwError::NotAvailable)?;
		let mut raw = [0u8; PE_MMAP_SIZE];
		self.read_dmem(addr, &mut raw)?;

		let found = self.fw_endian.read_u32(&raw);
		if found != PE_MMAP_SIZE as u32 {
			return Err(FwError::StructureSizeMismatch {
				expected: PE_MMAP_SIZE as u32,
				found,
			});
		}
		Ok(PeMmap::from_raw(&raw))
	}

	pub(crate) fn log_version(&mut self) {
		if self.mmap_addr.is_none() {
			return;
		}
		match self.get_memory_map() {
			Ok(mmap) => {
				let v = &mmap.version;
				log::info!(
					"pe{}: firmware {}.{}.{} id 0x{:x} ({} {} {})",
					self.config.id,
					v.major,
					v.minor,
					v.patch,
					PeMmap::word(v.id, self.fw_endian),
					v.build_date(),
					v.build_time(),
					v.vctrl()
				);
			}
			Err(e) => log::warn!("pe{}: memory map unreadable: {}", self.config.id, e),
		}
	}
}
