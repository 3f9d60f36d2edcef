/*
 * Processing Engine Instance
 *
 * Per-engine state that outlives a single call: the register
 * accessor, the hardware binding, and what the last load captured
 * (firmware byte order, memory-map address, `.errors` contents and
 * the error ring read cursor).
 */

use crate::FwError;
use crate::config::{LoaderConfig, PeConfig};
use alloc::vec::Vec;
use bus::{MemoryRegion, PeBus};
use hal::RegisterIo;
use hal::endian::Endian;

/*
 * struct CapturedSection - Host copy of a firmware section
 * @addr: ELF address the section was linked at
 * @data: section contents
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CapturedSection {
	pub addr: u64,
	pub data: Vec<u8>,
}

pub struct Pe<R: RegisterIo> {
	pub(crate) io: R,
	pub(crate) config: PeConfig,
	pub(crate) loader: LoaderConfig,
	pub(crate) fw_endian: Endian,
	pub(crate) mmap_addr: Option<u64>,
	pub(crate) errors_section: Option<CapturedSection>,
	pub(crate) last_error_index: u32,
}

impl<R: RegisterIo> Pe<R> {
	/*
	 * new - Bind an engine to its memories
	 *
	 * Fails if any two memory windows overlap in ELF space.
	 */
	pub fn new(io: R, config: PeConfig, loader: LoaderConfig) -> Result<Self, FwError> {
		config.validate()?;
		Ok(Pe {
			io,
			config,
			loader,
			fw_endian: Endian::Big,
			mmap_addr: None,
			errors_section: None,
			last_error_index: 0,
		})
	}

	pub fn id(&self) -> u8 {
		self.config.id
	}

	pub fn config(&self) -> &PeConfig {
		&self.config
	}

	pub fn io(&self) -> &R {
		&self.io
	}

	pub fn io_mut(&mut self) -> &mut R {
		&mut self.io
	}

	/* Byte order of the most recently loaded firmware */
	pub fn fw_endian(&self) -> Endian {
		self.fw_endian
	}

	pub fn mmap_address(&self) -> Option<u64> {
		self.mmap_addr
	}

	pub fn last_error_index(&self) -> u32 {
		self.last_error_index
	}

	/* Size of the captured `.errors` section, if any */
	pub fn errors_section_len(&self) -> Option<usize> {
		self.errors_section.as_ref().map(|s| s.data.len())
	}

	/*
	 * classify - First region fully containing [addr, addr+size)
	 */
	pub fn classify(&self, addr: u64, size: u64) -> Option<MemoryRegion> {
		self.config.regions().find(|r| r.contains(addr, size)).copied()
	}

	pub(crate) fn bus<'s>(&'s mut self, region: &'s MemoryRegion) -> PeBus<'s, R> {
		PeBus::new(&mut self.io, region, self.config.id)
	}

	/*
	 * read_dmem - Copy @buf.len() bytes of DMEM at ELF address @addr
	 */
	pub fn read_dmem(&mut self, addr: u64, buf: &mut [u8]) -> Result<(), FwError> {
		let dmem = self.config.dmem;
		if !dmem.contains(addr, buf.len() as u64) {
			return Err(FwError::UnsupportedMemoryRange {
				addr,
				size: buf.len() as u64,
			});
		}
		self.bus(&dmem).read(dmem.offset_of(addr), buf)?;
		Ok(())
	}

	/* One firmware-endian word from DMEM, converted to host order */
	pub(crate) fn read_dmem_u32(&mut self, addr: u64) -> Result<u32, FwError> {
		let mut raw = [0u8; 4];
		self.read_dmem(addr, &mut raw)?;
		Ok(self.fw_endian.read_u32(&raw))
	}
}
