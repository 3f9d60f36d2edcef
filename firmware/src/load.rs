/*
 * Section Classifier & Loader
 *
 * Walks the section table of a firmware image and places every
 * runtime section into the PE memory whose ELF window contains it.
 */

use crate::FwError;
use crate::config::{ERRORS_SECTION, WriteCheck};
use crate::pe::{CapturedSection, Pe};
use alloc::vec;
use alloc::vec::Vec;
use bus::{MemoryKind, MemoryRegion};
use hal::RegisterIo;
use loader::{ElfImage, Section, SectionType};

/*
 * enum Placement - What a classified section turns into
 * @Copy: file bytes written to PE memory
 * @Zero: region zero-filled
 * @Skip: recognised but not loaded
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
	Copy,
	Zero,
	Skip,
}

/*
 * placement - Apply the per-memory alignment and type rules
 * @region: memory the section was classified into
 * @addr/@size: section range in ELF space
 * @sh_type: raw section type
 * @host: file bytes of the section (used for the LMEM phase rule)
 */
fn placement(region: &MemoryRegion, addr: u64, size: u64, sh_type: u32, host: &[u8]) -> Result<Placement, FwError> {
	let kind = SectionType::from_raw(sh_type);
	let unsupported = || FwError::UnsupportedSectionType {
		addr,
		sh_type,
		kind: region.kind,
	};

	match region.kind {
		MemoryKind::Imem => {
			if addr % 2 != 0 {
				return Err(FwError::MisalignedLoadAddress(addr));
			}
			if size % 2 != 0 {
				return Err(FwError::MisalignedLoadSize(size));
			}
			match kind {
				SectionType::Progbits => Ok(Placement::Copy),
				SectionType::ArchAttributes => Ok(Placement::Skip),
				_ => Err(unsupported()),
			}
		}
		MemoryKind::Dmem | MemoryKind::Lmem => {
			if addr % 4 != 0 {
				return Err(FwError::MisalignedLoadAddress(addr));
			}
			match kind {
				SectionType::Progbits => {
					// Class-bus bulk copies keep host and target in the same word phase
					if region.kind == MemoryKind::Lmem && (host.as_ptr() as usize & 3) as u64 != addr & 3 {
						return Err(FwError::MisalignedLoadAddress(addr));
					}
					Ok(Placement::Copy)
				}
				SectionType::Nobits => Ok(Placement::Zero),
				SectionType::ArchAttributes => Ok(Placement::Skip),
				_ => Err(unsupported()),
			}
		}
		MemoryKind::Ddr => match kind {
			SectionType::Progbits => Ok(Placement::Copy),
			SectionType::Nobits => Ok(Placement::Zero),
			SectionType::ArchAttributes => Ok(Placement::Skip),
			_ => Err(unsupported()),
		},
	}
}

impl<R: RegisterIo> Pe<R> {
	/*
	 * load_firmware - Place every runtime section of @image
	 *
	 * The `.errors` section is captured into a host buffer instead of
	 * being written to the engine; the previous capture is released
	 * first. Sections with none of WRITE/ALLOC/EXECINSTR are skipped.
	 *
	 * The memory-map record is located before anything is written, so
	 * a record outside DMEM fails the load with the engine untouched.
	 * Any later failing section aborts the load. Sections already
	 * written stay in place, so the engine must be treated as unusable
	 * afterwards.
	 */
	pub fn load_firmware(&mut self, image: &ElfImage) -> Result<(), FwError> {
		self.fw_endian = image.endian();
		self.errors_section = None;
		self.mmap_addr = None;
		self.last_error_index = 0;
		self.discover_memory_map(image)?;

		let mut loaded = 0usize;
		let mut bytes = 0u64;
		for section in image.sections() {
			let sh = &section.header;
			if section.name == ERRORS_SECTION {
				self.capture_errors(image, &section)?;
				continue;
			}
			if !sh.is_runtime() {
				continue;
			}

			let (addr, size) = (sh.sh_addr, sh.sh_size);
			let region = self.classify(addr, size).ok_or(FwError::UnsupportedMemoryRange { addr, size })?;
			let data = image.section_data(sh)?;
			let how = placement(&region, addr, size, sh.sh_type, data)?;

			log::debug!(
				"pe{}: {} {:?} 0x{:x}+0x{:x} -> {:?}",
				self.config.id,
				section.name,
				how,
				addr,
				size,
				region.kind
			);

			let offset = region.offset_of(addr);
			match how {
				Placement::Skip => continue,
				Placement::Copy => self.write_section(&region, offset, data)?,
				Placement::Zero => self.bus(&region).fill(offset, size as usize, 0)?,
			}
			if self.loader.write_check != WriteCheck::Off {
				self.verify_section(&region, addr, how, data, size as usize)?;
			}
			loaded += 1;
			bytes += size;
		}

		self.log_version();
		log::info!(
			"pe{}: loaded {} sections ({} bytes), entry 0x{:x}",
			self.config.id,
			loaded,
			bytes,
			image.entry()
		);
		Ok(())
	}

	/*
	 * capture_errors - Keep a host copy of the `.errors` strings
	 *
	 * A NOBITS `.errors` holds no strings; its declared size is not
	 * backed by the file and is not trusted, so the capture is empty.
	 */
	fn capture_errors(&mut self, image: &ElfImage, section: &Section) -> Result<(), FwError> {
		let sh = &section.header;
		let data = match sh.kind() {
			SectionType::Nobits => Vec::new(),
			_ => image.section_data(sh)?.to_vec(),
		};
		log::debug!("pe{}: captured {} ({} bytes)", self.config.id, ERRORS_SECTION, data.len());
		self.errors_section = Some(CapturedSection { addr: sh.sh_addr, data });
		Ok(())
	}

	fn write_section(&mut self, region: &MemoryRegion, offset: u32, data: &[u8]) -> Result<(), FwError> {
		let mut bus = self.bus(region);
		match region.kind {
			MemoryKind::Lmem => bus.copy_from_host(offset, data)?,
			_ => bus.write(offset, data)?,
		}
		Ok(())
	}

	/*
	 * verify_section - Read a placed section back and compare
	 *
	 * Mismatches are logged; only WriteCheck::Fail turns them into an
	 * error.
	 */
	fn verify_section(
		&mut self,
		region: &MemoryRegion,
		addr: u64,
		how: Placement,
		data: &[u8],
		size: usize,
	) -> Result<(), FwError> {
		let mut back = vec![0u8; size];
		self.bus(region).read(region.offset_of(addr), &mut back)?;

		let count = match how {
			Placement::Copy => back.iter().zip(data).filter(|(a, b)| a != b).count(),
			_ => back.iter().filter(|b| **b != 0).count(),
		};
		if count == 0 {
			return Ok(());
		}

		log::error!(
			"pe{}: {:?} read-back at 0x{:x} differs in {} of {} bytes",
			self.config.id,
			region.kind,
			addr,
			count,
			size
		);
		if self.loader.write_check == WriteCheck::Fail {
			return Err(FwError::VerifyMismatch { addr, count });
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bus::Access;
	use loader::elf::{SHT_ARCH_ATTRIBUTES, SHT_NOBITS, SHT_PROGBITS, SHT_SYMTAB};

	fn region(kind: MemoryKind) -> MemoryRegion {
		MemoryRegion {
			kind,
			elf_base: 0,
			size: 0x1000,
			access: Access::HostVisible { base: 0 },
		}
	}

	#[test]
	fn imem_wants_halfword_alignment_and_progbits() {
		let r = region(MemoryKind::Imem);
		assert_eq!(placement(&r, 2, 6, SHT_PROGBITS, &[]), Ok(Placement::Copy));
		assert_eq!(placement(&r, 1, 6, SHT_PROGBITS, &[]), Err(FwError::MisalignedLoadAddress(1)));
		assert_eq!(placement(&r, 2, 5, SHT_PROGBITS, &[]), Err(FwError::MisalignedLoadSize(5)));
		assert_eq!(placement(&r, 0, 4, SHT_ARCH_ATTRIBUTES, &[]), Ok(Placement::Skip));
		assert_eq!(
			placement(&r, 0, 4, SHT_NOBITS, &[]),
			Err(FwError::UnsupportedSectionType {
				addr: 0,
				sh_type: 8,
				kind: MemoryKind::Imem
			})
		);
	}

	#[test]
	fn dmem_wants_word_alignment() {
		let r = region(MemoryKind::Dmem);
		assert_eq!(placement(&r, 4, 3, SHT_PROGBITS, &[]), Ok(Placement::Copy));
		assert_eq!(placement(&r, 8, 5, SHT_NOBITS, &[]), Ok(Placement::Zero));
		assert_eq!(placement(&r, 6, 4, SHT_NOBITS, &[]), Err(FwError::MisalignedLoadAddress(6)));
		assert!(matches!(
			placement(&r, 4, 4, SHT_SYMTAB, &[]),
			Err(FwError::UnsupportedSectionType { sh_type: 2, .. })
		));
	}

	#[test]
	fn lmem_copies_need_matching_host_phase() {
		let r = region(MemoryKind::Lmem);
		let buf = [0u8; 16];
		let skew = (4 - (buf.as_ptr() as usize & 3)) & 3;
		let bytes = &buf[skew..];
		assert_eq!(placement(&r, 0x10, 8, SHT_PROGBITS, &bytes[..8]), Ok(Placement::Copy));
		assert_eq!(
			placement(&r, 0x10, 8, SHT_PROGBITS, &bytes[1..9]),
			Err(FwError::MisalignedLoadAddress(0x10))
		);
		// Zero fills carry no host buffer
		assert_eq!(placement(&r, 0x10, 8, SHT_NOBITS, &bytes[1..9]), Ok(Placement::Zero));
	}

	#[test]
	fn ddr_has_no_alignment_rule() {
		let r = region(MemoryKind::Ddr);
		assert_eq!(placement(&r, 3, 5, SHT_PROGBITS, &[]), Ok(Placement::Copy));
		assert_eq!(placement(&r, 1, 1, SHT_NOBITS, &[]), Ok(Placement::Zero));
	}
}
