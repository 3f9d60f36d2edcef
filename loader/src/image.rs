/*
 * ELF Image
 *
 * A parsed view over a caller-owned firmware file. Tables and the
 * section name strings stay borrowed from the original bytes; entries
 * are decoded on demand.
 */

use crate::ElfError;
use crate::elf::*;
use hal::endian::Endian;

/*
 * enum EntryIndex - Table index tagged with where it came from
 * @ByIndex: program table index from find_next_loadable_program()
 * @ByName: section table index from find_section_by_name()
 *
 * Each load operation accepts exactly one origin.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryIndex {
	ByIndex(u32),
	ByName(u32),
}

/*
 * struct ProgramMatch - Result of a loadable program entry scan
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramMatch {
	pub index: EntryIndex,
	pub vaddr: u64,
	pub paddr: u64,
	pub mem_size: u64,
}

/*
 * struct SectionMatch - Result of a section name lookup
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionMatch {
	pub index: EntryIndex,
	pub addr: u64,
	pub size: u64,
}

/*
 * struct Section - Section table entry with its resolved name
 */
#[derive(Debug, Clone, Copy)]
pub struct Section<'a> {
	pub index: u32,
	pub name: &'a str,
	pub header: SectionHeader,
}

/*
 * struct ElfImage - Open ELF executable
 * @raw: whole file, owned by the caller
 * @header: file header normalized once at open
 * @program_table/@section_table: raw table bytes (possibly empty)
 * @section_names: raw bytes of the section name string table
 * @program_cursor: next program entry examined by the scan
 */
pub struct ElfImage<'a> {
	raw: &'a [u8],
	fields: Fields,
	header: ElfHeader,
	program_table: &'a [u8],
	section_table: &'a [u8],
	section_names: &'a [u8],
	program_cursor: u32,
}

/* Bounds-checked borrow of [offset, offset+len) from @raw */
fn file_range<'a>(raw: &'a [u8], offset: u64, len: u64, what: &'static str) -> Result<&'a [u8], ElfError> {
	let end = offset.checked_add(len).ok_or(ElfError::Truncated(what))?;
	if end > raw.len() as u64 {
		return Err(ElfError::Truncated(what));
	}
	Ok(&raw[offset as usize..end as usize])
}

impl<'a> ElfImage<'a> {
	/*
	 * open - Validate and parse an ELF executable
	 * @raw: complete file contents
	 *
	 * Only ET_EXEC images are accepted. Each table's declared entry
	 * size must match the width-specific layout before any entry is
	 * followed.
	 */
	pub fn open(raw: &'a [u8]) -> Result<Self, ElfError> {
		if raw.len() < MAX_EHDR_SIZE {
			return Err(ElfError::NotElf);
		}
		let ident = &raw[..EI_NIDENT];
		if ident[..4] != ELF_MAGIC || ident[EI_VERSION] != EV_CURRENT {
			return Err(ElfError::NotElf);
		}
		let class = match ident[EI_CLASS] {
			ELFCLASS32 => ElfClass::Elf32,
			ELFCLASS64 => ElfClass::Elf64,
			_ => return Err(ElfError::NotElf),
		};
		let endian = match ident[EI_DATA] {
			ELFDATA2LSB => Endian::Little,
			ELFDATA2MSB => Endian::Big,
			_ => return Err(ElfError::NotElf),
		};
		let fields = Fields { class, endian };
		let header = ElfHeader::parse(fields, raw);

		if header.e_type != ET_EXEC {
			return Err(ElfError::UnsupportedElfType(header.e_type));
		}

		let program_table = if header.e_phnum != 0 {
			if header.e_phentsize != class.phent_size() {
				return Err(ElfError::UnexpectedEntrySize {
					table: "program",
					expected: class.phent_size(),
					found: header.e_phentsize,
				});
			}
			let len = header.e_phnum as u64 * header.e_phentsize as u64;
			file_range(raw, header.e_phoff, len, "program table")?
		} else {
			&[]
		};

		let mut image = ElfImage {
			raw,
			fields,
			header,
			program_table,
			section_table: &[],
			section_names: &[],
			program_cursor: 0,
		};

		if header.e_shnum != 0 {
			if header.e_shentsize != class.shent_size() {
				return Err(ElfError::UnexpectedEntrySize {
					table: "section",
					expected: class.shent_size(),
					found: header.e_shentsize,
				});
			}
			let len = header.e_shnum as u64 * header.e_shentsize as u64;
			image.section_table = file_range(raw, header.e_shoff, len, "section table")?;

			if header.e_shstrndx == SHN_UNDEF || header.e_shstrndx >= header.e_shnum {
				return Err(ElfError::SectionNamesNotFound);
			}
			let names = image.section_at(header.e_shstrndx as u32);
			if names.sh_size == 0 || names.kind() == SectionType::Nobits {
				return Err(ElfError::SectionNamesNotFound);
			}
			image.section_names = file_range(raw, names.sh_offset, names.sh_size, "section names")?;
		}

		Ok(image)
	}

	/*
	 * close - Release the image
	 *
	 * Drops the borrowed views; the caller keeps the file bytes.
	 */
	pub fn close(self) {}

	pub fn header(&self) -> &ElfHeader {
		&self.header
	}

	pub fn entry(&self) -> u64 {
		self.header.e_entry
	}

	pub fn class(&self) -> ElfClass {
		self.fields.class
	}

	pub fn is_64(&self) -> bool {
		self.fields.class == ElfClass::Elf64
	}

	pub fn endian(&self) -> Endian {
		self.fields.endian
	}

	pub fn program_count(&self) -> u32 {
		self.header.e_phnum as u32
	}

	pub fn section_count(&self) -> u32 {
		self.header.e_shnum as u32
	}

	// Caller guarantees i < e_phnum; the table was bounds-checked at open
	fn program_at(&self, i: u32) -> ProgramHeader {
		let size = self.header.e_phentsize as usize;
		let start = i as usize * size;
		ProgramHeader::parse(self.fields, &self.program_table[start..start + size])
	}

	fn section_at(&self, i: u32) -> SectionHeader {
		let size = self.header.e_shentsize as usize;
		let start = i as usize * size;
		SectionHeader::parse(self.fields, &self.section_table[start..start + size])
	}

	pub fn program(&self, i: u32) -> Result<ProgramHeader, ElfError> {
		if i >= self.program_count() {
			return Err(ElfError::IndexOutOfRange(i));
		}
		Ok(self.program_at(i))
	}

	pub fn section(&self, i: u32) -> Result<SectionHeader, ElfError> {
		if i >= self.section_count() {
			return Err(ElfError::IndexOutOfRange(i));
		}
		Ok(self.section_at(i))
	}

	/*
	 * section_name - Resolve a section's name in the name string table
	 *
	 * Returns None for offsets outside the table or non-UTF-8 names.
	 */
	pub fn section_name(&self, sh: &SectionHeader) -> Option<&'a str> {
		let names: &'a [u8] = self.section_names;
		let start = sh.sh_name as usize;
		let tail = names.get(start..)?;
		let end = tail.iter().position(|b| *b == 0).unwrap_or(tail.len());
		core::str::from_utf8(&tail[..end]).ok()
	}

	/*
	 * sections - Iterate the section table in index order
	 *
	 * Unresolvable names come back empty.
	 */
	pub fn sections(&self) -> impl Iterator<Item = Section<'a>> + '_ {
		(0..self.section_count()).map(move |index| {
			let header = self.section_at(index);
			Section {
				index,
				name: self.section_name(&header).unwrap_or(""),
				header,
			}
		})
	}

	/*
	 * section_data - File bytes backing a section
	 *
	 * NOBITS sections have no file bytes and yield an empty slice.
	 */
	pub fn section_data(&self, sh: &SectionHeader) -> Result<&'a [u8], ElfError> {
		match sh.kind() {
			SectionType::Nobits | SectionType::Null => Ok(&[]),
			_ => file_range(self.raw, sh.sh_offset, sh.sh_size, "section data"),
		}
	}

	/*
	 * find_next_loadable_program - Advance the program scan
	 *
	 * Skips entries that are not PT_LOAD or have zero memory size.
	 * Once the table is exhausted it keeps returning None until
	 * reset_program_scan() is called.
	 */
	pub fn find_next_loadable_program(&mut self) -> Option<ProgramMatch> {
		while self.program_cursor < self.program_count() {
			let i = self.program_cursor;
			self.program_cursor += 1;
			let ph = self.program_at(i);
			if ph.is_load() && ph.p_memsz != 0 {
				return Some(ProgramMatch {
					index: EntryIndex::ByIndex(i),
					vaddr: ph.p_vaddr,
					paddr: ph.p_paddr,
					mem_size: ph.p_memsz,
				});
			}
		}
		None
	}

	pub fn reset_program_scan(&mut self) {
		self.program_cursor = 0;
	}

	/*
	 * find_section_by_name - Linear scan for a section called @name
	 *
	 * The NULL entry and sections whose name cannot be resolved never
	 * match, not even an empty @name.
	 */
	pub fn find_section_by_name(&self, name: &str) -> Option<SectionMatch> {
		self.sections()
			.filter(|s| s.index != 0 && !s.name.is_empty())
			.find(|s| s.name == name)
			.map(|s| SectionMatch {
				index: EntryIndex::ByName(s.index),
				addr: s.header.sh_addr,
				size: s.header.sh_size,
			})
	}

	/*
	 * load_program_entry - Materialize a program entry into @dest
	 * @index: must come from the program scan
	 *
	 * Copies p_filesz bytes, then zero-fills up to p_memsz.
	 */
	pub fn load_program_entry(&self, index: EntryIndex, dest: &mut [u8]) -> Result<(), ElfError> {
		let EntryIndex::ByIndex(i) = index else {
			return Err(ElfError::WrongIndexOrigin);
		};
		let ph = self.program(i)?;
		if !ph.is_load() {
			return Err(ElfError::NotLoadable(ph.p_type));
		}
		if ph.p_filesz > ph.p_memsz {
			return Err(ElfError::SectionSizeInconsistent {
				file: ph.p_filesz,
				mem: ph.p_memsz,
			});
		}
		if (dest.len() as u64) < ph.p_memsz {
			return Err(ElfError::DestinationTooSmall {
				needed: ph.p_memsz,
				available: dest.len(),
			});
		}
		let data = file_range(self.raw, ph.p_offset, ph.p_filesz, "segment data")?;
		let (file_part, rest) = dest.split_at_mut(data.len());
		file_part.copy_from_slice(data);
		rest[..(ph.p_memsz - ph.p_filesz) as usize].fill(0);
		Ok(())
	}

	/*
	 * load_section - Materialize a section into @dest
	 * @index: must come from find_section_by_name()
	 *
	 * NOBITS sections are zero-filled, everything else is copied.
	 */
	pub fn load_section(&self, index: EntryIndex, dest: &mut [u8]) -> Result<(), ElfError> {
		let EntryIndex::ByName(i) = index else {
			return Err(ElfError::WrongIndexOrigin);
		};
		let sh = self.section(i)?;
		if sh.kind() == SectionType::Null {
			return Err(ElfError::NotLoadable(sh.sh_type));
		}
		if (dest.len() as u64) < sh.sh_size {
			return Err(ElfError::DestinationTooSmall {
				needed: sh.sh_size,
				available: dest.len(),
			});
		}
		let dest = &mut dest[..sh.sh_size as usize];
		match sh.kind() {
			SectionType::Nobits => dest.fill(0),
			_ => dest.copy_from_slice(self.section_data(&sh)?),
		}
		Ok(())
	}

	/*
	 * dump - Log header, program and section tables at debug level
	 */
	pub fn dump(&self) {
		let h = &self.header;
		log::debug!(
			"ELF{} {:?}-endian type {} machine 0x{:x} entry 0x{:x}",
			if self.is_64() { 64 } else { 32 },
			self.endian(),
			h.e_type,
			h.e_machine,
			h.e_entry
		);
		for i in 0..self.program_count() {
			let ph = self.program_at(i);
			log::debug!(
				"  [{}] type {} vaddr 0x{:x} paddr 0x{:x} filesz {} memsz {} {:?}",
				i,
				ph.p_type,
				ph.p_vaddr,
				ph.p_paddr,
				ph.p_filesz,
				ph.p_memsz,
				ph.p_flags
			);
		}
		for s in self.sections() {
			log::debug!(
				"  [{}] {:<16} {:?} addr 0x{:x} size {} {:?}",
				s.index,
				s.name,
				s.header.kind(),
				s.header.sh_addr,
				s.header.sh_size,
				s.header.sh_flags
			);
		}
	}
}
