/*
 * ELF Definitions
 *
 * Constants, on-disk layout offsets and endian-normalized views of
 * the ELF header, program headers and section headers for both
 * 32-bit and 64-bit images.
 */

use bitflags::bitflags;
use hal::endian::Endian;

// ELF Magic Number: 0x7F 'E' 'L' 'F'
pub const ELF_MAGIC: [u8; 4] = [0x7F, 0x45, 0x4C, 0x46];

/* e_ident indices */
pub const EI_CLASS: usize = 4;
pub const EI_DATA: usize = 5;
pub const EI_VERSION: usize = 6;
pub const EI_NIDENT: usize = 16;

pub const ELFCLASS32: u8 = 1;
pub const ELFCLASS64: u8 = 2;
pub const ELFDATA2LSB: u8 = 1;
pub const ELFDATA2MSB: u8 = 2;
pub const EV_CURRENT: u8 = 1;

pub const ET_REL: u16 = 1;
pub const ET_EXEC: u16 = 2;
pub const ET_DYN: u16 = 3;
pub const ET_CORE: u16 = 4;

/* Header sizes; open() always reads the larger */
pub const ELF32_EHDR_SIZE: usize = 52;
pub const ELF64_EHDR_SIZE: usize = 64;
pub const MAX_EHDR_SIZE: usize = ELF64_EHDR_SIZE;

pub const SHN_UNDEF: u16 = 0;

/*
 * enum ElfClass - Image word width, fixed for the image's lifetime
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfClass {
	Elf32,
	Elf64,
}

impl ElfClass {
	pub const fn ehdr_size(self) -> usize {
		match self {
			ElfClass::Elf32 => ELF32_EHDR_SIZE,
			ElfClass::Elf64 => ELF64_EHDR_SIZE,
		}
	}

	pub const fn phent_size(self) -> u16 {
		match self {
			ElfClass::Elf32 => 32,
			ElfClass::Elf64 => 56,
		}
	}

	pub const fn shent_size(self) -> u16 {
		match self {
			ElfClass::Elf32 => 40,
			ElfClass::Elf64 => 64,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum SegmentType {
	Null = 0,
	Load = 1,
	Dynamic = 2,
	Interp = 3,
	Note = 4,
	Shlib = 5,
	Phdr = 6,
	Tls = 7,
}

pub const SHT_NULL: u32 = 0;
pub const SHT_PROGBITS: u32 = 1;
pub const SHT_SYMTAB: u32 = 2;
pub const SHT_STRTAB: u32 = 3;
pub const SHT_NOBITS: u32 = 8;
/* Processor-specific attributes section (SHT_LOPROC + 3) */
pub const SHT_ARCH_ATTRIBUTES: u32 = 0x7000_0003;

/*
 * enum SectionType - Section classes the PE loader distinguishes
 * @Null: inactive header
 * @Progbits: file data copied to memory
 * @Nobits: zero-filled, no file data
 * @ArchAttributes: toolchain metadata, never loaded
 * @Other: anything else (raw sh_type)
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionType {
	Null,
	Progbits,
	Nobits,
	ArchAttributes,
	Other(u32),
}

impl SectionType {
	pub fn from_raw(sh_type: u32) -> Self {
		match sh_type {
			SHT_NULL => SectionType::Null,
			SHT_PROGBITS => SectionType::Progbits,
			SHT_NOBITS => SectionType::Nobits,
			SHT_ARCH_ATTRIBUTES => SectionType::ArchAttributes,
			other => SectionType::Other(other),
		}
	}
}

bitflags! {
	/* Section header flags (sh_flags) */
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct SectionFlags: u64 {
		const WRITE = 0x1;
		const ALLOC = 0x2;
		const EXECINSTR = 0x4;
	}

	/* Segment permission flags (p_flags) */
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct SegmentFlags: u32 {
		const X = 0x1;
		const W = 0x2;
		const R = 0x4;
	}
}

/*
 * struct Fields - Width/endian-aware field decoder
 */
#[derive(Debug, Clone, Copy)]
pub(crate) struct Fields {
	pub class: ElfClass,
	pub endian: Endian,
}

impl Fields {
	pub fn u16(&self, b: &[u8], off: usize) -> u16 {
		self.endian.read_u16(&b[off..])
	}

	pub fn u32(&self, b: &[u8], off: usize) -> u32 {
		self.endian.read_u32(&b[off..])
	}

	/* Address/offset sized word: 4 bytes on ELF32, 8 on ELF64 */
	pub fn word(&self, b: &[u8], off: usize) -> u64 {
		match self.class {
			ElfClass::Elf32 => self.endian.read_u32(&b[off..]) as u64,
			ElfClass::Elf64 => self.endian.read_u64(&b[off..]),
		}
	}
}

/*
 * struct ElfHeader - File header, normalized to host order
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElfHeader {
	pub e_ident: [u8; EI_NIDENT],
	pub e_type: u16,
	pub e_machine: u16,
	pub e_version: u32,
	pub e_entry: u64, // Entry point virtual address
	pub e_phoff: u64, // Program header table file offset
	pub e_shoff: u64, // Section header table file offset
	pub e_flags: u32,
	pub e_ehsize: u16,
	pub e_phentsize: u16,
	pub e_phnum: u16,
	pub e_shentsize: u16,
	pub e_shnum: u16,
	pub e_shstrndx: u16,
}

impl ElfHeader {
	pub(crate) fn parse(f: Fields, b: &[u8]) -> Self {
		let mut e_ident = [0u8; EI_NIDENT];
		e_ident.copy_from_slice(&b[..EI_NIDENT]);
		// Offsets past e_entry shift by the word width
		let (phoff, shoff, rest) = match f.class {
			ElfClass::Elf32 => (28, 32, 36),
			ElfClass::Elf64 => (32, 40, 48),
		};
		ElfHeader {
			e_ident,
			e_type: f.u16(b, 16),
			e_machine: f.u16(b, 18),
			e_version: f.u32(b, 20),
			e_entry: f.word(b, 24),
			e_phoff: f.word(b, phoff),
			e_shoff: f.word(b, shoff),
			e_flags: f.u32(b, rest),
			e_ehsize: f.u16(b, rest + 4),
			e_phentsize: f.u16(b, rest + 6),
			e_phnum: f.u16(b, rest + 8),
			e_shentsize: f.u16(b, rest + 10),
			e_shnum: f.u16(b, rest + 12),
			e_shstrndx: f.u16(b, rest + 14),
		}
	}
}

/*
 * struct ProgramHeader - One program table entry, host order
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramHeader {
	pub p_type: u32,
	pub p_flags: SegmentFlags,
	pub p_offset: u64, // Segment file offset
	pub p_vaddr: u64,  // Segment virtual address
	pub p_paddr: u64,  // Segment physical address
	pub p_filesz: u64, // Segment size in file
	pub p_memsz: u64,  // Segment size in memory
	pub p_align: u64,  // Segment alignment
}

impl ProgramHeader {
	pub(crate) fn parse(f: Fields, b: &[u8]) -> Self {
		match f.class {
			ElfClass::Elf32 => ProgramHeader {
				p_type: f.u32(b, 0),
				p_offset: f.word(b, 4),
				p_vaddr: f.word(b, 8),
				p_paddr: f.word(b, 12),
				p_filesz: f.word(b, 16),
				p_memsz: f.word(b, 20),
				p_flags: SegmentFlags::from_bits_retain(f.u32(b, 24)),
				p_align: f.word(b, 28),
			},
			ElfClass::Elf64 => ProgramHeader {
				p_type: f.u32(b, 0),
				p_flags: SegmentFlags::from_bits_retain(f.u32(b, 4)),
				p_offset: f.word(b, 8),
				p_vaddr: f.word(b, 16),
				p_paddr: f.word(b, 24),
				p_filesz: f.word(b, 32),
				p_memsz: f.word(b, 40),
				p_align: f.word(b, 48),
			},
		}
	}

	pub fn is_load(&self) -> bool {
		self.p_type == SegmentType::Load as u32
	}
}

/*
 * struct SectionHeader - One section table entry, host order
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionHeader {
	pub sh_name: u32,
	pub sh_type: u32,
	pub sh_flags: SectionFlags,
	pub sh_addr: u64,
	pub sh_offset: u64,
	pub sh_size: u64,
	pub sh_link: u32,
	pub sh_info: u32,
	pub sh_addralign: u64,
	pub sh_entsize: u64,
}

impl SectionHeader {
	pub(crate) fn parse(f: Fields, b: &[u8]) -> Self {
		match f.class {
			ElfClass::Elf32 => SectionHeader {
				sh_name: f.u32(b, 0),
				sh_type: f.u32(b, 4),
				sh_flags: SectionFlags::from_bits_retain(f.word(b, 8)),
				sh_addr: f.word(b, 12),
				sh_offset: f.word(b, 16),
				sh_size: f.word(b, 20),
				sh_link: f.u32(b, 24),
				sh_info: f.u32(b, 28),
				sh_addralign: f.word(b, 32),
				sh_entsize: f.word(b, 36),
			},
			ElfClass::Elf64 => SectionHeader {
				sh_name: f.u32(b, 0),
				sh_type: f.u32(b, 4),
				sh_flags: SectionFlags::from_bits_retain(f.word(b, 8)),
				sh_addr: f.word(b, 16),
				sh_offset: f.word(b, 24),
				sh_size: f.word(b, 32),
				sh_link: f.u32(b, 40),
				sh_info: f.u32(b, 44),
				sh_addralign: f.word(b, 48),
				sh_entsize: f.word(b, 56),
			},
		}
	}

	pub fn kind(&self) -> SectionType {
		SectionType::from_raw(self.sh_type)
	}

	/* True when the section occupies memory at run time in any way */
	pub fn is_runtime(&self) -> bool {
		self.sh_flags
			.intersects(SectionFlags::WRITE | SectionFlags::ALLOC | SectionFlags::EXECINSTR)
	}
}
