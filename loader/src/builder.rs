/*
 * ELF Image Builder
 *
 * Produces small, well-formed ELF files (either width, either byte
 * order) for exercising the container and the PE loader on a host.
 * Knobs exist to corrupt individual header fields.
 */

use crate::elf::*;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use hal::endian::Endian;

struct SegmentSpec {
	p_type: u32,
	vaddr: u64,
	paddr: u64,
	data: Vec<u8>,
	memsz: u64,
}

struct SectionSpec {
	name: String,
	sh_type: u32,
	flags: u64,
	addr: u64,
	data: Vec<u8>,
	size: u64,
}

pub struct ElfBuilder {
	class: ElfClass,
	endian: Endian,
	e_type: u16,
	machine: u16,
	entry: u64,
	phentsize: Option<u16>,
	shentsize: Option<u16>,
	shstrndx: Option<u16>,
	segments: Vec<SegmentSpec>,
	sections: Vec<SectionSpec>,
}

struct Out {
	buf: Vec<u8>,
	class: ElfClass,
	endian: Endian,
}

impl Out {
	fn put(&mut self, off: usize, bytes: &[u8]) {
		if self.buf.len() < off + bytes.len() {
			self.buf.resize(off + bytes.len(), 0);
		}
		self.buf[off..off + bytes.len()].copy_from_slice(bytes);
	}

	fn put16(&mut self, off: usize, v: u16) {
		match self.endian {
			Endian::Little => self.put(off, &v.to_le_bytes()),
			Endian::Big => self.put(off, &v.to_be_bytes()),
		}
	}

	fn put32(&mut self, off: usize, v: u32) {
		let b = self.endian.u32_bytes(v);
		self.put(off, &b);
	}

	fn put_word(&mut self, off: usize, v: u64) {
		match (self.class, self.endian) {
			(ElfClass::Elf32, _) => self.put32(off, v as u32),
			(ElfClass::Elf64, Endian::Little) => self.put(off, &v.to_le_bytes()),
			(ElfClass::Elf64, Endian::Big) => self.put(off, &v.to_be_bytes()),
		}
	}

	fn align(&mut self, to: usize) -> usize {
		let len = self.buf.len().next_multiple_of(to);
		self.buf.resize(len, 0);
		len
	}
}

impl ElfBuilder {
	pub fn new(class: ElfClass, endian: Endian) -> Self {
		ElfBuilder {
			class,
			endian,
			e_type: ET_EXEC,
			machine: 0,
			entry: 0,
			phentsize: None,
			shentsize: None,
			shstrndx: None,
			segments: Vec::new(),
			sections: Vec::new(),
		}
	}

	pub fn elf_type(mut self, e_type: u16) -> Self {
		self.e_type = e_type;
		self
	}

	pub fn machine(mut self, machine: u16) -> Self {
		self.machine = machine;
		self
	}

	pub fn entry(mut self, entry: u64) -> Self {
		self.entry = entry;
		self
	}

	pub fn phentsize(mut self, size: u16) -> Self {
		self.phentsize = Some(size);
		self
	}

	pub fn shentsize(mut self, size: u16) -> Self {
		self.shentsize = Some(size);
		self
	}

	pub fn shstrndx(mut self, index: u16) -> Self {
		self.shstrndx = Some(index);
		self
	}

	/*
	 * segment - Add a program entry with @data as file contents
	 * @memsz: memory size; may be below data.len() to build bad images
	 */
	pub fn segment(mut self, p_type: u32, vaddr: u64, data: &[u8], memsz: u64) -> Self {
		self.segments.push(SegmentSpec {
			p_type,
			vaddr,
			paddr: vaddr,
			data: data.to_vec(),
			memsz,
		});
		self
	}

	/* Add a section with file contents */
	pub fn section(mut self, name: &str, sh_type: u32, flags: SectionFlags, addr: u64, data: &[u8]) -> Self {
		self.sections.push(SectionSpec {
			name: String::from(name),
			sh_type,
			flags: flags.bits(),
			addr,
			data: data.to_vec(),
			size: data.len() as u64,
		});
		self
	}

	/* Add a NOBITS section of @size bytes */
	pub fn nobits(mut self, name: &str, flags: SectionFlags, addr: u64, size: u64) -> Self {
		self.sections.push(SectionSpec {
			name: String::from(name),
			sh_type: SHT_NOBITS,
			flags: flags.bits(),
			addr,
			data: Vec::new(),
			size,
		});
		self
	}

	pub fn build(&self) -> Vec<u8> {
		let ehsize = self.class.ehdr_size();
		let phentsize = self.phentsize.unwrap_or(self.class.phent_size());
		let shentsize = self.shentsize.unwrap_or(self.class.shent_size());
		let mut out = Out {
			buf: vec![0; ehsize],
			class: self.class,
			endian: self.endian,
		};

		// Program table right after the header
		let phoff = if self.segments.is_empty() { 0 } else { ehsize };
		out.buf.resize(ehsize + self.segments.len() * phentsize as usize, 0);

		let mut seg_offsets = Vec::new();
		for seg in &self.segments {
			let off = out.align(8);
			out.put(off, &seg.data);
			seg_offsets.push(off);
		}

		let mut sec_offsets = Vec::new();
		for sec in &self.sections {
			let off = out.align(8);
			out.put(off, &sec.data);
			sec_offsets.push(off);
		}

		// Name table: "\0" then each name, ".shstrtab" last
		let mut names = vec![0u8];
		let mut name_offsets = Vec::new();
		for sec in &self.sections {
			name_offsets.push(names.len() as u32);
			names.extend_from_slice(sec.name.as_bytes());
			names.push(0);
		}
		let shstrtab_name = names.len() as u32;
		names.extend_from_slice(b".shstrtab\0");
		let names_off = out.align(8);
		out.put(names_off, &names);

		let shnum = self.sections.len() + 2;
		let shoff = out.align(8);
		out.buf.resize(shoff + shnum * shentsize as usize, 0);

		for (i, seg) in self.segments.iter().enumerate() {
			let base = phoff + i * phentsize as usize;
			let (filesz, memsz) = (seg.data.len() as u64, seg.memsz);
			match self.class {
				ElfClass::Elf32 => {
					out.put32(base, seg.p_type);
					out.put_word(base + 4, seg_offsets[i] as u64);
					out.put_word(base + 8, seg.vaddr);
					out.put_word(base + 12, seg.paddr);
					out.put_word(base + 16, filesz);
					out.put_word(base + 20, memsz);
					out.put32(base + 24, (SegmentFlags::R | SegmentFlags::W).bits());
					out.put_word(base + 28, 4);
				}
				ElfClass::Elf64 => {
					out.put32(base, seg.p_type);
					out.put32(base + 4, (SegmentFlags::R | SegmentFlags::W).bits());
					out.put_word(base + 8, seg_offsets[i] as u64);
					out.put_word(base + 16, seg.vaddr);
					out.put_word(base + 24, seg.paddr);
					out.put_word(base + 32, filesz);
					out.put_word(base + 40, memsz);
					out.put_word(base + 48, 8);
				}
			}
		}

		// Section 0 stays all-zero (SHT_NULL)
		let entries = self
			.sections
			.iter()
			.enumerate()
			.map(|(i, s)| (name_offsets[i], s.sh_type, s.flags, s.addr, sec_offsets[i] as u64, s.size))
			.chain(core::iter::once((shstrtab_name, SHT_STRTAB, 0, 0, names_off as u64, names.len() as u64)));
		for (i, (name, sh_type, flags, addr, offset, size)) in entries.enumerate() {
			let base = shoff + (i + 1) * shentsize as usize;
			out.put32(base, name);
			out.put32(base + 4, sh_type);
			match self.class {
				ElfClass::Elf32 => {
					out.put_word(base + 8, flags);
					out.put_word(base + 12, addr);
					out.put_word(base + 16, offset);
					out.put_word(base + 20, size);
					out.put_word(base + 32, 4);
				}
				ElfClass::Elf64 => {
					out.put_word(base + 8, flags);
					out.put_word(base + 16, addr);
					out.put_word(base + 24, offset);
					out.put_word(base + 32, size);
					out.put_word(base + 48, 8);
				}
			}
		}

		out.put(0, &ELF_MAGIC);
		out.buf[EI_CLASS] = match self.class {
			ElfClass::Elf32 => ELFCLASS32,
			ElfClass::Elf64 => ELFCLASS64,
		};
		out.buf[EI_DATA] = match self.endian {
			Endian::Little => ELFDATA2LSB,
			Endian::Big => ELFDATA2MSB,
		};
		out.buf[EI_VERSION] = EV_CURRENT;

		let (phoff_at, shoff_at, rest) = match self.class {
			ElfClass::Elf32 => (28, 32, 36),
			ElfClass::Elf64 => (32, 40, 48),
		};
		out.put16(16, self.e_type);
		out.put16(18, self.machine);
		out.put32(20, EV_CURRENT as u32);
		out.put_word(24, self.entry);
		out.put_word(phoff_at, phoff as u64);
		out.put_word(shoff_at, shoff as u64);
		out.put16(rest + 4, ehsize as u16);
		out.put16(rest + 6, phentsize);
		out.put16(rest + 8, self.segments.len() as u16);
		out.put16(rest + 10, shentsize);
		out.put16(rest + 12, shnum as u16);
		out.put16(rest + 14, self.shstrndx.unwrap_or((shnum - 1) as u16));

		// Headers occupy at least the larger header size
		if out.buf.len() < MAX_EHDR_SIZE {
			out.buf.resize(MAX_EHDR_SIZE, 0);
		}
		out.buf
	}
}
