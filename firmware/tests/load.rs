mod common;

use bus::MemoryKind;
use bus::sim::{IBUS_RDATA, SimPfe};
use common::*;
use firmware::{FwError, LoaderConfig, Pe, WriteCheck};
use hal::RegisterIo;
use hal::endian::Endian;
use loader::elf::{ET_REL, SHT_ARCH_ATTRIBUTES, SHT_NOBITS, SHT_PROGBITS};
use loader::{ElfClass, ElfError, ElfImage, SectionFlags};
use loader::builder::ElfBuilder;

fn pattern(len: usize, seed: u8) -> Vec<u8> {
	(0..len).map(|i| seed.wrapping_add(i as u8 * 3)).collect()
}

#[test]
fn elf64_data_and_bss_load_into_dmem() {
	let data = pattern(16, 0x40);
	let raw = ElfBuilder::new(ElfClass::Elf64, Endian::Big)
		.section(".data", SHT_PROGBITS, RW, DMEM_BASE, &data)
		.nobits(".bss", RW, DMEM_BASE + 16, 8)
		.build();
	let image = ElfImage::open(&raw).unwrap();

	let mut pe = engine(WriteCheck::Off);
	pe.io_mut().dmem[PE_ID as usize][16..24].fill(0xFF);
	pe.load_firmware(&image).unwrap();

	assert_eq!(&dmem(&pe)[..16], &data[..]);
	let mut bss = [0xEEu8; 8];
	pe.read_dmem(DMEM_BASE + 16, &mut bss).unwrap();
	assert_eq!(bss, [0; 8]);
	assert_eq!(pe.fw_endian(), Endian::Big);

	// The other engine sharing the port is untouched
	assert!(pe.io().dmem[0].iter().all(|b| *b == 0));
}

#[test]
fn relocatable_image_is_refused_at_open() {
	let raw = ElfBuilder::new(ElfClass::Elf64, Endian::Little)
		.elf_type(ET_REL)
		.section(".data", SHT_PROGBITS, RW, DMEM_BASE, &[1, 2, 3, 4])
		.build();
	assert_eq!(ElfImage::open(&raw).err(), Some(ElfError::UnsupportedElfType(ET_REL)));
}

#[test]
fn sections_are_routed_to_every_memory_kind() {
	let text = pattern(12, 0x10);
	let shared = pattern(8, 0x80);
	let external = pattern(6, 0xC0);
	let raw = ElfBuilder::new(ElfClass::Elf32, Endian::Little)
		.section(".text", SHT_PROGBITS, RX, IMEM_BASE + 0x10, &text)
		.section(".lmem", SHT_PROGBITS, RW, LMEM_BASE + 0x20, &shared)
		.nobits(".lmem_bss", RW, LMEM_BASE + 0x40, 6)
		.section(".ddr", SHT_PROGBITS, RW, DDR_BASE + 3, &external)
		.nobits(".ddr_bss", RW, DDR_BASE + 0x21, 5)
		.build();
	let image = ElfImage::open(&raw).unwrap();

	let mut pe = engine(WriteCheck::Fail);
	{
		let sim = pe.io_mut();
		sim.lmem[0x40..0x46].fill(0x55);
		sim.ddr[0x21..0x26].fill(0x55);
	}
	pe.load_firmware(&image).unwrap();

	let sim = pe.io();
	assert_eq!(&sim.imem[PE_ID as usize][0x10..0x1C], &text[..]);
	assert_eq!(&sim.lmem[0x20..0x28], &shared[..]);
	assert_eq!(&sim.lmem[0x40..0x46], &[0; 6]);
	assert_eq!(&sim.ddr[3..9], &external[..]);
	assert_eq!(&sim.ddr[0x21..0x26], &[0; 5]);
	assert_eq!(sim.ddr[0x26], 0);
}

#[test]
fn sections_without_runtime_flags_are_ignored() {
	let raw = ElfBuilder::new(ElfClass::Elf64, Endian::Little)
		.section(".comment", SHT_PROGBITS, SectionFlags::empty(), 0x7777_0000, b"gcc 13\0")
		.section(".data", SHT_PROGBITS, RW, DMEM_BASE, &[9; 4])
		.build();
	let image = ElfImage::open(&raw).unwrap();
	let mut pe = engine(WriteCheck::Off);
	pe.load_firmware(&image).unwrap();
	assert_eq!(&dmem(&pe)[..4], &[9; 4]);
}

#[test]
fn attribute_sections_are_skipped_inside_memories() {
	let raw = ElfBuilder::new(ElfClass::Elf32, Endian::Big)
		.section(".attributes", SHT_ARCH_ATTRIBUTES, SectionFlags::ALLOC, DMEM_BASE + 0x40, &[0xAA; 8])
		.section(".iattr", SHT_ARCH_ATTRIBUTES, SectionFlags::ALLOC, IMEM_BASE + 0x40, &[0xAA; 8])
		.build();
	let image = ElfImage::open(&raw).unwrap();
	let mut pe = engine(WriteCheck::Off);
	pe.load_firmware(&image).unwrap();
	assert_eq!(pe.io().transactions, 0);
}

#[test]
fn addresses_outside_all_memories_are_rejected() {
	let raw = ElfBuilder::new(ElfClass::Elf64, Endian::Big)
		.section(".far", SHT_PROGBITS, RW, 0x5000_0000, &[1; 4])
		.build();
	let image = ElfImage::open(&raw).unwrap();
	let mut pe = engine(WriteCheck::Off);
	assert_eq!(
		pe.load_firmware(&image),
		Err(FwError::UnsupportedMemoryRange {
			addr: 0x5000_0000,
			size: 4
		})
	);

	// Straddling the end of DMEM is no better
	let raw = ElfBuilder::new(ElfClass::Elf64, Endian::Big)
		.section(".edge", SHT_PROGBITS, RW, DMEM_BASE + DMEM_SIZE as u64 - 4, &[1; 8])
		.build();
	let image = ElfImage::open(&raw).unwrap();
	assert!(matches!(
		pe.load_firmware(&image),
		Err(FwError::UnsupportedMemoryRange { .. })
	));
}

#[test]
fn alignment_rules_follow_the_target_memory() {
	let elf = || ElfBuilder::new(ElfClass::Elf32, Endian::Big);
	let cases = [
		(
			elf().section(".d", SHT_PROGBITS, RW, DMEM_BASE + 2, &[1; 4]),
			FwError::MisalignedLoadAddress(DMEM_BASE + 2),
		),
		(
			elf().nobits(".b", RW, LMEM_BASE + 6, 4),
			FwError::MisalignedLoadAddress(LMEM_BASE + 6),
		),
		(
			elf().section(".t", SHT_PROGBITS, RX, IMEM_BASE + 1, &[1; 4]),
			FwError::MisalignedLoadAddress(IMEM_BASE + 1),
		),
		(
			elf().section(".t", SHT_PROGBITS, RX, IMEM_BASE + 2, &[1; 3]),
			FwError::MisalignedLoadSize(3),
		),
	];
	for (builder, expected) in cases {
		let raw = builder.build();
		let image = ElfImage::open(&raw).unwrap();
		let mut pe = engine(WriteCheck::Off);
		assert_eq!(pe.load_firmware(&image), Err(expected));
		assert_eq!(pe.io().transactions, 0);
	}
}

#[test]
fn imem_refuses_zero_fill_sections() {
	let raw = ElfBuilder::new(ElfClass::Elf64, Endian::Little)
		.nobits(".ibss", RX, IMEM_BASE + 0x20, 8)
		.build();
	let image = ElfImage::open(&raw).unwrap();
	let mut pe = engine(WriteCheck::Off);
	assert_eq!(
		pe.load_firmware(&image),
		Err(FwError::UnsupportedSectionType {
			addr: IMEM_BASE + 0x20,
			sh_type: SHT_NOBITS,
			kind: MemoryKind::Imem
		})
	);
}

#[test]
fn failed_load_keeps_earlier_sections() {
	let raw = ElfBuilder::new(ElfClass::Elf64, Endian::Big)
		.section(".first", SHT_PROGBITS, RW, DMEM_BASE, &[7; 8])
		.section(".bad", SHT_PROGBITS, RW, DMEM_BASE + 0x21, &[1; 4])
		.section(".never", SHT_PROGBITS, RW, DMEM_BASE + 0x40, &[3; 4])
		.build();
	let image = ElfImage::open(&raw).unwrap();
	let mut pe = engine(WriteCheck::Off);
	assert!(pe.load_firmware(&image).unwrap_err().is_fatal());
	assert_eq!(&dmem(&pe)[..8], &[7; 8]);
	assert_eq!(&dmem(&pe)[0x40..0x44], &[0; 4]);
}

#[test]
fn overlapping_windows_are_rejected() {
	let mut config = config();
	config.lmem.elf_base = DMEM_BASE + 0x800;
	assert_eq!(
		Pe::new(sim(), config, LoaderConfig::default()).err(),
		Some(FwError::OverlappingRegions)
	);
}

/* Register bank whose IBUS read-data register has a stuck bit */
struct StuckBit(SimPfe);

impl RegisterIo for StuckBit {
	fn write32(&mut self, addr: usize, value: u32) {
		self.0.write32(addr, value)
	}

	fn read32(&mut self, addr: usize) -> u32 {
		let v = self.0.read32(addr);
		if addr == IBUS_RDATA { v ^ 1 } else { v }
	}

	fn write8(&mut self, addr: usize, value: u8) {
		self.0.write8(addr, value)
	}

	fn read8(&mut self, addr: usize) -> u8 {
		self.0.read8(addr)
	}
}

fn stuck_engine(write_check: WriteCheck) -> Pe<StuckBit> {
	Pe::new(StuckBit(sim()), config(), LoaderConfig { write_check }).unwrap()
}

#[test]
fn write_check_modes_decide_what_a_mismatch_costs() {
	let raw = ElfBuilder::new(ElfClass::Elf32, Endian::Big)
		.section(".data", SHT_PROGBITS, RW, DMEM_BASE, &[0x11; 16])
		.build();
	let image = ElfImage::open(&raw).unwrap();

	assert_eq!(stuck_engine(WriteCheck::Off).load_firmware(&image), Ok(()));
	assert_eq!(stuck_engine(WriteCheck::Log).load_firmware(&image), Ok(()));

	let mut pe = stuck_engine(WriteCheck::Fail);
	assert_eq!(
		pe.load_firmware(&image),
		Err(FwError::VerifyMismatch {
			addr: DMEM_BASE,
			count: 4
		})
	);
	// The write itself went through
	assert_eq!(&pe.io().0.dmem[PE_ID as usize][..16], &[0x11; 16]);
}

#[test]
fn default_write_check_follows_the_feature() {
	let expected = if cfg!(feature = "verify-writes") {
		WriteCheck::Log
	} else {
		WriteCheck::Off
	};
	assert_eq!(LoaderConfig::default().write_check, expected);
}
