/*
 * Shared fixtures: one simulated PFE with two engines, engine 1 bound
 * to every memory kind.
 */

#![allow(dead_code)]

use bus::sim::{DDR_WINDOW, SimPfe};
use bus::{Access, MemoryKind, MemoryRegion};
use firmware::{LoaderConfig, Pe, PeConfig, WriteCheck};
use loader::SectionFlags;

pub const PE_ID: u8 = 1;

pub const IMEM_BASE: u64 = 0x0;
pub const DMEM_BASE: u64 = 0x2000_0000;
pub const LMEM_BASE: u64 = 0xC000_0000;
pub const DDR_BASE: u64 = 0x4000_0000;

pub const IMEM_SIZE: usize = 0x100;
pub const DMEM_SIZE: usize = 0x1000;
pub const LMEM_SIZE: usize = 0x100;
pub const DDR_SIZE: usize = 0x100;

pub const RW: SectionFlags = SectionFlags::WRITE.union(SectionFlags::ALLOC);
pub const RX: SectionFlags = SectionFlags::ALLOC.union(SectionFlags::EXECINSTR);

pub fn sim() -> SimPfe {
	SimPfe::new(2, IMEM_SIZE, DMEM_SIZE, LMEM_BASE as u32, LMEM_SIZE, DDR_SIZE)
}

pub fn config() -> PeConfig {
	PeConfig {
		id: PE_ID,
		imem: MemoryRegion {
			kind: MemoryKind::Imem,
			elf_base: IMEM_BASE,
			size: IMEM_SIZE as u64,
			access: Access::Indirect(SimPfe::ibus_regs()),
		},
		dmem: MemoryRegion {
			kind: MemoryKind::Dmem,
			elf_base: DMEM_BASE,
			size: DMEM_SIZE as u64,
			access: Access::Indirect(SimPfe::ibus_regs()),
		},
		lmem: MemoryRegion {
			kind: MemoryKind::Lmem,
			elf_base: LMEM_BASE,
			size: LMEM_SIZE as u64,
			access: Access::ClassBus {
				regs: SimPfe::cbus_regs(),
				bus_base: LMEM_BASE as u32,
			},
		},
		ddr: Some(MemoryRegion {
			kind: MemoryKind::Ddr,
			elf_base: DDR_BASE,
			size: DDR_SIZE as u64,
			access: Access::HostVisible { base: DDR_WINDOW },
		}),
	}
}

pub fn engine(write_check: WriteCheck) -> Pe<SimPfe> {
	Pe::new(sim(), config(), LoaderConfig { write_check }).unwrap()
}

pub fn dmem(pe: &Pe<SimPfe>) -> &[u8] {
	&pe.io().dmem[PE_ID as usize]
}

/* Store a big-endian word in engine DMEM behind the loader's back */
pub fn poke_dmem(pe: &mut Pe<SimPfe>, addr: u64, value: u32) {
	let off = (addr - DMEM_BASE) as usize;
	pe.io_mut().dmem[PE_ID as usize][off..off + 4].copy_from_slice(&value.to_be_bytes());
}
