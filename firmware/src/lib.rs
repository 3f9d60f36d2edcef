/*
 * PE Firmware Loader
 *
 * Loads ELF firmware into the memories of one packet-processing
 * engine and exposes what the firmware publishes at run time: its
 * memory-map record and its error ring.
 *
 * Synchronous and single-threaded. Callers serialize load_firmware()
 * and read_errors() per engine, and across engines that share one
 * register-indirect port.
 */

#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod config;
pub mod diag;
pub mod load;
pub mod mmap;
pub mod pe;

pub use config::{ERROR_RING_CAPACITY, LoaderConfig, PeConfig, WriteCheck};
pub use diag::ErrorEntry;
pub use mmap::{PE_MMAP_SIZE, PeMmap, PeVersion};
pub use pe::Pe;

use bus::{BusError, MemoryKind};
use loader::ElfError;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FwError {
	#[error(transparent)]
	Elf(#[from] ElfError),
	#[error(transparent)]
	Bus(#[from] BusError),
	#[error("range 0x{addr:x}+0x{size:x} matches no PE memory")]
	UnsupportedMemoryRange { addr: u64, size: u64 },
	#[error("load address 0x{0:x} misaligned for its memory")]
	MisalignedLoadAddress(u64),
	#[error("load size 0x{0:x} misaligned for its memory")]
	MisalignedLoadSize(u64),
	#[error("section type 0x{sh_type:x} at 0x{addr:x} cannot be loaded into {kind:?}")]
	UnsupportedSectionType { addr: u64, sh_type: u32, kind: MemoryKind },
	#[error("firmware structure is {found} bytes, expected {expected}")]
	StructureSizeMismatch { expected: u32, found: u32 },
	#[error("not available in this firmware")]
	NotAvailable,
	#[error("PE memory regions overlap")]
	OverlappingRegions,
	#[error("read-back of section at 0x{addr:x} differs in {count} bytes")]
	VerifyMismatch { addr: u64, count: usize },
}

impl FwError {
	/* NotAvailable only reports a missing optional capability */
	pub fn is_fatal(&self) -> bool {
		!matches!(self, FwError::NotAvailable)
	}
}
