/*
 * ELF Container Model
 *
 * Opens 32/64-bit ELF executables of either byte order and exposes
 * their program and section tables without copying the file.
 */

#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod elf;
pub mod image;

#[cfg(any(test, feature = "builder"))]
pub mod builder;

pub use elf::{ElfClass, ElfHeader, ProgramHeader, SectionFlags, SectionHeader, SectionType, SegmentFlags};
pub use image::{ElfImage, EntryIndex, ProgramMatch, Section, SectionMatch};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ElfError {
	#[error("not an ELF image")]
	NotElf,
	#[error("unsupported ELF type {0} (executable required)")]
	UnsupportedElfType(u16),
	#[error("{table} table entry size {found}, expected {expected}")]
	UnexpectedEntrySize { table: &'static str, expected: u16, found: u16 },
	#[error("section name string table not found")]
	SectionNamesNotFound,
	#[error("{0} extends past the end of the image")]
	Truncated(&'static str),
	#[error("index origin does not match the requested table")]
	WrongIndexOrigin,
	#[error("entry index {0} out of range")]
	IndexOutOfRange(u32),
	#[error("destination holds {available} bytes, entry needs {needed}")]
	DestinationTooSmall { needed: u64, available: usize },
	#[error("file size {file} exceeds memory size {mem}")]
	SectionSizeInconsistent { file: u64, mem: u64 },
	#[error("entry type 0x{0:x} is not loadable")]
	NotLoadable(u32),
}
