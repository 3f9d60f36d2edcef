/*
 * PE Memory Bus
 *
 * Unified read/write/fill/copy access to PE memories. IMEM and DMEM
 * sit behind the register-indirect bus, LMEM behind the class bus,
 * and the external pool is plain host-visible memory. Every access of
 * arbitrary length and alignment is decomposed into word-bounded
 * transactions the hardware actually offers.
 */

#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod cbus;
pub mod ibus;
pub mod region;
pub mod split;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use region::{Access, CbusRegs, IbusRegs, MemoryKind, MemoryRegion};

use hal::RegisterIo;
use split::chunks;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BusError {
	#[error("host buffer phase {host} does not match memory offset phase {mem}")]
	AlignmentMismatch { mem: u8, host: u8 },
	#[error("access 0x{offset:x}+{len} exceeds region size 0x{size:x}")]
	OutOfRange { offset: u32, len: usize, size: u64 },
	#[error("invalid access size {0}")]
	InvalidSize(u8),
}

/*
 * struct PeBus - Access handle to one PE memory region
 * @io: register primitives
 * @region: target memory
 * @pe_id: engine id encoded in indirect-bus address words
 *
 * Offsets are region-relative.
 */
pub struct PeBus<'a, R: RegisterIo> {
	io: &'a mut R,
	region: &'a MemoryRegion,
	pe_id: u8,
}

impl<'a, R: RegisterIo> PeBus<'a, R> {
	pub fn new(io: &'a mut R, region: &'a MemoryRegion, pe_id: u8) -> Self {
		PeBus { io, region, pe_id }
	}

	pub fn region(&self) -> &MemoryRegion {
		self.region
	}

	fn check_range(&self, offset: u32, len: usize) -> Result<(), BusError> {
		let end = offset as u64 + len as u64;
		if end > self.region.size {
			return Err(BusError::OutOfRange {
				offset,
				len,
				size: self.region.size,
			});
		}
		Ok(())
	}

	/*
	 * write_word - One transaction: low @size bytes of @val at @offset
	 *
	 * The bytes must not cross a word boundary. Byte i of the run is
	 * bits [8i+7:8i] of @val.
	 */
	fn write_word(&mut self, offset: u32, val: u32, size: u8) {
		match self.region.access {
			Access::Indirect(regs) => ibus::write(self.io, &regs, self.region.kind, self.pe_id, offset, val, size),
			Access::ClassBus { regs, bus_base } => cbus::write(self.io, &regs, bus_base.wrapping_add(offset), val, size),
			Access::HostVisible { base } => {
				let addr = base + offset as usize;
				if size == 4 {
					self.io.write32(addr, u32::from_ne_bytes(val.to_le_bytes()));
				} else {
					for (i, b) in val.to_le_bytes()[..size as usize].iter().enumerate() {
						self.io.write8(addr + i, *b);
					}
				}
			}
		}
	}

	fn read_word(&mut self, offset: u32, size: u8) -> u32 {
		match self.region.access {
			Access::Indirect(regs) => ibus::read(self.io, &regs, self.region.kind, self.pe_id, offset, size),
			Access::ClassBus { regs, bus_base } => cbus::read(self.io, &regs, bus_base.wrapping_add(offset), size),
			Access::HostVisible { base } => {
				let addr = base + offset as usize;
				if size == 4 {
					u32::from_le_bytes(self.io.read32(addr).to_ne_bytes())
				} else {
					let mut bytes = [0u8; 4];
					for (i, b) in bytes[..size as usize].iter_mut().enumerate() {
						*b = self.io.read8(addr + i);
					}
					u32::from_le_bytes(bytes)
				}
			}
		}
	}

	/*
	 * write_u32 - Store the low @size (1..=4) bytes of @val at any offset
	 *
	 * An access crossing a word boundary becomes a head and a tail
	 * transaction; the head always ends word-aligned, so the split
	 * never goes deeper than that.
	 */
	pub fn write_u32(&mut self, offset: u32, val: u32, size: u8) -> Result<(), BusError> {
		if size == 0 || size > 4 {
			return Err(BusError::InvalidSize(size));
		}
		self.check_range(offset, size as usize)?;
		for c in chunks(offset, size as usize) {
			self.write_word(c.offset, val >> (c.pos * 8), c.len);
		}
		Ok(())
	}

	/*
	 * read_u32 - Load @size (1..=4) bytes at any offset
	 */
	pub fn read_u32(&mut self, offset: u32, size: u8) -> Result<u32, BusError> {
		if size == 0 || size > 4 {
			return Err(BusError::InvalidSize(size));
		}
		self.check_range(offset, size as usize)?;
		let mut val = 0u32;
		for c in chunks(offset, size as usize) {
			val |= self.read_word(c.offset, c.len) << (c.pos * 8);
		}
		Ok(val)
	}

	/*
	 * write - Store a byte run at @offset
	 */
	pub fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), BusError> {
		self.check_range(offset, data.len())?;
		for c in chunks(offset, data.len()) {
			let mut word = [0u8; 4];
			word[..c.len as usize].copy_from_slice(&data[c.pos..c.pos + c.len as usize]);
			self.write_word(c.offset, u32::from_le_bytes(word), c.len);
		}
		Ok(())
	}

	/*
	 * read - Load a byte run at @offset into @buf
	 */
	pub fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), BusError> {
		self.check_range(offset, buf.len())?;
		for c in chunks(offset, buf.len()) {
			let word = self.read_word(c.offset, c.len).to_le_bytes();
			buf[c.pos..c.pos + c.len as usize].copy_from_slice(&word[..c.len as usize]);
		}
		Ok(())
	}

	/*
	 * fill - Set @len bytes at @offset to @byte
	 *
	 * The fill word carries @byte in every lane, so every chunk
	 * writes the same value. @len == 0 is a no-op.
	 */
	pub fn fill(&mut self, offset: u32, len: usize, byte: u8) -> Result<(), BusError> {
		self.check_range(offset, len)?;
		let word = u32::from_ne_bytes([byte; 4]);
		for c in chunks(offset, len) {
			self.write_word(c.offset, word, c.len);
		}
		Ok(())
	}

	fn check_phase(offset: u32, host: *const u8) -> Result<(), BusError> {
		let mem = (offset & 3) as u8;
		let host = (host as usize & 3) as u8;
		if mem != host {
			return Err(BusError::AlignmentMismatch { mem, host });
		}
		Ok(())
	}

	/*
	 * copy_from_host - Bulk write of a host buffer
	 *
	 * Memory offset and host pointer must share the same 4-byte phase;
	 * a mismatch fails before any byte moves.
	 */
	pub fn copy_from_host(&mut self, offset: u32, src: &[u8]) -> Result<(), BusError> {
		Self::check_phase(offset, src.as_ptr())?;
		log::trace!("{:?}: copy {} bytes to 0x{:x}", self.region.kind, src.len(), offset);
		self.write(offset, src)
	}

	/*
	 * copy_to_host - Bulk read into a host buffer (same phase rule)
	 */
	pub fn copy_to_host(&mut self, offset: u32, dst: &mut [u8]) -> Result<(), BusError> {
		Self::check_phase(offset, dst.as_ptr())?;
		log::trace!("{:?}: copy {} bytes from 0x{:x}", self.region.kind, dst.len(), offset);
		self.read(offset, dst)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sim::{DDR_WINDOW, SimPfe};
	use alloc::vec;
	use alloc::vec::Vec;

	const LMEM_BUS: u32 = 0xC000_0000;

	fn regions() -> [MemoryRegion; 4] {
		[
			MemoryRegion {
				kind: MemoryKind::Imem,
				elf_base: 0x0,
				size: 64,
				access: Access::Indirect(SimPfe::ibus_regs()),
			},
			MemoryRegion {
				kind: MemoryKind::Dmem,
				elf_base: 0x2000_0000,
				size: 64,
				access: Access::Indirect(SimPfe::ibus_regs()),
			},
			MemoryRegion {
				kind: MemoryKind::Lmem,
				elf_base: 0x3000_0000,
				size: 64,
				access: Access::ClassBus {
					regs: SimPfe::cbus_regs(),
					bus_base: LMEM_BUS,
				},
			},
			MemoryRegion {
				kind: MemoryKind::Ddr,
				elf_base: 0x4000_0000,
				size: 64,
				access: Access::HostVisible { base: DDR_WINDOW },
			},
		]
	}

	fn sim() -> SimPfe {
		SimPfe::new(2, 64, 64, LMEM_BUS, 64, 64)
	}

	fn backing<'s>(sim: &'s SimPfe, kind: MemoryKind, pe: usize) -> &'s [u8] {
		match kind {
			MemoryKind::Imem => &sim.imem[pe],
			MemoryKind::Dmem => &sim.dmem[pe],
			MemoryKind::Lmem => &sim.lmem,
			MemoryKind::Ddr => &sim.ddr,
		}
	}

	#[test]
	fn unaligned_write_read_back_leaves_neighbours_zero() {
		for region in regions() {
			for offset in 0..4u32 {
				for len in 1..=9usize {
					let mut sim = sim();
					let data: Vec<u8> = (0..len as u8).map(|i| 0xA0 | i).collect();
					let mut bus = PeBus::new(&mut sim, &region, 1);
					bus.write(offset, &data).unwrap();

					let mut back = vec![0u8; len];
					bus.read(offset, &mut back).unwrap();
					assert_eq!(back, data, "{:?} offset {} len {}", region.kind, offset, len);

					let mem = backing(&sim, region.kind, 1);
					let start = offset as usize;
					assert_eq!(&mem[start..start + len], &data[..]);
					assert!(mem[..start].iter().all(|b| *b == 0));
					assert!(mem[start + len..].iter().all(|b| *b == 0));
				}
			}
		}
	}

	#[test]
	fn indirect_writes_reach_only_the_addressed_engine() {
		let region = regions()[1];
		let mut sim = sim();
		PeBus::new(&mut sim, &region, 1).write(0, &[1, 2, 3, 4]).unwrap();
		assert_eq!(&sim.dmem[1][..4], &[1, 2, 3, 4]);
		assert!(sim.dmem[0].iter().all(|b| *b == 0));
		assert!(sim.imem[1].iter().all(|b| *b == 0));
	}

	#[test]
	fn fill_sets_every_byte_in_range() {
		for region in regions() {
			for offset in 0..4u32 {
				for len in 0..=9usize {
					let mut sim = sim();
					let mut bus = PeBus::new(&mut sim, &region, 0);
					bus.fill(offset, len, 0xAB).unwrap();
					let mem = backing(&sim, region.kind, 0);
					let start = offset as usize;
					assert!(mem[start..start + len].iter().all(|b| *b == 0xAB));
					assert!(mem[..start].iter().all(|b| *b == 0));
					assert!(mem[start + len..].iter().all(|b| *b == 0));
				}
			}
		}
	}

	#[test]
	fn zero_length_fill_issues_no_transactions() {
		let region = regions()[1];
		let mut sim = sim();
		PeBus::new(&mut sim, &region, 0).fill(3, 0, 0xAB).unwrap();
		assert_eq!(sim.transactions, 0);
	}

	#[test]
	fn word_access_splits_across_boundary() {
		for region in regions() {
			let mut sim = sim();
			let mut bus = PeBus::new(&mut sim, &region, 0);
			bus.write_u32(3, 0x4433_2211, 4).unwrap();
			assert_eq!(bus.read_u32(3, 4).unwrap(), 0x4433_2211);
			assert_eq!(bus.read_u32(4, 2).unwrap(), 0x3322);
			assert_eq!(bus.read_u32(3, 1).unwrap(), 0x11);
			assert_eq!(&backing(&sim, region.kind, 0)[2..8], &[0, 0x11, 0x22, 0x33, 0x44, 0]);
		}
	}

	#[test]
	fn word_access_rejects_bad_sizes() {
		let region = regions()[1];
		let mut sim = sim();
		let mut bus = PeBus::new(&mut sim, &region, 0);
		assert_eq!(bus.write_u32(0, 1, 0), Err(BusError::InvalidSize(0)));
		assert_eq!(bus.read_u32(0, 5), Err(BusError::InvalidSize(5)));
	}

	#[test]
	fn accesses_past_region_end_fail() {
		let region = regions()[2];
		let mut sim = sim();
		let mut bus = PeBus::new(&mut sim, &region, 0);
		assert!(matches!(bus.write(60, &[0; 5]), Err(BusError::OutOfRange { .. })));
		assert!(matches!(bus.fill(64, 1, 0), Err(BusError::OutOfRange { .. })));
		assert!(bus.write(60, &[0; 4]).is_ok());
	}

	#[test]
	fn bulk_copy_requires_matching_phase() {
		let region = regions()[2];
		let buf: Vec<u8> = (1..=16).collect();
		let mut sim = sim();
		let mut bus = PeBus::new(&mut sim, &region, 0);

		let host_phase = (buf.as_ptr() as usize & 3) as u32;
		let bad = (host_phase + 1) & 3;
		assert!(matches!(
			bus.copy_from_host(bad, &buf),
			Err(BusError::AlignmentMismatch { .. })
		));
		assert_eq!(sim.transactions, 0);
		assert!(sim.lmem.iter().all(|b| *b == 0));

		let mut bus = PeBus::new(&mut sim, &region, 0);
		bus.copy_from_host(host_phase + 4, &buf).unwrap();
		let mut out = vec![0u8; 20];
		let out_phase = (out.as_ptr() as usize & 3) as u32;
		let skip = ((host_phase + 4 - out_phase) & 3) as usize;
		let start = host_phase + 4 - skip as u32;
		bus.copy_to_host(start, &mut out[..skip + 16]).unwrap();
		assert_eq!(&out[skip..skip + 16], &buf[..]);
	}
}
