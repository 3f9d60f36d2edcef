/*
 * Register-Indirect Bus (IMEM/DMEM)
 *
 * One transaction = write the data word to WDATA, then the address
 * word to ADDR. Reads write ADDR and pull RDATA. Both data registers
 * byte-swap in hardware.
 *
 * Address word layout:
 *   [19:0]  word-aligned offset inside the PE memory
 *   [23:20] PE id
 *   [27:24] byte-enable mask, bit 3 = byte 0 of the word
 *   [29:28] memory select (1 = IMEM, 2 = DMEM)
 *   [31]    write
 */

use crate::region::{IbusRegs, MemoryKind};
use hal::RegisterIo;
use hal::endian::Endian;

pub const IBUS_WRITE: u32 = 1 << 31;
pub const IBUS_MEMSEL_SHIFT: u32 = 28;
pub const IBUS_MEMSEL_IMEM: u32 = 1 << IBUS_MEMSEL_SHIFT;
pub const IBUS_MEMSEL_DMEM: u32 = 2 << IBUS_MEMSEL_SHIFT;
pub const IBUS_MEMSEL_MASK: u32 = 3 << IBUS_MEMSEL_SHIFT;
pub const IBUS_BYTE_ENABLE_SHIFT: u32 = 24;
pub const IBUS_PE_ID_SHIFT: u32 = 20;
pub const IBUS_OFFSET_MASK: u32 = 0x000F_FFFF;

/*
 * byte_enable - Byte-lane mask for @size bytes starting at @phase
 *
 * Lanes are numbered from the most significant mask bit.
 */
#[inline]
pub const fn byte_enable(phase: u32, size: u8) -> u32 {
	(((1u32 << size) - 1) << (4 - phase - size as u32)) & 0xF
}

/*
 * address_word - Build the ADDR register value for one transaction
 */
pub fn address_word(kind: MemoryKind, pe_id: u8, offset: u32, size: u8, write: bool) -> u32 {
	let memsel = match kind {
		MemoryKind::Imem => IBUS_MEMSEL_IMEM,
		_ => IBUS_MEMSEL_DMEM,
	};
	let mut addr = (offset & IBUS_OFFSET_MASK & !3)
		| memsel
		| ((pe_id as u32 & 0xF) << IBUS_PE_ID_SHIFT)
		| (byte_enable(offset & 3, size) << IBUS_BYTE_ENABLE_SHIFT);
	if write {
		addr |= IBUS_WRITE;
	}
	addr
}

/* Mask keeping the low @size bytes of a word */
#[inline]
pub(crate) const fn size_mask(size: u8) -> u32 {
	u32::MAX >> ((4 - size as u32) * 8)
}

/*
 * write - Store the low @size bytes of @val at @offset
 *
 * @offset & 3 plus @size must not exceed 4.
 */
pub fn write<R: RegisterIo>(io: &mut R, regs: &IbusRegs, kind: MemoryKind, pe_id: u8, offset: u32, val: u32, size: u8) {
	let phase = offset & 3;
	io.write32(regs.wdata, Endian::Big.u32_from_native(val << (phase * 8)));
	io.write32(regs.addr, address_word(kind, pe_id, offset, size, true));
}

/*
 * read - Load @size bytes at @offset
 *
 * The full word is always fetched; the requested bytes are shifted
 * down and masked.
 */
pub fn read<R: RegisterIo>(io: &mut R, regs: &IbusRegs, kind: MemoryKind, pe_id: u8, offset: u32, size: u8) -> u32 {
	let phase = offset & 3;
	io.write32(regs.addr, address_word(kind, pe_id, offset, size, false));
	let val = Endian::Big.u32_to_native(io.read32(regs.rdata));
	(val >> (phase * 8)) & size_mask(size)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn byte_enable_marks_requested_lanes() {
		assert_eq!(byte_enable(0, 4), 0b1111);
		assert_eq!(byte_enable(0, 1), 0b1000);
		assert_eq!(byte_enable(3, 1), 0b0001);
		assert_eq!(byte_enable(1, 2), 0b0110);
		assert_eq!(byte_enable(2, 2), 0b0011);
	}

	#[test]
	fn address_word_packs_all_fields() {
		let w = address_word(MemoryKind::Dmem, 5, 0x1_2346, 2, true);
		assert_eq!(w & IBUS_OFFSET_MASK, 0x1_2344);
		assert_eq!((w >> IBUS_PE_ID_SHIFT) & 0xF, 5);
		assert_eq!((w >> IBUS_BYTE_ENABLE_SHIFT) & 0xF, 0b0011);
		assert_eq!(w & IBUS_MEMSEL_MASK, IBUS_MEMSEL_DMEM);
		assert_ne!(w & IBUS_WRITE, 0);

		let r = address_word(MemoryKind::Imem, 0, 8, 4, false);
		assert_eq!(r & IBUS_MEMSEL_MASK, IBUS_MEMSEL_IMEM);
		assert_eq!(r & IBUS_WRITE, 0);
	}

	#[test]
	fn size_mask_covers_requested_bytes() {
		assert_eq!(size_mask(1), 0xFF);
		assert_eq!(size_mask(3), 0x00FF_FFFF);
		assert_eq!(size_mask(4), u32::MAX);
	}
}
