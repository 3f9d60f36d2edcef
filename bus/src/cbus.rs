/*
 * Peripheral/Class Bus (LMEM)
 *
 * The top byte of a class-bus address is selected through the BASE
 * register; the transaction itself carries the low 24 address bits
 * and the access size. There is no byte-enable mask: the size field
 * together with the unaligned low address bits selects the lanes.
 *
 * Address word layout:
 *   [23:0]  low address bits (byte granular)
 *   [26:24] access size in bytes
 *   [31]    write
 */

use crate::ibus::size_mask;
use crate::region::CbusRegs;
use hal::RegisterIo;
use hal::endian::Endian;

pub const CBUS_BASE_MASK: u32 = 0xFF00_0000;
pub const CBUS_WRITE: u32 = 1 << 31;
pub const CBUS_SIZE_SHIFT: u32 = 24;
pub const CBUS_SIZE_MASK: u32 = 0x7 << CBUS_SIZE_SHIFT;

pub fn address_word(bus_addr: u32, size: u8, write: bool) -> u32 {
	let mut addr = (bus_addr & !CBUS_BASE_MASK) | ((size as u32) << CBUS_SIZE_SHIFT);
	if write {
		addr |= CBUS_WRITE;
	}
	addr
}

/*
 * write - Store the low @size bytes of @val at class-bus address @bus_addr
 */
pub fn write<R: RegisterIo>(io: &mut R, regs: &CbusRegs, bus_addr: u32, val: u32, size: u8) {
	let phase = bus_addr & 3;
	io.write32(regs.base, bus_addr & CBUS_BASE_MASK);
	io.write32(regs.wdata, Endian::Big.u32_from_native(val << (phase * 8)));
	io.write32(regs.addr, address_word(bus_addr, size, true));
}

/*
 * read - Load @size bytes at class-bus address @bus_addr
 */
pub fn read<R: RegisterIo>(io: &mut R, regs: &CbusRegs, bus_addr: u32, size: u8) -> u32 {
	let phase = bus_addr & 3;
	io.write32(regs.base, bus_addr & CBUS_BASE_MASK);
	io.write32(regs.addr, address_word(bus_addr, size, false));
	let val = Endian::Big.u32_to_native(io.read32(regs.rdata));
	(val >> (phase * 8)) & size_mask(size)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn address_word_keeps_low_bits_and_size() {
		let w = address_word(0xC012_3457, 1, true);
		assert_eq!(w & 0x00FF_FFFF, 0x12_3457);
		assert_eq!((w & CBUS_SIZE_MASK) >> CBUS_SIZE_SHIFT, 1);
		assert_ne!(w & CBUS_WRITE, 0);
		assert_eq!(address_word(0xC000_0000, 4, false), 4 << CBUS_SIZE_SHIFT);
	}
}
