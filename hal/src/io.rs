/*
 * Register I/O Primitives
 *
 * The host reaches PFE memories only through a handful of 32-bit
 * registers. Everything above this layer talks to hardware through
 * the RegisterIo trait so the bus protocols can run against either
 * real MMIO or a simulated register bank.
 */

use core::ptr;

/*
 * trait RegisterIo - Raw register read/write primitives
 *
 * Primitive transactions cannot fail. Addresses are host-side
 * register (or host-visible memory) addresses.
 */
pub trait RegisterIo {
	fn write32(&mut self, addr: usize, value: u32);
	fn read32(&mut self, addr: usize) -> u32;
	fn write8(&mut self, addr: usize, value: u8);
	fn read8(&mut self, addr: usize) -> u8;
}

/*
 * struct Mmio - Volatile memory-mapped register access
 *
 * Zero-sized; every access is a single volatile load or store at the
 * given address.
 */
#[derive(Debug)]
pub struct Mmio {
	_private: (),
}

impl Mmio {
	/*
	 * new - Create an MMIO accessor
	 *
	 * Safety: every address later passed to this accessor must be a
	 * mapped device register or memory location valid for volatile
	 * access of the requested width.
	 */
	pub const unsafe fn new() -> Self {
		Mmio { _private: () }
	}
}

impl RegisterIo for Mmio {
	#[inline]
	fn write32(&mut self, addr: usize, value: u32) {
		unsafe { ptr::write_volatile(addr as *mut u32, value) }
	}

	#[inline]
	fn read32(&mut self, addr: usize) -> u32 {
		unsafe { ptr::read_volatile(addr as *const u32) }
	}

	#[inline]
	fn write8(&mut self, addr: usize, value: u8) {
		unsafe { ptr::write_volatile(addr as *mut u8, value) }
	}

	#[inline]
	fn read8(&mut self, addr: usize) -> u8 {
		unsafe { ptr::read_volatile(addr as *const u8) }
	}
}
