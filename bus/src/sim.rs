/*
 * Simulated PFE Register Bank
 *
 * Models the host-visible side of the PFE closely enough to run the
 * bus protocols on a development host: one register-indirect port
 * serving IMEM/DMEM of every PE, one class-bus port backed by LMEM,
 * and a host-visible external memory window.
 */

use crate::cbus::{CBUS_BASE_MASK, CBUS_SIZE_MASK, CBUS_SIZE_SHIFT, CBUS_WRITE};
use crate::ibus::{
	IBUS_BYTE_ENABLE_SHIFT, IBUS_MEMSEL_IMEM, IBUS_MEMSEL_MASK, IBUS_OFFSET_MASK, IBUS_PE_ID_SHIFT, IBUS_WRITE,
};
use crate::region::{CbusRegs, IbusRegs};
use alloc::vec;
use alloc::vec::Vec;
use hal::RegisterIo;
use hal::endian::Endian;

/* Simulated register map */
pub const IBUS_ADDR: usize = 0x1000_0000;
pub const IBUS_WDATA: usize = 0x1000_0004;
pub const IBUS_RDATA: usize = 0x1000_0008;
pub const CBUS_BASE: usize = 0x1000_0100;
pub const CBUS_ADDR: usize = 0x1000_0104;
pub const CBUS_WDATA: usize = 0x1000_0108;
pub const CBUS_RDATA: usize = 0x1000_010C;
pub const DDR_WINDOW: usize = 0x8000_0000;

/*
 * struct SimPfe - Register bank plus backing memories
 * @imem/@dmem: per-PE memories, indexed by PE id
 * @lmem: class-bus memory starting at @lmem_base
 * @ddr: host-visible memory at DDR_WINDOW
 * @transactions: number of ADDR register writes seen
 */
pub struct SimPfe {
	pub imem: Vec<Vec<u8>>,
	pub dmem: Vec<Vec<u8>>,
	pub lmem: Vec<u8>,
	pub lmem_base: u32,
	pub ddr: Vec<u8>,
	pub transactions: usize,
	ibus_wdata: u32,
	ibus_rdata: u32,
	cbus_base: u32,
	cbus_wdata: u32,
	cbus_rdata: u32,
}

impl SimPfe {
	pub fn new(engines: usize, imem_size: usize, dmem_size: usize, lmem_base: u32, lmem_size: usize, ddr_size: usize) -> Self {
		SimPfe {
			imem: vec![vec![0; imem_size]; engines],
			dmem: vec![vec![0; dmem_size]; engines],
			lmem: vec![0; lmem_size],
			lmem_base,
			ddr: vec![0; ddr_size],
			transactions: 0,
			ibus_wdata: 0,
			ibus_rdata: 0,
			cbus_base: 0,
			cbus_wdata: 0,
			cbus_rdata: 0,
		}
	}

	pub const fn ibus_regs() -> IbusRegs {
		IbusRegs {
			addr: IBUS_ADDR,
			wdata: IBUS_WDATA,
			rdata: IBUS_RDATA,
		}
	}

	pub const fn cbus_regs() -> CbusRegs {
		CbusRegs {
			base: CBUS_BASE,
			addr: CBUS_ADDR,
			wdata: CBUS_WDATA,
			rdata: CBUS_RDATA,
		}
	}

	fn ibus_transaction(&mut self, addr: u32) {
		let pe = ((addr >> IBUS_PE_ID_SHIFT) & 0xF) as usize;
		let offset = (addr & IBUS_OFFSET_MASK) as usize;
		let enable = (addr >> IBUS_BYTE_ENABLE_SHIFT) & 0xF;
		let mem = if addr & IBUS_MEMSEL_MASK == IBUS_MEMSEL_IMEM {
			self.imem.get_mut(pe)
		} else {
			self.dmem.get_mut(pe)
		};
		let Some(mem) = mem else {
			return;
		};
		if offset + 4 > mem.len() {
			return;
		}

		if addr & IBUS_WRITE != 0 {
			let data = Endian::Big.u32_to_native(self.ibus_wdata).to_le_bytes();
			for k in 0..4 {
				if enable & (1 << (3 - k)) != 0 {
					mem[offset + k] = data[k];
				}
			}
		} else {
			let data = u32::from_le_bytes([mem[offset], mem[offset + 1], mem[offset + 2], mem[offset + 3]]);
			self.ibus_rdata = Endian::Big.u32_from_native(data);
		}
	}

	fn lmem_index(&self, bus_addr: u32) -> Option<usize> {
		let idx = bus_addr.checked_sub(self.lmem_base)? as usize;
		(idx < self.lmem.len()).then_some(idx)
	}

	fn cbus_transaction(&mut self, addr: u32) {
		let bus_addr = (self.cbus_base & CBUS_BASE_MASK) | (addr & !CBUS_BASE_MASK & 0x00FF_FFFF);
		let size = (addr & CBUS_SIZE_MASK) >> CBUS_SIZE_SHIFT;
		let phase = bus_addr & 3;

		if addr & CBUS_WRITE != 0 {
			let data = Endian::Big.u32_to_native(self.cbus_wdata).to_le_bytes();
			for i in 0..size {
				let lane = (phase + i) as usize;
				if lane >= 4 {
					break;
				}
				if let Some(idx) = self.lmem_index(bus_addr + i) {
					self.lmem[idx] = data[lane];
				}
			}
		} else {
			let aligned = bus_addr & !3;
			let mut word = [0u8; 4];
			for (k, b) in word.iter_mut().enumerate() {
				if let Some(idx) = self.lmem_index(aligned + k as u32) {
					*b = self.lmem[idx];
				}
			}
			self.cbus_rdata = Endian::Big.u32_from_native(u32::from_le_bytes(word));
		}
	}

	fn ddr_index(&self, addr: usize, width: usize) -> Option<usize> {
		let idx = addr.checked_sub(DDR_WINDOW)?;
		(idx + width <= self.ddr.len()).then_some(idx)
	}
}

impl RegisterIo for SimPfe {
	fn write32(&mut self, addr: usize, value: u32) {
		match addr {
			IBUS_WDATA => self.ibus_wdata = value,
			IBUS_ADDR => {
				self.transactions += 1;
				self.ibus_transaction(value);
			}
			CBUS_BASE => self.cbus_base = value,
			CBUS_WDATA => self.cbus_wdata = value,
			CBUS_ADDR => {
				self.transactions += 1;
				self.cbus_transaction(value);
			}
			_ => {
				if let Some(idx) = self.ddr_index(addr, 4) {
					self.ddr[idx..idx + 4].copy_from_slice(&value.to_ne_bytes());
				}
			}
		}
	}

	fn read32(&mut self, addr: usize) -> u32 {
		match addr {
			IBUS_RDATA => self.ibus_rdata,
			CBUS_RDATA => self.cbus_rdata,
			_ => match self.ddr_index(addr, 4) {
				Some(idx) => u32::from_ne_bytes([self.ddr[idx], self.ddr[idx + 1], self.ddr[idx + 2], self.ddr[idx + 3]]),
				None => 0,
			},
		}
	}

	fn write8(&mut self, addr: usize, value: u8) {
		if let Some(idx) = self.ddr_index(addr, 1) {
			self.ddr[idx] = value;
		}
	}

	fn read8(&mut self, addr: usize) -> u8 {
		self.ddr_index(addr, 1).map_or(0, |idx| self.ddr[idx])
	}
}
