/*
 * Memory Region Descriptors
 *
 * One descriptor per PE memory kind. A descriptor ties a window of
 * the firmware's ELF address space to the hardware path that reaches
 * it from the host.
 */

/*
 * enum MemoryKind - PE memory the region maps
 * @Imem: per-PE instruction memory
 * @Dmem: per-PE data memory
 * @Lmem: shared cluster memory
 * @Ddr: external pool, directly addressable by the host
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryKind {
	Imem,
	Dmem,
	Lmem,
	Ddr,
}

/* Register-indirect port (IMEM/DMEM): address, write-data, read-data */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IbusRegs {
	pub addr: usize,
	pub wdata: usize,
	pub rdata: usize,
}

/* Class-bus port (LMEM): base-select, address+size, write-data, read-data */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CbusRegs {
	pub base: usize,
	pub addr: usize,
	pub wdata: usize,
	pub rdata: usize,
}

/*
 * enum Access - How the host reaches a region
 * @Indirect: register-indirect transactions through an IBUS port
 * @ClassBus: peripheral/class-bus transactions; @bus_base is the
 *            class-bus address of region offset 0
 * @HostVisible: plain loads/stores at @base
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
	Indirect(IbusRegs),
	ClassBus { regs: CbusRegs, bus_base: u32 },
	HostVisible { base: usize },
}

/*
 * struct MemoryRegion - ELF-space window of one PE memory
 * @kind: memory kind
 * @elf_base: first ELF address of the window
 * @size: window size in bytes
 * @access: host access path
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRegion {
	pub kind: MemoryKind,
	pub elf_base: u64,
	pub size: u64,
	pub access: Access,
}

impl MemoryRegion {
	/*
	 * contains - Whether [addr, addr+len) lies fully inside the window
	 */
	pub fn contains(&self, addr: u64, len: u64) -> bool {
		let Some(end) = addr.checked_add(len) else {
			return false;
		};
		addr >= self.elf_base && end <= self.elf_base + self.size
	}

	/* Region-relative offset of an ELF address already known to be inside */
	pub fn offset_of(&self, addr: u64) -> u32 {
		(addr - self.elf_base) as u32
	}

	/*
	 * overlaps - Whether two windows share any ELF address
	 */
	pub fn overlaps(&self, other: &MemoryRegion) -> bool {
		self.elf_base < other.elf_base + other.size && other.elf_base < self.elf_base + self.size
	}
}
