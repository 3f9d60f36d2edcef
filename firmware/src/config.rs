/*
 * Engine and Loader Configuration
 */

use crate::FwError;
use bus::MemoryRegion;

/* Section holding the firmware's error message/file strings */
pub const ERRORS_SECTION: &str = ".errors";
/* Section holding the firmware memory-map record */
pub const MMAP_SECTION: &str = ".pfe_pe_mmap";
/* Slots in the firmware error ring */
pub const ERROR_RING_CAPACITY: u32 = 64;

/*
 * enum WriteCheck - Read-back verification of loaded sections
 * @Off: no read-back
 * @Log: compare and log mismatches, keep loading
 * @Fail: compare and fail the load on the first mismatching section
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteCheck {
	Off,
	Log,
	Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
	pub write_check: WriteCheck,
}

impl Default for LoaderConfig {
	fn default() -> Self {
		LoaderConfig {
			write_check: if cfg!(feature = "verify-writes") {
				WriteCheck::Log
			} else {
				WriteCheck::Off
			},
		}
	}
}

/*
 * struct PeConfig - Hardware binding of one processing engine
 * @id: engine id placed in every indirect-bus address word
 * @imem/@dmem/@lmem: memory windows of the engine
 * @ddr: optional host-visible external pool
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeConfig {
	pub id: u8,
	pub imem: MemoryRegion,
	pub dmem: MemoryRegion,
	pub lmem: MemoryRegion,
	pub ddr: Option<MemoryRegion>,
}

impl PeConfig {
	/* Regions in classification order */
	pub fn regions(&self) -> impl Iterator<Item = &MemoryRegion> {
		[&self.imem, &self.dmem, &self.lmem].into_iter().chain(self.ddr.as_ref())
	}

	/*
	 * validate - Regions must be pairwise disjoint in ELF space
	 */
	pub fn validate(&self) -> Result<(), FwError> {
		for (i, a) in self.regions().enumerate() {
			if self.regions().skip(i + 1).any(|b| a.overlaps(b)) {
				return Err(FwError::OverlappingRegions);
			}
		}
		Ok(())
	}
}
