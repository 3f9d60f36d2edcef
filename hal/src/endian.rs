/*
 * Byte-Order Utility
 *
 * Stateless 16/32/64-bit conversions. ELF fields of foreign
 * endianness and the byte-swapping data registers of the PE bus
 * both go through here.
 */

#[inline]
pub const fn swap16(v: u16) -> u16 {
	v.swap_bytes()
}

#[inline]
pub const fn swap32(v: u32) -> u32 {
	v.swap_bytes()
}

#[inline]
pub const fn swap64(v: u64) -> u64 {
	v.swap_bytes()
}

/*
 * enum Endian - Byte order of an external data layout
 * @Little: least significant byte first
 * @Big: most significant byte first
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
	Little,
	Big,
}

impl Endian {
	pub const fn native() -> Self {
		if cfg!(target_endian = "big") {
			Endian::Big
		} else {
			Endian::Little
		}
	}

	pub fn is_native(self) -> bool {
		self == Self::native()
	}

	/*
	 * read_u16 / read_u32 / read_u64 - Decode a field from raw bytes
	 * @bytes: at least 2/4/8 bytes; only the leading bytes are used
	 *
	 * Callers bounds-check before decoding; short input panics like
	 * any slice index.
	 */
	pub fn read_u16(self, bytes: &[u8]) -> u16 {
		let raw = [bytes[0], bytes[1]];
		match self {
			Endian::Little => u16::from_le_bytes(raw),
			Endian::Big => u16::from_be_bytes(raw),
		}
	}

	pub fn read_u32(self, bytes: &[u8]) -> u32 {
		let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
		match self {
			Endian::Little => u32::from_le_bytes(raw),
			Endian::Big => u32::from_be_bytes(raw),
		}
	}

	pub fn read_u64(self, bytes: &[u8]) -> u64 {
		let mut raw = [0u8; 8];
		raw.copy_from_slice(&bytes[..8]);
		match self {
			Endian::Little => u64::from_le_bytes(raw),
			Endian::Big => u64::from_be_bytes(raw),
		}
	}

	/*
	 * u32_to_native - Convert a word read raw from memory of this order
	 *
	 * Applies a swap only when this order differs from the host's.
	 */
	pub fn u32_to_native(self, raw: u32) -> u32 {
		if self.is_native() { raw } else { swap32(raw) }
	}

	pub fn u32_from_native(self, v: u32) -> u32 {
		self.u32_to_native(v)
	}

	pub fn u32_bytes(self, v: u32) -> [u8; 4] {
		match self {
			Endian::Little => v.to_le_bytes(),
			Endian::Big => v.to_be_bytes(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn swaps_are_involutions() {
		assert_eq!(swap16(0x1234), 0x3412);
		assert_eq!(swap32(0x1234_5678), 0x7856_3412);
		assert_eq!(swap64(0x0102_0304_0506_0708), 0x0807_0605_0403_0201);
		assert_eq!(swap32(swap32(0xCAFE_F00D)), 0xCAFE_F00D);
	}

	#[test]
	fn reads_follow_declared_order() {
		let bytes = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
		assert_eq!(Endian::Little.read_u16(&bytes), 0x0201);
		assert_eq!(Endian::Big.read_u16(&bytes), 0x0102);
		assert_eq!(Endian::Little.read_u32(&bytes), 0x0403_0201);
		assert_eq!(Endian::Big.read_u32(&bytes), 0x0102_0304);
		assert_eq!(Endian::Big.read_u64(&bytes), 0x0102_0304_0506_0708);
	}

	#[test]
	fn raw_words_convert_to_native() {
		let raw = u32::from_ne_bytes(Endian::Big.u32_bytes(0xAABB_CCDD));
		assert_eq!(Endian::Big.u32_to_native(raw), 0xAABB_CCDD);
		let raw = u32::from_ne_bytes(Endian::Little.u32_bytes(0xAABB_CCDD));
		assert_eq!(Endian::Little.u32_to_native(raw), 0xAABB_CCDD);
	}
}
