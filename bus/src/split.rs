/*
 * Access Decomposition
 *
 * The bus moves at most one 32-bit word per transaction and every
 * transaction must stay inside one word. An arbitrary byte run is
 * walked as: a head fragment up to the next word boundary, whole
 * middle words, then a tail fragment.
 */

/*
 * struct Chunk - One word-bounded piece of a byte run
 * @offset: region offset of the first byte
 * @pos: index of the first byte within the run
 * @len: 1..=4 bytes, never crossing a word boundary
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
	pub offset: u32,
	pub pos: usize,
	pub len: u8,
}

impl Chunk {
	/* Byte position of the chunk within its word */
	pub fn phase(&self) -> u32 {
		self.offset & 3
	}
}

#[derive(Debug, Clone)]
pub struct Chunks {
	offset: u32,
	pos: usize,
	remaining: usize,
}

/*
 * chunks - Split [offset, offset+len) into word-bounded pieces
 *
 * Only the first chunk can start misaligned; after it every chunk
 * starts on a word boundary.
 */
pub fn chunks(offset: u32, len: usize) -> Chunks {
	Chunks {
		offset,
		pos: 0,
		remaining: len,
	}
}

/* Bytes from @offset up to the next word boundary (4 when aligned) */
pub fn bytes_to_alignment(offset: u32) -> usize {
	4 - (offset & 3) as usize
}

impl Iterator for Chunks {
	type Item = Chunk;

	fn next(&mut self) -> Option<Chunk> {
		if self.remaining == 0 {
			return None;
		}
		let len = self.remaining.min(bytes_to_alignment(self.offset));
		let chunk = Chunk {
			offset: self.offset,
			pos: self.pos,
			len: len as u8,
		};
		self.offset = self.offset.wrapping_add(len as u32);
		self.pos += len;
		self.remaining -= len;
		Some(chunk)
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		if self.remaining == 0 {
			return (0, Some(0));
		}
		let head = self.remaining.min(bytes_to_alignment(self.offset));
		let n = 1 + (self.remaining - head).div_ceil(4);
		(n, Some(n))
	}
}

impl ExactSizeIterator for Chunks {}
