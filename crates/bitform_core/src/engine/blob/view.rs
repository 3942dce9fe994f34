use std::cell::{Cell, OnceCell};
use std::rc::Rc;

use super::{Blob, Endianness, RandomAccessBlob, Window, clamp_read};
use crate::engine::{BitformError, ExpressionRef, Node, Result, Scope};

/// Blob over bytes held in memory.
#[derive(Debug, Clone)]
pub struct MemoryBlob {
	bytes: Rc<[u8]>,
}

impl MemoryBlob {
	/// Wrap owned or shared bytes.
	pub fn new(bytes: impl Into<Rc<[u8]>>) -> Self {
		Self { bytes: bytes.into() }
	}
}

impl RandomAccessBlob for MemoryBlob {
	fn size(&self) -> Result<u64> {
		Ok(self.bytes.len() as u64)
	}

	fn read(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
		let take = clamp_read(offset, buf.len() as u64, self.bytes.len() as u64)? as usize;
		let start = offset as usize;
		buf[..take].copy_from_slice(&self.bytes[start..start + take]);
		Ok(take)
	}
}

/// View of a blob starting at a fixed offset and running to its end.
pub struct OffsetBlob {
	base: Blob,
	start: u64,
}

impl OffsetBlob {
	/// View `base` from `start` onwards.
	pub fn new(base: Blob, start: u64) -> Self {
		Self { base, start }
	}
}

impl RandomAccessBlob for OffsetBlob {
	fn size(&self) -> Result<u64> {
		Ok(self.base.size()?.saturating_sub(self.start))
	}

	fn read(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
		self.base.read_into(self.start + offset, buf)
	}

	fn read_bits(&self, offset: u64, buf: &mut [u8], bits: u64, order: Endianness) -> Result<u64> {
		self.base.read_bits(self.start + offset, buf, bits, order)
	}

	fn window(&self) -> Option<Window<'_>> {
		Some(Window {
			base: &self.base,
			start: self.start,
			len: None,
		})
	}
}

/// Bounded view `[start, start + len)` of a blob. Reads clamp to the view.
pub struct SubBlob {
	base: Blob,
	start: u64,
	len: u64,
}

impl SubBlob {
	/// View `len` units of `base` starting at `start`.
	pub fn new(base: Blob, start: u64, len: u64) -> Self {
		Self { base, start, len }
	}
}

impl RandomAccessBlob for SubBlob {
	fn size(&self) -> Result<u64> {
		Ok(self.len)
	}

	fn read(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
		let take = clamp_read(offset, buf.len() as u64, self.len)? as usize;
		self.base.read_into(self.start + offset, &mut buf[..take])
	}

	fn read_bits(&self, offset: u64, buf: &mut [u8], bits: u64, order: Endianness) -> Result<u64> {
		let take = clamp_read(offset, bits, self.len)?;
		self.base.read_bits(self.start + offset, buf, take, order)
	}

	fn window(&self) -> Option<Window<'_>> {
		Some(Window {
			base: &self.base,
			start: self.start,
			len: Some(self.len),
		})
	}
}

/// Concatenation of two blobs.
pub struct ConcatBlob {
	head: Blob,
	head_size: Cell<Option<u64>>,
	tail: Blob,
}

impl ConcatBlob {
	/// `head` followed by `tail`.
	pub fn new(head: Blob, tail: Blob) -> Self {
		Self {
			head,
			head_size: Cell::new(None),
			tail,
		}
	}
}

impl RandomAccessBlob for ConcatBlob {
	fn size(&self) -> Result<u64> {
		Ok(cached_size(&self.head, &self.head_size)? + self.tail.size()?)
	}

	fn read(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
		concat_read(&self.head, cached_size(&self.head, &self.head_size)?, offset, buf, || Ok(self.tail.clone()))
	}

	fn read_bits(&self, offset: u64, buf: &mut [u8], bits: u64, order: Endianness) -> Result<u64> {
		concat_read_bits(&self.head, cached_size(&self.head, &self.head_size)?, offset, buf, bits, order, || {
			Ok(self.tail.clone())
		})
	}
}

/// Concatenation whose tail is produced by an expression on first use.
///
/// Reads that stay inside the head never evaluate the tail.
pub struct LazyConcatBlob {
	head: Blob,
	head_size: Cell<Option<u64>>,
	tail_expr: ExpressionRef,
	scope: Scope,
	tail: OnceCell<Blob>,
	/// Node whose members the tail may read. A struct scope only refers to
	/// its node weakly, so the blob holds it.
	_owner: Option<Node>,
}

impl LazyConcatBlob {
	/// `head` followed by the blob `tail_expr` evaluates to in `scope`.
	pub fn new(head: Blob, tail_expr: ExpressionRef, scope: Scope) -> Self {
		let owner = scope.nearest_current_node();
		Self {
			head,
			head_size: Cell::new(None),
			tail_expr,
			scope,
			tail: OnceCell::new(),
			_owner: owner,
		}
	}

	fn tail(&self) -> Result<Blob> {
		if let Some(tail) = self.tail.get() {
			return Ok(tail.clone());
		}
		let tail = self.tail_expr.evaluate(&self.scope)?.into_blob()?;
		let _ = self.tail.set(tail.clone());
		Ok(tail)
	}
}

impl RandomAccessBlob for LazyConcatBlob {
	fn size(&self) -> Result<u64> {
		Ok(cached_size(&self.head, &self.head_size)? + self.tail()?.size()?)
	}

	fn read(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
		concat_read(&self.head, cached_size(&self.head, &self.head_size)?, offset, buf, || self.tail())
	}

	fn read_bits(&self, offset: u64, buf: &mut [u8], bits: u64, order: Endianness) -> Result<u64> {
		concat_read_bits(&self.head, cached_size(&self.head, &self.head_size)?, offset, buf, bits, order, || self.tail())
	}
}

fn cached_size(blob: &Blob, cache: &Cell<Option<u64>>) -> Result<u64> {
	if let Some(size) = cache.get() {
		return Ok(size);
	}
	let size = blob.size()?;
	cache.set(Some(size));
	Ok(size)
}

fn concat_read(head: &Blob, head_size: u64, offset: u64, buf: &mut [u8], tail: impl FnOnce() -> Result<Blob>) -> Result<usize> {
	if offset >= head_size {
		return tail()?.read_into(offset - head_size, buf);
	}
	let read = head.read_into(offset, buf)?;
	if read == buf.len() {
		return Ok(read);
	}
	Ok(read + tail()?.read_into(0, &mut buf[read..])?)
}

#[allow(clippy::too_many_arguments)]
fn concat_read_bits(
	head: &Blob,
	head_size: u64,
	offset: u64,
	buf: &mut [u8],
	bits: u64,
	order: Endianness,
	tail: impl FnOnce() -> Result<Blob>,
) -> Result<u64> {
	if offset >= head_size {
		return tail()?.read_bits(offset - head_size, buf, bits, order);
	}
	let read = head.read_bits(offset, buf, bits, order)?;
	if read == bits {
		return Ok(read);
	}
	let rest = bits - read;
	let mut scratch = vec![0_u8; rest.div_ceil(8) as usize];
	let more = tail()?.read_bits(0, &mut scratch, rest, order)?;
	for bit in 0..more {
		put_bit(buf, read + bit, get_bit(&scratch, bit, order), order);
	}
	Ok(read + more)
}

/// Byte blob presented as a bit-addressed blob.
///
/// Offsets and sizes are in bits. `order` fixes which bit of each source byte
/// comes first; reads may request either packing order.
pub struct BitsBlob {
	bytes: Blob,
	order: Endianness,
}

impl BitsBlob {
	/// View `bytes` as bits in `order`.
	pub fn new(bytes: Blob, order: Endianness) -> Self {
		Self { bytes, order }
	}
}

impl RandomAccessBlob for BitsBlob {
	fn size(&self) -> Result<u64> {
		self.bytes.size()?.checked_mul(8).ok_or(BitformError::IntegerOverflow { op: "bit size" })
	}

	fn read_bits(&self, offset: u64, buf: &mut [u8], bits: u64, order: Endianness) -> Result<u64> {
		let bits = bits.min(buf.len() as u64 * 8);
		let byte_start = offset / 8;
		let byte_len = (offset % 8 + bits).div_ceil(8) as usize;
		let bytes = self.bytes.read(byte_start, byte_len)?;
		let available = ((byte_start + bytes.len() as u64) * 8).checked_sub(offset).ok_or(BitformError::ReadOutOfRange {
			offset,
			size: (byte_start + bytes.len() as u64) * 8,
		})?;
		let take = bits.min(available);
		let skip = offset % 8;
		for bit in 0..take {
			put_bit(buf, bit, get_bit(&bytes, skip + bit, self.order), order);
		}
		Ok(take)
	}
}

fn get_bit(bytes: &[u8], index: u64, order: Endianness) -> bool {
	let byte = bytes[(index / 8) as usize];
	let shift = match order {
		Endianness::Little => index % 8,
		Endianness::Big => 7 - index % 8,
	};
	(byte >> shift) & 1 == 1
}

fn put_bit(bytes: &mut [u8], index: u64, value: bool, order: Endianness) {
	let shift = match order {
		Endianness::Little => index % 8,
		Endianness::Big => 7 - index % 8,
	};
	let byte = &mut bytes[(index / 8) as usize];
	if value {
		*byte |= 1 << shift;
	} else {
		*byte &= !(1 << shift);
	}
}
