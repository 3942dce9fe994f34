use std::fmt;
use std::rc::Rc;

use crate::engine::{BitformError, ExpressionRef, Result, Scope};

mod sequential;
mod view;

pub use sequential::{FileSource, IoSource, SequentialBlob, SequentialOptions, SequentialSource};
pub use view::{BitsBlob, ConcatBlob, LazyConcatBlob, MemoryBlob, OffsetBlob, SubBlob};

const COMPARE_CHUNK: usize = 4096;

/// Bit order used by bit-addressed reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
	/// Least-significant bit of each byte first.
	Little,
	/// Most-significant bit of each byte first.
	Big,
}

impl Endianness {
	/// Render the bit order as a stable lowercase label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Little => "little",
			Self::Big => "big",
		}
	}
}

/// Random-access capability implemented by every blob backend.
///
/// A read starting past [`RandomAccessBlob::size`] fails; a read that overruns
/// the end returns the bytes that exist. Repeated reads of the same range must
/// return the same bytes.
pub trait RandomAccessBlob {
	/// Total size in bytes, or in bits for bit-addressed blobs.
	fn size(&self) -> Result<u64>;

	/// Copy up to `buf.len()` bytes starting at `offset`; returns the count copied.
	fn read(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
		let _ = (offset, buf);
		Err(BitformError::BlobOpUnsupported { op: "read" })
	}

	/// Copy up to `bits` bits starting at bit `offset` into `buf`, packed in `order`.
	///
	/// Returns the number of bits copied.
	fn read_bits(&self, offset: u64, buf: &mut [u8], bits: u64, order: Endianness) -> Result<u64> {
		let _ = (offset, buf, bits, order);
		Err(BitformError::BlobOpUnsupported { op: "read_bits" })
	}

	/// For views that expose a contiguous window of another blob, the window.
	fn window(&self) -> Option<Window<'_>> {
		None
	}
}

/// Contiguous window of another blob, reported by view backends.
pub struct Window<'a> {
	/// Underlying blob.
	pub base: &'a Blob,
	/// Start offset inside `base`.
	pub start: u64,
	/// Window length, or `None` when the window runs to the end of `base`.
	pub len: Option<u64>,
}

/// Shared handle to a blob backend.
#[derive(Clone)]
pub struct Blob(Rc<dyn RandomAccessBlob>);

impl Blob {
	/// Wrap a backend.
	pub fn new(inner: impl RandomAccessBlob + 'static) -> Self {
		Self(Rc::new(inner))
	}

	/// In-memory blob over owned bytes.
	pub fn from_bytes(bytes: impl Into<Rc<[u8]>>) -> Self {
		Self::new(MemoryBlob::new(bytes))
	}

	/// Random-access blob over a forward-only source with default buffering.
	pub fn sequential(source: impl SequentialSource + 'static) -> Self {
		Self::sequential_with(source, SequentialOptions::default())
	}

	/// Random-access blob over a forward-only source.
	pub fn sequential_with(source: impl SequentialSource + 'static, options: SequentialOptions) -> Self {
		Self::new(SequentialBlob::new(source, options))
	}

	/// Total size.
	pub fn size(&self) -> Result<u64> {
		self.0.size()
	}

	/// Copy bytes starting at `offset` into `buf`; returns the count copied.
	pub fn read_into(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
		self.0.read(offset, buf)
	}

	/// Read up to `len` bytes starting at `offset`.
	pub fn read(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
		let mut buf = vec![0_u8; len];
		let read = self.read_into(offset, &mut buf)?;
		buf.truncate(read);
		Ok(buf)
	}

	/// Read up to `bits` bits starting at bit `offset`, packed in `order`.
	pub fn read_bits(&self, offset: u64, buf: &mut [u8], bits: u64, order: Endianness) -> Result<u64> {
		self.0.read_bits(offset, buf, bits, order)
	}

	/// Whether the blob holds no data.
	///
	/// Probes a single byte (or bit) so sequential backends need not be
	/// consumed to the end.
	pub fn is_empty(&self) -> Result<bool> {
		let mut probe = [0_u8; 1];
		match self.read_into(0, &mut probe) {
			Ok(read) => return Ok(read == 0),
			Err(err) if matches!(err, BitformError::BlobOpUnsupported { .. }) => {}
			Err(err) => return Err(err),
		}
		match self.read_bits(0, &mut probe, 1, Endianness::Little) {
			Ok(read) => Ok(read == 0),
			Err(err) if matches!(err, BitformError::BlobOpUnsupported { .. }) => Ok(self.size()? == 0),
			Err(err) => Err(err),
		}
	}

	/// Compare size and then content, in fixed-size chunks.
	pub fn equal(&self, other: &Blob) -> Result<bool> {
		if self.ptr_eq(other) {
			return Ok(true);
		}
		let size = self.size()?;
		if size != other.size()? {
			return Ok(false);
		}
		let mut left = [0_u8; COMPARE_CHUNK];
		let mut right = [0_u8; COMPARE_CHUNK];
		let mut offset = 0_u64;
		while offset < size {
			let want = usize::try_from(size - offset).map_or(COMPARE_CHUNK, |rem| rem.min(COMPARE_CHUNK));
			let a = self.read_into(offset, &mut left[..want])?;
			let b = other.read_into(offset, &mut right[..want])?;
			if a != b || left[..a] != right[..b] {
				return Ok(false);
			}
			if a == 0 {
				break;
			}
			offset += a as u64;
		}
		Ok(true)
	}

	/// View starting at `start` and running to the end. Nested views flatten
	/// onto the underlying blob.
	pub fn offset(&self, start: u64) -> Blob {
		if start == 0 {
			return self.clone();
		}
		match self.0.window() {
			Some(Window { base, start: base_start, len: None }) => Self::new(OffsetBlob::new(base.clone(), base_start + start)),
			Some(Window { base, start: base_start, len: Some(len) }) => Self::new(SubBlob::new(base.clone(), base_start + start, len.saturating_sub(start))),
			None => Self::new(OffsetBlob::new(self.clone(), start)),
		}
	}

	/// View of `len` units starting at `start`. Nested views flatten onto the
	/// underlying blob and never extend past the enclosing view.
	pub fn subblob(&self, start: u64, len: u64) -> Blob {
		match self.0.window() {
			Some(Window { base, start: base_start, len: outer }) => {
				let len = outer.map_or(len, |outer| len.min(outer.saturating_sub(start)));
				Self::new(SubBlob::new(base.clone(), base_start + start, len))
			}
			None => Self::new(SubBlob::new(self.clone(), start, len)),
		}
	}

	/// Eager concatenation of two blobs.
	pub fn concat(&self, other: &Blob) -> Blob {
		Self::new(ConcatBlob::new(self.clone(), other.clone()))
	}

	/// Concatenation whose second half is evaluated from `tail` only when a
	/// read reaches past this blob.
	pub fn concat_lazy(&self, tail: ExpressionRef, scope: Scope) -> Blob {
		Self::new(LazyConcatBlob::new(self.clone(), tail, scope))
	}

	/// Present a byte blob as a bit-addressed blob in `order`.
	pub fn bits(&self, order: Endianness) -> Blob {
		Self::new(BitsBlob::new(self.clone(), order))
	}

	/// Whether both handles share one backend.
	pub fn ptr_eq(&self, other: &Blob) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

}

impl fmt::Debug for Blob {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Blob(..)")
	}
}

/// Clamp a `(offset, want)` request against `size`, failing past the end.
pub(crate) fn clamp_read(offset: u64, want: u64, size: u64) -> Result<u64> {
	if offset > size {
		return Err(BitformError::ReadOutOfRange { offset, size });
	}
	Ok(want.min(size - offset))
}
