use super::{Capabilities, Transform, TransformRef, integer_param};
use crate::engine::{BitformError, Blob, Endianness, Node, Result, Scope};

const TERMINATOR_CHUNK: usize = 4096;

/// Every built-in primitive with its registry name, in name order.
pub fn primitives() -> Vec<(&'static str, TransformRef)> {
	vec![
		("ascii", TransformRef::new(AsciiTransform)),
		("bit", TransformRef::new(BitTransform)),
		("bits_be", TransformRef::new(BitsTransform::new(Endianness::Big))),
		("bits_le", TransformRef::new(BitsTransform::new(Endianness::Little))),
		("invalid", TransformRef::new(InvalidTransform)),
		("known_length", TransformRef::new(KnownLengthTransform)),
		("nonzero_boolean", TransformRef::new(NonzeroBooleanTransform)),
		("uint16be", TransformRef::new(FixedUintTransform::new(2, Endianness::Big))),
		("uint16le", TransformRef::new(FixedUintTransform::new(2, Endianness::Little))),
		("uint32be", TransformRef::new(FixedUintTransform::new(4, Endianness::Big))),
		("uint32le", TransformRef::new(FixedUintTransform::new(4, Endianness::Little))),
		("uint64be", TransformRef::new(FixedUintTransform::new(8, Endianness::Big))),
		("uint64le", TransformRef::new(FixedUintTransform::new(8, Endianness::Little))),
		("uint8", TransformRef::new(FixedUintTransform::new(1, Endianness::Little))),
		("uint_be", TransformRef::new(UintBitsTransform::new(Endianness::Big))),
		("uint_le", TransformRef::new(UintBitsTransform::new(Endianness::Little))),
		("zero_terminated", TransformRef::new(ZeroTerminatedTransform)),
	]
}

/// Decodes a whole blob of ASCII bytes as a string.
pub struct AsciiTransform;

impl Transform for AsciiTransform {
	fn capabilities(&self) -> Capabilities {
		Capabilities::APPLY
	}

	fn apply(&self, _scope: &Scope, input: &Node) -> Result<Node> {
		let blob = input.as_blob()?;
		let size = blob.size()?;
		let len = usize::try_from(size).map_err(|_| BitformError::out_of_memory(usize::MAX))?;
		let bytes = blob.read(0, len)?;
		if bytes.len() as u64 != size {
			return Err(BitformError::SizeMismatch {
				expected: size,
				actual: bytes.len() as u64,
			});
		}
		if let Some(pos) = bytes.iter().position(|byte| !byte.is_ascii()) {
			return Err(BitformError::NonAscii { offset: pos as u64 });
		}
		let text: String = bytes.into_iter().map(char::from).collect();
		Ok(Node::from(text))
	}
}

/// Decodes one bit of a bit blob as a boolean.
pub struct BitTransform;

impl Transform for BitTransform {
	fn capabilities(&self) -> Capabilities {
		Capabilities::PREFIX_APPLY
	}

	fn prefix_apply(&self, _scope: &Scope, blob: &Blob) -> Result<(Node, u64)> {
		let mut buf = [0_u8; 1];
		let read = blob.read_bits(0, &mut buf, 1, Endianness::Little)?;
		if read != 1 {
			return Err(BitformError::SizeMismatch { expected: 1, actual: read });
		}
		Ok((Node::Boolean(buf[0] & 1 != 0), 1))
	}
}

/// Presents a byte blob as a bit blob in a fixed bit order.
pub struct BitsTransform {
	order: Endianness,
}

impl BitsTransform {
	/// Bit view with `order` (`Big` reads the most-significant bit first).
	pub fn new(order: Endianness) -> Self {
		Self { order }
	}
}

impl Transform for BitsTransform {
	fn capabilities(&self) -> Capabilities {
		Capabilities::APPLY
	}

	fn apply(&self, _scope: &Scope, input: &Node) -> Result<Node> {
		Ok(Node::Blob(input.as_blob()?.bits(self.order)))
	}
}

/// Always fails.
pub struct InvalidTransform;

impl Transform for InvalidTransform {
	fn capabilities(&self) -> Capabilities {
		Capabilities::APPLY
	}

	fn apply(&self, _scope: &Scope, _input: &Node) -> Result<Node> {
		Err(BitformError::InvalidData)
	}
}

/// Passes a blob through, requiring its size to equal parameter 0.
pub struct KnownLengthTransform;

impl KnownLengthTransform {
	fn length(scope: &Scope) -> Result<u64> {
		let length = integer_param(scope, 0)?;
		u64::try_from(length).map_err(|_| BitformError::NegativeLength { length })
	}
}

impl Transform for KnownLengthTransform {
	fn capabilities(&self) -> Capabilities {
		Capabilities::APPLY_AND_LENGTH
	}

	fn num_params(&self) -> usize {
		1
	}

	fn apply(&self, scope: &Scope, input: &Node) -> Result<Node> {
		let expected = Self::length(scope)?;
		let actual = input.as_blob()?.size()?;
		if actual != expected {
			return Err(BitformError::SizeMismatch { expected, actual });
		}
		Ok(input.clone())
	}

	fn prefix_length(&self, scope: &Scope, _blob: &Blob) -> Result<u64> {
		Self::length(scope)
	}
}

/// Converts an integer to a boolean, `true` when nonzero.
pub struct NonzeroBooleanTransform;

impl Transform for NonzeroBooleanTransform {
	fn capabilities(&self) -> Capabilities {
		Capabilities::APPLY
	}

	fn apply(&self, _scope: &Scope, input: &Node) -> Result<Node> {
		Ok(Node::Boolean(input.as_integer()? != 0))
	}
}

/// Unsigned integer of a fixed byte width.
///
/// Values above `i64::MAX` (only possible for 8-byte widths) are rejected.
pub struct FixedUintTransform {
	width: usize,
	order: Endianness,
}

impl FixedUintTransform {
	/// Integer of `width` bytes (1 to 8) in byte order `order`.
	pub fn new(width: usize, order: Endianness) -> Self {
		Self {
			width: width.clamp(1, 8),
			order,
		}
	}
}

impl Transform for FixedUintTransform {
	fn capabilities(&self) -> Capabilities {
		Capabilities::APPLY_AND_LENGTH
	}

	fn apply(&self, _scope: &Scope, input: &Node) -> Result<Node> {
		let bytes = input.as_blob()?.read(0, self.width + 1)?;
		if bytes.len() != self.width {
			return Err(BitformError::SizeMismatch {
				expected: self.width as u64,
				actual: bytes.len() as u64,
			});
		}
		let value = match self.order {
			Endianness::Little => bytes.iter().rev().fold(0_u64, |acc, byte| (acc << 8) | u64::from(*byte)),
			Endianness::Big => bytes.iter().fold(0_u64, |acc, byte| (acc << 8) | u64::from(*byte)),
		};
		let value = i64::try_from(value).map_err(|_| BitformError::IntegerOverflow { op: "uint64" })?;
		Ok(Node::Integer(value))
	}

	fn prefix_length(&self, _scope: &Scope, _blob: &Blob) -> Result<u64> {
		Ok(self.width as u64)
	}
}

/// Unsigned integer of parameter-0 bits (0 to 63) read from a bit blob.
pub struct UintBitsTransform {
	order: Endianness,
}

impl UintBitsTransform {
	/// `Big` treats the first bit as most significant; `Little` as least.
	pub fn new(order: Endianness) -> Self {
		Self { order }
	}
}

impl Transform for UintBitsTransform {
	fn capabilities(&self) -> Capabilities {
		Capabilities::PREFIX_APPLY
	}

	fn num_params(&self) -> usize {
		1
	}

	fn prefix_apply(&self, scope: &Scope, blob: &Blob) -> Result<(Node, u64)> {
		let bits = integer_param(scope, 0)?;
		if !(0..=63).contains(&bits) {
			return Err(BitformError::InvalidBitWidth { bits });
		}
		let bits = bits as u64;
		let mut buf = [0_u8; 8];
		let read = blob.read_bits(0, &mut buf, bits, self.order)?;
		if read != bits {
			return Err(BitformError::SizeMismatch { expected: bits, actual: read });
		}
		let mut value = 0_i64;
		for index in 0..bits {
			let byte = buf[(index / 8) as usize];
			let bit = match self.order {
				Endianness::Little => (byte >> (index % 8)) & 1,
				Endianness::Big => (byte >> (7 - index % 8)) & 1,
			};
			value = match self.order {
				Endianness::Little => value | (i64::from(bit) << index),
				Endianness::Big => (value << 1) | i64::from(bit),
			};
		}
		Ok((Node::Integer(value), bits))
	}
}

/// Data terminated by a zero byte; decodes to the data without the terminator.
pub struct ZeroTerminatedTransform;

impl Transform for ZeroTerminatedTransform {
	fn capabilities(&self) -> Capabilities {
		Capabilities::APPLY_AND_LENGTH
	}

	fn apply(&self, _scope: &Scope, input: &Node) -> Result<Node> {
		let blob = input.as_blob()?;
		let size = blob.size()?;
		if size == 0 || blob.read(size - 1, 1)? != [0] {
			return Err(BitformError::MissingTerminator);
		}
		Ok(Node::Blob(blob.subblob(0, size - 1)))
	}

	fn prefix_length(&self, _scope: &Scope, blob: &Blob) -> Result<u64> {
		let mut buf = [0_u8; TERMINATOR_CHUNK];
		let mut offset = 0_u64;
		loop {
			let read = blob.read_into(offset, &mut buf)?;
			if let Some(pos) = buf[..read].iter().position(|byte| *byte == 0) {
				return Ok(offset + pos as u64 + 1);
			}
			if read < buf.len() {
				return Err(BitformError::MissingTerminator);
			}
			offset += read as u64;
		}
	}
}
