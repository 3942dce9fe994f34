use thiserror::Error;

use crate::engine::NodeType;

/// Crate-local result type.
pub type Result<T> = std::result::Result<T, BitformError>;

/// Coarse error classification shared by every engine failure.
///
/// Control flow in the engine keys off these kinds rather than concrete
/// variants: a repeat with no count stops on [`ErrorKind::InvalidArgument`]
/// or [`ErrorKind::NotFound`], and struct key lookup skips unnamed fields
/// reporting [`ErrorKind::NotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	/// Malformed data, wrong node type, or violated structural constraint.
	InvalidArgument,
	/// Missing key, member, or element.
	NotFound,
	/// Operation not offered by a transform or blob.
	NotSupported,
	/// Allocation failure.
	OutOfMemory,
	/// Failure from an underlying reader.
	Io,
}

impl ErrorKind {
	/// Render the kind as a stable lowercase label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::InvalidArgument => "invalid-argument",
			Self::NotFound => "not-found",
			Self::NotSupported => "not-supported",
			Self::OutOfMemory => "out-of-memory",
			Self::Io => "io",
		}
	}
}

/// Errors produced while reading blobs, evaluating expressions, and applying transforms.
#[derive(Debug, Error)]
pub enum BitformError {
	/// Filesystem or stream IO failure.
	#[error("io: {0}")]
	Io(#[from] std::io::Error),
	/// Buffer or table growth could not be satisfied.
	#[error("out of memory while reserving {requested} bytes")]
	OutOfMemory {
		/// Bytes requested from the allocator.
		requested: usize,
	},
	/// A node had a different type than the operation requires.
	#[error("type mismatch: expected {expected}, got {got}")]
	TypeMismatch {
		/// Required node type.
		expected: NodeType,
		/// Actual node type.
		got: NodeType,
	},
	/// A read started past the end of a blob.
	#[error("read offset {offset} is past blob end {size}")]
	ReadOutOfRange {
		/// Requested start offset.
		offset: u64,
		/// Blob size.
		size: u64,
	},
	/// The blob does not implement the requested access mode.
	#[error("blob does not support {op}")]
	BlobOpUnsupported {
		/// Operation name.
		op: &'static str,
	},
	/// Decoded data did not have the exact size required.
	#[error("size mismatch: expected {expected}, got {actual}")]
	SizeMismatch {
		/// Required size.
		expected: u64,
		/// Actual size.
		actual: u64,
	},
	/// A non-prefix struct or sequence did not consume its whole input.
	#[error("sequence consumed {consumed} of {size} bytes")]
	IncompleteSequence {
		/// Bytes consumed by the fields.
		consumed: u64,
		/// Input blob size.
		size: u64,
	},
	/// An unnamed struct field decoded to something other than an internal node.
	#[error("unnamed field {index} decoded to {got}, expected internal")]
	UnnamedFieldNotInternal {
		/// Field index.
		index: usize,
		/// Actual node type.
		got: NodeType,
	},
	/// A struct field was given an empty name.
	#[error("struct field names must be absent or non-empty")]
	EmptyFieldName,
	/// A struct field transform cannot determine prefix lengths.
	#[error("struct field {index} does not support prefix decoding")]
	FieldNotPrefixable {
		/// Field index.
		index: usize,
	},
	/// A key was not present in an internal node.
	#[error("key not found: {key}")]
	NotFound {
		/// Rendered lookup key.
		key: String,
	},
	/// Repetition reached its end without another element.
	#[error("end of sequence")]
	EndOfSequence,
	/// A transform does not offer the requested operation.
	#[error("transform does not support {op}")]
	NotSupported {
		/// Operation name.
		op: &'static str,
	},
	/// Parameter index outside the allocated parameter range.
	#[error("parameter {index} out of range (count={count})")]
	ParamOutOfRange {
		/// Requested index.
		index: usize,
		/// Allocated parameter count.
		count: usize,
	},
	/// Parameter slot was allocated but never set.
	#[error("parameter {index} is unset")]
	ParamUnset {
		/// Requested index.
		index: usize,
	},
	/// A parameter wrapper was given the wrong number of expressions.
	#[error("transform takes {expected} parameters, got {actual}")]
	ParamCountMismatch {
		/// Declared parameter count.
		expected: usize,
		/// Provided expression count.
		actual: usize,
	},
	/// No scope in the chain has a current node.
	#[error("no current node in scope")]
	NoCurrentNode,
	/// No scope in the chain has an input node.
	#[error("no input node in scope")]
	NoInputNode,
	/// Division or modulo by zero or a negative divisor.
	#[error("division by non-positive value {divisor}")]
	NonPositiveDivisor {
		/// Divisor value.
		divisor: i64,
	},
	/// Integer arithmetic overflowed the signed 64-bit range.
	#[error("integer overflow in {op}")]
	IntegerOverflow {
		/// Operation name.
		op: &'static str,
	},
	/// Subblob bounds were negative or inverted.
	#[error("invalid slice start={start} limit={limit}")]
	InvalidSlice {
		/// Start offset.
		start: i64,
		/// Limit (length or absolute end).
		limit: i64,
	},
	/// A repeat count evaluated to a negative number.
	#[error("invalid repeat count {count}")]
	InvalidCount {
		/// Evaluated count.
		count: i64,
	},
	/// Bit width parameter outside the supported range.
	#[error("invalid bit width {bits}")]
	InvalidBitWidth {
		/// Requested width.
		bits: i64,
	},
	/// A length parameter was negative.
	#[error("negative length {length}")]
	NegativeLength {
		/// Evaluated length.
		length: i64,
	},
	/// Zero-terminated data had no terminator.
	#[error("missing zero terminator")]
	MissingTerminator,
	/// The invalid transform was applied, or a sentinel value was rejected.
	#[error("invalid data")]
	InvalidData,
	/// A user-reported scope error.
	#[error("{message}")]
	Reported {
		/// Rendered message.
		message: String,
	},
	/// A barrier transform was applied before its subtransform was set.
	#[error("barrier subtransform is not set")]
	SubtransformUnset,
	/// A barrier subtransform was set twice.
	#[error("barrier subtransform is already set")]
	SubtransformAlreadySet,
	/// Non-ASCII byte inside ASCII text.
	#[error("non-ascii byte at offset {offset}")]
	NonAscii {
		/// Byte offset.
		offset: u64,
	},
	/// A lookup by transform name failed.
	#[error("unknown transform: {name}")]
	UnknownTransform {
		/// Requested name.
		name: String,
	},
	/// A composed transform had no stages.
	#[error("composed transform needs at least one stage")]
	EmptyComposition,
	/// Decompressed input exceeded the in-memory load limit.
	#[error("decompressed data exceeds {limit} bytes")]
	DecompressedTooLarge {
		/// Maximum accepted size.
		limit: usize,
	},
	/// Transform text could not be parsed.
	#[error("invalid transform spec: {spec}")]
	InvalidTransformSpec {
		/// Offending text.
		spec: String,
	},
}

impl BitformError {
	/// Classify this error.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Io(_) => ErrorKind::Io,
			Self::OutOfMemory { .. } | Self::DecompressedTooLarge { .. } => ErrorKind::OutOfMemory,
			Self::NotFound { .. } | Self::EndOfSequence | Self::UnknownTransform { .. } => ErrorKind::NotFound,
			Self::NotSupported { .. } | Self::BlobOpUnsupported { .. } => ErrorKind::NotSupported,
			_ => ErrorKind::InvalidArgument,
		}
	}

	pub(crate) fn out_of_memory(requested: usize) -> Self {
		Self::OutOfMemory { requested }
	}
}
