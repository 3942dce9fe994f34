mod blob;
mod error;
mod expression;
mod node;
mod print;
mod registry;
mod scope;
mod sequence;
mod source;
mod transform;

/// Blob handles, views, and the sequential adapter.
pub use blob::{
	BitsBlob, Blob, ConcatBlob, Endianness, FileSource, IoSource, LazyConcatBlob, MemoryBlob, OffsetBlob, RandomAccessBlob, SequentialBlob,
	SequentialOptions, SequentialSource, SubBlob, Window,
};
/// Error, error classification, and result aliases.
pub use error::{BitformError, ErrorKind, Result};
/// Expressions evaluated against a scope.
pub use expression::{BinaryOp, Expression, ExpressionRef, SubblobExpression};
/// Decoded tree values.
pub use node::{EntryVisitor, InternalNode, Node, NodeType, SimpleInternalNode};
/// Text rendering of node trees.
pub use print::{PrintFormat, PrintOptions, print_node, print_node_to_string};
/// Name to transform lookup.
pub use registry::Registry;
/// Evaluation context chain.
pub use scope::Scope;
/// Lazily decoded sequences: structs, repeats, and do-while loops.
pub use sequence::{DoWhileNode, DoWhileTransform, RepeatNode, RepeatTransform, StructField, StructNode, StructTransform};
/// Input opening with compression detection.
pub use source::{Compression, ZSTD_MAGIC, decode_bytes, load_blob, open_blob};
/// Transform contract, wrappers, compounds, and primitives.
pub use transform::{
	AsciiTransform, BarrierTransform, BitTransform, BitsTransform, Capabilities, ComposedTransform, ExpressionTransform, FixedUintTransform,
	IfTransform, InputlessTransform, InvalidTransform, KnownLengthTransform, NonzeroBooleanTransform, ParamWrapper, PartialTransform, Transform,
	TransformRef, UintBitsTransform, ZeroTerminatedTransform, primitives,
};
