use std::fmt;
use std::rc::Rc;

use crate::engine::{BitformError, Blob, Node, Result, Scope};

mod compound;
mod primitive;
mod wrapper;

pub use compound::{ComposedTransform, ExpressionTransform, IfTransform, InputlessTransform, PartialTransform};
pub use primitive::{
	AsciiTransform, BitTransform, BitsTransform, FixedUintTransform, InvalidTransform, KnownLengthTransform, NonzeroBooleanTransform, UintBitsTransform,
	ZeroTerminatedTransform, primitives,
};
pub use wrapper::{BarrierTransform, ParamWrapper};

/// Operations a transform implements natively.
///
/// Missing operations are derived by [`TransformRef`] where possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
	/// Native [`Transform::apply`].
	pub apply: bool,
	/// Native [`Transform::prefix_length`].
	pub prefix_length: bool,
	/// Native [`Transform::prefix_apply`].
	pub prefix_apply: bool,
}

impl Capabilities {
	/// Only `apply`.
	pub const APPLY: Self = Self {
		apply: true,
		prefix_length: false,
		prefix_apply: false,
	};
	/// `apply` and `prefix_length`.
	pub const APPLY_AND_LENGTH: Self = Self {
		apply: true,
		prefix_length: true,
		prefix_apply: false,
	};
	/// Only `prefix_apply`.
	pub const PREFIX_APPLY: Self = Self {
		apply: false,
		prefix_length: false,
		prefix_apply: true,
	};
	/// Every operation.
	pub const ALL: Self = Self {
		apply: true,
		prefix_length: true,
		prefix_apply: true,
	};

	/// Whether prefix lengths can be determined, natively or derived.
	pub fn can_prefix(self) -> bool {
		self.prefix_length || self.prefix_apply
	}
}

/// Decoding rule from an input node to an output node.
///
/// Implementations must be pure: the same scope contents and input produce the
/// same output, and `prefix_apply` must report exactly the length that
/// `prefix_length` reports and that `apply` would consume.
pub trait Transform {
	/// Natively implemented operations.
	fn capabilities(&self) -> Capabilities;

	/// Number of parameters the transform reads from its scope.
	fn num_params(&self) -> usize {
		0
	}

	/// Decode `input`.
	fn apply(&self, scope: &Scope, input: &Node) -> Result<Node> {
		let _ = (scope, input);
		Err(BitformError::NotSupported { op: "apply" })
	}

	/// Bytes at the start of `blob` this transform would consume.
	fn prefix_length(&self, scope: &Scope, blob: &Blob) -> Result<u64> {
		let _ = (scope, blob);
		Err(BitformError::NotSupported { op: "prefix_length" })
	}

	/// Decode a prefix of `blob`, returning the node and the bytes consumed.
	fn prefix_apply(&self, scope: &Scope, blob: &Blob) -> Result<(Node, u64)> {
		let _ = (scope, blob);
		Err(BitformError::NotSupported { op: "prefix_apply" })
	}
}

/// Shared handle to a transform, filling in operations the transform does
/// not implement natively.
///
/// - `apply` without a native version runs `prefix_apply` and requires the
///   whole blob to be consumed.
/// - `prefix_length` without a native version runs `prefix_apply` and drops
///   the node.
/// - `prefix_apply` without a native version runs `prefix_length`, then
///   `apply` on that prefix.
#[derive(Clone)]
pub struct TransformRef(Rc<dyn Transform>);

impl TransformRef {
	/// Wrap a transform implementation.
	pub fn new(transform: impl Transform + 'static) -> Self {
		Self(Rc::new(transform))
	}

	/// Natively implemented operations.
	pub fn capabilities(&self) -> Capabilities {
		self.0.capabilities()
	}

	/// Number of parameters the transform reads.
	pub fn num_params(&self) -> usize {
		self.0.num_params()
	}

	/// Decode `input`.
	pub fn apply(&self, scope: &Scope, input: &Node) -> Result<Node> {
		let caps = self.capabilities();
		if caps.apply {
			return self.0.apply(scope, input);
		}
		if !caps.prefix_apply {
			return Err(BitformError::NotSupported { op: "apply" });
		}
		let blob = input.as_blob()?;
		let (node, consumed) = self.0.prefix_apply(scope, blob)?;
		let size = blob.size()?;
		if consumed != size {
			return Err(BitformError::SizeMismatch { expected: size, actual: consumed });
		}
		Ok(node)
	}

	/// Bytes at the start of `blob` this transform would consume.
	pub fn prefix_length(&self, scope: &Scope, blob: &Blob) -> Result<u64> {
		let caps = self.capabilities();
		if caps.prefix_length {
			return self.0.prefix_length(scope, blob);
		}
		if caps.prefix_apply {
			return self.0.prefix_apply(scope, blob).map(|(_, consumed)| consumed);
		}
		Err(BitformError::NotSupported { op: "prefix_length" })
	}

	/// Decode a prefix of `blob`, returning the node and the bytes consumed.
	pub fn prefix_apply(&self, scope: &Scope, blob: &Blob) -> Result<(Node, u64)> {
		let caps = self.capabilities();
		if caps.prefix_apply {
			return self.0.prefix_apply(scope, blob);
		}
		if !caps.prefix_length {
			return Err(BitformError::NotSupported { op: "prefix_apply" });
		}
		let consumed = self.0.prefix_length(scope, blob)?;
		let node = self.apply(scope, &Node::Blob(blob.subblob(0, consumed)))?;
		Ok((node, consumed))
	}

	/// Whether both handles share one transform.
	pub fn ptr_eq(&self, other: &TransformRef) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl<T: Transform + 'static> From<Rc<T>> for TransformRef {
	fn from(transform: Rc<T>) -> Self {
		Self(transform)
	}
}

impl fmt::Debug for TransformRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TransformRef")
			.field("capabilities", &self.capabilities())
			.field("num_params", &self.num_params())
			.finish()
	}
}

/// Read an integer parameter of a primitive.
pub(crate) fn integer_param(scope: &Scope, index: usize) -> Result<i64> {
	scope.get_param(index)?.as_integer()
}
