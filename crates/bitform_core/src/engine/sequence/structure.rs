use std::rc::{Rc, Weak};

use tracing::debug;

use super::{Sequence, SequenceElements};
use crate::engine::{
	BitformError, Blob, Capabilities, EntryVisitor, ErrorKind, InternalNode, Node, Result, Scope, Transform, TransformRef,
};

/// One field of a [`StructTransform`].
#[derive(Debug, Clone)]
pub struct StructField {
	/// Key under which the value appears; `None` splices the field's own
	/// entries into the struct.
	pub name: Option<Rc<str>>,
	/// Decoder for the field. Must be able to determine prefix lengths.
	pub transform: TransformRef,
}

impl StructField {
	/// Field stored under `name`.
	pub fn named(name: impl Into<Rc<str>>, transform: TransformRef) -> Self {
		Self {
			name: Some(name.into()),
			transform,
		}
	}

	/// Field whose internal-node result is flattened into the struct.
	pub fn unnamed(transform: TransformRef) -> Self {
		Self { name: None, transform }
	}
}

/// Decodes consecutive fields of one blob into a lazily evaluated internal node.
pub struct StructTransform {
	fields: Rc<[StructField]>,
}

impl StructTransform {
	/// Build from ordered fields.
	///
	/// Names must be absent or non-empty, and every field transform must be
	/// able to report prefix lengths.
	pub fn new(fields: Vec<StructField>) -> Result<Self> {
		for (index, field) in fields.iter().enumerate() {
			if field.name.as_deref().is_some_and(str::is_empty) {
				return Err(BitformError::EmptyFieldName);
			}
			if !field.transform.capabilities().can_prefix() {
				return Err(BitformError::FieldNotPrefixable { index });
			}
		}
		Ok(Self { fields: fields.into() })
	}

	/// Number of fields.
	pub fn len(&self) -> usize {
		self.fields.len()
	}

	/// Whether the struct has no fields.
	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	/// Create a struct node over `blob` without decoding anything.
	///
	/// In prefix mode the node may cover only the start of `blob`; otherwise
	/// iteration requires the fields to cover it exactly.
	pub fn instantiate(&self, scope: &Scope, blob: &Blob, prefix: bool) -> Rc<StructNode> {
		let inner = scope.child();
		let parent = scope.nearest_current_node();
		let fields = self.fields.clone();
		let blob = blob.clone();
		Rc::new_cyclic(|weak: &Weak<StructNode>| {
			let current: Weak<dyn InternalNode> = weak.clone();
			inner.set_current_weak(current);
			StructNode {
				fields,
				seq: Sequence::new(blob, inner, None, false),
				prefix,
				_parent: parent,
			}
		})
	}
}

impl Transform for StructTransform {
	fn capabilities(&self) -> Capabilities {
		Capabilities::ALL
	}

	fn apply(&self, scope: &Scope, input: &Node) -> Result<Node> {
		let node = self.instantiate(scope, input.as_blob()?, false);
		node.seq.require_complete(&*node, node.len())?;
		Ok(Node::Internal(node))
	}

	fn prefix_length(&self, scope: &Scope, blob: &Blob) -> Result<u64> {
		let node = self.instantiate(scope, blob, true);
		node.field_offset(node.len())
	}

	fn prefix_apply(&self, scope: &Scope, blob: &Blob) -> Result<(Node, u64)> {
		let node = self.instantiate(scope, blob, true);
		let consumed = node.field_offset(node.len())?;
		Ok((Node::Internal(node), consumed))
	}
}

/// Internal node produced by a [`StructTransform`].
///
/// Field ends are discovered on demand and cached; field values are decoded
/// on every access.
pub struct StructNode {
	fields: Rc<[StructField]>,
	seq: Sequence,
	prefix: bool,
	/// Node of the enclosing scope, kept alive for lazy member lookups.
	/// Parents never hold their children, so this cannot form a cycle.
	_parent: Option<Node>,
}

impl StructNode {
	/// Number of fields.
	pub fn len(&self) -> usize {
		self.fields.len()
	}

	/// Whether the struct has no fields.
	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	/// Start offset of field `index`; `len()` yields the end of the last field.
	///
	/// # Panics
	///
	/// Panics if `index > len()`.
	pub fn field_offset(&self, index: usize) -> Result<u64> {
		assert!(index <= self.fields.len(), "field index {index} out of range for {} fields", self.fields.len());
		self.seq.field_offset(self, index)
	}

	/// Decode field `index`.
	///
	/// # Panics
	///
	/// Panics if `index >= len()`.
	pub fn field(&self, index: usize) -> Result<Node> {
		assert!(index < self.fields.len(), "field index {index} out of range for {} fields", self.fields.len());
		self.seq.subtransform(self, index)
	}

	/// Whether the fields exactly cover the blob.
	pub fn complete(&self) -> Result<bool> {
		self.seq.complete(self, self.fields.len())
	}

	/// Scope the fields are decoded in; its current node is this struct.
	pub fn scope(&self) -> &Scope {
		self.seq.scope()
	}

	fn unnamed_value(&self, index: usize) -> Result<Rc<dyn InternalNode>> {
		match self.field(index)? {
			Node::Internal(node) => Ok(node),
			other => Err(BitformError::UnnamedFieldNotInternal {
				index,
				got: other.node_type(),
			}),
		}
	}
}

impl SequenceElements for StructNode {
	fn element(&self, index: usize) -> &TransformRef {
		&self.fields[index].transform
	}
}

impl InternalNode for StructNode {
	fn for_each(&self, visit: &mut EntryVisitor<'_>) -> Result<()> {
		for (index, field) in self.fields.iter().enumerate() {
			match &field.name {
				Some(name) => visit(Node::String(name.clone()), self.field(index)?)?,
				None => self.unnamed_value(index)?.for_each(visit)?,
			}
		}
		if !self.prefix {
			self.seq.require_complete(self, self.fields.len())?;
		}
		Ok(())
	}

	fn get(&self, key: &Node) -> Result<Node> {
		let Node::String(wanted) = key else {
			return Err(BitformError::NotFound { key: key.describe() });
		};
		if let Some(index) = self.fields.iter().position(|field| field.name.as_deref() == Some(&**wanted)) {
			return self.field(index);
		}
		for (index, field) in self.fields.iter().enumerate() {
			if field.name.is_some() {
				continue;
			}
			match self.unnamed_value(index)?.get(key) {
				Err(err) if err.kind() == ErrorKind::NotFound => {}
				other => return other,
			}
		}
		debug!(key = %wanted, "struct has no such member");
		Err(BitformError::NotFound { key: key.describe() })
	}
}
