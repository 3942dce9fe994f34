use std::fmt;
use std::rc::Rc;

use crate::engine::{BitformError, Blob, Result};

/// Variant tag of a [`Node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
	/// Absent value.
	None,
	/// Keyed collection with lazily produced entries.
	Internal,
	/// Boolean leaf.
	Boolean,
	/// Signed 64-bit integer leaf.
	Integer,
	/// String leaf.
	String,
	/// Byte (or bit) blob.
	Blob,
}

impl NodeType {
	/// Render the node type as a stable lowercase label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::None => "none",
			Self::Internal => "internal",
			Self::Boolean => "boolean",
			Self::Integer => "integer",
			Self::String => "string",
			Self::Blob => "blob",
		}
	}
}

impl fmt::Display for NodeType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Callback receiving one `(key, value)` pair per entry of an internal node.
pub type EntryVisitor<'a> = dyn FnMut(Node, Node) -> Result<()> + 'a;

/// Behaviour of an internal (keyed) node.
///
/// Implementations may decode entries on demand; every call must yield the
/// same entries in the same order for the same instance.
pub trait InternalNode {
	/// Visit every entry exactly once, in order. Stops at the first error.
	fn for_each(&self, visit: &mut EntryVisitor<'_>) -> Result<()>;

	/// Look up the value stored under `key`.
	///
	/// The default scans [`InternalNode::for_each`] and compares keys with
	/// [`Node::equal`]; implementations with a faster native lookup override it.
	fn get(&self, key: &Node) -> Result<Node> {
		let mut found = None;
		self.for_each(&mut |entry_key, value| {
			if found.is_none() && entry_key.equal(key)? {
				found = Some(value);
			}
			Ok(())
		})?;
		found.ok_or_else(|| BitformError::NotFound { key: key.describe() })
	}
}

/// Reference-counted tree value.
///
/// Cloning a node shares the underlying data; leaves are immutable.
#[derive(Clone)]
pub enum Node {
	/// Absent value.
	None,
	/// Keyed collection.
	Internal(Rc<dyn InternalNode>),
	/// Boolean leaf.
	Boolean(bool),
	/// Integer leaf.
	Integer(i64),
	/// String leaf.
	String(Rc<str>),
	/// Blob leaf.
	Blob(Blob),
}

impl Node {
	/// Wrap an internal node implementation.
	pub fn internal(node: impl InternalNode + 'static) -> Self {
		Self::Internal(Rc::new(node))
	}

	/// Internal node with no entries.
	pub fn empty_internal() -> Self {
		Self::internal(SimpleInternalNode::new(Vec::new()))
	}

	/// String leaf from any string-like value.
	pub fn string(value: impl Into<Rc<str>>) -> Self {
		Self::String(value.into())
	}

	/// Variant tag.
	pub fn node_type(&self) -> NodeType {
		match self {
			Self::None => NodeType::None,
			Self::Internal(_) => NodeType::Internal,
			Self::Boolean(_) => NodeType::Boolean,
			Self::Integer(_) => NodeType::Integer,
			Self::String(_) => NodeType::String,
			Self::Blob(_) => NodeType::Blob,
		}
	}

	/// Boolean value, or a type mismatch.
	pub fn as_boolean(&self) -> Result<bool> {
		match self {
			Self::Boolean(value) => Ok(*value),
			other => Err(other.mismatch(NodeType::Boolean)),
		}
	}

	/// Integer value, or a type mismatch.
	pub fn as_integer(&self) -> Result<i64> {
		match self {
			Self::Integer(value) => Ok(*value),
			other => Err(other.mismatch(NodeType::Integer)),
		}
	}

	/// String value, or a type mismatch.
	pub fn as_str(&self) -> Result<&str> {
		match self {
			Self::String(value) => Ok(&**value),
			other => Err(other.mismatch(NodeType::String)),
		}
	}

	/// Blob value, or a type mismatch.
	pub fn as_blob(&self) -> Result<&Blob> {
		match self {
			Self::Blob(blob) => Ok(blob),
			other => Err(other.mismatch(NodeType::Blob)),
		}
	}

	/// Internal node implementation, or a type mismatch.
	pub fn as_internal(&self) -> Result<&Rc<dyn InternalNode>> {
		match self {
			Self::Internal(node) => Ok(node),
			other => Err(other.mismatch(NodeType::Internal)),
		}
	}

	/// Consume the node and return its blob, or a type mismatch.
	pub fn into_blob(self) -> Result<Blob> {
		match self {
			Self::Blob(blob) => Ok(blob),
			other => Err(other.mismatch(NodeType::Blob)),
		}
	}

	/// Visit every entry of an internal node.
	pub fn for_each(&self, visit: &mut EntryVisitor<'_>) -> Result<()> {
		self.as_internal()?.for_each(visit)
	}

	/// Look up `key` in an internal node.
	pub fn get(&self, key: &Node) -> Result<Node> {
		self.as_internal()?.get(key)
	}

	/// Collect every entry of an internal node in iteration order.
	pub fn entries(&self) -> Result<Vec<(Node, Node)>> {
		let mut out = Vec::new();
		self.for_each(&mut |key, value| {
			out.push((key, value));
			Ok(())
		})?;
		Ok(out)
	}

	/// Compare two nodes for equality.
	///
	/// Nodes of different types are unequal. Internal nodes are never equal,
	/// not even to themselves. Blobs compare by size and then by content.
	pub fn equal(&self, other: &Node) -> Result<bool> {
		Ok(match (self, other) {
			(Self::None, Self::None) => true,
			(Self::Boolean(a), Self::Boolean(b)) => a == b,
			(Self::Integer(a), Self::Integer(b)) => a == b,
			(Self::String(a), Self::String(b)) => a == b,
			(Self::Blob(a), Self::Blob(b)) => a.equal(b)?,
			_ => false,
		})
	}

	pub(crate) fn describe(&self) -> String {
		match self {
			Self::None => "none".to_owned(),
			Self::Internal(_) => "<internal>".to_owned(),
			Self::Boolean(value) => value.to_string(),
			Self::Integer(value) => value.to_string(),
			Self::String(value) => format!("{value:?}"),
			Self::Blob(_) => "<blob>".to_owned(),
		}
	}

	fn mismatch(&self, expected: NodeType) -> BitformError {
		BitformError::TypeMismatch {
			expected,
			got: self.node_type(),
		}
	}
}

impl fmt::Debug for Node {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::None => f.write_str("None"),
			Self::Internal(_) => f.write_str("Internal(..)"),
			Self::Boolean(value) => f.debug_tuple("Boolean").field(value).finish(),
			Self::Integer(value) => f.debug_tuple("Integer").field(value).finish(),
			Self::String(value) => f.debug_tuple("String").field(value).finish(),
			Self::Blob(_) => f.write_str("Blob(..)"),
		}
	}
}

impl From<bool> for Node {
	fn from(value: bool) -> Self {
		Self::Boolean(value)
	}
}

impl From<i64> for Node {
	fn from(value: i64) -> Self {
		Self::Integer(value)
	}
}

impl From<&str> for Node {
	fn from(value: &str) -> Self {
		Self::String(value.into())
	}
}

impl From<String> for Node {
	fn from(value: String) -> Self {
		Self::String(value.into())
	}
}

impl From<Blob> for Node {
	fn from(value: Blob) -> Self {
		Self::Blob(value)
	}
}

/// Internal node backed by an ordered array of `(key, value)` pairs.
#[derive(Debug, Clone, Default)]
pub struct SimpleInternalNode {
	entries: Vec<(Node, Node)>,
}

impl SimpleInternalNode {
	/// Build from pairs; iteration preserves their order.
	pub fn new(entries: Vec<(Node, Node)>) -> Self {
		Self { entries }
	}

	/// Number of entries.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Whether there are no entries.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

impl InternalNode for SimpleInternalNode {
	fn for_each(&self, visit: &mut EntryVisitor<'_>) -> Result<()> {
		for (key, value) in &self.entries {
			visit(key.clone(), value.clone())?;
		}
		Ok(())
	}
}
