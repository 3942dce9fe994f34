use std::rc::Rc;

use tracing::debug;

use super::{Sequence, SequenceElements, is_sequence_end};
use crate::engine::{
	BitformError, Blob, Capabilities, EntryVisitor, ExpressionRef, InternalNode, Node, Result, Scope, Transform, TransformRef,
};

/// Applies one transform repeatedly, either a computed number of times or
/// until the blob runs out or an element fails to decode.
pub struct RepeatTransform {
	element: TransformRef,
	count: Option<ExpressionRef>,
}

impl RepeatTransform {
	/// Repeat `element`; `count` is evaluated in the caller's scope at each
	/// application. Without a count the repetition is unbounded.
	pub fn new(element: TransformRef, count: Option<ExpressionRef>) -> Self {
		Self { element, count }
	}

	fn instantiate(&self, scope: &Scope, blob: &Blob, prefix: bool) -> Result<RepeatNode> {
		let count = match &self.count {
			Some(expression) => {
				let count = expression.evaluate(scope)?.as_integer()?;
				Some(usize::try_from(count).map_err(|_| BitformError::InvalidCount { count })?)
			}
			None => None,
		};
		Ok(RepeatNode {
			element: self.element.clone(),
			seq: Sequence::new(blob.clone(), scope.clone(), count, count.is_none()),
			bounded: count.is_some(),
			prefix,
			_parent: scope.nearest_current_node(),
		})
	}
}

impl Transform for RepeatTransform {
	fn capabilities(&self) -> Capabilities {
		Capabilities {
			apply: true,
			prefix_length: false,
			prefix_apply: true,
		}
	}

	fn apply(&self, scope: &Scope, input: &Node) -> Result<Node> {
		let node = self.instantiate(scope, input.as_blob()?, false)?;
		node.require_complete()?;
		Ok(Node::internal(node))
	}

	fn prefix_apply(&self, scope: &Scope, blob: &Blob) -> Result<(Node, u64)> {
		let node = self.instantiate(scope, blob, true)?;
		let consumed = node.seq.discover_all(&node)?;
		Ok((Node::internal(node), consumed))
	}
}

/// Internal node produced by a [`RepeatTransform`], keyed by element index.
pub struct RepeatNode {
	element: TransformRef,
	seq: Sequence,
	bounded: bool,
	prefix: bool,
	_parent: Option<Node>,
}

impl RepeatNode {
	/// Element count, once known. Unbounded repetitions learn it on the
	/// first full iteration.
	pub fn len(&self) -> Option<usize> {
		self.seq.len()
	}

	/// Decode element `index`.
	pub fn item(&self, index: usize) -> Result<Node> {
		if self.seq.len().is_some_and(|len| index >= len) {
			return Err(BitformError::NotFound { key: index.to_string() });
		}
		self.seq.subtransform(self, index)
	}

	/// Start offset of element `index`.
	pub fn element_offset(&self, index: usize) -> Result<u64> {
		self.seq.field_offset(self, index)
	}

	fn require_complete(&self) -> Result<()> {
		match self.seq.len() {
			Some(len) => self.seq.require_complete(self, len),
			None => {
				let consumed = self.seq.discover_all(self)?;
				let size = self.seq.blob().size()?;
				if consumed != size {
					debug!(consumed, size, "repetition does not cover its blob");
					return Err(BitformError::IncompleteSequence { consumed, size });
				}
				Ok(())
			}
		}
	}
}

impl SequenceElements for RepeatNode {
	fn element(&self, _index: usize) -> &TransformRef {
		&self.element
	}
}

impl InternalNode for RepeatNode {
	fn for_each(&self, visit: &mut EntryVisitor<'_>) -> Result<()> {
		let mut index = 0;
		while self.seq.len().is_none_or(|len| index < len) {
			let value = match self.seq.subtransform(self, index) {
				Ok(value) => value,
				Err(err) if !self.bounded && is_sequence_end(&err) => {
					self.seq.set_len(index);
					break;
				}
				Err(err) => return Err(err),
			};
			let key = i64::try_from(index).map_err(|_| BitformError::IntegerOverflow { op: "repeat index" })?;
			visit(Node::Integer(key), value)?;
			index += 1;
		}
		if !self.prefix {
			self.require_complete()?;
		}
		Ok(())
	}

	fn get(&self, key: &Node) -> Result<Node> {
		let Node::Integer(index) = key else {
			return Err(BitformError::NotFound { key: key.describe() });
		};
		let index = usize::try_from(*index).map_err(|_| BitformError::NotFound { key: key.describe() })?;
		self.item(index)
	}
}

/// Applies one transform repeatedly while a condition on the latest element
/// holds. Always applies the element at least once.
pub struct DoWhileTransform {
	element: TransformRef,
	condition: ExpressionRef,
}

impl DoWhileTransform {
	/// `condition` is evaluated with each decoded element as the current node
	/// and must yield a boolean.
	pub fn new(element: TransformRef, condition: ExpressionRef) -> Self {
		Self { element, condition }
	}
}

impl Transform for DoWhileTransform {
	fn capabilities(&self) -> Capabilities {
		Capabilities::PREFIX_APPLY
	}

	fn prefix_apply(&self, scope: &Scope, blob: &Blob) -> Result<(Node, u64)> {
		let node = Rc::new(DoWhileNode {
			element: self.element.clone(),
			condition: self.condition.clone(),
			seq: Sequence::new(blob.clone(), scope.clone(), None, false),
			_parent: scope.nearest_current_node(),
		});
		node.for_each(&mut |_, _| Ok(()))?;
		let count = node.len().ok_or(BitformError::InvalidData)?;
		let consumed = node.seq.field_offset(&*node, count)?;
		Ok((Node::Internal(node), consumed))
	}
}

/// Internal node produced by a [`DoWhileTransform`], keyed by element index.
pub struct DoWhileNode {
	element: TransformRef,
	condition: ExpressionRef,
	seq: Sequence,
	_parent: Option<Node>,
}

impl DoWhileNode {
	/// Element count, once the condition has turned false.
	pub fn len(&self) -> Option<usize> {
		self.seq.len()
	}

	fn keep_going(&self, value: &Node) -> Result<bool> {
		let scope = self.seq.scope().child();
		scope.set_current_node(value.clone());
		self.condition.evaluate(&scope)?.as_boolean()
	}
}

impl SequenceElements for DoWhileNode {
	fn element(&self, _index: usize) -> &TransformRef {
		&self.element
	}
}

impl InternalNode for DoWhileNode {
	fn for_each(&self, visit: &mut EntryVisitor<'_>) -> Result<()> {
		let mut index = 0;
		loop {
			let value = self.seq.subtransform(self, index)?;
			let key = i64::try_from(index).map_err(|_| BitformError::IntegerOverflow { op: "do-while index" })?;
			visit(Node::Integer(key), value.clone())?;
			if !self.keep_going(&value)? {
				self.seq.set_len(index + 1);
				return Ok(());
			}
			index += 1;
		}
	}
}
