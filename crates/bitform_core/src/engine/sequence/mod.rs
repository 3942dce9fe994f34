//! Lazy sequence decoding shared by struct, repeat, and do-while nodes.
//!
//! A sequence node owns its blob and scope and caches the end offset of each
//! element as it is discovered. Decoded values are never cached; reading an
//! element twice decodes it twice.

use std::cell::{Cell, RefCell};

use tracing::{debug, trace};

use crate::engine::{BitformError, Blob, ErrorKind, Node, Result, Scope, TransformRef};

mod repeat;
mod structure;

pub use repeat::{DoWhileNode, DoWhileTransform, RepeatNode, RepeatTransform};
pub use structure::{StructField, StructNode, StructTransform};

/// Supplies the transform for each element index of a sequence.
pub(crate) trait SequenceElements {
	fn element(&self, index: usize) -> &TransformRef;
}

/// Offset cache and element materialization for one sequence node.
pub(crate) struct Sequence {
	blob: Blob,
	scope: Scope,
	ends: RefCell<Vec<u64>>,
	len: Cell<Option<usize>>,
	end_on_empty: bool,
}

impl Sequence {
	pub(crate) fn new(blob: Blob, scope: Scope, len: Option<usize>, end_on_empty: bool) -> Self {
		Self {
			blob,
			scope,
			ends: RefCell::new(Vec::new()),
			len: Cell::new(len),
			end_on_empty,
		}
	}

	pub(crate) fn blob(&self) -> &Blob {
		&self.blob
	}

	pub(crate) fn scope(&self) -> &Scope {
		&self.scope
	}

	/// Element count, once known.
	pub(crate) fn len(&self) -> Option<usize> {
		self.len.get()
	}

	pub(crate) fn set_len(&self, len: usize) {
		self.len.set(Some(len));
	}

	/// Number of element ends discovered so far.
	pub(crate) fn known_ends(&self) -> usize {
		self.ends.borrow().len()
	}

	/// Start offset of element `index`, which is the end of element `index - 1`.
	///
	/// Discovers ends strictly left to right using each element's prefix length.
	pub(crate) fn field_offset(&self, elements: &dyn SequenceElements, index: usize) -> Result<u64> {
		if index == 0 {
			return Ok(0);
		}
		loop {
			let (known, prev) = self.last_end();
			if known >= index {
				return Ok(self.ends.borrow()[index - 1]);
			}
			let view = self.view_from(prev, known)?;
			let size = elements.element(known).prefix_length(&self.scope, &view)?;
			let end = prev.checked_add(size).ok_or(BitformError::IntegerOverflow { op: "field offset" })?;
			trace!(index = known, start = prev, end, "discovered field end");
			self.record_end(known, end)?;
		}
	}

	/// Decode element `index`.
	///
	/// The next undiscovered element is decoded with `prefix_apply` so its end
	/// is cached in the same pass; elements with a known end are decoded with
	/// `apply` over their exact range.
	pub(crate) fn subtransform(&self, elements: &dyn SequenceElements, index: usize) -> Result<Node> {
		let start = self.field_offset(elements, index)?;
		let transform = elements.element(index);
		if index == self.known_ends() {
			let view = self.view_from(start, index)?;
			let (node, size) = transform.prefix_apply(&self.scope, &view)?;
			let end = start.checked_add(size).ok_or(BitformError::IntegerOverflow { op: "field offset" })?;
			trace!(index, start, end, "materialized field");
			self.record_end(index, end)?;
			return Ok(node);
		}
		let end = self.field_offset(elements, index + 1)?;
		trace!(index, start, end, "re-decoded field");
		transform.apply(&self.scope, &Node::Blob(self.blob.subblob(start, end - start)))
	}

	/// Whether the first `count` elements exactly cover the blob.
	pub(crate) fn complete(&self, elements: &dyn SequenceElements, count: usize) -> Result<bool> {
		Ok(self.field_offset(elements, count)? == self.blob.size()?)
	}

	/// Fail with [`BitformError::IncompleteSequence`] unless the first `count`
	/// elements exactly cover the blob.
	pub(crate) fn require_complete(&self, elements: &dyn SequenceElements, count: usize) -> Result<()> {
		let consumed = self.field_offset(elements, count)?;
		let size = self.blob.size()?;
		if consumed != size {
			debug!(consumed, size, "sequence does not cover its blob");
			return Err(BitformError::IncompleteSequence { consumed, size });
		}
		Ok(())
	}

	/// Bytes covered by an unbounded sequence, discovering elements until one
	/// fails to decode or the blob is exhausted. Fixes the element count.
	pub(crate) fn discover_all(&self, elements: &dyn SequenceElements) -> Result<u64> {
		if let Some(len) = self.len() {
			return self.field_offset(elements, len);
		}
		let mut consumed = 0;
		let mut count = 0;
		loop {
			match self.field_offset(elements, count + 1) {
				Ok(end) => {
					consumed = end;
					count += 1;
				}
				Err(err) if is_sequence_end(&err) => break,
				Err(err) => return Err(err),
			}
		}
		self.set_len(count);
		Ok(consumed)
	}

	fn last_end(&self) -> (usize, u64) {
		let ends = self.ends.borrow();
		(ends.len(), ends.last().copied().unwrap_or(0))
	}

	fn view_from(&self, start: u64, index: usize) -> Result<Blob> {
		let view = self.blob.offset(start);
		if self.end_on_empty && view.is_empty()? {
			self.set_len(index);
			return Err(BitformError::EndOfSequence);
		}
		Ok(view)
	}

	/// Nested lookups may already have recorded this end; keep the first.
	fn record_end(&self, index: usize, end: u64) -> Result<()> {
		let mut ends = self.ends.borrow_mut();
		if ends.len() == index {
			ends.try_reserve(1).map_err(|_| BitformError::out_of_memory(size_of::<u64>()))?;
			ends.push(end);
		}
		Ok(())
	}
}

/// Errors that end an unbounded repetition instead of failing it.
pub(crate) fn is_sequence_end(err: &BitformError) -> bool {
	matches!(err.kind(), ErrorKind::InvalidArgument | ErrorKind::NotFound)
}

#[cfg(test)]
mod tests;
