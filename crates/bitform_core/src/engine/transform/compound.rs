use super::{Capabilities, Transform, TransformRef};
use crate::engine::{BitformError, Blob, ExpressionRef, Node, Result, Scope};

/// Evaluates an expression with the input recorded as the scope's input node.
pub struct ExpressionTransform {
	expression: ExpressionRef,
}

impl ExpressionTransform {
	/// Transform producing `expression`'s value.
	pub fn new(expression: ExpressionRef) -> Self {
		Self { expression }
	}
}

impl Transform for ExpressionTransform {
	fn capabilities(&self) -> Capabilities {
		Capabilities::APPLY
	}

	fn apply(&self, scope: &Scope, input: &Node) -> Result<Node> {
		let inner = scope.child();
		inner.set_in_node(input.clone());
		self.expression.evaluate(&inner)
	}
}

/// Consumes no input and yields an expression's value.
pub struct InputlessTransform {
	expression: ExpressionRef,
}

impl InputlessTransform {
	/// Transform producing `expression`'s value from zero bytes.
	pub fn new(expression: ExpressionRef) -> Self {
		Self { expression }
	}
}

impl Transform for InputlessTransform {
	fn capabilities(&self) -> Capabilities {
		Capabilities {
			apply: false,
			prefix_length: true,
			prefix_apply: true,
		}
	}

	fn prefix_length(&self, _scope: &Scope, _blob: &Blob) -> Result<u64> {
		Ok(0)
	}

	fn prefix_apply(&self, scope: &Scope, _blob: &Blob) -> Result<(Node, u64)> {
		Ok((self.expression.evaluate(scope)?, 0))
	}
}

/// Applies a chain of transforms, last to first.
///
/// The last transform reads the input, so it alone decides prefix lengths.
pub struct ComposedTransform {
	stages: Vec<TransformRef>,
}

impl ComposedTransform {
	/// Compose `stages`; `stages[0]` runs last.
	pub fn new(stages: Vec<TransformRef>) -> Result<Self> {
		if stages.is_empty() {
			return Err(BitformError::EmptyComposition);
		}
		Ok(Self { stages })
	}

	fn finish(&self, scope: &Scope, mut node: Node) -> Result<Node> {
		for stage in self.stages.iter().rev().skip(1) {
			node = stage.apply(scope, &node)?;
		}
		Ok(node)
	}

	fn first_stage(&self) -> &TransformRef {
		&self.stages[self.stages.len() - 1]
	}
}

impl Transform for ComposedTransform {
	fn capabilities(&self) -> Capabilities {
		if self.first_stage().capabilities().can_prefix() { Capabilities::ALL } else { Capabilities::APPLY }
	}

	fn num_params(&self) -> usize {
		self.stages.iter().map(TransformRef::num_params).max().unwrap_or(0)
	}

	fn apply(&self, scope: &Scope, input: &Node) -> Result<Node> {
		let node = self.first_stage().apply(scope, input)?;
		self.finish(scope, node)
	}

	fn prefix_length(&self, scope: &Scope, blob: &Blob) -> Result<u64> {
		self.first_stage().prefix_length(scope, blob)
	}

	fn prefix_apply(&self, scope: &Scope, blob: &Blob) -> Result<(Node, u64)> {
		let (node, consumed) = self.first_stage().prefix_apply(scope, blob)?;
		Ok((self.finish(scope, node)?, consumed))
	}
}

/// Chooses between two transforms with a boolean expression.
pub struct IfTransform {
	condition: ExpressionRef,
	when_true: TransformRef,
	when_false: TransformRef,
}

impl IfTransform {
	/// `when_true` if `condition` evaluates to `true`, else `when_false`.
	pub fn new(condition: ExpressionRef, when_true: TransformRef, when_false: TransformRef) -> Self {
		Self {
			condition,
			when_true,
			when_false,
		}
	}

	fn choose(&self, scope: &Scope) -> Result<&TransformRef> {
		Ok(if self.condition.evaluate(scope)?.as_boolean()? { &self.when_true } else { &self.when_false })
	}
}

impl Transform for IfTransform {
	fn capabilities(&self) -> Capabilities {
		Capabilities::ALL
	}

	fn apply(&self, scope: &Scope, input: &Node) -> Result<Node> {
		self.choose(scope)?.apply(scope, input)
	}

	fn prefix_length(&self, scope: &Scope, blob: &Blob) -> Result<u64> {
		self.choose(scope)?.prefix_length(scope, blob)
	}

	fn prefix_apply(&self, scope: &Scope, blob: &Blob) -> Result<(Node, u64)> {
		self.choose(scope)?.prefix_apply(scope, blob)
	}
}

/// Decodes a prefix of a blob and ignores the rest.
pub struct PartialTransform {
	inner: TransformRef,
}

impl PartialTransform {
	/// Wrap `inner`, which must be able to decode prefixes.
	pub fn new(inner: TransformRef) -> Self {
		Self { inner }
	}
}

impl Transform for PartialTransform {
	fn capabilities(&self) -> Capabilities {
		Capabilities::APPLY
	}

	fn num_params(&self) -> usize {
		self.inner.num_params()
	}

	fn apply(&self, scope: &Scope, input: &Node) -> Result<Node> {
		let (node, _) = self.inner.prefix_apply(scope, input.as_blob()?)?;
		Ok(node)
	}
}
