use std::cell::OnceCell;

use super::{Capabilities, Transform, TransformRef};
use crate::engine::{BitformError, Blob, ExpressionRef, Node, Result, Scope};

/// Binds a transform's parameters from expressions evaluated in the caller's scope.
///
/// Every call evaluates the expressions afresh into a new inner scope and
/// delegates to the wrapped transform with it.
pub struct ParamWrapper {
	inner: TransformRef,
	params: Vec<ExpressionRef>,
}

impl ParamWrapper {
	/// Wrap `inner`; `params` must supply exactly `inner.num_params()` expressions.
	pub fn new(inner: TransformRef, params: Vec<ExpressionRef>) -> Result<Self> {
		if params.len() != inner.num_params() {
			return Err(BitformError::ParamCountMismatch {
				expected: inner.num_params(),
				actual: params.len(),
			});
		}
		Ok(Self { inner, params })
	}

	fn inner_scope(&self, outer: &Scope) -> Result<Scope> {
		let inner = outer.child();
		inner.alloc_params(self.params.len())?;
		for (index, param) in self.params.iter().enumerate() {
			inner.set_param(index, param.evaluate(outer)?)?;
		}
		Ok(inner)
	}
}

impl Transform for ParamWrapper {
	fn capabilities(&self) -> Capabilities {
		if self.inner.capabilities().can_prefix() { Capabilities::ALL } else { Capabilities::APPLY }
	}

	fn apply(&self, scope: &Scope, input: &Node) -> Result<Node> {
		self.inner.apply(&self.inner_scope(scope)?, input)
	}

	fn prefix_length(&self, scope: &Scope, blob: &Blob) -> Result<u64> {
		self.inner.prefix_length(&self.inner_scope(scope)?, blob)
	}

	fn prefix_apply(&self, scope: &Scope, blob: &Blob) -> Result<(Node, u64)> {
		self.inner.prefix_apply(&self.inner_scope(scope)?, blob)
	}
}

/// Runs a subtransform in a fresh barrier scope.
///
/// Scope-member lookups inside stop at the barrier, so nothing from the
/// caller leaks in except parameters. The subtransform is set after
/// construction, which lets named definitions refer to themselves.
pub struct BarrierTransform {
	inner: OnceCell<TransformRef>,
	num_params: usize,
}

impl BarrierTransform {
	/// Barrier declaring `num_params` parameters, with no subtransform yet.
	pub fn new(num_params: usize) -> Self {
		Self {
			inner: OnceCell::new(),
			num_params,
		}
	}

	/// Set the subtransform. Fails if one is already set.
	pub fn set_subtransform(&self, inner: TransformRef) -> Result<()> {
		self.inner.set(inner).map_err(|_| BitformError::SubtransformAlreadySet)
	}

	fn enter(&self, scope: &Scope, input: Node) -> Result<(&TransformRef, Scope)> {
		let inner = self.inner.get().ok_or(BitformError::SubtransformUnset)?;
		let barrier = scope.child();
		barrier.set_barrier();
		barrier.set_in_node(input);
		Ok((inner, barrier))
	}
}

impl Transform for BarrierTransform {
	fn capabilities(&self) -> Capabilities {
		Capabilities::ALL
	}

	fn num_params(&self) -> usize {
		self.num_params
	}

	fn apply(&self, scope: &Scope, input: &Node) -> Result<Node> {
		let (inner, barrier) = self.enter(scope, input.clone())?;
		inner.apply(&barrier, input)
	}

	fn prefix_length(&self, scope: &Scope, blob: &Blob) -> Result<u64> {
		let (inner, barrier) = self.enter(scope, Node::Blob(blob.clone()))?;
		inner.prefix_length(&barrier, blob)
	}

	fn prefix_apply(&self, scope: &Scope, blob: &Blob) -> Result<(Node, u64)> {
		let (inner, barrier) = self.enter(scope, Node::Blob(blob.clone()))?;
		inner.prefix_apply(&barrier, blob)
	}
}
