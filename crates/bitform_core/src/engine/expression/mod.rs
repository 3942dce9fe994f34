use std::fmt;
use std::rc::Rc;

use crate::engine::{BitformError, Endianness, ErrorKind, Node, Result, Scope};

/// Value producer evaluated against a scope.
///
/// Evaluation never mutates the scope's parameters or nodes.
pub trait Expression {
	/// Produce a node from `scope`.
	///
	/// The one write allowed is the chain's error message: a failed scope
	/// member lookup records it through [`Scope::fail`].
	fn evaluate(&self, scope: &Scope) -> Result<Node>;
}

/// Shared handle to an expression.
#[derive(Clone)]
pub struct ExpressionRef(Rc<dyn Expression>);

impl ExpressionRef {
	/// Wrap an expression implementation.
	pub fn new(expression: impl Expression + 'static) -> Self {
		Self(Rc::new(expression))
	}

	/// Evaluate against `scope`.
	pub fn evaluate(&self, scope: &Scope) -> Result<Node> {
		self.0.evaluate(scope)
	}

	/// Always yields `node`.
	pub fn constant(node: impl Into<Node>) -> Self {
		Self::new(ConstExpression(node.into()))
	}

	/// Parameter `index` of the nearest scope with parameters.
	pub fn param(index: usize) -> Self {
		Self::new(ParamExpression(index))
	}

	/// `lhs op rhs`.
	pub fn binary(op: BinaryOp, lhs: ExpressionRef, rhs: ExpressionRef) -> Self {
		Self::new(BinaryExpression { op, lhs, rhs })
	}

	/// The scope's current node.
	pub fn current_node() -> Self {
		Self::new(CurrentNodeExpression)
	}

	/// The innermost input node in the scope chain.
	pub fn in_node() -> Self {
		Self::new(InNodeExpression)
	}

	/// `key` looked up in the current nodes of enclosing scopes, stopping at a barrier.
	pub fn scope_member(key: impl Into<Node>) -> Self {
		Self::new(ScopeMemberExpression { key: key.into() })
	}

	/// Slice of the blob `blob` starting at `start`, running `len` units (or to
	/// the end when `len` is `None`).
	pub fn subblob(blob: ExpressionRef, start: ExpressionRef, len: Option<ExpressionRef>) -> Self {
		Self::new(SubblobExpression {
			blob,
			start,
			limit: len,
			absolute_limit: false,
			bit_order: None,
		})
	}
}

impl fmt::Debug for ExpressionRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("ExpressionRef(..)")
	}
}

/// Binary operators understood by [`ExpressionRef::binary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
	/// Integer addition.
	Add,
	/// Integer subtraction.
	Subtract,
	/// Integer multiplication.
	Multiply,
	/// Floored integer division; the divisor must be positive.
	IntegerDivide,
	/// Floored modulo; the divisor must be positive.
	Modulo,
	/// Integer `<`.
	LessThan,
	/// Integer `>`.
	GreaterThan,
	/// Integer `<=`.
	LessThanOrEqual,
	/// Integer `>=`.
	GreaterThanOrEqual,
	/// [`Node::equal`].
	Equals,
	/// Negated [`Node::equal`].
	NotEquals,
	/// Boolean and; both operands are evaluated.
	And,
	/// Boolean or; both operands are evaluated.
	Or,
	/// `lhs.get(rhs)`.
	Member,
	/// Blob concatenation; the right operand is evaluated lazily.
	Concat,
}

impl BinaryOp {
	/// Operator symbol.
	pub fn symbol(self) -> &'static str {
		match self {
			Self::Add => "+",
			Self::Subtract => "-",
			Self::Multiply => "*",
			Self::IntegerDivide => "//",
			Self::Modulo => "%",
			Self::LessThan => "<",
			Self::GreaterThan => ">",
			Self::LessThanOrEqual => "<=",
			Self::GreaterThanOrEqual => ">=",
			Self::Equals => "==",
			Self::NotEquals => "!=",
			Self::And => "&&",
			Self::Or => "||",
			Self::Member => ".",
			Self::Concat => "++",
		}
	}
}

struct ConstExpression(Node);

impl Expression for ConstExpression {
	fn evaluate(&self, _scope: &Scope) -> Result<Node> {
		Ok(self.0.clone())
	}
}

struct ParamExpression(usize);

impl Expression for ParamExpression {
	fn evaluate(&self, scope: &Scope) -> Result<Node> {
		scope.get_param(self.0)
	}
}

struct CurrentNodeExpression;

impl Expression for CurrentNodeExpression {
	fn evaluate(&self, scope: &Scope) -> Result<Node> {
		scope.current_node().ok_or(BitformError::NoCurrentNode)
	}
}

struct InNodeExpression;

impl Expression for InNodeExpression {
	fn evaluate(&self, scope: &Scope) -> Result<Node> {
		let mut link = Some(scope);
		while let Some(current) = link {
			if let Some(node) = current.in_node() {
				return Ok(node);
			}
			link = current.outer();
		}
		Err(BitformError::NoInputNode)
	}
}

struct ScopeMemberExpression {
	key: Node,
}

impl Expression for ScopeMemberExpression {
	fn evaluate(&self, scope: &Scope) -> Result<Node> {
		let mut link = Some(scope);
		while let Some(current) = link {
			if current.is_barrier() {
				break;
			}
			if let Some(node) = current.current_node() {
				match node.get(&self.key) {
					Err(err) if err.kind() == ErrorKind::NotFound => {}
					other => return other,
				}
			}
			link = current.outer();
		}
		Err(scope.fail(format!("no scope member {}", self.key.describe())))
	}
}

struct BinaryExpression {
	op: BinaryOp,
	lhs: ExpressionRef,
	rhs: ExpressionRef,
}

impl Expression for BinaryExpression {
	fn evaluate(&self, scope: &Scope) -> Result<Node> {
		let lhs = self.lhs.evaluate(scope)?;
		let rhs = match self.op {
			BinaryOp::Concat => Node::None,
			_ => self.rhs.evaluate(scope)?,
		};
		let overflow = || BitformError::IntegerOverflow { op: self.op.symbol() };
		match self.op {
			BinaryOp::Add => Ok(Node::Integer(lhs.as_integer()?.checked_add(rhs.as_integer()?).ok_or_else(overflow)?)),
			BinaryOp::Subtract => Ok(Node::Integer(lhs.as_integer()?.checked_sub(rhs.as_integer()?).ok_or_else(overflow)?)),
			BinaryOp::Multiply => Ok(Node::Integer(lhs.as_integer()?.checked_mul(rhs.as_integer()?).ok_or_else(overflow)?)),
			BinaryOp::IntegerDivide => {
				let (a, b) = division_operands(&lhs, &rhs)?;
				Ok(Node::Integer(a.div_euclid(b)))
			}
			BinaryOp::Modulo => {
				let (a, b) = division_operands(&lhs, &rhs)?;
				Ok(Node::Integer(a.rem_euclid(b)))
			}
			BinaryOp::LessThan => Ok(Node::Boolean(lhs.as_integer()? < rhs.as_integer()?)),
			BinaryOp::GreaterThan => Ok(Node::Boolean(lhs.as_integer()? > rhs.as_integer()?)),
			BinaryOp::LessThanOrEqual => Ok(Node::Boolean(lhs.as_integer()? <= rhs.as_integer()?)),
			BinaryOp::GreaterThanOrEqual => Ok(Node::Boolean(lhs.as_integer()? >= rhs.as_integer()?)),
			BinaryOp::Equals => Ok(Node::Boolean(lhs.equal(&rhs)?)),
			BinaryOp::NotEquals => Ok(Node::Boolean(!lhs.equal(&rhs)?)),
			BinaryOp::And => {
				let (a, b) = (lhs.as_boolean()?, rhs.as_boolean()?);
				Ok(Node::Boolean(a && b))
			}
			BinaryOp::Or => {
				let (a, b) = (lhs.as_boolean()?, rhs.as_boolean()?);
				Ok(Node::Boolean(a || b))
			}
			BinaryOp::Member => lhs.get(&rhs),
			BinaryOp::Concat => Ok(Node::Blob(lhs.as_blob()?.concat_lazy(self.rhs.clone(), scope.clone()))),
		}
	}
}

fn division_operands(lhs: &Node, rhs: &Node) -> Result<(i64, i64)> {
	let (a, b) = (lhs.as_integer()?, rhs.as_integer()?);
	if b <= 0 {
		return Err(BitformError::NonPositiveDivisor { divisor: b });
	}
	Ok((a, b))
}

/// Slice of a blob selected by expressions.
///
/// `limit` is a length, or an end offset when `absolute_limit` is set; without
/// a limit the slice runs to the end of the blob. `bit_order` presents the
/// slice as a bit blob.
pub struct SubblobExpression {
	/// Blob being sliced.
	pub blob: ExpressionRef,
	/// Start offset.
	pub start: ExpressionRef,
	/// Length or end offset.
	pub limit: Option<ExpressionRef>,
	/// Treat `limit` as an end offset.
	pub absolute_limit: bool,
	/// View the slice as bits in this order.
	pub bit_order: Option<Endianness>,
}

impl Expression for SubblobExpression {
	fn evaluate(&self, scope: &Scope) -> Result<Node> {
		let start = self.start.evaluate(scope)?.as_integer()?;
		let limit = match &self.limit {
			Some(limit) => {
				let limit = limit.evaluate(scope)?.as_integer()?;
				Some(if self.absolute_limit { limit.checked_sub(start).ok_or(BitformError::IntegerOverflow { op: "-" })? } else { limit })
			}
			None => None,
		};
		if start < 0 || limit.is_some_and(|len| len < 0) {
			return Err(BitformError::InvalidSlice { start, limit: limit.unwrap_or(-1) });
		}

		let blob = self.blob.evaluate(scope)?.into_blob()?;
		let slice = match limit {
			Some(len) => blob.subblob(start as u64, len as u64),
			None => blob.offset(start as u64),
		};
		Ok(Node::Blob(match self.bit_order {
			Some(order) => slice.bits(order),
			None => slice,
		}))
	}
}

#[cfg(test)]
mod tests;
