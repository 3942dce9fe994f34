use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::engine::{BitformError, InternalNode, Node, Result};

/// Chained evaluation context.
///
/// A scope carries positional parameters, the node currently being produced,
/// the node the active transform was applied to, and an error message slot.
/// Cloning shares the same scope; [`Scope::child`] starts a new link in the
/// chain.
#[derive(Clone, Default)]
pub struct Scope(Rc<ScopeInner>);

#[derive(Default)]
struct ScopeInner {
	outer: Option<Scope>,
	params: RefCell<Vec<Option<Node>>>,
	current: RefCell<CurrentNode>,
	in_node: RefCell<Option<Node>>,
	error: RefCell<Option<String>>,
	barrier: Cell<bool>,
}

#[derive(Default)]
enum CurrentNode {
	#[default]
	Unset,
	Owned(Node),
	/// Back-reference from a node to the scope it owns; never keeps the node alive.
	Weak(Weak<dyn InternalNode>),
}

impl Scope {
	/// Root scope with no parameters.
	pub fn new() -> Self {
		Self::default()
	}

	/// New scope whose outer link is `self`.
	pub fn child(&self) -> Self {
		Self(Rc::new(ScopeInner {
			outer: Some(self.clone()),
			..ScopeInner::default()
		}))
	}

	/// Enclosing scope, if any.
	pub fn outer(&self) -> Option<&Scope> {
		self.0.outer.as_ref()
	}

	/// Allocate `count` unset parameter slots, replacing any existing ones.
	pub fn alloc_params(&self, count: usize) -> Result<()> {
		let mut params = Vec::new();
		params.try_reserve_exact(count).map_err(|_| BitformError::out_of_memory(count.saturating_mul(size_of::<Option<Node>>())))?;
		params.resize(count, None);
		*self.0.params.borrow_mut() = params;
		Ok(())
	}

	/// Number of parameter slots allocated on this scope.
	pub fn num_params(&self) -> usize {
		self.0.params.borrow().len()
	}

	/// Store `node` in parameter slot `index`.
	pub fn set_param(&self, index: usize, node: Node) -> Result<()> {
		let mut params = self.0.params.borrow_mut();
		let count = params.len();
		let slot = params.get_mut(index).ok_or(BitformError::ParamOutOfRange { index, count })?;
		*slot = Some(node);
		Ok(())
	}

	/// Read parameter `index` from the nearest scope that has parameters.
	///
	/// Scopes with no parameter slots defer to their outer scope, so transforms
	/// that introduce no parameters see their caller's.
	pub fn get_param(&self, index: usize) -> Result<Node> {
		let mut scope = self;
		loop {
			let params = scope.0.params.borrow();
			if params.is_empty() {
				if let Some(outer) = scope.outer() {
					scope = outer;
					continue;
				}
			}
			return match params.get(index) {
				Some(Some(node)) => Ok(node.clone()),
				Some(None) => Err(BitformError::ParamUnset { index }),
				None => Err(BitformError::ParamOutOfRange { index, count: params.len() }),
			};
		}
	}

	/// Set the node currently being produced.
	pub fn set_current_node(&self, node: Node) {
		*self.0.current.borrow_mut() = CurrentNode::Owned(node);
	}

	/// Point the current node at `node` without keeping it alive.
	pub(crate) fn set_current_weak(&self, node: Weak<dyn InternalNode>) {
		*self.0.current.borrow_mut() = CurrentNode::Weak(node);
	}

	/// The node currently being produced in this scope, if set and still alive.
	pub fn current_node(&self) -> Option<Node> {
		match &*self.0.current.borrow() {
			CurrentNode::Unset => None,
			CurrentNode::Owned(node) => Some(node.clone()),
			CurrentNode::Weak(weak) => weak.upgrade().map(Node::Internal),
		}
	}

	/// Current node of this scope or the closest enclosing scope that has one.
	pub(crate) fn nearest_current_node(&self) -> Option<Node> {
		let mut scope = self;
		loop {
			if let Some(node) = scope.current_node() {
				return Some(node);
			}
			scope = scope.outer()?;
		}
	}

	/// Record the node the active transform was applied to.
	pub fn set_in_node(&self, node: Node) {
		*self.0.in_node.borrow_mut() = Some(node);
	}

	/// Input node recorded on this scope only.
	pub fn in_node(&self) -> Option<Node> {
		self.0.in_node.borrow().clone()
	}

	/// Stop scope-member lookups from walking past this scope.
	pub fn set_barrier(&self) {
		self.0.barrier.set(true);
	}

	/// Whether this scope is a barrier.
	pub fn is_barrier(&self) -> bool {
		self.0.barrier.get()
	}

	/// Record `message` as the chain's error and return it as an error value.
	///
	/// Only the first message reported anywhere in the chain is kept; it is
	/// stored on the outermost scope.
	pub fn fail(&self, message: impl Into<String>) -> BitformError {
		let message = message.into();
		let mut scope = self;
		loop {
			if scope.0.error.borrow().is_some() {
				break;
			}
			match scope.outer() {
				Some(outer) => scope = outer,
				None => {
					*scope.0.error.borrow_mut() = Some(message.clone());
					break;
				}
			}
		}
		BitformError::Reported { message }
	}

	/// First error message reported in this chain, if any.
	pub fn error(&self) -> Option<String> {
		let mut scope = self;
		loop {
			if let Some(message) = scope.0.error.borrow().as_ref() {
				return Some(message.clone());
			}
			scope = scope.outer()?;
		}
	}

	/// Whether both handles refer to the same scope.
	pub fn ptr_eq(&self, other: &Scope) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl fmt::Debug for Scope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Scope")
			.field("params", &self.num_params())
			.field("barrier", &self.is_barrier())
			.field("has_outer", &self.0.outer.is_some())
			.finish()
	}
}
