use std::collections::BTreeMap;

use crate::engine::{BitformError, Result, TransformRef, primitives};

/// Name to transform map used to resolve transform references.
///
/// Registries are built explicitly and passed to whatever resolves names;
/// there is no process-wide table.
#[derive(Debug, Clone, Default)]
pub struct Registry {
	transforms: BTreeMap<String, TransformRef>,
}

impl Registry {
	/// Empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registry holding every built-in primitive.
	pub fn with_primitives() -> Self {
		let mut registry = Self::new();
		for (name, transform) in primitives() {
			registry.register(name, transform);
		}
		registry
	}

	/// Add or replace `name`, returning the previous transform.
	pub fn register(&mut self, name: impl Into<String>, transform: TransformRef) -> Option<TransformRef> {
		self.transforms.insert(name.into(), transform)
	}

	/// Look up `name`.
	pub fn get(&self, name: &str) -> Result<TransformRef> {
		self.transforms
			.get(name)
			.cloned()
			.ok_or_else(|| BitformError::UnknownTransform { name: name.to_owned() })
	}

	/// Whether `name` is registered.
	pub fn contains(&self, name: &str) -> bool {
		self.transforms.contains_key(name)
	}

	/// Registered names and transforms in name order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &TransformRef)> {
		self.transforms.iter().map(|(name, transform)| (name.as_str(), transform))
	}

	/// Number of registered transforms.
	pub fn len(&self) -> usize {
		self.transforms.len()
	}

	/// Whether the registry is empty.
	pub fn is_empty(&self) -> bool {
		self.transforms.is_empty()
	}
}
