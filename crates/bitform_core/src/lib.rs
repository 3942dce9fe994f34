//! Declarative binary-format decoding engine.
//!
//! Formats are described as trees of transforms that turn blobs into lazily
//! decoded node trees.

/// Nodes, blobs, scopes, expressions, transforms, and the sequence engine.
pub mod engine;
