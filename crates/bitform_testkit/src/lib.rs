//! Shared test helpers for workspace crates.

use std::io::Read;
use std::path::{Path, PathBuf};

/// Resolve the workspace root path.
pub fn workspace_root() -> PathBuf {
	let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
	manifest_dir
		.join("..")
		.join("..")
		.canonicalize()
		.unwrap_or_else(|_| manifest_dir.join("..").join(".."))
}

/// Resolve a fixture path under `<workspace>/fixtures`.
pub fn fixture_path(name: &str) -> PathBuf {
	workspace_root().join("fixtures").join(name)
}

/// Resolve the workspace target directory.
pub fn target_dir() -> PathBuf {
	std::env::var_os("CARGO_TARGET_DIR")
		.map(PathBuf::from)
		.unwrap_or_else(|| workspace_root().join("target"))
}

/// Write `bytes` to a scratch file under the target directory and return its path.
///
/// `name` should be unique per test so parallel tests do not collide.
pub fn scratch_file(name: &str, bytes: &[u8]) -> PathBuf {
	let dir = target_dir().join("bitform-scratch");
	std::fs::create_dir_all(&dir).expect("scratch directory is creatable");
	let path = dir.join(name);
	std::fs::write(&path, bytes).expect("scratch file is writable");
	path
}

/// Parse whitespace-separated hex byte pairs, e.g. `"01 00 ff"`.
pub fn hex(text: &str) -> Vec<u8> {
	text.split_whitespace()
		.map(|pair| u8::from_str_radix(pair, 16).unwrap_or_else(|_| panic!("invalid hex byte {pair:?}")))
		.collect()
}

/// Parse JSON bytes, panicking with the offending text on failure.
pub fn parse_json(bytes: &[u8]) -> serde_json::Value {
	serde_json::from_slice(bytes).unwrap_or_else(|err| panic!("invalid json ({err}): {}", String::from_utf8_lossy(bytes)))
}

/// Reader that hands out at most `chunk` bytes per call, to exercise
/// short-read handling.
#[derive(Debug, Clone)]
pub struct ChunkedReader {
	data: Vec<u8>,
	pos: usize,
	chunk: usize,
}

impl ChunkedReader {
	/// Reader over `data` yielding `chunk`-sized pieces (at least one byte).
	pub fn new(data: Vec<u8>, chunk: usize) -> Self {
		Self {
			data,
			pos: 0,
			chunk: chunk.max(1),
		}
	}
}

impl Read for ChunkedReader {
	fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
		let take = buf.len().min(self.chunk).min(self.data.len() - self.pos);
		buf[..take].copy_from_slice(&self.data[self.pos..self.pos + take]);
		self.pos += take;
		Ok(take)
	}
}
