use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::debug;

use crate::engine::{BitformError, Blob, FileSource, IoSource, Result, SequentialOptions};

const MAX_DECOMPRESSED_BYTES: usize = 512 * 1024 * 1024;
/// zstd frame magic.
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Compression mode detected for an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
	/// Raw bytes.
	None,
	/// zstd-compressed stream.
	Zstd,
}

impl Compression {
	/// Render compression mode as a stable lowercase label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::None => "none",
			Self::Zstd => "zstd",
		}
	}

	/// Detect compression from the first bytes of an input.
	pub fn detect(head: &[u8]) -> Self {
		if head.starts_with(&ZSTD_MAGIC) { Self::Zstd } else { Self::None }
	}
}

/// Open `path` as a lazily read blob.
///
/// zstd input is decompressed on demand through the sequential adapter; raw
/// files are read on demand with their size taken from file metadata.
pub fn open_blob(path: impl AsRef<Path>, options: SequentialOptions) -> Result<(Compression, Blob)> {
	let path = path.as_ref();
	let compression = detect_file(path)?;
	debug!(path = %path.display(), compression = compression.as_str(), "opening blob");
	let blob = match compression {
		Compression::None => Blob::sequential_with(FileSource::open(path)?, options),
		Compression::Zstd => {
			let decoder = zstd::stream::read::Decoder::new(File::open(path)?)?;
			Blob::sequential_with(IoSource::new(decoder), options)
		}
	};
	Ok((compression, blob))
}

/// Read `path` fully into a memory blob, decompressing zstd input.
pub fn load_blob(path: impl AsRef<Path>) -> Result<(Compression, Blob)> {
	let path = path.as_ref();
	let raw = std::fs::read(path)?;
	let (compression, bytes) = decode_bytes(raw)?;
	debug!(path = %path.display(), compression = compression.as_str(), size = bytes.len(), "loaded blob");
	Ok((compression, Blob::from_bytes(bytes)))
}

/// Detect and decode compression, returning `(mode, decoded_bytes)`.
pub fn decode_bytes(raw: Vec<u8>) -> Result<(Compression, Vec<u8>)> {
	match Compression::detect(&raw) {
		Compression::None => Ok((Compression::None, raw)),
		Compression::Zstd => Ok((Compression::Zstd, decode_zstd(&raw)?)),
	}
}

fn detect_file(path: &Path) -> Result<Compression> {
	let mut head = [0_u8; ZSTD_MAGIC.len()];
	let mut reader = BufReader::new(File::open(path)?);
	let mut filled = 0;
	while filled < head.len() {
		let read = reader.read(&mut head[filled..])?;
		if read == 0 {
			break;
		}
		filled += read;
	}
	Ok(Compression::detect(&head[..filled]))
}

fn decode_zstd(raw: &[u8]) -> Result<Vec<u8>> {
	let mut decoder = zstd::stream::read::Decoder::new(raw)?;
	let mut out = Vec::new();
	let mut buf = [0_u8; 8192];

	loop {
		let read = decoder.read(&mut buf)?;
		if read == 0 {
			break;
		}

		if out.len() + read > MAX_DECOMPRESSED_BYTES {
			return Err(BitformError::DecompressedTooLarge { limit: MAX_DECOMPRESSED_BYTES });
		}

		out.extend_from_slice(&buf[..read]);
	}

	Ok(out)
}
