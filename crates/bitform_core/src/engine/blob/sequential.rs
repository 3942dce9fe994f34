use std::cell::RefCell;
use std::fs::File;
use std::io::{ErrorKind as IoErrorKind, Read};
use std::path::Path;

use tracing::debug;

use super::{RandomAccessBlob, clamp_read};
use crate::engine::{BitformError, Result};

/// Buffering policy for [`SequentialBlob`].
#[derive(Debug, Clone, Copy)]
pub struct SequentialOptions {
	/// Smallest buffer allocated on first growth.
	pub min_buffer_size: usize,
}

impl Default for SequentialOptions {
	fn default() -> Self {
		Self { min_buffer_size: 4096 }
	}
}

/// Forward-only byte source.
pub trait SequentialSource {
	/// Total length when known without consuming the source.
	fn size(&mut self) -> Result<Option<u64>> {
		Ok(None)
	}

	/// Fill `buf` with the next bytes. Returning fewer bytes than requested
	/// marks the end of the stream.
	fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// Source over any [`Read`], retrying interrupted reads until a buffer is full
/// or the reader reports end of stream.
#[derive(Debug)]
pub struct IoSource<R> {
	reader: R,
	size: Option<u64>,
}

impl<R: Read> IoSource<R> {
	/// Source with unknown total length.
	pub fn new(reader: R) -> Self {
		Self { reader, size: None }
	}

	/// Source whose total length is known up front.
	pub fn with_size(reader: R, size: u64) -> Self {
		Self { reader, size: Some(size) }
	}
}

impl<R: Read> SequentialSource for IoSource<R> {
	fn size(&mut self) -> Result<Option<u64>> {
		Ok(self.size)
	}

	fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
		let mut filled = 0;
		while filled < buf.len() {
			match self.reader.read(&mut buf[filled..]) {
				Ok(0) => break,
				Ok(read) => filled += read,
				Err(err) if err.kind() == IoErrorKind::Interrupted => {}
				Err(err) => return Err(err.into()),
			}
		}
		Ok(filled)
	}
}

/// File source whose size comes from file metadata.
#[derive(Debug)]
pub struct FileSource {
	inner: IoSource<File>,
}

impl FileSource {
	/// Open `path` for sequential reading.
	pub fn open(path: impl AsRef<Path>) -> Result<Self> {
		let file = File::open(path)?;
		let size = file.metadata()?.len();
		Ok(Self {
			inner: IoSource::with_size(file, size),
		})
	}
}

impl SequentialSource for FileSource {
	fn size(&mut self) -> Result<Option<u64>> {
		self.inner.size()
	}

	fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
		self.inner.read(buf)
	}
}

/// Random-access blob built by buffering a [`SequentialSource`].
///
/// Buffered bytes never change and are never fetched twice; the buffer only
/// grows, doubling from [`SequentialOptions::min_buffer_size`] one step at a
/// time until a requested end offset fits or the source runs dry.
pub struct SequentialBlob<S> {
	state: RefCell<SequentialState<S>>,
	options: SequentialOptions,
}

struct SequentialState<S> {
	source: S,
	data: Vec<u8>,
	exhausted: bool,
}

impl<S: SequentialSource> SequentialBlob<S> {
	/// Wrap `source`; nothing is read until the first access.
	pub fn new(source: S, options: SequentialOptions) -> Self {
		Self {
			state: RefCell::new(SequentialState {
				source,
				data: Vec::new(),
				exhausted: false,
			}),
			options,
		}
	}

	/// Bytes buffered so far.
	pub fn buffered_len(&self) -> usize {
		self.state.borrow().data.len()
	}

	/// Grows one doubling step per fill so a short source stops growth, and
	/// never reserves past a known native size.
	fn buffer_to(&self, end: u64) -> Result<()> {
		let mut state = self.state.borrow_mut();
		while !state.exhausted && (state.data.len() as u64) < end {
			let len = state.data.len();
			let capacity = state.data.capacity();
			if len == capacity {
				let mut target = self.options.min_buffer_size.max(capacity.saturating_mul(2)).max(1);
				if let Ok(Some(size)) = state.source.size() {
					let native = usize::try_from(size).unwrap_or(usize::MAX);
					target = target.min(native.max(len.saturating_add(1)));
				}
				let extra = target - len;
				state.data.try_reserve_exact(extra).map_err(|_| BitformError::out_of_memory(extra))?;
				debug!(from = capacity, to = state.data.capacity(), "grew sequential buffer");
			}
			let capacity = state.data.capacity();
			state.fill(capacity)?;
		}
		Ok(())
	}
}

impl<S: SequentialSource> SequentialState<S> {
	fn fill(&mut self, capacity: usize) -> Result<()> {
		let start = self.data.len();
		self.data.resize(capacity, 0);
		let want = capacity - start;
		let read = match self.source.read(&mut self.data[start..]) {
			Ok(read) => read.min(want),
			Err(err) => {
				self.data.truncate(start);
				return Err(err);
			}
		};
		self.data.truncate(start + read);
		if read < want {
			self.exhausted = true;
		}
		Ok(())
	}
}

impl<S: SequentialSource> RandomAccessBlob for SequentialBlob<S> {
	fn size(&self) -> Result<u64> {
		if let Ok(Some(size)) = self.state.borrow_mut().source.size() {
			return Ok(size);
		}
		while !self.state.borrow().exhausted {
			let capacity = self.state.borrow().data.capacity() as u64;
			self.buffer_to(capacity.max(1).saturating_mul(2))?;
		}
		Ok(self.buffered_len() as u64)
	}

	fn read(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
		self.buffer_to(offset.saturating_add(buf.len() as u64))?;
		let state = self.state.borrow();
		let take = clamp_read(offset, buf.len() as u64, state.data.len() as u64)? as usize;
		let start = offset as usize;
		buf[..take].copy_from_slice(&state.data[start..start + take]);
		Ok(take)
	}
}
