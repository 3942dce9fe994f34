use std::fmt::Write as _;
use std::io::Write;

use crate::engine::{BitformError, Blob, Endianness, Node, Result};

/// Output syntax for [`print_node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrintFormat {
	/// Python literal syntax: `True`, `None`, `'text'`, `b'\x01'`.
	#[default]
	Python,
	/// JSON: `true`, `null`, escaped strings, every key quoted.
	Json,
}

impl PrintFormat {
	/// Render the format as a stable lowercase label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Python => "python",
			Self::Json => "json",
		}
	}
}

/// Formatting options for printed node trees.
#[derive(Debug, Clone, Copy)]
pub struct PrintOptions {
	/// Output syntax.
	pub format: PrintFormat,
	/// Spaces per nesting level.
	pub indent: usize,
}

impl Default for PrintOptions {
	fn default() -> Self {
		Self {
			format: PrintFormat::Python,
			indent: 4,
		}
	}
}

impl PrintOptions {
	/// JSON with the default indent.
	pub fn json() -> Self {
		Self {
			format: PrintFormat::Json,
			..Self::default()
		}
	}
}

const BLOB_CHUNK: usize = 4096;

/// Write `node` and a trailing newline to `out`.
///
/// Internal nodes print one entry per line in iteration order, so decoding
/// errors surface partway through the output.
pub fn print_node(out: &mut impl Write, node: &Node, options: PrintOptions) -> Result<()> {
	let mut printer = Printer { out, options };
	printer.node(node, 0)?;
	writeln!(printer.out)?;
	Ok(())
}

/// Render `node` into a string, without a trailing newline.
pub fn print_node_to_string(node: &Node, options: PrintOptions) -> Result<String> {
	let mut out = Vec::new();
	Printer { out: &mut out, options }.node(node, 0)?;
	String::from_utf8(out).map_err(|_| BitformError::InvalidData)
}

struct Printer<'a, W: Write> {
	out: &'a mut W,
	options: PrintOptions,
}

impl<W: Write> Printer<'_, W> {
	fn node(&mut self, node: &Node, depth: usize) -> Result<()> {
		let json = self.options.format == PrintFormat::Json;
		match node {
			Node::None => write!(self.out, "{}", if json { "null" } else { "None" })?,
			Node::Boolean(value) => {
				let text = match (json, value) {
					(true, true) => "true",
					(true, false) => "false",
					(false, true) => "True",
					(false, false) => "False",
				};
				write!(self.out, "{text}")?;
			}
			Node::Integer(value) => write!(self.out, "{value}")?,
			Node::String(value) => {
				let quoted = self.quote(value);
				write!(self.out, "{quoted}")?;
			}
			Node::Blob(blob) => self.blob(blob)?,
			Node::Internal(_) => self.internal(node, depth)?,
		}
		Ok(())
	}

	fn internal(&mut self, node: &Node, depth: usize) -> Result<()> {
		let mut first = true;
		let pad = " ".repeat(self.options.indent * (depth + 1));
		node.for_each(&mut |key, value| {
			write!(self.out, "{}\n{pad}", if first { "{" } else { "," })?;
			first = false;
			self.key(&key)?;
			write!(self.out, ": ")?;
			self.node(&value, depth + 1)
		})?;
		if first {
			write!(self.out, "{{}}")?;
		} else {
			write!(self.out, "\n{}}}", " ".repeat(self.options.indent * depth))?;
		}
		Ok(())
	}

	fn key(&mut self, key: &Node) -> Result<()> {
		if self.options.format == PrintFormat::Json && !matches!(key, Node::String(_)) {
			let rendered = print_node_to_string(key, self.options)?;
			let quoted = self.quote(&rendered);
			write!(self.out, "{quoted}")?;
			return Ok(());
		}
		self.node(key, 0)
	}

	fn blob(&mut self, blob: &Blob) -> Result<()> {
		let mut buf = vec![0_u8; BLOB_CHUNK];
		let mut offset = 0_u64;
		let mut text = String::new();
		loop {
			let read = match blob.read_into(offset, &mut buf) {
				Ok(read) => read,
				Err(BitformError::BlobOpUnsupported { .. }) if offset == 0 => return self.bit_blob(blob),
				Err(err) => return Err(err),
			};
			for byte in &buf[..read] {
				self.push_byte(&mut text, *byte);
			}
			if read < buf.len() {
				break;
			}
			offset += read as u64;
		}
		match self.options.format {
			PrintFormat::Python => write!(self.out, "b'{text}'")?,
			PrintFormat::Json => write!(self.out, "\"{text}\"")?,
		}
		Ok(())
	}

	/// Bit blobs print as a string of `0` and `1` characters.
	fn bit_blob(&mut self, blob: &Blob) -> Result<()> {
		let bits = blob.size()?;
		let mut text = String::new();
		let mut buf = vec![0_u8; BLOB_CHUNK];
		let mut offset = 0_u64;
		while offset < bits {
			let want = (bits - offset).min(BLOB_CHUNK as u64 * 8);
			let read = blob.read_bits(offset, &mut buf, want, Endianness::Big)?;
			for index in 0..read {
				let byte = buf[(index / 8) as usize];
				text.push(if (byte >> (7 - index % 8)) & 1 == 1 { '1' } else { '0' });
			}
			if read < want {
				break;
			}
			offset += read;
		}
		let quoted = self.quote(&text);
		write!(self.out, "{quoted}")?;
		Ok(())
	}

	fn push_byte(&self, text: &mut String, byte: u8) {
		match (self.options.format, byte) {
			(PrintFormat::Python, b'\\' | b'\'') | (PrintFormat::Json, b'\\' | b'"') => {
				text.push('\\');
				text.push(char::from(byte));
			}
			(_, 0x20..=0x7e) => text.push(char::from(byte)),
			(PrintFormat::Python, _) => {
				let _ = write!(text, "\\x{byte:02x}");
			}
			(PrintFormat::Json, _) => {
				let _ = write!(text, "\\u{byte:04x}");
			}
		}
	}

	fn quote(&self, value: &str) -> String {
		let json = self.options.format == PrintFormat::Json;
		let delimiter = if json { '"' } else { '\'' };
		let mut quoted = String::with_capacity(value.len() + 2);
		quoted.push(delimiter);
		for ch in value.chars() {
			match ch {
				'\\' => quoted.push_str("\\\\"),
				'\n' => quoted.push_str("\\n"),
				'\r' => quoted.push_str("\\r"),
				'\t' => quoted.push_str("\\t"),
				ch if ch == delimiter => {
					quoted.push('\\');
					quoted.push(ch);
				}
				ch if u32::from(ch) < 0x20 || ch == '\u{7f}' => {
					if json {
						let _ = write!(quoted, "\\u{:04x}", u32::from(ch));
					} else {
						let _ = write!(quoted, "\\x{:02x}", u32::from(ch));
					}
				}
				ch => quoted.push(ch),
			}
		}
		quoted.push(delimiter);
		quoted
	}
}

#[cfg(test)]
mod tests;
