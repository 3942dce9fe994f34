use std::io::Write;

use bitform::engine::Result;

/// Write `payload` to stdout as pretty JSON followed by a newline.
pub(crate) fn emit_json<T: serde::Serialize>(payload: &T) -> Result<()> {
	let stdout = std::io::stdout();
	let mut out = stdout.lock();
	serde_json::to_writer_pretty(&mut out, payload).map_err(std::io::Error::from)?;
	writeln!(out)?;
	Ok(())
}

/// Parse a decimal or `0x`-prefixed hex integer literal.
pub(crate) fn parse_int(value: &str) -> Option<i64> {
	let (negative, digits) = match value.strip_prefix('-') {
		Some(rest) => (true, rest),
		None => (false, value),
	};
	let parsed = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
		i64::from_str_radix(hex, 16).ok()?
	} else {
		digits.parse::<i64>().ok()?
	};
	Some(if negative { -parsed } else { parsed })
}
