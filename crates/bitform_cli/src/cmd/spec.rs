use bitform::engine::{BitformError, ExpressionRef, ParamWrapper, Registry, Result, StructField, TransformRef};

use crate::cmd::util::parse_int;

/// Resolve `name` or `name(arg, ...)` against `registry`.
///
/// Integer arguments become constant parameters through a param wrapper.
pub(crate) fn parse_transform(registry: &Registry, spec: &str) -> Result<TransformRef> {
	let invalid = || BitformError::InvalidTransformSpec { spec: spec.to_owned() };
	let text = spec.trim();
	let Some(open) = text.find('(') else {
		if text.is_empty() {
			return Err(invalid());
		}
		return registry.get(text);
	};
	let inner = text[open + 1..].strip_suffix(')').ok_or_else(invalid)?;
	let transform = registry.get(text[..open].trim())?;
	let params = if inner.trim().is_empty() {
		Vec::new()
	} else {
		inner
			.split(',')
			.map(|arg| parse_int(arg.trim()).map(ExpressionRef::constant).ok_or_else(invalid))
			.collect::<Result<Vec<_>>>()?
	};
	Ok(TransformRef::new(ParamWrapper::new(transform, params)?))
}

/// Parse `NAME=SPEC`; an empty name makes an unnamed field.
pub(crate) fn parse_field(registry: &Registry, field: &str) -> Result<StructField> {
	let (name, spec) = field
		.split_once('=')
		.ok_or_else(|| BitformError::InvalidTransformSpec { spec: field.to_owned() })?;
	let transform = parse_transform(registry, spec)?;
	let name = name.trim();
	Ok(if name.is_empty() {
		StructField::unnamed(transform)
	} else {
		StructField::named(name, transform)
	})
}
