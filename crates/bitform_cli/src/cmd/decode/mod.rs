use std::io::Write;
use std::path::PathBuf;

use bitform::engine::{
	Blob, Node, PrintFormat, PrintOptions, Registry, Scope, SequentialOptions, StructTransform, TransformRef, load_blob, open_blob, print_node,
};
use tracing::debug;

use crate::cmd::spec::{parse_field, parse_transform};

#[derive(Clone, Copy, clap::ValueEnum)]
pub enum Format {
	Python,
	Json,
}

#[derive(clap::Args)]
#[command(group(clap::ArgGroup::new("shape").required(true).args(["transform", "field"])))]
pub struct Args {
	pub path: PathBuf,
	/// Transform spec: `name` or `name(int, ...)`.
	#[arg(long)]
	pub transform: Option<String>,
	/// Struct field `NAME=SPEC`, repeatable; an empty NAME splices the field.
	#[arg(long = "field")]
	pub field: Vec<String>,
	#[arg(long, value_enum, default_value = "python")]
	pub format: Format,
	#[arg(long, default_value_t = 4)]
	pub indent: usize,
	/// Decode only a prefix of the file and report how many bytes were used.
	#[arg(long)]
	pub prefix: bool,
	/// Read the whole file into memory instead of streaming it.
	#[arg(long)]
	pub memory: bool,
	#[arg(long, default_value_t = SequentialOptions::default().min_buffer_size)]
	pub min_buffer: usize,
}

/// Decode a file and print the resulting tree.
pub fn run(args: Args) -> bitform::engine::Result<()> {
	let registry = Registry::with_primitives();
	let transform = build_transform(&registry, args.transform.as_deref(), &args.field)?;
	let options = PrintOptions {
		format: match args.format {
			Format::Python => PrintFormat::Python,
			Format::Json => PrintFormat::Json,
		},
		indent: args.indent,
	};

	let (compression, blob) = if args.memory {
		load_blob(&args.path)?
	} else {
		open_blob(
			&args.path,
			SequentialOptions {
				min_buffer_size: args.min_buffer,
			},
		)?
	};
	debug!(path = %args.path.display(), compression = compression.as_str(), prefix = args.prefix, "decoding");

	let scope = Scope::new();
	let result = decode(&transform, &scope, &blob, args.prefix).and_then(|(node, consumed)| {
		let stdout = std::io::stdout();
		let mut out = stdout.lock();
		print_node(&mut out, &node, options)?;
		out.flush()?;
		if let Some(consumed) = consumed {
			eprintln!("consumed {consumed} of {} bytes", blob.size()?);
		}
		Ok(())
	});
	if let (Err(_), Some(message)) = (&result, scope.error()) {
		eprintln!("scope error: {message}");
	}
	result
}

fn build_transform(registry: &Registry, transform: Option<&str>, fields: &[String]) -> bitform::engine::Result<TransformRef> {
	if let Some(spec) = transform {
		return parse_transform(registry, spec);
	}
	let fields = fields.iter().map(|field| parse_field(registry, field)).collect::<bitform::engine::Result<Vec<_>>>()?;
	Ok(TransformRef::new(StructTransform::new(fields)?))
}

fn decode(transform: &TransformRef, scope: &Scope, blob: &Blob, prefix: bool) -> bitform::engine::Result<(Node, Option<u64>)> {
	if prefix {
		let (node, consumed) = transform.prefix_apply(scope, blob)?;
		return Ok((node, Some(consumed)));
	}
	Ok((transform.apply(scope, &Node::Blob(blob.clone()))?, None))
}

#[cfg(test)]
mod tests;
