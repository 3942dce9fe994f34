use bitform::engine::Registry;

use crate::cmd::util::emit_json;

#[derive(clap::Args)]
pub struct Args {
	#[arg(long)]
	pub json: bool,
}

/// Print every registered primitive with its parameter count and native operations.
pub fn run(args: Args) -> bitform::engine::Result<()> {
	let registry = Registry::with_primitives();

	if args.json {
		let payload: Vec<PrimitiveJson> = registry
			.iter()
			.map(|(name, transform)| {
				let caps = transform.capabilities();
				PrimitiveJson {
					name: name.to_owned(),
					num_params: transform.num_params(),
					apply: caps.apply,
					prefix_length: caps.prefix_length,
					prefix_apply: caps.prefix_apply,
				}
			})
			.collect();
		return emit_json(&payload);
	}

	println!("name\tparams\toperations");
	for (name, transform) in registry.iter() {
		let caps = transform.capabilities();
		let ops: Vec<&str> = [
			(caps.apply, "apply"),
			(caps.prefix_length, "prefix_length"),
			(caps.prefix_apply, "prefix_apply"),
		]
		.into_iter()
		.filter_map(|(native, op)| native.then_some(op))
		.collect();
		println!("{name}\t{}\t{}", transform.num_params(), ops.join(","));
	}

	Ok(())
}

#[derive(serde::Serialize)]
struct PrimitiveJson {
	name: String,
	num_params: usize,
	apply: bool,
	prefix_length: bool,
	prefix_apply: bool,
}

#[cfg(test)]
mod tests {
	use crate::cmd::test_support::{run_bitform, run_bitform_json};

	#[test]
	fn json_lists_primitives_in_name_order() {
		let payload = run_bitform_json(&["primitives", "--json"]);
		let items = payload.as_array().expect("array payload");
		let names: Vec<&str> = items.iter().map(|item| item["name"].as_str().expect("name")).collect();
		let mut sorted = names.clone();
		sorted.sort_unstable();
		assert_eq!(names, sorted);

		let known_length = items.iter().find(|item| item["name"] == "known_length").expect("known_length listed");
		assert_eq!(known_length["num_params"], 1);
		assert_eq!(known_length["prefix_length"], true);
	}

	#[test]
	fn text_listing_has_header() {
		let output = run_bitform(&["primitives"]);
		assert!(output.status.success());
		let stdout = String::from_utf8_lossy(&output.stdout);
		assert!(stdout.starts_with("name\tparams\toperations\n"));
		assert!(stdout.contains("uint32le\t0\tapply,prefix_length\n"));
	}
}
