use std::path::PathBuf;
use std::process::{Command, Output};
use std::sync::OnceLock;

use bitform_testkit::{fixture_path as shared_fixture_path, parse_json, target_dir as workspace_target_dir};

static BITFORM_BIN: OnceLock<PathBuf> = OnceLock::new();

pub(crate) fn fixture_path(name: &str) -> PathBuf {
	shared_fixture_path(name)
}

pub(crate) fn run_bitform(args: &[&str]) -> Output {
	Command::new(bitform_bin())
		.args(args)
		.env_remove("RUST_LOG")
		.output()
		.expect("bitform command executes")
}

pub(crate) fn run_bitform_json(args: &[&str]) -> serde_json::Value {
	let output = run_bitform(args);
	assert!(
		output.status.success(),
		"bitform command failed with status={}: {}",
		output.status,
		String::from_utf8_lossy(&output.stderr)
	);
	parse_json(&output.stdout)
}

fn bitform_bin() -> &'static PathBuf {
	BITFORM_BIN.get_or_init(resolve_bitform_bin)
}

fn resolve_bitform_bin() -> PathBuf {
	if let Some(path) = option_env!("CARGO_BIN_EXE_bitform") {
		return PathBuf::from(path);
	}
	if let Ok(path) = std::env::var("CARGO_BIN_EXE_bitform") {
		return PathBuf::from(path);
	}

	let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
	let target_dir = workspace_target_dir();

	let mut bin = target_dir.join("debug");
	bin.push(if cfg!(windows) { "bitform.exe" } else { "bitform" });

	let status = Command::new("cargo")
		.current_dir(&manifest_dir)
		.args(["build", "--quiet", "--bin", "bitform"])
		.status()
		.expect("cargo build executes");
	assert!(status.success(), "failed to build bitform binary at {}", bin.display());

	bin
}
