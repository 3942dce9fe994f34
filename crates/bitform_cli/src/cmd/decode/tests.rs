use bitform_testkit::scratch_file;

use crate::cmd::test_support::{fixture_path, run_bitform, run_bitform_json};

fn path(name: &str) -> String {
	fixture_path(name).display().to_string()
}

#[test]
fn struct_fields_decode_to_json() {
	let payload = run_bitform_json(&[
		"decode",
		&path("pair.bin"),
		"--field",
		"a=uint32le",
		"--field",
		"b=uint32le",
		"--format",
		"json",
	]);
	assert_eq!(payload, serde_json::json!({"a": 1, "b": 2}));
}

#[test]
fn python_output_is_the_default() {
	let output = run_bitform(&["decode", &path("pair.bin"), "--field", "a=uint32le", "--field", "b=uint32le"]);
	assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
	assert_eq!(String::from_utf8_lossy(&output.stdout), "{\n    'a': 1,\n    'b': 2\n}\n");
}

#[test]
fn trailing_bytes_fail_unless_prefix() {
	let args = ["decode", &path("pair_trailing.bin"), "--field", "a=uint32le", "--field", "b=uint32le"];
	let output = run_bitform(&args);
	assert!(!output.status.success());
	assert!(String::from_utf8_lossy(&output.stderr).contains("error:"));

	let mut prefixed = args.to_vec();
	prefixed.extend(["--prefix", "--format", "json"]);
	let output = run_bitform(&prefixed);
	assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
	assert!(String::from_utf8_lossy(&output.stderr).contains("consumed 8 of 9 bytes"));
}

#[test]
fn single_transform_with_arguments() {
	let output = run_bitform(&["decode", &path("records.bin"), "--transform", "known_length(12)", "--memory"]);
	assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
	assert!(String::from_utf8_lossy(&output.stdout).starts_with("b'\\x02\\x01\\x03abc"));
}

#[test]
fn unnamed_leaf_field_is_rejected() {
	let file = scratch_file("decode_unnamed.bin", &[0x05, 0x00, 0x07]);
	let output = run_bitform(&["decode", &file.display().to_string(), "--field", "=uint16le", "--field", "tail=uint8"]);
	assert!(!output.status.success());
	assert!(String::from_utf8_lossy(&output.stderr).contains("error:"));
}

#[test]
fn zstd_input_is_transparent() {
	let raw = std::fs::read(fixture_path("pair.bin")).expect("fixture readable");
	let packed = zstd_frame(&raw);
	let file = scratch_file("decode_pair.bin.zst", &packed);
	let payload = run_bitform_json(&[
		"decode",
		&file.display().to_string(),
		"--field",
		"a=uint32le",
		"--field",
		"b=uint32le",
		"--format",
		"json",
		"--min-buffer",
		"1",
	]);
	assert_eq!(payload["b"], 2);
}

#[test]
fn unknown_transform_is_reported() {
	let output = run_bitform(&["decode", &path("pair.bin"), "--transform", "uint7"]);
	assert!(!output.status.success());
	assert!(String::from_utf8_lossy(&output.stderr).contains("unknown transform: uint7"));
}

#[test]
fn a_shape_is_required() {
	let output = run_bitform(&["decode", &path("pair.bin")]);
	assert!(!output.status.success());
}

#[test]
fn zero_terminated_rejects_bytes_after_the_terminator() {
	let output = run_bitform(&["decode", &path("pair.bin"), "--transform", "zero_terminated"]);
	assert!(!output.status.success());
}

fn zstd_frame(raw: &[u8]) -> Vec<u8> {
	zstd::stream::encode_all(raw, 3).expect("zstd encode succeeds")
}
