use bitform_testkit::{hex, parse_json};

use super::*;
use crate::engine::{Endianness, SimpleInternalNode};

fn sample() -> Node {
	let inner = Node::internal(SimpleInternalNode::new(vec![
		(Node::Integer(0), Node::Boolean(true)),
		(Node::Integer(1), Node::None),
	]));
	Node::internal(SimpleInternalNode::new(vec![
		(Node::from("name"), Node::from("it's")),
		(Node::from("count"), Node::Integer(-3)),
		(Node::from("raw"), Node::Blob(Blob::from_bytes(hex("41 00 27")))),
		(Node::from("flags"), inner),
		(Node::from("empty"), Node::empty_internal()),
	]))
}

#[test]
fn python_layout() {
	let text = print_node_to_string(&sample(), PrintOptions::default()).expect("print succeeds");
	let expected = "{\n    'name': 'it\\'s',\n    'count': -3,\n    'raw': b'A\\x00\\'',\n    'flags': {\n        0: True,\n        1: None\n    },\n    'empty': {}\n}";
	assert_eq!(text, expected);
}

#[test]
fn json_output_parses() {
	let text = print_node_to_string(&sample(), PrintOptions::json()).expect("print succeeds");
	let value = parse_json(text.as_bytes());
	assert_eq!(value["name"], "it's");
	assert_eq!(value["count"], -3);
	assert_eq!(value["raw"], "A\u{0}'");
	assert_eq!(value["flags"]["0"], true);
	assert!(value["flags"]["1"].is_null());
	assert!(value["empty"].as_object().expect("object").is_empty());
}

#[test]
fn json_keeps_field_order() {
	let text = print_node_to_string(&sample(), PrintOptions::json()).expect("print succeeds");
	let positions: Vec<_> = ["\"name\"", "\"count\"", "\"raw\"", "\"flags\"", "\"empty\""]
		.iter()
		.map(|key| text.find(key).expect("key printed"))
		.collect();
	assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn strings_are_escaped() {
	let node = Node::from("a\"b\\c\n\u{1}");
	assert_eq!(print_node_to_string(&node, PrintOptions::json()).expect("json"), "\"a\\\"b\\\\c\\n\\u0001\"");
	assert_eq!(print_node_to_string(&node, PrintOptions::default()).expect("python"), "'a\"b\\\\c\\n\\x01'");
}

#[test]
fn custom_indent() {
	let node = Node::internal(SimpleInternalNode::new(vec![(Node::from("a"), Node::Integer(1))]));
	let options = PrintOptions {
		format: PrintFormat::Python,
		indent: 1,
	};
	assert_eq!(print_node_to_string(&node, options).expect("print succeeds"), "{\n 'a': 1\n}");
}

#[test]
fn bit_blobs_print_as_digits() {
	let bits = Blob::from_bytes(hex("a5")).bits(Endianness::Big);
	assert_eq!(print_node_to_string(&Node::Blob(bits), PrintOptions::default()).expect("print succeeds"), "'10100101'");
}

#[test]
fn print_node_appends_newline() {
	let mut out = Vec::new();
	print_node(&mut out, &Node::Integer(7), PrintOptions::default()).expect("print succeeds");
	assert_eq!(out, b"7\n");
}

#[test]
fn iteration_errors_propagate() {
	assert!(matches!(
		print_node_to_string(&Node::internal(Failing), PrintOptions::default()),
		Err(BitformError::InvalidData)
	));
}

struct Failing;

impl crate::engine::InternalNode for Failing {
	fn for_each(&self, _visit: &mut crate::engine::EntryVisitor<'_>) -> Result<()> {
		Err(BitformError::InvalidData)
	}
}
