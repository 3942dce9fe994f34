use bitform_testkit::hex;
use proptest::prelude::*;

use super::*;
use crate::engine::{
	BinaryOp, Endianness, ExpressionRef, FixedUintTransform, InputlessTransform, KnownLengthTransform, ParamWrapper, StructField, StructTransform, Transform,
	ZeroTerminatedTransform,
};

fn uint8() -> TransformRef {
	TransformRef::new(FixedUintTransform::new(1, Endianness::Little))
}

fn uint16le() -> TransformRef {
	TransformRef::new(FixedUintTransform::new(2, Endianness::Little))
}

fn uint32le() -> TransformRef {
	TransformRef::new(FixedUintTransform::new(4, Endianness::Little))
}

fn structure(fields: Vec<StructField>) -> StructTransform {
	StructTransform::new(fields).expect("struct construction succeeds")
}

fn pair_struct() -> StructTransform {
	structure(vec![StructField::named("a", uint32le()), StructField::named("b", uint32le())])
}

fn blob(text: &str) -> Blob {
	Blob::from_bytes(hex(text))
}

fn integer_pairs(node: &Node) -> Vec<(String, i64)> {
	node.entries()
		.expect("entries succeed")
		.into_iter()
		.map(|(key, value)| {
			(
				key.as_str().expect("string key").to_owned(),
				value.as_integer().expect("integer value"),
			)
		})
		.collect()
}

fn indexed_integers(node: &Node) -> Vec<i64> {
	node.entries()
		.expect("entries succeed")
		.into_iter()
		.enumerate()
		.map(|(index, (key, value))| {
			assert_eq!(key.as_integer().expect("integer key"), index as i64);
			value.as_integer().expect("integer value")
		})
		.collect()
}

fn sized_data(length: &str) -> TransformRef {
	let wrapper = ParamWrapper::new(TransformRef::new(KnownLengthTransform), vec![ExpressionRef::scope_member(length)]);
	TransformRef::new(wrapper.expect("wrapper construction succeeds"))
}

mod structs {
	use super::*;

	#[test]
	fn two_little_endian_fields() {
		let data = blob("01 00 00 00 02 00 00 00");
		let transform = pair_struct();
		let node = transform.apply(&Scope::new(), &Node::Blob(data.clone())).expect("apply succeeds");
		assert_eq!(integer_pairs(&node), vec![("a".to_owned(), 1), ("b".to_owned(), 2)]);

		let instance = transform.instantiate(&Scope::new(), &data, false);
		assert_eq!(instance.field_offset(2).expect("offset succeeds"), 8);
		assert!(instance.complete().expect("complete succeeds"));
	}

	#[test]
	fn trailing_byte_fails_apply_but_not_prefix_apply() {
		let data = blob("01 00 00 00 02 00 00 00 ff");
		let transform = pair_struct();

		let instance = transform.instantiate(&Scope::new(), &data, false);
		assert!(!instance.complete().expect("complete succeeds"));

		let err = transform.apply(&Scope::new(), &Node::Blob(data.clone())).expect_err("apply fails");
		assert!(matches!(err, BitformError::IncompleteSequence { consumed: 8, size: 9 }));
		assert_eq!(err.kind(), ErrorKind::InvalidArgument);

		let (node, consumed) = transform.prefix_apply(&Scope::new(), &data).expect("prefix apply succeeds");
		assert_eq!(consumed, 8);
		assert_eq!(integer_pairs(&node), vec![("a".to_owned(), 1), ("b".to_owned(), 2)]);
		assert_eq!(transform.prefix_length(&Scope::new(), &data).expect("prefix length succeeds"), 8);
	}

	#[test]
	fn unnamed_field_is_flattened() {
		let inner = structure(vec![StructField::named("x", uint8()), StructField::named("y", uint8())]);
		let outer = structure(vec![StructField::unnamed(TransformRef::new(inner)), StructField::named("z", uint16le())]);
		let node = outer.apply(&Scope::new(), &Node::Blob(blob("01 02 03 00"))).expect("apply succeeds");

		assert_eq!(
			integer_pairs(&node),
			vec![("x".to_owned(), 1), ("y".to_owned(), 2), ("z".to_owned(), 3)]
		);
		assert_eq!(node.get(&Node::from("x")).expect("get x").as_integer().expect("integer"), 1);
		assert_eq!(node.get(&Node::from("z")).expect("get z").as_integer().expect("integer"), 3);
		assert_eq!(node.get(&Node::from("w")).expect_err("missing").kind(), ErrorKind::NotFound);
		assert_eq!(node.get(&Node::Integer(0)).expect_err("integer key").kind(), ErrorKind::NotFound);
	}

	#[test]
	fn unnamed_leaf_field_is_rejected() {
		let transform = structure(vec![StructField::unnamed(uint8())]);
		let node = transform.apply(&Scope::new(), &Node::Blob(blob("05"))).expect("apply succeeds");
		let err = node.entries().expect_err("iteration fails");
		assert!(matches!(
			err,
			BitformError::UnnamedFieldNotInternal {
				index: 0,
				got: crate::engine::NodeType::Integer
			}
		));
	}

	#[test]
	fn get_agrees_with_iteration() {
		let transform = structure(vec![
			StructField::named("first", uint8()),
			StructField::named("second", uint16le()),
			StructField::named("third", uint8()),
		]);
		let node = transform.apply(&Scope::new(), &Node::Blob(blob("07 34 12 09"))).expect("apply succeeds");
		for (key, value) in node.entries().expect("entries succeed") {
			let looked_up = node.get(&key).expect("get succeeds");
			assert!(looked_up.equal(&value).expect("compare succeeds"));
		}
	}

	#[test]
	fn construction_validates_fields() {
		let empty = StructTransform::new(vec![StructField::named("", uint8())]);
		assert!(matches!(empty, Err(BitformError::EmptyFieldName)));

		let whole = StructTransform::new(vec![
			StructField::named("ok", uint8()),
			StructField::named("text", TransformRef::new(crate::engine::AsciiTransform)),
		]);
		assert!(matches!(whole, Err(BitformError::FieldNotPrefixable { index: 1 })));
	}

	#[test]
	#[should_panic(expected = "out of range")]
	fn field_offset_past_the_end_panics() {
		let instance = pair_struct().instantiate(&Scope::new(), &blob("00"), true);
		let _ = instance.field_offset(3);
	}

	#[test]
	fn later_fields_read_earlier_ones() {
		let transform = structure(vec![
			StructField::named("len", uint8()),
			StructField::named("data", sized_data("len")),
			StructField::named("tail", uint8()),
		]);
		let node = transform.apply(&Scope::new(), &Node::Blob(blob("03 aa bb cc 07"))).expect("apply succeeds");
		let data = node.get(&Node::from("data")).expect("get data").into_blob().expect("blob");
		assert_eq!(data.read(0, 8).expect("read succeeds"), vec![0xaa, 0xbb, 0xcc]);
		assert_eq!(node.get(&Node::from("tail")).expect("get tail").as_integer().expect("integer"), 7);
	}

	#[test]
	fn nested_node_outlives_its_parent() {
		let inner = structure(vec![StructField::named("data", sized_data("len"))]);
		let outer = structure(vec![StructField::named("len", uint8()), StructField::named("inner", TransformRef::new(inner))]);
		let node = outer.apply(&Scope::new(), &Node::Blob(blob("02 aa bb"))).expect("apply succeeds");
		let nested = node.get(&Node::from("inner")).expect("get inner");
		drop(node);

		let data = nested.get(&Node::from("data")).expect("lookup through parent").into_blob().expect("blob");
		assert_eq!(data.size().expect("size succeeds"), 2);
	}

	#[test]
	fn lazy_concat_field_outlives_its_struct() {
		let tail = ExpressionRef::subblob(ExpressionRef::constant(blob("01 02 03")), ExpressionRef::scope_member("n"), None);
		let joined = ExpressionRef::binary(BinaryOp::Concat, ExpressionRef::constant(blob("aa")), tail);
		let transform = structure(vec![
			StructField::named("n", uint8()),
			StructField::named("cat", TransformRef::new(InputlessTransform::new(joined))),
		]);
		let node = transform.apply(&Scope::new(), &Node::Blob(blob("01"))).expect("apply succeeds");
		let cat = node.get(&Node::from("cat")).expect("get cat").into_blob().expect("blob");
		drop(node);

		assert_eq!(cat.read(0, 8).expect("tail still sees its struct"), [0xaa, 2, 3]);
		assert_eq!(cat.read(0, 8).expect("second read succeeds"), [0xaa, 2, 3]);
	}

	#[test]
	fn discovered_offsets_survive_a_failing_field() {
		let transform = structure(vec![
			StructField::named("a", uint8()),
			StructField::named("b", TransformRef::new(ZeroTerminatedTransform)),
		]);
		let instance = transform.instantiate(&Scope::new(), &blob("01 61 62"), true);
		assert!(matches!(instance.field_offset(2), Err(BitformError::MissingTerminator)));
		assert_eq!(instance.field_offset(1).expect("offset succeeds"), 1);
		assert_eq!(instance.field(0).expect("field succeeds").as_integer().expect("integer"), 1);
	}
}

mod repeats {
	use super::*;

	fn repeat(element: TransformRef, count: Option<i64>) -> RepeatTransform {
		RepeatTransform::new(element, count.map(ExpressionRef::constant))
	}

	#[test]
	fn counted_repeat_is_keyed_by_index() {
		let node = repeat(uint8(), Some(3)).apply(&Scope::new(), &Node::Blob(blob("01 02 03"))).expect("apply succeeds");
		assert_eq!(indexed_integers(&node), vec![1, 2, 3]);
		assert_eq!(node.get(&Node::Integer(1)).expect("get 1").as_integer().expect("integer"), 2);
		assert_eq!(node.get(&Node::Integer(3)).expect_err("past end").kind(), ErrorKind::NotFound);
		assert_eq!(node.get(&Node::Integer(-1)).expect_err("negative").kind(), ErrorKind::NotFound);
		assert_eq!(node.get(&Node::from("0")).expect_err("string key").kind(), ErrorKind::NotFound);
	}

	#[test]
	fn counted_repeat_with_leftover_bytes() {
		let transform = repeat(uint8(), Some(3));
		let err = transform.apply(&Scope::new(), &Node::Blob(blob("01 02 03 04"))).expect_err("apply fails");
		assert!(matches!(err, BitformError::IncompleteSequence { consumed: 3, size: 4 }));
		let (_, consumed) = transform.prefix_apply(&Scope::new(), &blob("01 02 03 04")).expect("prefix apply succeeds");
		assert_eq!(consumed, 3);
	}

	#[test]
	fn negative_count_is_rejected() {
		let err = repeat(uint8(), Some(-1)).apply(&Scope::new(), &Node::Blob(blob("01"))).expect_err("apply fails");
		assert!(matches!(err, BitformError::InvalidCount { count: -1 }));
	}

	#[test]
	fn unbounded_repeat_runs_to_the_end() {
		let transform = repeat(uint16le(), None);
		let node = transform.apply(&Scope::new(), &Node::Blob(blob("01 00 02 00 03 00"))).expect("apply succeeds");
		assert_eq!(indexed_integers(&node), vec![1, 2, 3]);
		let (_, consumed) = transform.prefix_apply(&Scope::new(), &blob("01 00 02 00 03 00")).expect("prefix apply succeeds");
		assert_eq!(consumed, 6);
	}

	#[test]
	fn unbounded_repeat_stops_at_a_failing_element() {
		let transform = repeat(TransformRef::new(ZeroTerminatedTransform), None);
		let (node, consumed) = transform.prefix_apply(&Scope::new(), &blob("61 62 00 63")).expect("prefix apply succeeds");
		assert_eq!(consumed, 3);
		let entries = node.entries().expect("entries succeed");
		assert_eq!(entries.len(), 1);
		assert_eq!(entries[0].1.as_blob().expect("blob").read(0, 8).expect("read succeeds"), b"ab".to_vec());

		let err = transform.apply(&Scope::new(), &Node::Blob(blob("61 62 00 63"))).expect_err("apply fails");
		assert!(matches!(err, BitformError::IncompleteSequence { consumed: 3, size: 4 }));
	}

	#[test]
	fn empty_blob_gives_empty_repeat() {
		let node = repeat(uint8(), None).apply(&Scope::new(), &Node::Blob(blob(""))).expect("apply succeeds");
		assert!(node.entries().expect("entries succeed").is_empty());
	}

	#[test]
	fn count_from_an_earlier_field() {
		let items = RepeatTransform::new(uint8(), Some(ExpressionRef::scope_member("n")));
		let transform = structure(vec![StructField::named("n", uint8()), StructField::named("items", TransformRef::new(items))]);
		let node = transform.apply(&Scope::new(), &Node::Blob(blob("02 05 06"))).expect("apply succeeds");
		let items = node.get(&Node::from("items")).expect("get items");
		assert_eq!(indexed_integers(&items), vec![5, 6]);
	}

	#[test]
	fn repeated_structs() {
		let element = structure(vec![StructField::named("a", uint8()), StructField::named("b", uint8())]);
		let node = repeat(TransformRef::new(element), Some(2))
			.apply(&Scope::new(), &Node::Blob(blob("01 02 03 04")))
			.expect("apply succeeds");
		let second = node.get(&Node::Integer(1)).expect("get 1");
		assert_eq!(integer_pairs(&second), vec![("a".to_owned(), 3), ("b".to_owned(), 4)]);
	}
}

mod do_while {
	use super::*;

	fn until_zero() -> TransformRef {
		let condition = ExpressionRef::binary(BinaryOp::NotEquals, ExpressionRef::current_node(), ExpressionRef::constant(0));
		TransformRef::new(DoWhileTransform::new(uint8(), condition))
	}

	#[test]
	fn stops_after_the_condition_fails() {
		let (node, consumed) = until_zero().prefix_apply(&Scope::new(), &blob("03 01 00 09")).expect("prefix apply succeeds");
		assert_eq!(consumed, 3);
		assert_eq!(indexed_integers(&node), vec![3, 1, 0]);
	}

	#[test]
	fn apply_requires_the_whole_blob() {
		let node = until_zero().apply(&Scope::new(), &Node::Blob(blob("03 00"))).expect("apply succeeds");
		assert_eq!(indexed_integers(&node), vec![3, 0]);
		let err = until_zero().apply(&Scope::new(), &Node::Blob(blob("03 00 01"))).expect_err("apply fails");
		assert!(matches!(err, BitformError::SizeMismatch { expected: 3, actual: 2 }));
	}

	#[test]
	fn condition_must_be_boolean() {
		let transform = TransformRef::new(DoWhileTransform::new(uint8(), ExpressionRef::current_node()));
		let err = transform.prefix_apply(&Scope::new(), &blob("01")).expect_err("prefix apply fails");
		assert!(matches!(err, BitformError::TypeMismatch { .. }));
	}
}

fn terminated(strings: &[Vec<u8>]) -> Vec<u8> {
	strings
		.iter()
		.flat_map(|string| string.iter().copied().chain(std::iter::once(0)))
		.collect()
}

proptest! {
	#[test]
	fn offsets_do_not_depend_on_access_order(
		strings in prop::collection::vec(prop::collection::vec(1_u8..=255, 0..6), 1..6),
		order in prop::collection::vec(any::<prop::sample::Index>(), 0..12),
	) {
		let fields = (0..strings.len())
			.map(|index| StructField::named(format!("f{index}"), TransformRef::new(ZeroTerminatedTransform)))
			.collect();
		let transform = structure(fields);
		let data = Blob::from_bytes(terminated(&strings));
		let instance = transform.instantiate(&Scope::new(), &data, false);

		for index in &order {
			let field = index.index(strings.len());
			let value = instance.field(field).expect("field succeeds").into_blob().expect("blob");
			prop_assert_eq!(value.read(0, 8).expect("read succeeds"), strings[field].clone());
		}

		let mut expected = 0_u64;
		for (index, string) in strings.iter().enumerate() {
			prop_assert_eq!(instance.field_offset(index).expect("offset succeeds"), expected);
			expected += string.len() as u64 + 1;
		}
		prop_assert_eq!(instance.field_offset(strings.len()).expect("offset succeeds"), expected);
		prop_assert!(instance.complete().expect("complete succeeds"));
	}
}
