use bitform_testkit::hex;

use super::*;
use crate::engine::{Blob, SimpleInternalNode};

fn int(value: i64) -> ExpressionRef {
	ExpressionRef::constant(value)
}

fn eval(op: BinaryOp, a: i64, b: i64) -> Result<Node> {
	ExpressionRef::binary(op, int(a), int(b)).evaluate(&Scope::new())
}

fn record(pairs: &[(&str, i64)]) -> Node {
	Node::internal(SimpleInternalNode::new(
		pairs.iter().map(|(key, value)| (Node::from(*key), Node::Integer(*value))).collect(),
	))
}

mod operators {
	use super::*;

	#[test]
	fn division_and_modulo_are_floored() {
		assert_eq!(eval(BinaryOp::IntegerDivide, -7, 2).expect("divide").as_integer().expect("integer"), -4);
		assert_eq!(eval(BinaryOp::Modulo, -7, 2).expect("modulo").as_integer().expect("integer"), 1);
		assert_eq!(eval(BinaryOp::IntegerDivide, 7, 2).expect("divide").as_integer().expect("integer"), 3);
	}

	#[test]
	fn non_positive_divisor_is_rejected() {
		assert!(matches!(eval(BinaryOp::IntegerDivide, 1, 0), Err(BitformError::NonPositiveDivisor { divisor: 0 })));
		assert!(matches!(eval(BinaryOp::Modulo, 1, -3), Err(BitformError::NonPositiveDivisor { divisor: -3 })));
	}

	#[test]
	fn overflow_is_an_error() {
		assert!(matches!(eval(BinaryOp::Add, i64::MAX, 1), Err(BitformError::IntegerOverflow { op: "+" })));
		assert!(matches!(eval(BinaryOp::Multiply, i64::MIN, -1), Err(BitformError::IntegerOverflow { op: "*" })));
	}

	#[test]
	fn comparisons_and_logic() {
		assert!(eval(BinaryOp::LessThanOrEqual, 2, 2).expect("compare").as_boolean().expect("boolean"));
		assert!(!eval(BinaryOp::GreaterThan, 2, 2).expect("compare").as_boolean().expect("boolean"));
		let both = ExpressionRef::binary(BinaryOp::And, ExpressionRef::constant(true), ExpressionRef::constant(false));
		assert!(!both.evaluate(&Scope::new()).expect("and").as_boolean().expect("boolean"));
		let mixed = ExpressionRef::binary(BinaryOp::Or, ExpressionRef::constant(true), int(1));
		assert!(matches!(mixed.evaluate(&Scope::new()), Err(BitformError::TypeMismatch { .. })));
	}

	#[test]
	fn equality_spans_types() {
		let scope = Scope::new();
		let same = ExpressionRef::binary(BinaryOp::Equals, ExpressionRef::constant("a"), ExpressionRef::constant("a"));
		assert!(same.evaluate(&scope).expect("equals").as_boolean().expect("boolean"));
		let differ = ExpressionRef::binary(BinaryOp::NotEquals, int(1), ExpressionRef::constant(true));
		assert!(differ.evaluate(&scope).expect("not equals").as_boolean().expect("boolean"));
	}

	#[test]
	fn member_reads_internal_node() {
		let node = record(&[("len", 4)]);
		let member = ExpressionRef::binary(BinaryOp::Member, ExpressionRef::constant(node), ExpressionRef::constant("len"));
		assert_eq!(member.evaluate(&Scope::new()).expect("member").as_integer().expect("integer"), 4);
	}

	#[test]
	fn concat_defers_right_operand() {
		let scope = Scope::new();
		let joined = ExpressionRef::binary(
			BinaryOp::Concat,
			ExpressionRef::constant(Blob::from_bytes(hex("aa"))),
			ExpressionRef::param(0),
		)
		.evaluate(&scope)
		.expect("concat evaluates without its tail");
		let blob = joined.as_blob().expect("blob");
		assert_eq!(blob.read(0, 1).expect("head read"), [0xaa]);
	}
}

mod scope_lookups {
	use super::*;

	#[test]
	fn in_node_walks_outward() {
		let outer = Scope::new();
		outer.set_in_node(Node::Integer(5));
		let inner = outer.child().child();
		assert_eq!(ExpressionRef::in_node().evaluate(&inner).expect("found").as_integer().expect("integer"), 5);
		assert!(matches!(ExpressionRef::in_node().evaluate(&Scope::new()), Err(BitformError::NoInputNode)));
	}

	#[test]
	fn current_node_is_scope_local() {
		let outer = Scope::new();
		outer.set_current_node(Node::Integer(1));
		assert!(ExpressionRef::current_node().evaluate(&outer).is_ok());
		assert!(matches!(ExpressionRef::current_node().evaluate(&outer.child()), Err(BitformError::NoCurrentNode)));
	}

	#[test]
	fn scope_member_searches_until_barrier() {
		let root = Scope::new();
		root.set_current_node(record(&[("hidden", 1)]));
		let fenced = root.child();
		fenced.set_barrier();
		fenced.set_current_node(record(&[("fence", 2)]));
		let middle = fenced.child();
		middle.set_current_node(record(&[("mid", 3)]));
		let leaf = middle.child();
		leaf.set_current_node(record(&[("leaf", 4)]));

		assert_eq!(ExpressionRef::scope_member("mid").evaluate(&leaf).expect("outer member").as_integer().expect("integer"), 3);
		let err = ExpressionRef::scope_member("hidden").evaluate(&leaf).expect_err("barrier stops the walk");
		assert!(matches!(err, BitformError::Reported { .. }));
		assert_eq!(leaf.error().as_deref(), Some("no scope member \"hidden\""));
		assert!(ExpressionRef::scope_member("fence").evaluate(&leaf).is_err(), "barrier scope itself is not searched");
	}

	#[test]
	fn param_reads_nearest_parameters() {
		let scope = Scope::new();
		scope.alloc_params(1).expect("alloc");
		scope.set_param(0, Node::Integer(11)).expect("set");
		assert_eq!(ExpressionRef::param(0).evaluate(&scope.child()).expect("param").as_integer().expect("integer"), 11);
	}
}

mod subblob {
	use super::*;

	fn source() -> ExpressionRef {
		ExpressionRef::constant(Blob::from_bytes(hex("00 11 22 33 44")))
	}

	#[test]
	fn length_end_and_open_forms() {
		let scope = Scope::new();
		let by_len = ExpressionRef::subblob(source(), int(1), Some(int(2))).evaluate(&scope).expect("slice");
		assert_eq!(by_len.as_blob().expect("blob").read(0, 10).expect("read"), [0x11, 0x22]);

		let open = ExpressionRef::subblob(source(), int(3), None).evaluate(&scope).expect("slice");
		assert_eq!(open.as_blob().expect("blob").read(0, 10).expect("read"), [0x33, 0x44]);

		let by_end = ExpressionRef::new(SubblobExpression {
			blob: source(),
			start: int(1),
			limit: Some(int(4)),
			absolute_limit: true,
			bit_order: None,
		})
		.evaluate(&scope)
		.expect("slice");
		assert_eq!(by_end.as_blob().expect("blob").read(0, 10).expect("read"), [0x11, 0x22, 0x33]);
	}

	#[test]
	fn negative_bounds_are_rejected() {
		let scope = Scope::new();
		let err = ExpressionRef::subblob(source(), int(-1), None).evaluate(&scope).expect_err("negative start");
		assert!(matches!(err, BitformError::InvalidSlice { start: -1, limit: -1 }));
		let err = ExpressionRef::new(SubblobExpression {
			blob: source(),
			start: int(3),
			limit: Some(int(1)),
			absolute_limit: true,
			bit_order: None,
		})
		.evaluate(&scope)
		.expect_err("end before start");
		assert!(matches!(err, BitformError::InvalidSlice { start: 3, limit: -2 }));
	}

	#[test]
	fn bit_order_yields_bit_blob() {
		let scope = Scope::new();
		let bits = ExpressionRef::new(SubblobExpression {
			blob: source(),
			start: int(1),
			limit: Some(int(1)),
			absolute_limit: false,
			bit_order: Some(Endianness::Big),
		})
		.evaluate(&scope)
		.expect("slice");
		let blob = bits.as_blob().expect("blob");
		assert_eq!(blob.size().expect("size"), 8);
		let mut buf = [0_u8; 1];
		assert_eq!(blob.read_bits(0, &mut buf, 4, Endianness::Big).expect("bits"), 4);
		assert_eq!(buf[0], 0x10);
	}
}
