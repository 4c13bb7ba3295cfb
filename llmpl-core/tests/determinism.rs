//! Compiling the same tree twice must produce byte-identical artifacts:
//! no map-iteration order, no fresh-id drift, no environment dependence.

use llmpl_ast::build::AstBuilder;
use llmpl_ast::{BinOp, Program};
use llmpl_core::compile_unit;
use llmpl_ir::{runtime_intrinsics, serialize};
use proptest::prelude::*;

/// A straight-line function folding the given constants with `plus`.
fn sum_program(values: &[i64]) -> Program {
    let mut b = AstBuilder::new();
    let mut acc = b.int(values[0]);
    for &v in &values[1..] {
        let next = b.int(v);
        acc = b.binary(acc, BinOp::Plus, next);
    }
    let ret = b.ret(acc);
    let body = b.block(vec![ret]);
    let ret_ty = b.ty("Integer");
    let func = b.function("fold", vec![], ret_ty, body);
    b.program(vec![func])
}

fn mixed_program() -> Program {
    let mut b = AstBuilder::new();
    let status = b.enum_decl("Status", vec![("Open", vec![]), ("Done", vec![])]);

    let open_pat = b.pat_variant("Open", vec![]);
    let one = b.int(1);
    let ret_open = b.ret(one);
    let open_body = b.block(vec![ret_open]);
    let open_arm = b.arm(open_pat, open_body);
    let done_pat = b.pat_variant("Done", vec![]);
    let zero = b.int(0);
    let ret_done = b.ret(zero);
    let done_body = b.block(vec![ret_done]);
    let done_arm = b.arm(done_pat, done_body);

    let scrutinee = b.name("s");
    let match_stmt = b.match_stmt(scrutinee, vec![open_arm, done_arm]);
    let body = b.block(vec![match_stmt]);
    let status_ty = b.ty("Status");
    let param = b.param("s", status_ty);
    let ret_ty = b.ty("Integer");
    let func = b.function("weight", vec![param], ret_ty, body);
    b.program(vec![status, func])
}

#[test]
fn identical_trees_yield_identical_bytes() {
    let source = "to weight with s as Status, giving Integer";
    let intrinsics = runtime_intrinsics();

    let first = compile_unit(source, &mixed_program(), &intrinsics).expect("compiles");
    let second = compile_unit(source, &mixed_program(), &intrinsics).expect("compiles");

    assert_eq!(first.module, second.module);
    assert_eq!(
        serialize::to_bytes(&first.module).unwrap(),
        serialize::to_bytes(&second.module).unwrap()
    );
}

#[test]
fn source_hash_is_carried_into_the_module() {
    let source = "same text";
    let unit = compile_unit(source, &mixed_program(), &runtime_intrinsics()).expect("compiles");
    assert_eq!(unit.module.source_hash, serialize::source_hash(source));
}

#[test]
fn persisted_modules_round_trip_through_bytes() {
    let unit = compile_unit("x", &mixed_program(), &runtime_intrinsics()).expect("compiles");
    let bytes = serialize::to_bytes(&unit.module).unwrap();
    let loaded = serialize::from_bytes(&bytes).unwrap();
    assert_eq!(loaded, unit.module);
}

proptest! {
    #[test]
    fn straight_line_compilation_is_deterministic(
        values in proptest::collection::vec(-1_000i64..1_000, 1..8)
    ) {
        let intrinsics = runtime_intrinsics();
        let first = compile_unit("p", &sum_program(&values), &intrinsics).unwrap();
        let second = compile_unit("p", &sum_program(&values), &intrinsics).unwrap();
        prop_assert_eq!(
            serialize::to_bytes(&first.module).unwrap(),
            serialize::to_bytes(&second.module).unwrap()
        );
    }
}
