//! Structural properties of lowered modules: terminator shapes for each
//! control construct, canonical field and arm ordering, dead-statement
//! dropping. Every module here also passes the integrity validator, since
//! these drive `compile_unit` end to end.

use llmpl_ast::build::AstBuilder;
use llmpl_ast::BinOp;
use llmpl_core::compile_unit;
use llmpl_ir::{runtime_intrinsics, InstrKind, IrFunction, Terminator};

fn only_function(unit: &llmpl_core::CompiledUnit) -> &IrFunction {
    assert_eq!(unit.module.functions.len(), 1);
    &unit.module.functions[0]
}

#[test]
fn if_else_lowers_to_branch_then_join() {
    let mut b = AstBuilder::new();
    let one = b.int(1);
    let int_ty = b.ty("Integer");
    let decl = b.declare("x", true, int_ty, one);
    let two = b.int(2);
    let set_then = b.set("x", two);
    let then_block = b.block(vec![set_then]);
    let three = b.int(3);
    let set_else = b.set("x", three);
    let else_block = b.block(vec![set_else]);
    let flag = b.name("flag");
    let if_stmt = b.if_stmt(flag, then_block, Some(else_block));
    let x = b.name("x");
    let ret = b.ret(x);
    let body = b.block(vec![decl, if_stmt, ret]);
    let bool_ty = b.ty("Boolean");
    let param = b.param("flag", bool_ty);
    let ret_ty = b.ty("Integer");
    let func = b.function("choose", vec![param], ret_ty, body);
    let program = b.program(vec![func]);

    let unit = compile_unit("", &program, &runtime_intrinsics()).expect("well formed");
    let function = only_function(&unit);

    // entry branches; both arms jump to one join; the join returns.
    let entry = function
        .blocks
        .iter()
        .find(|blk| blk.id == function.entry)
        .unwrap();
    let Terminator::Branch { then_to, else_to, .. } = entry.term else {
        panic!("entry must end in a branch, got {:?}", entry.term);
    };
    let arm_target = |id| {
        let block = function.blocks.iter().find(|blk| blk.id == id).unwrap();
        match block.term {
            Terminator::Jump(to) => to,
            ref other => panic!("arm must jump to the join, got {other:?}"),
        }
    };
    let join = arm_target(then_to);
    assert_eq!(join, arm_target(else_to));
    let join_block = function.blocks.iter().find(|blk| blk.id == join).unwrap();
    assert!(matches!(join_block.term, Terminator::Return(Some(_))));
}

#[test]
fn while_lowers_to_header_branch_and_back_edge() {
    let mut b = AstBuilder::new();
    let zero = b.int(0);
    let int_ty = b.ty("Integer");
    let decl = b.declare("i", true, int_ty, zero);
    let i = b.name("i");
    let ten = b.int(10);
    let cond = b.binary(i, BinOp::LessThan, ten);
    let i2 = b.name("i");
    let one = b.int(1);
    let next = b.binary(i2, BinOp::Plus, one);
    let step = b.set("i", next);
    let loop_body = b.block(vec![step]);
    let while_stmt = b.while_stmt(cond, loop_body);
    let body = b.block(vec![decl, while_stmt]);
    let ret_ty = b.ty("Nothing");
    let func = b.function("count", vec![], ret_ty, body);
    let program = b.program(vec![func]);

    let unit = compile_unit("", &program, &runtime_intrinsics()).expect("well formed");
    let function = only_function(&unit);

    // entry jumps into the header, the header branches, and the loop body
    // jumps back to the header.
    let entry = function
        .blocks
        .iter()
        .find(|blk| blk.id == function.entry)
        .unwrap();
    let Terminator::Jump(header) = entry.term else {
        panic!("entry must jump to the loop header");
    };
    let header_block = function.blocks.iter().find(|blk| blk.id == header).unwrap();
    let Terminator::Branch { then_to, .. } = header_block.term else {
        panic!("header must branch");
    };
    let body_block = function.blocks.iter().find(|blk| blk.id == then_to).unwrap();
    assert_eq!(body_block.term, Terminator::Jump(header));
}

#[test]
fn record_literal_fields_evaluate_in_declaration_order() {
    let mut b = AstBuilder::new();
    let x_ty = b.ty("Integer");
    let y_ty = b.ty("Integer");
    let point = b.record("Point", vec![("x", x_ty), ("y", y_ty)]);

    // Source supplies y first; lowering must evaluate and store x first.
    let y_val = b.int(2);
    let x_val = b.int(1);
    let lit = b.record_lit("Point", vec![("y", y_val), ("x", x_val)]);
    let point_ty = b.ty("Point");
    let decl = b.declare("p", false, point_ty, lit);
    let body = b.block(vec![decl]);
    let ret_ty = b.ty("Nothing");
    let func = b.function("build", vec![], ret_ty, body);
    let program = b.program(vec![point, func]);

    let unit = compile_unit("", &program, &runtime_intrinsics()).expect("well formed");
    let function = unit.module.function("build").unwrap();

    let consts: Vec<i64> = function
        .blocks
        .iter()
        .flat_map(|blk| &blk.instrs)
        .filter_map(|instr| match instr.kind {
            InstrKind::ConstInt(n) => Some(n),
            _ => None,
        })
        .collect();
    assert_eq!(consts, vec![1, 2]);

    let make = function
        .blocks
        .iter()
        .flat_map(|blk| &blk.instrs)
        .find_map(|instr| match &instr.kind {
            InstrKind::MakeRecord { fields, .. } => Some(fields.clone()),
            _ => None,
        })
        .expect("a MakeRecord instruction");
    assert_eq!(make.len(), 2);
}

#[test]
fn dispatch_arms_are_in_declaration_order_whatever_the_source_order() {
    let mut b = AstBuilder::new();
    let status = b.enum_decl(
        "Status",
        vec![("Pending", vec![]), ("Active", vec![]), ("Closed", vec![])],
    );

    // Arms written back to front, with a catch-all absorbing Active.
    let closed_pat = b.pat_variant("Closed", vec![]);
    let closed_body = b.block(vec![]);
    let closed_arm = b.arm(closed_pat, closed_body);
    let pending_pat = b.pat_variant("Pending", vec![]);
    let pending_body = b.block(vec![]);
    let pending_arm = b.arm(pending_pat, pending_body);
    let other_pat = b.pat_catch_all("other");
    let other_body = b.block(vec![]);
    let other_arm = b.arm(other_pat, other_body);

    let scrutinee = b.name("s");
    let match_stmt = b.match_stmt(scrutinee, vec![closed_arm, pending_arm, other_arm]);
    let body = b.block(vec![match_stmt]);
    let status_ty = b.ty("Status");
    let param = b.param("s", status_ty);
    let ret_ty = b.ty("Nothing");
    let func = b.function("triage", vec![param], ret_ty, body);
    let program = b.program(vec![status, func]);

    let unit = compile_unit("", &program, &runtime_intrinsics()).expect("well formed");
    let function = unit.module.function("triage").unwrap();

    let arms = function
        .blocks
        .iter()
        .find_map(|blk| match &blk.term {
            Terminator::MatchDispatch { arms, .. } => Some(arms.clone()),
            _ => None,
        })
        .expect("a dispatch terminator");
    let indices: Vec<u32> = arms.iter().map(|a| a.variant_index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    // Pending and Closed have their own blocks; Active falls to the
    // catch-all block, distinct from both.
    assert_ne!(arms[0].to, arms[2].to);
    assert_ne!(arms[1].to, arms[0].to);
    assert_ne!(arms[1].to, arms[2].to);
}

#[test]
fn statements_after_a_return_are_dropped() {
    let mut b = AstBuilder::new();
    let one = b.int(1);
    let ret = b.ret(one);
    let two = b.int(2);
    let int_ty = b.ty("Integer");
    let dead = b.declare("never", false, int_ty, two);
    let body = b.block(vec![ret, dead]);
    let ret_ty = b.ty("Integer");
    let func = b.function("early", vec![], ret_ty, body);
    let program = b.program(vec![func]);

    let unit = compile_unit("", &program, &runtime_intrinsics()).expect("well formed");
    let function = only_function(&unit);
    assert_eq!(function.blocks.len(), 1);
    let binds = function.blocks[0]
        .instrs
        .iter()
        .filter(|instr| matches!(instr.kind, InstrKind::BindLocal { .. }))
        .count();
    assert_eq!(binds, 0);
}

#[test]
fn a_shadowing_declare_gets_its_own_slot() {
    let mut b = AstBuilder::new();
    let one = b.int(1);
    let int_ty = b.ty("Integer");
    let outer = b.declare("x", false, int_ty, one);
    let inner_val = b.text("inner");
    let text_ty = b.ty("Text");
    let inner = b.declare("x", false, text_ty, inner_val);
    let then_block = b.block(vec![inner]);
    let flag = b.name("flag");
    let if_stmt = b.if_stmt(flag, then_block, None);
    let x = b.name("x");
    let ret = b.ret(x);
    let body = b.block(vec![outer, if_stmt, ret]);
    let bool_ty = b.ty("Boolean");
    let param = b.param("flag", bool_ty);
    let ret_ty = b.ty("Integer");
    let func = b.function("pick", vec![param], ret_ty, body);
    let program = b.program(vec![func]);

    let unit = compile_unit("", &program, &runtime_intrinsics()).expect("shadowing is legal");
    let function = only_function(&unit);

    let binds: Vec<&str> = function
        .blocks
        .iter()
        .flat_map(|blk| &blk.instrs)
        .filter_map(|instr| match &instr.kind {
            InstrKind::BindLocal { name, .. } => Some(name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(binds.len(), 2);
    assert_ne!(
        binds[0], binds[1],
        "an inner shadowing declare must not reuse the outer slot"
    );

    // The return after the if reads the outer binding's slot.
    let join = function
        .blocks
        .iter()
        .find(|blk| matches!(blk.term, Terminator::Return(Some(_))))
        .expect("a returning block");
    let returned = join
        .instrs
        .iter()
        .find_map(|instr| match &instr.kind {
            InstrKind::LoadLocal { name } => Some(name.as_str()),
            _ => None,
        })
        .expect("the returned load");
    assert_eq!(returned, binds[0]);
}

#[test]
fn a_set_statement_writes_the_nearest_binding() {
    let mut b = AstBuilder::new();
    let one = b.int(1);
    let int_ty = b.ty("Integer");
    let outer = b.declare("x", true, int_ty, one);
    let two = b.int(2);
    let inner_ty = b.ty("Integer");
    let inner = b.declare("x", true, inner_ty, two);
    let three = b.int(3);
    let set_inner = b.set("x", three);
    let then_block = b.block(vec![inner, set_inner]);
    let flag = b.name("flag");
    let if_stmt = b.if_stmt(flag, then_block, None);
    let four = b.int(4);
    let set_outer = b.set("x", four);
    let x = b.name("x");
    let ret = b.ret(x);
    let body = b.block(vec![outer, if_stmt, set_outer, ret]);
    let bool_ty = b.ty("Boolean");
    let param = b.param("flag", bool_ty);
    let ret_ty = b.ty("Integer");
    let func = b.function("layered", vec![param], ret_ty, body);
    let program = b.program(vec![func]);

    let unit = compile_unit("", &program, &runtime_intrinsics()).expect("shadowing is legal");
    let function = only_function(&unit);

    // In emission order: outer declare, inner declare, inner set, outer set.
    let binds: Vec<&str> = function
        .blocks
        .iter()
        .flat_map(|blk| &blk.instrs)
        .filter_map(|instr| match &instr.kind {
            InstrKind::BindLocal { name, .. } => Some(name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(binds.len(), 4);
    assert_eq!(binds[1], binds[2], "the inner set must write the inner slot");
    assert_eq!(binds[0], binds[3], "the outer set must write the outer slot");
    assert_ne!(binds[0], binds[1]);
}

#[test]
fn field_access_reads_by_declaration_index() {
    let mut b = AstBuilder::new();
    let x_ty = b.ty("Integer");
    let y_ty = b.ty("Integer");
    let point = b.record("Point", vec![("x", x_ty), ("y", y_ty)]);

    let base = b.name("p");
    let access = b.field(base, "y");
    let int_ty = b.ty("Integer");
    let decl = b.declare("height", false, int_ty, access);
    let body = b.block(vec![decl]);
    let point_ty = b.ty("Point");
    let param = b.param("p", point_ty);
    let ret_ty = b.ty("Nothing");
    let func = b.function("read", vec![param], ret_ty, body);
    let program = b.program(vec![point, func]);

    let unit = compile_unit("", &program, &runtime_intrinsics()).expect("well formed");
    let function = unit.module.function("read").unwrap();
    let index = function
        .blocks
        .iter()
        .flat_map(|blk| &blk.instrs)
        .find_map(|instr| match instr.kind {
            InstrKind::GetField { field_index, .. } => Some(field_index),
            _ => None,
        })
        .expect("a GetField instruction");
    assert_eq!(index, 1);
}
