//! The validator re-derives every structural invariant from scratch; these
//! feed it hand-built modules, valid and corrupted.

use llmpl_ast::Span;
use llmpl_ir::{
    runtime_intrinsics, validate, BlockId, Callee, DispatchArm, InstrKind, IrBlock, IrFunction,
    IrInstr, IrModule, IrParam, IrType, IrTypeDecl, IrVariant, Terminator, ValueId,
};

fn sp() -> Span {
    Span::point(1, 1)
}

fn instr(dest: Option<u32>, kind: InstrKind) -> IrInstr {
    IrInstr {
        span: sp(),
        dest: dest.map(ValueId),
        kind,
    }
}

fn unit_function(name: &str, blocks: Vec<IrBlock>) -> IrFunction {
    IrFunction {
        name: name.to_string(),
        span: sp(),
        params: Vec::new(),
        ret: IrType::Unit,
        entry: BlockId(0),
        blocks,
    }
}

fn module_with(functions: Vec<IrFunction>) -> IrModule {
    let mut module = IrModule::new("0".repeat(64));
    module.functions = functions;
    module
}

#[test]
fn a_minimal_module_validates() {
    let block = IrBlock {
        id: BlockId(0),
        span: sp(),
        instrs: vec![
            instr(Some(0), InstrKind::ConstInt(5)),
            instr(None, InstrKind::BindLocal { name: "x".into(), value: ValueId(0) }),
        ],
        term: Terminator::Return(None),
    };
    let module = module_with(vec![unit_function("noop", vec![block])]);
    assert!(validate(&module, &runtime_intrinsics()).is_ok());
}

#[test]
fn a_dangling_jump_target_is_rejected() {
    let block = IrBlock {
        id: BlockId(0),
        span: sp(),
        instrs: vec![],
        term: Terminator::Jump(BlockId(9)),
    };
    let module = module_with(vec![unit_function("jumpy", vec![block])]);
    let err = validate(&module, &runtime_intrinsics()).unwrap_err();
    assert!(err.to_string().contains("dangling"));
}

#[test]
fn use_before_definition_is_rejected() {
    let block = IrBlock {
        id: BlockId(0),
        span: sp(),
        instrs: vec![instr(
            None,
            InstrKind::BindLocal { name: "x".into(), value: ValueId(7) },
        )],
        term: Terminator::Return(None),
    };
    let module = module_with(vec![unit_function("eager", vec![block])]);
    let err = validate(&module, &runtime_intrinsics()).unwrap_err();
    assert!(err.to_string().contains("undefined value"));
}

#[test]
fn loading_an_unbound_local_is_rejected() {
    let block = IrBlock {
        id: BlockId(0),
        span: sp(),
        instrs: vec![instr(Some(0), InstrKind::LoadLocal { name: "ghost".into() })],
        term: Terminator::Return(None),
    };
    let module = module_with(vec![unit_function("haunted", vec![block])]);
    let err = validate(&module, &runtime_intrinsics()).unwrap_err();
    assert!(err.to_string().contains("unbound local"));
}

#[test]
fn params_bind_their_slot_and_value() {
    let block = IrBlock {
        id: BlockId(0),
        span: sp(),
        instrs: vec![instr(Some(1), InstrKind::LoadLocal { name: "n".into() })],
        term: Terminator::Return(Some(ValueId(1))),
    };
    let function = IrFunction {
        name: "echo".to_string(),
        span: sp(),
        params: vec![IrParam {
            name: "n".to_string(),
            ty: IrType::Integer,
            span: sp(),
            value: ValueId(0),
        }],
        ret: IrType::Integer,
        entry: BlockId(0),
        blocks: vec![block],
    };
    let module = module_with(vec![function]);
    assert!(validate(&module, &runtime_intrinsics()).is_ok());
}

#[test]
fn returning_a_value_from_a_nothing_function_is_rejected() {
    let block = IrBlock {
        id: BlockId(0),
        span: sp(),
        instrs: vec![instr(Some(0), InstrKind::ConstInt(1))],
        term: Terminator::Return(Some(ValueId(0))),
    };
    let module = module_with(vec![unit_function("chatty", vec![block])]);
    let err = validate(&module, &runtime_intrinsics()).unwrap_err();
    assert!(err.to_string().contains("declared Nothing"));
}

#[test]
fn dispatch_arm_tables_must_be_in_declaration_order() {
    let arm_block = |n| IrBlock {
        id: BlockId(n),
        span: sp(),
        instrs: vec![],
        term: Terminator::Return(None),
    };
    let entry = IrBlock {
        id: BlockId(0),
        span: sp(),
        instrs: vec![instr(
            Some(0),
            InstrKind::MakeEnum {
                enum_name: "Status".into(),
                variant_index: 0,
                args: vec![],
            },
        )],
        term: Terminator::MatchDispatch {
            discr: ValueId(0),
            enum_name: "Status".into(),
            arms: vec![
                DispatchArm { variant_index: 1, to: BlockId(2) },
                DispatchArm { variant_index: 0, to: BlockId(1) },
            ],
        },
    };
    let mut module = module_with(vec![unit_function(
        "triage",
        vec![entry, arm_block(1), arm_block(2)],
    )]);
    module.types.push(IrTypeDecl::Enum {
        name: "Status".to_string(),
        span: sp(),
        variants: vec![
            IrVariant { name: "Open".to_string(), payload: vec![] },
            IrVariant { name: "Done".to_string(), payload: vec![] },
        ],
    });

    let err = validate(&module, &runtime_intrinsics()).unwrap_err();
    assert!(err.to_string().contains("declaration order"));
}

#[test]
fn dispatch_must_cover_every_variant() {
    let entry = IrBlock {
        id: BlockId(0),
        span: sp(),
        instrs: vec![instr(
            Some(0),
            InstrKind::MakeEnum {
                enum_name: "Status".into(),
                variant_index: 0,
                args: vec![],
            },
        )],
        term: Terminator::MatchDispatch {
            discr: ValueId(0),
            enum_name: "Status".into(),
            arms: vec![DispatchArm { variant_index: 0, to: BlockId(1) }],
        },
    };
    let tail = IrBlock {
        id: BlockId(1),
        span: sp(),
        instrs: vec![],
        term: Terminator::Return(None),
    };
    let mut module = module_with(vec![unit_function("triage", vec![entry, tail])]);
    module.types.push(IrTypeDecl::Enum {
        name: "Status".to_string(),
        span: sp(),
        variants: vec![
            IrVariant { name: "Open".to_string(), payload: vec![] },
            IrVariant { name: "Done".to_string(), payload: vec![] },
        ],
    });

    let err = validate(&module, &runtime_intrinsics()).unwrap_err();
    assert!(err.to_string().contains("2 variants"));
}

#[test]
fn a_declared_enum_takes_precedence_over_the_builtin_result_shape() {
    let arm_block = |n| IrBlock {
        id: BlockId(n),
        span: sp(),
        instrs: vec![],
        term: Terminator::Return(None),
    };
    let entry = IrBlock {
        id: BlockId(0),
        span: sp(),
        instrs: vec![instr(
            Some(0),
            InstrKind::MakeEnum {
                enum_name: "Result".into(),
                variant_index: 0,
                args: vec![],
            },
        )],
        term: Terminator::MatchDispatch {
            discr: ValueId(0),
            enum_name: "Result".into(),
            arms: vec![
                DispatchArm { variant_index: 0, to: BlockId(1) },
                DispatchArm { variant_index: 1, to: BlockId(2) },
                DispatchArm { variant_index: 2, to: BlockId(3) },
            ],
        },
    };
    let mut module = module_with(vec![unit_function(
        "triage",
        vec![entry, arm_block(1), arm_block(2), arm_block(3)],
    )]);
    // Dispatch shape comes from this declaration, not the two-variant
    // built-in sharing its name.
    module.types.push(IrTypeDecl::Enum {
        name: "Result".to_string(),
        span: sp(),
        variants: vec![
            IrVariant { name: "Yes".to_string(), payload: vec![] },
            IrVariant { name: "No".to_string(), payload: vec![] },
            IrVariant { name: "Maybe".to_string(), payload: vec![] },
        ],
    });

    assert!(validate(&module, &runtime_intrinsics()).is_ok());
}

#[test]
fn calls_to_unknown_functions_are_rejected() {
    let block = IrBlock {
        id: BlockId(0),
        span: sp(),
        instrs: vec![instr(
            Some(0),
            InstrKind::Call {
                callee: Callee::Function("phantom".into()),
                args: vec![],
            },
        )],
        term: Terminator::Return(None),
    };
    let module = module_with(vec![unit_function("caller", vec![block])]);
    let err = validate(&module, &runtime_intrinsics()).unwrap_err();
    assert!(err.to_string().contains("unknown function"));
}

#[test]
fn intrinsic_call_arity_is_checked_against_the_table() {
    let block = IrBlock {
        id: BlockId(0),
        span: sp(),
        instrs: vec![
            instr(Some(0), InstrKind::ConstText("a".into())),
            instr(
                Some(1),
                InstrKind::Call {
                    callee: Callee::Intrinsic("concat".into()),
                    args: vec![ValueId(0)],
                },
            ),
        ],
        term: Terminator::Return(None),
    };
    let module = module_with(vec![unit_function("caller", vec![block])]);
    let err = validate(&module, &runtime_intrinsics()).unwrap_err();
    assert!(err.to_string().contains("arity"));
}

#[test]
fn duplicate_block_ids_are_rejected() {
    let block = |a| IrBlock {
        id: BlockId(a),
        span: sp(),
        instrs: vec![],
        term: Terminator::Return(None),
    };
    let module = module_with(vec![unit_function("twin", vec![block(0), block(0)])]);
    let err = validate(&module, &runtime_intrinsics()).unwrap_err();
    assert!(err.to_string().contains("duplicate block"));
}
