//! Persisted-artifact contract: loads reproduce the saved module exactly,
//! and anything the current schema does not describe fails loudly.

use llmpl_ast::Span;
use llmpl_ir::{
    serialize, BlockId, InstrKind, IrBlock, IrError, IrFunction, IrInstr, IrModule, IrType,
    Terminator, ValueId,
};

fn sample_module() -> IrModule {
    let block = IrBlock {
        id: BlockId(0),
        span: Span::new(1, 1, 3, 8),
        instrs: vec![IrInstr {
            span: Span::point(2, 5),
            dest: Some(ValueId(0)),
            kind: InstrKind::ConstInt(42),
        }],
        term: Terminator::Return(Some(ValueId(0))),
    };
    let mut module = IrModule::new(serialize::source_hash("to answer, giving Integer"));
    module.functions.push(IrFunction {
        name: "answer".to_string(),
        span: Span::new(1, 1, 3, 8),
        params: Vec::new(),
        ret: IrType::Integer,
        entry: BlockId(0),
        blocks: vec![block],
    });
    module
}

#[test]
fn a_saved_module_loads_back_identically() {
    let module = sample_module();
    let bytes = serialize::to_bytes(&module).unwrap();
    let loaded = serialize::from_bytes(&bytes).unwrap();
    assert_eq!(loaded, module);
}

#[test]
fn a_foreign_schema_version_is_refused() {
    let mut module = sample_module();
    module.schema_version += 1;
    let bytes = serialize::to_bytes(&module).unwrap();

    let err = serialize::from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, IrError::Deserialize { .. }));
    assert!(err.to_string().contains("schema version"));
}

#[test]
fn unknown_fields_are_refused() {
    let module = sample_module();
    let bytes = serialize::to_bytes(&module).unwrap();

    let mut value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    value
        .as_object_mut()
        .unwrap()
        .insert("vendor_extension".to_string(), serde_json::json!(true));
    let tampered = serde_json::to_vec(&value).unwrap();

    assert!(serialize::from_bytes(&tampered).is_err());
}

#[test]
fn truncated_input_is_refused() {
    let module = sample_module();
    let bytes = serialize::to_bytes(&module).unwrap();
    let err = serialize::from_bytes(&bytes[..bytes.len() / 2]).unwrap_err();
    assert!(matches!(err, IrError::Deserialize { .. }));
}
