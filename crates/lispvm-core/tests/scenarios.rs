//! End-to-end execution tests
//!
//! Each test builds a function object by hand, runs it through the
//! interpreter and checks the result or the failure it raises.

use std::sync::Arc;

use lispvm_core::bytecode::{ArgDescriptor, CodeEmitter, Instruction, Opcode};
use lispvm_core::{ByteCodeFunction, Interpreter, Symbol, Value, VmContext, VmError};

fn invoke(function: ByteCodeFunction, args: Vec<Value>) -> (VmContext, Result<Value, VmError>) {
    let mut ctx = VmContext::new();
    let result = Interpreter::new().invoke(&mut ctx, &Arc::new(function), args);
    (ctx, result)
}

// ============================================================================
// Reference scenarios
// ============================================================================

#[test]
fn test_constant_string() {
    let function = ByteCodeFunction::builder()
        .arglist(Value::Int(ArgDescriptor::fixed(0).unwrap().encode()))
        .code(vec![192, 135])
        .constant(Value::string("hello"))
        .max_depth(1)
        .build()
        .unwrap();

    let (_, result) = invoke(function, vec![]);
    assert_eq!(result.unwrap(), Value::string("hello"));
}

#[test]
fn test_positional_add() {
    // stack-ref 1, stack-ref 1, plus, return
    let function = ByteCodeFunction::builder()
        .lexical(ArgDescriptor::fixed(2).unwrap())
        .code(vec![1, 1, 92, 135])
        .max_depth(4)
        .build()
        .unwrap();

    let (ctx, result) = invoke(function, vec![Value::Int(3), Value::Int(4)]);
    assert_eq!(result.unwrap(), Value::Int(7));
    assert_eq!(ctx.env().binding_depth(), 0);
    assert_eq!(ctx.stats().bindings_pushed, 0);
}

#[test]
fn test_dynamic_parameters_restored() {
    // varref a, varref b, diff, return
    let function = ByteCodeFunction::builder()
        .dynamic(["a", "b"])
        .code(vec![8, 9, 90, 135])
        .constants(vec![Value::symbol("a"), Value::symbol("b")])
        .max_depth(2)
        .build()
        .unwrap();
    let function = Arc::new(function);

    let a = Symbol::new("a");
    let b = Symbol::new("b");
    let mut ctx = VmContext::new();
    ctx.env_mut().set(&a, Value::symbol("previous")).unwrap();

    let result = Interpreter::new()
        .invoke(&mut ctx, &function, vec![Value::Int(10), Value::Int(20)])
        .unwrap();
    assert_eq!(result, Value::Int(-10));

    assert_eq!(ctx.env().symbol_value(&a).unwrap(), Value::symbol("previous"));
    assert!(!ctx.env().is_bound(&b));
    assert_eq!(ctx.env().binding_depth(), 0);
}

#[test]
fn test_arity_checked_before_execution() {
    // the body would fail with an invalid opcode if it ever ran
    let function = ByteCodeFunction::builder()
        .lexical(ArgDescriptor::fixed(2).unwrap())
        .code(vec![48])
        .max_depth(2)
        .build()
        .unwrap();

    let mut ctx = VmContext::with_config(lispvm_core::VmConfig::traced(16));
    let err = Interpreter::new()
        .invoke(&mut ctx, &Arc::new(function), vec![Value::Int(1)])
        .unwrap_err();

    assert!(matches!(
        err,
        VmError::ArityMismatch {
            min: 2,
            max: Some(2),
            supplied: 1,
            ..
        }
    ));
    assert_eq!(ctx.stats().instructions, 0);
    assert!(ctx.trace().unwrap().is_empty());
}

// ============================================================================
// Checked access
// ============================================================================

#[test]
fn test_constant_index_out_of_range() {
    let function = ByteCodeFunction::builder()
        .code(vec![195, 135])
        .constant(Value::Int(1))
        .max_depth(1)
        .build()
        .unwrap();

    let (_, result) = invoke(function, vec![]);
    let err = result.unwrap_err();
    assert!(matches!(
        err.root(),
        VmError::ConstantOutOfRange { index: 3, len: 1 }
    ));
    assert!(matches!(err, VmError::Activation { pc: 0, mnemonic: "constant", .. }));
}

#[test]
fn test_stack_ref_out_of_range() {
    let function = ByteCodeFunction::builder()
        .lexical(ArgDescriptor::fixed(1).unwrap())
        .code(vec![5, 135])
        .max_depth(2)
        .build()
        .unwrap();

    let (_, result) = invoke(function, vec![Value::Int(1)]);
    assert!(matches!(
        result.unwrap_err().root(),
        VmError::StackSlotOutOfRange { slot: 5, depth: 1 }
    ));
}

#[test]
fn test_declared_depth_enforced() {
    // three pushes against a declared depth of two
    let function = ByteCodeFunction::builder()
        .code(vec![192, 192, 192, 135])
        .constant(Value::Nil)
        .max_depth(2)
        .build()
        .unwrap();

    let (_, result) = invoke(function, vec![]);
    let err = result.unwrap_err();
    assert!(matches!(err.root(), VmError::StackDepthExceeded { max: 2 }));
    assert!(matches!(err, VmError::Activation { pc: 2, .. }));
}

#[test]
fn test_return_on_empty_stack() {
    let function = ByteCodeFunction::builder().code(vec![135]).build().unwrap();
    let (_, result) = invoke(function, vec![]);
    assert!(matches!(result.unwrap_err().root(), VmError::StackUnderflow));
}

// ============================================================================
// Loops and nested calls
// ============================================================================

/// (lambda (n) (let ((acc 0)) (while (> n 0) (setq acc (+ acc n) n (1- n))) acc))
fn sum_to() -> ByteCodeFunction {
    let mut e = CodeEmitter::new();
    e.emit(Instruction::new(Opcode::Constant, 0)).unwrap(); // [n acc]
    let top = e.current_offset();
    e.emit(Instruction::new(Opcode::StackRef, 1)).unwrap();
    e.emit(Instruction::new(Opcode::Constant, 0)).unwrap();
    e.op(Opcode::Gtr).unwrap();
    let exit = e.emit_jump(Opcode::GotoIfNil).unwrap();
    e.emit(Instruction::new(Opcode::StackRef, 0)).unwrap();
    e.emit(Instruction::new(Opcode::StackRef, 2)).unwrap();
    e.op(Opcode::Plus).unwrap();
    e.emit(Instruction::new(Opcode::StackSet, 1)).unwrap(); // acc
    e.emit(Instruction::new(Opcode::StackRef, 1)).unwrap();
    e.op(Opcode::Sub1).unwrap();
    e.emit(Instruction::new(Opcode::StackSet, 2)).unwrap(); // n
    e.jump_to(Opcode::Goto, top).unwrap();
    e.patch_here(exit).unwrap();
    e.op(Opcode::Return).unwrap();

    ByteCodeFunction::builder()
        .lexical(ArgDescriptor::fixed(1).unwrap())
        .code(e.finish())
        .constant(Value::Int(0))
        .max_depth(4)
        .build()
        .unwrap()
}

#[test]
fn test_loop_with_stack_set() {
    let (ctx, result) = invoke(sum_to(), vec![Value::Int(100)]);
    assert_eq!(result.unwrap(), Value::Int(5050));
    assert!(ctx.stats().max_operand_depth <= 4);
}

#[test]
fn test_nested_call_through_symbol() {
    let mut ctx = VmContext::new();
    let sum = Value::Function(Arc::new(sum_to()));
    ctx.env_mut().fset(&Symbol::new("sum-to"), sum).unwrap();

    // (list (sum-to arg) (sum-to 3))
    let caller = ByteCodeFunction::builder()
        .lexical(ArgDescriptor::fixed(1).unwrap())
        .code(vec![192, 1, 33, 192, 193, 33, 68, 135])
        .constants(vec![Value::symbol("sum-to"), Value::Int(3)])
        .max_depth(4)
        .build()
        .unwrap();

    let result = Interpreter::new()
        .invoke(&mut ctx, &Arc::new(caller), vec![Value::Int(4)])
        .unwrap();
    assert_eq!(result, Value::list([Value::Int(10), Value::Int(6)]));
    assert_eq!(ctx.stats().lexical_activations, 3);
    assert_eq!(ctx.stats().max_call_depth, 2);
}

#[test]
fn test_list_and_concat_families() {
    // (concat "a" (upcase "b") "c"), (list x y z w v) via listN
    let strings = ByteCodeFunction::builder()
        .code(vec![192, 193, 150, 194, 81, 135])
        .constants(vec![
            Value::string("a"),
            Value::string("b"),
            Value::string("c"),
        ])
        .max_depth(3)
        .build()
        .unwrap();
    let (_, result) = invoke(strings, vec![]);
    assert_eq!(result.unwrap(), Value::string("aBc"));

    let list = ByteCodeFunction::builder()
        .lexical(ArgDescriptor::new(0, 0, true).unwrap())
        .code(vec![0, 0, 0, 0, 0, 175, 5, 135])
        .max_depth(6)
        .build()
        .unwrap();
    let (_, result) = invoke(list, vec![Value::Int(1)]);
    let rest = Value::list([Value::Int(1)]);
    assert_eq!(result.unwrap(), Value::list(vec![rest; 5]));
}
