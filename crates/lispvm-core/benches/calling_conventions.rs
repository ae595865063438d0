//! Calling Convention Benchmarks
//!
//! Compares the cost of a call under dynamic binding with the cost of the
//! same call under positional arguments, for growing parameter counts.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use lispvm_core::bytecode::{ArgDescriptor, CodeEmitter, Instruction, Opcode};
use lispvm_core::{ByteCodeFunction, Interpreter, Value, VmConfig, VmContext};
use std::hint::black_box;
use std::sync::Arc;

const PARAM_NAMES: [&str; 8] = ["p0", "p1", "p2", "p3", "p4", "p5", "p6", "p7"];

/// Sum of all `n` parameters, read through `varref`
fn dynamic_sum(n: usize) -> Arc<ByteCodeFunction> {
    let mut e = CodeEmitter::new();
    e.emit(Instruction::new(Opcode::VarRef, 0)).unwrap();
    for i in 1..n {
        e.emit(Instruction::new(Opcode::VarRef, i as u16)).unwrap();
        e.op(Opcode::Plus).unwrap();
    }
    e.op(Opcode::Return).unwrap();

    let names = &PARAM_NAMES[..n];
    Arc::new(
        ByteCodeFunction::builder()
            .dynamic(names.iter().copied())
            .code(e.finish())
            .constants(names.iter().map(|name| Value::symbol(name)).collect())
            .max_depth(2)
            .build()
            .unwrap(),
    )
}

/// Sum of all `n` parameters, read through `stack-ref`
fn lexical_sum(n: usize) -> Arc<ByteCodeFunction> {
    let mut e = CodeEmitter::new();
    // the oldest argument sits n-1 slots below the top
    e.emit(Instruction::new(Opcode::StackRef, (n - 1) as u16)).unwrap();
    for _ in 1..n {
        e.emit(Instruction::new(Opcode::StackRef, (n - 1) as u16)).unwrap();
        e.op(Opcode::Plus).unwrap();
    }
    e.op(Opcode::Return).unwrap();

    Arc::new(
        ByteCodeFunction::builder()
            .lexical(ArgDescriptor::fixed(n as u8).unwrap())
            .code(e.finish())
            .max_depth(n + 2)
            .build()
            .unwrap(),
    )
}

fn bench_conventions(c: &mut Criterion) {
    let interpreter = Interpreter::new();
    let mut group = c.benchmark_group("calling_conventions");

    for n in [1usize, 4, 8] {
        let args: Vec<Value> = (1..=n as i64).map(Value::Int).collect();
        let expected = Value::Int((1..=n as i64).sum());

        let dynamic = dynamic_sum(n);
        let mut ctx = VmContext::with_config(VmConfig::minimal());
        assert_eq!(
            interpreter.invoke(&mut ctx, &dynamic, args.clone()).unwrap(),
            expected
        );
        group.bench_with_input(BenchmarkId::new("dynamic", n), &args, |b, args| {
            b.iter(|| {
                interpreter
                    .invoke(&mut ctx, &dynamic, black_box(args.clone()))
                    .unwrap()
            })
        });

        let lexical = lexical_sum(n);
        let mut ctx = VmContext::with_config(VmConfig::minimal());
        assert_eq!(
            interpreter.invoke(&mut ctx, &lexical, args.clone()).unwrap(),
            expected
        );
        group.bench_with_input(BenchmarkId::new("lexical", n), &args, |b, args| {
            b.iter(|| {
                interpreter
                    .invoke(&mut ctx, &lexical, black_box(args.clone()))
                    .unwrap()
            })
        });
    }

    group.finish();
}

/// Nested calls through a symbol's function cell
fn bench_call_through_symbol(c: &mut Criterion) {
    let interpreter = Interpreter::new();
    let mut ctx = VmContext::with_config(VmConfig::minimal());
    ctx.env_mut()
        .fset(
            &lispvm_core::Symbol::new("add2"),
            Value::Function(lexical_sum(2)),
        )
        .unwrap();

    // (add2 (add2 arg 1) 2)
    let caller = Arc::new(
        ByteCodeFunction::builder()
            .lexical(ArgDescriptor::fixed(1).unwrap())
            .code(vec![192, 192, 2, 193, 34, 194, 34, 135])
            .constants(vec![Value::symbol("add2"), Value::Int(1), Value::Int(2)])
            .max_depth(5)
            .build()
            .unwrap(),
    );

    c.bench_function("call_through_symbol", |b| {
        b.iter(|| {
            interpreter
                .invoke(&mut ctx, &caller, vec![black_box(Value::Int(10))])
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_conventions, bench_call_through_symbol);
criterion_main!(benches);
