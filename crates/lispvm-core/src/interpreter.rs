//! Bytecode interpreter
//!
//! Executes function objects on an explicit frame stack: a call into a
//! compiled function pushes a [`Frame`] and `return` pops it, so nesting is
//! bounded by [`VmConfig::max_call_depth`](crate::VmConfig) rather than by
//! the native stack.

use std::sync::Arc;

use lispvm_bytecode::{Instruction, Opcode};

use crate::calling;
use crate::context::VmContext;
use crate::error::{VmError, VmResult};
use crate::function::ByteCodeFunction;
use crate::ops;
use crate::stack::OperandStack;
use crate::value::Value;

/// Flag in the `discardN` operand that keeps the top value
const DISCARD_PRESERVE_TOS: u16 = 0x80;

/// The bytecode interpreter
#[derive(Debug, Default, Clone, Copy)]
pub struct Interpreter;

/// One live activation of a compiled function
struct Frame {
    function: Arc<ByteCodeFunction>,
    stack: OperandStack,
    /// Offset of the next instruction
    pc: usize,
    /// Offset of the instruction being executed
    current: usize,
    /// Binding stack depth on entry
    base: usize,
}

/// Where a call ended up
enum Dispatch {
    /// A primitive ran to completion
    Value(Value),
    /// A compiled function is ready to run
    Frame(Frame),
}

impl Interpreter {
    /// Create a new interpreter
    pub fn new() -> Self {
        Self
    }

    /// Call `callee` with `args`.
    ///
    /// Symbols are resolved through their function cells. Compiled
    /// functions run under their own calling convention; primitives check
    /// their arity and run directly.
    pub fn call(&self, ctx: &mut VmContext, callee: &Value, args: Vec<Value>) -> VmResult<Value> {
        match self.dispatch(ctx, callee, args)? {
            Dispatch::Value(value) => Ok(value),
            Dispatch::Frame(frame) => self.run(ctx, frame),
        }
    }

    /// Run a compiled function with `args`
    pub fn invoke(
        &self,
        ctx: &mut VmContext,
        function: &Arc<ByteCodeFunction>,
        args: Vec<Value>,
    ) -> VmResult<Value> {
        if let Some(stats) = ctx.stats_mut() {
            stats.calls += 1;
        }
        let callee = Value::Function(Arc::clone(function));
        let frame = self.enter(ctx, &callee, Arc::clone(function), args)?;
        self.run(ctx, frame)
    }

    /// Resolve `callee` and either run it (primitives) or set up its frame
    fn dispatch(&self, ctx: &mut VmContext, callee: &Value, args: Vec<Value>) -> VmResult<Dispatch> {
        if let Some(stats) = ctx.stats_mut() {
            stats.calls += 1;
        }
        match ctx.env().indirect_function(callee)? {
            Value::Function(function) => self
                .enter(ctx, callee, function, args)
                .map(Dispatch::Frame),
            Value::Primitive(primitive) => {
                if let Some(stats) = ctx.stats_mut() {
                    stats.primitive_calls += 1;
                }
                primitive.call(ctx.env_mut(), &args).map(Dispatch::Value)
            }
            other => Err(VmError::InvalidFunction(other)),
        }
    }

    /// Set up one activation.
    ///
    /// When argument setup fails the activation is torn down again before
    /// the error is returned.
    fn enter(
        &self,
        ctx: &mut VmContext,
        callee: &Value,
        function: Arc<ByteCodeFunction>,
        args: Vec<Value>,
    ) -> VmResult<Frame> {
        ctx.enter()?;
        let base = ctx.env().binding_depth();
        let convention = function.params().convention();
        tracing::debug!(
            target: "lispvm::call",
            callee = %callee,
            %convention,
            args = args.len(),
            depth = ctx.call_depth(),
            "enter"
        );

        match calling::prepare(ctx.env_mut(), callee, &function, args) {
            Ok((stack, bound)) => {
                let depth = ctx.call_depth();
                if let Some(stats) = ctx.stats_mut() {
                    stats.record_activation(convention, bound, depth);
                }
                Ok(Frame {
                    function,
                    stack,
                    pc: 0,
                    current: 0,
                    base,
                })
            }
            Err(err) => {
                self.exit(ctx, base, 0, Err(&err));
                Err(err)
            }
        }
    }

    /// Tear down one activation; the binding stack is unwound to `base`
    fn exit(
        &self,
        ctx: &mut VmContext,
        base: usize,
        high_water: usize,
        result: Result<&Value, &VmError>,
    ) {
        let restored = ctx.env_mut().unbind_to(base);
        if let Some(stats) = ctx.stats_mut() {
            stats.record_exit(restored, high_water, result.is_err());
        }
        match result {
            Ok(value) => tracing::debug!(
                target: "lispvm::call",
                result = %value,
                restored,
                depth = ctx.call_depth(),
                "return"
            ),
            Err(err) => tracing::debug!(
                target: "lispvm::call",
                error = %err,
                restored,
                depth = ctx.call_depth(),
                "unwind"
            ),
        }
        ctx.leave();
    }

    /// Run `frame` and everything it calls until it returns or fails.
    ///
    /// Every activation is torn down on the way out, whichever way it ends.
    /// A callee's failure surfaces in its caller as a failure of the call
    /// instruction, so each activation wraps the error once.
    fn run(&self, ctx: &mut VmContext, mut frame: Frame) -> VmResult<Value> {
        let mut callers: Vec<Frame> = Vec::new();
        // result of a finished call, to be delivered to `frame`
        let mut resumed: Option<VmResult<Value>> = None;

        loop {
            let finished = match resumed.take() {
                Some(result) => result
                    .and_then(|value| frame.stack.push(value))
                    .err()
                    .map(|err| Err(err.at(frame.current, Opcode::Call.name()))),
                None => match self.step(ctx, &mut frame) {
                    Ok(InstructionResult::Continue | InstructionResult::Jump(_)) => None,
                    Ok(InstructionResult::Call { callee, args }) => {
                        match self.dispatch(ctx, &callee, args) {
                            Ok(Dispatch::Frame(next)) => {
                                callers.push(std::mem::replace(&mut frame, next));
                            }
                            Ok(Dispatch::Value(value)) => resumed = Some(Ok(value)),
                            Err(err) => resumed = Some(Err(err)),
                        }
                        None
                    }
                    Ok(InstructionResult::Return(value)) => Some(Ok(value)),
                    Err(err) => Some(Err(err)),
                },
            };

            let Some(result) = finished else {
                continue;
            };
            self.exit(ctx, frame.base, frame.stack.high_water(), result.as_ref());
            match callers.pop() {
                Some(caller) => {
                    frame = caller;
                    resumed = Some(result);
                }
                None => return result,
            }
        }
    }

    /// Fetch, decode and execute one instruction of `frame`.
    ///
    /// Errors come back already attributed to the failing instruction.
    fn step(&self, ctx: &mut VmContext, frame: &mut Frame) -> VmResult<InstructionResult> {
        let len = frame.function.code().len();
        let start = frame.pc;
        if start >= len {
            return Err(VmError::MissingReturn.at(start, "<end>"));
        }
        let instruction = Instruction::decode(frame.function.code(), &mut frame.pc)
            .map_err(|err| VmError::from(err).at(start, "<decode>"))?;
        frame.current = start;
        ctx.record_instruction(start, &instruction, frame.stack.depth());

        let name = instruction.opcode.name();
        match self.execute_instruction(ctx, &frame.function, &mut frame.stack, instruction, frame.base) {
            Ok(InstructionResult::Jump(target)) => {
                if target >= len {
                    let err = VmError::InvalidJump { target, len };
                    return Err(err.at(start, name));
                }
                frame.pc = target;
                Ok(InstructionResult::Jump(target))
            }
            Ok(result) => Ok(result),
            Err(err) => Err(err.at(start, name)),
        }
    }

    /// Execute a single instruction
    fn execute_instruction(
        &self,
        ctx: &mut VmContext,
        function: &ByteCodeFunction,
        stack: &mut OperandStack,
        instruction: Instruction,
        base: usize,
    ) -> VmResult<InstructionResult> {
        let n = instruction.operand as usize;
        match instruction.opcode {
            // ==================== Packed families ====================
            Opcode::StackRef => {
                let value = stack.peek(n)?.clone();
                stack.push(value)?;
            }

            Opcode::VarRef => {
                let symbol = function.constants().symbol(n)?;
                let value = ctx.env().symbol_value(&symbol)?;
                stack.push(value)?;
            }

            Opcode::VarSet => {
                let symbol = function.constants().symbol(n)?;
                let value = stack.pop()?;
                ctx.env_mut().set_bound(&symbol, value)?;
            }

            Opcode::VarBind => {
                let symbol = function.constants().symbol(n)?;
                let value = stack.pop()?;
                ctx.env_mut().bind(symbol, value)?;
                if let Some(stats) = ctx.stats_mut() {
                    stats.bindings_pushed += 1;
                }
            }

            Opcode::Call => {
                let args = stack.pop_n(n)?;
                let callee = stack.pop()?;
                return Ok(InstructionResult::Call { callee, args });
            }

            Opcode::Unbind => {
                let available = ctx.env().binding_depth().saturating_sub(base);
                if n > available {
                    return Err(VmError::UnbindUnderflow {
                        requested: n,
                        available,
                    });
                }
                ctx.env_mut().unbind(n)?;
                if let Some(stats) = ctx.stats_mut() {
                    stats.bindings_restored += n as u64;
                }
            }

            // ==================== Constants ====================
            Opcode::Constant | Opcode::Constant2 => {
                let value = function.constants().get(n)?.clone();
                stack.push(value)?;
            }

            // ==================== Control flow ====================
            Opcode::Goto => return Ok(InstructionResult::Jump(n)),

            Opcode::GotoIfNil => {
                if stack.pop()?.is_nil() {
                    return Ok(InstructionResult::Jump(n));
                }
            }

            Opcode::GotoIfNonNil => {
                if !stack.pop()?.is_nil() {
                    return Ok(InstructionResult::Jump(n));
                }
            }

            Opcode::GotoIfNilElsePop => {
                if stack.peek(0)?.is_nil() {
                    return Ok(InstructionResult::Jump(n));
                }
                stack.pop()?;
            }

            Opcode::GotoIfNonNilElsePop => {
                if !stack.peek(0)?.is_nil() {
                    return Ok(InstructionResult::Jump(n));
                }
                stack.pop()?;
            }

            Opcode::Return => return Ok(InstructionResult::Return(stack.pop()?)),

            // ==================== Stack ====================
            Opcode::Discard => {
                stack.pop()?;
            }

            Opcode::Dup => {
                let top = stack.peek(0)?.clone();
                stack.push(top)?;
            }

            Opcode::DiscardN => {
                let count = (instruction.operand & !DISCARD_PRESERVE_TOS) as usize;
                if instruction.operand & DISCARD_PRESERVE_TOS != 0 && count > 0 {
                    let top = stack.peek(0)?.clone();
                    stack.set(count, top)?;
                }
                stack.drop_n(count)?;
            }

            Opcode::StackSet | Opcode::StackSet2 => {
                let value = stack.pop()?;
                if n > 0 {
                    stack.set(n - 1, value)?;
                }
            }

            // ==================== Lists ====================
            Opcode::Car => unary(stack, Value::car)?,
            Opcode::Cdr => unary(stack, Value::cdr)?,
            Opcode::CarSafe => unary(stack, |x| Ok(ops::car_safe(x)))?,
            Opcode::CdrSafe => unary(stack, |x| Ok(ops::cdr_safe(x)))?,
            Opcode::Cons => binary(stack, |a, b| Ok(Value::cons(a.clone(), b.clone())))?,
            Opcode::List1 => list(stack, 1)?,
            Opcode::List2 => list(stack, 2)?,
            Opcode::List3 => list(stack, 3)?,
            Opcode::List4 => list(stack, 4)?,
            Opcode::ListN => list(stack, n)?,
            Opcode::Length => unary(stack, ops::length)?,
            Opcode::Nth => binary(stack, ops::nth)?,
            Opcode::Nthcdr => binary(stack, ops::nthcdr)?,
            Opcode::Elt => binary(stack, ops::elt)?,
            Opcode::Memq => binary(stack, ops::memq)?,
            Opcode::Member => binary(stack, ops::member)?,
            Opcode::Assq => binary(stack, ops::assq)?,
            Opcode::Nreverse => unary(stack, ops::nreverse)?,
            Opcode::Nconc => binary(stack, ops::nconc)?,
            Opcode::Setcar => binary(stack, |cell, value| ops::setcar(cell, value.clone()))?,
            Opcode::Setcdr => binary(stack, |cell, value| ops::setcdr(cell, value.clone()))?,

            // ==================== Predicates ====================
            Opcode::Symbolp => unary(stack, |x| Ok(ops::symbolp(x)))?,
            Opcode::Consp => unary(stack, |x| Ok(ops::consp(x)))?,
            Opcode::Stringp => unary(stack, |x| Ok(ops::stringp(x)))?,
            Opcode::Listp => unary(stack, |x| Ok(ops::listp(x)))?,
            Opcode::Numberp => unary(stack, |x| Ok(ops::numberp(x)))?,
            Opcode::Integerp => unary(stack, |x| Ok(ops::integerp(x)))?,
            Opcode::Not => unary(stack, |x| Ok(ops::not(x)))?,
            Opcode::Eq => binary(stack, |a, b| Ok(ops::eq(a, b)))?,
            Opcode::Equal => binary(stack, |a, b| Ok(ops::equal(a, b)))?,

            // ==================== Arithmetic ====================
            Opcode::Add1 => unary(stack, ops::add1)?,
            Opcode::Sub1 => unary(stack, ops::sub1)?,
            Opcode::Negate => unary(stack, ops::negate)?,
            Opcode::Plus => binary(stack, ops::plus)?,
            Opcode::Diff => binary(stack, ops::diff)?,
            Opcode::Mult => binary(stack, ops::mult)?,
            Opcode::Quo => binary(stack, ops::quo)?,
            Opcode::Rem => binary(stack, ops::rem)?,
            Opcode::Max => binary(stack, ops::max)?,
            Opcode::Min => binary(stack, ops::min)?,
            Opcode::Eqlsign => binary(stack, ops::num_eq)?,
            Opcode::Gtr => binary(stack, ops::gtr)?,
            Opcode::Lss => binary(stack, ops::lss)?,
            Opcode::Leq => binary(stack, ops::leq)?,
            Opcode::Geq => binary(stack, ops::geq)?,

            // ==================== Arrays and strings ====================
            Opcode::Aref => binary(stack, ops::aref)?,
            Opcode::Aset => {
                let value = stack.pop()?;
                binary(stack, |array, idx| ops::aset(array, idx, value))?;
            }
            Opcode::Substring => {
                let to = stack.pop()?;
                binary(stack, |seq, from| ops::substring(seq, from, &to))?;
            }
            Opcode::Concat2 => concat(stack, 2)?,
            Opcode::Concat3 => concat(stack, 3)?,
            Opcode::Concat4 => concat(stack, 4)?,
            Opcode::ConcatN => concat(stack, n)?,
            Opcode::Upcase => unary(stack, ops::upcase)?,
            Opcode::Downcase => unary(stack, ops::downcase)?,
            Opcode::StringEqlsign => binary(stack, ops::string_eq)?,
            Opcode::StringLss => binary(stack, ops::string_lss)?,

            // ==================== Symbols ====================
            Opcode::SymbolValue => {
                let symbol = stack.pop()?.expect_symbol()?;
                let value = ctx.env().symbol_value(&symbol)?;
                stack.push(value)?;
            }

            Opcode::SymbolFunction => {
                let symbol = stack.pop()?.expect_symbol()?;
                stack.push(ctx.env().symbol_function(&symbol))?;
            }

            Opcode::Set => {
                let value = stack.pop()?;
                let symbol = stack.pop()?.expect_symbol()?;
                ctx.env_mut().set(&symbol, value.clone())?;
                stack.push(value)?;
            }

            Opcode::Fset => {
                let definition = stack.pop()?;
                let symbol = stack.pop()?.expect_symbol()?;
                ctx.env_mut().fset(&symbol, definition.clone())?;
                stack.push(definition)?;
            }

            Opcode::Get => {
                let prop = stack.pop()?;
                let symbol = stack.pop()?.expect_symbol()?;
                stack.push(ctx.env().get(&symbol, &prop))?;
            }
        }
        Ok(InstructionResult::Continue)
    }
}

/// Result of executing a single instruction
#[derive(Debug)]
enum InstructionResult {
    /// Continue with the next instruction
    Continue,
    /// Continue at an absolute code offset
    Jump(usize),
    /// Leave the activation with a value
    Return(Value),
    /// Call `callee`; its result is pushed when it returns
    Call {
        /// Function designator
        callee: Value,
        /// Evaluated arguments
        args: Vec<Value>,
    },
}

fn unary(stack: &mut OperandStack, op: impl FnOnce(&Value) -> VmResult<Value>) -> VmResult<()> {
    let x = stack.pop()?;
    let result = op(&x)?;
    stack.push(result)
}

fn binary(
    stack: &mut OperandStack,
    op: impl FnOnce(&Value, &Value) -> VmResult<Value>,
) -> VmResult<()> {
    let b = stack.pop()?;
    let a = stack.pop()?;
    let result = op(&a, &b)?;
    stack.push(result)
}

fn list(stack: &mut OperandStack, n: usize) -> VmResult<()> {
    let items = stack.pop_n(n)?;
    stack.push(Value::list(items))
}

fn concat(stack: &mut OperandStack, n: usize) -> VmResult<()> {
    let parts = stack.pop_n(n)?;
    let result = ops::concat(&parts)?;
    stack.push(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VmConfig;
    use crate::value::Symbol;
    use lispvm_bytecode::{ArgDescriptor, CodeEmitter};

    fn lexical(required: u8, code: Vec<u8>, constants: Vec<Value>, depth: usize) -> Arc<ByteCodeFunction> {
        Arc::new(
            ByteCodeFunction::builder()
                .lexical(ArgDescriptor::fixed(required).unwrap())
                .code(code)
                .constants(constants)
                .max_depth(depth)
                .build()
                .unwrap(),
        )
    }

    fn run(function: &Arc<ByteCodeFunction>, args: Vec<Value>) -> VmResult<Value> {
        let mut ctx = VmContext::new();
        Interpreter::new().invoke(&mut ctx, function, args)
    }

    #[test]
    fn test_constant_return() {
        let function = lexical(0, vec![192, 135], vec![Value::Int(42)], 1);
        assert_eq!(run(&function, vec![]).unwrap(), Value::Int(42));
    }

    #[test]
    fn test_conditional_jump() {
        // (if arg 1 2)
        let mut e = CodeEmitter::new();
        e.emit(Instruction::new(Opcode::StackRef, 0)).unwrap();
        let else_jump = e.emit_jump(Opcode::GotoIfNil).unwrap();
        e.emit(Instruction::new(Opcode::Constant, 0)).unwrap();
        e.op(Opcode::Return).unwrap();
        e.patch_here(else_jump).unwrap();
        e.emit(Instruction::new(Opcode::Constant, 1)).unwrap();
        e.op(Opcode::Return).unwrap();
        let code = e.finish();

        let function = lexical(1, code, vec![Value::Int(1), Value::Int(2)], 2);
        assert_eq!(run(&function, vec![Value::t()]).unwrap(), Value::Int(1));
        assert_eq!(run(&function, vec![Value::Nil]).unwrap(), Value::Int(2));
    }

    #[test]
    fn test_else_pop_keeps_value_when_taken() {
        // (or arg 7)
        let mut e = CodeEmitter::new();
        e.emit(Instruction::new(Opcode::StackRef, 0)).unwrap();
        let done = e.emit_jump(Opcode::GotoIfNonNilElsePop).unwrap();
        e.emit(Instruction::new(Opcode::Constant, 0)).unwrap();
        e.patch_here(done).unwrap();
        e.op(Opcode::Return).unwrap();
        let function = lexical(1, e.finish(), vec![Value::Int(7)], 2);

        assert_eq!(run(&function, vec![Value::Int(3)]).unwrap(), Value::Int(3));
        assert_eq!(run(&function, vec![Value::Nil]).unwrap(), Value::Int(7));
    }

    #[test]
    fn test_discard_n_preserve_top() {
        // push 1 2 3, discardN 0x82 keeps 3 and drops two slots beneath it
        let code = vec![192, 193, 194, 182, 0x82, 135];
        let function = lexical(
            0,
            code,
            vec![Value::Int(1), Value::Int(2), Value::Int(3)],
            3,
        );
        assert_eq!(run(&function, vec![]).unwrap(), Value::Int(3));

        // without the flag the bottom value survives
        let function = lexical(
            0,
            vec![192, 193, 194, 182, 2, 135],
            vec![Value::Int(1), Value::Int(2), Value::Int(3)],
            3,
        );
        assert_eq!(run(&function, vec![]).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_stack_set() {
        // args (a b): store b into a, drop b, return a
        let code = vec![0, 178, 2, 136, 135];
        let function = lexical(2, code, vec![], 3);
        assert_eq!(
            run(&function, vec![Value::Int(1), Value::Int(2)]).unwrap(),
            Value::Int(2)
        );
    }

    #[test]
    fn test_missing_return() {
        let function = lexical(0, vec![192], vec![Value::Nil], 1);
        let err = run(&function, vec![]).unwrap_err();
        assert!(matches!(err.root(), VmError::MissingReturn));
        assert!(matches!(err, VmError::Activation { pc: 1, mnemonic: "<end>", .. }));
    }

    #[test]
    fn test_jump_out_of_range() {
        let function = lexical(0, vec![130, 0x10, 0x00], vec![], 0);
        let err = run(&function, vec![]).unwrap_err();
        assert!(matches!(err.root(), VmError::InvalidJump { target: 16, len: 3 }));
    }

    #[test]
    fn test_invalid_opcode() {
        let function = lexical(0, vec![48], vec![], 0);
        let err = run(&function, vec![]).unwrap_err();
        assert!(matches!(
            err.root(),
            VmError::Bytecode(lispvm_bytecode::BytecodeError::InvalidOpcode { opcode: 48, .. })
        ));
    }

    #[test]
    fn test_varbind_and_unbind() {
        // (let ((x 5)) x) under dynamic binding, leaving x unbound afterwards
        let code = vec![193, 24, 8, 41, 135];
        let function = lexical(0, code, vec![Value::symbol("x"), Value::Int(5)], 2);
        let mut ctx = VmContext::new();
        let result = Interpreter::new().invoke(&mut ctx, &function, vec![]).unwrap();
        assert_eq!(result, Value::Int(5));
        assert!(!ctx.env().is_bound(&Symbol::new("x")));
        assert_eq!(ctx.env().binding_depth(), 0);
    }

    #[test]
    fn test_unbind_past_activation() {
        let mut ctx = VmContext::new();
        ctx.env_mut().bind(Symbol::new("outer"), Value::Int(1)).unwrap();
        let function = lexical(0, vec![41, 192, 135], vec![Value::Nil], 1);
        let err = Interpreter::new()
            .invoke(&mut ctx, &function, vec![])
            .unwrap_err();
        assert!(matches!(
            err.root(),
            VmError::UnbindUnderflow {
                requested: 1,
                available: 0
            }
        ));
        assert_eq!(ctx.env().binding_depth(), 1);
    }

    #[test]
    fn test_call_primitive_by_symbol() {
        // (cons arg 'tail)
        let code = vec![192, 1, 193, 34, 135];
        let function = lexical(
            1,
            code,
            vec![Value::symbol("cons"), Value::symbol("tail")],
            4,
        );
        let mut ctx = VmContext::new();
        let result = Interpreter::new()
            .invoke(&mut ctx, &function, vec![Value::Int(1)])
            .unwrap();
        assert_eq!(result, Value::cons(Value::Int(1), Value::symbol("tail")));
        assert_eq!(ctx.stats().primitive_calls, 1);
        assert_eq!(ctx.stats().calls, 2);
    }

    #[test]
    fn test_call_void_function() {
        let function = lexical(0, vec![192, 32, 135], vec![Value::symbol("nowhere")], 1);
        let err = run(&function, vec![]).unwrap_err();
        assert!(matches!(err.root(), VmError::VoidFunction(s) if s.name() == "nowhere"));
        assert!(matches!(err, VmError::Activation { mnemonic: "call", .. }));
    }

    #[test]
    fn test_call_non_function() {
        let mut ctx = VmContext::new();
        let err = Interpreter::new()
            .call(&mut ctx, &Value::Int(3), vec![])
            .unwrap_err();
        assert!(matches!(err, VmError::InvalidFunction(Value::Int(3))));
    }

    #[test]
    fn test_set_and_symbol_value() {
        // (progn (set 'g 9) (symbol-value 'g))
        let code = vec![192, 193, 76, 136, 192, 74, 135];
        let function = lexical(0, code, vec![Value::symbol("g"), Value::Int(9)], 2);
        let mut ctx = VmContext::with_config(VmConfig::default());
        let result = Interpreter::new().invoke(&mut ctx, &function, vec![]).unwrap();
        assert_eq!(result, Value::Int(9));
        assert_eq!(ctx.env().symbol_value(&Symbol::new("g")).unwrap(), Value::Int(9));
    }
}
