//! VM execution context
//!
//! The context holds everything one logical thread of execution owns: the
//! symbol environment with its binding stack, counters, the trace buffer and
//! the activation nesting depth. Nothing here is shared between contexts.

use lispvm_bytecode::Instruction;

use crate::binding::Environment;
use crate::config::VmConfig;
use crate::error::{VmError, VmResult};
use crate::stats::ExecutionStats;
use crate::trace::{TraceEntry, TraceRingBuffer};

/// VM execution context
#[derive(Debug)]
pub struct VmContext {
    env: Environment,
    config: VmConfig,
    stats: ExecutionStats,
    trace: Option<TraceRingBuffer>,
    call_depth: usize,
    instruction_number: u64,
}

impl VmContext {
    /// Context with the default configuration and the built-in primitives
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    /// Context with a custom configuration and the built-in primitives
    pub fn with_config(config: VmConfig) -> Self {
        Self::with_environment(Environment::with_primitives(), config)
    }

    /// Context over an existing environment
    pub fn with_environment(env: Environment, config: VmConfig) -> Self {
        let trace = config
            .trace
            .enabled
            .then(|| TraceRingBuffer::new(config.trace.ring_buffer_size));
        Self {
            env,
            config,
            stats: ExecutionStats::default(),
            trace,
            call_depth: 0,
            instruction_number: 0,
        }
    }

    /// Symbol environment
    #[inline]
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Mutable symbol environment
    #[inline]
    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Configuration
    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Counters collected so far
    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }

    /// Return the counters and reset them
    pub fn take_stats(&mut self) -> ExecutionStats {
        std::mem::take(&mut self.stats)
    }

    /// Recent instructions, when tracing is enabled
    pub fn trace(&self) -> Option<&TraceRingBuffer> {
        self.trace.as_ref()
    }

    /// Current activation nesting depth
    #[inline]
    pub fn call_depth(&self) -> usize {
        self.call_depth
    }

    #[inline]
    pub(crate) fn stats_mut(&mut self) -> Option<&mut ExecutionStats> {
        self.config.collect_stats.then_some(&mut self.stats)
    }

    /// Enter a nested activation
    pub(crate) fn enter(&mut self) -> VmResult<()> {
        if self.call_depth >= self.config.max_call_depth {
            return Err(VmError::ExcessiveNesting(self.config.max_call_depth));
        }
        self.call_depth += 1;
        Ok(())
    }

    /// Leave the innermost activation
    pub(crate) fn leave(&mut self) {
        self.call_depth = self.call_depth.saturating_sub(1);
    }

    /// Account for one decoded instruction
    #[inline]
    pub(crate) fn record_instruction(&mut self, pc: usize, instruction: &Instruction, stack_depth: usize) {
        if self.config.collect_stats {
            self.stats.record(instruction);
        }
        if let Some(trace) = &mut self.trace {
            self.instruction_number += 1;
            tracing::trace!(
                target: "lispvm::exec",
                pc,
                op = %instruction,
                depth = stack_depth,
                "step"
            );
            trace.push(TraceEntry {
                instruction_number: self.instruction_number,
                pc,
                opcode: instruction.opcode.name(),
                operand: instruction.operand,
                stack_depth,
                call_depth: self.call_depth,
            });
        }
    }
}

impl Default for VmContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nesting_limit() {
        let mut ctx = VmContext::with_config(VmConfig::default().with_max_call_depth(2));
        ctx.enter().unwrap();
        ctx.enter().unwrap();
        assert!(matches!(ctx.enter(), Err(VmError::ExcessiveNesting(2))));
        ctx.leave();
        assert_eq!(ctx.call_depth(), 1);
    }

    #[test]
    fn test_stats_disabled() {
        let mut ctx = VmContext::with_config(VmConfig::minimal());
        assert!(ctx.stats_mut().is_none());
        ctx.record_instruction(0, &Instruction::op(lispvm_bytecode::Opcode::Dup), 0);
        assert_eq!(ctx.stats().instructions, 0);
        assert!(ctx.trace().is_none());
    }

    #[test]
    fn test_trace_enabled() {
        let mut ctx = VmContext::with_config(VmConfig::traced(8));
        ctx.record_instruction(3, &Instruction::op(lispvm_bytecode::Opcode::Dup), 1);
        let trace = ctx.trace().unwrap();
        assert_eq!(trace.len(), 1);
        assert_eq!(trace.iter().next().unwrap().pc, 3);
    }
}
