//! Execution counters
//!
//! Counters are best-effort and meant for profiling and for observing the
//! cost difference between the two calling conventions. Collection can be
//! switched off through [`VmConfig::collect_stats`](crate::VmConfig).

use lispvm_bytecode::{Instruction, Opcode};
use serde::Serialize;

use crate::calling::Convention;

/// Counters accumulated by a [`VmContext`](crate::VmContext)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionStats {
    /// Total number of executed instructions
    pub instructions: u64,
    /// Instructions of the `stack-ref` family
    pub stack_refs: u64,
    /// `varref`, `varset` and `symbol-value` lookups
    pub variable_lookups: u64,
    /// Calls through the call family or the public entry points
    pub calls: u64,
    /// Activations set up with dynamic binding
    pub dynamic_activations: u64,
    /// Activations set up with positional arguments
    pub lexical_activations: u64,
    /// Calls that reached a primitive
    pub primitive_calls: u64,
    /// Bindings pushed by parameter setup or `varbind`
    pub bindings_pushed: u64,
    /// Bindings restored by `unbind` or activation exit
    pub bindings_restored: u64,
    /// Activations that ended in an error
    pub failed_activations: u64,
    /// Deepest operand stack observed
    pub max_operand_depth: usize,
    /// Deepest activation nesting observed
    pub max_call_depth: usize,
}

impl ExecutionStats {
    pub(crate) fn record(&mut self, instruction: &Instruction) {
        self.instructions = self.instructions.saturating_add(1);
        match instruction.opcode {
            Opcode::StackRef => self.stack_refs += 1,
            Opcode::VarRef | Opcode::VarSet | Opcode::SymbolValue => self.variable_lookups += 1,
            _ => {}
        }
    }

    pub(crate) fn record_activation(&mut self, convention: Convention, bound: usize, call_depth: usize) {
        match convention {
            Convention::Dynamic => self.dynamic_activations += 1,
            Convention::Lexical => self.lexical_activations += 1,
        }
        self.bindings_pushed += bound as u64;
        self.max_call_depth = self.max_call_depth.max(call_depth);
    }

    pub(crate) fn record_exit(&mut self, restored: usize, high_water: usize, failed: bool) {
        self.bindings_restored += restored as u64;
        self.max_operand_depth = self.max_operand_depth.max(high_water);
        if failed {
            self.failed_activations += 1;
        }
    }

    /// Total activations of compiled functions
    pub fn activations(&self) -> u64 {
        self.dynamic_activations + self.lexical_activations
    }

    /// Adds all counters from `other` into `self`
    pub fn add_from(&mut self, other: &Self) {
        self.instructions = self.instructions.saturating_add(other.instructions);
        self.stack_refs += other.stack_refs;
        self.variable_lookups += other.variable_lookups;
        self.calls += other.calls;
        self.dynamic_activations += other.dynamic_activations;
        self.lexical_activations += other.lexical_activations;
        self.primitive_calls += other.primitive_calls;
        self.bindings_pushed += other.bindings_pushed;
        self.bindings_restored += other.bindings_restored;
        self.failed_activations += other.failed_activations;
        self.max_operand_depth = self.max_operand_depth.max(other.max_operand_depth);
        self.max_call_depth = self.max_call_depth.max(other.max_call_depth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_instruction_classes() {
        let mut stats = ExecutionStats::default();
        stats.record(&Instruction::new(Opcode::StackRef, 1));
        stats.record(&Instruction::new(Opcode::VarRef, 0));
        stats.record(&Instruction::new(Opcode::VarBind, 0));
        stats.record(&Instruction::op(Opcode::Plus));
        assert_eq!(stats.instructions, 4);
        assert_eq!(stats.stack_refs, 1);
        assert_eq!(stats.variable_lookups, 1);
        assert_eq!(stats.bindings_pushed, 0);
    }

    #[test]
    fn test_add_from() {
        let mut a = ExecutionStats {
            calls: 2,
            max_operand_depth: 3,
            ..Default::default()
        };
        let b = ExecutionStats {
            calls: 1,
            max_operand_depth: 5,
            lexical_activations: 4,
            ..Default::default()
        };
        a.add_from(&b);
        assert_eq!(a.calls, 3);
        assert_eq!(a.max_operand_depth, 5);
        assert_eq!(a.activations(), 4);
    }
}
