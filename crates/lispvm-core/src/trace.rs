//! Instruction trace capture
//!
//! When enabled, the interpreter records the last N executed instructions in
//! a ring buffer. The buffer survives an error, so it shows the instructions
//! that led to a failure.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration for trace capture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Whether tracing is enabled
    pub enabled: bool,
    /// Size of ring buffer for recent instructions
    pub ring_buffer_size: usize,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ring_buffer_size: 100,
        }
    }
}

/// Single trace entry capturing instruction execution state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceEntry {
    /// Sequential instruction number
    pub instruction_number: u64,
    /// Byte offset of the instruction
    pub pc: usize,
    /// Opcode mnemonic
    pub opcode: &'static str,
    /// Resolved operand
    pub operand: u16,
    /// Operand-stack depth before the instruction ran
    pub stack_depth: usize,
    /// Nesting depth of the activation
    pub call_depth: usize,
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>8}  {:>2}  {:>6}  {:<26} {:>5}  depth={}",
            self.instruction_number,
            self.call_depth,
            self.pc,
            self.opcode,
            self.operand,
            self.stack_depth
        )
    }
}

/// Ring buffer for storing recent trace entries
#[derive(Debug)]
pub struct TraceRingBuffer {
    entries: Vec<TraceEntry>,
    capacity: usize,
    head: usize,
    full: bool,
}

impl TraceRingBuffer {
    /// Create new ring buffer with given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
            head: 0,
            full: false,
        }
    }

    /// Push new entry into ring buffer
    pub fn push(&mut self, entry: TraceEntry) {
        if self.capacity == 0 {
            return;
        }
        if self.full {
            self.entries[self.head] = entry;
            self.head = (self.head + 1) % self.capacity;
        } else {
            self.entries.push(entry);
            if self.entries.len() == self.capacity {
                self.full = true;
            }
        }
    }

    /// Iterate over entries in chronological order (oldest first)
    pub fn iter(&self) -> impl Iterator<Item = &TraceEntry> {
        let (newer, older) = self.entries.split_at(if self.full { self.head } else { 0 });
        older.iter().chain(newer.iter())
    }

    /// Get number of entries currently stored
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get capacity of buffer
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
        self.head = 0;
        self.full = false;
    }

    /// One line per entry, oldest first
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for entry in self.iter() {
            out.push_str(&entry.to_string());
            out.push('\n');
        }
        out
    }

    /// Entries as a JSON array, oldest first
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.iter().collect::<Vec<_>>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: u64) -> TraceEntry {
        TraceEntry {
            instruction_number: n,
            pc: n as usize,
            opcode: "dup",
            operand: 0,
            stack_depth: 1,
            call_depth: 1,
        }
    }

    #[test]
    fn test_ring_buffer_wraps() {
        let mut buffer = TraceRingBuffer::new(3);
        for n in 0..5 {
            buffer.push(entry(n));
        }
        assert_eq!(buffer.len(), 3);
        let numbers: Vec<u64> = buffer.iter().map(|e| e.instruction_number).collect();
        assert_eq!(numbers, vec![2, 3, 4]);
    }

    #[test]
    fn test_ring_buffer_partial() {
        let mut buffer = TraceRingBuffer::new(4);
        buffer.push(entry(7));
        buffer.push(entry(8));
        let numbers: Vec<u64> = buffer.iter().map(|e| e.instruction_number).collect();
        assert_eq!(numbers, vec![7, 8]);
        assert_eq!(buffer.dump().lines().count(), 2);
    }

    #[test]
    fn test_zero_capacity() {
        let mut buffer = TraceRingBuffer::new(0);
        buffer.push(entry(1));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_json_dump() {
        let mut buffer = TraceRingBuffer::new(2);
        buffer.push(entry(1));
        let json = buffer.to_json().unwrap();
        assert!(json.contains("\"opcode\": \"dup\""));
    }
}
