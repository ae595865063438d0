use std::sync::Arc;

use crate::value::{Cons, Value, Vector};

/// Guard for iterative destruction of deep value graphs.
///
/// A long list is a chain of conses; dropping it recursively would use one
/// native stack frame per element. The guard instead detaches children onto
/// a work list and releases them one at a time.
pub(crate) struct DropGuard {
    pending: Vec<Value>,
}

impl DropGuard {
    /// Create an empty guard
    pub(crate) fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Queue a value for release
    pub(crate) fn push(&mut self, value: Value) {
        if value.has_children() {
            self.pending.push(value);
        }
    }

    /// Release queued values until the work list is empty
    pub(crate) fn run(mut self) {
        while let Some(value) = self.pending.pop() {
            self.process_value(value);
        }
    }

    /// Detach the children of the last reference to a container.
    ///
    /// Shared containers only lose one reference and are left intact.
    fn process_value(&mut self, value: Value) {
        match value {
            Value::Cons(cell) => {
                if let Some(mut cons) = Arc::into_inner(cell) {
                    let (car, cdr) = cons.take_parts();
                    self.push(car);
                    self.push(cdr);
                }
            }
            Value::Vector(vector) => {
                if let Some(mut vector) = Arc::into_inner(vector) {
                    for item in vector.take_items() {
                        self.push(item);
                    }
                }
            }
            _ => {}
        }
    }
}

impl Drop for Cons {
    fn drop(&mut self) {
        let (car, cdr) = self.take_parts();
        if !car.has_children() && !cdr.has_children() {
            return;
        }
        let mut guard = DropGuard::new();
        guard.push(car);
        guard.push(cdr);
        guard.run();
    }
}

impl Drop for Vector {
    fn drop(&mut self) {
        let items = self.take_items();
        if !items.iter().any(Value::has_children) {
            return;
        }
        let mut guard = DropGuard::new();
        for item in items {
            guard.push(item);
        }
        guard.run();
    }
}
