//! Symbol environment and binding stack
//!
//! The environment is an explicit value passed to the interpreter instead of
//! process-wide state, so independent machines never share bindings.
//!
//! Each symbol has three cells: a value cell (the dynamic binding), a
//! function cell and a property list. `varbind` saves the previous content of
//! the value cell on the [`BindingStack`]; `unbind` restores it exactly,
//! including the case where the symbol had no value before.

use rustc_hash::FxHashMap;

use crate::error::{VmError, VmResult};
use crate::primitives;
use crate::value::{Symbol, Value};

/// Longest chain of symbol aliases followed by [`Environment::indirect_function`]
const MAX_FUNCTION_INDIRECTION: usize = 100;

/// One saved value cell
#[derive(Debug, Clone)]
pub struct SpecBinding {
    /// Rebound symbol
    pub symbol: Symbol,
    /// Value before the binding, `None` when the symbol was void
    pub previous: Option<Value>,
}

/// Stack of saved value cells, innermost last
#[derive(Debug, Default)]
pub struct BindingStack {
    entries: Vec<SpecBinding>,
}

impl BindingStack {
    /// Number of live bindings
    #[inline]
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no live bindings
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Live bindings, outermost first
    pub fn iter(&self) -> impl Iterator<Item = &SpecBinding> {
        self.entries.iter()
    }
}

/// Symbol cells plus the binding stack
#[derive(Debug, Default)]
pub struct Environment {
    values: FxHashMap<Symbol, Value>,
    functions: FxHashMap<Symbol, Value>,
    plists: FxHashMap<Symbol, Vec<(Value, Value)>>,
    bindings: BindingStack,
}

impl Environment {
    /// Create an empty environment with no functions defined
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an environment whose function cells hold the built-in primitives
    pub fn with_primitives() -> Self {
        let mut env = Self::new();
        for primitive in primitives::PRIMITIVES {
            env.functions
                .insert(Symbol::new(primitive.name), Value::Primitive(primitive));
        }
        env
    }

    // ==================== Value cells ====================

    /// Current value of `symbol`, or `None` when void.
    ///
    /// `nil`, `t` and keywords evaluate to themselves.
    pub fn lookup(&self, symbol: &Symbol) -> Option<Value> {
        if symbol.is_constant() {
            return Some(Value::from(symbol.clone()));
        }
        self.values.get(symbol).cloned()
    }

    /// Current value of `symbol`
    pub fn symbol_value(&self, symbol: &Symbol) -> VmResult<Value> {
        self.lookup(symbol)
            .ok_or_else(|| VmError::VoidVariable(symbol.clone()))
    }

    /// Whether `symbol` has a value
    pub fn is_bound(&self, symbol: &Symbol) -> bool {
        symbol.is_constant() || self.values.contains_key(symbol)
    }

    /// Store into the value cell, creating a global value if needed
    pub fn set(&mut self, symbol: &Symbol, value: Value) -> VmResult<()> {
        if symbol.is_constant() {
            return Err(VmError::SettingConstant(symbol.clone()));
        }
        self.values.insert(symbol.clone(), value);
        Ok(())
    }

    /// Store into a value cell that must already hold a value
    pub fn set_bound(&mut self, symbol: &Symbol, value: Value) -> VmResult<()> {
        if symbol.is_constant() {
            return Err(VmError::SettingConstant(symbol.clone()));
        }
        match self.values.get_mut(symbol) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(VmError::VoidVariable(symbol.clone())),
        }
    }

    /// Remove the value of `symbol`
    pub fn make_unbound(&mut self, symbol: &Symbol) -> VmResult<()> {
        if symbol.is_constant() {
            return Err(VmError::SettingConstant(symbol.clone()));
        }
        self.values.remove(symbol);
        Ok(())
    }

    // ==================== Binding stack ====================

    /// Give `symbol` a new dynamic value, saving the old one
    pub fn bind(&mut self, symbol: Symbol, value: Value) -> VmResult<()> {
        if symbol.is_constant() {
            return Err(VmError::SettingConstant(symbol));
        }
        tracing::trace!(target: "lispvm::bind", symbol = %symbol, "bind");
        let previous = self.values.insert(symbol.clone(), value);
        self.bindings.entries.push(SpecBinding { symbol, previous });
        Ok(())
    }

    /// Undo the `n` innermost bindings
    pub fn unbind(&mut self, n: usize) -> VmResult<()> {
        let available = self.bindings.depth();
        if n > available {
            return Err(VmError::UnbindUnderflow {
                requested: n,
                available,
            });
        }
        self.unbind_to(available - n);
        Ok(())
    }

    /// Undo bindings until only `depth` remain; returns how many were undone
    pub fn unbind_to(&mut self, depth: usize) -> usize {
        let mut restored = 0;
        while self.bindings.depth() > depth {
            let Some(SpecBinding { symbol, previous }) = self.bindings.entries.pop() else {
                break;
            };
            tracing::trace!(target: "lispvm::bind", symbol = %symbol, "unbind");
            match previous {
                Some(value) => {
                    self.values.insert(symbol, value);
                }
                None => {
                    self.values.remove(&symbol);
                }
            }
            restored += 1;
        }
        restored
    }

    /// Number of live bindings
    #[inline]
    pub fn binding_depth(&self) -> usize {
        self.bindings.depth()
    }

    /// The binding stack
    pub fn bindings(&self) -> &BindingStack {
        &self.bindings
    }

    // ==================== Function cells ====================

    /// Content of the function cell, `nil` when empty
    pub fn symbol_function(&self, symbol: &Symbol) -> Value {
        self.functions.get(symbol).cloned().unwrap_or_default()
    }

    /// Whether the function cell is non-empty
    pub fn is_fbound(&self, symbol: &Symbol) -> bool {
        self.functions.get(symbol).is_some_and(|def| !def.is_nil())
    }

    /// Store into the function cell; storing `nil` empties it
    pub fn fset(&mut self, symbol: &Symbol, definition: Value) -> VmResult<()> {
        if symbol.is_nil() && !definition.is_nil() {
            return Err(VmError::SettingConstant(symbol.clone()));
        }
        if definition.is_nil() {
            self.functions.remove(symbol);
        } else {
            self.functions.insert(symbol.clone(), definition);
        }
        Ok(())
    }

    /// Follow symbol aliases through function cells.
    ///
    /// Non-symbols are returned unchanged.
    pub fn indirect_function(&self, callee: &Value) -> VmResult<Value> {
        let mut current = callee.clone();
        for _ in 0..MAX_FUNCTION_INDIRECTION {
            let Some(symbol) = current.as_symbol() else {
                return Ok(current);
            };
            match self.functions.get(&symbol) {
                Some(definition) => current = definition.clone(),
                None => return Err(VmError::VoidFunction(symbol)),
            }
        }
        Err(VmError::InvalidFunction(callee.clone()))
    }

    // ==================== Property lists ====================

    /// Property `prop` of `symbol`, compared with `eq`
    pub fn get(&self, symbol: &Symbol, prop: &Value) -> Value {
        self.plists
            .get(symbol)
            .and_then(|plist| plist.iter().find(|(key, _)| key.is_eq(prop)))
            .map(|(_, value)| value.clone())
            .unwrap_or_default()
    }

    /// Set property `prop` of `symbol`
    pub fn put(&mut self, symbol: &Symbol, prop: Value, value: Value) {
        let plist = self.plists.entry(symbol.clone()).or_default();
        match plist.iter_mut().find(|(key, _)| key.is_eq(&prop)) {
            Some((_, slot)) => *slot = value,
            None => plist.push((prop, value)),
        }
    }

    /// Property list of `symbol` as a flat list
    pub fn symbol_plist(&self, symbol: &Symbol) -> Value {
        let items = self
            .plists
            .get(symbol)
            .map(|plist| {
                plist
                    .iter()
                    .flat_map(|(key, value)| [key.clone(), value.clone()])
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        Value::list(items)
    }
}
