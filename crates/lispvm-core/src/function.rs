//! Compiled function objects
//!
//! A function object is immutable once built. Its parameter list is resolved
//! into a [`ParamSpec`] at construction, so a call only branches on the tag
//! instead of re-inspecting the raw arglist.

use std::sync::Arc;

use lispvm_bytecode::{ArgDescriptor, Datum, DocLiteral, FunctionLiteral};

use crate::calling::Convention;
use crate::constant::ConstantPool;
use crate::error::{VmError, VmResult};
use crate::value::{Symbol, Value};

const OPTIONAL_MARKER: &str = "&optional";
const REST_MARKER: &str = "&rest";

/// Parameter names of a function called with dynamic binding
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgList {
    required: Vec<Symbol>,
    optional: Vec<Symbol>,
    rest: Option<Symbol>,
}

impl ArgList {
    /// Create a name list, rejecting names that cannot be bound
    pub fn new(required: Vec<Symbol>, optional: Vec<Symbol>, rest: Option<Symbol>) -> VmResult<Self> {
        for name in required.iter().chain(&optional).chain(&rest) {
            check_param_name(name)?;
        }
        Ok(Self {
            required,
            optional,
            rest,
        })
    }

    /// Parse a list such as `(a b &optional c &rest d)`
    pub fn parse(arglist: &Value) -> VmResult<Self> {
        #[derive(Clone, Copy)]
        enum Section {
            Required,
            Optional,
            Rest,
            Done,
        }

        let names = arglist
            .list_to_vec()
            .map_err(|_| VmError::MalformedArgList(arglist.to_string()))?;
        let mut list = Self::default();
        let mut section = Section::Required;
        let malformed = || VmError::MalformedArgList(arglist.to_string());

        for name in &names {
            let sym = name.as_symbol().ok_or_else(malformed)?;
            match (sym.name(), section) {
                (OPTIONAL_MARKER, Section::Required) => section = Section::Optional,
                (REST_MARKER, Section::Required | Section::Optional) => section = Section::Rest,
                (OPTIONAL_MARKER | REST_MARKER, _) | (_, Section::Done) => return Err(malformed()),
                (_, Section::Required) => list.required.push(check_param_name(&sym)?),
                (_, Section::Optional) => list.optional.push(check_param_name(&sym)?),
                (_, Section::Rest) => {
                    list.rest = Some(check_param_name(&sym)?);
                    section = Section::Done;
                }
            }
        }

        if matches!(section, Section::Rest) {
            return Err(malformed());
        }
        Ok(list)
    }

    /// Required parameter names
    pub fn required(&self) -> &[Symbol] {
        &self.required
    }

    /// Optional parameter names
    pub fn optional(&self) -> &[Symbol] {
        &self.optional
    }

    /// Rest parameter name
    pub fn rest(&self) -> Option<&Symbol> {
        self.rest.as_ref()
    }

    /// Minimum accepted argument count
    pub fn min_args(&self) -> usize {
        self.required.len()
    }

    /// Maximum accepted argument count, `None` with a rest parameter
    pub fn max_args(&self) -> Option<usize> {
        match self.rest {
            Some(_) => None,
            None => Some(self.required.len() + self.optional.len()),
        }
    }

    /// Number of bindings a call pushes
    pub fn binding_count(&self) -> usize {
        self.required.len() + self.optional.len() + usize::from(self.rest.is_some())
    }

    /// The list form, with markers
    pub fn to_value(&self) -> Value {
        let mut items: Vec<Value> = self.required.iter().cloned().map(Value::from).collect();
        if !self.optional.is_empty() {
            items.push(Value::symbol(OPTIONAL_MARKER));
            items.extend(self.optional.iter().cloned().map(Value::from));
        }
        if let Some(rest) = &self.rest {
            items.push(Value::symbol(REST_MARKER));
            items.push(Value::from(rest.clone()));
        }
        Value::list(items)
    }
}

fn check_param_name(name: &Symbol) -> VmResult<Symbol> {
    if name.is_constant() {
        return Err(VmError::SettingConstant(name.clone()));
    }
    Ok(name.clone())
}

/// Resolved parameter descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamSpec {
    /// Name list; arguments are dynamically bound
    Dynamic(ArgList),
    /// Packed count; arguments stay positional on the operand stack
    Lexical(ArgDescriptor),
}

impl ParamSpec {
    /// Resolve the raw arglist slot: an integer is a packed descriptor, a
    /// list (including `nil`) is a name list
    pub fn from_value(arglist: &Value) -> VmResult<Self> {
        match arglist {
            Value::Int(raw) => Ok(Self::Lexical(ArgDescriptor::decode(*raw)?)),
            v if v.is_list() => Ok(Self::Dynamic(ArgList::parse(v)?)),
            other => Err(VmError::MalformedArgList(other.to_string())),
        }
    }

    /// The raw arglist slot
    pub fn to_value(&self) -> Value {
        match self {
            Self::Dynamic(list) => list.to_value(),
            Self::Lexical(desc) => Value::Int(desc.encode()),
        }
    }

    /// Calling convention selected by this descriptor
    #[inline]
    pub fn convention(&self) -> Convention {
        match self {
            Self::Dynamic(_) => Convention::Dynamic,
            Self::Lexical(_) => Convention::Lexical,
        }
    }

    /// Minimum accepted argument count
    pub fn min_args(&self) -> usize {
        match self {
            Self::Dynamic(list) => list.min_args(),
            Self::Lexical(desc) => desc.required(),
        }
    }

    /// Maximum accepted argument count, `None` with a rest parameter
    pub fn max_args(&self) -> Option<usize> {
        match self {
            Self::Dynamic(list) => list.max_args(),
            Self::Lexical(desc) => desc.max_args(),
        }
    }
}

/// An immutable compiled function
#[derive(Debug)]
pub struct ByteCodeFunction {
    params: ParamSpec,
    code: Box<[u8]>,
    constants: ConstantPool,
    max_depth: usize,
    doc: Option<DocLiteral>,
    interactive: Option<Value>,
}

impl ByteCodeFunction {
    /// Start building a function
    pub fn builder() -> FunctionBuilder {
        FunctionBuilder::new()
    }

    /// Resolved parameter descriptor
    #[inline]
    pub fn params(&self) -> &ParamSpec {
        &self.params
    }

    /// Instruction stream
    #[inline]
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Constant pool
    #[inline]
    pub fn constants(&self) -> &ConstantPool {
        &self.constants
    }

    /// Declared maximum operand-stack depth
    #[inline]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Documentation slot
    pub fn doc(&self) -> Option<&DocLiteral> {
        self.doc.as_ref()
    }

    /// Interactive form; never executed by the engine
    pub fn interactive(&self) -> Option<&Value> {
        self.interactive.as_ref()
    }

    /// Convert from the serialized literal shape
    pub fn from_literal(literal: &FunctionLiteral) -> VmResult<Self> {
        let mut builder = Self::builder()
            .arglist(value_from_datum(&literal.arglist)?)
            .code(literal.code.clone())
            .constants(
                literal
                    .constants
                    .iter()
                    .map(value_from_datum)
                    .collect::<VmResult<Vec<_>>>()?,
            )
            .max_depth(literal.max_depth as usize);
        if let Some(doc) = &literal.doc {
            builder = builder.doc(doc.clone());
        }
        if let Some(interactive) = &literal.interactive {
            builder = builder.interactive(value_from_datum(interactive)?);
        }
        builder.build()
    }

    /// Convert to the serialized literal shape
    pub fn to_literal(&self) -> VmResult<FunctionLiteral> {
        let max_depth = u32::try_from(self.max_depth).map_err(|_| {
            VmError::InvalidFunctionObject(format!("max depth {} too large", self.max_depth))
        })?;
        Ok(FunctionLiteral {
            arglist: value_to_datum(&self.params.to_value())?,
            code: self.code.to_vec(),
            constants: self
                .constants
                .iter()
                .map(value_to_datum)
                .collect::<VmResult<_>>()?,
            max_depth,
            doc: self.doc.clone(),
            interactive: self.interactive.as_ref().map(value_to_datum).transpose()?,
        })
    }
}

/// Builder for [`ByteCodeFunction`]
#[derive(Debug, Clone)]
pub struct FunctionBuilder {
    arglist: Value,
    code: Vec<u8>,
    constants: Vec<Value>,
    max_depth: usize,
    doc: Option<DocLiteral>,
    interactive: Option<Value>,
}

impl FunctionBuilder {
    /// New builder for a function of no arguments
    pub fn new() -> Self {
        Self {
            arglist: Value::Int(0),
            code: Vec::new(),
            constants: Vec::new(),
            max_depth: 0,
            doc: None,
            interactive: None,
        }
    }

    /// Raw arglist slot, resolved by [`FunctionBuilder::build`]
    pub fn arglist(mut self, arglist: Value) -> Self {
        self.arglist = arglist;
        self
    }

    /// Packed descriptor for positional arguments
    pub fn lexical(mut self, desc: ArgDescriptor) -> Self {
        self.arglist = Value::Int(desc.encode());
        self
    }

    /// Parameter names for dynamically bound arguments, markers included
    pub fn dynamic<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        self.arglist = Value::list(names.into_iter().map(Value::symbol));
        self
    }

    /// Instruction stream
    pub fn code(mut self, code: Vec<u8>) -> Self {
        self.code = code;
        self
    }

    /// Constant pool
    pub fn constants(mut self, constants: Vec<Value>) -> Self {
        self.constants = constants;
        self
    }

    /// Append one constant
    pub fn constant(mut self, constant: Value) -> Self {
        self.constants.push(constant);
        self
    }

    /// Declared maximum operand-stack depth
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Documentation slot
    pub fn doc(mut self, doc: DocLiteral) -> Self {
        self.doc = Some(doc);
        self
    }

    /// Interactive form
    pub fn interactive(mut self, form: Value) -> Self {
        self.interactive = Some(form);
        self
    }

    /// Resolve the parameter descriptor and freeze the function
    pub fn build(self) -> VmResult<ByteCodeFunction> {
        Ok(ByteCodeFunction {
            params: ParamSpec::from_value(&self.arglist)?,
            code: self.code.into_boxed_slice(),
            constants: ConstantPool::new(self.constants),
            max_depth: self.max_depth,
            doc: self.doc,
            interactive: self.interactive,
        })
    }

    /// Build and wrap as a value
    pub fn build_value(self) -> VmResult<Value> {
        Ok(Value::Function(Arc::new(self.build()?)))
    }
}

impl Default for FunctionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a serialized constant into a runtime value
pub fn value_from_datum(datum: &Datum) -> VmResult<Value> {
    Ok(match datum {
        Datum::Nil => Value::Nil,
        Datum::Int(n) => Value::Int(*n),
        Datum::Float(n) => Value::Float(*n),
        Datum::Str(bytes) => Value::bytes(bytes.clone()),
        Datum::Symbol(name) => Value::symbol(name),
        Datum::List(items) => Value::list(
            items
                .iter()
                .map(value_from_datum)
                .collect::<VmResult<Vec<_>>>()?,
        ),
        Datum::Dotted(items, tail) => Value::list_with_tail(
            items
                .iter()
                .map(value_from_datum)
                .collect::<VmResult<Vec<_>>>()?,
            value_from_datum(tail)?,
        ),
        Datum::Vector(items) => Value::vector(
            items
                .iter()
                .map(value_from_datum)
                .collect::<VmResult<Vec<_>>>()?,
        ),
        Datum::Function(literal) => {
            Value::Function(Arc::new(ByteCodeFunction::from_literal(literal)?))
        }
    })
}

/// Convert a runtime value into its serialized form.
///
/// Primitives and circular lists have no serialized form.
pub fn value_to_datum(value: &Value) -> VmResult<Datum> {
    Ok(match value {
        Value::Nil => Datum::Nil,
        Value::Int(n) => Datum::Int(*n),
        Value::Float(n) => Datum::Float(*n),
        Value::Str(bytes) => Datum::Str(bytes.to_vec()),
        Value::Symbol(sym) => Datum::Symbol(sym.name().to_string()),
        Value::Cons(_) => {
            let (items, tail) = value.list_parts().ok_or_else(|| {
                VmError::InvalidFunctionObject("circular list in constant".to_string())
            })?;
            let items = items
                .iter()
                .map(value_to_datum)
                .collect::<VmResult<Vec<_>>>()?;
            if tail.is_nil() {
                Datum::List(items)
            } else {
                Datum::Dotted(items, Box::new(value_to_datum(&tail)?))
            }
        }
        Value::Vector(items) => Datum::Vector(
            items
                .to_vec()
                .iter()
                .map(value_to_datum)
                .collect::<VmResult<Vec<_>>>()?,
        ),
        Value::Function(function) => Datum::Function(Box::new(function.to_literal()?)),
        Value::Primitive(primitive) => {
            return Err(VmError::InvalidFunctionObject(format!(
                "primitive {} is not serializable",
                primitive.name
            )));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[Symbol]) -> Vec<&str> {
        list.iter().map(Symbol::name).collect()
    }

    #[test]
    fn test_parse_arglist_sections() {
        let arglist = Value::list(
            ["a", "b", "&optional", "c", "&rest", "d"]
                .into_iter()
                .map(Value::symbol),
        );
        let list = ArgList::parse(&arglist).unwrap();
        assert_eq!(names(list.required()), vec!["a", "b"]);
        assert_eq!(names(list.optional()), vec!["c"]);
        assert_eq!(list.rest().map(Symbol::name), Some("d"));
        assert_eq!(list.min_args(), 2);
        assert_eq!(list.max_args(), None);
        assert_eq!(list.binding_count(), 4);
        assert_eq!(list.to_value(), arglist);
    }

    #[test]
    fn test_parse_malformed_arglists() {
        let parse = |items: &[&str]| ArgList::parse(&Value::list(items.iter().map(|s| Value::symbol(s))));
        assert!(parse(&["&rest"]).is_err());
        assert!(parse(&["&rest", "a", "b"]).is_err());
        assert!(parse(&["&optional", "a", "&optional", "b"]).is_err());
        assert!(parse(&["&rest", "a", "&optional", "b"]).is_err());
        assert!(matches!(parse(&["t"]), Err(VmError::SettingConstant(_))));
        assert!(ArgList::parse(&Value::list([Value::Int(1)])).is_err());
        assert!(ArgList::parse(&Value::cons(Value::symbol("a"), Value::symbol("b"))).is_err());
    }

    #[test]
    fn test_param_spec_resolution() {
        let spec = ParamSpec::from_value(&Value::Int(2 | (3 << 8))).unwrap();
        assert_eq!(spec.convention(), Convention::Lexical);
        assert_eq!(spec.min_args(), 2);
        assert_eq!(spec.max_args(), Some(3));

        let spec = ParamSpec::from_value(&Value::Nil).unwrap();
        assert_eq!(spec.convention(), Convention::Dynamic);
        assert_eq!(spec.max_args(), Some(0));

        assert!(matches!(
            ParamSpec::from_value(&Value::string("x")),
            Err(VmError::MalformedArgList(_))
        ));
        assert!(matches!(
            ParamSpec::from_value(&Value::Int(3 | (1 << 8))),
            Err(VmError::Bytecode(_))
        ));
    }

    #[test]
    fn test_literal_roundtrip() {
        let inner = ByteCodeFunction::builder()
            .code(vec![192, 135])
            .constant(Value::string("inner"))
            .max_depth(1)
            .build_value()
            .unwrap();
        let function = ByteCodeFunction::builder()
            .dynamic(["x", "&optional", "y"])
            .code(vec![8, 135])
            .constants(vec![
                Value::symbol("x"),
                Value::list_with_tail([Value::Int(1)], Value::Float(2.5)),
                Value::vector(vec![Value::Nil, Value::t()]),
                inner,
            ])
            .max_depth(1)
            .doc(DocLiteral::Text("Return X.".to_string()))
            .interactive(Value::string("p"))
            .build()
            .unwrap();

        let literal = function.to_literal().unwrap();
        let bytes = literal.to_bytes().unwrap();
        let restored =
            ByteCodeFunction::from_literal(&FunctionLiteral::from_bytes(&bytes).unwrap()).unwrap();

        assert_eq!(restored.params(), function.params());
        assert_eq!(restored.code(), function.code());
        assert_eq!(restored.max_depth(), 1);
        assert_eq!(restored.doc(), function.doc());
        assert_eq!(restored.interactive(), function.interactive());
        assert_eq!(restored.constants().len(), 4);
        for (a, b) in restored.constants().iter().zip(function.constants().iter()).take(3) {
            assert_eq!(a, b);
        }
        assert!(restored.constants().get(3).unwrap().as_function().is_some());
    }

    #[test]
    fn test_primitive_not_serializable() {
        let car = crate::primitives::lookup("car").unwrap();
        assert!(value_to_datum(&Value::Primitive(car)).is_err());
    }
}
