//! The plain in-memory value model: what a fully-decoded Vellum value looks
//! like once symbol tables and macros have been resolved away.
//!
//! [`Element`] pairs a [`Value`] with its annotations. The model is purely
//! data; macro invocations and expression groups never appear here (they
//! live in the raw stream shape, see [`crate::stream::tree`]).

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use crate::types::{Annotations, SymbolToken, Timestamp, ValueType};

/// An integer of either width. Readers report which representation a value
/// was decoded into so consumers can avoid widening when they do not need to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Int {
    I64(i64),
    Big(BigInt),
}

impl Int {
    /// Widens to arbitrary precision.
    pub fn to_big(&self) -> BigInt {
        match self {
            Int::I64(value) => BigInt::from(*value),
            Int::Big(value) => value.clone(),
        }
    }
}

impl From<i64> for Int {
    fn from(value: i64) -> Self {
        Int::I64(value)
    }
}

impl From<BigInt> for Int {
    fn from(value: BigInt) -> Self {
        Int::Big(value)
    }
}

/// A value in the Vellum data model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// A null of the given type; `ValueType::Null` is the untyped null.
    Null(ValueType),
    Bool(bool),
    Int(Int),
    Float(f64),
    Decimal(BigDecimal),
    Timestamp(Timestamp),
    Symbol(SymbolToken),
    String(String),
    Clob(Vec<u8>),
    Blob(Vec<u8>),
    List(Vec<Element>),
    SExp(Vec<Element>),
    /// Field order is preserved; repeated field names are permitted.
    Struct(Vec<(SymbolToken, Element)>),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null(value_type) => *value_type,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Decimal(_) => ValueType::Decimal,
            Value::Timestamp(_) => ValueType::Timestamp,
            Value::Symbol(_) => ValueType::Symbol,
            Value::String(_) => ValueType::String,
            Value::Clob(_) => ValueType::Clob,
            Value::Blob(_) => ValueType::Blob,
            Value::List(_) => ValueType::List,
            Value::SExp(_) => ValueType::SExp,
            Value::Struct(_) => ValueType::Struct,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }
}

/// A value plus its annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub annotations: Annotations,
    pub value: Value,
}

impl Element {
    pub fn new(value: Value) -> Self {
        Element { annotations: Vec::new(), value }
    }

    pub fn with_annotations(mut self, annotations: impl IntoIterator<Item = SymbolToken>) -> Self {
        self.annotations = annotations.into_iter().collect();
        self
    }

    pub fn value_type(&self) -> ValueType {
        self.value.value_type()
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    // Shorthand constructors, mostly for assembling fixtures and defaults.

    pub fn null() -> Self {
        Element::new(Value::Null(ValueType::Null))
    }

    pub fn typed_null(value_type: ValueType) -> Self {
        Element::new(Value::Null(value_type))
    }

    pub fn bool(value: bool) -> Self {
        Element::new(Value::Bool(value))
    }

    pub fn int(value: i64) -> Self {
        Element::new(Value::Int(Int::I64(value)))
    }

    pub fn big_int(value: BigInt) -> Self {
        Element::new(Value::Int(Int::Big(value)))
    }

    pub fn float(value: f64) -> Self {
        Element::new(Value::Float(value))
    }

    pub fn decimal(value: BigDecimal) -> Self {
        Element::new(Value::Decimal(value))
    }

    pub fn timestamp(value: Timestamp) -> Self {
        Element::new(Value::Timestamp(value))
    }

    pub fn symbol(text: impl Into<String>) -> Self {
        Element::new(Value::Symbol(SymbolToken::known(text)))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Element::new(Value::String(value.into()))
    }

    pub fn clob(bytes: impl Into<Vec<u8>>) -> Self {
        Element::new(Value::Clob(bytes.into()))
    }

    pub fn blob(bytes: impl Into<Vec<u8>>) -> Self {
        Element::new(Value::Blob(bytes.into()))
    }

    pub fn list(items: impl IntoIterator<Item = Element>) -> Self {
        Element::new(Value::List(items.into_iter().collect()))
    }

    pub fn sexp(items: impl IntoIterator<Item = Element>) -> Self {
        Element::new(Value::SExp(items.into_iter().collect()))
    }

    pub fn strukt<N: Into<SymbolToken>>(fields: impl IntoIterator<Item = (N, Element)>) -> Self {
        Element::new(Value::Struct(
            fields.into_iter().map(|(name, value)| (name.into(), value)).collect(),
        ))
    }
}

impl std::fmt::Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for annotation in &self.annotations {
            write!(f, "{}::", annotation)?;
        }
        write!(f, "{}", self.value)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null(ValueType::Null) => write!(f, "null"),
            Value::Null(value_type) => write!(f, "null.{}", value_type),
            Value::Bool(value) => write!(f, "{}", value),
            Value::Int(Int::I64(value)) => write!(f, "{}", value),
            Value::Int(Int::Big(value)) => write!(f, "{}", value),
            Value::Float(value) => write!(f, "{:e}", value),
            Value::Decimal(value) => write!(f, "{}", value),
            Value::Timestamp(value) => write!(f, "{}", value.to_rfc3339()),
            Value::Symbol(token) => write!(f, "{}", token),
            Value::String(value) => write!(f, "{:?}", value),
            Value::Clob(bytes) => write!(f, "{{{{clob {} bytes}}}}", bytes.len()),
            Value::Blob(bytes) => write!(f, "{{{{blob {} bytes}}}}", bytes.len()),
            Value::List(items) => fmt_seq(f, "[", items, "]"),
            Value::SExp(items) => fmt_seq(f, "(", items, ")"),
            Value::Struct(fields) => {
                write!(f, "{{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

fn fmt_seq(
    f: &mut std::fmt::Formatter<'_>,
    open: &str,
    items: &[Element],
    close: &str,
) -> std::fmt::Result {
    write!(f, "{}", open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, "{}", close)
}
