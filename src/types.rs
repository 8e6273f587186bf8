//! Primitive vocabulary shared by the value model, the expression model, and
//! the stream-reader contract: value types, symbol tokens, integer widths.

use serde::{Deserialize, Serialize};

use crate::VellumError;

/// A point in time with a fixed UTC offset, the resolution Vellum timestamps
/// carry on the wire.
pub type Timestamp = chrono::DateTime<chrono::FixedOffset>;

/// An ordered annotation sequence. Order is significant and preserved.
pub type Annotations = Vec<SymbolToken>;

/// The type of a value as declared by its encoding.
///
/// `Null` is the untyped null; typed nulls report the type they are a null
/// of, with the null-ness exposed separately by the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Null,
    Bool,
    Int,
    Float,
    Decimal,
    Timestamp,
    Symbol,
    String,
    Clob,
    Blob,
    List,
    SExp,
    Struct,
}

impl ValueType {
    /// True for the three container types.
    pub fn is_container(self) -> bool {
        matches!(self, ValueType::List | ValueType::SExp | ValueType::Struct)
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValueType::Null => "null",
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Decimal => "decimal",
            ValueType::Timestamp => "timestamp",
            ValueType::Symbol => "symbol",
            ValueType::String => "string",
            ValueType::Clob => "clob",
            ValueType::Blob => "blob",
            ValueType::List => "list",
            ValueType::SExp => "sexp",
            ValueType::Struct => "struct",
        };
        write!(f, "{}", name)
    }
}

/// The width class of an integer value under the cursor, used to pick
/// between the fixed-width and arbitrary-precision expression variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegerSize {
    /// Fits in an `i64`.
    I64,
    /// Requires arbitrary precision.
    Big,
}

/// A symbol token: interned text plus, optionally, the symbol-table id it was
/// encoded with. Text may be unknown when the id has no entry in the active
/// symbol table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolToken {
    text: Option<String>,
    sid: Option<usize>,
}

impl SymbolToken {
    /// A token with known text and no recorded symbol id.
    pub fn known(text: impl Into<String>) -> Self {
        SymbolToken { text: Some(text.into()), sid: None }
    }

    /// A token whose text could not be resolved from the symbol table.
    pub fn unknown(sid: usize) -> Self {
        SymbolToken { text: None, sid: Some(sid) }
    }

    /// A token carrying both text and the id it was encoded with.
    pub fn with_sid(text: impl Into<String>, sid: usize) -> Self {
        SymbolToken { text: Some(text.into()), sid: Some(sid) }
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn sid(&self) -> Option<usize> {
        self.sid
    }

    /// Returns the token's text, failing if the text is unknown. Structural
    /// comparisons (field names, matcher symbol equality) require known text.
    pub fn assume_text(&self) -> Result<&str, VellumError> {
        self.text.as_deref().ok_or_else(|| {
            VellumError::invalid_stream(format!(
                "symbol with unknown text (sid {}) where text is required",
                self.sid.map_or_else(|| "?".to_string(), |s| s.to_string()),
            ))
        })
    }

    /// Text equality, the comparison the matcher and struct field lookup use.
    /// Tokens with unknown text compare equal only by matching sid.
    pub fn text_eq(&self, other: &SymbolToken) -> bool {
        match (&self.text, &other.text) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.sid == other.sid,
            _ => false,
        }
    }
}

impl From<&str> for SymbolToken {
    fn from(text: &str) -> Self {
        SymbolToken::known(text)
    }
}

impl From<String> for SymbolToken {
    fn from(text: String) -> Self {
        SymbolToken::known(text)
    }
}

impl std::fmt::Display for SymbolToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.text {
            Some(text) => write!(f, "{}", text),
            None => write!(f, "${}", self.sid.unwrap_or(0)),
        }
    }
}
