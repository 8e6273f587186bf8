//! # The flattened expression model
//!
//! Compiled template bodies and materialized e-expression arguments share one
//! representation: a flat, index-addressed `Vec<Expression>` holding a
//! pre-order (parent-before-children) flattening of the logical tree. A
//! container or invocation node at index `i` records an `end_exclusive`
//! index `e`; its children occupy exactly `[i + 1, e)` of the same list, and
//! no child's range crosses `e`. This makes evaluation an index walk instead
//! of a pointer chase, and lets a single buffer be reused across invocations.
//!
//! The model cannot reuse [`crate::element::Element`]: template bodies carry
//! information the data model has no room for (variable references, nested
//! macro invocations, expression groups), and the range-based layout is load
//! bearing for the evaluator.
//!
//! Invariants, stated once here and relied on everywhere:
//!
//! - Every range `[i + 1, e)` contains the node's complete,
//!   well-nested children.
//! - Reading the list left to right is a valid depth-first traversal.
//! - [`Expression::Placeholder`] exists only *during* construction.
//!   A slot is reserved with a placeholder, children are appended, and the
//!   slot is overwritten in place once the node's end index is known. The
//!   slot is never relocated, because child indices were assigned relative
//!   to it. No finished list contains a placeholder.

pub mod pool;

use std::sync::Arc;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::macros::Macro;
use crate::types::{Annotations, SymbolToken, Timestamp, ValueType};

/// One node of a flattened template body or e-expression argument list.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    // Scalars. Each carries its annotation sequence.
    Null { annotations: Annotations, value_type: ValueType },
    Bool { annotations: Annotations, value: bool },
    /// An integer that fit a fixed-width representation when read.
    Int { annotations: Annotations, value: i64 },
    /// An integer that required arbitrary precision when read.
    BigInt { annotations: Annotations, value: BigInt },
    Float { annotations: Annotations, value: f64 },
    Decimal { annotations: Annotations, value: BigDecimal },
    Timestamp { annotations: Annotations, value: Timestamp },
    Symbol { annotations: Annotations, value: SymbolToken },
    String { annotations: Annotations, value: String },
    Clob { annotations: Annotations, value: Vec<u8> },
    Blob { annotations: Annotations, value: Vec<u8> },

    // Containers. Children occupy `[self_index + 1, end_exclusive)`.
    List { annotations: Annotations, self_index: usize, end_exclusive: usize },
    SExp { annotations: Annotations, self_index: usize, end_exclusive: usize },
    /// Field names are not stored in a map; each value at the struct's
    /// nesting level is immediately preceded by a `FieldName` entry.
    Struct { annotations: Annotations, self_index: usize, end_exclusive: usize },

    /// Names the value expression that immediately follows it, at the same
    /// depth, inside a struct.
    FieldName(SymbolToken),

    /// A variadic run of expressions supplied for one parameter slot. Not a
    /// data value; purely a grouping marker.
    ExpressionGroup { self_index: usize, end_exclusive: usize },

    /// A macro invocation read from an encoded stream. Its argument
    /// expressions occupy `[self_index + 1, end_exclusive)`.
    EExpression { invoked: Arc<Macro>, self_index: usize, end_exclusive: usize },

    /// A macro invocation appearing inside a compiled template body.
    MacroInvocation { invoked: Arc<Macro>, self_index: usize, end_exclusive: usize },

    /// A reference, by signature position, to a template parameter.
    VariableRef { signature_index: usize },

    /// Construction-time sentinel; never present in a finished list.
    Placeholder,
}

/// Discriminant-only view of an [`Expression`], used by the pool and by
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprKind {
    Null,
    Bool,
    Int,
    BigInt,
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
    FieldName,
    ExpressionGroup,
    EExpression,
    MacroInvocation,
    VariableRef,
    Placeholder,
}

impl Expression {
    pub fn kind(&self) -> ExprKind {
        match self {
            Expression::Null { .. } => ExprKind::Null,
            Expression::Bool { .. } => ExprKind::Bool,
            Expression::Int { .. } => ExprKind::Int,
            Expression::BigInt { .. } => ExprKind::BigInt,
            Expression::Float { .. } => ExprKind::Float,
            Expression::Decimal { .. } => ExprKind::Decimal,
            Expression::Timestamp { .. } => ExprKind::Timestamp,
            Expression::Symbol { .. } => ExprKind::Symbol,
            Expression::String { .. } => ExprKind::String,
            Expression::Clob { .. } => ExprKind::Clob,
            Expression::Blob { .. } => ExprKind::Blob,
            Expression::List { .. } => ExprKind::List,
            Expression::SExp { .. } => ExprKind::SExp,
            Expression::Struct { .. } => ExprKind::Struct,
            Expression::FieldName(_) => ExprKind::FieldName,
            Expression::ExpressionGroup { .. } => ExprKind::ExpressionGroup,
            Expression::EExpression { .. } => ExprKind::EExpression,
            Expression::MacroInvocation { .. } => ExprKind::MacroInvocation,
            Expression::VariableRef { .. } => ExprKind::VariableRef,
            Expression::Placeholder => ExprKind::Placeholder,
        }
    }

    /// The annotations of a data-model value expression. `None` for kinds
    /// that are not data values (field names, groups, invocations, variables,
    /// placeholders).
    pub fn annotations(&self) -> Option<&[SymbolToken]> {
        match self {
            Expression::Null { annotations, .. }
            | Expression::Bool { annotations, .. }
            | Expression::Int { annotations, .. }
            | Expression::BigInt { annotations, .. }
            | Expression::Float { annotations, .. }
            | Expression::Decimal { annotations, .. }
            | Expression::Timestamp { annotations, .. }
            | Expression::Symbol { annotations, .. }
            | Expression::String { annotations, .. }
            | Expression::Clob { annotations, .. }
            | Expression::Blob { annotations, .. }
            | Expression::List { annotations, .. }
            | Expression::SExp { annotations, .. }
            | Expression::Struct { annotations, .. } => Some(annotations),
            Expression::FieldName(_)
            | Expression::ExpressionGroup { .. }
            | Expression::EExpression { .. }
            | Expression::MacroInvocation { .. }
            | Expression::VariableRef { .. }
            | Expression::Placeholder => None,
        }
    }

    /// The declared type of a data-model value expression.
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Expression::Null { value_type, .. } => Some(*value_type),
            Expression::Bool { .. } => Some(ValueType::Bool),
            Expression::Int { .. } | Expression::BigInt { .. } => Some(ValueType::Int),
            Expression::Float { .. } => Some(ValueType::Float),
            Expression::Decimal { .. } => Some(ValueType::Decimal),
            Expression::Timestamp { .. } => Some(ValueType::Timestamp),
            Expression::Symbol { .. } => Some(ValueType::Symbol),
            Expression::String { .. } => Some(ValueType::String),
            Expression::Clob { .. } => Some(ValueType::Clob),
            Expression::Blob { .. } => Some(ValueType::Blob),
            Expression::List { .. } => Some(ValueType::List),
            Expression::SExp { .. } => Some(ValueType::SExp),
            Expression::Struct { .. } => Some(ValueType::Struct),
            Expression::FieldName(_)
            | Expression::ExpressionGroup { .. }
            | Expression::EExpression { .. }
            | Expression::MacroInvocation { .. }
            | Expression::VariableRef { .. }
            | Expression::Placeholder => None,
        }
    }

    /// For range-bearing kinds, the half-open index range of child
    /// expressions in the containing flat list.
    pub fn child_range(&self) -> Option<std::ops::Range<usize>> {
        match self {
            Expression::List { self_index, end_exclusive, .. }
            | Expression::SExp { self_index, end_exclusive, .. }
            | Expression::Struct { self_index, end_exclusive, .. }
            | Expression::ExpressionGroup { self_index, end_exclusive }
            | Expression::EExpression { self_index, end_exclusive, .. }
            | Expression::MacroInvocation { self_index, end_exclusive, .. } => {
                Some(self_index + 1..*end_exclusive)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for ExprKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_ranges_exclude_the_node_itself() {
        let list = Expression::List { annotations: Vec::new(), self_index: 3, end_exclusive: 7 };
        assert_eq!(list.child_range(), Some(4..7));
        assert_eq!(Expression::Placeholder.child_range(), None);
        assert_eq!(Expression::Bool { annotations: Vec::new(), value: true }.child_range(), None);
    }

    #[test]
    fn data_values_report_types_and_annotations() {
        let symbol = Expression::Symbol {
            annotations: vec![SymbolToken::known("a")],
            value: SymbolToken::known("s"),
        };
        assert_eq!(symbol.value_type(), Some(ValueType::Symbol));
        assert_eq!(symbol.annotations().map(<[SymbolToken]>::len), Some(1));
        assert_eq!(Expression::VariableRef { signature_index: 0 }.value_type(), None);
        assert_eq!(Expression::FieldName(SymbolToken::known("f")).annotations(), None);
    }

    #[test]
    fn kinds_are_stable_discriminants() {
        let group = Expression::ExpressionGroup { self_index: 0, end_exclusive: 1 };
        assert_eq!(group.kind(), ExprKind::ExpressionGroup);
        assert_eq!(Expression::Placeholder.kind(), ExprKind::Placeholder);
    }
}
