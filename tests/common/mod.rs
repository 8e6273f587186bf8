//! Shared fixtures and helpers for the integration tests.
//!
//! Each test binary uses its own subset of these helpers.
#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use vellum::element::{Element, Value};
use vellum::expr::Expression;
use vellum::macros::{
    ArgumentReader, BufferedExpansion, Macro, MacroTable, Parameter, TemplateBuilder,
};
use vellum::stream::{RawItem, StreamReader, TreeReader};
use vellum::types::Timestamp;

/// `foobar(foo!, bar?)` with body `{foo: (%foo), bar: (%bar)}`, the
/// canonical struct-template fixture.
pub fn foobar_macro() -> Macro {
    let signature = vec![Parameter::required("foo"), Parameter::zero_or_one("bar")];
    let mut builder = TemplateBuilder::new(&signature);
    builder
        .begin_struct()
        .field("foo")
        .variable("foo")
        .field("bar")
        .variable("bar")
        .end();
    let body = builder.build().expect("foobar body");
    Macro::template("foobar", signature, body).expect("foobar macro")
}

pub fn table_with(macros: impl IntoIterator<Item = Macro>) -> MacroTable {
    MacroTable::with_macros(macros).expect("macro table")
}

/// Positions a reader on the first raw item and materializes it as an
/// invocation, returning the flat expression list.
pub fn collect_invocation(items: &[RawItem], table: &MacroTable) -> Vec<Expression> {
    try_collect_invocation(items, table).expect("invocation should materialize")
}

pub fn try_collect_invocation(
    items: &[RawItem],
    table: &MacroTable,
) -> Result<Vec<Expression>, vellum::VellumError> {
    let mut reader = ArgumentReader::new(TreeReader::new(items, table));
    assert!(reader.stream_mut().next_raw()?, "stream should have a first item");
    let mut sink = BufferedExpansion::default();
    reader.begin_invocation(&mut sink)?;
    Ok(sink.expressions)
}

pub fn ts(rfc3339: &str) -> Timestamp {
    chrono::DateTime::parse_from_rfc3339(rfc3339).expect("timestamp fixture")
}

pub fn dec(digits: &str) -> BigDecimal {
    BigDecimal::from_str(digits).expect("decimal fixture")
}

/// Asserts the flattening invariants over a finished expression list: no
/// placeholders, every range node records its own index, child ranges nest
/// without crossing, and sibling ranges partition their container.
pub fn assert_well_formed(expressions: &[Expression]) {
    let mut open_ends: Vec<usize> = Vec::new();
    for (index, expression) in expressions.iter().enumerate() {
        while open_ends.last() == Some(&index) {
            open_ends.pop();
        }
        assert!(
            !matches!(expression, Expression::Placeholder),
            "placeholder survived at index {}",
            index
        );
        if let Some(range) = expression.child_range() {
            let enclosing_end = open_ends.last().copied().unwrap_or(expressions.len());
            assert_eq!(range.start, index + 1, "self index mismatch at {}", index);
            assert!(
                range.end >= range.start,
                "inverted range at {}: {:?}",
                index,
                range
            );
            assert!(
                range.end <= enclosing_end,
                "range at {} crosses container end {} (range {:?})",
                index,
                enclosing_end,
                range
            );
            open_ends.push(range.end);
        }
    }
}

/// Rebuilds the data-model values spanned by `range`, flattening expression
/// groups and nested invocations into their contents. Only meaningful for
/// expression lists produced from data arguments; panics on field names
/// encountered outside a struct rebuild.
pub fn rebuild_values(expressions: &[Expression], range: std::ops::Range<usize>) -> Vec<Element> {
    let mut out = Vec::new();
    let mut index = range.start;
    while index < range.end {
        match &expressions[index] {
            Expression::ExpressionGroup { end_exclusive, .. }
            | Expression::EExpression { end_exclusive, .. }
            | Expression::MacroInvocation { end_exclusive, .. } => {
                out.extend(rebuild_values(expressions, index + 1..*end_exclusive));
                index = *end_exclusive;
            }
            _ => {
                let (element, next) = rebuild_one(expressions, index);
                out.push(element);
                index = next;
            }
        }
    }
    out
}

fn rebuild_one(expressions: &[Expression], index: usize) -> (Element, usize) {
    let annotations = expressions[index].annotations().map(<[_]>::to_vec).unwrap_or_default();
    match &expressions[index] {
        Expression::Null { value_type, .. } => {
            (Element::typed_null(*value_type).with_annotations(annotations), index + 1)
        }
        Expression::Bool { value, .. } => {
            (Element::bool(*value).with_annotations(annotations), index + 1)
        }
        Expression::Int { value, .. } => {
            (Element::int(*value).with_annotations(annotations), index + 1)
        }
        Expression::BigInt { value, .. } => {
            (Element::big_int(value.clone()).with_annotations(annotations), index + 1)
        }
        Expression::Float { value, .. } => {
            (Element::float(*value).with_annotations(annotations), index + 1)
        }
        Expression::Decimal { value, .. } => {
            (Element::decimal(value.clone()).with_annotations(annotations), index + 1)
        }
        Expression::Timestamp { value, .. } => {
            (Element::timestamp(*value).with_annotations(annotations), index + 1)
        }
        Expression::Symbol { value, .. } => (
            Element::new(Value::Symbol(value.clone())).with_annotations(annotations),
            index + 1,
        ),
        Expression::String { value, .. } => {
            (Element::string(value.clone()).with_annotations(annotations), index + 1)
        }
        Expression::Clob { value, .. } => {
            (Element::clob(value.clone()).with_annotations(annotations), index + 1)
        }
        Expression::Blob { value, .. } => {
            (Element::blob(value.clone()).with_annotations(annotations), index + 1)
        }
        Expression::List { end_exclusive, .. } => {
            let items = rebuild_values(expressions, index + 1..*end_exclusive);
            (Element::list(items).with_annotations(annotations), *end_exclusive)
        }
        Expression::SExp { end_exclusive, .. } => {
            let items = rebuild_values(expressions, index + 1..*end_exclusive);
            (Element::sexp(items).with_annotations(annotations), *end_exclusive)
        }
        Expression::Struct { end_exclusive, .. } => {
            let mut fields = Vec::new();
            let mut cursor = index + 1;
            while cursor < *end_exclusive {
                let Expression::FieldName(name) = &expressions[cursor] else {
                    panic!("struct child at {} lacks a field name", cursor);
                };
                let (value, next) = rebuild_one(expressions, cursor + 1);
                fields.push((name.clone(), value));
                cursor = next;
            }
            (Element::new(Value::Struct(fields)).with_annotations(annotations), *end_exclusive)
        }
        other => panic!("cannot rebuild {:?} as a data value", other),
    }
}

/// The canonical big-int fixture: one that cannot fit an `i64`.
pub fn huge() -> num_bigint::BigInt {
    num_bigint::BigInt::from_str("170141183460469231731687303715884105727").expect("big int")
}

/// Wraps an `Arc` around a macro, the shape matchers and tables hand out.
pub fn arc(definition: Macro) -> Arc<Macro> {
    Arc::new(definition)
}
