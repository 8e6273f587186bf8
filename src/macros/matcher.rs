//! Structural matching of values against macro definitions.
//!
//! Given a template macro and a cursor over a candidate value, the matcher
//! decides whether the candidate could have been produced by expanding that
//! macro with some arguments. Encoding-compaction tooling uses this to
//! re-express already-encoded data as invocations.
//!
//! The walk is lockstep and iteration-only: the compiled body is consumed in
//! flat order while the candidate cursor advances value by value. Container
//! bodies consume a variable number of matcher steps, so instead of
//! recursing, the matcher records, per body index, how many container
//! closes are owed once the walk reaches a container's recorded end index.
//!
//! Three outcomes are possible and callers must keep them apart: `Ok(true)`,
//! `Ok(false)`, and an [`ErrorKind::Unsupported`](crate::ErrorKind) error
//! for bodies containing expression groups or nested invocations, which this
//! matcher does not yet handle. Variable references currently match any
//! candidate value; cardinality and encoding-type checks against variables
//! are a known gap.

use std::cmp::Ordering;
use std::sync::Arc;

use num_bigint::BigInt;

use crate::expr::Expression;
use crate::macros::definition::Macro;
use crate::stream::StreamReader;
use crate::types::{IntegerSize, SymbolToken, ValueType};
use crate::VellumError;

/// Matches candidate values against one template macro.
#[derive(Debug, Clone)]
pub struct MacroMatcher {
    definition: Arc<Macro>,
}

impl MacroMatcher {
    /// Creates a matcher for a template macro.
    ///
    /// # Errors
    /// Fails for bodiless (system) macros; there is no body to match against.
    pub fn new(definition: Arc<Macro>) -> Result<Self, VellumError> {
        if !definition.is_template() {
            return Err(VellumError::invalid_macro(
                "matching requires a template macro with a compiled body",
            ));
        }
        Ok(MacroMatcher { definition })
    }

    pub fn name(&self) -> Option<&str> {
        self.definition.name()
    }

    pub fn definition(&self) -> &Arc<Macro> {
        &self.definition
    }

    /// Attempts to match the value the reader is positioned *before* (the
    /// first `next_raw` happens inside) against this matcher's macro, by
    /// walking the value and the body in lockstep until an incompatibility
    /// is found or both end.
    pub fn match_reader<R: StreamReader>(&self, reader: &mut R) -> Result<bool, VellumError> {
        let body = self
            .definition
            .body()
            .ok_or_else(|| VellumError::defect("matcher holds a macro without a body"))?;
        let signature = self.definition.signature();
        let mut body_iter = body.iter();
        let mut index = 0usize;
        // pending_closes[i]: container closes owed before the walk may
        // continue past body index i.
        let mut pending_closes = vec![0usize; body.len() + 1];

        loop {
            for _ in 0..pending_closes[index] {
                // The candidate container must also be exhausted here.
                if reader.next_raw()? {
                    return Ok(false);
                }
                reader.step_out_raw()?;
            }
            pending_closes[index] = 0;

            let has_value = reader.next_raw()?;
            let mut expression = body_iter.next();
            if expression.is_none() && has_value {
                return Ok(false);
            }

            if !has_value {
                // End of the candidate at this level. A pending field name
                // is consumed first; a trailing voidable variable is an
                // accepted omission.
                if matches!(expression, Some(Expression::FieldName(_))) {
                    expression = Some(body_iter.next().ok_or_else(|| {
                        VellumError::defect("dangling field name in template body")
                    })?);
                }
                match expression {
                    None => break,
                    Some(Expression::VariableRef { signature_index }) => {
                        let parameter = signature.get(*signature_index).ok_or_else(|| {
                            VellumError::defect("variable reference outside the signature")
                        })?;
                        if parameter.cardinality().can_be_void() {
                            continue;
                        }
                        return Ok(false);
                    }
                    Some(_) => return Ok(false),
                }
            }

            index += 1;
            let Some(mut expression) = expression else {
                return Ok(false);
            };

            if let Expression::FieldName(name) = expression {
                let candidate_name = reader.field_name()?;
                if !name.text_eq(&candidate_name) {
                    return Ok(false);
                }
                expression = body_iter
                    .next()
                    .ok_or_else(|| VellumError::defect("dangling field name in template body"))?;
                index += 1;
            }

            match expression {
                // A variable matches any value at the current position.
                Expression::VariableRef { .. } => continue,
                Expression::ExpressionGroup { .. } => {
                    return Err(VellumError::unsupported(
                        "expression groups in matched template bodies",
                    ));
                }
                Expression::MacroInvocation { .. } | Expression::EExpression { .. } => {
                    return Err(VellumError::unsupported(
                        "nested invocations in matched template bodies",
                    ));
                }
                Expression::Placeholder => {
                    return Err(VellumError::defect("placeholder in compiled body"));
                }
                Expression::FieldName(_) => {
                    return Err(VellumError::defect("field name follows field name in body"));
                }
                _ => {}
            }

            let body_annotations = expression
                .annotations()
                .ok_or_else(|| VellumError::defect("data value expected in template body"))?;
            if !annotations_match(body_annotations, &reader.annotations()?) {
                return Ok(false);
            }

            let candidate_type = reader.value_type()?;
            if reader.is_null()? {
                match expression {
                    Expression::Null { value_type, .. } if *value_type == candidate_type => {}
                    _ => return Ok(false),
                }
                continue;
            }
            match candidate_type {
                ValueType::Null => {
                    return Err(VellumError::defect("non-null value of the untyped null type"));
                }
                ValueType::Bool => {
                    let candidate = reader.bool_value()?;
                    match expression {
                        Expression::Bool { value, .. } if *value == candidate => {}
                        _ => return Ok(false),
                    }
                }
                // Integers compare numerically, widening to the larger of
                // the two observed representations.
                ValueType::Int => match (reader.int_size()?, expression) {
                    (IntegerSize::I64, Expression::Int { value, .. }) => {
                        if *value != reader.i64_value()? {
                            return Ok(false);
                        }
                    }
                    (IntegerSize::I64, Expression::BigInt { value, .. }) => {
                        if *value != BigInt::from(reader.i64_value()?) {
                            return Ok(false);
                        }
                    }
                    (IntegerSize::Big, Expression::Int { value, .. }) => {
                        if BigInt::from(*value) != reader.big_int_value()? {
                            return Ok(false);
                        }
                    }
                    (IntegerSize::Big, Expression::BigInt { value, .. }) => {
                        if *value != reader.big_int_value()? {
                            return Ok(false);
                        }
                    }
                    _ => return Ok(false),
                },
                ValueType::Float => {
                    let candidate = reader.f64_value()?;
                    match expression {
                        // IEEE total ordering: NaN equals NaN, -0.0 differs
                        // from 0.0.
                        Expression::Float { value, .. }
                            if value.total_cmp(&candidate) == Ordering::Equal => {}
                        _ => return Ok(false),
                    }
                }
                ValueType::Decimal => {
                    let candidate = reader.decimal_value()?;
                    match expression {
                        Expression::Decimal { value, .. } if *value == candidate => {}
                        _ => return Ok(false),
                    }
                }
                ValueType::Timestamp => {
                    let candidate = reader.timestamp_value()?;
                    match expression {
                        Expression::Timestamp { value, .. } if *value == candidate => {}
                        _ => return Ok(false),
                    }
                }
                ValueType::Symbol => {
                    let candidate = reader.symbol_value()?;
                    match expression {
                        Expression::Symbol { value, .. } => {
                            if value.assume_text()? != candidate.assume_text()? {
                                return Ok(false);
                            }
                        }
                        _ => return Ok(false),
                    }
                }
                ValueType::String => {
                    let candidate = reader.string_value()?;
                    match expression {
                        Expression::String { value, .. } if *value == candidate => {}
                        _ => return Ok(false),
                    }
                }
                ValueType::Clob => {
                    let candidate = reader.bytes_value()?;
                    match expression {
                        Expression::Clob { value, .. } if *value == candidate => {}
                        _ => return Ok(false),
                    }
                }
                ValueType::Blob => {
                    let candidate = reader.bytes_value()?;
                    match expression {
                        Expression::Blob { value, .. } if *value == candidate => {}
                        _ => return Ok(false),
                    }
                }
                ValueType::List => match expression {
                    Expression::List { end_exclusive, .. } => {
                        reader.step_in_raw()?;
                        pending_closes[*end_exclusive] += 1;
                    }
                    _ => return Ok(false),
                },
                ValueType::SExp => match expression {
                    Expression::SExp { end_exclusive, .. } => {
                        reader.step_in_raw()?;
                        pending_closes[*end_exclusive] += 1;
                    }
                    _ => return Ok(false),
                },
                ValueType::Struct => match expression {
                    Expression::Struct { end_exclusive, .. } => {
                        reader.step_in_raw()?;
                        pending_closes[*end_exclusive] += 1;
                    }
                    _ => return Ok(false),
                },
            }
        }
        Ok(true)
    }
}

/// Annotation sequences are equal when they have the same symbols, by text,
/// in the same order.
fn annotations_match(body: &[SymbolToken], candidate: &[SymbolToken]) -> bool {
    body.len() == candidate.len()
        && body.iter().zip(candidate.iter()).all(|(a, b)| a.text_eq(b))
}
