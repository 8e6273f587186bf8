//! Eager materialization of e-expression arguments.
//!
//! [`ArgumentReader`] converts one macro invocation, positioned under the
//! stream cursor, into a flat expression list satisfying the model's
//! invariants, recursing into nested invocations and containers as needed.
//! Everything is read eagerly; the expression model does not yet support
//! lazily-read values, so all arguments must be materialized before
//! evaluation begins.
//!
//! The reader owns a reusable expression buffer that is cleared at the start
//! of every invocation, so steady-state reading allocates only when a value
//! forces it (strings, lobs, big numbers). A finished list is handed to the
//! evaluator through [`ExpansionSink::init_expansion`]; after that call the
//! buffer's contents belong to the sink for exactly as long as the hand-off
//! borrow lives.

use std::sync::Arc;

use crate::expr::Expression;
use crate::macros::definition::Parameter;
use crate::stream::{ArgPresence, StreamReader};
use crate::types::{Annotations, IntegerSize, ValueType};
use crate::VellumError;

/// Sized so buffer growth is avoided for typical invocations.
const INITIAL_BUFFER_CAPACITY: usize = 64;

/// The evaluator-facing hand-off: receives the finished flat expression
/// list of one invocation. Index 0 is the invocation's entry expression
/// (or its field name, when the invocation was a struct field value).
pub trait ExpansionSink {
    fn init_expansion(&mut self, expressions: &[Expression]) -> Result<(), VellumError>;
}

/// An [`ExpansionSink`] that simply keeps a copy of the expressions, for
/// callers that want the list itself rather than streaming evaluation.
#[derive(Debug, Default)]
pub struct BufferedExpansion {
    pub expressions: Vec<Expression>,
}

impl ExpansionSink for BufferedExpansion {
    fn init_expansion(&mut self, expressions: &[Expression]) -> Result<(), VellumError> {
        self.expressions.clear();
        self.expressions.extend_from_slice(expressions);
        Ok(())
    }
}

/// Reads one e-expression at a time from a [`StreamReader`] into the flat
/// expression model.
#[derive(Debug)]
pub struct ArgumentReader<R: StreamReader> {
    stream: R,
    expressions: Vec<Expression>,
}

impl<R: StreamReader> ArgumentReader<R> {
    pub fn new(stream: R) -> Self {
        ArgumentReader { stream, expressions: Vec::with_capacity(INITIAL_BUFFER_CAPACITY) }
    }

    /// The underlying stream, for callers that interleave plain reading
    /// with invocation materialization.
    pub fn stream_mut(&mut self) -> &mut R {
        &mut self.stream
    }

    pub fn into_stream(self) -> R {
        self.stream
    }

    /// Materializes the invocation the cursor is positioned on and hands the
    /// finished expression list to `sink`.
    ///
    /// The cursor must be positioned exactly on a macro invocation. If the
    /// enclosing context is a struct, the invocation's field name is
    /// captured as the first expression.
    pub fn begin_invocation<S: ExpansionSink>(
        &mut self,
        sink: &mut S,
    ) -> Result<(), VellumError> {
        if !self.stream.is_macro_invocation() {
            return Err(VellumError::invalid_stream(
                "cursor is not positioned on a macro invocation",
            ));
        }
        self.expressions.clear();
        if self.stream.is_in_struct() {
            let name = self.stream.field_name()?;
            self.expressions.push(Expression::FieldName(name));
        }
        self.collect_eexpr_args()?;
        debug_assert!(
            !self.expressions.iter().any(|e| matches!(e, Expression::Placeholder)),
            "placeholder survived argument materialization"
        );
        sink.init_expansion(&self.expressions)
    }

    /// Collects the expressions composing the invocation the cursor is on.
    fn collect_eexpr_args(&mut self) -> Result<(), VellumError> {
        let invoked = self.stream.load_macro()?;
        self.stream.step_into_eexpression()?;
        let signature = invoked.signature();
        let presence_bitmap = self.stream.load_presence_bitmap(signature)?;
        let invocation_start = self.expressions.len();
        self.expressions.push(Expression::Placeholder);
        let parameter_count = signature.len();
        for (index, parameter) in signature.iter().enumerate() {
            let presence = match &presence_bitmap {
                Some(bitmap) => bitmap.get(index),
                // No bitmap: every parameter is a single expression.
                None => ArgPresence::Expression,
            };
            self.read_parameter(parameter, presence, index + 1 == parameter_count)?;
        }
        self.stream.step_out_of_eexpression()?;
        let end_exclusive = self.expressions.len();
        self.expressions[invocation_start] = Expression::EExpression {
            invoked: Arc::clone(&invoked),
            self_index: invocation_start,
            end_exclusive,
        };
        Ok(())
    }

    /// Reads a single parameter's argument(s), driven by its presence bits.
    /// In text encodings there is no bitmap, so presence arrives as the
    /// `Expression` sentinel and absence is detected syntactically.
    fn read_parameter(
        &mut self,
        parameter: &Parameter,
        presence: ArgPresence,
        is_trailing: bool,
    ) -> Result<(), VellumError> {
        match presence {
            ArgPresence::Void => {
                self.push_empty_group();
                Ok(())
            }
            ArgPresence::Expression | ArgPresence::Group => {
                if !self.stream.next_raw()? {
                    // Nothing present: a trailing omitted argument.
                    self.push_empty_group();
                    return Ok(());
                }
                let is_implicit_rest = is_trailing
                    && parameter.cardinality().can_be_multi()
                    && self.stream.supports_implicit_rest();
                self.read_value_as_expression(is_implicit_rest)
            }
            ArgPresence::Reserved => Err(VellumError::malformed_bitmap(format!(
                "reserved presence bits for parameter '{}'",
                parameter.name()
            ))),
        }
    }

    /// Appends an empty expression group: the representation of an omitted
    /// parameter.
    fn push_empty_group(&mut self) {
        let self_index = self.expressions.len();
        self.expressions
            .push(Expression::ExpressionGroup { self_index, end_exclusive: self_index + 1 });
    }

    /// Reads the value the cursor is on into expression(s).
    ///
    /// Dispatch order matters: implicit-rest consumption first (unless the
    /// value is already an explicit group), then nested invocations, since
    /// invocations can appear anywhere an argument value is expected, then
    /// containers, and finally scalars.
    fn read_value_as_expression(&mut self, is_implicit_rest: bool) -> Result<(), VellumError> {
        if is_implicit_rest && !self.stream.is_expression_group() {
            return self.read_stream_as_expression_group();
        }
        if self.stream.is_macro_invocation() {
            return self.collect_eexpr_args();
        }
        let value_type = self.stream.value_type()?;
        let annotations = self.stream.annotations()?;
        if value_type.is_container() && !self.stream.is_null()? {
            self.read_container_value_as_expression(value_type, annotations)
        } else {
            self.read_scalar_value_as_expression(value_type, annotations)
        }
    }

    /// Consumes the remainder of the current container, including the value
    /// the cursor is on, into one synthesized expression group. This models
    /// a trailing variadic parameter supplied without group syntax.
    fn read_stream_as_expression_group(&mut self) -> Result<(), VellumError> {
        let start_index = self.expressions.len();
        self.expressions.push(Expression::Placeholder);
        loop {
            self.read_value_as_expression(false)?;
            if !self.stream.next_raw()? {
                break;
            }
        }
        let end_exclusive = self.expressions.len();
        self.expressions[start_index] =
            Expression::ExpressionGroup { self_index: start_index, end_exclusive };
        Ok(())
    }

    /// Reads a container value, reserving a placeholder slot and patching it
    /// once the children, and therefore the end index, are known.
    fn read_container_value_as_expression(
        &mut self,
        value_type: ValueType,
        annotations: Annotations,
    ) -> Result<(), VellumError> {
        let start_index = self.expressions.len();
        self.expressions.push(Expression::Placeholder);
        // Decided before stepping in: the group marker is on the container.
        let is_expression_group = self.stream.is_expression_group();
        self.stream.step_in_raw()?;
        while self.stream.next_raw()? {
            if value_type == ValueType::Struct {
                let name = self.stream.field_name()?;
                self.expressions.push(Expression::FieldName(name));
            }
            self.read_value_as_expression(false)?;
        }
        self.stream.step_out_raw()?;
        let end_exclusive = self.expressions.len();
        let self_index = start_index;
        self.expressions[start_index] = if is_expression_group {
            Expression::ExpressionGroup { self_index, end_exclusive }
        } else {
            match value_type {
                ValueType::List => Expression::List { annotations, self_index, end_exclusive },
                ValueType::SExp => Expression::SExp { annotations, self_index, end_exclusive },
                ValueType::Struct => Expression::Struct { annotations, self_index, end_exclusive },
                other => {
                    return Err(VellumError::defect(format!(
                        "container read reached non-container type {}",
                        other
                    )));
                }
            }
        };
        Ok(())
    }

    /// Reads a scalar value into its expression variant.
    fn read_scalar_value_as_expression(
        &mut self,
        value_type: ValueType,
        annotations: Annotations,
    ) -> Result<(), VellumError> {
        let expression = if self.stream.is_null()? {
            Expression::Null { annotations, value_type }
        } else {
            match value_type {
                ValueType::Bool => {
                    Expression::Bool { annotations, value: self.stream.bool_value()? }
                }
                ValueType::Int => match self.stream.int_size()? {
                    IntegerSize::I64 => {
                        Expression::Int { annotations, value: self.stream.i64_value()? }
                    }
                    IntegerSize::Big => {
                        Expression::BigInt { annotations, value: self.stream.big_int_value()? }
                    }
                },
                ValueType::Float => {
                    Expression::Float { annotations, value: self.stream.f64_value()? }
                }
                ValueType::Decimal => {
                    Expression::Decimal { annotations, value: self.stream.decimal_value()? }
                }
                ValueType::Timestamp => {
                    Expression::Timestamp { annotations, value: self.stream.timestamp_value()? }
                }
                ValueType::Symbol => {
                    Expression::Symbol { annotations, value: self.stream.symbol_value()? }
                }
                ValueType::String => {
                    Expression::String { annotations, value: self.stream.string_value()? }
                }
                ValueType::Clob => {
                    Expression::Clob { annotations, value: self.stream.bytes_value()? }
                }
                ValueType::Blob => {
                    Expression::Blob { annotations, value: self.stream.bytes_value()? }
                }
                // Null is handled above; containers never reach this method.
                other => {
                    return Err(VellumError::defect(format!(
                        "scalar read reached unhandled type {}",
                        other
                    )));
                }
            }
        };
        self.expressions.push(expression);
        Ok(())
    }
}
