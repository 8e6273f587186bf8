//! Programmatic construction of compiled template bodies.
//!
//! The template-definition language itself is parsed elsewhere; whatever
//! front end produces a macro must hand this crate a body in the flattened
//! expression model. [`TemplateBuilder`] is that hand-off made safe: it
//! reserves container slots with placeholders, patches them on `end()`
//! exactly the way the argument reader does for streams, and refuses to
//! produce a body that violates the model's invariants.
//!
//! Errors are deferred: every method chains, and the first problem is
//! reported by [`TemplateBuilder::build`].

use std::sync::Arc;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::expr::Expression;
use crate::macros::definition::{Macro, Parameter};
use crate::types::{Annotations, SymbolToken, Timestamp, ValueType};
use crate::VellumError;

#[derive(Debug)]
enum OpenKind {
    List,
    SExp,
    Struct,
    Group,
    Invocation(Arc<Macro>),
}

#[derive(Debug)]
struct OpenFrame {
    slot: usize,
    kind: OpenKind,
    annotations: Annotations,
    /// Struct frames only: true when the next entry must be a field name.
    awaiting_field: bool,
}

/// Builds one compiled template body against a signature. The builder keeps
/// its own copy of the signature; it only needs the parameter names.
#[derive(Debug)]
pub struct TemplateBuilder {
    signature: Vec<Parameter>,
    expressions: Vec<Expression>,
    open: Vec<OpenFrame>,
    pending_annotations: Annotations,
    error: Option<VellumError>,
}

impl TemplateBuilder {
    pub fn new(signature: &[Parameter]) -> Self {
        TemplateBuilder {
            signature: signature.to_vec(),
            expressions: Vec::new(),
            open: Vec::new(),
            pending_annotations: Vec::new(),
            error: None,
        }
    }

    fn record_error(&mut self, error: VellumError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Enforces struct field discipline for the entry about to be appended,
    /// and marks the enclosing struct as needing a field name again.
    fn note_entry(&mut self) {
        let missing_field_name = match self.open.last_mut() {
            Some(frame) if matches!(frame.kind, OpenKind::Struct) => {
                let missing = frame.awaiting_field;
                frame.awaiting_field = true;
                missing
            }
            _ => false,
        };
        if missing_field_name {
            self.record_error(VellumError::invalid_macro(
                "struct entries must be preceded by a field name",
            ));
        }
    }

    fn take_annotations(&mut self) -> Annotations {
        std::mem::take(&mut self.pending_annotations)
    }

    fn push_value(&mut self, make: impl FnOnce(Annotations) -> Expression) -> &mut Self {
        self.note_entry();
        let annotations = self.take_annotations();
        self.expressions.push(make(annotations));
        self
    }

    /// Attaches annotations to the next value or container.
    pub fn annotate<T: Into<SymbolToken>>(
        &mut self,
        annotations: impl IntoIterator<Item = T>,
    ) -> &mut Self {
        self.pending_annotations = annotations.into_iter().map(Into::into).collect();
        self
    }

    pub fn null(&mut self, value_type: ValueType) -> &mut Self {
        self.push_value(|annotations| Expression::Null { annotations, value_type })
    }

    pub fn bool(&mut self, value: bool) -> &mut Self {
        self.push_value(|annotations| Expression::Bool { annotations, value })
    }

    pub fn int(&mut self, value: i64) -> &mut Self {
        self.push_value(|annotations| Expression::Int { annotations, value })
    }

    pub fn big_int(&mut self, value: BigInt) -> &mut Self {
        self.push_value(|annotations| Expression::BigInt { annotations, value })
    }

    pub fn float(&mut self, value: f64) -> &mut Self {
        self.push_value(|annotations| Expression::Float { annotations, value })
    }

    pub fn decimal(&mut self, value: BigDecimal) -> &mut Self {
        self.push_value(|annotations| Expression::Decimal { annotations, value })
    }

    pub fn timestamp(&mut self, value: Timestamp) -> &mut Self {
        self.push_value(|annotations| Expression::Timestamp { annotations, value })
    }

    pub fn symbol(&mut self, value: impl Into<SymbolToken>) -> &mut Self {
        let value = value.into();
        self.push_value(|annotations| Expression::Symbol { annotations, value })
    }

    pub fn string(&mut self, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        self.push_value(|annotations| Expression::String { annotations, value })
    }

    pub fn clob(&mut self, value: impl Into<Vec<u8>>) -> &mut Self {
        let value = value.into();
        self.push_value(|annotations| Expression::Clob { annotations, value })
    }

    pub fn blob(&mut self, value: impl Into<Vec<u8>>) -> &mut Self {
        let value = value.into();
        self.push_value(|annotations| Expression::Blob { annotations, value })
    }

    /// References a signature parameter by name.
    pub fn variable(&mut self, name: &str) -> &mut Self {
        let position = self.signature.iter().position(|parameter| parameter.name() == name);
        match position {
            Some(signature_index) => {
                self.note_entry();
                if !self.pending_annotations.is_empty() {
                    self.record_error(VellumError::invalid_macro(
                        "variable references cannot be annotated",
                    ));
                    self.pending_annotations.clear();
                }
                self.expressions.push(Expression::VariableRef { signature_index });
            }
            None => {
                self.record_error(VellumError::invalid_macro(format!(
                    "variable '{}' does not name a signature parameter",
                    name
                )));
            }
        }
        self
    }

    /// Names the next entry of the innermost open struct.
    pub fn field(&mut self, name: impl Into<SymbolToken>) -> &mut Self {
        let name = name.into();
        let state = match self.open.last_mut() {
            Some(frame) if matches!(frame.kind, OpenKind::Struct) => {
                let repeated = !frame.awaiting_field;
                frame.awaiting_field = false;
                Some(repeated)
            }
            _ => None,
        };
        match state {
            Some(repeated) => {
                if repeated {
                    self.record_error(VellumError::invalid_macro(
                        "field name follows another field name",
                    ));
                }
                self.expressions.push(Expression::FieldName(name));
            }
            None => {
                self.record_error(VellumError::invalid_macro(
                    "field names are only valid directly inside a struct",
                ));
            }
        }
        self
    }

    fn begin(&mut self, kind: OpenKind) -> &mut Self {
        self.note_entry();
        let annotations = self.take_annotations();
        let slot = self.expressions.len();
        self.expressions.push(Expression::Placeholder);
        self.open.push(OpenFrame {
            slot,
            kind,
            annotations,
            awaiting_field: true,
        });
        self
    }

    pub fn begin_list(&mut self) -> &mut Self {
        self.begin(OpenKind::List)
    }

    pub fn begin_sexp(&mut self) -> &mut Self {
        self.begin(OpenKind::SExp)
    }

    pub fn begin_struct(&mut self) -> &mut Self {
        self.begin(OpenKind::Struct)
    }

    /// Opens an expression group (a variadic argument run for an enclosing
    /// invocation's parameter slot).
    pub fn begin_group(&mut self) -> &mut Self {
        if !self.pending_annotations.is_empty() {
            self.record_error(VellumError::invalid_macro("expression groups cannot be annotated"));
            self.pending_annotations.clear();
        }
        self.begin(OpenKind::Group)
    }

    /// Opens a nested invocation of another macro inside the body.
    pub fn begin_invocation(&mut self, invoked: Arc<Macro>) -> &mut Self {
        if !self.pending_annotations.is_empty() {
            self.record_error(VellumError::invalid_macro("invocations cannot be annotated"));
            self.pending_annotations.clear();
        }
        self.begin(OpenKind::Invocation(invoked))
    }

    /// Closes the innermost open container, patching its reserved slot with
    /// the now-known end index.
    pub fn end(&mut self) -> &mut Self {
        let Some(frame) = self.open.pop() else {
            self.record_error(VellumError::invalid_macro("end() without an open container"));
            return self;
        };
        if matches!(frame.kind, OpenKind::Struct) && !frame.awaiting_field {
            self.record_error(VellumError::invalid_macro("struct closed after a dangling field name"));
        }
        let self_index = frame.slot;
        let end_exclusive = self.expressions.len();
        let annotations = frame.annotations;
        self.expressions[self_index] = match frame.kind {
            OpenKind::List => Expression::List { annotations, self_index, end_exclusive },
            OpenKind::SExp => Expression::SExp { annotations, self_index, end_exclusive },
            OpenKind::Struct => Expression::Struct { annotations, self_index, end_exclusive },
            OpenKind::Group => Expression::ExpressionGroup { self_index, end_exclusive },
            OpenKind::Invocation(invoked) => {
                Expression::MacroInvocation { invoked, self_index, end_exclusive }
            }
        };
        self
    }

    /// Finishes the body.
    ///
    /// # Errors
    /// Surfaces the first construction error, unclosed containers, or
    /// trailing annotations that never attached to a value.
    pub fn build(mut self) -> Result<Vec<Expression>, VellumError> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }
        if !self.open.is_empty() {
            return Err(VellumError::invalid_macro(format!(
                "{} container(s) left open",
                self.open.len()
            )));
        }
        if !self.pending_annotations.is_empty() {
            return Err(VellumError::invalid_macro("annotations with no following value"));
        }
        Ok(self.expressions)
    }
}
