//! Macro definitions: signatures, parameter cardinalities, and the
//! references used to address macros from an encoded stream.

use serde::{Deserialize, Serialize};

use crate::expr::Expression;
use crate::VellumError;

/// How many argument expressions a parameter accepts.
///
/// The sigil column is the one the text grammar uses after a parameter name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    /// `!`: exactly one expression.
    ExactlyOne,
    /// `?`: zero or one expression.
    ZeroOrOne,
    /// `*`: any number of expressions.
    ZeroOrMore,
    /// `+`: at least one expression.
    OneOrMore,
}

impl Cardinality {
    /// True if an invocation may omit this parameter entirely.
    pub fn can_be_void(self) -> bool {
        matches!(self, Cardinality::ZeroOrOne | Cardinality::ZeroOrMore)
    }

    /// True if an invocation may supply more than one expression, which is
    /// what makes a trailing parameter eligible for implicit-rest syntax.
    pub fn can_be_multi(self) -> bool {
        matches!(self, Cardinality::ZeroOrMore | Cardinality::OneOrMore)
    }

    pub fn sigil(self) -> char {
        match self {
            Cardinality::ExactlyOne => '!',
            Cardinality::ZeroOrOne => '?',
            Cardinality::ZeroOrMore => '*',
            Cardinality::OneOrMore => '+',
        }
    }
}

/// The encoding a parameter's arguments are written with. `Tagged` arguments
/// carry their own type markers; the tagless encodings are fixed-width or
/// variable-length primitives whose shape the signature pins down.
///
/// The argument reader treats this as a hint only; tagless argument decoding
/// happens in the stream adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ParameterEncoding {
    #[default]
    Tagged,
    FlexUInt,
    FlexInt,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float16,
    Float32,
    Float64,
    FlexSym,
}

/// One named slot in a macro signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    name: String,
    encoding: ParameterEncoding,
    cardinality: Cardinality,
}

impl Parameter {
    pub fn new(
        name: impl Into<String>,
        encoding: ParameterEncoding,
        cardinality: Cardinality,
    ) -> Self {
        Parameter { name: name.into(), encoding, cardinality }
    }

    /// A tagged, exactly-one parameter: the common case.
    pub fn required(name: impl Into<String>) -> Self {
        Parameter::new(name, ParameterEncoding::Tagged, Cardinality::ExactlyOne)
    }

    pub fn zero_or_one(name: impl Into<String>) -> Self {
        Parameter::new(name, ParameterEncoding::Tagged, Cardinality::ZeroOrOne)
    }

    pub fn zero_or_more(name: impl Into<String>) -> Self {
        Parameter::new(name, ParameterEncoding::Tagged, Cardinality::ZeroOrMore)
    }

    pub fn one_or_more(name: impl Into<String>) -> Self {
        Parameter::new(name, ParameterEncoding::Tagged, Cardinality::OneOrMore)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn encoding(&self) -> ParameterEncoding {
        self.encoding
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }
}

impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.name, self.cardinality.sigil())
    }
}

/// A reference to a macro as it appears at an invocation site: binary
/// encodings address macros by table offset, text encodings by offset or by
/// name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MacroRef {
    Id(usize),
    Name(String),
}

impl From<usize> for MacroRef {
    fn from(id: usize) -> Self {
        MacroRef::Id(id)
    }
}

impl From<&str> for MacroRef {
    fn from(name: &str) -> Self {
        MacroRef::Name(name.to_string())
    }
}

impl std::fmt::Display for MacroRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MacroRef::Id(id) => write!(f, "{}", id),
            MacroRef::Name(name) => write!(f, "{}", name),
        }
    }
}

/// A macro definition: a signature, and for template macros a compiled body
/// in the flattened expression model. System macros have no body; their
/// expansion is native to the evaluator.
#[derive(Debug, Clone, PartialEq)]
pub struct Macro {
    name: Option<String>,
    signature: Vec<Parameter>,
    body: Option<Vec<Expression>>,
}

impl Macro {
    /// Creates a template macro, validating the signature and the compiled
    /// body (well-nested ranges, no leaked placeholders, variable
    /// references in range).
    pub fn template(
        name: impl Into<String>,
        signature: Vec<Parameter>,
        body: Vec<Expression>,
    ) -> Result<Self, VellumError> {
        let name = name.into();
        validate_signature(&signature)?;
        validate_body(&signature, &body)?;
        Ok(Macro { name: Some(name), signature, body: Some(body) })
    }

    /// Creates a bodiless macro whose expansion is implemented natively.
    /// The signature is validated; there is no body to check.
    pub fn system(name: impl Into<String>, signature: Vec<Parameter>) -> Result<Self, VellumError> {
        validate_signature(&signature)?;
        Ok(Macro { name: Some(name.into()), signature, body: None })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn signature(&self) -> &[Parameter] {
        &self.signature
    }

    /// The compiled body, present only for template macros.
    pub fn body(&self) -> Option<&[Expression]> {
        self.body.as_deref()
    }

    pub fn is_template(&self) -> bool {
        self.body.is_some()
    }
}

fn validate_signature(signature: &[Parameter]) -> Result<(), VellumError> {
    let mut seen = std::collections::HashSet::new();
    for parameter in signature {
        if !seen.insert(parameter.name()) {
            return Err(VellumError::invalid_macro(format!(
                "duplicate parameter name '{}'",
                parameter.name()
            )));
        }
    }
    Ok(())
}

/// Checks that a compiled body is a well-formed flattening: no placeholder
/// leaked out of construction, every range node sits at its recorded index
/// with a well-nested child range, every variable names a signature slot,
/// and no field name dangles.
fn validate_body(signature: &[Parameter], body: &[Expression]) -> Result<(), VellumError> {
    let mut open_ends: Vec<usize> = Vec::new();
    for (index, expression) in body.iter().enumerate() {
        while open_ends.last() == Some(&index) {
            open_ends.pop();
        }
        let enclosing_end = open_ends.last().copied().unwrap_or(body.len());
        match expression {
            Expression::Placeholder => {
                return Err(VellumError::defect(format!(
                    "placeholder leaked into compiled body at index {}",
                    index
                )));
            }
            Expression::VariableRef { signature_index } => {
                if *signature_index >= signature.len() {
                    return Err(VellumError::invalid_macro(format!(
                        "variable reference {} out of range for a {}-parameter signature",
                        signature_index,
                        signature.len()
                    )));
                }
            }
            Expression::FieldName(_) => {
                match body.get(index + 1) {
                    Some(Expression::FieldName(_)) | Some(Expression::Placeholder) | None => {
                        return Err(VellumError::invalid_macro(format!(
                            "dangling field name at index {}",
                            index
                        )));
                    }
                    Some(_) => {}
                }
            }
            _ => {}
        }
        if let Some(range) = expression.child_range() {
            let declared_self = range.start - 1;
            if declared_self != index {
                return Err(VellumError::invalid_macro(format!(
                    "expression at index {} records self index {}",
                    index, declared_self
                )));
            }
            if range.end < range.start || range.end > enclosing_end {
                return Err(VellumError::invalid_macro(format!(
                    "child range of expression at index {} crosses its container boundary",
                    index
                )));
            }
            open_ends.push(range.end);
        }
    }
    Ok(())
}
