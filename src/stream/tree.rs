//! An in-memory [`StreamReader`] over a raw item tree.
//!
//! Encoded streams contain more than data-model values: e-expressions and
//! expression groups appear anywhere a value can. [`RawItem`] is that raw
//! shape: plain [`Element`]s for fully-decoded values, raw containers whose
//! children may themselves be invocations, groups, and invocations with
//! their unresolved addresses. [`TreeReader`] walks such a tree with an
//! explicit frame stack, implementing the full reader contract.
//!
//! Encoding behavior follows the invocation, not the reader: an
//! [`Invocation`] carrying a presence bitmap reads like binary (bits
//! honored, no implicit rest); one without reads like text (absence is
//! syntactic, a trailing variadic parameter accepts a bare run of values).

use std::sync::Arc;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::element::{Element, Int, Value};
use crate::macros::{Macro, MacroRef, MacroTable, Parameter};
use crate::stream::presence::PresenceBitmap;
use crate::stream::StreamReader;
use crate::types::{Annotations, IntegerSize, SymbolToken, Timestamp, ValueType};
use crate::VellumError;

/// A macro invocation as it appears in a raw stream, before resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub address: MacroRef,
    /// Present for binary-encoded invocations only.
    pub presence: Option<PresenceBitmap>,
    pub args: Vec<RawItem>,
}

impl Invocation {
    pub fn by_name(name: &str, args: Vec<RawItem>) -> Self {
        Invocation { address: MacroRef::Name(name.to_string()), presence: None, args }
    }

    pub fn by_id(id: usize, args: Vec<RawItem>) -> Self {
        Invocation { address: MacroRef::Id(id), presence: None, args }
    }

    /// Marks this invocation as binary-encoded with the given presence bits.
    pub fn with_presence(mut self, presence: PresenceBitmap) -> Self {
        self.presence = Some(presence);
        self
    }
}

/// One node of a raw stream: a decoded value, a raw container whose children
/// may include invocations, an expression group, or an invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum RawItem {
    Value(Element),
    List(Annotations, Vec<RawItem>),
    SExp(Annotations, Vec<RawItem>),
    Struct(Annotations, Vec<(SymbolToken, RawItem)>),
    Group(Vec<RawItem>),
    Invocation(Invocation),
}

impl From<Element> for RawItem {
    fn from(element: Element) -> Self {
        RawItem::Value(element)
    }
}

impl From<Invocation> for RawItem {
    fn from(invocation: Invocation) -> Self {
        RawItem::Invocation(invocation)
    }
}

/// The child sequence a frame iterates. Raw and element containers have
/// different storage, and structs pair each child with its field name.
#[derive(Debug, Clone, Copy)]
enum Children<'a> {
    Raw(&'a [RawItem]),
    RawFields(&'a [(SymbolToken, RawItem)]),
    Elems(&'a [Element]),
    ElemFields(&'a [(SymbolToken, Element)]),
}

impl<'a> Children<'a> {
    fn len(&self) -> usize {
        match self {
            Children::Raw(items) => items.len(),
            Children::RawFields(fields) => fields.len(),
            Children::Elems(items) => items.len(),
            Children::ElemFields(fields) => fields.len(),
        }
    }

    fn node_at(&self, index: usize) -> Option<Node<'a>> {
        match self {
            Children::Raw(items) => items.get(index).map(Node::of_raw),
            Children::RawFields(fields) => fields.get(index).map(|(_, item)| Node::of_raw(item)),
            Children::Elems(items) => items.get(index).map(Node::Elem),
            Children::ElemFields(fields) => fields.get(index).map(|(_, element)| Node::Elem(element)),
        }
    }

    fn name_at(&self, index: usize) -> Option<&'a SymbolToken> {
        match self {
            Children::RawFields(fields) => fields.get(index).map(|(name, _)| name),
            Children::ElemFields(fields) => fields.get(index).map(|(name, _)| name),
            Children::Raw(_) | Children::Elems(_) => None,
        }
    }
}

/// A resolved view of the current node. `Raw` never wraps
/// [`RawItem::Value`]; those surface as `Elem`.
#[derive(Debug, Clone, Copy)]
enum Node<'a> {
    Elem(&'a Element),
    Raw(&'a RawItem),
}

impl<'a> Node<'a> {
    fn of_raw(item: &'a RawItem) -> Node<'a> {
        match item {
            RawItem::Value(element) => Node::Elem(element),
            other => Node::Raw(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    TopLevel,
    List,
    SExp,
    Struct,
    Group,
    EExpression,
}

#[derive(Debug)]
struct Frame<'a> {
    kind: FrameKind,
    children: Children<'a>,
    /// `None` before the first `next_raw` at this depth.
    pos: Option<usize>,
    /// Set for e-expression frames only.
    invocation: Option<&'a Invocation>,
}

/// A [`StreamReader`] over an in-memory raw item tree.
#[derive(Debug)]
pub struct TreeReader<'a> {
    table: &'a MacroTable,
    frames: Vec<Frame<'a>>,
}

impl<'a> TreeReader<'a> {
    /// A reader over a raw stream: values, invocations, groups.
    pub fn new(items: &'a [RawItem], table: &'a MacroTable) -> Self {
        TreeReader {
            table,
            frames: vec![Frame {
                kind: FrameKind::TopLevel,
                children: Children::Raw(items),
                pos: None,
                invocation: None,
            }],
        }
    }

    /// A reader over plain decoded values, the shape the matcher consumes.
    pub fn over_elements(elements: &'a [Element], table: &'a MacroTable) -> Self {
        TreeReader {
            table,
            frames: vec![Frame {
                kind: FrameKind::TopLevel,
                children: Children::Elems(elements),
                pos: None,
                invocation: None,
            }],
        }
    }

    fn top(&self) -> Result<&Frame<'a>, VellumError> {
        self.frames.last().ok_or_else(|| VellumError::defect("reader frame stack underflow"))
    }

    fn top_mut(&mut self) -> Result<&mut Frame<'a>, VellumError> {
        self.frames.last_mut().ok_or_else(|| VellumError::defect("reader frame stack underflow"))
    }

    fn current(&self) -> Result<Node<'a>, VellumError> {
        let frame = self.top()?;
        let pos = frame
            .pos
            .ok_or_else(|| VellumError::invalid_stream("cursor is not positioned on a value"))?;
        frame
            .children
            .node_at(pos)
            .ok_or_else(|| VellumError::invalid_stream("cursor is past the end of its container"))
    }

    /// Like [`current`](Self::current) but `None` off-value, for the
    /// boolean probes that must not fail.
    fn current_or_none(&self) -> Option<Node<'a>> {
        let frame = self.frames.last()?;
        frame.children.node_at(frame.pos?)
    }

    fn current_element(&self) -> Result<&'a Element, VellumError> {
        match self.current()? {
            Node::Elem(element) => Ok(element),
            Node::Raw(_) => {
                Err(VellumError::invalid_stream("expected a data value under the cursor"))
            }
        }
    }

    fn scalar_mismatch(&self, expected: &str) -> VellumError {
        VellumError::invalid_stream(format!("current value is not a {}", expected))
    }

    fn innermost_invocation(&self) -> Option<&'a Invocation> {
        self.frames.iter().rev().find_map(|frame| frame.invocation)
    }
}

impl<'a> StreamReader for TreeReader<'a> {
    fn next_raw(&mut self) -> Result<bool, VellumError> {
        let frame = self.top_mut()?;
        let next = frame.pos.map_or(0, |pos| pos + 1);
        frame.pos = Some(next);
        Ok(next < frame.children.len())
    }

    fn step_in_raw(&mut self) -> Result<(), VellumError> {
        let (kind, children) = match self.current()? {
            Node::Elem(element) => match &element.value {
                Value::List(items) => (FrameKind::List, Children::Elems(items)),
                Value::SExp(items) => (FrameKind::SExp, Children::Elems(items)),
                Value::Struct(fields) => (FrameKind::Struct, Children::ElemFields(fields)),
                _ => return Err(self.scalar_mismatch("container")),
            },
            Node::Raw(item) => match item {
                RawItem::List(_, items) => (FrameKind::List, Children::Raw(items)),
                RawItem::SExp(_, items) => (FrameKind::SExp, Children::Raw(items)),
                RawItem::Struct(_, fields) => (FrameKind::Struct, Children::RawFields(fields)),
                RawItem::Group(items) => (FrameKind::Group, Children::Raw(items)),
                RawItem::Invocation(_) => {
                    return Err(VellumError::invalid_stream(
                        "use step_into_eexpression for invocations",
                    ));
                }
                RawItem::Value(_) => {
                    return Err(VellumError::defect("raw value not unwrapped to an element"));
                }
            },
        };
        self.frames.push(Frame { kind, children, pos: None, invocation: None });
        Ok(())
    }

    fn step_out_raw(&mut self) -> Result<(), VellumError> {
        let top_kind = self.top()?.kind;
        if self.frames.len() <= 1 || top_kind == FrameKind::EExpression {
            return Err(VellumError::invalid_stream("step_out_raw without a matching step_in_raw"));
        }
        self.frames.pop();
        Ok(())
    }

    fn value_type(&self) -> Result<ValueType, VellumError> {
        match self.current()? {
            Node::Elem(element) => Ok(element.value_type()),
            Node::Raw(RawItem::List(..)) => Ok(ValueType::List),
            // Groups read as s-expressions; the group marker is separate.
            Node::Raw(RawItem::SExp(..)) | Node::Raw(RawItem::Group(_)) => Ok(ValueType::SExp),
            Node::Raw(RawItem::Struct(..)) => Ok(ValueType::Struct),
            Node::Raw(RawItem::Invocation(_)) => {
                Err(VellumError::invalid_stream("invocations have no value type"))
            }
            Node::Raw(RawItem::Value(_)) => {
                Err(VellumError::defect("raw value not unwrapped to an element"))
            }
        }
    }

    fn is_null(&self) -> Result<bool, VellumError> {
        match self.current()? {
            Node::Elem(element) => Ok(element.is_null()),
            Node::Raw(_) => Ok(false),
        }
    }

    fn annotations(&self) -> Result<Annotations, VellumError> {
        match self.current()? {
            Node::Elem(element) => Ok(element.annotations.clone()),
            Node::Raw(RawItem::List(annotations, _))
            | Node::Raw(RawItem::SExp(annotations, _))
            | Node::Raw(RawItem::Struct(annotations, _)) => Ok(annotations.clone()),
            Node::Raw(_) => Ok(Vec::new()),
        }
    }

    fn is_in_struct(&self) -> bool {
        self.frames.last().is_some_and(|frame| frame.kind == FrameKind::Struct)
    }

    fn field_name(&self) -> Result<SymbolToken, VellumError> {
        let frame = self.top()?;
        if frame.kind != FrameKind::Struct {
            return Err(VellumError::invalid_stream("field names exist only inside structs"));
        }
        let pos = frame
            .pos
            .ok_or_else(|| VellumError::invalid_stream("cursor is not positioned on a value"))?;
        frame
            .children
            .name_at(pos)
            .cloned()
            .ok_or_else(|| VellumError::invalid_stream("cursor is past the end of its container"))
    }

    fn bool_value(&self) -> Result<bool, VellumError> {
        match &self.current_element()?.value {
            Value::Bool(value) => Ok(*value),
            _ => Err(self.scalar_mismatch("bool")),
        }
    }

    fn int_size(&self) -> Result<IntegerSize, VellumError> {
        match &self.current_element()?.value {
            Value::Int(Int::I64(_)) => Ok(IntegerSize::I64),
            Value::Int(Int::Big(_)) => Ok(IntegerSize::Big),
            _ => Err(self.scalar_mismatch("int")),
        }
    }

    fn i64_value(&self) -> Result<i64, VellumError> {
        match &self.current_element()?.value {
            Value::Int(Int::I64(value)) => Ok(*value),
            _ => Err(self.scalar_mismatch("fixed-width int")),
        }
    }

    fn big_int_value(&self) -> Result<BigInt, VellumError> {
        match &self.current_element()?.value {
            Value::Int(int) => Ok(int.to_big()),
            _ => Err(self.scalar_mismatch("int")),
        }
    }

    fn f64_value(&self) -> Result<f64, VellumError> {
        match &self.current_element()?.value {
            Value::Float(value) => Ok(*value),
            _ => Err(self.scalar_mismatch("float")),
        }
    }

    fn decimal_value(&self) -> Result<BigDecimal, VellumError> {
        match &self.current_element()?.value {
            Value::Decimal(value) => Ok(value.clone()),
            _ => Err(self.scalar_mismatch("decimal")),
        }
    }

    fn timestamp_value(&self) -> Result<Timestamp, VellumError> {
        match &self.current_element()?.value {
            Value::Timestamp(value) => Ok(*value),
            _ => Err(self.scalar_mismatch("timestamp")),
        }
    }

    fn symbol_value(&self) -> Result<SymbolToken, VellumError> {
        match &self.current_element()?.value {
            Value::Symbol(value) => Ok(value.clone()),
            _ => Err(self.scalar_mismatch("symbol")),
        }
    }

    fn string_value(&self) -> Result<String, VellumError> {
        match &self.current_element()?.value {
            Value::String(value) => Ok(value.clone()),
            _ => Err(self.scalar_mismatch("string")),
        }
    }

    fn bytes_value(&self) -> Result<Vec<u8>, VellumError> {
        match &self.current_element()?.value {
            Value::Clob(bytes) | Value::Blob(bytes) => Ok(bytes.clone()),
            _ => Err(self.scalar_mismatch("lob")),
        }
    }

    fn is_macro_invocation(&self) -> bool {
        matches!(self.current_or_none(), Some(Node::Raw(RawItem::Invocation(_))))
    }

    fn is_expression_group(&self) -> bool {
        matches!(self.current_or_none(), Some(Node::Raw(RawItem::Group(_))))
    }

    fn step_into_eexpression(&mut self) -> Result<(), VellumError> {
        match self.current()? {
            Node::Raw(RawItem::Invocation(invocation)) => {
                self.frames.push(Frame {
                    kind: FrameKind::EExpression,
                    children: Children::Raw(&invocation.args),
                    pos: None,
                    invocation: Some(invocation),
                });
                Ok(())
            }
            _ => Err(VellumError::invalid_stream("cursor is not on a macro invocation")),
        }
    }

    fn step_out_of_eexpression(&mut self) -> Result<(), VellumError> {
        if self.top()?.kind != FrameKind::EExpression {
            return Err(VellumError::invalid_stream(
                "step_out_of_eexpression outside an e-expression",
            ));
        }
        self.frames.pop();
        Ok(())
    }

    fn load_macro(&mut self) -> Result<Arc<Macro>, VellumError> {
        match self.current()? {
            Node::Raw(RawItem::Invocation(invocation)) => self
                .table
                .resolve(&invocation.address)
                .ok_or_else(|| VellumError::unresolved_macro(&invocation.address)),
            _ => Err(VellumError::invalid_stream("cursor is not on a macro invocation")),
        }
    }

    fn load_presence_bitmap(
        &mut self,
        signature: &[Parameter],
    ) -> Result<Option<PresenceBitmap>, VellumError> {
        let frame = self.top()?;
        let invocation = match (frame.kind, frame.invocation) {
            (FrameKind::EExpression, Some(invocation)) => invocation,
            _ => {
                return Err(VellumError::invalid_stream(
                    "presence bits are read after stepping into an invocation",
                ));
            }
        };
        match &invocation.presence {
            None => Ok(None),
            Some(bitmap) => {
                bitmap.validate(signature)?;
                Ok(Some(bitmap.clone()))
            }
        }
    }

    fn supports_implicit_rest(&self) -> bool {
        // Binary-style invocations (those carrying a bitmap) never permit
        // implicit rest; outside any invocation the question is moot and
        // answered like text.
        self.innermost_invocation().map_or(true, |invocation| invocation.presence.is_none())
    }
}
