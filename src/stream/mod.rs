//! The abstract stream-reader capability and its supporting types.
//!
//! The argument reader and the matcher never touch bytes or characters;
//! they drive a [`StreamReader`], a positioned cursor over an encoded
//! stream. Binary and text encodings implement the trait differently
//! (binary detects invocation and group boundaries from length-prefixed
//! framing and presence bitmaps, text from syntactic markers and look-ahead)
//! but the capability set is identical.
//!
//! [`tree::TreeReader`] is the in-memory reference implementation used
//! throughout this crate's tests.

pub mod presence;
pub mod tree;

pub use presence::{ArgPresence, PresenceBitmap};
pub use tree::{Invocation, RawItem, TreeReader};

use std::sync::Arc;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::macros::{Macro, Parameter};
use crate::types::{Annotations, IntegerSize, SymbolToken, Timestamp, ValueType};
use crate::VellumError;

/// A positioned cursor over one encoded stream.
///
/// Navigation is forward-only. `next_raw` advances to the next raw value at
/// the current depth without interpreting system values; `step_in_raw` /
/// `step_out_raw` enter and leave the container the cursor is positioned on.
/// Scalar accessors read the current value and fail if the cursor is not on
/// a value of the requested type.
///
/// Implementations are not required to be (and in practice are not) safe
/// for use from multiple threads; use one cursor per thread.
pub trait StreamReader {
    /// Advances to the next raw value at the current depth. Returns `false`
    /// at the end of the current container (or stream).
    fn next_raw(&mut self) -> Result<bool, VellumError>;

    /// Steps into the container the cursor is positioned on.
    fn step_in_raw(&mut self) -> Result<(), VellumError>;

    /// Steps out of the container entered by the matching `step_in_raw`.
    fn step_out_raw(&mut self) -> Result<(), VellumError>;

    /// The declared type of the current value.
    fn value_type(&self) -> Result<ValueType, VellumError>;

    /// True if the current value is a null (typed or untyped).
    fn is_null(&self) -> Result<bool, VellumError>;

    /// Eagerly collects the annotations on the current value; empty if none.
    fn annotations(&self) -> Result<Annotations, VellumError>;

    /// True if the cursor's enclosing context is a struct.
    fn is_in_struct(&self) -> bool;

    /// The field name of the current value; only valid inside a struct.
    fn field_name(&self) -> Result<SymbolToken, VellumError>;

    fn bool_value(&self) -> Result<bool, VellumError>;

    /// The width class of the current integer, deciding which expression
    /// variant it materializes into.
    fn int_size(&self) -> Result<IntegerSize, VellumError>;

    fn i64_value(&self) -> Result<i64, VellumError>;

    fn big_int_value(&self) -> Result<BigInt, VellumError>;

    fn f64_value(&self) -> Result<f64, VellumError>;

    fn decimal_value(&self) -> Result<BigDecimal, VellumError>;

    fn timestamp_value(&self) -> Result<Timestamp, VellumError>;

    fn symbol_value(&self) -> Result<SymbolToken, VellumError>;

    fn string_value(&self) -> Result<String, VellumError>;

    /// The bytes of the current blob or clob.
    fn bytes_value(&self) -> Result<Vec<u8>, VellumError>;

    /// True if the value the cursor is positioned on is a macro invocation.
    fn is_macro_invocation(&self) -> bool;

    /// True if the container the cursor is positioned on is an expression
    /// group rather than a data value.
    fn is_expression_group(&self) -> bool;

    /// Steps into the argument sequence of the invocation the cursor is
    /// positioned on.
    fn step_into_eexpression(&mut self) -> Result<(), VellumError>;

    /// Steps out of the invocation entered by `step_into_eexpression`.
    fn step_out_of_eexpression(&mut self) -> Result<(), VellumError>;

    /// Resolves the invocation's macro reference against the active macro
    /// table. Called while positioned on the invocation, before stepping in.
    fn load_macro(&mut self) -> Result<Arc<Macro>, VellumError>;

    /// Reads the argument-encoding bitmap for the invocation just stepped
    /// into, if this encoding carries one. `None` means every parameter is
    /// treated as a single expression.
    fn load_presence_bitmap(
        &mut self,
        signature: &[Parameter],
    ) -> Result<Option<PresenceBitmap>, VellumError>;

    /// True if this encoding lets a trailing variadic parameter be supplied
    /// as a bare run of values with no group syntax (text encodings).
    fn supports_implicit_rest(&self) -> bool;
}
