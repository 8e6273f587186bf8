//! Vellum is a compact data-interchange format: a superset of JSON-like
//! structured data with a binary encoding, symbol tables, and a template-macro
//! system ("e-expressions") that lets streams factor out repeated structure.
//!
//! This crate implements the macro-expansion core of the format:
//!
//! - [`expr`]: the flattened, index-addressed expression model that compiled
//!   template bodies and materialized invocation arguments share.
//! - [`macros`]: macro definitions, signatures, the macro table, the eager
//!   e-expression argument reader, and the structural macro matcher.
//! - [`stream`]: the abstract stream-reader capability the argument reader
//!   and matcher drive, the binary presence bitmap, and an in-memory tree
//!   reader used as the reference adapter.
//! - [`element`]: the plain in-memory value model the tree reader serves.
//!
//! Encoding-level plumbing (raw binary/text parsing, symbol table management,
//! writers) lives outside this crate; everything here consumes it through the
//! [`stream::StreamReader`] trait.

pub use crate::diagnostics::{ErrorKind, VellumError};

pub mod diagnostics;
pub mod element;
pub mod expr;
pub mod macros;
pub mod stream;
pub mod types;
