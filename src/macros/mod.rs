//! # The Vellum macro system
//!
//! Macros let an encoded stream factor repeated structure into a single
//! definition plus compact invocations ("e-expressions"). This module owns
//! everything from the definition side to the read side:
//!
//! - [`definition`]: macro definitions, signatures, parameter cardinalities,
//!   and references by numeric address or name.
//! - [`registry`]: the macro table an encoding context resolves references
//!   against, with the built-in [`system`] macros as fallback.
//! - [`template`]: programmatic construction of compiled template bodies in
//!   the flattened expression model.
//! - [`args`]: the eager argument reader that materializes one e-expression
//!   from a stream into a flat expression list for the evaluator.
//! - [`matcher`]: the structural matcher that decides whether an existing
//!   value could have been produced by a given macro (the reverse direction,
//!   used when compacting already-encoded data).
//!
//! Expansion itself (merging a template body with materialized arguments
//! into a value stream) is the evaluator's job and lives outside this crate;
//! the hand-off is the [`args::ExpansionSink`] trait.

pub mod args;
pub mod definition;
pub mod matcher;
pub mod registry;
pub mod system;
pub mod template;

pub use args::{ArgumentReader, BufferedExpansion, ExpansionSink};
pub use definition::{Cardinality, Macro, MacroRef, Parameter, ParameterEncoding};
pub use matcher::MacroMatcher;
pub use registry::MacroTable;
pub use template::TemplateBuilder;
