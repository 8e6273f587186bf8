//! Unified diagnostics for the Vellum macro core.
//!
//! Every failure mode in this crate is represented by [`VellumError`] and
//! classified by [`ErrorKind`]. The taxonomy matters to callers:
//!
//! - **Data** errors describe malformed or unresolvable input (an unknown
//!   macro address, a presence bitmap that disagrees with a signature, a
//!   truncated stream). They are fatal to the current operation because the
//!   underlying cursor cannot be rewound mid-construction, but they are
//!   ordinary conditions of untrusted input.
//! - **Defect** errors are programming errors: a dangling field name in a
//!   compiled body, a placeholder that leaked out of construction, a type
//!   switch falling through. Well-formed compiled macros and conforming
//!   readers never produce them.
//! - **Unsupported** errors are the matcher's fail-fast signal for template
//!   constructs it does not yet match against (expression groups, nested
//!   invocations). Callers must not conflate them with a `false` match
//!   result; doing so silently corrupts compaction decisions.
//!
//! There are no retries anywhere in this crate; every operation is
//! single-shot against a forward-only cursor.

use miette::Diagnostic;
use thiserror::Error;

/// Type-safe classification of [`VellumError`] variants, mirroring the
/// error-handling taxonomy above. Use this instead of matching on message
/// strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or unresolvable input data.
    Data,
    /// A programming error inside this crate or in a compiled macro body.
    Defect,
    /// A matcher limitation, distinct from "did not match".
    Unsupported,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Data => "Data",
            ErrorKind::Defect => "Defect",
            ErrorKind::Unsupported => "Unsupported",
        };
        write!(f, "{}", name)
    }
}

/// Unified error type for all Vellum macro-core failure modes.
#[derive(Debug, Error, Diagnostic)]
pub enum VellumError {
    #[error("unresolved macro reference: {reference}")]
    #[diagnostic(
        code(vellum::macros::unresolved),
        help("the reference must name a macro registered in the active macro table or a system macro")
    )]
    UnresolvedMacro { reference: String },

    #[error("malformed presence bitmap: {message}")]
    #[diagnostic(code(vellum::stream::presence))]
    MalformedBitmap { message: String },

    #[error("invalid stream: {message}")]
    #[diagnostic(code(vellum::stream::invalid))]
    InvalidStream { message: String },

    #[error("invalid macro definition: {message}")]
    #[diagnostic(code(vellum::macros::definition))]
    InvalidMacro { message: String },

    #[error("stale pool handle: {message}")]
    #[diagnostic(
        code(vellum::expr::pool),
        help("pool handles are invalidated by `clear()`; re-create the expression in the current epoch")
    )]
    StaleHandle { message: String },

    #[error("unsupported template construct: {construct}")]
    #[diagnostic(
        code(vellum::macros::matcher::unsupported),
        help("the matcher cannot yet match bodies containing this construct; treat the macro as unmatchable, not as a mismatch")
    )]
    Unsupported { construct: String },

    #[error("internal defect: {message}")]
    #[diagnostic(code(vellum::defect))]
    Defect { message: String },
}

impl VellumError {
    /// Returns the taxonomy classification for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VellumError::UnresolvedMacro { .. }
            | VellumError::MalformedBitmap { .. }
            | VellumError::InvalidStream { .. }
            | VellumError::InvalidMacro { .. }
            | VellumError::StaleHandle { .. } => ErrorKind::Data,
            VellumError::Unsupported { .. } => ErrorKind::Unsupported,
            VellumError::Defect { .. } => ErrorKind::Defect,
        }
    }

    pub fn unresolved_macro(reference: impl std::fmt::Display) -> Self {
        VellumError::UnresolvedMacro { reference: reference.to_string() }
    }

    pub fn malformed_bitmap(message: impl Into<String>) -> Self {
        VellumError::MalformedBitmap { message: message.into() }
    }

    pub fn invalid_stream(message: impl Into<String>) -> Self {
        VellumError::InvalidStream { message: message.into() }
    }

    pub fn invalid_macro(message: impl Into<String>) -> Self {
        VellumError::InvalidMacro { message: message.into() }
    }

    pub fn stale_handle(message: impl Into<String>) -> Self {
        VellumError::StaleHandle { message: message.into() }
    }

    pub fn unsupported(construct: impl Into<String>) -> Self {
        VellumError::Unsupported { construct: construct.into() }
    }

    pub fn defect(message: impl Into<String>) -> Self {
        VellumError::Defect { message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_the_taxonomy() {
        assert_eq!(VellumError::unresolved_macro("m").kind(), ErrorKind::Data);
        assert_eq!(VellumError::malformed_bitmap("x").kind(), ErrorKind::Data);
        assert_eq!(VellumError::defect("x").kind(), ErrorKind::Defect);
        assert_eq!(VellumError::unsupported("groups").kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn unsupported_is_not_a_data_error() {
        let err = VellumError::unsupported("nested invocations");
        assert_ne!(err.kind(), ErrorKind::Data);
        assert!(err.to_string().contains("nested invocations"));
    }
}
