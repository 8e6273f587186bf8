//! The built-in system macros.
//!
//! These are always addressable, independent of any user macro table. They
//! have signatures but no template body; the evaluator implements their
//! expansions natively. Their numeric addresses form a separate space from
//! user addresses and are stable across streams.

use once_cell::sync::Lazy;
use std::sync::Arc;

use crate::macros::definition::{Cardinality, Macro, Parameter, ParameterEncoding};

fn tagged(name: &str, cardinality: Cardinality) -> Parameter {
    Parameter::new(name, ParameterEncoding::Tagged, cardinality)
}

static SYSTEM_MACROS: Lazy<Vec<Arc<Macro>>> = Lazy::new(|| {
    let definitions = [
        ("none", vec![]),
        ("values", vec![tagged("values", Cardinality::ZeroOrMore)]),
        (
            "default",
            vec![
                tagged("values", Cardinality::ZeroOrMore),
                tagged("fallback", Cardinality::ZeroOrMore),
            ],
        ),
        ("meta", vec![tagged("anything", Cardinality::ZeroOrMore)]),
        (
            "repeat",
            vec![tagged("n", Cardinality::ExactlyOne), tagged("value", Cardinality::ZeroOrMore)],
        ),
        ("flatten", vec![tagged("sequences", Cardinality::ZeroOrMore)]),
        ("make_string", vec![tagged("parts", Cardinality::ZeroOrMore)]),
        (
            "annotate",
            vec![
                tagged("annotations", Cardinality::ZeroOrMore),
                tagged("value", Cardinality::ExactlyOne),
            ],
        ),
    ];
    definitions
        .into_iter()
        .filter_map(|(name, signature)| Macro::system(name, signature).ok().map(Arc::new))
        .collect()
});

/// Resolves a system macro by its address in the system space.
pub fn system_macro_by_id(id: usize) -> Option<Arc<Macro>> {
    SYSTEM_MACROS.get(id).cloned()
}

/// Resolves a system macro by name.
pub fn system_macro_by_name(name: &str) -> Option<Arc<Macro>> {
    SYSTEM_MACROS.iter().find(|definition| definition.name() == Some(name)).cloned()
}

/// The number of system macros.
pub fn system_macro_count() -> usize {
    SYSTEM_MACROS.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_and_names_agree() {
        for id in 0..system_macro_count() {
            let by_id = system_macro_by_id(id).unwrap();
            let name = by_id.name().unwrap();
            let by_name = system_macro_by_name(name).unwrap();
            assert_eq!(by_id, by_name);
        }
    }

    #[test]
    fn none_is_the_zero_address() {
        let none = system_macro_by_id(0).unwrap();
        assert_eq!(none.name(), Some("none"));
        assert!(none.signature().is_empty());
        assert!(!none.is_template());
    }

    #[test]
    fn unknown_lookups_fail() {
        assert!(system_macro_by_name("not_a_macro").is_none());
        assert!(system_macro_by_id(10_000).is_none());
    }
}
