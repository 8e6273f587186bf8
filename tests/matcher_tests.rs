//! Matcher contract tests: lockstep structural equivalence between compiled
//! template bodies and candidate values.

mod common;

use common::*;
use vellum::element::Element;
use vellum::macros::{Macro, MacroMatcher, MacroTable, Parameter, TemplateBuilder};
use vellum::stream::TreeReader;
use vellum::types::SymbolToken;
use vellum::{ErrorKind, VellumError};

fn match_elements(matcher: &MacroMatcher, elements: &[Element]) -> Result<bool, VellumError> {
    let table = MacroTable::new();
    let mut reader = TreeReader::over_elements(elements, &table);
    matcher.match_reader(&mut reader)
}

fn template(name: &str, signature: Vec<Parameter>, build: impl FnOnce(&mut TemplateBuilder)) -> Macro {
    let body = {
        let mut builder = TemplateBuilder::new(&signature);
        build(&mut builder);
        builder.build().expect("template body")
    };
    Macro::template(name, signature, body).expect("template macro")
}

#[test]
fn foobar_struct_scenarios() {
    // foobar(foo!, bar?) with body {foo: (%foo), bar: (%bar)}.
    let matcher = MacroMatcher::new(arc(foobar_macro())).unwrap();
    assert_eq!(matcher.name(), Some("foobar"));

    // Both fields supplied.
    let both = [Element::strukt([("foo", Element::int(4)), ("bar", Element::int(5))])];
    assert_eq!(match_elements(&matcher, &both).unwrap(), true);

    // Trailing voidable parameter omitted.
    let omitted = [Element::strukt([("foo", Element::int(4))])];
    assert_eq!(match_elements(&matcher, &omitted).unwrap(), true);

    // Field name mismatch.
    let renamed = [Element::strukt([("foo", Element::int(4)), ("baz", Element::int(5))])];
    assert_eq!(match_elements(&matcher, &renamed).unwrap(), false);
}

#[test]
fn extra_trailing_value_is_rejected() {
    let matcher = MacroMatcher::new(arc(foobar_macro())).unwrap();
    let extra = [Element::strukt([
        ("foo", Element::int(4)),
        ("bar", Element::int(5)),
        ("qux", Element::int(6)),
    ])];
    assert_eq!(match_elements(&matcher, &extra).unwrap(), false);
}

#[test]
fn required_trailing_parameter_cannot_be_omitted() {
    let strict = template(
        "strict",
        vec![Parameter::required("foo"), Parameter::required("bar")],
        |b| {
            b.begin_struct()
                .field("foo")
                .variable("foo")
                .field("bar")
                .variable("bar")
                .end();
        },
    );
    let matcher = MacroMatcher::new(arc(strict)).unwrap();
    let omitted = [Element::strukt([("foo", Element::int(4))])];
    assert_eq!(match_elements(&matcher, &omitted).unwrap(), false);
}

#[test]
fn canonical_expansion_matches_itself() {
    // Supply every variable of foobar with a representative value and match
    // the expansion against the macro.
    let matcher = MacroMatcher::new(arc(foobar_macro())).unwrap();
    let expansion =
        [Element::strukt([("foo", Element::string("rep")), ("bar", Element::bool(true))])];
    assert_eq!(match_elements(&matcher, &expansion).unwrap(), true);
}

#[test]
fn variables_match_any_value() {
    let matcher = MacroMatcher::new(arc(foobar_macro())).unwrap();
    for candidate in [
        Element::int(1),
        Element::string("s"),
        Element::list([Element::int(1)]),
        Element::null(),
    ] {
        let elements = [Element::strukt([("foo", candidate)])];
        assert_eq!(match_elements(&matcher, &elements).unwrap(), true);
    }
}

#[test]
fn literal_scalars_compare_by_value() {
    let answer = template("answer", vec![], |b| {
        b.int(42);
    });
    let matcher = MacroMatcher::new(arc(answer)).unwrap();
    assert_eq!(match_elements(&matcher, &[Element::int(42)]).unwrap(), true);
    assert_eq!(match_elements(&matcher, &[Element::int(43)]).unwrap(), false);
    assert_eq!(match_elements(&matcher, &[Element::string("42")]).unwrap(), false);
}

#[test]
fn integers_widen_across_representations() {
    // A template literal compiled as a big integer still matches the same
    // numeric value read at fixed width, and vice versa.
    let small_as_big = template("wide", vec![], |b| {
        b.big_int(num_bigint::BigInt::from(7));
    });
    let matcher = MacroMatcher::new(arc(small_as_big)).unwrap();
    assert_eq!(match_elements(&matcher, &[Element::int(7)]).unwrap(), true);
    assert_eq!(match_elements(&matcher, &[Element::int(8)]).unwrap(), false);

    let big_literal = template("big", vec![], |b| {
        b.big_int(huge());
    });
    let matcher = MacroMatcher::new(arc(big_literal)).unwrap();
    assert_eq!(match_elements(&matcher, &[Element::big_int(huge())]).unwrap(), true);
    assert_eq!(match_elements(&matcher, &[Element::int(1)]).unwrap(), false);
}

#[test]
fn floats_compare_by_ieee_total_order() {
    let nan = template("nan", vec![], |b| {
        b.float(f64::NAN);
    });
    let matcher = MacroMatcher::new(arc(nan)).unwrap();
    assert_eq!(match_elements(&matcher, &[Element::float(f64::NAN)]).unwrap(), true);
    assert_eq!(match_elements(&matcher, &[Element::float(0.0)]).unwrap(), false);

    let zero = template("zero", vec![], |b| {
        b.float(0.0);
    });
    let matcher = MacroMatcher::new(arc(zero)).unwrap();
    assert_eq!(match_elements(&matcher, &[Element::float(0.0)]).unwrap(), true);
    // Negative zero is a different encoding.
    assert_eq!(match_elements(&matcher, &[Element::float(-0.0)]).unwrap(), false);
}

#[test]
fn lobs_compare_byte_for_byte() {
    let blob = template("blob", vec![], |b| {
        b.blob(vec![1u8, 2, 3]);
    });
    let matcher = MacroMatcher::new(arc(blob)).unwrap();
    assert_eq!(match_elements(&matcher, &[Element::blob(vec![1u8, 2, 3])]).unwrap(), true);
    assert_eq!(match_elements(&matcher, &[Element::blob(vec![1u8, 2])]).unwrap(), false);
    // A clob with identical bytes is a different type.
    assert_eq!(match_elements(&matcher, &[Element::clob(vec![1u8, 2, 3])]).unwrap(), false);
}

#[test]
fn decimals_timestamps_and_symbols_compare_exactly() {
    let exact = template("exact", vec![], |b| {
        b.begin_list()
            .decimal(dec("1.50"))
            .timestamp(ts("2024-01-01T00:00:00Z"))
            .symbol("sym")
            .end();
    });
    let matcher = MacroMatcher::new(arc(exact)).unwrap();
    let matching = [Element::list([
        Element::decimal(dec("1.50")),
        Element::timestamp(ts("2024-01-01T00:00:00Z")),
        Element::symbol("sym"),
    ])];
    assert_eq!(match_elements(&matcher, &matching).unwrap(), true);

    let wrong_symbol = [Element::list([
        Element::decimal(dec("1.50")),
        Element::timestamp(ts("2024-01-01T00:00:00Z")),
        Element::symbol("other"),
    ])];
    assert_eq!(match_elements(&matcher, &wrong_symbol).unwrap(), false);
}

#[test]
fn annotations_must_match_in_order() {
    let tagged = template("tagged", vec![], |b| {
        b.annotate(["a", "b"]).int(1);
    });
    let matcher = MacroMatcher::new(arc(tagged)).unwrap();

    let exact = [Element::int(1)
        .with_annotations([SymbolToken::known("a"), SymbolToken::known("b")])];
    assert_eq!(match_elements(&matcher, &exact).unwrap(), true);

    let unannotated = [Element::int(1)];
    assert_eq!(match_elements(&matcher, &unannotated).unwrap(), false);

    let reordered = [Element::int(1)
        .with_annotations([SymbolToken::known("b"), SymbolToken::known("a")])];
    assert_eq!(match_elements(&matcher, &reordered).unwrap(), false);
}

#[test]
fn nested_containers_match_recursively() {
    let nested = template("nested", vec![Parameter::required("x")], |b| {
        b.begin_list()
            .int(1)
            .begin_sexp()
            .symbol("op")
            .variable("x")
            .end()
            .end();
    });
    let matcher = MacroMatcher::new(arc(nested)).unwrap();

    let matching = [Element::list([
        Element::int(1),
        Element::sexp([Element::symbol("op"), Element::string("anything")]),
    ])];
    assert_eq!(match_elements(&matcher, &matching).unwrap(), true);

    let wrong_inner = [Element::list([
        Element::int(1),
        Element::sexp([Element::symbol("wrong"), Element::string("anything")]),
    ])];
    assert_eq!(match_elements(&matcher, &wrong_inner).unwrap(), false);

    let longer_inner = [Element::list([
        Element::int(1),
        Element::sexp([
            Element::symbol("op"),
            Element::string("anything"),
            Element::int(9),
        ]),
    ])];
    assert_eq!(match_elements(&matcher, &longer_inner).unwrap(), false);
}

#[test]
fn typed_nulls_match_by_type() {
    let null_int = template("null_int", vec![], |b| {
        b.null(vellum::types::ValueType::Int);
    });
    let matcher = MacroMatcher::new(arc(null_int)).unwrap();
    assert_eq!(
        match_elements(&matcher, &[Element::typed_null(vellum::types::ValueType::Int)]).unwrap(),
        true
    );
    assert_eq!(match_elements(&matcher, &[Element::null()]).unwrap(), false);
    assert_eq!(match_elements(&matcher, &[Element::int(0)]).unwrap(), false);
}

#[test]
fn expression_groups_in_bodies_fail_fast() {
    let grouped = template("grouped", vec![Parameter::zero_or_more("xs")], |b| {
        b.begin_group().int(1).int(2).end();
    });
    let matcher = MacroMatcher::new(arc(grouped)).unwrap();
    let error = match_elements(&matcher, &[Element::int(1)]).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Unsupported);
}

#[test]
fn nested_invocations_in_bodies_fail_fast() {
    let inner = arc(foobar_macro());
    let invoking = template("invoking", vec![], |b| {
        b.begin_invocation(inner).int(4).end();
    });
    let matcher = MacroMatcher::new(arc(invoking)).unwrap();
    let error = match_elements(&matcher, &[Element::int(4)]).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Unsupported);
    // Unsupported must be distinguishable from "did not match".
    assert!(matches!(error, VellumError::Unsupported { .. }));
}

#[test]
fn bodiless_macros_cannot_be_matched() {
    let system = Macro::system("values", vec![Parameter::zero_or_more("values")]).unwrap();
    let error = MacroMatcher::new(arc(system)).unwrap_err();
    assert!(matches!(error, VellumError::InvalidMacro { .. }));
}

#[test]
fn candidate_shorter_than_body_is_rejected() {
    let two = template("two", vec![], |b| {
        b.int(1).int(2);
    });
    let matcher = MacroMatcher::new(arc(two)).unwrap();
    assert_eq!(match_elements(&matcher, &[Element::int(1)]).unwrap(), false);
    assert_eq!(
        match_elements(&matcher, &[Element::int(1), Element::int(2)]).unwrap(),
        true
    );
    assert_eq!(
        match_elements(&matcher, &[Element::int(1), Element::int(2), Element::int(3)]).unwrap(),
        false
    );
}
