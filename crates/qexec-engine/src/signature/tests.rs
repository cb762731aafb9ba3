//! Tests for signature parsing

use pretty_assertions::assert_eq;
use rstest::rstest;

use super::*;
use crate::param::ParamMode::{In, InOut, Out};

#[rstest]
#[case("ping", "ping", vec![])]
#[case("ping()", "ping", vec![])]
#[case("echo(>)", "echo", vec![In])]
#[case("add_tax(>, >, <)", "add_tax", vec![In, In, Out])]
#[case("swap(=,=)", "swap", vec![InOut, InOut])]
#[case("mixed(<,  >,=)", "mixed", vec![Out, In, InOut])]
#[case("tabbed(>,\t<)", "tabbed", vec![In, Out])]
#[case("wrapped(>,\n  =)", "wrapped", vec![In, InOut])]
#[case("_sys$proc#2@db(>)", "_sys$proc#2@db", vec![In])]
fn test_parses_valid_signatures(
    #[case] text: &str,
    #[case] name: &str,
    #[case] modes: Vec<ParamMode>,
) {
    let signature = parse_signature("TEST", text).expect("signature should parse");
    assert_eq!(signature.name, name);
    assert_eq!(signature.arity(), modes.len());
    assert_eq!(signature.modes, modes);
}

#[rstest]
#[case::empty("")]
#[case::leading_digit("1proc(>)")]
#[case::invalid_name_char("my-proc(>)")]
#[case::unbalanced_open("proc(>")]
#[case::unbalanced_close("proc>)")]
#[case::unknown_marker("proc(>, ?)")]
#[case::trailing_comma("proc(>,)")]
#[case::leading_comma("proc(,>)")]
#[case::missing_separator("proc(>>)")]
#[case::space_before_comma("proc(> ,<)")]
#[case::trailing_text("proc(>) extra")]
#[case::leading_space(" proc")]
#[case::qualified_name("schema.proc(>)")]
fn test_rejects_malformed_signatures(#[case] text: &str) {
    let err = parse_signature("BROKEN", text).unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::InvalidSignature {
            name: "BROKEN".into(),
            signature: text.into(),
        }
    );
}

#[test]
fn test_error_message_names_descriptor() {
    let err = parse_signature("ADD_TAX", "add tax").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Unsupported stored procedure signature for ADD_TAX: add tax"
    );
}
